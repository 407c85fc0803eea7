/// Ordered chunk accumulator bound to the combined output stream.
///
/// Chunks are appended in emission order and the finalized artifact is
/// their exact positional concatenation, so ordering here is load-bearing.
#[derive(Debug, Default)]
pub struct Recorder {
    chunks: Vec<Vec<u8>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    /// Append one emitted chunk.
    pub fn push_chunk(&mut self, chunk: Vec<u8>) {
        self.chunks.push(chunk);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Concatenate all accumulated chunks into the final artifact bytes
    /// and reset the accumulator.
    pub fn finalize(&mut self) -> Vec<u8> {
        let total: usize = self.chunks.iter().map(|c| c.len()).sum();
        let mut bytes = Vec::with_capacity(total);
        for chunk in self.chunks.drain(..) {
            bytes.extend_from_slice(&chunk);
        }
        bytes
    }
}
