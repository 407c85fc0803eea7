// Additive mixing of the tab and microphone sample buffers.
//
// The combined output is as long as the longest input; missing samples
// from the shorter input count as silence. Sums are clipped to the i16
// range instead of wrapping.

/// Mix two sample buffers by addition with clipping.
pub fn mix_samples(a: &[i16], b: &[i16]) -> Vec<i16> {
    let len = a.len().max(b.len());
    let mut mixed = Vec::with_capacity(len);

    for i in 0..len {
        let left = a.get(i).copied().unwrap_or(0) as i32;
        let right = b.get(i).copied().unwrap_or(0) as i32;
        let sum = (left + right).clamp(i16::MIN as i32, i16::MAX as i32);
        mixed.push(sum as i16);
    }

    mixed
}

/// Encode samples as little-endian 16-bit PCM bytes, the chunk format the
/// recorder accumulates.
pub fn samples_to_pcm(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_equal_length() {
        let mixed = mix_samples(&[100, 200, 300], &[50, 100, 150]);
        assert_eq!(mixed, vec![150, 300, 450]);
    }

    #[test]
    fn test_mix_with_clipping() {
        let mixed = mix_samples(&[i16::MAX - 100], &[200]);
        assert_eq!(mixed[0], i16::MAX);

        let mixed = mix_samples(&[i16::MIN + 100], &[-200]);
        assert_eq!(mixed[0], i16::MIN);
    }

    #[test]
    fn test_mix_different_lengths() {
        let mixed = mix_samples(&[100, 200], &[50, 100, 150, 200]);
        assert_eq!(mixed, vec![150, 300, 150, 200]);
    }

    #[test]
    fn test_mix_one_side_empty() {
        let mixed = mix_samples(&[], &[7, 8]);
        assert_eq!(mixed, vec![7, 8]);
    }

    #[test]
    fn test_pcm_encoding() {
        let bytes = samples_to_pcm(&[1, -1]);
        assert_eq!(bytes, vec![1, 0, 255, 255]);
    }
}
