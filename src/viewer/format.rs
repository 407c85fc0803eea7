// Presentation transforms for the rendered transcript.

/// Default paragraph character budget.
pub const PARAGRAPH_BUDGET: usize = 120;

/// Split a transcription into readable paragraphs.
///
/// Sentences (delimited by ". ") are packed greedily: a paragraph
/// accumulates sentences while staying under the budget, flushes on
/// overflow, and paragraphs are joined with newlines.
pub fn format_transcription(transcription: &str, budget: usize) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();

    for sentence in transcription.split(". ") {
        if current.len() + sentence.len() < budget {
            current.push_str(sentence);
            current.push_str(". ");
        } else {
            paragraphs.push(current.trim().to_string());
            current = format!("{}. ", sentence);
        }
    }

    if !current.trim().is_empty() {
        paragraphs.push(current.trim().to_string());
    }

    paragraphs.join("\n")
}

/// Build the save filename `{title}_{time}_transcription.txt` with spaces
/// replaced by underscores and colons, slashes, and commas made
/// filesystem-safe.
pub fn save_filename(title: &str, time: &str) -> String {
    let time = time
        .replace(',', "")
        .replace('/', "-")
        .replace(' ', "_")
        .replace(':', "-");
    let title = title.replace(' ', "_");
    format!("{}_{}_transcription.txt", title, time)
}
