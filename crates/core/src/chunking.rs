use crate::error::IngestError;
use crate::models::TextChunk;

pub const DEFAULT_CHUNK_SIZE: usize = 1_000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_SEPARATOR: &str = "\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub separator: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.separator.is_empty() {
            return Err(IngestError::InvalidChunkConfig(
                "separator must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Splits `text` into windows of at most `chunk_size` chars that overlap by
/// at most `chunk_overlap` chars. Chunks end right after a separator when one
/// falls inside the window and leaves the chunk longer than the overlap;
/// otherwise the window is cut at the raw size boundary.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();
    let separator: Vec<char> = config.separator.chars().collect();
    let total = chars.len();
    let size = config.chunk_size.max(1);
    let overlap = config.chunk_overlap.min(size - 1);

    let mut chunks = Vec::new();
    if total == 0 {
        return chunks;
    }

    let mut start = 0;
    loop {
        let window_end = (start + size).min(total);
        let end = if window_end == total {
            total
        } else {
            last_boundary(&chars, &separator, start + overlap + 1, window_end)
                .unwrap_or(window_end)
        };

        chunks.push(TextChunk {
            index: chunks.len(),
            text: chars[start..end].iter().collect(),
            char_start: start,
            char_end: end,
        });

        if end == total {
            break;
        }

        let overlap_from = end.saturating_sub(overlap).max(start + 1);
        start = first_boundary(&chars, &separator, overlap_from, end).unwrap_or(overlap_from);
    }

    chunks
}

/// Stitches chunks back into the text they were cut from.
pub fn reconstruct(chunks: &[TextChunk]) -> String {
    let mut text = String::new();
    let mut covered = 0usize;

    for chunk in chunks {
        let skip = covered.saturating_sub(chunk.char_start);
        text.extend(chunk.text.chars().skip(skip));
        covered = covered.max(chunk.char_end);
    }

    text
}

fn is_boundary(chars: &[char], separator: &[char], position: usize) -> bool {
    !separator.is_empty()
        && position >= separator.len()
        && position <= chars.len()
        && chars[position - separator.len()..position] == *separator
}

// Largest position in `[low, high]` directly after a separator.
fn last_boundary(chars: &[char], separator: &[char], low: usize, high: usize) -> Option<usize> {
    if low > high {
        return None;
    }
    (low..=high)
        .rev()
        .find(|&position| is_boundary(chars, separator, position))
}

// Smallest position in `[low, high)` directly after a separator.
fn first_boundary(chars: &[char], separator: &[char], low: usize, high: usize) -> Option<usize> {
    (low..high).find(|&position| is_boundary(chars, separator, position))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, chunk_overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            separator: "\n".to_string(),
            chunk_size,
            chunk_overlap,
        }
    }

    fn sample_text() -> String {
        let mut text = String::new();
        for line in 0..120 {
            text.push_str(&format!("Line {line}: hydraulic pump pressure {}\n", "x".repeat(line % 17)));
            if line % 11 == 0 {
                text.push_str(&"unbroken".repeat(40));
            }
        }
        text.push_str("Schluss: Überdruckventil öffnet bei 210 bar");
        text
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_text("Hello.\nWorld.", &config(1_000, 200));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello.\nWorld.");
        assert_eq!(chunks[0].char_start, 0);
        assert_eq!(chunks[0].char_end, 13);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text("", &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn splits_after_the_last_separator_in_the_window() {
        let chunks = split_text("aaaa\nbbbb\ncccc\n", &config(10, 5));
        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();

        assert_eq!(texts, vec!["aaaa\nbbbb\n", "bbbb\ncccc\n"]);
    }

    #[test]
    fn falls_back_to_raw_boundary_without_separator() {
        let chunks = split_text("abcdefghij", &config(4, 1));
        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();

        assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn chunks_respect_size_overlap_and_cover_the_input() {
        let text = sample_text();

        for (size, overlap) in [(1_000, 200), (120, 30), (64, 0), (50, 49), (7, 3)] {
            let cfg = config(size, overlap);
            let chunks = split_text(&text, &cfg);

            assert!(!chunks.is_empty());
            assert_eq!(chunks[0].char_start, 0);
            assert_eq!(chunks[chunks.len() - 1].char_end, text.chars().count());
            for chunk in &chunks {
                assert!(chunk.char_len() <= size, "chunk longer than {size}");
                assert_eq!(chunk.text.chars().count(), chunk.char_len());
            }
            for pair in chunks.windows(2) {
                assert!(pair[1].char_start > pair[0].char_start);
                assert!(pair[1].char_start <= pair[0].char_end, "gap between chunks");
                assert!(pair[0].char_end - pair[1].char_start <= overlap);
            }
            assert_eq!(reconstruct(&chunks), text);
        }
    }

    #[test]
    fn reconstruct_drops_overlap_and_handles_no_chunks() {
        let chunks = split_text("aaaa\nbbbb\ncccc\n", &config(10, 5));
        assert_eq!(reconstruct(&chunks), "aaaa\nbbbb\ncccc\n");
        assert_eq!(reconstruct(&[]), "");
    }

    #[test]
    fn splitting_is_deterministic() {
        let text = sample_text();
        let cfg = ChunkingConfig::default();
        assert_eq!(split_text(&text, &cfg), split_text(&text, &cfg));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(config(0, 0).validate().is_err());
        assert!(config(100, 100).validate().is_err());
        assert!(ChunkingConfig {
            separator: String::new(),
            ..ChunkingConfig::default()
        }
        .validate()
        .is_err());
        assert!(ChunkingConfig::default().validate().is_ok());
    }
}
