/// Overlapping fixed-width text windows
///
/// Windows are measured in chars, never bytes, so multi-byte text is never
/// split inside a scalar value.
use crate::error::{DocseekError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    window: usize,
    overlap: usize,
}

impl Chunker {
    /// Requires `0 <= overlap < window`
    pub fn new(window: usize, overlap: usize) -> Result<Self> {
        if window == 0 {
            return Err(DocseekError::Config(
                "Chunk size must be greater than 0".to_string(),
            ));
        }
        if overlap >= window {
            return Err(DocseekError::Config(format!(
                "Chunk overlap ({}) must be less than chunk size ({})",
                overlap, window
            )));
        }
        Ok(Self { window, overlap })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered windows.
    ///
    /// Window `i` starts at char `i * (window - overlap)`; the last window
    /// ends at the end of the text and may be shorter than `window`.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        // Byte offset of every char boundary, plus the end
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let len = bounds.len() - 1;

        if len == 0 {
            return Vec::new();
        }
        if len <= self.window {
            return vec![text.to_string()];
        }

        let step = self.window - self.overlap;
        let count = (len - self.overlap).div_ceil(step);

        (0..count)
            .map(|i| {
                let start = i * step;
                let end = (start + self.window).min(len);
                text[bounds[start]..bounds[end]].to_string()
            })
            .collect()
    }

    /// Inverse of [`Chunker::chunk`]: drop the trailing overlap of every
    /// non-final window and concatenate.
    pub fn reassemble(&self, chunks: &[String]) -> String {
        let mut text = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i + 1 == chunks.len() {
                text.push_str(chunk);
            } else {
                let keep = chunk.chars().count().saturating_sub(self.overlap);
                text.extend(chunk.chars().take(keep));
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected_count(len: usize, w: usize, o: usize) -> usize {
        if len == 0 {
            0
        } else if len <= w {
            1
        } else {
            (len - o).div_ceil(w - o)
        }
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(100, 100).is_err());
        assert!(Chunker::new(100, 150).is_err());
        assert!(Chunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_empty_text() {
        let chunker = Chunker::new(1000, 200).unwrap();
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = Chunker::new(1000, 200).unwrap();
        let text = "a".repeat(50);
        let chunks = chunker.chunk(&text);
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn test_count_and_overlap() {
        let chunker = Chunker::new(10, 3).unwrap();
        let text: String = ('a'..='z').collect();
        let chunks = chunker.chunk(&text);

        assert_eq!(chunks.len(), expected_count(26, 10, 3));
        assert_eq!(chunks[0], "abcdefghij");
        assert_eq!(chunks[1], "hijklmnopq");
        assert_eq!(chunks.last().unwrap(), "vwxyz");
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().skip(pair[0].chars().count() - 3).collect();
            let head: String = pair[1].chars().take(3).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_lossless_reassembly() {
        for (w, o) in [(10, 3), (7, 0), (5, 4), (1000, 200)] {
            let chunker = Chunker::new(w, o).unwrap();
            for len in [1, 5, 9, 10, 11, 23, 57, 1200, 2601] {
                let text: String = (0..len)
                    .map(|i| char::from(b'a' + (i % 26) as u8))
                    .collect();
                let chunks = chunker.chunk(&text);
                assert_eq!(
                    chunks.len(),
                    expected_count(len, w, o),
                    "w={} o={} len={}",
                    w,
                    o,
                    len
                );
                assert_eq!(chunker.reassemble(&chunks), text);
            }
        }
    }

    #[test]
    fn test_multibyte_text() {
        let chunker = Chunker::new(4, 1).unwrap();
        let text = "héllo wörld ✓✓";
        let chunks = chunker.chunk(text);

        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunker.reassemble(&chunks), text);
    }

    #[test]
    fn test_deterministic() {
        let chunker = Chunker::new(50, 10).unwrap();
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        assert_eq!(chunker.chunk(&text), chunker.chunk(&text));
    }
}
