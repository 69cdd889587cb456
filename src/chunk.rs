//! Overlapping, boundary-preferring text chunker.
//!
//! Splits extracted document text into passages of at most `chunk_size`
//! bytes, where consecutive passages share exactly the last `overlap`
//! characters of the earlier one. Chunk ends prefer natural boundaries —
//! paragraph (`\n\n`), newline, sentence (`. `), word (space) — over
//! mid-token cuts, falling back to a hard cut snapped to a UTF-8 char
//! boundary only when no boundary exists within the size budget.
//!
//! Every chunk is a contiguous slice of the input, so concatenating the
//! first chunk with each later chunk minus its leading `overlap` chars
//! reconstructs the input exactly. Empty input yields zero chunks; that is
//! a valid outcome, not an error.

/// Splitter configured with a chunk size in bytes and an overlap in
/// characters. Counting the overlap in characters keeps the step exact on
/// multibyte text, where a byte offset may not be a char boundary; for
/// ASCII the two units coincide.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkSplitter {
    /// Create a splitter. `overlap` is clamped below `chunk_size` so every
    /// step makes forward progress.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Lazily split `text` into chunks. The iterator borrows the input and
    /// can be recreated for another pass; splitting is deterministic.
    pub fn split<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            text,
            chunk_size: self.chunk_size,
            overlap: self.overlap,
            start: 0,
        }
    }
}

/// Iterator over the chunks of one input text.
pub struct Chunks<'a> {
    text: &'a str,
    chunk_size: usize,
    overlap: usize,
    start: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.start >= self.text.len() {
            return None;
        }

        let remaining = self.text.len() - self.start;
        if remaining <= self.chunk_size {
            // Trailing chunk: may be shorter, no overlap past end of input.
            let piece = &self.text[self.start..];
            self.start = self.text.len();
            return Some(piece);
        }

        let mut hard_end = snap_to_char_boundary(self.text, self.start + self.chunk_size);
        if hard_end <= self.start {
            hard_end = next_char_boundary(self.text, self.start + 1);
        }

        let window = &self.text[self.start..hard_end];
        let end = match natural_break(window, self.overlap) {
            Some(rel) => self.start + rel,
            None => hard_end,
        };

        let piece = &self.text[self.start..end];

        let mut next_start = back_by_chars(self.text, end, self.overlap);
        if next_start <= self.start {
            // The chunk holds no more than `overlap` chars; drop the
            // overlap for this transition rather than stall.
            next_start = end;
        }
        self.start = next_start;

        Some(piece)
    }
}

/// Find the latest natural boundary in `window` whose end lands past the
/// overlap region, so the next chunk still starts after the current one.
/// Returns the break position relative to the window start.
fn natural_break(window: &str, overlap: usize) -> Option<usize> {
    for sep in ["\n\n", "\n", ". ", " "] {
        if let Some(pos) = window.rfind(sep) {
            let end = pos + sep.len();
            if end > overlap {
                return Some(end);
            }
        }
    }
    None
}

/// Byte index exactly `n` chars before `end`, which must itself be a char
/// boundary. The result is always a char boundary, so the overlap carried
/// into the next chunk is exact. Returns 0 when fewer than `n` chars
/// precede `end`.
fn back_by_chars(s: &str, end: usize, n: usize) -> usize {
    if n == 0 {
        return end;
    }
    s[..end]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Snap a byte index forward to the nearest valid UTF-8 char boundary.
fn next_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
        ChunkSplitter::new(chunk_size, overlap)
            .split(text)
            .map(|c| c.to_string())
            .collect()
    }

    /// Rebuild the original text by stripping each later chunk's leading
    /// overlap chars.
    fn reconstruct(pieces: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, piece) in pieces.iter().enumerate() {
            if i == 0 {
                out.push_str(piece);
            } else {
                let mut rest = piece.chars();
                for _ in 0..overlap {
                    if rest.next().is_none() {
                        break;
                    }
                }
                out.push_str(rest.as_str());
            }
        }
        out
    }

    #[test]
    fn empty_input_yields_zero_chunks() {
        assert!(chunks("", 1000, 100).is_empty());
    }

    #[test]
    fn short_text_single_chunk_equals_input() {
        let text = "The sky is blue.";
        let got = chunks(text, 1000, 100);
        assert_eq!(got, vec![text.to_string()]);
    }

    #[test]
    fn text_at_exactly_chunk_size_is_one_chunk() {
        let text = "a".repeat(50);
        let got = chunks(&text, 50, 10);
        assert_eq!(got, vec![text]);
    }

    #[test]
    fn every_chunk_respects_size_budget() {
        let text = "word ".repeat(200);
        for piece in chunks(&text, 40, 8) {
            assert!(piece.len() <= 40, "chunk too long: {:?}", piece);
        }
    }

    #[test]
    fn consecutive_chunks_overlap_exactly() {
        // No separators, so every cut is a hard cut at the size budget.
        let text = "x".repeat(100);
        let got = chunks(&text, 20, 5);
        for pair in got.windows(2) {
            let tail = &pair[0][pair[0].len() - 5..];
            assert!(pair[1].starts_with(tail));
        }
    }

    #[test]
    fn reconstruction_round_trips() {
        let text = "First paragraph with some words.\n\nSecond paragraph, also with words. \
                    A further sentence here.\n\nThird paragraph to push past the budget.";
        let got = chunks(text, 40, 10);
        assert!(got.len() > 1);
        assert_eq!(reconstruct(&got, 10), text);
    }

    #[test]
    fn reconstruction_round_trips_without_separators() {
        let text = "abcdefghij".repeat(13);
        let got = chunks(&text, 32, 6);
        assert!(got.len() > 1);
        assert_eq!(reconstruct(&got, 6), text);
    }

    #[test]
    fn prefers_sentence_boundary_over_hard_cut() {
        let text = "A first sentence. A second sentence that keeps going on.";
        let got = chunks(text, 30, 0);
        assert_eq!(got[0], "A first sentence. ");
    }

    #[test]
    fn prefers_paragraph_boundary() {
        let text = "Alpha alpha.\n\nBeta beta beta and more beta.";
        let got = chunks(text, 20, 0);
        assert_eq!(got[0], "Alpha alpha.\n\n");
    }

    #[test]
    fn prefers_word_boundary() {
        let text = "aaa bbb ccc ddd";
        let got = chunks(text, 10, 3);
        assert_eq!(got[0], "aaa bbb ");
        assert_eq!(reconstruct(&got, 3), text);
    }

    #[test]
    fn multibyte_overlap_is_exact_and_reconstruction_round_trips() {
        // 2-byte chars only, no separators: every cut is a hard cut, and
        // every overlap step must land on a char boundary.
        let text: String = ('\u{e0}'..='\u{ff}').collect::<String>().repeat(3);
        let got = chunks(&text, 10, 3);
        assert!(got.len() > 1);

        for pair in got.windows(2) {
            let tail: String = {
                let mut chars: Vec<char> = pair[0].chars().rev().take(3).collect();
                chars.reverse();
                chars.into_iter().collect()
            };
            assert_eq!(tail.chars().count(), 3);
            assert!(
                pair[1].starts_with(&tail),
                "chunk {:?} does not carry the 3-char overlap {:?}",
                pair[1],
                tail
            );
        }

        assert_eq!(reconstruct(&got, 3), text);
    }

    #[test]
    fn multibyte_input_does_not_panic() {
        let text = "┌──────────┐ naïve café ┌──────────┐".repeat(4);
        let got = chunks(&text, 10, 3);
        assert!(!got.is_empty());
        for piece in &got {
            assert!(!piece.is_empty());
        }
    }

    #[test]
    fn splitting_is_restartable_and_deterministic() {
        let splitter = ChunkSplitter::new(25, 5);
        let text = "Some repeated text. ".repeat(10);
        let first: Vec<&str> = splitter.split(&text).collect();
        let second: Vec<&str> = splitter.split(&text).collect();
        assert_eq!(first, second);
    }
}
