//! Splitting long transcripts into overlapping, budget-bounded chunks.
//!
//! Chunks are measured in characters of source text and cut on word
//! boundaries. Consecutive chunks share a window of trailing words so the
//! model keeps continuity across the split.

mod budget;

pub use budget::{estimate_tokens, TokenBudget};

use serde::{Deserialize, Serialize};

/// One unit of work sent to the completion provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRequest {
    /// Position of this chunk in the merged output.
    pub sequence_index: usize,
    /// Text of the chunk (words joined by single spaces).
    pub text: String,
    /// Number of leading words repeated from the previous chunk.
    pub overlap_word_count: usize,
    /// Index of the first word (including overlap) in the source word list.
    pub start_word: usize,
    /// One past the index of the last word in the source word list.
    pub end_word: usize,
}

impl ChunkRequest {
    /// Number of words in this chunk, overlap included.
    pub fn word_count(&self) -> usize {
        self.end_word - self.start_word
    }

    /// Index of the first word that no earlier chunk has carried.
    pub fn first_new_word(&self) -> usize {
        self.start_word + self.overlap_word_count
    }

    /// Build a request covering `words[start..end]`, the first `overlap` of
    /// which repeat the previous chunk.
    pub fn from_span(
        words: &[&str],
        start: usize,
        end: usize,
        overlap: usize,
        sequence_index: usize,
    ) -> Self {
        Self {
            sequence_index,
            text: words[start..end].join(" "),
            overlap_word_count: overlap,
            start_word: start,
            end_word: end,
        }
    }
}

/// Split text into words on any whitespace.
pub fn split_words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Length of the longest word in a word list.
pub fn longest_word(words: &[&str]) -> usize {
    words.iter().map(|w| w.len()).max().unwrap_or(0)
}

/// Split `text` into ordered chunks of roughly `char_budget` characters.
///
/// Each chunk after the first starts with the last `overlap_word_count` words
/// of the chunk before it.
pub fn chunk(text: &str, char_budget: usize, overlap_word_count: usize) -> Vec<String> {
    let words = split_words(text);
    TextChunker::new(char_budget, overlap_word_count)
        .plan(&words, 0, 0, 0)
        .into_iter()
        .map(|c| c.text)
        .collect()
}

/// Word-boundary chunker with a character budget and an overlap window.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    char_budget: usize,
    overlap_word_count: usize,
}

impl TextChunker {
    pub fn new(char_budget: usize, overlap_word_count: usize) -> Self {
        Self {
            char_budget,
            overlap_word_count,
        }
    }

    pub fn char_budget(&self) -> usize {
        self.char_budget
    }

    /// Plan chunks over `words[start..]`.
    ///
    /// The first `seed` words from `start` were already sent as part of an
    /// earlier chunk; they are carried as overlap into the first planned chunk
    /// and never form a chunk on their own. Sequence indices start at
    /// `first_sequence`.
    pub fn plan(
        &self,
        words: &[&str],
        start: usize,
        seed: usize,
        first_sequence: usize,
    ) -> Vec<ChunkRequest> {
        let mut chunks = Vec::new();
        if start >= words.len() {
            return chunks;
        }

        let mut chunk_start = start;
        let mut carried = seed.min(words.len() - start);
        let mut size = span_size(&words[chunk_start..chunk_start + carried]);
        let mut idx = chunk_start + carried;

        while idx < words.len() {
            let word_size = words[idx].len() + 1;

            if size + word_size > self.char_budget && idx > chunk_start {
                if idx - chunk_start > carried {
                    let sequence_index = first_sequence + chunks.len();
                    chunks.push(ChunkRequest::from_span(words, chunk_start, idx, carried, sequence_index));

                    let flushed = idx - chunk_start;
                    if self.overlap_word_count > 0 && flushed > self.overlap_word_count {
                        chunk_start = idx - self.overlap_word_count;
                        carried = self.overlap_word_count;
                        size = span_size(&words[chunk_start..idx]);
                    } else {
                        chunk_start = idx;
                        carried = 0;
                        size = 0;
                    }
                }

                // A chunk made only of repeated words would never make progress.
                if carried > 0 && size + word_size > self.char_budget {
                    chunk_start = idx;
                    carried = 0;
                    size = 0;
                }
            }

            size += word_size;
            idx += 1;
        }

        if idx - chunk_start > carried {
            let sequence_index = first_sequence + chunks.len();
            chunks.push(ChunkRequest::from_span(words, chunk_start, idx, carried, sequence_index));
        }

        chunks
    }
}

fn span_size(words: &[&str]) -> usize {
    words.iter().map(|w| w.len() + 1).sum()
}
