//! Sentence-boundary detection over an incremental fragment stream
//!
//! Fragments arrive token by token from the chat stream. They are appended
//! to a running spoken-sentence buffer and a parallel display buffer; a
//! boundary fires either on a bare newline fragment or on a short fragment
//! that starts with sentence-terminating punctuation, at which point the
//! accumulated sentence is handed to the speech-output queue.

/// Sentence-terminating punctuation, Latin and CJK full-width
const SENTENCE_PUNCTUATION: &[char] = &['.', '?', '!', ':', ';', '。', '？', '！', '：', '；'];

/// Incremental sentence splitter
#[derive(Debug, Default)]
pub struct SentenceSplitter {
    spoken: String,
    display: String,
}

impl SentenceSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment; returns a complete sentence when a boundary fires
    ///
    /// Boundary rules:
    /// - a fragment that is a single newline (`"\n"` or `"\n\n"`) flushes
    ///   immediately, newline included;
    /// - a fragment whose newline-stripped text has length <= 2 and starts
    ///   with a sentence-terminating punctuation mark flushes the buffer
    ///   including that fragment.
    pub fn push(&mut self, fragment: &str) -> Option<String> {
        self.display.push_str(fragment);
        self.spoken.push_str(fragment);

        if fragment == "\n" || fragment == "\n\n" {
            return Some(std::mem::take(&mut self.spoken));
        }

        let stripped: String = fragment.chars().filter(|c| *c != '\n').collect();
        if stripped.chars().count() <= 2 {
            if let Some(first) = stripped.chars().next() {
                if SENTENCE_PUNCTUATION.contains(&first) {
                    return Some(std::mem::take(&mut self.spoken));
                }
            }
        }

        None
    }

    /// Flush whatever remains after the stream has completed
    pub fn finish(&mut self) -> Option<String> {
        if self.spoken.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.spoken))
        }
    }

    /// Drain the parallel display buffer
    pub fn take_display(&mut self) -> String {
        std::mem::take(&mut self.display)
    }

    /// Sentence text accumulated so far, not yet flushed
    pub fn pending(&self) -> &str {
        &self.spoken
    }
}
