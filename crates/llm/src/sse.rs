//! Incremental SSE record buffering
//!
//! The chat stream arrives as irregular byte chunks that may split
//! multi-byte characters or record boundaries anywhere. Records are
//! line-delimited `data: {...}` events terminated by a blank line, with a
//! `data: [DONE]` sentinel at the end of the stream.
//!
//! Buffering policy: a chunk is appended to the byte buffer, and the buffer
//! is only parsed once it ends with a complete-record terminator (`}\n\n`
//! or `[DONE]\n\n`). A partial trailing record is never parsed as complete,
//! regardless of where a chunk boundary falls.

/// Accumulates stream chunks and yields batches of complete records
#[derive(Debug, Default)]
pub struct RecordBuffer {
    buf: Vec<u8>,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk; returns the complete records it unlocked, if any
    ///
    /// An empty return means the buffer still ends mid-record and is being
    /// held for more input.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        if !self.buf.ends_with(b"}\n\n") && !self.buf.ends_with(b"[DONE]\n\n") {
            return Vec::new();
        }

        // Terminator seen: every record in the buffer is complete, so a
        // lossy decode cannot land mid-character.
        let text = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();

        text.split("\n\n")
            .filter(|record| !record.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether a partial record is still being held
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n";

    #[test]
    fn test_whole_record_in_one_chunk() {
        let mut buffer = RecordBuffer::new();
        let records = buffer.push(EVENT.as_bytes());
        assert_eq!(records.len(), 1);
        assert!(records[0].starts_with("data:"));
        assert!(!buffer.has_partial());
    }

    #[test]
    fn test_partial_record_is_held() {
        let mut buffer = RecordBuffer::new();
        let (head, tail) = EVENT.split_at(17);

        assert!(buffer.push(head.as_bytes()).is_empty());
        assert!(buffer.has_partial());

        let records = buffer.push(tail.as_bytes());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], EVENT.trim_end());
    }

    #[test]
    fn test_every_split_point_yields_same_records() {
        let stream = format!("{}{}data: [DONE]\n\n", EVENT, EVENT.replace("Hi", "there"));

        let mut reference = RecordBuffer::new();
        let expected = reference.push(stream.as_bytes());
        assert_eq!(expected.len(), 3);

        for split in 1..stream.len() {
            let mut buffer = RecordBuffer::new();
            let mut records = buffer.push(&stream.as_bytes()[..split]);
            records.extend(buffer.push(&stream.as_bytes()[split..]));
            assert_eq!(records, expected, "split at byte {}", split);
        }
    }

    #[test]
    fn test_split_inside_multibyte_character() {
        let event = "data: {\"choices\":[{\"delta\":{\"content\":\"你好。\"}}]}\n\n";
        let bytes = event.as_bytes();
        // Split in the middle of the three-byte 好
        let mid = event.find('好').unwrap() + 1;

        let mut buffer = RecordBuffer::new();
        assert!(buffer.push(&bytes[..mid]).is_empty());
        let records = buffer.push(&bytes[mid..]);
        assert_eq!(records.len(), 1);
        assert!(records[0].contains("你好。"));
    }

    #[test]
    fn test_done_sentinel_terminates_batch() {
        let mut buffer = RecordBuffer::new();
        let records = buffer.push(b"data: [DONE]\n\n");
        assert_eq!(records, vec!["data: [DONE]".to_string()]);
    }
}
