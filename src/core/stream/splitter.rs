use memchr::memchr;
use tracing::warn;

/// Reassembles newline-terminated lines from arbitrarily sized chunks.
///
/// Bytes after the last newline are carried into the next push. A carry that
/// is still unterminated when the stream ends is discarded, never emitted.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    carry: Vec<u8>,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(relative) = memchr(b'\n', &self.carry[start..]) {
            let newline = start + relative;
            let mut end = newline;
            if end > start && self.carry[end - 1] == b'\r' {
                end -= 1;
            }
            lines.push(decode_line(&self.carry[start..end]));
            start = newline + 1;
        }

        if start > 0 {
            self.carry.drain(..start);
        }
        lines
    }

    pub fn push_str(&mut self, chunk: &str) -> Vec<String> {
        self.push(chunk.as_bytes())
    }

    /// Bytes currently held back waiting for a terminator.
    pub fn buffered(&self) -> usize {
        self.carry.len()
    }

    /// End of stream: drop any unterminated tail and report its size.
    pub fn finish(&mut self) -> Option<usize> {
        if self.carry.is_empty() {
            return None;
        }
        let discarded = self.carry.len();
        self.carry.clear();
        Some(discarded)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(err) => {
            warn!("invalid UTF-8 in stream frame: {err}");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_partial_line_until_terminated() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.push_str("data: one").is_empty());
        assert_eq!(splitter.buffered(), 9);
        assert_eq!(splitter.push_str("\ndata: tw"), vec!["data: one"]);
        assert_eq!(splitter.push_str("o\n\n"), vec!["data: two", ""]);
        assert_eq!(splitter.buffered(), 0);
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn emits_every_line_in_one_chunk() {
        let mut splitter = FrameSplitter::new();
        let lines = splitter.push_str("a\nb\r\nc\n");
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn finish_discards_unterminated_tail() {
        let mut splitter = FrameSplitter::new();
        assert_eq!(splitter.push_str("data: x\ndata: {\"content\""), vec!["data: x"]);
        assert_eq!(splitter.finish(), Some(16));
        assert_eq!(splitter.buffered(), 0);
        assert!(splitter.push_str("\n").iter().all(String::is_empty));
    }

    #[test]
    fn reassembles_multibyte_characters_split_across_chunks() {
        let text = "data: é\n";
        let bytes = text.as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).expect("lead byte") + 1;

        let mut splitter = FrameSplitter::new();
        assert!(splitter.push(&bytes[..split]).is_empty());
        assert_eq!(splitter.push(&bytes[split..]), vec!["data: é"]);
    }

    #[test]
    fn every_two_way_split_yields_the_same_line() {
        let frame = "data: {\"content\":\"X\"}\n";
        for split in 0..=frame.len() {
            let mut splitter = FrameSplitter::new();
            let mut lines = splitter.push_str(&frame[..split]);
            lines.extend(splitter.push_str(&frame[split..]));
            assert_eq!(lines, vec!["data: {\"content\":\"X\"}"], "split at {split}");
        }
    }
}
