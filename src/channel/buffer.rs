//! Pattern buffer with efficient tail-search optimization.
//!
//! Prompt patterns are only searched in the last `search_depth` bytes of
//! the accumulated output, re-anchored at the first newline inside that
//! window so a partial line is never matched. For large outputs (a full
//! running-config, BGP tables), this avoids re-scanning the whole buffer
//! on every arriving chunk.

use memchr::memmem;
use regex::bytes::Regex;

/// Remove bytes the pattern matcher must never see: ANSI escape
/// sequences, NUL bytes, and carriage returns.
pub(crate) fn sanitize(data: &[u8]) -> Vec<u8> {
    let cleaned = strip_ansi_escapes::strip(data);
    cleaned
        .into_iter()
        .filter(|&b| b != 0 && b != b'\r')
        .collect()
}

/// Buffer accumulating sanitized output for one channel, searched from
/// the tail.
#[derive(Debug)]
pub struct PatternBuffer {
    buffer: Vec<u8>,

    /// How many bytes from the end to search for prompt patterns.
    search_depth: usize,
}

impl PatternBuffer {
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
        }
    }

    /// Append already-sanitized data.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// The tail window prompt patterns are matched against: the last
    /// `search_depth` bytes, cut at the first newline inside the window so
    /// the region never starts mid-line.
    fn tail_window(&self) -> (usize, &[u8]) {
        if self.buffer.len() <= self.search_depth {
            return (0, &self.buffer);
        }

        let start = self.buffer.len() - self.search_depth;
        let tail = &self.buffer[start..];

        match memchr::memchr(b'\n', tail) {
            // Keep the newline so `(?m)^` anchors still apply
            Some(idx) => (start + idx, &tail[idx..]),
            None => (start, tail),
        }
    }

    /// Search the tail window for a pattern. Returns absolute byte offsets
    /// into the buffer.
    pub fn search_tail(&self, pattern: &Regex) -> Option<(usize, usize)> {
        let (offset, window) = self.tail_window();
        pattern
            .find(window)
            .map(|m| (offset + m.start(), offset + m.end()))
    }

    /// Search the entire buffer for a literal marker. Returns absolute
    /// byte offsets.
    pub fn find_explicit(&self, marker: &[u8]) -> Option<(usize, usize)> {
        memmem::find(&self.buffer, marker).map(|start| (start, start + marker.len()))
    }

    /// Fuzzy containment: every byte of `input` appears in order in the
    /// buffer, tolerating interleaved control characters. Returns the
    /// position just past the earliest completion, so only the echoed
    /// input is consumed and any output already buffered behind it is
    /// left for the next read. Used for echo detection on devices that
    /// mangle echoed input.
    pub fn fuzzy_find(&self, input: &[u8]) -> Option<usize> {
        let mut want = input.iter();
        let mut next = want.next();

        for (pos, b) in self.buffer.iter().enumerate() {
            match next {
                Some(w) if w == b => {
                    next = want.next();
                    if next.is_none() {
                        return Some(pos + 1);
                    }
                }
                Some(_) => {}
                None => return Some(pos),
            }
        }

        if next.is_none() { Some(self.buffer.len()) } else { None }
    }

    /// Remove and return the first `end` bytes. Anything after `end`
    /// stays buffered for the next operation.
    pub fn split_to(&mut self, end: usize) -> Vec<u8> {
        let rest = self.buffer.split_off(end.min(self.buffer.len()));
        std::mem::replace(&mut self.buffer, rest)
    }

    /// Take ownership of the whole buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn search_depth(&self) -> usize {
        self.search_depth
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(crate::channel::config::DEFAULT_SEARCH_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_ansi_nul_and_cr() {
        let cleaned = sanitize(b"\x1b[32mgreen\x1b[0m\r\n\x00done");
        assert_eq!(cleaned, b"green\ndone");
    }

    #[test]
    fn tail_search_finds_prompt_past_filler() {
        let mut buffer = PatternBuffer::new(100);
        let mut data = vec![b'x'; 10_000];
        data.extend_from_slice(b"\nrouter#");
        buffer.extend(&data);

        let pattern = Regex::new(r"(?m)^router#$").unwrap();
        let (start, end) = buffer.search_tail(&pattern).unwrap();
        assert_eq!(&buffer.as_slice()[start..end], b"router#");
        assert_eq!(end, buffer.len());
    }

    #[test]
    fn tail_window_never_starts_mid_line() {
        let mut buffer = PatternBuffer::new(12);
        // "#" lands inside the raw 12-byte tail but on a partial line; the
        // window is cut at the following newline, so only the final line
        // is searched.
        buffer.extend(b"xxxxxxxx ab#cd\nrouter>");

        let pattern = Regex::new(r"#").unwrap();
        assert!(buffer.search_tail(&pattern).is_none());

        let prompt = Regex::new(r">\s*$").unwrap();
        assert!(buffer.search_tail(&prompt).is_some());
    }

    #[test]
    fn search_outside_window_misses() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"router#");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"router#").unwrap();
        assert!(buffer.search_tail(&pattern).is_none());
    }

    #[test]
    fn split_to_keeps_remainder() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"password: leftover");
        let consumed = buffer.split_to(10);
        assert_eq!(consumed, b"password: ");
        assert_eq!(buffer.as_slice(), b"leftover");
    }

    #[test]
    fn fuzzy_find_tolerates_interleaving() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"s h o w  v e r s i o n");
        assert_eq!(buffer.fuzzy_find(b"show version"), Some(buffer.len()));
        assert_eq!(buffer.fuzzy_find(b"show version detail"), None);
    }

    #[test]
    fn fuzzy_find_stops_at_echo_end() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"show version\nSoftware 1.2.3\nrouter#");
        // Only the echoed input is consumed; the output stays buffered
        assert_eq!(buffer.fuzzy_find(b"show version"), Some(12));
    }

    #[test]
    fn find_explicit_searches_whole_buffer() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"marker here");
        buffer.extend(&[b'x'; 50]);
        assert_eq!(buffer.find_explicit(b"marker"), Some((0, 6)));
    }
}
