//! Incremental JSON-array framing.
//!
//! [`ArrayFramer`] pulls bytes from a `BufRead` source and slices out
//! one complete top-level array element at a time, without ever
//! materializing the surrounding array. Framing is purely lexical:
//! strings (with escapes), balanced braces/brackets, numbers, and
//! literals are recognized, but element contents are not validated;
//! the parser downstream does that on the framed bytes.
//!
//! Separators are consumed lazily, at the start of the *next* pull, so
//! an element is handed out as soon as its own bytes are complete.

use std::io::{BufRead, ErrorKind};

use crate::error::TransferError;

/// Streaming framer over a JSON array.
pub struct ArrayFramer<R> {
    reader: R,
    /// Bytes of the element currently in flight, reused across pulls.
    buf: Vec<u8>,
    /// Completed elements handed out so far.
    index: u64,
    started: bool,
    finished: bool,
    after_value: bool,
}

impl<R: BufRead> ArrayFramer<R> {
    pub fn new(reader: R) -> Self {
        ArrayFramer {
            reader,
            buf: Vec::new(),
            index: 0,
            started: false,
            finished: false,
            after_value: false,
        }
    }

    /// Number of elements framed so far.
    pub fn elements_framed(&self) -> u64 {
        self.index
    }

    /// Frame the next array element, or `None` once the closing `]` has
    /// been consumed. The returned buffer is only valid until the next
    /// pull and may be mutated by the caller (in-place parsers).
    pub fn next_element(&mut self) -> Result<Option<&mut Vec<u8>>, TransferError> {
        if self.finished {
            return Ok(None);
        }
        if !self.started {
            self.expect_array_open()?;
        }

        self.skip_whitespace()?;
        if self.after_value {
            match self.peek()? {
                Some(b',') => {
                    self.bump();
                    self.after_value = false;
                    self.skip_whitespace()?;
                    if self.peek()? == Some(b']') {
                        return Err(self.malformed("trailing comma before ']'"));
                    }
                }
                Some(b']') => {
                    self.bump();
                    self.finished = true;
                    return Ok(None);
                }
                Some(other) => {
                    return Err(self.malformed(format!(
                        "expected ',' or ']' after element, found '{}'",
                        other as char
                    )))
                }
                None => return Err(self.malformed("unterminated array")),
            }
        } else if self.peek()? == Some(b']') {
            self.bump();
            self.finished = true;
            return Ok(None);
        }

        self.scan_value()?;
        self.index += 1;
        self.after_value = true;
        Ok(Some(&mut self.buf))
    }

    fn expect_array_open(&mut self) -> Result<(), TransferError> {
        self.skip_whitespace()?;
        match self.peek()? {
            Some(b'[') => {
                self.bump();
                self.started = true;
                Ok(())
            }
            Some(other) => Err(self.malformed(format!(
                "expected '[' at start of payload, found '{}'",
                other as char
            ))),
            None => Err(self.malformed("empty payload, expected a JSON array")),
        }
    }

    fn scan_value(&mut self) -> Result<(), TransferError> {
        self.buf.clear();
        match self.peek()? {
            Some(b'{') | Some(b'[') => self.scan_container(),
            Some(b'"') => self.scan_string(),
            Some(b'-') | Some(b'0'..=b'9') => self.scan_number(),
            Some(b't') | Some(b'f') | Some(b'n') => self.scan_literal(),
            Some(other) => Err(self.malformed(format!(
                "unexpected character '{}' at start of element",
                other as char
            ))),
            None => Err(self.malformed("unterminated array")),
        }
    }

    /// Consume one balanced object or array, tracking strings so that
    /// brackets inside them do not count.
    fn scan_container(&mut self) -> Result<(), TransferError> {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        loop {
            let Some(byte) = self.peek()? else {
                return Err(self.malformed("unexpected end of input inside element"));
            };
            self.bump();
            self.buf.push(byte);

            if in_string {
                if escaped {
                    escaped = false;
                } else if byte == b'\\' {
                    escaped = true;
                } else if byte == b'"' {
                    in_string = false;
                }
                continue;
            }

            match byte {
                b'"' => in_string = true,
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }

    fn scan_string(&mut self) -> Result<(), TransferError> {
        // Opening quote.
        self.bump();
        self.buf.push(b'"');
        let mut escaped = false;

        loop {
            let Some(byte) = self.peek()? else {
                return Err(self.malformed("unexpected end of input inside string"));
            };
            self.bump();
            self.buf.push(byte);

            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                return Ok(());
            }
        }
    }

    fn scan_number(&mut self) -> Result<(), TransferError> {
        while let Some(byte) = self.peek()? {
            if byte.is_ascii_digit() || matches!(byte, b'-' | b'+' | b'.' | b'e' | b'E') {
                self.bump();
                self.buf.push(byte);
            } else {
                break;
            }
        }
        Ok(())
    }

    fn scan_literal(&mut self) -> Result<(), TransferError> {
        while let Some(byte) = self.peek()? {
            if byte.is_ascii_alphabetic() {
                self.bump();
                self.buf.push(byte);
            } else {
                break;
            }
        }
        Ok(())
    }

    fn skip_whitespace(&mut self) -> Result<(), TransferError> {
        while let Some(byte) = self.peek()? {
            if matches!(byte, b' ' | b'\t' | b'\n' | b'\r') {
                self.bump();
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Peek the next byte without consuming it. A closed or failing
    /// input stream surfaces here as `InputClosed`; clean end-of-input
    /// is `None` and is judged by the caller.
    fn peek(&mut self) -> Result<Option<u8>, TransferError> {
        loop {
            match self.reader.fill_buf() {
                Ok(bytes) => return Ok(bytes.first().copied()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransferError::InputClosed { source: err }),
            }
        }
    }

    fn bump(&mut self) {
        self.reader.consume(1);
    }

    fn malformed(&self, detail: impl Into<String>) -> TransferError {
        TransferError::MalformedPayload {
            position: self.index + 1,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Read};

    fn frame_all(input: &str) -> Result<Vec<String>, TransferError> {
        let mut framer = ArrayFramer::new(input.as_bytes());
        let mut elements = Vec::new();
        while let Some(bytes) = framer.next_element()? {
            elements.push(String::from_utf8(bytes.clone()).unwrap());
        }
        Ok(elements)
    }

    #[test]
    fn frames_objects_scalars_and_nested_arrays() {
        let elements = frame_all(
            r#"[ {"ID": 1, "texts": [{"x": "]"}]}, "str;]", 42, -3.5e2, true, null ]"#,
        )
        .unwrap();
        assert_eq!(
            elements,
            vec![
                r#"{"ID": 1, "texts": [{"x": "]"}]}"#,
                r#""str;]""#,
                "42",
                "-3.5e2",
                "true",
                "null"
            ]
        );
    }

    #[test]
    fn empty_array_yields_nothing() {
        assert!(frame_all("  [ ] ").unwrap().is_empty());
    }

    #[test]
    fn escaped_quotes_do_not_end_strings() {
        let elements = frame_all(r#"[{"t": "a\"b\\"}]"#).unwrap();
        assert_eq!(elements, vec![r#"{"t": "a\"b\\"}"#]);
    }

    #[test]
    fn non_array_payload_is_malformed_at_position_one() {
        let err = frame_all(r#"{"ID": 1}"#).unwrap_err();
        assert!(
            matches!(err, TransferError::MalformedPayload { position: 1, .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn truncated_array_is_malformed() {
        let err = frame_all(r#"[{"ID": 1}, {"ID": 2}"#).unwrap_err();
        assert!(matches!(
            err,
            TransferError::MalformedPayload { position: 3, .. }
        ));
    }

    #[test]
    fn trailing_comma_is_malformed() {
        let err = frame_all(r#"[{"ID": 1},]"#).unwrap_err();
        assert!(matches!(
            err,
            TransferError::MalformedPayload { position: 2, .. }
        ));
    }

    #[test]
    fn missing_separator_is_malformed() {
        let err = frame_all(r#"[1 2]"#).unwrap_err();
        assert!(matches!(
            err,
            TransferError::MalformedPayload { position: 2, .. }
        ));
    }

    /// Counts how many bytes the framer has actually pulled from the
    /// underlying source.
    struct TrackingReader<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl Read for TrackingReader<'_> {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            let n = out.len().min(self.data.len() - self.pos);
            out[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn reads_incrementally_not_wholesale() {
        // 1000 elements; framing the first must not slurp the payload.
        let elements: Vec<String> = (0..1000).map(|i| format!(r#"{{"ID": {i}}}"#)).collect();
        let payload = format!("[{}]", elements.join(","));
        let total = payload.len();

        let tracking = TrackingReader {
            data: payload.as_bytes(),
            pos: 0,
        };
        let mut framer = ArrayFramer::new(BufReader::with_capacity(16, tracking));

        let first = framer.next_element().unwrap().unwrap().clone();
        assert_eq!(String::from_utf8(first).unwrap(), r#"{"ID": 0}"#);

        // Only the first element plus at most one 16-byte read-ahead.
        let consumed = framer.reader.get_ref().pos;
        assert!(
            consumed < 64,
            "framer consumed {consumed} of {total} bytes after one element"
        );
    }

    /// Fails with an I/O error once its data is exhausted.
    struct ClosingReader<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl Read for ClosingReader<'_> {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            if self.pos == self.data.len() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "input aborted",
                ));
            }
            let n = out.len().min(self.data.len() - self.pos);
            out[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn aborted_input_surfaces_as_input_closed() {
        let payload = br#"[{"ID": 1}, {"ID": 2}"#;
        let closing = ClosingReader {
            data: payload,
            pos: 0,
        };
        let mut framer = ArrayFramer::new(BufReader::with_capacity(8, closing));

        assert!(framer.next_element().unwrap().is_some());
        assert!(framer.next_element().unwrap().is_some());
        let err = framer.next_element().unwrap_err();
        assert!(matches!(err, TransferError::InputClosed { .. }));
        assert_eq!(framer.elements_framed(), 2);
    }
}
