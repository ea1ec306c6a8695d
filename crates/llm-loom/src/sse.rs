//! Incremental parser for `text/event-stream` responses.
//!
//! Raw transport chunks arrive at arbitrary boundaries — mid-line,
//! mid-UTF-8-sequence, several events at once. [`SseParser`] buffers
//! them, splits on newlines, strips `data: ` prefixes, and yields one
//! JSON [`Value`] per well-formed frame. The `[DONE]` sentinel
//! terminates the stream cleanly even if more bytes follow.
//!
//! Streaming must tolerate partial frames: a malformed JSON line is
//! dropped silently. A consecutive run of more than
//! [`MALFORMED_FRAME_LIMIT`] malformed frames aborts the stream
//! instead, so a garbage response cannot fail silently forever.

use serde_json::Value;

use crate::error::LoomError;

/// Consecutive malformed frames tolerated before the stream errors.
pub const MALFORMED_FRAME_LIMIT: usize = 16;

/// Buffered bytes tolerated before the stream errors.
const MAX_BUFFER: usize = 16 * 1024 * 1024;

/// One parsed event from the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// A well-formed `data:` frame, JSON-parsed.
    Frame(Value),
    /// The `[DONE]` sentinel.
    Done,
}

/// Incremental SSE frame parser.
///
/// Feed raw chunks with [`push`](Self::push); each call returns the
/// events completed by that chunk, in arrival order.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    utf8_tail: Vec<u8>,
    malformed_run: usize,
    done: bool,
}

impl SseParser {
    /// Creates an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consumes one raw chunk and returns the events it completed.
    ///
    /// # Errors
    ///
    /// [`LoomError::ResponseFormat`] when the buffer grows past 16 MiB
    /// without a newline, or when more than
    /// [`MALFORMED_FRAME_LIMIT`] consecutive frames fail to parse.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, LoomError> {
        if self.done {
            return Ok(Vec::new());
        }

        self.buffer_utf8(chunk)?;

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            let Some(data) = line.strip_prefix("data:").map(|d| d.trim_start()) else {
                // Comments, `event:` lines, and blank separators.
                continue;
            };

            if data == "[DONE]" {
                self.done = true;
                events.push(SseEvent::Done);
                // Anything after the sentinel is ignored.
                self.buffer.clear();
                self.utf8_tail.clear();
                break;
            }

            match serde_json::from_str::<Value>(data) {
                Ok(frame) => {
                    self.malformed_run = 0;
                    events.push(SseEvent::Frame(frame));
                }
                Err(_) => {
                    self.malformed_run += 1;
                    if self.malformed_run > MALFORMED_FRAME_LIMIT {
                        return Err(LoomError::ResponseFormat {
                            message: format!(
                                "{} consecutive malformed streaming frames",
                                self.malformed_run
                            ),
                            raw: data.to_string(),
                        });
                    }
                }
            }
        }

        Ok(events)
    }

    /// Appends a chunk, holding back a trailing partial UTF-8 sequence
    /// for the next call.
    fn buffer_utf8(&mut self, chunk: &[u8]) -> Result<(), LoomError> {
        self.utf8_tail.extend_from_slice(chunk);
        if self.utf8_tail.len() + self.buffer.len() > MAX_BUFFER {
            self.utf8_tail.clear();
            self.buffer.clear();
            return Err(LoomError::response_format("SSE buffer exceeded 16 MiB"));
        }

        match std::str::from_utf8(&self.utf8_tail) {
            Ok(text) => {
                self.buffer.push_str(text);
                self.utf8_tail.clear();
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                if valid_up_to > 0 {
                    // SAFETY: `from_utf8` validated bytes up to this
                    // index as well-formed UTF-8.
                    let valid =
                        unsafe { std::str::from_utf8_unchecked(&self.utf8_tail[..valid_up_to]) };
                    self.buffer.push_str(valid);
                }
                match e.error_len() {
                    // A sequence that can never complete: skip it.
                    Some(bad) => {
                        self.utf8_tail.drain(..valid_up_to + bad);
                    }
                    // An incomplete trailing sequence: keep it buffered.
                    None => {
                        self.utf8_tail.drain(..valid_up_to);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frames(events: Vec<SseEvent>) -> Vec<Value> {
        events
            .into_iter()
            .filter_map(|e| match e {
                SseEvent::Frame(v) => Some(v),
                SseEvent::Done => None,
            })
            .collect()
    }

    #[test]
    fn test_single_frame() {
        let mut parser = SseParser::new();
        let events = parser
            .push(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n")
            .unwrap();
        assert_eq!(
            frames(events),
            vec![json!({"choices":[{"delta":{"content":"Hel"}}]})]
        );
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"data: {\"a\"").unwrap().is_empty());
        let events = parser.push(b": 1}\n").unwrap();
        assert_eq!(frames(events), vec![json!({"a": 1})]);
    }

    #[test]
    fn test_multiple_frames_one_chunk() {
        let mut parser = SseParser::new();
        let events = parser
            .push(b"data: {\"a\":1}\n\ndata: {\"a\":2}\n\n")
            .unwrap();
        assert_eq!(frames(events), vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[test]
    fn test_done_sentinel() {
        let mut parser = SseParser::new();
        let events = parser.push(b"data: [DONE]\n").unwrap();
        assert_eq!(events, vec![SseEvent::Done]);
        assert!(parser.is_done());
    }

    #[test]
    fn test_done_mid_stream_ignores_following_bytes() {
        let mut parser = SseParser::new();
        let events = parser
            .push(b"data: {\"a\":1}\ndata: [DONE]\ndata: {\"a\":2}\n")
            .unwrap();
        assert_eq!(
            events,
            vec![SseEvent::Frame(json!({"a": 1})), SseEvent::Done]
        );
        // Later pushes are no-ops.
        assert!(parser.push(b"data: {\"a\":3}\n").unwrap().is_empty());
    }

    #[test]
    fn test_non_data_lines_ignored() {
        let mut parser = SseParser::new();
        let events = parser
            .push(b"event: message_start\n: keep-alive\n\ndata: {\"ok\":true}\n")
            .unwrap();
        assert_eq!(frames(events), vec![json!({"ok": true})]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut parser = SseParser::new();
        let events = parser.push(b"data: {\"a\":1}\r\n\r\n").unwrap();
        assert_eq!(frames(events), vec![json!({"a": 1})]);
    }

    #[test]
    fn test_data_prefix_without_space() {
        let mut parser = SseParser::new();
        let events = parser.push(b"data:{\"a\":1}\n").unwrap();
        assert_eq!(frames(events), vec![json!({"a": 1})]);
    }

    #[test]
    fn test_malformed_frame_dropped_silently() {
        let mut parser = SseParser::new();
        let events = parser
            .push(b"data: not json\ndata: {\"a\":1}\n")
            .unwrap();
        assert_eq!(frames(events), vec![json!({"a": 1})]);
    }

    #[test]
    fn test_malformed_run_aborts_stream() {
        let mut parser = SseParser::new();
        let mut result = Ok(Vec::new());
        for _ in 0..=MALFORMED_FRAME_LIMIT {
            result = parser.push(b"data: not json\n");
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(LoomError::ResponseFormat { .. })));
    }

    #[test]
    fn test_well_formed_frame_resets_malformed_run() {
        let mut parser = SseParser::new();
        for _ in 0..MALFORMED_FRAME_LIMIT {
            parser.push(b"data: not json\n").unwrap();
        }
        parser.push(b"data: {\"ok\":1}\n").unwrap();
        // The run starts over; the next malformed frame is frame #1.
        assert!(parser.push(b"data: not json\n").is_ok());
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let mut parser = SseParser::new();
        let payload = "data: {\"text\":\"héllo\"}\n".as_bytes();
        // Split inside the two-byte 'é' sequence.
        let split = payload.iter().position(|&b| b == 0xc3).unwrap() + 1;
        assert!(parser.push(&payload[..split]).unwrap().is_empty());
        let events = parser.push(&payload[split..]).unwrap();
        assert_eq!(frames(events), vec![json!({"text": "héllo"})]);
    }

    #[test]
    fn test_empty_chunk() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"").unwrap().is_empty());
    }
}
