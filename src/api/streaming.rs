//! SSE frame handling for `streamGenerateContent` responses.
//!
//! The provider's loosely-typed chunk objects stop here: everything past
//! this adapter sees the typed `StreamEvent` union, and text is always the
//! full cumulative response so far, never a delta.

use crate::models::responses::GenerateContentResponse;
use crate::models::GroundingSource;

/// One typed update of an in-flight turn.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Full response text accumulated so far (replacement, not a delta).
    Text(String),
    /// Citation set for this turn; a later event overwrites an earlier one.
    Citations(Vec<GroundingSource>),
    /// The provider ended the turn.
    End,
}

/// Incremental splitter for SSE byte chunks. Frames are separated by a blank
/// line; only `data:` lines carry payloads.
///
/// Buffering stays at the byte level: network chunks can split a multibyte
/// UTF-8 character, so nothing is decoded until a full frame has arrived.
pub struct SseFrameBuffer {
    buffer: Vec<u8>,
}

impl SseFrameBuffer {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Feed raw bytes, returning the data payloads of every frame completed
    /// so far. Partial frames stay buffered until their terminator arrives.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        // CR only occurs in line endings; dropping it up front means the
        // frame terminator is always exactly "\n\n".
        self.buffer.extend(bytes.iter().filter(|&&b| b != b'\r'));

        let mut payloads = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let rest = self.buffer.split_off(end + 2);
            let frame = std::mem::replace(&mut self.buffer, rest);
            let frame = String::from_utf8_lossy(&frame[..end]);

            for line in frame.lines() {
                if let Some(data) = line.strip_prefix("data:") {
                    let data = data.trim_start();
                    if !data.is_empty() {
                        payloads.push(data.to_string());
                    }
                }
            }
        }
        payloads
    }
}

impl Default for SseFrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Folds raw chunk payloads into `StreamEvent`s, accumulating provider
/// deltas into cumulative text.
pub struct ChunkAccumulator {
    text: String,
}

impl ChunkAccumulator {
    pub fn new() -> Self {
        Self {
            text: String::new(),
        }
    }

    /// Cumulative text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Apply one frame payload. Unparseable frames are skipped.
    pub fn apply(&mut self, payload: &str) -> Vec<StreamEvent> {
        let Ok(chunk) = serde_json::from_str::<GenerateContentResponse>(payload) else {
            return Vec::new();
        };

        let mut events = Vec::new();
        let delta = chunk.text();
        if !delta.is_empty() {
            self.text.push_str(&delta);
            events.push(StreamEvent::Text(self.text.clone()));
        }
        let sources = chunk.sources();
        if !sources.is_empty() {
            events.push(StreamEvent::Citations(sources));
        }
        events
    }
}

impl Default for ChunkAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_chunk(text: &str) -> String {
        format!(
            r#"{{"candidates":[{{"content":{{"parts":[{{"text":"{}"}}]}}}}]}}"#,
            text
        )
    }

    #[test]
    fn splits_complete_frames() {
        let mut buffer = SseFrameBuffer::new();
        let payloads = buffer.push(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn buffers_partial_frames_across_pushes() {
        let mut buffer = SseFrameBuffer::new();
        assert!(buffer.push(b"data: {\"a\"").is_empty());
        assert!(buffer.push(b":1}").is_empty());
        let payloads = buffer.push(b"\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn multibyte_characters_survive_a_mid_character_chunk_split() {
        let mut buffer = SseFrameBuffer::new();
        // "€" is 0xE2 0x82 0xAC; the network may split it anywhere.
        let frame = "data: {\"text\":\"€10\"}\n\n".as_bytes();
        // Split one byte into the three-byte sequence.
        assert!(buffer.push(&frame[..16]).is_empty());
        let payloads = buffer.push(&frame[16..]);
        assert_eq!(payloads, vec!["{\"text\":\"€10\"}"]);
    }

    #[test]
    fn handles_crlf_line_endings() {
        let mut buffer = SseFrameBuffer::new();
        let payloads = buffer.push(b"data: {\"a\":1}\r\n\r\n");
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn ignores_non_data_lines() {
        let mut buffer = SseFrameBuffer::new();
        let payloads = buffer.push(b"event: ping\n: comment\ndata: {\"a\":1}\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn accumulates_deltas_into_cumulative_text() {
        let mut acc = ChunkAccumulator::new();
        let events = acc.apply(&text_chunk("Hel"));
        assert_eq!(events, vec![StreamEvent::Text("Hel".to_string())]);
        let events = acc.apply(&text_chunk("lo"));
        assert_eq!(events, vec![StreamEvent::Text("Hello".to_string())]);
        assert_eq!(acc.text(), "Hello");
    }

    #[test]
    fn emits_citations_alongside_text() {
        let mut acc = ChunkAccumulator::new();
        let payload = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "grounded"}]},
                "groundingMetadata": {
                    "groundingChunks": [{"web": {"uri": "https://a.example", "title": "A"}}]
                }
            }]
        }"#;
        let events = acc.apply(payload);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StreamEvent::Text("grounded".to_string()));
        match &events[1] {
            StreamEvent::Citations(sources) => assert_eq!(sources[0].uri, "https://a.example"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn malformed_payloads_are_skipped() {
        let mut acc = ChunkAccumulator::new();
        acc.apply(&text_chunk("keep"));
        assert!(acc.apply("{not json").is_empty());
        assert_eq!(acc.text(), "keep");
    }

    #[test]
    fn empty_chunks_produce_no_events() {
        let mut acc = ChunkAccumulator::new();
        assert!(acc.apply(r#"{"candidates":[{"finishReason":"STOP"}]}"#).is_empty());
    }
}
