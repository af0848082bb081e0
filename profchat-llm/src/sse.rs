//! Line decoder for `text/event-stream` bodies.
//!
//! Only `data:` fields are surfaced; comments, `event:`/`id:`/`retry:` fields
//! and blank separators are dropped. Each `data:` line is reported on its own,
//! which is how OpenAI-style completion streams use the format.

use bytes::BytesMut;

pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw body bytes and returns the payloads of every `data:` line
    /// completed by them. Partial lines stay buffered for the next call.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            if let Some(data) = parse_sse_line(&String::from_utf8_lossy(&line)) {
                out.push(data.to_string());
            }
        }
        out
    }

    /// Drains a trailing line that never got its newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = self.buffer.split();
        parse_sse_line(&String::from_utf8_lossy(&rest)).map(ToString::to_string)
    }
}

pub fn parse_sse_line(line: &str) -> Option<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    let data = line.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data))
}
