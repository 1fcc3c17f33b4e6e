//! Progress stream decoding
//!
//! Splits the raw byte stream of a deployment response into
//! `data: <json>\n\n` frames and decodes each one into a [`ProgressEvent`].

use oneclick_core::domain::event::{FRAME_SEPARATOR, ProgressEvent};

use crate::error::{ClientError, Result};

/// Incremental decoder for progress frames
///
/// Bytes may arrive split at arbitrary points, including inside a UTF-8
/// sequence; incomplete frames are kept until the rest arrives.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every event completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<ProgressEvent>> {
        self.pending.extend_from_slice(chunk);

        let separator = FRAME_SEPARATOR.as_bytes();
        let mut events = Vec::new();

        while let Some(pos) = find(&self.pending, separator) {
            let frame: Vec<u8> = self.pending.drain(..pos + separator.len()).collect();
            let text = String::from_utf8_lossy(&frame[..pos]);
            if text.trim().is_empty() {
                continue;
            }
            let event = ProgressEvent::from_frame(&text)
                .map_err(|e| ClientError::ParseError(format!("Invalid progress frame: {}", e)))?;
            events.push(event);
        }

        Ok(events)
    }

    /// Whether undecoded bytes remain buffered
    pub fn has_pending(&self) -> bool {
        self.pending.iter().any(|b| !b.is_ascii_whitespace())
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
