//! Progress event domain types
//!
//! A deployment reports its progress as an ordered sequence of events. Every
//! run ends with exactly one terminal event (`Done` or `Error`).

use serde::{Deserialize, Serialize};

/// Prefix of every frame on the progress stream
pub const FRAME_PREFIX: &str = "data: ";

/// Separator between two frames on the progress stream
pub const FRAME_SEPARATOR: &str = "\n\n";

/// A single progress event
///
/// Serializes as `{"status": ...}`, `{"done": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Human readable status line
    Status(String),
    /// Successful completion carrying the deployment identifier
    Done(String),
    /// Failed completion carrying the error message
    Error(String),
}

impl ProgressEvent {
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status(message.into())
    }

    pub fn done(deployment_name: impl Into<String>) -> Self {
        Self::Done(deployment_name.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Status(_))
    }

    /// Encodes the event as a `data: <json>\n\n` frame
    pub fn to_frame(&self) -> serde_json::Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{FRAME_PREFIX}{json}{FRAME_SEPARATOR}"))
    }

    /// Decodes a single frame (with or without its trailing separator)
    pub fn from_frame(frame: &str) -> serde_json::Result<Self> {
        let trimmed = frame.trim();
        let json = trimmed.strip_prefix(FRAME_PREFIX.trim_end()).unwrap_or(trimmed);
        serde_json::from_str(json.trim_start())
    }
}
