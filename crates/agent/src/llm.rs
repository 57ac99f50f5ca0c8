//! Streaming model client seam.
//!
//! The conversational model is an opaque streaming text generator: the
//! engine sends one tagged request and accumulates incremental deltas
//! until a terminal signal or the bounded wait elapses.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::timeout_at;

use crate::DeriveError;

/// An event in a streaming model response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// A text chunk to append to the response buffer.
    Delta(String),
    /// The complete response text; signals stream end.
    Completed(String),
    /// An error or abort from the model side; signals stream end.
    Error(String),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Error(_))
    }
}

/// One derivation request, tagged with an idempotency key so a retried
/// send cannot produce two generations for the same session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub idempotency_key: String,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn stream_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<mpsc::Receiver<StreamEvent>, DeriveError>;
}

/// Drains a response stream into a single candidate text.
///
/// `Completed` wins outright; an explicit `Error` fails the operation.
/// If no terminal signal arrives before `timeout`, the accumulated
/// partial buffer is returned when non-empty, otherwise the operation
/// fails with a timeout.
pub async fn collect_response(
    mut events: mpsc::Receiver<StreamEvent>,
    timeout: Duration,
) -> Result<String, DeriveError> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut buffer = String::new();

    loop {
        match timeout_at(deadline, events.recv()).await {
            Err(_elapsed) => {
                if buffer.is_empty() {
                    return Err(DeriveError::Timeout(timeout));
                }
                return Ok(buffer);
            }
            Ok(None) => {
                // Stream ended without a terminal signal; treat the
                // partial buffer like the timeout fallback.
                if buffer.is_empty() {
                    return Err(DeriveError::Stream(
                        "stream closed without a terminal signal".to_string(),
                    ));
                }
                return Ok(buffer);
            }
            Ok(Some(StreamEvent::Delta(chunk))) => buffer.push_str(&chunk),
            Ok(Some(StreamEvent::Completed(full))) => {
                return Ok(if full.is_empty() { buffer } else { full });
            }
            Ok(Some(StreamEvent::Error(message))) => return Err(DeriveError::Stream(message)),
        }
    }
}
