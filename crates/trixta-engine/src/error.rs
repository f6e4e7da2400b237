use serde_json::Value;
use thiserror::Error;
use trixta_core::TrixtaError;

/// Transport-level fault reported by a [`ChannelService`](crate::channel::ChannelService).
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("join rejected for '{topic}': {reason}")]
    JoinRejected { topic: String, reason: Value },

    #[error("push '{event}' rejected on '{topic}': {reason}")]
    PushRejected {
        topic: String,
        event: String,
        reason: Value,
    },

    #[error("channel '{topic}' closed")]
    Closed { topic: String },
}

impl ChannelError {
    /// The error payload recorded in status and passed to `errorEvent`:
    /// the server's reason when it gave one, otherwise the message.
    pub fn reason(&self) -> Value {
        match self {
            ChannelError::JoinRejected { reason, .. } | ChannelError::PushRejected { reason, .. } => {
                reason.clone()
            }
            other => Value::String(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] TrixtaError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("engine stopped: {0} intake is closed")]
    Stopped(&'static str),

    #[error("event sink closed")]
    SinkClosed,

    #[error("worker '{0}' panicked: {1}")]
    WorkerPanicked(&'static str, String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
