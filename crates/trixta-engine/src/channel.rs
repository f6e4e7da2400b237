use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::ChannelError;

/// Options for [`ChannelService::join`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinOptions {
    pub log_presence: bool,
    /// Inbound event names to forward as reaction occurrences through
    /// [`EngineHandle::reaction_occurred`](crate::intake::EngineHandle::reaction_occurred).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
}

impl JoinOptions {
    pub fn presence(log_presence: bool) -> Self {
        Self {
            log_presence,
            events: Vec::new(),
        }
    }

    pub fn listening(events: Vec<String>) -> Self {
        Self {
            log_presence: false,
            events,
        }
    }
}

/// The channel-messaging collaborator.
///
/// Implementations own the physical connection. Two inbound paths flow back
/// into the engine through an [`EngineHandle`](crate::intake::EngineHandle):
/// a join confirmation (`channel_joined`) after the first successful join of
/// a topic, and reaction occurrences (`reaction_occurred`) for every event
/// name registered through [`JoinOptions::events`].
///
/// `join` must be idempotent: joining an already-joined topic only adds the
/// requested event listeners and must not deliver a second join confirmation.
#[async_trait]
pub trait ChannelService: Send + Sync {
    async fn join(&self, topic: &str, opts: JoinOptions) -> Result<(), ChannelError>;

    /// Push `payload` under `event` and wait for the server's reply.
    async fn push(&self, topic: &str, event: &str, payload: Value) -> Result<Value, ChannelError>;
}
