use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::mpsc;
use trixta_core::event::EngineEvent;

use crate::error::{EngineError, Result};

// ─── EventSink ────────────────────────────────────────────────────────────

/// Where the engine sends its state-transition events.
///
/// The engine never reads state back; a sink is expected to apply events in
/// the order they are dispatched.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn dispatch(&self, event: EngineEvent) -> Result<()>;
}

#[async_trait]
impl EventSink for mpsc::UnboundedSender<EngineEvent> {
    async fn dispatch(&self, event: EngineEvent) -> Result<()> {
        self.send(event).map_err(|_| EngineError::SinkClosed)
    }
}

// ─── EventStream ──────────────────────────────────────────────────────────

/// An async stream of the events an engine emitted, in emission order.
///
/// ```rust,ignore
/// let (sink, mut events) = trixta_engine::sink::event_channel();
/// let supervisor = Supervisor::start(config, channels, sink);
/// while let Some(event) = events.next().await {
///     println!("{}", event.kind());
/// }
/// ```
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<EngineEvent>,
}

impl EventStream {
    /// Non-blocking receive, for draining after the engine settles.
    pub fn try_next(&mut self) -> Option<EngineEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for EventStream {
    type Item = EngineEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// A sink paired with the stream of everything dispatched to it.
pub fn event_channel() -> (Arc<dyn EventSink>, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(tx), EventStream { rx })
}
