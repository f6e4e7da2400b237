//! In-process state store.
//!
//! [`Store`] is an [`EventSink`] that applies every event to a
//! [`TrixtaState`] and then fans it out to subscribers. Subscribers that lag
//! behind lose the oldest events; the state itself never misses one.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};
use trixta_core::config::InstancePolicy;
use trixta_core::event::EngineEvent;
use trixta_core::state::TrixtaState;

use crate::error::Result;
use crate::sink::EventSink;

const BROADCAST_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct Store {
    state: Arc<RwLock<TrixtaState>>,
    tx: broadcast::Sender<EngineEvent>,
}

impl Store {
    pub fn new(policy: InstancePolicy) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(TrixtaState::new(policy))),
            tx,
        }
    }

    pub async fn snapshot(&self) -> TrixtaState {
        self.state.read().await.clone()
    }

    /// Run `f` against the current state without cloning it.
    pub async fn read<R>(&self, f: impl FnOnce(&TrixtaState) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    /// Every event applied from now on, in application order.
    pub fn subscribe(&self) -> Pin<Box<dyn Stream<Item = EngineEvent> + Send>> {
        let stream = BroadcastStream::new(self.tx.subscribe()).filter_map(|item| async move {
            match item {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(error = %e, "store subscriber lagged");
                    None
                }
            }
        });
        Box::pin(stream)
    }
}

#[async_trait]
impl EventSink for Store {
    async fn dispatch(&self, event: EngineEvent) -> Result<()> {
        debug!(kind = event.kind(), "applying event");
        // Hold the write lock across the broadcast so subscribers observe
        // events in the same order the state applied them.
        let mut state = self.state.write().await;
        state.apply(&event);
        let _ = self.tx.send(event);
        Ok(())
    }
}
