//! In-memory [`ChannelService`] for tests, demos, and the `simulate` command.
//!
//! Join responses and push replies are scripted per topic. Every call is
//! recorded, and inbound reaction events can be injected with
//! [`LoopbackChannels::emit`] once the engine has asked to listen for them.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::channel::{ChannelService, JoinOptions};
use crate::error::ChannelError;
use crate::intake::EngineHandle;

/// One recorded call against the loopback service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum ChannelCall {
    Join {
        topic: String,
        options: JoinOptions,
    },
    Push {
        topic: String,
        event: String,
        payload: Value,
    },
}

#[derive(Default)]
struct Loopback {
    joined: BTreeSet<String>,
    join_responses: BTreeMap<String, Value>,
    join_failures: BTreeMap<String, Value>,
    replies: BTreeMap<(String, String), Result<Value, Value>>,
    listeners: BTreeMap<String, BTreeSet<String>>,
    calls: Vec<ChannelCall>,
    observers: Vec<UnboundedSender<ChannelCall>>,
}

impl Loopback {
    fn record(&mut self, call: ChannelCall) {
        self.observers.retain(|tx| tx.send(call.clone()).is_ok());
        self.calls.push(call);
    }
}

pub struct LoopbackChannels {
    handle: EngineHandle,
    inner: Mutex<Loopback>,
}

impl LoopbackChannels {
    pub fn new(handle: EngineHandle) -> Self {
        Self {
            handle,
            inner: Mutex::new(Loopback::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Loopback> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ─── Scripting ────────────────────────────────────────────────────────

    /// Response delivered with the first join confirmation of `topic`.
    /// Unscripted topics confirm with `null`.
    pub fn set_join_response(&self, topic: impl Into<String>, response: Value) {
        self.lock().join_responses.insert(topic.into(), response);
    }

    /// Reject every join of `topic` with `reason`.
    pub fn fail_join(&self, topic: impl Into<String>, reason: Value) {
        self.lock().join_failures.insert(topic.into(), reason);
    }

    /// Reply for pushes of `event` on `topic`: `Ok` is the server's
    /// response, `Err` its rejection reason. Unscripted pushes reply `{}`.
    pub fn set_reply(
        &self,
        topic: impl Into<String>,
        event: impl Into<String>,
        reply: Result<Value, Value>,
    ) {
        self.lock()
            .replies
            .insert((topic.into(), event.into()), reply);
    }

    /// Deliver a server-pushed event. Returns `false` when nothing listens
    /// for `event` on `topic` yet.
    pub fn emit(&self, topic: &str, event: &str, payload: Value) -> bool {
        let listening = self
            .lock()
            .listeners
            .get(topic)
            .is_some_and(|events| events.contains(event));
        if !listening {
            debug!(%topic, %event, "no listener; event dropped");
            return false;
        }
        match self.handle.reaction_occurred(topic, event, payload) {
            Ok(()) => true,
            Err(e) => {
                warn!(%topic, %event, error = %e, "could not deliver event");
                false
            }
        }
    }

    // ─── Inspection ───────────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<ChannelCall> {
        self.lock().calls.clone()
    }

    pub fn joins(&self, topic: &str) -> Vec<JoinOptions> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ChannelCall::Join { topic: t, options } if t == topic => Some(options.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(topic, event, payload)` of every push, in call order.
    pub fn pushes(&self) -> Vec<(String, String, Value)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ChannelCall::Push {
                    topic,
                    event,
                    payload,
                } => Some((topic.clone(), event.clone(), payload.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn listeners(&self, topic: &str) -> BTreeSet<String> {
        self.lock().listeners.get(topic).cloned().unwrap_or_default()
    }

    /// Receive every call made from now on.
    pub fn observe(&self) -> UnboundedReceiver<ChannelCall> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().observers.push(tx);
        rx
    }
}

#[async_trait]
impl ChannelService for LoopbackChannels {
    async fn join(&self, topic: &str, opts: JoinOptions) -> Result<(), ChannelError> {
        let confirmation = {
            let mut inner = self.lock();
            inner.record(ChannelCall::Join {
                topic: topic.to_owned(),
                options: opts.clone(),
            });
            if let Some(reason) = inner.join_failures.get(topic) {
                return Err(ChannelError::JoinRejected {
                    topic: topic.to_owned(),
                    reason: reason.clone(),
                });
            }
            if !opts.events.is_empty() {
                inner
                    .listeners
                    .entry(topic.to_owned())
                    .or_default()
                    .extend(opts.events);
            }
            if inner.joined.insert(topic.to_owned()) {
                Some(inner.join_responses.get(topic).cloned().unwrap_or(Value::Null))
            } else {
                None
            }
        };

        if let Some(response) = confirmation {
            debug!(%topic, "channel joined");
            self.handle
                .channel_joined(topic, response)
                .map_err(|_| ChannelError::Closed {
                    topic: topic.to_owned(),
                })?;
        }
        Ok(())
    }

    async fn push(&self, topic: &str, event: &str, payload: Value) -> Result<Value, ChannelError> {
        let mut inner = self.lock();
        inner.record(ChannelCall::Push {
            topic: topic.to_owned(),
            event: event.to_owned(),
            payload,
        });
        if !inner.joined.contains(topic) {
            return Err(ChannelError::Closed {
                topic: topic.to_owned(),
            });
        }
        match inner.replies.get(&(topic.to_owned(), event.to_owned())) {
            Some(Ok(reply)) => Ok(reply.clone()),
            Some(Err(reason)) => Err(ChannelError::PushRejected {
                topic: topic.to_owned(),
                event: event.to_owned(),
                reason: reason.clone(),
            }),
            None => Ok(json!({})),
        }
    }
}
