//! Trigger intake: the queues the supervisor's watcher loops consume.
//!
//! External callers and the channel service feed triggers in through an
//! [`EngineHandle`]. Completions of in-flight pushes are routed back through
//! the crate-private [`Completions`] sender onto four dedicated queues.

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use trixta_core::role::Role;
use trixta_core::status::StatusKey;

use crate::error::{ChannelError, EngineError, Result};

/// Carrier field naming the caller's success side event.
pub const RESPONSE_EVENT_FIELD: &str = "responseEvent";
/// Carrier field naming the caller's failure side event.
pub const ERROR_EVENT_FIELD: &str = "errorEvent";

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

/// A join confirmation delivered by the channel service.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelJoin {
    pub topic: String,
    /// Join response; holds `contract_actions` / `contract_reactions`.
    pub response: Value,
}

/// One server-pushed reaction event on a role channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionOccurrence {
    pub topic: String,
    pub event_name: String,
    pub payload: Value,
}

/// A client request to invoke an action on a role.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActionSubmission {
    pub role: String,
    pub action: String,
    #[serde(default)]
    pub form_data: Value,
    #[serde(default)]
    pub response_event: Option<String>,
    #[serde(default)]
    pub error_event: Option<String>,
    /// Falls back to the engine config's `debug_mode` when unset.
    #[serde(default)]
    pub debug_mode: Option<bool>,
    #[serde(default)]
    pub debug_options: Map<String, Value>,
    /// Extra request fields; these win over debug options on collision.
    #[serde(default)]
    pub action_options: Map<String, Value>,
}

impl ActionSubmission {
    pub fn new(role: impl Into<String>, action: impl Into<String>, form_data: Value) -> Self {
        Self {
            role: role.into(),
            action: action.into(),
            form_data,
            ..Self::default()
        }
    }

    pub fn response_event(mut self, event: impl Into<String>) -> Self {
        self.response_event = Some(event.into());
        self
    }

    pub fn error_event(mut self, event: impl Into<String>) -> Self {
        self.error_event = Some(event.into());
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug_mode = Some(enabled);
        self
    }

    pub fn debug_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.debug_options.insert(key.into(), value);
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.action_options.insert(key.into(), value);
        self
    }
}

/// A client reply to one reaction invitation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReactionReply {
    pub role: String,
    pub reaction: String,
    /// The invitation's server-issued ref.
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub form_data: Value,
    #[serde(default)]
    pub response_event: Option<String>,
    #[serde(default)]
    pub error_event: Option<String>,
}

impl ReactionReply {
    pub fn new(
        role: impl Into<String>,
        reaction: impl Into<String>,
        reference: impl Into<String>,
        form_data: Value,
    ) -> Self {
        Self {
            role: role.into(),
            reaction: reaction.into(),
            reference: reference.into(),
            form_data,
            ..Self::default()
        }
    }

    pub fn response_event(mut self, event: impl Into<String>) -> Self {
        self.response_event = Some(event.into());
        self
    }

    pub fn error_event(mut self, event: impl Into<String>) -> Self {
        self.error_event = Some(event.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Completions
// ---------------------------------------------------------------------------

/// Per-operation data that rides along with a push and comes back merged
/// into its completion payload.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Carrier {
    pub role: String,
    pub name: String,
    pub response_event: Option<String>,
    pub error_event: Option<String>,
}

impl Carrier {
    fn merge(&self, name_field: &str, result: Value) -> Value {
        let mut payload = match result {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("response".into(), other);
                map
            }
        };
        payload.insert("roleName".into(), Value::String(self.role.clone()));
        payload.insert(name_field.into(), Value::String(self.name.clone()));
        if let Some(event) = &self.response_event {
            payload.insert(RESPONSE_EVENT_FIELD.into(), Value::String(event.clone()));
        }
        if let Some(event) = &self.error_event {
            payload.insert(ERROR_EVENT_FIELD.into(), Value::String(event.clone()));
        }
        Value::Object(payload)
    }
}

#[derive(Debug)]
pub(crate) struct Success {
    pub key: StatusKey,
    pub carrier: Carrier,
    /// Push result merged with the carrier fields.
    pub payload: Value,
}

#[derive(Debug)]
pub(crate) struct Failure {
    pub key: StatusKey,
    pub carrier: Carrier,
    pub error: Value,
}

#[derive(Clone)]
pub(crate) struct Completions {
    action_ok: UnboundedSender<Success>,
    action_err: UnboundedSender<Failure>,
    reaction_ok: UnboundedSender<Success>,
    reaction_err: UnboundedSender<Failure>,
}

impl Completions {
    pub fn action(
        &self,
        key: StatusKey,
        carrier: Carrier,
        outcome: std::result::Result<Value, ChannelError>,
    ) -> Result<()> {
        match outcome {
            Ok(result) => {
                let payload = carrier.merge("actionName", result);
                send(&self.action_ok, "action success", Success { key, carrier, payload })
            }
            Err(e) => send(
                &self.action_err,
                "action failure",
                Failure {
                    key,
                    carrier,
                    error: e.reason(),
                },
            ),
        }
    }

    pub fn reaction(
        &self,
        key: StatusKey,
        carrier: Carrier,
        outcome: std::result::Result<Value, ChannelError>,
    ) -> Result<()> {
        match outcome {
            Ok(result) => {
                let payload = carrier.merge("reactionName", result);
                send(&self.reaction_ok, "reaction success", Success { key, carrier, payload })
            }
            Err(e) => send(
                &self.reaction_err,
                "reaction failure",
                Failure {
                    key,
                    carrier,
                    error: e.reason(),
                },
            ),
        }
    }
}

/// Remove the carrier-only fields from a completion payload.
pub(crate) fn strip_carriers(payload: &mut Value) {
    if let Value::Object(map) = payload {
        map.remove(RESPONSE_EVENT_FIELD);
        map.remove(ERROR_EVENT_FIELD);
    }
}

fn send<T>(tx: &UnboundedSender<T>, queue: &'static str, item: T) -> Result<()> {
    tx.send(item).map_err(|_| EngineError::Stopped(queue))
}

// ---------------------------------------------------------------------------
// EngineHandle / Intake
// ---------------------------------------------------------------------------

/// Cloneable entry point for everything that triggers engine work.
#[derive(Clone)]
pub struct EngineHandle {
    roles: UnboundedSender<Vec<Role>>,
    role: UnboundedSender<Role>,
    joined: UnboundedSender<ChannelJoin>,
    submit_action: UnboundedSender<ActionSubmission>,
    occurred: UnboundedSender<ReactionOccurrence>,
    submit_reaction: UnboundedSender<ReactionReply>,
}

impl EngineHandle {
    /// Declare the roles the client holds (e.g. from an authorization
    /// response). Each non-empty role gets a channel join.
    pub fn declare_roles(&self, roles: Vec<Role>) -> Result<()> {
        send(&self.roles, "roles", roles)
    }

    pub fn declare_role(&self, role: Role) -> Result<()> {
        send(&self.role, "role", role)
    }

    /// Called by the channel service when a role channel has been joined.
    pub fn channel_joined(&self, topic: impl Into<String>, response: Value) -> Result<()> {
        send(
            &self.joined,
            "channel join",
            ChannelJoin {
                topic: topic.into(),
                response,
            },
        )
    }

    /// Called by the channel service for each inbound reaction event.
    pub fn reaction_occurred(
        &self,
        topic: impl Into<String>,
        event_name: impl Into<String>,
        payload: Value,
    ) -> Result<()> {
        send(
            &self.occurred,
            "reaction occurrence",
            ReactionOccurrence {
                topic: topic.into(),
                event_name: event_name.into(),
                payload,
            },
        )
    }

    pub fn submit_action(&self, submission: ActionSubmission) -> Result<()> {
        send(&self.submit_action, "action submit", submission)
    }

    pub fn respond_to_reaction(&self, reply: ReactionReply) -> Result<()> {
        send(&self.submit_reaction, "reaction submit", reply)
    }
}

/// Receiving side of every queue, consumed by
/// [`Supervisor::start_with`](crate::supervisor::Supervisor::start_with).
pub struct Intake {
    pub(crate) roles: UnboundedReceiver<Vec<Role>>,
    pub(crate) role: UnboundedReceiver<Role>,
    pub(crate) joined: UnboundedReceiver<ChannelJoin>,
    pub(crate) submit_action: UnboundedReceiver<ActionSubmission>,
    pub(crate) occurred: UnboundedReceiver<ReactionOccurrence>,
    pub(crate) submit_reaction: UnboundedReceiver<ReactionReply>,
    pub(crate) action_ok: UnboundedReceiver<Success>,
    pub(crate) action_err: UnboundedReceiver<Failure>,
    pub(crate) reaction_ok: UnboundedReceiver<Success>,
    pub(crate) reaction_err: UnboundedReceiver<Failure>,
    pub(crate) completions: Completions,
}

/// Create a handle and the intake it feeds.
///
/// Split so that a channel service can hold the handle before the
/// supervisor starts.
pub fn intake() -> (EngineHandle, Intake) {
    let (roles_tx, roles) = mpsc::unbounded_channel();
    let (role_tx, role) = mpsc::unbounded_channel();
    let (joined_tx, joined) = mpsc::unbounded_channel();
    let (submit_action_tx, submit_action) = mpsc::unbounded_channel();
    let (occurred_tx, occurred) = mpsc::unbounded_channel();
    let (submit_reaction_tx, submit_reaction) = mpsc::unbounded_channel();
    let (action_ok_tx, action_ok) = mpsc::unbounded_channel();
    let (action_err_tx, action_err) = mpsc::unbounded_channel();
    let (reaction_ok_tx, reaction_ok) = mpsc::unbounded_channel();
    let (reaction_err_tx, reaction_err) = mpsc::unbounded_channel();

    let handle = EngineHandle {
        roles: roles_tx,
        role: role_tx,
        joined: joined_tx,
        submit_action: submit_action_tx,
        occurred: occurred_tx,
        submit_reaction: submit_reaction_tx,
    };
    let intake = Intake {
        roles,
        role,
        joined,
        submit_action,
        occurred,
        submit_reaction,
        action_ok,
        action_err,
        reaction_ok,
        reaction_err,
        completions: Completions {
            action_ok: action_ok_tx,
            action_err: action_err_tx,
            reaction_ok: reaction_ok_tx,
            reaction_err: reaction_err_tx,
        },
    };
    (handle, intake)
}
