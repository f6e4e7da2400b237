//! State-transition events emitted by the orchestration engine.
//!
//! The engine owns no state; every observable change is one of these events,
//! applied in order by a single downstream consumer (see [`crate::state`]).

use crate::contract::{ActionDescriptor, ReactionDescriptor};
use crate::instance::ReactionInstance;
use crate::role::Role;
use crate::status::{OperationStatus, StatusKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    RoleDeclared {
        role: Role,
    },
    ActionDeclared {
        role: String,
        name: String,
        action: ActionDescriptor,
    },
    ReactionDeclared {
        role: String,
        name: String,
        reaction: ReactionDescriptor,
    },
    ActionResponseUpdated {
        role: String,
        action: String,
        response: Value,
    },
    ReactionInstanceUpdated {
        role: String,
        reaction: String,
        instance: ReactionInstance,
    },
    StatusUpdated {
        key: StatusKey,
        status: OperationStatus,
    },
    /// Caller-named side event (`responseEvent` / `errorEvent`).
    Custom {
        event_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },
    /// Generic engine error carrying the stringified cause.
    Error {
        error: String,
    },
}

impl EngineEvent {
    pub fn side_success(event_type: impl Into<String>, data: Value) -> Self {
        EngineEvent::Custom {
            event_type: event_type.into(),
            data: Some(data),
            error: None,
        }
    }

    pub fn side_failure(event_type: impl Into<String>, error: Value) -> Self {
        EngineEvent::Custom {
            event_type: event_type.into(),
            data: None,
            error: Some(error),
        }
    }

    pub fn error(cause: impl fmt::Display) -> Self {
        EngineEvent::Error {
            error: cause.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::RoleDeclared { .. } => "role_declared",
            EngineEvent::ActionDeclared { .. } => "action_declared",
            EngineEvent::ReactionDeclared { .. } => "reaction_declared",
            EngineEvent::ActionResponseUpdated { .. } => "action_response_updated",
            EngineEvent::ReactionInstanceUpdated { .. } => "reaction_instance_updated",
            EngineEvent::StatusUpdated { .. } => "status_updated",
            EngineEvent::Custom { .. } => "custom",
            EngineEvent::Error { .. } => "error",
        }
    }
}
