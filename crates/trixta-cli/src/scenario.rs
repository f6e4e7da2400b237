//! Scenario files for `trixta simulate`.
//!
//! ```yaml
//! roles:
//!   - name: viewer
//! contracts:
//!   viewer:
//!     contract_actions: { ping: {} }
//!     contract_reactions: { alert: { type: requestForResponse } }
//! replies:
//!   - { role: viewer, event: ping, ok: { pong: true } }
//! steps:
//!   - submit_action: { role: viewer, action: ping, form_data: { x: 1 } }
//!   - emit_reaction: { role: viewer, reaction: alert, payload: { ref: abc } }
//!   - respond: { role: viewer, reaction: alert, ref: abc, form_data: { ok: true } }
//! ```

use anyhow::Context;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use trixta_core::role::Role;
use trixta_engine::{ActionSubmission, ReactionReply};

const DEFAULT_SETTLE_MS: u64 = 200;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Declared together before the first step.
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Join response per role name.
    #[serde(default)]
    pub contracts: BTreeMap<String, Value>,
    /// Join rejection reason per role name.
    #[serde(default)]
    pub join_failures: BTreeMap<String, Value>,
    #[serde(default)]
    pub replies: Vec<ScriptedReply>,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// How long to let in-flight work finish after the last step.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_settle_ms() -> u64 {
    DEFAULT_SETTLE_MS
}

/// Server reply to pushes of `event` on `role`'s channel. `error` wins when
/// both are set; neither means `{}`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptedReply {
    pub role: String,
    pub event: String,
    #[serde(default)]
    pub ok: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl ScriptedReply {
    pub fn outcome(&self) -> Result<Value, Value> {
        match (&self.error, &self.ok) {
            (Some(reason), _) => Err(reason.clone()),
            (None, Some(reply)) => Ok(reply.clone()),
            (None, None) => Ok(json!({})),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    DeclareRole(Role),
    SubmitAction(ActionSubmission),
    /// Server-pushed reaction; waits until the engine listens for it.
    EmitReaction {
        role: String,
        reaction: String,
        #[serde(default)]
        payload: Value,
    },
    Respond(ReactionReply),
    WaitMs(u64),
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        serde_yaml::from_str(&data)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }
}
