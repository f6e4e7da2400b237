//! Reference state container.
//!
//! [`TrixtaState::apply`] is the single point where engine events become
//! state. Callers must apply events in the order the engine emitted them.

use crate::config::InstancePolicy;
use crate::contract::{ActionDescriptor, ReactionDescriptor};
use crate::event::EngineEvent;
use crate::instance::{ActionInstance, InstanceLifecycle, ReactionInstance};
use crate::role::Role;
use crate::status::{OperationStatus, StatusKey};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionEntry {
    pub role: String,
    pub name: String,
    /// `None` until the role's contract declares the action.
    pub common: Option<ActionDescriptor>,
    /// Newest first.
    pub instances: Vec<ActionInstance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReactionEntry {
    pub role: String,
    pub name: String,
    pub common: Option<ReactionDescriptor>,
    /// Newest first.
    pub instances: Vec<ReactionInstance>,
}

// ---------------------------------------------------------------------------
// TrixtaState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrixtaState {
    pub roles: Vec<Role>,
    /// Keyed `<role>:<action>`.
    pub actions: BTreeMap<String, ActionEntry>,
    /// Keyed `<role>:<reaction>`.
    pub reactions: BTreeMap<String, ReactionEntry>,
    pub statuses: BTreeMap<StatusKey, OperationStatus>,
    /// Latest generic engine error.
    pub error: Option<String>,
    #[serde(skip)]
    policy: InstancePolicy,
}

fn entry_key(role: &str, name: &str) -> String {
    format!("{role}:{name}")
}

impl TrixtaState {
    pub fn new(policy: InstancePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn apply(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::RoleDeclared { role } => {
                match self.roles.iter_mut().find(|r| r.name == role.name) {
                    Some(existing) => *existing = role.clone(),
                    None => self.roles.push(role.clone()),
                }
            }
            EngineEvent::ActionDeclared { role, name, action } => {
                self.action_entry(role, name).common = Some(action.clone());
            }
            EngineEvent::ReactionDeclared {
                role,
                name,
                reaction,
            } => {
                self.reaction_entry(role, name).common = Some(reaction.clone());
            }
            EngineEvent::ActionResponseUpdated {
                role,
                action,
                response,
            } => {
                let mode = self.policy.mode_for(role, action);
                let instance = ActionInstance::success(response.clone(), Utc::now());
                mode.record(&mut self.action_entry(role, action).instances, instance);
            }
            EngineEvent::ReactionInstanceUpdated {
                role,
                reaction,
                instance,
            } => {
                let mode = self.policy.mode_for(role, reaction);
                mode.record(
                    &mut self.reaction_entry(role, reaction).instances,
                    instance.clone(),
                );
            }
            EngineEvent::StatusUpdated { key, status } => {
                self.statuses.insert(key.clone(), status.clone());
            }
            EngineEvent::Error { error } => {
                self.error = Some(error.clone());
            }
            EngineEvent::Custom { .. } => {}
        }
    }

    fn action_entry(&mut self, role: &str, name: &str) -> &mut ActionEntry {
        self.actions
            .entry(entry_key(role, name))
            .or_insert_with(|| ActionEntry {
                role: role.to_owned(),
                name: name.to_owned(),
                ..ActionEntry::default()
            })
    }

    fn reaction_entry(&mut self, role: &str, name: &str) -> &mut ReactionEntry {
        self.reactions
            .entry(entry_key(role, name))
            .or_insert_with(|| ReactionEntry {
                role: role.to_owned(),
                name: name.to_owned(),
                ..ReactionEntry::default()
            })
    }

    // -----------------------------------------------------------------------
    // Selectors
    // -----------------------------------------------------------------------

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }

    /// True when every role in `names` has been declared.
    pub fn has_roles(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.has_role(n))
    }

    pub fn action(&self, role: &str, name: &str) -> Option<&ActionEntry> {
        self.actions.get(&entry_key(role, name))
    }

    pub fn reaction(&self, role: &str, name: &str) -> Option<&ReactionEntry> {
        self.reactions.get(&entry_key(role, name))
    }

    /// Status for `key`; absent keys read as "not loading".
    pub fn status(&self, key: &StatusKey) -> OperationStatus {
        self.statuses.get(key).cloned().unwrap_or_default()
    }

    pub fn is_loading(&self, key: &StatusKey) -> bool {
        self.statuses.get(key).is_some_and(|s| s.loading)
    }

    pub fn latest_reaction_instance(&self, role: &str, reaction: &str) -> Option<&ReactionInstance> {
        self.reaction(role, reaction)
            .and_then(|entry| entry.instances.first())
    }

    pub fn instance_lifecycle(
        &self,
        role: &str,
        reaction: &str,
        instance: &ReactionInstance,
    ) -> InstanceLifecycle {
        let status = instance
            .status_key(role, reaction)
            .and_then(|key| self.statuses.get(&key));
        instance.lifecycle(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceMode;
    use serde_json::json;

    fn occurrence(reference: &str) -> ReactionInstance {
        ReactionInstance::from_occurrence("alert", json!({"ref": reference})).unwrap()
    }

    #[test]
    fn redeclared_role_is_not_duplicated() {
        let mut state = TrixtaState::default();
        state.apply(&EngineEvent::RoleDeclared {
            role: Role::new("viewer"),
        });
        state.apply(&EngineEvent::RoleDeclared {
            role: Role::new("viewer").with_presence(),
        });
        assert_eq!(state.roles.len(), 1);
        assert!(state.roles[0].log_presence);
        assert!(state.has_roles(&["viewer"]));
        assert!(!state.has_roles(&["viewer", "admin"]));
    }

    #[test]
    fn redeclaring_action_keeps_instances() {
        let mut state = TrixtaState::default();
        state.apply(&EngineEvent::ActionResponseUpdated {
            role: "viewer".into(),
            action: "ping".into(),
            response: json!({"pong": true}),
        });
        state.apply(&EngineEvent::ActionDeclared {
            role: "viewer".into(),
            name: "ping".into(),
            action: ActionDescriptor {
                name: "ping".into(),
                ..ActionDescriptor::default()
            },
        });
        let entry = state.action("viewer", "ping").unwrap();
        assert!(entry.common.is_some());
        assert_eq!(entry.instances.len(), 1);
        assert_eq!(
            entry.instances[0].response.success,
            Some(json!({"pong": true}))
        );
    }

    #[test]
    fn replace_policy_keeps_latest_instance() {
        let mut state = TrixtaState::default();
        for r in ["r1", "r2"] {
            state.apply(&EngineEvent::ReactionInstanceUpdated {
                role: "viewer".into(),
                reaction: "alert".into(),
                instance: occurrence(r),
            });
        }
        let entry = state.reaction("viewer", "alert").unwrap();
        assert_eq!(entry.instances.len(), 1);
        assert_eq!(entry.instances[0].reference.as_deref(), Some("r2"));
    }

    #[test]
    fn accumulate_policy_is_newest_first_and_bounded() {
        let mut policy = InstancePolicy::default();
        policy.overrides.insert(
            "viewer:alert".into(),
            InstanceMode::Accumulate { limit: Some(2) },
        );
        let mut state = TrixtaState::new(policy);
        for r in ["r1", "r2", "r3"] {
            state.apply(&EngineEvent::ReactionInstanceUpdated {
                role: "viewer".into(),
                reaction: "alert".into(),
                instance: occurrence(r),
            });
        }
        let refs: Vec<_> = state
            .reaction("viewer", "alert")
            .unwrap()
            .instances
            .iter()
            .map(|i| i.reference.clone().unwrap())
            .collect();
        assert_eq!(refs, vec!["r3", "r2"]);
        assert_eq!(
            state
                .latest_reaction_instance("viewer", "alert")
                .and_then(|i| i.reference.as_deref()),
            Some("r3")
        );
    }

    #[test]
    fn status_is_last_write_wins() {
        let mut state = TrixtaState::default();
        let key = StatusKey::action("viewer", "ping");
        assert!(!state.is_loading(&key));
        assert_eq!(state.status(&key), OperationStatus::default());

        state.apply(&EngineEvent::StatusUpdated {
            key: key.clone(),
            status: OperationStatus::loading(),
        });
        assert!(state.is_loading(&key));

        state.apply(&EngineEvent::StatusUpdated {
            key: key.clone(),
            status: OperationStatus::failed(json!("boom")),
        });
        assert!(!state.is_loading(&key));
        assert_eq!(state.status(&key).error, Some(json!("boom")));
    }

    #[test]
    fn lifecycle_reads_status_map() {
        let mut state = TrixtaState::default();
        let instance = occurrence("abc");
        assert_eq!(
            state.instance_lifecycle("viewer", "alert", &instance),
            InstanceLifecycle::Invited
        );
        state.apply(&EngineEvent::StatusUpdated {
            key: StatusKey::reaction("viewer", "alert", "abc"),
            status: OperationStatus::loading(),
        });
        assert_eq!(
            state.instance_lifecycle("viewer", "alert", &instance),
            InstanceLifecycle::Replying
        );
        state.apply(&EngineEvent::StatusUpdated {
            key: StatusKey::reaction("viewer", "alert", "abc"),
            status: OperationStatus::succeeded(),
        });
        assert_eq!(
            state.instance_lifecycle("viewer", "alert", &instance),
            InstanceLifecycle::Resolved
        );
    }

    #[test]
    fn errors_and_side_events() {
        let mut state = TrixtaState::default();
        state.apply(&EngineEvent::side_success("DONE", json!({})));
        assert!(state.error.is_none());
        state.apply(&EngineEvent::error("malformed channel topic 'x'"));
        assert_eq!(state.error.as_deref(), Some("malformed channel topic 'x'"));
    }

    #[test]
    fn state_serializes_status_keys_as_strings() {
        let mut state = TrixtaState::default();
        state.apply(&EngineEvent::StatusUpdated {
            key: StatusKey::action("viewer", "ping"),
            status: OperationStatus::loading(),
        });
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["statuses"]["viewer:ping"]["loading"], true);
    }
}
