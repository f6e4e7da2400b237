//! Instances: individual action results and reaction invitations.

use crate::error::{Result, TrixtaError};
use crate::status::{OperationStatus, StatusKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// InstanceResponse
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

// ---------------------------------------------------------------------------
// ActionInstance
// ---------------------------------------------------------------------------

/// One completed action response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInstance {
    pub response: InstanceResponse,
    #[serde(rename = "dateCreated")]
    pub date_created: DateTime<Utc>,
}

impl ActionInstance {
    pub fn success(payload: Value, date_created: DateTime<Utc>) -> Self {
        Self {
            response: InstanceResponse {
                success: Some(payload),
                error: None,
            },
            date_created,
        }
    }
}

// ---------------------------------------------------------------------------
// ReactionInstance
// ---------------------------------------------------------------------------

/// One server-pushed reaction invitation: `{eventName, ...payload}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionInstance {
    #[serde(rename = "eventName")]
    pub event_name: String,
    /// Server-issued correlation token; replies go to `reply:<ref>`.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "dateCreated", default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<InstanceResponse>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where a reaction instance is in its reply cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceLifecycle {
    /// Received with a ref; no reply submitted yet.
    Invited,
    /// Reply submitted and awaiting the server.
    Replying,
    Resolved,
    Failed,
    /// Received without a ref; it can never be replied to.
    InvitedUnreplyable,
}

impl ReactionInstance {
    /// Build an instance from an inbound occurrence. Payload fields are
    /// spread over `eventName`; scalar `ref` / `dateCreated` / `status`
    /// values are normalized to strings and null ones dropped.
    ///
    /// Only a non-object payload or a non-scalar `ref` is rejected. Other
    /// known fields with an unexpected shape are kept verbatim in `extra`.
    pub fn from_occurrence(event_name: &str, payload: Value) -> Result<Self> {
        let mut fields = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                return Err(TrixtaError::MalformedOccurrence {
                    event: event_name.to_owned(),
                    reason: "payload is not an object".into(),
                })
            }
        };
        if !fields.get("eventName").is_some_and(Value::is_string) {
            fields.insert("eventName".into(), Value::String(event_name.to_owned()));
        }

        if normalize_scalar(&mut fields, "ref").is_some() {
            return Err(TrixtaError::MalformedOccurrence {
                event: event_name.to_owned(),
                reason: "'ref' must be a scalar".into(),
            });
        }
        let mut demoted = Map::new();
        for key in ["dateCreated", "status"] {
            if let Some(value) = normalize_scalar(&mut fields, key) {
                demoted.insert(key.to_owned(), value);
            }
        }
        match fields.remove("response") {
            Some(response) if response.is_object() || response.is_null() => {
                fields.insert("response".into(), response);
            }
            Some(response) => {
                demoted.insert("response".into(), response);
            }
            None => {}
        }

        let mut instance: Self = serde_json::from_value(Value::Object(fields))?;
        instance.extra.extend(demoted);
        Ok(instance)
    }

    pub fn can_reply(&self) -> bool {
        self.reference.as_deref().is_some_and(|r| !r.is_empty())
    }

    /// Status key of this instance's reply, if it can be replied to.
    pub fn status_key(&self, role: &str, reaction: &str) -> Option<StatusKey> {
        match &self.reference {
            Some(r) if !r.is_empty() => Some(StatusKey::reaction(role, reaction, r)),
            _ => None,
        }
    }

    pub fn lifecycle(&self, status: Option<&OperationStatus>) -> InstanceLifecycle {
        if !self.can_reply() {
            return InstanceLifecycle::InvitedUnreplyable;
        }
        match status {
            None => InstanceLifecycle::Invited,
            Some(s) if s.loading => InstanceLifecycle::Replying,
            Some(s) if s.is_failed() => InstanceLifecycle::Failed,
            Some(_) => InstanceLifecycle::Resolved,
        }
    }
}

/// Stringify a scalar field in place, dropping it when null. A non-scalar
/// value is removed and handed back.
fn normalize_scalar(fields: &mut Map<String, Value>, key: &str) -> Option<Value> {
    let normalized = match fields.remove(key)? {
        Value::Null => return None,
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => return Some(other),
    };
    fields.insert(key.to_owned(), Value::String(normalized));
    None
}

// ---------------------------------------------------------------------------
// InstanceMode
// ---------------------------------------------------------------------------

/// Retention policy for the instances of one action or reaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstanceMode {
    /// Keep only the latest instance.
    #[default]
    Replace,
    /// Keep instances newest-first, evicting the oldest beyond `limit`.
    Accumulate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
}

impl InstanceMode {
    /// Record `latest` into `instances` (newest first).
    pub fn record<T>(&self, instances: &mut Vec<T>, latest: T) {
        match *self {
            InstanceMode::Replace => {
                instances.clear();
                instances.push(latest);
            }
            InstanceMode::Accumulate { limit } => {
                instances.insert(0, latest);
                if let Some(limit) = limit {
                    instances.truncate(limit.max(1));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn occurrence_spreads_payload_over_event_name() {
        let instance = ReactionInstance::from_occurrence(
            "alert",
            json!({"ref": "abc", "initial_data": {"n": 5}, "custom": 1}),
        )
        .unwrap();
        assert_eq!(instance.event_name, "alert");
        assert_eq!(instance.reference.as_deref(), Some("abc"));
        assert_eq!(instance.initial_data, Some(json!({"n": 5})));
        assert_eq!(instance.extra["custom"], 1);
    }

    #[test]
    fn numeric_ref_is_stringified() {
        let instance = ReactionInstance::from_occurrence("alert", json!({"ref": 42})).unwrap();
        assert_eq!(instance.reference.as_deref(), Some("42"));
    }

    #[test]
    fn missing_ref_is_unreplyable() {
        let instance = ReactionInstance::from_occurrence("alert", json!({"ref": null})).unwrap();
        assert!(!instance.can_reply());
        assert_eq!(instance.status_key("viewer", "alert"), None);
        assert_eq!(
            instance.lifecycle(Some(&OperationStatus::loading())),
            InstanceLifecycle::InvitedUnreplyable
        );
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = ReactionInstance::from_occurrence("alert", json!("hello")).unwrap_err();
        assert!(matches!(err, TrixtaError::MalformedOccurrence { .. }));
    }

    #[test]
    fn object_ref_is_rejected() {
        assert!(ReactionInstance::from_occurrence("alert", json!({"ref": {"id": 1}})).is_err());
    }

    #[test]
    fn mistyped_known_fields_are_kept_in_extra() {
        let instance =
            ReactionInstance::from_occurrence("alert", json!({"ref": "abc", "status": {"state": "open"}}))
                .unwrap();
        assert_eq!(instance.reference.as_deref(), Some("abc"));
        assert_eq!(instance.status, None);
        assert_eq!(instance.extra["status"]["state"], "open");

        let instance =
            ReactionInstance::from_occurrence("alert", json!({"ref": "def", "response": "pending"}))
                .unwrap();
        assert_eq!(instance.response, None);
        assert_eq!(instance.extra["response"], "pending");
        let back = serde_json::to_value(&instance).unwrap();
        assert_eq!(back["response"], "pending");
        assert_eq!(back["ref"], "def");

        let instance =
            ReactionInstance::from_occurrence("alert", json!({"dateCreated": [2024, 1, 1]})).unwrap();
        assert_eq!(instance.date_created, None);
        assert_eq!(instance.extra["dateCreated"], json!([2024, 1, 1]));
    }

    #[test]
    fn lifecycle_follows_reply_status() {
        let instance = ReactionInstance::from_occurrence("alert", json!({"ref": "r1"})).unwrap();
        assert_eq!(instance.lifecycle(None), InstanceLifecycle::Invited);
        assert_eq!(
            instance.lifecycle(Some(&OperationStatus::loading())),
            InstanceLifecycle::Replying
        );
        assert_eq!(
            instance.lifecycle(Some(&OperationStatus::succeeded())),
            InstanceLifecycle::Resolved
        );
        assert_eq!(
            instance.lifecycle(Some(&OperationStatus::failed(json!("boom")))),
            InstanceLifecycle::Failed
        );
    }

    #[test]
    fn replace_keeps_latest_only() {
        let mut instances = vec![1, 2];
        InstanceMode::Replace.record(&mut instances, 3);
        assert_eq!(instances, vec![3]);
    }

    #[test]
    fn accumulate_prepends_and_evicts_oldest() {
        let mode = InstanceMode::Accumulate { limit: Some(2) };
        let mut instances = Vec::new();
        mode.record(&mut instances, 1);
        mode.record(&mut instances, 2);
        mode.record(&mut instances, 3);
        assert_eq!(instances, vec![3, 2]);
    }

    #[test]
    fn accumulate_without_limit_grows() {
        let mode = InstanceMode::Accumulate { limit: None };
        let mut instances = Vec::new();
        for i in 0..5 {
            mode.record(&mut instances, i);
        }
        assert_eq!(instances.len(), 5);
        assert_eq!(instances[0], 4);
    }

    #[test]
    fn mode_yaml_is_tagged() {
        let mode: InstanceMode = serde_yaml::from_str("type: accumulate\nlimit: 3\n").unwrap();
        assert_eq!(mode, InstanceMode::Accumulate { limit: Some(3) });
        let mode: InstanceMode = serde_yaml::from_str("type: replace\n").unwrap();
        assert_eq!(mode, InstanceMode::Replace);
    }
}
