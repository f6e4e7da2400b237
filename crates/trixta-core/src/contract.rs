//! Role contracts: the actions and reactions a role declares when its
//! channel is joined.
//!
//! Descriptor contents (schemas, presentation settings, tags) are opaque to
//! the engine and are passed through untouched, including any fields this
//! module does not name.

use crate::error::{Result, TrixtaError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Join-response field holding the declared actions.
pub const CONTRACT_ACTIONS: &str = "contract_actions";
/// Join-response field holding the declared reactions.
pub const CONTRACT_REACTIONS: &str = "contract_reactions";

// ---------------------------------------------------------------------------
// ContractEntry
// ---------------------------------------------------------------------------

/// Metadata shared by action and reaction declarations.
///
/// Deserialization never fails on an object: a known field with an
/// unexpected shape is left in `extra` under its own key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct ContractEntry {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
    pub request_schema: Value,
    pub response_schema: Value,
    /// Presentation schema for the request form.
    pub request_settings: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for ContractEntry {
    fn from(mut fields: Map<String, Value>) -> Self {
        let name = match fields.remove("name") {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };
        Self {
            name,
            description: take_string(&mut fields, "description"),
            notes: take_string(&mut fields, "notes"),
            request_schema: fields.remove("request_schema").unwrap_or_default(),
            response_schema: fields.remove("response_schema").unwrap_or_default(),
            request_settings: fields.remove("request_settings").unwrap_or_default(),
            tags: take_tags(&mut fields),
            extra: fields,
        }
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> String {
    match fields.remove(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => {
            fields.insert(key.to_owned(), other);
            String::new()
        }
    }
}

fn take_tags(fields: &mut Map<String, Value>) -> Vec<String> {
    match fields.remove("tags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => items
            .into_iter()
            .filter_map(|tag| match tag {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Some(other) => {
            fields.insert("tags".into(), other);
            Vec::new()
        }
    }
}

pub type ActionDescriptor = ContractEntry;

// ---------------------------------------------------------------------------
// ReactionDescriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    /// The server expects a reply on `reply:<ref>`.
    RequestForResponse,
    /// The client acts on the invitation locally; no reply is expected.
    RequestForEffect,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct ReactionDescriptor {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub reaction_type: Option<String>,
    #[serde(flatten)]
    pub entry: ContractEntry,
}

impl From<Map<String, Value>> for ReactionDescriptor {
    fn from(mut fields: Map<String, Value>) -> Self {
        let reaction_type = match fields.remove("type") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => {
                fields.insert("type".into(), other);
                None
            }
        };
        Self {
            reaction_type,
            entry: ContractEntry::from(fields),
        }
    }
}

impl ReactionDescriptor {
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn kind(&self) -> ReactionKind {
        match self.reaction_type.as_deref() {
            Some("requestForEffect") => ReactionKind::RequestForEffect,
            _ => ReactionKind::RequestForResponse,
        }
    }
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Everything one role exposes, read from a single join confirmation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contract {
    pub actions: BTreeMap<String, ActionDescriptor>,
    pub reactions: BTreeMap<String, ReactionDescriptor>,
}

impl Contract {
    /// Parse the `contract_actions` / `contract_reactions` maps of a join
    /// response. Absent or null maps are empty. Each descriptor's `name` is
    /// set from its map key.
    ///
    /// Only a map that is not an object is an error. Every entry in a valid
    /// map is declared; entries that are not objects are empty descriptors.
    pub fn from_join_response(response: &Value) -> Result<Self> {
        let mut actions = BTreeMap::new();
        for (name, raw) in declared(response, CONTRACT_ACTIONS)? {
            let mut action = ActionDescriptor::from(descriptor_fields(raw));
            action.name = name.clone();
            actions.insert(name.clone(), action);
        }

        let mut reactions = BTreeMap::new();
        for (name, raw) in declared(response, CONTRACT_REACTIONS)? {
            let mut reaction = ReactionDescriptor::from(descriptor_fields(raw));
            reaction.entry.name = name.clone();
            reactions.insert(name.clone(), reaction);
        }

        Ok(Self { actions, reactions })
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.reactions.is_empty()
    }

    pub fn reaction_names(&self) -> Vec<String> {
        self.reactions.keys().cloned().collect()
    }
}

fn declared<'a>(response: &'a Value, field: &str) -> Result<Vec<(&'a String, &'a Value)>> {
    match response.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => Ok(map.iter().collect()),
        Some(other) => Err(TrixtaError::MalformedContract {
            field: field.to_owned(),
            reason: format!("expected an object, got {}", json_kind(other)),
        }),
    }
}

fn descriptor_fields(raw: &Value) -> Map<String, Value> {
    match raw {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_actions_and_reactions() {
        let response = json!({
            "contract_actions": {
                "ping": {"description": "Ping the server", "tags": ["health"]}
            },
            "contract_reactions": {
                "alert": {"type": "requestForResponse", "notes": "answer me"}
            }
        });
        let contract = Contract::from_join_response(&response).unwrap();
        assert_eq!(contract.actions.len(), 1);
        assert_eq!(contract.actions["ping"].description, "Ping the server");
        assert_eq!(contract.actions["ping"].tags, vec!["health".to_string()]);
        assert_eq!(contract.reactions["alert"].entry.notes, "answer me");
        assert_eq!(contract.reactions["alert"].kind(), ReactionKind::RequestForResponse);
    }

    #[test]
    fn name_is_copied_from_map_key() {
        let response = json!({
            "contract_actions": {"ping": {"name": "something-else"}},
            "contract_reactions": {"alert": {}}
        });
        let contract = Contract::from_join_response(&response).unwrap();
        assert_eq!(contract.actions["ping"].name, "ping");
        assert_eq!(contract.reactions["alert"].name(), "alert");
    }

    #[test]
    fn absent_or_null_maps_are_empty() {
        let contract = Contract::from_join_response(&json!({})).unwrap();
        assert!(contract.is_empty());

        let contract = Contract::from_join_response(&json!({
            "contract_actions": null,
            "contract_reactions": {"alert": null}
        }))
        .unwrap();
        assert!(contract.actions.is_empty());
        assert_eq!(contract.reaction_names(), vec!["alert".to_string()]);
    }

    #[test]
    fn non_object_map_is_rejected() {
        let err = Contract::from_join_response(&json!({"contract_actions": ["ping"]})).unwrap_err();
        assert!(err.to_string().contains("contract_actions"));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn unknown_fields_pass_through() {
        let response = json!({
            "contract_actions": {
                "ping": {"handler": {"type": "flow", "name": "ping_flow"}, "request_schema": {"type": "object"}}
            }
        });
        let contract = Contract::from_join_response(&response).unwrap();
        let ping = &contract.actions["ping"];
        assert_eq!(ping.extra["handler"]["name"], "ping_flow");
        assert_eq!(ping.request_schema["type"], "object");

        let back = serde_json::to_value(ping).unwrap();
        assert_eq!(back["handler"]["type"], "flow");
        assert_eq!(back["name"], "ping");
    }

    #[test]
    fn effect_reactions_are_typed() {
        let response = json!({"contract_reactions": {"toast": {"type": "requestForEffect"}}});
        let contract = Contract::from_join_response(&response).unwrap();
        assert_eq!(contract.reactions["toast"].kind(), ReactionKind::RequestForEffect);
        let back = serde_json::to_value(&contract.reactions["toast"]).unwrap();
        assert_eq!(back["type"], "requestForEffect");
    }

    #[test]
    fn null_descriptor_fields_default() {
        let response = json!({
            "contract_actions": {"ping": {"description": null, "tags": null}}
        });
        let contract = Contract::from_join_response(&response).unwrap();
        assert_eq!(contract.actions["ping"].description, "");
        assert!(contract.actions["ping"].tags.is_empty());
    }

    #[test]
    fn mistyped_fields_stay_in_extra() {
        let response = json!({
            "contract_actions": {
                "ping": {"description": "p"},
                "weird": {"tags": ["a", {"label": "b"}], "description": 5}
            },
            "contract_reactions": {
                "alert": {"type": {"kind": "custom"}, "tags": ["urgent"]}
            }
        });
        let contract = Contract::from_join_response(&response).unwrap();
        assert_eq!(contract.actions.len(), 2);

        let weird = &contract.actions["weird"];
        assert!(weird.tags.is_empty());
        assert_eq!(weird.description, "");
        assert_eq!(weird.extra["tags"][1]["label"], "b");
        assert_eq!(weird.extra["description"], 5);
        let back = serde_json::to_value(weird).unwrap();
        assert_eq!(back["tags"], json!(["a", {"label": "b"}]));

        let alert = &contract.reactions["alert"];
        assert_eq!(alert.reaction_type, None);
        assert_eq!(alert.entry.extra["type"]["kind"], "custom");
        assert_eq!(alert.entry.tags, vec!["urgent".to_string()]);
    }

    #[test]
    fn descriptor_deserializes_leniently() {
        let entry: ContractEntry =
            serde_json::from_value(json!({"name": 7, "notes": ["x"], "tags": null})).unwrap();
        assert_eq!(entry.name, "");
        assert_eq!(entry.extra["notes"], json!(["x"]));
        assert!(!entry.extra.contains_key("name"));
    }

    #[test]
    fn scalar_entry_is_an_empty_descriptor() {
        let response = json!({"contract_reactions": {"alert": "requestForResponse", "notice": 3}});
        let contract = Contract::from_join_response(&response).unwrap();
        assert_eq!(contract.reaction_names(), vec!["alert".to_string(), "notice".to_string()]);
        assert_eq!(contract.reactions["alert"].name(), "alert");
        assert!(contract.reactions["alert"].entry.extra.is_empty());
    }
}
