use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Composite key identifying one tracked operation.
///
/// Actions use `<role>:<action>`; reaction replies use
/// `<role>:<reaction>:<ref>`, so an action and a reaction sharing a name
/// never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusKey(String);

impl StatusKey {
    pub fn action(role: &str, action: &str) -> Self {
        Self(format!("{role}:{action}"))
    }

    pub fn reaction(role: &str, reaction: &str, reference: &str) -> Self {
        Self(format!("{role}:{reaction}:{reference}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Loading / error state of one operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationStatus {
    pub loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl OperationStatus {
    pub fn loading() -> Self {
        Self {
            loading: true,
            error: None,
        }
    }

    pub fn succeeded() -> Self {
        Self::default()
    }

    pub fn failed(error: Value) -> Self {
        Self {
            loading: false,
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
