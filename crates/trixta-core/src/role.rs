use serde::{Deserialize, Serialize};

/// A role the client is subscribed to. Each role maps 1:1 to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    /// Ask the channel service to track presence on this role's channel.
    #[serde(default, rename = "logPresence", alias = "log_presence")]
    pub log_presence: bool,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log_presence: false,
        }
    }

    pub fn with_presence(mut self) -> Self {
        self.log_presence = true;
        self
    }

    /// Blank role names are never joined.
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty()
    }
}
