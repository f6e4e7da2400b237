use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrixtaError {
    #[error("malformed channel topic '{topic}': expected '{namespace}:<role>'")]
    MalformedTopic { topic: String, namespace: String },

    #[error("malformed contract field '{field}': {reason}")]
    MalformedContract { field: String, reason: String },

    #[error("malformed reaction occurrence '{event}': {reason}")]
    MalformedOccurrence { event: String, reason: String },

    #[error("no reply ref for reaction '{reaction}' on role '{role}'")]
    MissingRef { role: String, reaction: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrixtaError>;
