//! Channel topic naming.
//!
//! Every role maps to exactly one channel topic of the form
//! `<namespace>:<role>`. The same [`ChannelNaming`] must be used for joining,
//! pushing, and routing inbound events so that all of them address the same
//! logical channel for the lifetime of a role.

use crate::error::{Result, TrixtaError};

/// Namespace used when no engine config overrides it.
pub const DEFAULT_NAMESPACE: &str = "trixta_role";

/// Prefix of the synthetic push event used to answer a reaction invitation.
pub const REPLY_EVENT_PREFIX: &str = "reply:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNaming {
    namespace: String,
}

impl ChannelNaming {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The channel topic for `role`.
    pub fn topic(&self, role: &str) -> String {
        format!("{}:{role}", self.namespace)
    }

    /// Recover the role name from a channel topic.
    ///
    /// Everything after the first `:` is the role name, so role names may
    /// themselves contain `:`. A topic without a separator, with a different
    /// namespace, or with an empty role segment is rejected.
    pub fn role_from_topic<'a>(&self, topic: &'a str) -> Result<&'a str> {
        match topic.split_once(':') {
            Some((ns, role)) if ns == self.namespace && !role.is_empty() => Ok(role),
            _ => Err(TrixtaError::MalformedTopic {
                topic: topic.to_owned(),
                namespace: self.namespace.clone(),
            }),
        }
    }
}

impl Default for ChannelNaming {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

/// Channel topic for `role` under the default namespace.
pub fn channel_topic(role: &str) -> String {
    ChannelNaming::default().topic(role)
}

/// The push event name that routes a reply to the invitation identified by
/// `reference`. This literal is part of the server wire protocol.
pub fn reply_event(reference: &str) -> String {
    format!("{REPLY_EVENT_PREFIX}{reference}")
}
