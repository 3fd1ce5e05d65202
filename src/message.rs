//! Chat-style messages for sequence fields.
//!
//! Message logs are the most common `append` field in a state graph. A
//! [`Message`] serializes to a `{"role", "content"}` object so it can live in a
//! schema field of kind [`FieldKind::Sequence`](crate::state::FieldKind::Sequence).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Standard role values.
pub mod roles {
    pub const USER: &str = "user";
    pub const ASSISTANT: &str = "assistant";
    pub const SYSTEM: &str = "system";
}

/// A message in a conversation, containing a role and text content.
///
/// # Examples
/// ```
/// use stepgraph::message::{Message, roles};
///
/// let msg = Message::user("Tell me a joke!");
/// assert!(msg.has_role(roles::USER));
///
/// let value = msg.to_value();
/// assert_eq!(Message::from_value(&value), Some(msg));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(roles::USER, content)
    }

    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(roles::ASSISTANT, content)
    }

    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(roles::SYSTEM, content)
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    #[must_use]
    pub fn is_user(&self) -> bool {
        self.has_role(roles::USER)
    }

    #[must_use]
    pub fn is_assistant(&self) -> bool {
        self.has_role(roles::ASSISTANT)
    }

    /// JSON object form stored in state sequences.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({ "role": self.role, "content": self.content })
    }

    /// Reads a message back from a state value; `None` if the shape does not match.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

impl From<Message> for Value {
    fn from(message: Message) -> Self {
        message.to_value()
    }
}
