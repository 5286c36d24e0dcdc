//! Validator messages as consumed from the structural validator and produced
//! by the binding validator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a validator message.
///
/// Deserialization accepts FHIR issue severities too (see [`MessageType::parse_str`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum MessageType {
    Info,
    Warning,
    Error,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Info => "info",
            MessageType::Warning => "warning",
            MessageType::Error => "error",
        }
    }

    /// Parse a severity as emitted by the validator service. FHIR's
    /// `information` and `fatal` issue severities are folded into the
    /// nearest member of the fixed enumeration.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "information" => Some(MessageType::Info),
            "warning" => Some(MessageType::Warning),
            "error" | "fatal" => Some(MessageType::Error),
            _ => None,
        }
    }
}

impl TryFrom<String> for MessageType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, <MessageType as TryFrom<String>>::Error> {
        Self::parse_str(&value).ok_or_else(|| format!("unknown message type '{value}'"))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validator message.
///
/// Severity is fixed at construction; suppression decisions are made by
/// [`crate::filter::MessageFilter`] and never recorded on the message itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationMessage {
    #[serde(rename = "type")]
    message_type: MessageType,
    message: String,
}

impl ValidationMessage {
    pub fn new(message_type: MessageType, message: impl Into<String>) -> Self {
        Self {
            message_type,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(MessageType::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(MessageType::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(MessageType::Error, message)
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_error(&self) -> bool {
        self.message_type == MessageType::Error
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.message_type, self.message)
    }
}
