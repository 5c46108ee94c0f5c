//! Typed view of a character document.
//!
//! Generation and persistence work on `serde_json::Value` so that whatever
//! the service produced is written back verbatim. `CharacterDocument` is the
//! typed view used for summaries and for callers that want field access.

use crate::error::Result;
use crate::schema::character_schema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterDocument {
    pub name: String,
    pub clients: Vec<String>,
    pub model_provider: String,
    pub image_model_provider: String,
    pub settings: Settings,
    pub plugins: Vec<Value>,
    pub bio: Vec<String>,
    pub lore: Vec<String>,
    pub knowledge: Vec<String>,
    pub message_examples: Vec<Vec<MessageTurn>>,
    pub post_examples: Vec<String>,
    pub topics: Vec<String>,
    pub style: Style,
    pub adjectives: Vec<String>,
    /// Keys outside the schema, kept so a parse/serialize cycle loses nothing.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub voice: Voice,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub model: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub all: Vec<String>,
    pub chat: Vec<String>,
    pub post: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One turn of an example exchange.
///
/// The schema accepts any value as a turn. Turns shaped like
/// `{ "user": .., "content": { "text": .. } }` get field access; anything
/// else is carried as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageTurn {
    Message(MessageExample),
    Other(Value),
}

impl MessageTurn {
    pub fn user(&self) -> Option<&str> {
        match self {
            MessageTurn::Message(m) => Some(&m.user),
            MessageTurn::Other(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            MessageTurn::Message(m) => Some(&m.content.text),
            MessageTurn::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageExample {
    pub user: String,
    pub content: MessageContent,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageContent {
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CharacterDocument {
    /// Validate `value` against the character schema, then convert it.
    ///
    /// Every schema-valid value converts, and `to_value` gives it back unchanged.
    pub fn from_value(value: Value) -> Result<Self> {
        character_schema().validate(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        crate::store::to_pretty_json(self)
    }

    /// Number of example exchanges and the total turns across them.
    pub fn example_counts(&self) -> (usize, usize) {
        let turns = self.message_examples.iter().map(Vec::len).sum();
        (self.message_examples.len(), turns)
    }
}
