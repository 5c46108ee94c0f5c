//! Composition of the instruction sent to the text-generation service.

use crate::schema::SchemaDescriptor;
use crate::store::to_pretty_json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SYSTEM_PROMPT: &str = "You are a JSON generation assistant.";

/// Everything the caller knows about the character before generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRequest {
    pub name: String,
    pub personality: String,
    pub appearance: String,
    pub body_type: String,
    pub occupation: String,
    pub clients: Vec<String>,
    pub model_provider: String,
}

/// Fixed values written into every generated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_voice_model")]
    pub voice_model: String,
    #[serde(default = "default_image_model_provider")]
    pub image_model_provider: String,
}

fn default_voice_model() -> String {
    "en_US-female-medium".to_string()
}

fn default_image_model_provider() -> String {
    "falai".to_string()
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            voice_model: default_voice_model(),
            image_model_provider: default_image_model_provider(),
        }
    }
}

/// A system-role and a user-role instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn compose(request: &CharacterRequest, defaults: &Defaults, schema: &SchemaDescriptor) -> Self {
        let schema_json = to_pretty_json(&schema.to_json_schema()).unwrap_or_default();
        let clients = Value::from(request.clients.clone()).to_string();
        let name = Value::from(request.name.as_str()).to_string();
        let provider = Value::from(request.model_provider.as_str()).to_string();
        let image_provider = Value::from(defaults.image_model_provider.as_str()).to_string();
        let voice = Value::from(defaults.voice_model.as_str()).to_string();

        let CharacterRequest {
            personality,
            appearance,
            body_type,
            occupation,
            ..
        } = request;

        let user = format!(
            r#"Your task: generate a JSON object representing a fictional AI character. The JSON must follow this schema exactly:

{schema_json}

Rules:
- All required fields must be present and contain valid, non-null values.
- Do NOT wrap the response in any formatting (for example ```json).
- Do NOT add fields beyond those specified in the schema.
- Keep the data types exact: strings for text, arrays for lists.
- These fields are fixed and must be copied verbatim:
    - name: {name}
    - clients: {clients}
    - modelProvider: {provider}
    - imageModelProvider: {image_provider}
    - settings.voice.model: {voice}
- Context for everything else:
    - personality={personality}
    - appearance={appearance}
    - body type={body_type}
    - occupation={occupation}

Example template with instructions:
{{
    "name": {name},
    "clients": {clients},
    "modelProvider": {provider},
    "imageModelProvider": {image_provider},
    "settings": {{ "voice": {{ "model": {voice} }} }},
    "plugins": [],
    "bio": ["A concise description of their personality and role, using personality={personality} and occupation={occupation}."],
    "lore": ["A detailed backstory with one sentence per element, using personality={personality}, appearance={appearance}, body type={body_type}, occupation={occupation}."],
    "knowledge": ["Phrases describing knowledge or skills relevant to {occupation} and other general topics, one phrase per element."],
    "messageExamples": [
        [
            {{ "user": "{{{{user1}}}}", "content": {{ "text": "What are you thinking about?" }} }},
            {{ "user": {name}, "content": {{ "text": "A creative and engaging reply in the style of their personality." }} }}
        ],
        [
            {{ "user": "{{{{user1}}}}", "content": {{ "text": "What's your latest project?" }} }},
            {{ "user": {name}, "content": {{ "text": "What they are working on, using {occupation} skills and their personality." }} }}
        ]
    ],
    "postExamples": ["Short social media style posts reflecting their personality and interests."],
    "topics": ["A few topics they enjoy discussing."],
    "style": {{
        "all": ["One-word adjectives describing the overall style, e.g. friendly, witty."],
        "chat": ["One-word adjectives describing the style used in chat."],
        "post": ["One-word adjectives describing the style used in posts."]
    }},
    "adjectives": ["Personality traits based on the overall personality."]
}}

Self-verification: before answering, check that every required property exists, every field matches the schema, and no extra fields were added. If anything is wrong, regenerate the JSON.

Output only the raw JSON with no explanation."#
        );

        Prompt {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::character_schema;

    fn request() -> CharacterRequest {
        CharacterRequest {
            name: "Ava".into(),
            personality: "sardonic".into(),
            appearance: "tall, grey coat".into(),
            body_type: "athletic".into(),
            occupation: "detective".into(),
            clients: vec!["telegram".into()],
            model_provider: "openai".into(),
        }
    }

    #[test]
    fn embeds_schema_fixed_values_and_context() {
        let prompt = Prompt::compose(&request(), &Defaults::default(), character_schema());
        assert_eq!(prompt.system, SYSTEM_PROMPT);
        assert!(prompt.user.contains("\"messageExamples\""));
        assert!(prompt.user.contains("\"required\""));
        assert!(prompt.user.contains(r#"name: "Ava""#));
        assert!(prompt.user.contains(r#"clients: ["telegram"]"#));
        assert!(prompt.user.contains(r#"modelProvider: "openai""#));
        assert!(prompt.user.contains(r#"imageModelProvider: "falai""#));
        assert!(prompt.user.contains(r#"settings.voice.model: "en_US-female-medium""#));
        assert!(prompt.user.contains("occupation=detective"));
        assert!(prompt.user.contains("appearance=tall, grey coat"));
        assert!(prompt.user.contains(r#""user": "{{user1}}""#));
    }

    #[test]
    fn quotes_in_fixed_values_stay_valid_json() {
        let mut req = request();
        req.name = r#"Ava "The Hound""#.into();
        let prompt = Prompt::compose(&req, &Defaults::default(), character_schema());
        assert!(prompt.user.contains(r#""name": "Ava \"The Hound\"""#));
    }

    #[test]
    fn composition_is_deterministic() {
        let defaults = Defaults {
            voice_model: "en_GB-male-low".into(),
            image_model_provider: "openai".into(),
        };
        let a = Prompt::compose(&request(), &defaults, character_schema());
        let b = Prompt::compose(&request(), &defaults, character_schema());
        assert_eq!(a, b);
        assert!(a.user.contains("en_GB-male-low"));
    }
}
