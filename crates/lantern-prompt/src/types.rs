//! Prompt wire types.

use serde::{Deserialize, Serialize};

/// A versioned prompt as stored by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub name: String,
    pub version: u32,
    pub prompt: PromptContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    /// True when this value was built from a caller-supplied fallback
    /// instead of an API response. Never serialized.
    #[serde(skip)]
    pub is_fallback: bool,
}

impl Prompt {
    /// Builds the placeholder prompt served when a fetch fails and the
    /// caller supplied a fallback.
    pub fn fallback(name: impl Into<String>, content: PromptContent) -> Self {
        Self {
            name: name.into(),
            version: 0,
            prompt: content,
            config: None,
            labels: Vec::new(),
            tags: Vec::new(),
            commit_message: None,
            is_fallback: true,
        }
    }

    pub fn prompt_type(&self) -> PromptType {
        match self.prompt {
            PromptContent::Text(_) => PromptType::Text,
            PromptContent::Chat(_) => PromptType::Chat,
        }
    }
}

/// Prompt payload: a plain template string or a list of chat messages.
///
/// The wire format carries either shape in the same `prompt` field, so this
/// deserializes untagged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptContent {
    Text(String),
    Chat(Vec<ChatMessage>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptType {
    Text,
    Chat,
}

/// Body for creating a new prompt version.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromptRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub prompt_type: PromptType,
    pub prompt: PromptContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
}

impl CreatePromptRequest {
    pub fn new(name: impl Into<String>, content: PromptContent) -> Self {
        let prompt_type = match content {
            PromptContent::Text(_) => PromptType::Text,
            PromptContent::Chat(_) => PromptType::Chat,
        };
        Self {
            name: name.into(),
            prompt_type,
            prompt: content,
            config: None,
            labels: Vec::new(),
            commit_message: None,
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_prompt_deserializes() {
        let raw = r#"{
            "name": "greeting",
            "version": 3,
            "prompt": "Hello {{name}}",
            "labels": ["production"],
            "tags": []
        }"#;

        let prompt: Prompt = serde_json::from_str(raw).unwrap();
        assert_eq!(prompt.version, 3);
        assert_eq!(prompt.prompt_type(), PromptType::Text);
        assert!(!prompt.is_fallback);
    }

    #[test]
    fn test_chat_prompt_deserializes() {
        let raw = r#"{
            "name": "support",
            "version": 1,
            "prompt": [{"role": "system", "content": "You are helpful."}]
        }"#;

        let prompt: Prompt = serde_json::from_str(raw).unwrap();
        assert_eq!(prompt.prompt_type(), PromptType::Chat);
        match &prompt.prompt {
            PromptContent::Chat(messages) => assert_eq!(messages[0].role, "system"),
            PromptContent::Text(_) => panic!("expected chat content"),
        }
    }

    #[test]
    fn test_create_request_wire_shape() {
        let request = CreatePromptRequest::new("greeting", PromptContent::Text("Hi".into()))
            .with_labels(vec!["production".into()]);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["labels"][0], "production");
        assert!(value.get("config").is_none());
    }

    #[test]
    fn test_fallback_is_marked_and_not_serialized() {
        let prompt = Prompt::fallback("greeting", PromptContent::Text("Hi".into()));
        assert!(prompt.is_fallback);
        assert_eq!(prompt.version, 0);

        let value = serde_json::to_value(&prompt).unwrap();
        assert!(value.get("isFallback").is_none());
    }
}
