//! Chat-completion request types (OpenAI-compatible wire shape).
//!
//! These serialize directly into the request body the transport sends.
//! Validation happens locally before anything leaves the process, so range
//! and pattern errors surface as [`GenError::InvalidRequest`] instead of a
//! provider 400.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::GenError;

lazy_static! {
    /// Tool names must be 1-64 characters of `[a-zA-Z0-9_-]`.
    static ref TOOL_NAME_RE: Regex = Regex::new(r"^[a-zA-Z0-9_-]{1,64}$").unwrap();
}

/// One typed part of a multi-part user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// Either a URL or base64-encoded image data.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ImageDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Auto,
    Low,
    High,
}

/// User message content: a plain string or an array of typed parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl From<&str> for UserContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// A completed tool call echoed back in assistant history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedToolCall {
    #[serde(rename = "type")]
    pub kind: ToolKind,
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw argument string; the model does not always produce valid JSON.
    pub arguments: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Function,
}

/// Role-tagged chat message, discriminated by the `role` field on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: UserContent,
    },
    Assistant {
        /// Required on the wire but nullable: tool-call-only turns carry
        /// `content: null`.
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<CompletedToolCall>>,
    },
    Tool {
        content: String,
        tool_call_id: String,
    },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: UserContent::Text(content.into()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            tool_calls: None,
        }
    }
}

/// Function tool definition offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema object describing the accepted arguments. Omitting it
    /// defines a function with an empty parameter list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: ToolKind,
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Option<serde_json::Value>,
    ) -> Self {
        Self {
            kind: ToolKind::Function,
            function: FunctionDefinition {
                name: name.into(),
                description: Some(description.into()),
                parameters,
            },
        }
    }
}

/// Tool-calling policy.
///
/// On the wire this is the bare strings `"none"` / `"auto"` / `"required"`
/// or a `{ "type": "function", "function": { "name": .. } }` object, so the
/// serde impls are written by hand.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ToolChoice {
    None,
    #[default]
    Auto,
    Required,
    /// Force one specific function.
    Function { name: String },
}

impl ToolChoice {
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function { name: name.into() }
    }
}

impl Serialize for ToolChoice {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_str("none"),
            Self::Auto => serializer.serialize_str("auto"),
            Self::Required => serializer.serialize_str("required"),
            Self::Function { name } => serde_json::json!({
                "type": "function",
                "function": { "name": name },
            })
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ToolChoice {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match &value {
            serde_json::Value::String(s) => match s.as_str() {
                "none" => Ok(Self::None),
                "auto" => Ok(Self::Auto),
                "required" => Ok(Self::Required),
                other => Err(serde::de::Error::custom(format!(
                    "unknown tool_choice `{other}`"
                ))),
            },
            serde_json::Value::Object(_) => {
                let name = value
                    .pointer("/function/name")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| serde::de::Error::custom("tool_choice missing function.name"))?;
                Ok(Self::Function {
                    name: name.to_string(),
                })
            }
            _ => Err(serde::de::Error::custom("tool_choice must be string or object")),
        }
    }
}

/// A chat-generation request in the OpenAI-compatible dialect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Up to 4 sequences where the API stops generating further tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

impl ChatRequest {
    /// Minimal request for `model` with the given history.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            tool_choice: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            stop: None,
            seed: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>, choice: ToolChoice) -> Self {
        self.tools = Some(tools);
        self.tool_choice = Some(choice);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Check the request against the constraints the wire enforces.
    pub fn validate(&self) -> Result<(), GenError> {
        if self.model.trim().is_empty() {
            return Err(GenError::InvalidRequest("model id is empty".to_string()));
        }
        if self.messages.is_empty() {
            return Err(GenError::InvalidRequest(
                "message list is empty".to_string(),
            ));
        }
        if let Some(t) = self.temperature
            && !(0.0..=2.0).contains(&t)
        {
            return Err(GenError::InvalidRequest(format!(
                "temperature {t} outside 0..=2"
            )));
        }
        if let Some(p) = self.top_p
            && !(0.0..=1.0).contains(&p)
        {
            return Err(GenError::InvalidRequest(format!(
                "top_p {p} outside 0..=1"
            )));
        }
        if let Some(tools) = &self.tools {
            for tool in tools {
                if !TOOL_NAME_RE.is_match(&tool.function.name) {
                    return Err(GenError::InvalidRequest(format!(
                        "tool name `{}` must be 1-64 characters of letters, numbers, underscores and hyphens",
                        tool.function.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChatRequest {
        ChatRequest::new("gpt-4o-mini", vec![ChatMessage::user("Hello")])
    }

    #[test]
    fn messages_serialize_with_role_tag() {
        let json = serde_json::to_value(ChatMessage::system("be brief")).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "be brief");

        let json = serde_json::to_value(ChatMessage::Assistant {
            content: None,
            tool_calls: None,
        })
        .unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json["content"].is_null());
    }

    #[test]
    fn multi_part_user_content_serializes_as_typed_parts() {
        let message = ChatMessage::User {
            content: UserContent::Parts(vec![
                ContentPart::Text {
                    text: "what is in this image?".to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "https://example.com/cat.png".to_string(),
                        detail: Some(ImageDetail::Low),
                    },
                },
            ]),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(json["content"][1]["image_url"]["detail"], "low");

        let back: ChatMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn tool_choice_serializes_as_bare_string_or_object() {
        assert_eq!(serde_json::to_value(ToolChoice::Auto).unwrap(), "auto");
        assert_eq!(serde_json::to_value(ToolChoice::None).unwrap(), "none");
        let forced = serde_json::to_value(ToolChoice::function("lookup")).unwrap();
        assert_eq!(forced["type"], "function");
        assert_eq!(forced["function"]["name"], "lookup");
    }

    #[test]
    fn validate_accepts_plain_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_sampling() {
        assert!(request().with_temperature(2.5).validate().is_err());
        assert!(request().with_top_p(1.5).validate().is_err());
        assert!(request().with_temperature(2.0).validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_tool_names() {
        let bad = request().with_tools(
            vec![ToolDefinition::function("no spaces!", "desc", None)],
            ToolChoice::Auto,
        );
        assert!(matches!(
            bad.validate(),
            Err(GenError::InvalidRequest(msg)) if msg.contains("no spaces!")
        ));

        let ok = request().with_tools(
            vec![ToolDefinition::function("get_weather-v2", "desc", None)],
            ToolChoice::Auto,
        );
        assert!(ok.validate().is_ok());
    }
}
