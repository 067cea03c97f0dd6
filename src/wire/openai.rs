//! OpenAI-compatible chunk validation.
//!
//! The chat-completions SSE dialect as actually spoken in the wild, which is
//! messier than the documentation: Perplexity tags chunks `chat.completion`,
//! Azure's first packet carries an empty object tag, DeepSeek sends
//! `role: null`, TogetherAI nulls out `function.name`/`arguments`, Mistral
//! omits the tool-call index, OpenRouter omits the choice index, and several
//! providers attach undocumented `error`/`warning` members to otherwise
//! healthy chunks. All of that is tolerated here; only genuinely malformed
//! payloads are rejected.

use serde_json::Value;

use crate::error::GenError;
use crate::types::{CanonicalChunk, FinishReason, TokenUsage, ToolCallDelta};

use super::{
    ChunkValidator, Dialect, join_path, optional_str, require_array, require_object, require_str,
};

/// Object tags accepted for a streaming chunk. `chat.completion` is a known
/// Perplexity misnomer; the empty string is Azure's prompt-filter packet.
const CHUNK_OBJECT_TAGS: &[&str] = &["chat.completion.chunk", "chat.completion", ""];

/// Validator for the OpenAI-compatible streaming dialect.
#[derive(Debug, Default, Clone)]
pub struct OpenAiCompatValidator;

impl OpenAiCompatValidator {
    pub fn new() -> Self {
        Self
    }

    fn validate_chunk(&self, raw: &Value) -> Result<CanonicalChunk, GenError> {
        let obj = require_object(raw, "")?;

        // Undocumented members observed inside otherwise-successful chunks
        // (first seen on streaming APIs in mid-2023). Tolerated, logged.
        if let Some(error) = obj.get("error")
            && !error.is_null()
        {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unspecified");
            tracing::warn!(message, "chunk carried an undocumented error member");
        }
        if let Some(Value::String(warning)) = obj.get("warning") {
            tracing::warn!(warning = %warning, "chunk carried an undocumented warning member");
        }

        let object_tag = require_str(obj, "object", "")?;
        if !CHUNK_OBJECT_TAGS.contains(&object_tag) {
            return Err(GenError::schema(
                "object",
                format!("unrecognized object tag `{object_tag}`"),
            ));
        }

        require_str(obj, "id", "")?;
        let model = require_str(obj, "model", "")?;
        match obj.get("created") {
            Some(v) if v.is_number() => {}
            Some(_) => return Err(GenError::schema("created", "expected a number")),
            None => return Err(GenError::schema("created", "required field is missing")),
        }

        // Choices may legitimately be empty: the final usage-bearing chunk
        // under `stream_options.include_usage` has no delta at all.
        let choices = require_array(obj, "choices", "")?;
        let mut text = None;
        let mut tool_calls = Vec::new();
        let mut finish = None;
        for (i, choice) in choices.iter().enumerate() {
            let parsed = self.validate_choice(choice, &format!("choices[{i}]"))?;
            // The derived ecosystem pins n=1; only the first choice is folded.
            if i == 0 {
                text = parsed.text;
                tool_calls = parsed.tool_calls;
                finish = parsed.finish;
            }
        }

        Ok(CanonicalChunk {
            text,
            tool_calls,
            finish,
            usage: parse_usage(obj)?,
            model: if model.is_empty() {
                None
            } else {
                Some(model.to_string())
            },
        })
    }

    fn validate_choice(&self, choice: &Value, path: &str) -> Result<ParsedChoice, GenError> {
        let obj = require_object(choice, path)?;

        // index is optional (OpenRouter omits it, implying 0).
        if let Some(index) = obj.get("index")
            && !index.is_null()
            && !index.is_number()
        {
            return Err(GenError::schema(join_path(path, "index"), "expected a number"));
        }

        let delta_path = join_path(path, "delta");
        let delta = match obj.get("delta") {
            Some(delta) => require_object(delta, &delta_path)?,
            None => return Err(GenError::schema(delta_path, "required field is missing")),
        };

        // role is nullable (DeepSeek) and its value is not enumerated-checked:
        // unknown roles are an extension, not an error, and unused here anyway.
        let text = optional_str(delta, "content", &delta_path)?
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let mut tool_calls = Vec::new();
        if let Some(raw_calls) = delta.get("tool_calls")
            && !raw_calls.is_null()
        {
            let calls_path = join_path(&delta_path, "tool_calls");
            let raw_calls = raw_calls
                .as_array()
                .ok_or_else(|| GenError::schema(calls_path.as_str(), "expected an array"))?;
            for (i, call) in raw_calls.iter().enumerate() {
                tool_calls.push(self.validate_tool_call(call, &format!("{calls_path}[{i}]"))?);
            }
        }

        let finish = FinishReason::from_wire(optional_str(obj, "finish_reason", path)?);

        Ok(ParsedChoice {
            text,
            tool_calls,
            finish,
        })
    }

    fn validate_tool_call(&self, call: &Value, path: &str) -> Result<ToolCallDelta, GenError> {
        let obj = require_object(call, path)?;

        // Only 'function' calls exist on this wire today; the tag itself is
        // optional after the opening chunk.
        if let Some(kind) = obj.get("type")
            && !kind.is_null()
            && kind.as_str() != Some("function")
        {
            return Err(GenError::schema(
                join_path(path, "type"),
                "expected literal `function`",
            ));
        }

        let index = match obj.get("index") {
            None | Some(Value::Null) => None, // [Mistral] not present
            Some(v) => Some(v.as_u64().ok_or_else(|| {
                GenError::schema(join_path(path, "index"), "expected a number")
            })? as u32),
        };

        let id = optional_str(obj, "id", path)?.map(str::to_string);

        let function_path = join_path(path, "function");
        let function = match obj.get("function") {
            Some(function) => require_object(function, &function_path)?,
            None => return Err(GenError::schema(function_path, "required field is missing")),
        };
        let name = optional_str(function, "name", &function_path)?.map(str::to_string);
        let arguments = optional_str(function, "arguments", &function_path)?.map(str::to_string);

        Ok(ToolCallDelta {
            id,
            index,
            name,
            arguments,
        })
    }
}

struct ParsedChoice {
    text: Option<String>,
    tool_calls: Vec<ToolCallDelta>,
    finish: Option<FinishReason>,
}

fn parse_usage(obj: &serde_json::Map<String, Value>) -> Result<Option<TokenUsage>, GenError> {
    let usage = match obj.get("usage") {
        None | Some(Value::Null) => return Ok(None),
        Some(usage) => require_object(usage, "usage")?,
    };
    let counter = |field: &str| -> Result<u32, GenError> {
        usage
            .get(field)
            .and_then(Value::as_u64)
            .map(|n| n as u32)
            .ok_or_else(|| GenError::schema(join_path("usage", field), "expected a number"))
    };
    Ok(Some(TokenUsage {
        prompt_tokens: counter("prompt_tokens")?,
        completion_tokens: counter("completion_tokens")?,
        total_tokens: counter("total_tokens")?,
    }))
}

impl ChunkValidator for OpenAiCompatValidator {
    fn dialect(&self) -> Dialect {
        Dialect::OpenAiCompat
    }

    fn validate(&self, raw: &Value) -> Result<CanonicalChunk, GenError> {
        self.validate_chunk(raw)
    }
}
