//! Wire schema validation: per-vendor dialects to canonical chunks.
//!
//! Each vendor dialect is a closed set of permissible event shapes keyed by a
//! literal discriminant field. Validation is pure: the same raw event always
//! yields the same chunk or the same error.

pub mod openai;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::GenError;
use crate::types::CanonicalChunk;

pub use openai::OpenAiCompatValidator;

/// Known wire dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// OpenAI chat-completions SSE chunks, as spoken (with quirks) by OpenAI
    /// itself and the long tail of compatible providers and routers.
    OpenAiCompat,
}

/// Validates one raw upstream event against a vendor dialect.
pub trait ChunkValidator: Send + Sync {
    /// The dialect this validator understands.
    fn dialect(&self) -> Dialect;

    /// Parse and validate a JSON-decoded upstream event.
    ///
    /// Fails with [`GenError::SchemaValidation`] naming the offending field
    /// path. Must be side-effect-free apart from tracing.
    fn validate(&self, raw: &serde_json::Value) -> Result<CanonicalChunk, GenError>;
}

/// Maps vendor identifiers to the applicable validator.
///
/// Model identifiers of the form `vendor:model` resolve by their vendor
/// prefix; a bare identifier is treated as a vendor id directly.
pub struct DialectRegistry {
    by_vendor: HashMap<String, Arc<dyn ChunkValidator>>,
}

/// Vendors that speak the OpenAI-compatible dialect out of the box.
const OPENAI_COMPAT_VENDORS: &[&str] = &[
    "openai",
    "azure",
    "openrouter",
    "deepseek",
    "groq",
    "together",
    "fireworks",
    "mistral",
    "perplexity",
    "xai",
    "localai",
    "siliconflow",
    "moonshot",
];

impl DialectRegistry {
    /// Empty registry; use [`DialectRegistry::with_builtin_dialects`] for the
    /// stock vendor table.
    pub fn new() -> Self {
        Self {
            by_vendor: HashMap::new(),
        }
    }

    /// Registry pre-populated with every builtin OpenAI-compatible vendor.
    pub fn with_builtin_dialects() -> Self {
        let mut registry = Self::new();
        let validator: Arc<dyn ChunkValidator> = Arc::new(OpenAiCompatValidator::new());
        for vendor in OPENAI_COMPAT_VENDORS {
            registry.register(*vendor, validator.clone());
        }
        registry
    }

    /// Register (or replace) the validator for a vendor id.
    pub fn register(&mut self, vendor: impl Into<String>, validator: Arc<dyn ChunkValidator>) {
        self.by_vendor.insert(vendor.into(), validator);
    }

    /// Resolve the validator for a model or vendor identifier.
    pub fn resolve(&self, llm_id: &str) -> Result<Arc<dyn ChunkValidator>, GenError> {
        let vendor = vendor_of(llm_id);
        self.by_vendor.get(vendor).cloned().ok_or_else(|| {
            GenError::Configuration(format!("no wire dialect registered for vendor `{vendor}`"))
        })
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::with_builtin_dialects()
    }
}

/// Vendor prefix of a `vendor:model` identifier, or the whole id.
pub fn vendor_of(llm_id: &str) -> &str {
    llm_id.split_once(':').map_or(llm_id, |(vendor, _)| vendor)
}

// JSON field access with path-bearing errors, shared by dialect impls.

pub(crate) fn require_object<'a>(
    value: &'a serde_json::Value,
    path: &str,
) -> Result<&'a serde_json::Map<String, serde_json::Value>, GenError> {
    value
        .as_object()
        .ok_or_else(|| GenError::schema(path, "expected a JSON object"))
}

pub(crate) fn require_str<'a>(
    obj: &'a serde_json::Map<String, serde_json::Value>,
    field: &str,
    parent: &str,
) -> Result<&'a str, GenError> {
    let path = join_path(parent, field);
    match obj.get(field) {
        Some(serde_json::Value::String(s)) => Ok(s),
        Some(_) => Err(GenError::schema(path, "expected a string")),
        None => Err(GenError::schema(path, "required field is missing")),
    }
}

pub(crate) fn require_array<'a>(
    obj: &'a serde_json::Map<String, serde_json::Value>,
    field: &str,
    parent: &str,
) -> Result<&'a Vec<serde_json::Value>, GenError> {
    let path = join_path(parent, field);
    match obj.get(field) {
        Some(serde_json::Value::Array(items)) => Ok(items),
        Some(_) => Err(GenError::schema(path, "expected an array")),
        None => Err(GenError::schema(path, "required field is missing")),
    }
}

/// Optional string: absent and `null` both map to `None`.
pub(crate) fn optional_str<'a>(
    obj: &'a serde_json::Map<String, serde_json::Value>,
    field: &str,
    parent: &str,
) -> Result<Option<&'a str>, GenError> {
    match obj.get(field) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(GenError::schema(
            join_path(parent, field),
            "expected a string or null",
        )),
    }
}

pub(crate) fn join_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_prefix_resolution() {
        assert_eq!(vendor_of("openai:gpt-4o"), "openai");
        assert_eq!(vendor_of("groq"), "groq");
        assert_eq!(vendor_of("openrouter:anthropic/claude-3.5"), "openrouter");
    }

    #[test]
    fn builtin_registry_covers_compatible_vendors() {
        let registry = DialectRegistry::default();
        for vendor in ["openai", "azure", "deepseek", "localai"] {
            let validator = registry.resolve(vendor).expect(vendor);
            assert_eq!(validator.dialect(), Dialect::OpenAiCompat);
        }
        assert!(registry.resolve("carrier-pigeon").is_err());
    }

    #[test]
    fn path_join() {
        assert_eq!(join_path("", "object"), "object");
        assert_eq!(join_path("choices[0]", "delta"), "choices[0].delta");
    }
}
