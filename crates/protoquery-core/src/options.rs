//! Invocation-wide settings.

use protoquery_dsl::LangTag;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::executor::QueryParams;

pub const DEFAULT_ENDPOINT: &str = "http://dbpedia.org/sparql";

/// Context used for graph output when neither the options nor the input
/// document supply one.
pub const DEFAULT_CONTEXT: &str = "http://schema.org/";

/// Settings for one [`Transformer`](crate::Transformer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformOptions {
    /// Overrides the input document's `@context`.
    pub context: Option<Value>,
    pub endpoint: String,
    /// Applies when the document has no root `$langTag`.
    pub lang_tag: LangTag,
    /// Log compiled queries at `info` instead of `debug`.
    pub log_queries: bool,
    /// Forwarded to the executor with every query.
    pub params: QueryParams,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            context: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            lang_tag: LangTag::Show,
            log_queries: false,
            params: QueryParams::new(),
        }
    }
}

impl TransformOptions {
    /// Graph context: options, then the document's own, then the default.
    pub fn resolve_context(&self, document_context: Option<&Value>) -> Value {
        self.context
            .as_ref()
            .or(document_context)
            .cloned()
            .unwrap_or_else(|| Value::String(DEFAULT_CONTEXT.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_partial_config() {
        let options: TransformOptions =
            serde_json::from_value(json!({"langTag": "hide", "logQueries": true})).unwrap();
        assert_eq!(options.lang_tag, LangTag::Hide);
        assert!(options.log_queries);
        assert_eq!(options.endpoint, DEFAULT_ENDPOINT);
        assert!(options.context.is_none());
    }

    #[test]
    fn context_precedence() {
        let doc = json!({"@vocab": "http://example.org/"});
        let mut options = TransformOptions::default();
        assert_eq!(options.resolve_context(None), json!(DEFAULT_CONTEXT));
        assert_eq!(options.resolve_context(Some(&doc)), doc);

        options.context = Some(json!("http://override.example/"));
        assert_eq!(
            options.resolve_context(Some(&doc)),
            json!("http://override.example/")
        );
    }
}
