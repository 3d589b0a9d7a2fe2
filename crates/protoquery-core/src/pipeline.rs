//! compile → execute → decode → merge.

use serde_json::{json, Value};
use tracing::{debug, info, trace};

use crate::compiler::{compile, CompiledQuery, OutputShape};
use crate::decoder::{decode_row, DecodeOptions, Vocabulary};
use crate::error::TransformError;
use crate::executor::SparqlExecutor;
use crate::merger::merge_instances;
use crate::options::TransformOptions;
use crate::results::SparqlResults;

/// Runs prototype documents against one executor.
///
/// Holds no mutable state, so a single transformer can serve concurrent
/// requests.
pub struct Transformer<E> {
    executor: E,
    options: TransformOptions,
}

impl<E: SparqlExecutor> Transformer<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            options: TransformOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TransformOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Compile without executing.
    pub fn compile(&self, input: &Value) -> Result<CompiledQuery, TransformError> {
        let compiled = compile(input)?;
        if self.options.log_queries {
            info!(query = %compiled.sparql, "compiled query");
        } else {
            debug!(query = %compiled.sparql, "compiled query");
        }
        Ok(compiled)
    }

    /// Full pipeline. Any compile or execution failure aborts the whole
    /// invocation.
    pub async fn transform(&self, input: &Value) -> Result<Value, TransformError> {
        let compiled = self.compile(input)?;
        let results = self
            .executor
            .execute(&compiled.sparql, &self.options.params)
            .await?;
        debug!(rows = results.rows().len(), "query executed");
        Ok(self.assemble(&compiled, &results))
    }

    /// Turn a result set into the output document.
    pub fn assemble(&self, compiled: &CompiledQuery, results: &SparqlResults) -> Value {
        let vocabulary = match compiled.shape {
            OutputShape::Graph { .. } => Vocabulary::JsonLd,
            OutputShape::Plain => Vocabulary::Plain,
        };
        let decode = DecodeOptions {
            lang_tag: compiled.lang_tag.unwrap_or(self.options.lang_tag),
            vocabulary,
        };

        let instances = results.rows().iter().enumerate().map(|(index, row)| {
            trace!(row = index, "decoding row");
            decode_row(row, &compiled.template, &decode)
        });
        let mut merged = merge_instances(instances);
        debug!(
            rows = results.rows().len(),
            entries = merged.len(),
            "merged result rows"
        );

        if let Some(pagination) = &compiled.pagination {
            merged = pagination.apply(merged);
        }
        let entries: Vec<Value> = merged.into_iter().map(|entry| entry.into_json()).collect();

        match &compiled.shape {
            OutputShape::Graph { context } => json!({
                "@context": self.options.resolve_context(context.as_ref()),
                "@graph": entries,
            }),
            OutputShape::Plain => Value::Array(entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionError;
    use crate::executor::MockExecutor;
    use crate::results::{Binding, Row};
    use protoquery_dsl::LangTag;

    fn row(pairs: &[(&str, Binding)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn rome_rows() -> SparqlResults {
        SparqlResults::new(
            vec!["id".to_string(), "v1".to_string()],
            vec![
                row(&[
                    ("id", Binding::iri("http://dbpedia.org/resource/Rome")),
                    ("v1", Binding::tagged("Roma", "it")),
                ]),
                row(&[
                    ("id", Binding::iri("http://dbpedia.org/resource/Rome")),
                    ("v1", Binding::tagged("Rome", "en")),
                ]),
            ],
        )
    }

    #[tokio::test]
    async fn graph_documents_get_jsonld_envelope() {
        let transformer = Transformer::new(MockExecutor::new(rome_rows()));
        let input = json!({
            "@context": "http://schema.org/",
            "@graph": [{"@id": "?id", "name": "$rdfs:label", "@type": "City"}],
            "$where": "?id a dbo:City"
        });
        let output = transformer.transform(&input).await.unwrap();
        assert_eq!(
            output,
            json!({
                "@context": "http://schema.org/",
                "@graph": [{
                    "@type": "City",
                    "@id": "http://dbpedia.org/resource/Rome",
                    "name": [
                        {"@language": "it", "@value": "Roma"},
                        {"@language": "en", "@value": "Rome"}
                    ]
                }]
            })
        );
    }

    #[tokio::test]
    async fn option_lang_tag_applies_without_document_override() {
        let options = TransformOptions {
            lang_tag: LangTag::Hide,
            ..TransformOptions::default()
        };
        let transformer = Transformer::new(MockExecutor::new(rome_rows())).with_options(options);
        let input = json!({"proto": {"id": "?id", "name": "$rdfs:label"}});
        let output = transformer.transform(&input).await.unwrap();
        assert_eq!(
            output,
            json!([{"id": "http://dbpedia.org/resource/Rome", "name": ["Roma", "Rome"]}])
        );

        // A root `$langTag` wins over the options.
        let input = json!({"proto": {"id": "?id", "name": "$rdfs:label"}, "$langTag": "show"});
        let output = transformer.transform(&input).await.unwrap();
        assert_eq!(
            output[0]["name"][0],
            json!({"language": "it", "value": "Roma"})
        );
    }

    #[tokio::test]
    async fn library_pagination_slices_merged_entries() {
        let rows = ["A", "B", "C"]
            .iter()
            .map(|id| row(&[("id", Binding::iri(format!("http://example.org/{id}")))]))
            .collect();
        let transformer = Transformer::new(MockExecutor::new(SparqlResults::new(
            vec!["id".to_string()],
            rows,
        )));
        let input = json!({
            "proto": {"id": "?id"},
            "$limit": 1, "$offset": 1, "$limitMode": "library"
        });
        let output = transformer.transform(&input).await.unwrap();
        assert_eq!(output, json!([{"id": "http://example.org/B"}]));
        assert!(!transformer.executor().queries()[0].contains("LIMIT"));
    }

    #[tokio::test]
    async fn execution_failures_propagate() {
        let error = ExecutionError::Http {
            status: 503,
            message: "unavailable".to_string(),
        };
        let transformer = Transformer::new(MockExecutor::failing(error.clone()));
        let result = transformer
            .transform(&json!({"proto": {"id": "?id"}}))
            .await;
        assert_eq!(result, Err(TransformError::Execution(error)));
    }

    #[tokio::test]
    async fn compile_errors_skip_execution() {
        let transformer = Transformer::new(MockExecutor::new(SparqlResults::default()));
        let result = transformer.transform(&json!({"nothing": true})).await;
        assert!(matches!(result, Err(TransformError::Compile(_))));
        assert!(transformer.executor().queries().is_empty());
    }

    #[test]
    fn transformer_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Transformer<MockExecutor>>();
    }
}
