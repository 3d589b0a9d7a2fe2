//! SPARQL 1.1 query results, JSON format.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One result row: variable name (without `?`) → binding.
pub type Row = HashMap<String, Binding>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub head: ResultHead,
    #[serde(default)]
    pub results: ResultRows,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultHead {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRows {
    #[serde(default)]
    pub bindings: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// `uri`, `literal`, `typed-literal` or `bnode`.
    #[serde(rename = "type", default)]
    pub kind: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Binding {
    pub fn iri(value: impl Into<String>) -> Self {
        Self {
            kind: "uri".to_string(),
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: "literal".to_string(),
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            kind: "typed-literal".to_string(),
            value: value.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn tagged(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            kind: "literal".to_string(),
            value: value.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }
}

impl SparqlResults {
    pub fn new(vars: Vec<String>, bindings: Vec<Row>) -> Self {
        Self {
            head: ResultHead { vars },
            results: ResultRows { bindings },
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.results.bindings
    }
}
