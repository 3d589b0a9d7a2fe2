//! Top-level query modifiers (`$where`, `$limit`, `$prefixes`, ...).
//!
//! Modifiers live next to the prototype at the root of the input document.
//! They are pulled out once, before the prototype is compiled, and rendered
//! mostly verbatim into the query text.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::directive::LangTag;
use crate::{bare_var, sparql_var, DIRECTIVE_SIGIL};

/// Where `LIMIT`/`OFFSET` are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitMode {
    /// Emitted in the query text.
    #[default]
    Query,
    /// Applied to the merged output list.
    Library,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModifierError {
    #[error("modifier `{key}` expects {expected}, got {found}")]
    InvalidType {
        key: String,
        expected: &'static str,
        found: String,
    },

    #[error("modifier `{key}` has an invalid value: {reason}")]
    InvalidValue { key: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryModifiers {
    pub where_patterns: Vec<String>,
    pub filters: Vec<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub distinct: bool,
    pub order_by: Vec<String>,
    pub group_by: Vec<String>,
    pub having: Vec<String>,
    /// `(prefix, iri)` in document order.
    pub prefixes: Vec<(String, String)>,
    /// `(?variable, values)` in document order.
    pub values: Vec<(String, Vec<String>)>,
    pub from: Vec<String>,
    pub lang: Option<String>,
    pub lang_tag: Option<LangTag>,
    pub limit_mode: LimitMode,
}

impl Default for QueryModifiers {
    fn default() -> Self {
        Self {
            where_patterns: Vec::new(),
            filters: Vec::new(),
            limit: None,
            offset: None,
            distinct: true,
            order_by: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            prefixes: Vec::new(),
            values: Vec::new(),
            from: Vec::new(),
            lang: None,
            lang_tag: None,
            limit_mode: LimitMode::Query,
        }
    }
}

fn type_name(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
    .to_string()
}

fn invalid_type(key: &str, expected: &'static str, value: &Value) -> ModifierError {
    ModifierError::InvalidType {
        key: key.to_string(),
        expected,
        found: type_name(value),
    }
}

/// Scalar rendered as query text (numbers keep their JSON form).
fn scalar_text(key: &str, value: &Value) -> Result<String, ModifierError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(invalid_type(key, "a string or a list of strings", other)),
    }
}

/// A single value or a list of values; `null`, `false` and `""` mean none.
fn string_list(key: &str, value: &Value) -> Result<Vec<String>, ModifierError> {
    match value {
        Value::Null | Value::Bool(false) => Ok(Vec::new()),
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(|item| scalar_text(key, item)).collect(),
        other => Ok(vec![scalar_text(key, other)?]),
    }
}

fn count(key: &str, value: &Value) -> Result<Option<u64>, ModifierError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| ModifierError::InvalidValue {
                key: key.to_string(),
                reason: format!("`{n}` is not a non-negative integer"),
            }),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => {
            s.trim()
                .parse()
                .map(Some)
                .map_err(|_| ModifierError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("`{s}` is not a non-negative integer"),
                })
        }
        other => Err(invalid_type(key, "a number", other)),
    }
}

fn string(key: &str, value: &Value) -> Result<Option<String>, ModifierError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(invalid_type(key, "a string", other)),
    }
}

fn parsed<T>(key: &str, value: &Value) -> Result<Option<T>, ModifierError>
where
    T: std::str::FromStr,
{
    let Some(text) = string(key, value)? else {
        return Ok(None);
    };
    text.parse()
        .map(Some)
        .map_err(|_| ModifierError::InvalidValue {
            key: key.to_string(),
            reason: format!("unrecognised value `{text}`"),
        })
}

impl std::str::FromStr for LimitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(LimitMode::Query),
            "library" => Ok(LimitMode::Library),
            other => Err(format!("expected `query` or `library`, got `{other}`")),
        }
    }
}

impl QueryModifiers {
    /// Remove every `$`-prefixed key from `document` and interpret it.
    pub fn extract(document: &mut Map<String, Value>) -> Result<Self, ModifierError> {
        let keys: Vec<String> = document
            .keys()
            .filter(|k| k.starts_with(DIRECTIVE_SIGIL))
            .cloned()
            .collect();

        let mut modifiers = QueryModifiers::default();
        for key in keys {
            let Some(value) = document.shift_remove(&key) else {
                continue;
            };
            modifiers.apply(&key, &value)?;
        }
        Ok(modifiers)
    }

    fn apply(&mut self, key: &str, value: &Value) -> Result<(), ModifierError> {
        match key {
            "$where" => self.where_patterns = string_list(key, value)?,
            "$filter" => self.filters = string_list(key, value)?,
            "$limit" => self.limit = count(key, value)?,
            "$offset" => self.offset = count(key, value)?,
            "$distinct" => {
                self.distinct = match value {
                    Value::Bool(b) => *b,
                    Value::Null => true,
                    other => return Err(invalid_type(key, "a boolean", other)),
                }
            }
            "$orderby" => self.order_by = string_list(key, value)?,
            "$groupby" => self.group_by = string_list(key, value)?,
            "$having" => self.having = string_list(key, value)?,
            "$prefixes" => {
                let Value::Object(map) = value else {
                    return Err(invalid_type(key, "an object", value));
                };
                self.prefixes = map
                    .iter()
                    .map(|(prefix, iri)| Ok((prefix.clone(), scalar_text(key, iri)?)))
                    .collect::<Result<_, ModifierError>>()?;
            }
            "$values" => {
                let Value::Object(map) = value else {
                    return Err(invalid_type(key, "an object", value));
                };
                self.values = map
                    .iter()
                    .map(|(var, vals)| Ok((sparql_var(var), string_list(key, vals)?)))
                    .collect::<Result<_, ModifierError>>()?;
            }
            "$from" => self.from = string_list(key, value)?,
            "$lang" => self.lang = string(key, value)?,
            "$langTag" => self.lang_tag = parsed(key, value)?,
            "$limitMode" => self.limit_mode = parsed(key, value)?.unwrap_or_default(),
            other => {
                tracing::warn!(modifier = other, "ignoring unknown query modifier");
            }
        }
        Ok(())
    }

    /// Whether `$values` constrains `name` (a variable or a bare property key).
    pub fn binds(&self, name: &str) -> bool {
        let name = bare_var(name);
        self.values.iter().any(|(var, _)| bare_var(var) == name)
    }

    pub fn prefix_clauses(&self) -> Vec<String> {
        self.prefixes
            .iter()
            .map(|(prefix, iri)| format!("PREFIX {prefix}: <{iri}>"))
            .collect()
    }

    pub fn values_clauses(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|(var, values)| {
                let rendered: Vec<String> = values.iter().map(|v| values_term(v)).collect();
                format!("VALUES {var} {{{}}}", rendered.join(" "))
            })
            .collect()
    }

    pub fn from_clauses(&self) -> Vec<String> {
        self.from
            .iter()
            .map(|graph| {
                if graph.starts_with('<') {
                    format!("FROM {graph}")
                } else {
                    format!("FROM <{graph}>")
                }
            })
            .collect()
    }

    /// Solution modifiers following the `WHERE` block.
    pub fn trailing_clauses(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.group_by.is_empty() {
            out.push(format!("GROUP BY {}", self.group_by.join(" ")));
        }
        if !self.having.is_empty() {
            out.push(format!("HAVING ({})", self.having.join(" && ")));
        }
        if !self.order_by.is_empty() {
            out.push(format!("ORDER BY {}", self.order_by.join(" ")));
        }
        if self.limit_mode == LimitMode::Query {
            if let Some(limit) = self.limit {
                out.push(format!("LIMIT {limit}"));
            }
            if let Some(offset) = self.offset {
                out.push(format!("OFFSET {offset}"));
            }
        }
        out
    }
}

/// IRIs in angle brackets, prefixed names verbatim, anything else quoted.
fn values_term(value: &str) -> String {
    if value.starts_with("http") {
        format!("<{value}>")
    } else if value.contains(':') {
        value.to_string()
    } else {
        format!("\"{value}\"")
    }
}
