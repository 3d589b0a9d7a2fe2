//! Prototype → SPARQL compiler.
//!
//! The prototype is walked depth first. Each level knows its *root*: the
//! variable that sub-patterns hang from and that identifies the entity for
//! merging. Nested objects are compiled with the parent's root as their
//! `prev_root`, and with a name prefix derived from their position so that
//! generated variables never collide:
//!
//! ```text
//! { "id": "?id",                      ?id
//!   "name": "$rdfs:label",            ?v1
//!   "country": {                      prefix v2_
//!     "id": "$dbo:country$required",  ?v2_r  (anchor, generated)
//!     "label": "$rdfs:label" } }      ?v2_1
//! ```

use protoquery_dsl::{
    bare_var, Accept, Directive, LangTag, LimitMode, QueryModifiers,
};
use serde_json::{Map, Value};

use crate::error::CompileError;
use crate::template::{NodeTemplate, Slot, VariableSlot};

/// Subject used when the root node has no anchor.
pub const DEFAULT_ROOT: &str = "?id";

const ROOT_PREFIX: &str = "v";

/// Property names that identify a node when nothing is marked `$anchor`.
const IDENTITY_KEYS: [&str; 2] = ["@id", "id"];

/// Input convention, mirrored by the output document.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputShape {
    /// `{ "@context": ..., "@graph": [...] }`.
    Graph { context: Option<Value> },
    /// `{ "proto": ... }` → a plain array.
    Plain,
}

/// Client-side `LIMIT`/`OFFSET`, applied to merged entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Pagination {
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = self.offset.unwrap_or(0) as usize;
        let limit = self.limit.map_or(usize::MAX, |l| l as usize);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sparql: String,
    /// Projected expressions, deduplicated, in first-seen order.
    pub projection: Vec<String>,
    pub template: NodeTemplate,
    pub shape: OutputShape,
    /// Root `$langTag`, if the document set one.
    pub lang_tag: Option<LangTag>,
    pub pagination: Option<Pagination>,
}

/// Compile an input document. The document itself is left untouched.
pub fn compile(input: &Value) -> Result<CompiledQuery, CompileError> {
    let Value::Object(document) = input else {
        return Err(CompileError::MalformedInput(
            "input must be a JSON object".to_string(),
        ));
    };
    let mut document = document.clone();
    let modifiers = QueryModifiers::extract(&mut document)?;

    let (prototype, shape) = if let Some(graph) = document.get("@graph") {
        let shape = OutputShape::Graph {
            context: document.get("@context").cloned(),
        };
        (first_object(graph, "@graph")?, shape)
    } else if let Some(proto) = document.get("proto") {
        (first_object(proto, "proto")?, OutputShape::Plain)
    } else {
        return Err(CompileError::MalformedInput(
            "expected a `@graph` or `proto` property holding the prototype".to_string(),
        ));
    };

    let mut compiler = Compiler::new(&modifiers);
    let root = compiler.compile_node(
        prototype,
        Scope {
            prefix: ROOT_PREFIX.to_string(),
            prev_root: None,
        },
    )?;
    let sparql = compiler.render(root.clauses);

    if compiler.aggregates && modifiers.group_by.is_empty() {
        tracing::debug!("aggregate projected without `$groupby`; grouping keys are not inferred");
    }

    let pagination = (modifiers.limit_mode == LimitMode::Library
        && (modifiers.limit.is_some() || modifiers.offset.is_some()))
    .then_some(Pagination {
        limit: modifiers.limit,
        offset: modifiers.offset,
    });

    Ok(CompiledQuery {
        sparql,
        projection: compiler.projection,
        template: root.template,
        shape,
        lang_tag: modifiers.lang_tag,
        pagination,
    })
}

fn first_object<'a>(value: &'a Value, key: &str) -> Result<&'a Map<String, Value>, CompileError> {
    let candidate = match value {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    match candidate {
        Some(Value::Object(map)) => Ok(map),
        _ => Err(CompileError::MalformedInput(format!(
            "`{key}` must be an object or an array starting with one"
        ))),
    }
}

// ============================================================================
// Tree walk
// ============================================================================

/// Per-level context, passed down by value.
struct Scope {
    prefix: String,
    prev_root: Option<String>,
}

struct Anchor {
    key: String,
    root: String,
    /// The whole node block is mandatory.
    block_required: bool,
    list: bool,
}

/// What a leaf needs to know about its node.
struct NodeContext<'a> {
    scope: &'a Scope,
    root: &'a str,
    anchor_key: Option<&'a str>,
}

struct CompiledNode {
    template: NodeTemplate,
    clauses: Vec<String>,
    required: bool,
}

struct Compiler<'m> {
    modifiers: &'m QueryModifiers,
    projection: Vec<String>,
    aggregates: bool,
}

impl<'m> Compiler<'m> {
    fn new(modifiers: &'m QueryModifiers) -> Self {
        Self {
            modifiers,
            projection: Vec::new(),
            aggregates: false,
        }
    }

    fn project(&mut self, expression: String) {
        if !self.projection.contains(&expression) {
            self.projection.push(expression);
        }
    }

    /// Explicit `$anchor` marker first, then `@id`, then `id`.
    fn resolve_anchor(node: &Map<String, Value>, scope: &Scope) -> Option<Anchor> {
        let directive_at = |value: &Value| match value {
            Value::String(s) => Directive::parse(s).ok().flatten(),
            _ => None,
        };

        let (key, directive) = node
            .iter()
            .find_map(|(key, value)| {
                directive_at(value)
                    .filter(|d| d.options().anchor)
                    .map(|d| (key.clone(), d))
            })
            .or_else(|| {
                IDENTITY_KEYS.iter().find_map(|key| {
                    node.get(*key)
                        .and_then(directive_at)
                        .map(|d| (key.to_string(), d))
                })
            })?;

        let block_required =
            directive.options().required || matches!(directive, Directive::Variable { .. });
        let root = directive
            .declared_var()
            .map(str::to_string)
            .unwrap_or_else(|| format!("?{}r", scope.prefix));

        Some(Anchor {
            key,
            root,
            block_required,
            list: directive.options().list,
        })
    }

    fn compile_node(
        &mut self,
        node: &Map<String, Value>,
        scope: Scope,
    ) -> Result<CompiledNode, CompileError> {
        let anchor = Self::resolve_anchor(node, &scope);
        let root = anchor
            .as_ref()
            .map(|a| a.root.clone())
            .or_else(|| scope.prev_root.clone())
            .unwrap_or_else(|| DEFAULT_ROOT.to_string());

        let mut template = NodeTemplate::new(anchor.as_ref().map(|a| a.key.clone()));
        template.list = anchor.as_ref().is_some_and(|a| a.list);
        let mut clauses = Vec::new();

        for (index, (key, value)) in node.iter().enumerate() {
            match value {
                Value::Object(child) => {
                    let child_scope = Scope {
                        prefix: format!("{}{}_", scope.prefix, index),
                        prev_root: Some(root.clone()),
                    };
                    let compiled = self.compile_node(child, child_scope)?;
                    if !compiled.clauses.is_empty() {
                        let group = compiled.clauses.join(" .\n");
                        clauses.push(if compiled.required {
                            group
                        } else {
                            format!("OPTIONAL {{ {group} }}")
                        });
                    }
                    template
                        .entries
                        .push((key.clone(), Slot::Node(compiled.template)));
                }
                Value::String(text) => {
                    let directive = Directive::parse(text).map_err(|source| {
                        CompileError::Directive {
                            property: key.clone(),
                            source,
                        }
                    })?;
                    let Some(directive) = directive else {
                        template
                            .entries
                            .push((key.clone(), Slot::Literal(value.clone())));
                        continue;
                    };

                    let ctx = NodeContext {
                        scope: &scope,
                        root: &root,
                        anchor_key: anchor.as_ref().map(|a| a.key.as_str()),
                    };
                    let (slot, clause) = self.compile_leaf(key, index, &directive, &ctx)?;
                    template.entries.push((key.clone(), Slot::Variable(slot)));
                    clauses.extend(clause);
                }
                other => template
                    .entries
                    .push((key.clone(), Slot::Literal(other.clone()))),
            }
        }

        Ok(CompiledNode {
            template,
            clauses,
            required: anchor.is_some_and(|a| a.block_required),
        })
    }

    fn compile_leaf(
        &mut self,
        key: &str,
        index: usize,
        directive: &Directive,
        ctx: &NodeContext<'_>,
    ) -> Result<(VariableSlot, Option<String>), CompileError> {
        let opts = directive.options();
        for token in &opts.unknown {
            tracing::warn!(property = key, option = %token, "ignoring unknown directive option");
        }

        let is_anchor = ctx.anchor_key == Some(key);
        let variable = match directive.declared_var() {
            Some(var) => var.to_string(),
            None if is_anchor => ctx.root.to_string(),
            None => format!("?{}{}", ctx.scope.prefix, index),
        };

        let best_lang = match &opts.best_lang {
            None => None,
            Some(code) => Some(
                code.clone()
                    .or_else(|| self.modifiers.lang.clone())
                    .ok_or_else(|| CompileError::MissingLanguage {
                        property: key.to_string(),
                    })?,
            ),
        };

        let projected = if let Some(lang) = &best_lang {
            format!("(sql:BEST_LANGMATCH({variable}, \"{lang}\", \"en\") AS {variable})")
        } else if let Some(aggregate) = opts.aggregate {
            self.aggregates = true;
            let distinct = if opts.distinct { "DISTINCT " } else { "" };
            format!("({}({distinct}{variable}) AS {variable})", aggregate.keyword())
        } else {
            variable.clone()
        };
        self.project(projected);

        let slot = VariableSlot {
            variable: bare_var(&variable).to_string(),
            accept: opts.accept.or(best_lang.as_ref().map(|_| Accept::String)),
            lang_tag: opts.lang_tag,
            list: opts.list && !is_anchor,
        };

        let Some(path) = directive.path() else {
            return Ok((slot, None));
        };

        // The anchor pattern links the node to its parent.
        let subject = match &ctx.scope.prev_root {
            Some(parent) if variable == ctx.root || opts.prev_root => parent.clone(),
            None if variable == ctx.root => DEFAULT_ROOT.to_string(),
            _ => ctx.root.to_string(),
        };

        let required = opts.required
            || is_anchor
            || IDENTITY_KEYS.contains(&key)
            || self.modifiers.binds(&variable)
            || self.modifiers.binds(key)
            || (opts.aggregate.is_some() && subject == ctx.root);

        let (s, o) = if opts.reverse {
            (variable.as_str(), subject.as_str())
        } else {
            (subject.as_str(), variable.as_str())
        };
        let mut pattern = format!("{s} {path} {o}");

        let lang = opts
            .lang
            .as_ref()
            .and_then(|l| l.code.clone().or_else(|| self.modifiers.lang.clone()));
        if let Some(code) = lang {
            if !self.modifiers.binds(&variable) {
                pattern.push_str(&format!(" .\nFILTER(lang({variable}) = '{code}')"));
            }
        }

        let clause = if required {
            pattern
        } else {
            format!("OPTIONAL {{ {pattern} }}")
        };
        Ok((slot, Some(clause)))
    }

    fn render(&self, node_clauses: Vec<String>) -> String {
        let m = self.modifiers;
        let mut lines = m.prefix_clauses();

        let projection = if self.projection.is_empty() {
            "*".to_string()
        } else {
            self.projection.join(" ")
        };
        let distinct = if m.distinct { "DISTINCT " } else { "" };
        lines.push(format!("SELECT {distinct}{projection}"));
        lines.extend(m.from_clauses());

        lines.push("WHERE {".to_string());
        for values in m.values_clauses() {
            lines.push(format!("  {values}"));
        }
        let patterns: Vec<String> = m
            .where_patterns
            .iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .chain(node_clauses)
            .collect();
        if !patterns.is_empty() {
            lines.push(format!("  {}", patterns.join(" .\n  ")));
        }
        for filter in &m.filters {
            lines.push(format!("  FILTER({filter})"));
        }
        lines.push("}".to_string());
        lines.extend(m.trailing_clauses());

        lines.join("\n")
    }
}
