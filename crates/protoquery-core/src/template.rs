//! Compiled prototype: the decoding half of a compiled query.
//!
//! The compiler never rewrites the caller's document. Instead it produces a
//! [`NodeTemplate`] tree that mirrors the prototype shape and records, for
//! every property, whether it is a literal to copy, a variable to read from
//! the row (with its decode rules), or a nested node.

use protoquery_dsl::{Accept, LangTag};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeTemplate {
    /// Identity key of the node; `None` means instances never merge.
    pub anchor: Option<String>,
    /// Decode the node as a one-element list.
    pub list: bool,
    /// Properties in prototype order.
    pub entries: Vec<(String, Slot)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Literal(Value),
    Variable(VariableSlot),
    Node(NodeTemplate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSlot {
    /// Result variable, without `?`.
    pub variable: String,
    pub accept: Option<Accept>,
    /// Overrides the invocation-wide language tag visibility.
    pub lang_tag: Option<LangTag>,
    pub list: bool,
}

impl NodeTemplate {
    pub fn new(anchor: Option<String>) -> Self {
        Self {
            anchor,
            list: false,
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Slot> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, slot)| slot)
    }

    /// Every variable read by this node and its descendants, depth first.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        for (_, slot) in &self.entries {
            match slot {
                Slot::Variable(var) => out.push(&var.variable),
                Slot::Node(node) => node.collect_variables(out),
                Slot::Literal(_) => {}
            }
        }
    }
}
