//! Protoquery prototype DSL
//!
//! A prototype is a JSON object whose string values are small programs:
//!
//! - `"$rdfs:label$required$lang:en"` traverses `rdfs:label` from the node's
//!   root, as a mandatory pattern, keeping only English literals;
//! - `"?id"` binds the property to a variable declared elsewhere.
//!
//! This crate parses those values ([`directive`]) and the `$`-prefixed query
//! modifiers that sit next to the prototype ([`modifiers`]). It performs no
//! I/O and knows nothing about result decoding.

pub mod directive;
pub mod modifiers;

pub use directive::{
    Aggregate, Accept, Directive, DirectiveError, DirectiveOptions, LangFilter, LangTag,
};
pub use modifiers::{LimitMode, ModifierError, QueryModifiers};

/// Sigil that marks a value (or a top-level key) as part of the DSL.
pub const DIRECTIVE_SIGIL: char = '$';

/// Sigil of an already-named SPARQL variable.
pub const VARIABLE_SIGIL: char = '?';

/// Prefix `name` with `?` unless it already carries it.
pub fn sparql_var(name: &str) -> String {
    if name.starts_with(VARIABLE_SIGIL) {
        name.to_string()
    } else {
        format!("{VARIABLE_SIGIL}{name}")
    }
}

/// Strip the leading `?` of a SPARQL variable, as used for result bindings.
pub fn bare_var(name: &str) -> &str {
    name.strip_prefix(VARIABLE_SIGIL).unwrap_or(name)
}
