//! Protoquery core
//!
//! Turns a prototype document into a SPARQL `SELECT`, runs it through a
//! [`SparqlExecutor`], and folds the result rows back into objects shaped
//! like the prototype.
//!
//! ```text
//! document ──compile──▶ CompiledQuery { sparql, template }
//!                             │
//!                 executor ◀──┘ sparql
//!                    │ rows
//!                    ▼
//!           decode_row(row, template) ──▶ merge_instances ──▶ JSON
//! ```
//!
//! The pieces are usable on their own; [`Transformer`] wires them together.

pub mod compiler;
pub mod decoder;
pub mod error;
pub mod executor;
pub mod instance;
pub mod merger;
pub mod options;
pub mod pipeline;
pub mod results;
pub mod template;

pub use compiler::{compile, CompiledQuery, OutputShape, Pagination};
pub use decoder::{decode_binding, decode_row, DecodeOptions, Vocabulary};
pub use error::{CompileError, ExecutionError, TransformError};
pub use executor::{MockExecutor, QueryParams, SparqlExecutor};
pub use instance::{Instance, InstanceObject, Literal};
pub use merger::{merge_instances, merge_into};
pub use options::{TransformOptions, DEFAULT_CONTEXT, DEFAULT_ENDPOINT};
pub use pipeline::Transformer;
pub use results::{Binding, Row, SparqlResults};
pub use template::{NodeTemplate, Slot, VariableSlot};

pub use protoquery_dsl as dsl;
