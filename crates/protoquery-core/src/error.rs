use protoquery_dsl::{DirectiveError, ModifierError};
use thiserror::Error;

/// Errors raised while turning an input document into a query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("property `{property}`: {source}")]
    Directive {
        property: String,
        #[source]
        source: DirectiveError,
    },

    #[error(transparent)]
    Modifier(#[from] ModifierError),

    #[error(
        "property `{property}`: bestlang requires a language declared inline or with the root `$lang`"
    )]
    MissingLanguage { property: String },
}

/// Failures of the execution collaborator. Never retried by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("not a valid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("endpoint answered with HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("query execution failed: {0}")]
    Execution(#[from] ExecutionError),
}
