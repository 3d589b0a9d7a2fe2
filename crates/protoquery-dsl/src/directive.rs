//! Directive mini-language: one prototype value string.
//!
//! Surface grammar:
//!
//! ```text
//! directive := ('$' PATH | '?' VARIABLE) ('$' OPTION)*
//! OPTION    := required | var:NAME | sample | count | sum | min | max | avg
//!            | distinct | list | lang[:CODE] | langTag:(show|hide)
//!            | accept:(string|number|boolean) | bestlang[:CODE]
//!            | prevRoot | reverse | anchor
//! ```
//!
//! Values without a leading sigil are not directives; they pass through the
//! compiler untouched (e.g. an `@type` tag).

use nom::{
    branch::alt,
    bytes::complete::take_while,
    character::complete::char as pchar,
    combinator::all_consuming,
    multi::many0,
    sequence::{preceded, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::{sparql_var, DIRECTIVE_SIGIL, VARIABLE_SIGIL};

// ============================================================================
// Typed options
// ============================================================================

/// Aggregate applied to a projected variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Sample,
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl Aggregate {
    pub fn keyword(self) -> &'static str {
        match self {
            Aggregate::Sample => "SAMPLE",
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::Avg => "AVG",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "sample" => Aggregate::Sample,
            "count" => Aggregate::Count,
            "sum" => Aggregate::Sum,
            "min" => Aggregate::Min,
            "max" => Aggregate::Max,
            "avg" => Aggregate::Avg,
            _ => return None,
        })
    }
}

/// Visibility of language tags on decoded literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LangTag {
    #[default]
    Show,
    Hide,
}

impl FromStr for LangTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "show" => Ok(LangTag::Show),
            "hide" => Ok(LangTag::Hide),
            other => Err(format!("expected `show` or `hide`, got `{other}`")),
        }
    }
}

impl fmt::Display for LangTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LangTag::Show => f.write_str("show"),
            LangTag::Hide => f.write_str("hide"),
        }
    }
}

/// Runtime type a decoded value must have to be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accept {
    String,
    Number,
    Boolean,
}

impl FromStr for Accept {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Accept::String),
            "number" => Ok(Accept::Number),
            "boolean" => Ok(Accept::Boolean),
            other => Err(format!(
                "expected `string`, `number` or `boolean`, got `{other}`"
            )),
        }
    }
}

/// `lang[:code]`: keep only literals in one language. Without a code the
/// root-level `$lang` applies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LangFilter {
    pub code: Option<String>,
}

/// Everything after the first `$`-separated segment of a directive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectiveOptions {
    pub required: bool,
    /// Explicit variable, normalised to `?name`.
    pub var: Option<String>,
    pub aggregate: Option<Aggregate>,
    pub distinct: bool,
    pub list: bool,
    pub lang: Option<LangFilter>,
    pub lang_tag: Option<LangTag>,
    pub accept: Option<Accept>,
    /// `bestlang[:code]`; `Some(None)` defers to the root `$lang`.
    pub best_lang: Option<Option<String>>,
    pub prev_root: bool,
    pub reverse: bool,
    /// Marks the property as the identity key of its node.
    pub anchor: bool,
    /// Tokens this version does not understand, kept verbatim.
    pub unknown: Vec<String>,
}

impl DirectiveOptions {
    fn parse<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Result<Self, DirectiveError> {
        let mut options = DirectiveOptions::default();

        for token in tokens {
            if token.is_empty() {
                continue;
            }
            let (name, arg) = match token.split_once(':') {
                Some((name, arg)) => (name, Some(arg)),
                None => (token, None),
            };

            match (name, arg) {
                ("required", None) => options.required = true,
                ("distinct", None) => options.distinct = true,
                ("list", None) => options.list = true,
                ("prevRoot", None) => options.prev_root = true,
                ("reverse", None) => options.reverse = true,
                ("anchor", None) => options.anchor = true,
                ("var", Some(var)) => {
                    let var = var.trim_start_matches(VARIABLE_SIGIL);
                    if var.is_empty() {
                        return Err(DirectiveError::EmptyVariable);
                    }
                    options.var = Some(sparql_var(var));
                }
                ("lang", code) => {
                    options.lang = Some(LangFilter {
                        code: code.filter(|c| !c.is_empty()).map(str::to_string),
                    });
                }
                ("langTag", Some(value)) => {
                    let tag = value.parse().map_err(|reason| DirectiveError::InvalidOption {
                        option: token.to_string(),
                        reason,
                    })?;
                    options.lang_tag = Some(tag);
                }
                ("accept", Some(value)) => {
                    let accept = value.parse().map_err(|reason| DirectiveError::InvalidOption {
                        option: token.to_string(),
                        reason,
                    })?;
                    options.accept = Some(accept);
                }
                ("bestlang", code) => {
                    options.best_lang = Some(code.filter(|c| !c.is_empty()).map(str::to_string));
                }
                (name, None) if Aggregate::from_token(name).is_some() => {
                    // First aggregate wins.
                    if options.aggregate.is_none() {
                        options.aggregate = Aggregate::from_token(name);
                    }
                }
                _ => options.unknown.push(token.to_string()),
            }
        }

        Ok(options)
    }
}

// ============================================================================
// Directive
// ============================================================================

/// A parsed prototype value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `?name…`: bind to an existing variable, emit no pattern.
    Variable {
        name: String,
        options: DirectiveOptions,
    },
    /// `$path…`: emit `subject path object`.
    Pattern {
        path: String,
        options: DirectiveOptions,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("directive `{0}` has an empty property path")]
    EmptyPath(String),

    #[error("directive names an empty variable")]
    EmptyVariable,

    #[error("invalid directive option `{option}`: {reason}")]
    InvalidOption { option: String, reason: String },
}

fn segment(input: &str) -> IResult<&str, &str> {
    take_while(|c| c != DIRECTIVE_SIGIL)(input)
}

fn directive_parts(input: &str) -> IResult<&str, (char, &str, Vec<&str>)> {
    all_consuming(tuple((
        alt((pchar(DIRECTIVE_SIGIL), pchar(VARIABLE_SIGIL))),
        segment,
        many0(preceded(pchar(DIRECTIVE_SIGIL), segment)),
    )))(input)
}

impl Directive {
    /// Parse a prototype value. `Ok(None)` means "not a directive".
    pub fn parse(value: &str) -> Result<Option<Self>, DirectiveError> {
        let Ok((_, (sigil, head, tokens))) = directive_parts(value) else {
            return Ok(None);
        };
        let options = DirectiveOptions::parse(tokens)?;

        if sigil == VARIABLE_SIGIL {
            if head.is_empty() {
                return Err(DirectiveError::EmptyVariable);
            }
            return Ok(Some(Directive::Variable {
                name: sparql_var(head),
                options,
            }));
        }

        let path = head.trim();
        if path.is_empty() {
            return Err(DirectiveError::EmptyPath(value.to_string()));
        }
        Ok(Some(Directive::Pattern {
            path: path.to_string(),
            options,
        }))
    }

    pub fn options(&self) -> &DirectiveOptions {
        match self {
            Directive::Variable { options, .. } | Directive::Pattern { options, .. } => options,
        }
    }

    /// The property path to traverse; `None` for variable bindings.
    pub fn path(&self) -> Option<&str> {
        match self {
            Directive::Pattern { path, .. } => Some(path),
            Directive::Variable { .. } => None,
        }
    }

    /// Variable fixed by the directive itself (`?name` or `var:`), if any.
    pub fn declared_var(&self) -> Option<&str> {
        if let Some(var) = &self.options().var {
            return Some(var);
        }
        match self {
            Directive::Variable { name, .. } => Some(name),
            Directive::Pattern { .. } => None,
        }
    }
}
