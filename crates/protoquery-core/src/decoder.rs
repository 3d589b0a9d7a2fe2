//! Result row + compiled template → one instance.

use protoquery_dsl::{Accept, LangTag};

use crate::instance::{Instance, InstanceObject, Literal};
use crate::results::{Binding, Row};
use crate::template::{NodeTemplate, Slot, VariableSlot};

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// Key names used for language-tagged values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocabulary {
    /// `@language` / `@value`, for graph-shaped output.
    JsonLd,
    /// `language` / `value`.
    Plain,
}

impl Vocabulary {
    pub fn language_key(self) -> &'static str {
        match self {
            Vocabulary::JsonLd => "@language",
            Vocabulary::Plain => "language",
        }
    }

    pub fn value_key(self) -> &'static str {
        match self {
            Vocabulary::JsonLd => "@value",
            Vocabulary::Plain => "value",
        }
    }
}

/// Decoding settings fixed for a whole invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    pub lang_tag: LangTag,
    pub vocabulary: Vocabulary,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            lang_tag: LangTag::Show,
            vocabulary: Vocabulary::Plain,
        }
    }
}

/// Fill `template` with the values of one row. Unbound variables simply
/// leave their property out.
pub fn decode_row(row: &Row, template: &NodeTemplate, options: &DecodeOptions) -> InstanceObject {
    let mut instance = InstanceObject::new(template.anchor.clone());

    for (key, slot) in &template.entries {
        let value = match slot {
            Slot::Literal(value) => Some(Instance::Constant(value.clone())),
            Slot::Node(node) => {
                let nested = decode_row(row, node, options);
                if !nested.has_bound_values() {
                    None
                } else if node.list {
                    Some(Instance::List(vec![Instance::Object(nested)]))
                } else {
                    Some(Instance::Object(nested))
                }
            }
            Slot::Variable(var) => decode_variable(row, var, options).map(|value| {
                if var.list {
                    Instance::List(vec![value])
                } else {
                    value
                }
            }),
        };

        if let Some(value) = value {
            instance.insert(key.clone(), value);
        }
    }

    instance
}

fn decode_variable(row: &Row, slot: &VariableSlot, options: &DecodeOptions) -> Option<Instance> {
    let binding = row.get(&slot.variable)?;
    let lang_tag = slot.lang_tag.unwrap_or(options.lang_tag);
    decode_binding(binding, slot.accept, lang_tag, options.vocabulary)
}

/// Decode one binding. `None` when `accept` rejects the decoded type.
pub fn decode_binding(
    binding: &Binding,
    accept: Option<Accept>,
    lang_tag: LangTag,
    vocabulary: Vocabulary,
) -> Option<Instance> {
    let literal = coerce(binding);

    if accept.is_some_and(|expected| expected != literal.kind()) {
        return None;
    }

    match (literal, &binding.language) {
        (Literal::String(value), Some(language)) if lang_tag != LangTag::Hide => {
            let mut pair = InstanceObject::new(None);
            pair.insert(vocabulary.language_key(), language.as_str().into());
            pair.insert(vocabulary.value_key(), Instance::Literal(Literal::String(value)));
            Some(Instance::Object(pair))
        }
        (literal, _) => Some(Instance::Literal(literal)),
    }
}

/// Apply XSD datatype coercion to a binding's lexical value.
pub fn coerce(binding: &Binding) -> Literal {
    let raw = binding.value.as_str();
    let Some(datatype) = binding.datatype.as_deref() else {
        return Literal::String(raw.to_string());
    };
    let local = datatype
        .strip_prefix(XSD)
        .or_else(|| datatype.strip_prefix("xsd:"))
        .unwrap_or("");

    match local {
        "boolean" => Literal::Boolean(!is_false(raw)),
        "integer" | "nonPositiveInteger" | "negativeInteger" | "nonNegativeInteger"
        | "positiveInteger" | "long" | "int" | "short" | "byte" | "unsignedLong"
        | "unsignedInt" | "unsignedShort" | "unsignedByte" => parse_integer(raw),
        "decimal" | "float" | "double" => parse_float(raw),
        _ => Literal::String(raw.to_string()),
    }
}

/// `"false"`, numeric zero and blank literals are false.
fn is_false(raw: &str) -> bool {
    let trimmed = raw.trim();
    raw == "false" || trimmed.is_empty() || trimmed.parse::<f64>().is_ok_and(|n| n == 0.0)
}

/// Leading-integer semantics: `"42"` and `"42.7"` both give 42.
fn parse_integer(raw: &str) -> Literal {
    let trimmed = raw.trim();
    let sign_len = usize::from(trimmed.starts_with(['+', '-']));
    let digits = trimmed[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(trimmed.len(), |end| sign_len + end);
    let prefix = &trimmed[..digits];

    if let Ok(i) = prefix.parse::<i64>() {
        return Literal::Integer(i);
    }
    // Out of i64 range.
    match prefix.parse::<f64>() {
        Ok(f) if digits > sign_len => Literal::Float(f),
        _ => Literal::String(raw.to_string()),
    }
}

fn parse_float(raw: &str) -> Literal {
    let trimmed = raw.trim();
    let parsed = match trimmed {
        "INF" | "+INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        other => other.parse::<f64>(),
    };
    parsed.map_or_else(|_| Literal::String(raw.to_string()), Literal::Float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn xsd(local: &str) -> String {
        format!("{XSD}{local}")
    }

    fn decode(binding: Binding) -> Instance {
        decode_binding(&binding, None, LangTag::Show, Vocabulary::Plain).expect("kept")
    }

    #[test]
    fn coercion_table() {
        assert_eq!(
            decode(Binding::typed("false", xsd("boolean"))),
            Instance::Literal(Literal::Boolean(false))
        );
        assert_eq!(
            decode(Binding::typed("1", xsd("boolean"))),
            Instance::Literal(Literal::Boolean(true))
        );
        assert_eq!(
            decode(Binding::typed("0.0", xsd("boolean"))),
            Instance::Literal(Literal::Boolean(false))
        );
        assert_eq!(
            decode(Binding::typed("42", xsd("integer"))),
            Instance::Literal(Literal::Integer(42))
        );
        assert_eq!(
            decode(Binding::typed("INF", xsd("double"))),
            Instance::Literal(Literal::Float(f64::INFINITY))
        );
        assert_eq!(
            decode(Binding::typed("-INF", xsd("float"))),
            Instance::Literal(Literal::Float(f64::NEG_INFINITY))
        );
        assert_eq!(
            decode(Binding::typed("2.5", xsd("decimal"))),
            Instance::Literal(Literal::Float(2.5))
        );
        assert_eq!(decode(Binding::literal("Rome")), "Rome".into());
        assert_eq!(
            decode(Binding::tagged("Roma", "it")).into_json(),
            json!({"language": "it", "value": "Roma"})
        );
    }

    #[test]
    fn integer_family_uses_leading_digits() {
        assert_eq!(
            coerce(&Binding::typed("-17", xsd("int"))),
            Literal::Integer(-17)
        );
        assert_eq!(
            coerce(&Binding::typed("12.9", xsd("unsignedShort"))),
            Literal::Integer(12)
        );
        assert_eq!(
            coerce(&Binding::typed("n/a", xsd("long"))),
            Literal::String("n/a".to_string())
        );
        assert!(matches!(
            coerce(&Binding::typed("99999999999999999999", xsd("integer"))),
            Literal::Float(_)
        ));
    }

    #[test]
    fn other_datatypes_stay_strings() {
        assert_eq!(
            coerce(&Binding::typed("1980-01-01", xsd("date"))),
            Literal::String("1980-01-01".to_string())
        );
        assert_eq!(
            coerce(&Binding::typed("7", "xsd:integer")),
            Literal::Integer(7)
        );
    }

    #[test]
    fn jsonld_vocabulary_and_hidden_tags() {
        let tagged = Binding::tagged("Roma", "it");
        assert_eq!(
            decode_binding(&tagged, None, LangTag::Show, Vocabulary::JsonLd)
                .unwrap()
                .into_json(),
            json!({"@language": "it", "@value": "Roma"})
        );
        assert_eq!(
            decode_binding(&tagged, None, LangTag::Hide, Vocabulary::JsonLd),
            Some("Roma".into())
        );
    }

    #[test]
    fn accept_rejects_mismatched_types() {
        let number = Binding::typed("3", xsd("integer"));
        assert_eq!(
            decode_binding(&number, Some(Accept::String), LangTag::Show, Vocabulary::Plain),
            None
        );
        assert!(
            decode_binding(&number, Some(Accept::Number), LangTag::Show, Vocabulary::Plain)
                .is_some()
        );
        // Language-tagged strings are still strings.
        let tagged = Binding::tagged("Roma", "it");
        assert!(
            decode_binding(&tagged, Some(Accept::String), LangTag::Show, Vocabulary::Plain)
                .is_some()
        );
    }

    fn city_template() -> NodeTemplate {
        let mut country = NodeTemplate::new(Some("id".to_string()));
        country.list = true;
        country.entries = vec![
            ("@type".to_string(), Slot::Literal(json!("Country"))),
            (
                "id".to_string(),
                Slot::Variable(VariableSlot {
                    variable: "c".to_string(),
                    accept: None,
                    lang_tag: None,
                    list: false,
                }),
            ),
        ];

        let mut city = NodeTemplate::new(Some("id".to_string()));
        city.entries = vec![
            (
                "id".to_string(),
                Slot::Variable(VariableSlot {
                    variable: "id".to_string(),
                    accept: None,
                    lang_tag: None,
                    list: false,
                }),
            ),
            (
                "name".to_string(),
                Slot::Variable(VariableSlot {
                    variable: "v1".to_string(),
                    accept: None,
                    lang_tag: Some(LangTag::Hide),
                    list: true,
                }),
            ),
            ("country".to_string(), Slot::Node(country)),
        ];
        city
    }

    #[test]
    fn prunes_unbound_and_empty_nodes() {
        let mut row = Row::new();
        row.insert("id".to_string(), Binding::iri("http://dbpedia.org/resource/Rome"));

        let instance = decode_row(&row, &city_template(), &DecodeOptions::default());
        assert_eq!(
            instance.into_json(),
            json!({"id": "http://dbpedia.org/resource/Rome"})
        );
    }

    #[test]
    fn list_flags_wrap_values() {
        let mut row = Row::new();
        row.insert("id".to_string(), Binding::iri("http://dbpedia.org/resource/Rome"));
        row.insert("v1".to_string(), Binding::tagged("Roma", "it"));
        row.insert("c".to_string(), Binding::iri("http://dbpedia.org/resource/Italy"));

        let instance = decode_row(&row, &city_template(), &DecodeOptions::default());
        assert_eq!(instance.anchor.as_deref(), Some("id"));
        assert_eq!(
            instance.into_json(),
            json!({
                "id": "http://dbpedia.org/resource/Rome",
                "name": ["Roma"],
                "country": [{"@type": "Country", "id": "http://dbpedia.org/resource/Italy"}]
            })
        );
    }
}
