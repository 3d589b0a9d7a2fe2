//! Decoded instances.
//!
//! An instance is the prototype shape filled with one row's values. Objects
//! remember which key is their anchor, so merging never needs a `$anchor`
//! property inside the data; the anchor disappears when the instance is
//! turned into JSON.

use indexmap::IndexMap;
use protoquery_dsl::Accept;
use serde_json::{Map, Number, Value};

/// A decoded scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Boolean(bool),
    Integer(i64),
    /// May be infinite; serialises as `null` when it is not finite.
    Float(f64),
    String(String),
}

impl Literal {
    /// Runtime type, as checked by `accept:`.
    pub fn kind(&self) -> Accept {
        match self {
            Literal::Boolean(_) => Accept::Boolean,
            Literal::Integer(_) | Literal::Float(_) => Accept::Number,
            Literal::String(_) => Accept::String,
        }
    }

    /// Value equality for merging: numbers compare across `Integer`/`Float`
    /// and NaN equals NaN.
    pub fn same_value(&self, other: &Literal) -> bool {
        match (self, other) {
            (Literal::Float(a), Literal::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Literal::Integer(i), Literal::Float(f)) | (Literal::Float(f), Literal::Integer(i)) => {
                *i as f64 == *f
            }
            (a, b) => a == b,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Literal::Boolean(b) => Value::Bool(*b),
            Literal::Integer(i) => Value::from(*i),
            Literal::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instance {
    Literal(Literal),
    /// Copied verbatim from the prototype (e.g. `@type`).
    Constant(Value),
    Object(InstanceObject),
    List(Vec<Instance>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstanceObject {
    pub anchor: Option<String>,
    pub fields: IndexMap<String, Instance>,
}

impl InstanceObject {
    pub fn new(anchor: Option<String>) -> Self {
        Self {
            anchor,
            fields: IndexMap::new(),
        }
    }

    /// Identity of the object, if its anchor was bound.
    pub fn anchor_value(&self) -> Option<&Instance> {
        self.anchor.as_ref().and_then(|key| self.fields.get(key))
    }

    pub fn get(&self, key: &str) -> Option<&Instance> {
        self.fields.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Instance) {
        self.fields.insert(key.into(), value);
    }

    /// Structural equality through [`Literal::same_value`]. Field order is
    /// ignored.
    pub fn same_value(&self, other: &InstanceObject) -> bool {
        self.fields.len() == other.fields.len()
            && self.fields.iter().all(|(key, value)| {
                other
                    .fields
                    .get(key)
                    .is_some_and(|theirs| value.same_value(theirs))
            })
    }

    /// False when only prototype constants are left.
    pub fn has_bound_values(&self) -> bool {
        self.fields
            .values()
            .any(|value| !matches!(value, Instance::Constant(_)))
    }

    pub fn into_json(self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .into_iter()
            .map(|(key, value)| (key, value.into_json()))
            .collect();
        Value::Object(map)
    }
}

impl Instance {
    pub fn as_object(&self) -> Option<&InstanceObject> {
        match self {
            Instance::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Equality used by the merger; see [`Literal::same_value`].
    pub fn same_value(&self, other: &Instance) -> bool {
        match (self, other) {
            (Instance::Literal(a), Instance::Literal(b)) => a.same_value(b),
            (Instance::Constant(a), Instance::Constant(b)) => a == b,
            (Instance::Object(a), Instance::Object(b)) => a.same_value(b),
            (Instance::List(a), Instance::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_value(y))
            }
            _ => false,
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            Instance::Literal(lit) => lit.to_json(),
            Instance::Constant(value) => value,
            Instance::Object(obj) => obj.into_json(),
            Instance::List(items) => {
                Value::Array(items.into_iter().map(Instance::into_json).collect())
            }
        }
    }
}

impl From<Literal> for Instance {
    fn from(value: Literal) -> Self {
        Instance::Literal(value)
    }
}

impl From<&str> for Instance {
    fn from(value: &str) -> Self {
        Instance::Literal(Literal::String(value.to_string()))
    }
}
