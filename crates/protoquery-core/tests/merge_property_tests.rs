//! Property tests for decoding and merging.
//!
//! 1. A fully bound row decodes to exactly the prototype's keys
//! 2. Merging is idempotent
//! 3. List promotion does not depend on row order (as sets)

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use protoquery_core::{
    compile, decode_row, merge_instances, Binding, DecodeOptions, Instance, InstanceObject,
    Literal, Row, Slot,
};
use serde_json::{json, Map, Value};

// ============================================================================
// Strategies
// ============================================================================

fn property_names() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-z]{2,8}", 1..8)
        .prop_map(|names| names.into_iter().filter(|n| n != "id").collect())
}

/// (entity, label) pairs over a small domain so collisions are common.
fn city_rows() -> impl Strategy<Value = Vec<(u8, String)>> {
    prop::collection::vec((0u8..3, "[a-c]{1,2}"), 0..12)
}

fn city(id: u8, name: &str) -> InstanceObject {
    let mut obj = InstanceObject::new(Some("id".to_string()));
    obj.insert("id", format!("http://example.org/{id}").as_str().into());
    obj.insert("name", name.into());
    obj
}

fn names_by_entity(entries: &[InstanceObject]) -> BTreeMap<String, BTreeSet<String>> {
    fn text(value: &Instance) -> String {
        match value {
            Instance::Literal(Literal::String(s)) => s.clone(),
            other => panic!("unexpected value {other:?}"),
        }
    }

    entries
        .iter()
        .map(|entry| {
            let id = text(entry.get("id").expect("id"));
            let names = match entry.get("name").expect("name") {
                Instance::List(items) => items.iter().map(text).collect(),
                single => BTreeSet::from([text(single)]),
            };
            (id, names)
        })
        .collect()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn bound_row_round_trips_prototype_keys(names in property_names()) {
        let mut proto = Map::new();
        proto.insert("id".to_string(), json!("?id"));
        for name in &names {
            proto.insert(name.clone(), json!(format!("$ex:{name}")));
        }
        let compiled = compile(&json!({ "proto": Value::Object(proto.clone()) })).unwrap();

        let mut row = Row::new();
        for key in proto.keys() {
            let Some(Slot::Variable(slot)) = compiled.template.get(key) else {
                panic!("`{key}` should compile to a variable");
            };
            row.insert(slot.variable.clone(), Binding::literal("x"));
        }

        let decoded = decode_row(&row, &compiled.template, &DecodeOptions::default()).into_json();
        let keys: BTreeSet<&String> = decoded.as_object().unwrap().keys().collect();
        let expected: BTreeSet<&String> = proto.keys().collect();
        prop_assert_eq!(keys, expected);
    }

    #[test]
    fn merge_is_idempotent(rows in city_rows()) {
        let once = merge_instances(rows.iter().map(|(id, name)| city(*id, name)));
        let twice = merge_instances(
            rows.iter().chain(rows.iter()).map(|(id, name)| city(*id, name)),
        );
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn promotion_ignores_row_order(rows in city_rows()) {
        let forward = merge_instances(rows.iter().map(|(id, name)| city(*id, name)));
        let backward = merge_instances(rows.iter().rev().map(|(id, name)| city(*id, name)));

        prop_assert_eq!(forward.len(), backward.len());
        prop_assert_eq!(names_by_entity(&forward), names_by_entity(&backward));
    }
}
