//! Fold per-row instances into deduplicated entities.
//!
//! Rows describing the same entity share an anchor value. Merging them
//! rebuilds one-to-many relations: a property that takes a second distinct
//! value becomes a list, and nested objects with the same anchor are merged
//! recursively instead of being repeated.

use crate::instance::{Instance, InstanceObject};

/// Merge instances in row order. Instances without a bound anchor are never
/// merged with anything.
pub fn merge_instances(instances: impl IntoIterator<Item = InstanceObject>) -> Vec<InstanceObject> {
    let mut content: Vec<InstanceObject> = Vec::new();

    for instance in instances {
        let existing = instance.anchor_value().and_then(|id| {
            content
                .iter()
                .position(|entry| entry.anchor_value().is_some_and(|other| other.same_value(id)))
        });

        match existing {
            Some(index) => merge_into(&mut content[index], instance),
            None => content.push(instance),
        }
    }

    content
}

/// Merge `addition` into `base` in place.
pub fn merge_into(base: &mut InstanceObject, addition: InstanceObject) {
    for (key, incoming) in addition.fields {
        match base.fields.get_mut(&key) {
            Some(existing) => merge_value(existing, incoming),
            None => {
                base.fields.insert(key, incoming);
            }
        }
    }
}

fn anchor_of(value: &Instance) -> Option<&Instance> {
    value.as_object().and_then(InstanceObject::anchor_value)
}

fn merge_value(base: &mut Instance, incoming: Instance) {
    // Decoded lists hold a single element; compare through it.
    let incoming = match incoming {
        Instance::List(items) => match items.into_iter().next() {
            Some(first) => first,
            None => return,
        },
        other => other,
    };

    if let Instance::List(items) = base {
        let matching = anchor_of(&incoming)
            .and_then(|id| {
                items
                    .iter()
                    .position(|item| anchor_of(item).is_some_and(|other| other.same_value(id)))
            });

        if let Some(index) = matching {
            if let (Instance::Object(target), Instance::Object(addition)) =
                (&mut items[index], incoming)
            {
                merge_into(target, addition);
            }
            return;
        }
        if !items.iter().any(|item| item.same_value(&incoming)) {
            items.push(incoming);
        }
        return;
    }

    if base.same_value(&incoming) {
        return;
    }

    let same_entity = matches!(
        (anchor_of(base), anchor_of(&incoming)),
        (Some(a), Some(b)) if a.same_value(b)
    );
    if same_entity {
        if let (Instance::Object(target), Instance::Object(addition)) = (base, incoming) {
            merge_into(target, addition);
        }
        return;
    }

    let previous = std::mem::replace(base, Instance::List(Vec::new()));
    *base = Instance::List(vec![previous, incoming]);
}
