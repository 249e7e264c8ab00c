#![forbid(unsafe_code)]

//! The state record: top-level field names mapped to JSON values.
//!
//! [`StateRecord`] is a persistent ordered map, so cloning it is O(1) and
//! drafts share unchanged entries with the state they were taken from.
//! Equality is deep (`serde_json::Value: PartialEq`).

use serde_json::{Map, Value};

use crate::path::{FieldPath, Seg};

/// Top-level field name to value.
pub type StateRecord = im::OrdMap<String, Value>;

/// Build a record from a JSON value. Non-object values yield `None`.
#[must_use]
pub fn from_json(value: Value) -> Option<StateRecord> {
    match value {
        Value::Object(map) => Some(map.into_iter().collect()),
        _ => None,
    }
}

/// Render a record as a JSON object.
#[must_use]
pub fn to_json(record: &StateRecord) -> Value {
    let map: Map<String, Value> = record
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Value::Object(map)
}

/// Copy every entry into a freshly built record, sharing nothing with the
/// source.
#[must_use]
pub fn deep_copy(record: &StateRecord) -> StateRecord {
    record
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Resolve `path` against `record`. The first segment names the top-level
/// field; an empty path or a missing step resolves to `None`.
#[must_use]
pub fn get_in<'a>(record: &'a StateRecord, path: &FieldPath) -> Option<&'a Value> {
    let (first, rest) = path.segments().split_first()?;
    let root = record.get(first.to_key().as_ref())?;
    resolve(root, rest)
}

/// Resolve the remaining segments inside a value.
pub(crate) fn resolve<'a>(mut value: &'a Value, segments: &[Seg]) -> Option<&'a Value> {
    for seg in segments {
        value = match (value, seg) {
            (Value::Object(map), seg) => map.get(seg.to_key().as_ref())?,
            (Value::Array(items), Seg::Index(i)) => items.get(*i)?,
            (Value::Array(items), Seg::Key(k)) => items.get(k.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

/// Mutable counterpart of [`resolve`], creating intermediate objects and
/// arrays as needed. An array index may address an existing element or the
/// slot one past the end (append). Returns `None` when a scalar sits in the
/// way or an index lies beyond that slot.
pub(crate) fn resolve_mut<'a>(mut value: &'a mut Value, segments: &[Seg]) -> Option<&'a mut Value> {
    for seg in segments {
        if value.is_null() {
            *value = match seg {
                Seg::Index(_) => Value::Array(Vec::new()),
                Seg::Key(_) => Value::Object(Map::new()),
            };
        }
        value = match (value, seg) {
            (Value::Object(map), seg) => map.entry(seg.to_key().into_owned()).or_insert(Value::Null),
            (Value::Array(items), seg) => {
                let i = match seg {
                    Seg::Index(i) => *i,
                    Seg::Key(k) => k.parse::<usize>().ok()?,
                };
                if i == items.len() {
                    items.push(Value::Null);
                }
                items.get_mut(i)?
            }
            _ => return None,
        };
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> StateRecord {
        from_json(json!({
            "name": "ada",
            "tags": ["a", "b"],
            "address": { "city": "London", "zip": null }
        }))
        .expect("object")
    }

    #[test]
    fn from_json_rejects_non_objects() {
        assert!(from_json(json!([1, 2])).is_none());
        assert!(from_json(json!(3)).is_none());
        assert_eq!(from_json(json!({})).map(|r| r.len()), Some(0));
    }

    #[test]
    fn to_json_round_trips_entries() {
        let record = sample();
        assert_eq!(from_json(to_json(&record)), Some(record));
    }

    #[test]
    fn get_in_walks_objects_and_arrays() {
        let record = sample();
        let city = FieldPath::parse("address.city").unwrap();
        let tag = FieldPath::parse("tags[1]").unwrap();
        let dotted_index = FieldPath::parse("tags.0").unwrap();
        assert_eq!(get_in(&record, &city), Some(&json!("London")));
        assert_eq!(get_in(&record, &tag), Some(&json!("b")));
        assert_eq!(get_in(&record, &dotted_index), Some(&json!("a")));
    }

    #[test]
    fn get_in_missing_steps_are_absent() {
        let record = sample();
        for raw in ["missing", "address.country", "tags[9]", "name.first"] {
            let path = FieldPath::parse(raw).unwrap();
            assert_eq!(get_in(&record, &path), None, "{raw}");
        }
        // Present-but-null is not the same as absent.
        let zip = FieldPath::parse("address.zip").unwrap();
        assert_eq!(get_in(&record, &zip), Some(&Value::Null));
    }

    #[test]
    fn resolve_mut_creates_intermediates() {
        let mut value = Value::Null;
        let path = FieldPath::parse("a.items[0].label").unwrap();
        *resolve_mut(&mut value, path.segments()).unwrap() = json!("x");
        assert_eq!(value, json!({ "a": { "items": [{ "label": "x" }] } }));

        let append = FieldPath::parse("a.items.1").unwrap();
        *resolve_mut(&mut value, append.segments()).unwrap() = json!(2);
        assert_eq!(value, json!({ "a": { "items": [{ "label": "x" }, 2] } }));
    }

    #[test]
    fn resolve_mut_rejects_indices_past_the_end() {
        let mut value = json!({ "items": [1] });
        for raw in ["items[2]", "items[1000000000]", "items[18446744073709551615]", "items.99"] {
            let path = FieldPath::parse(raw).unwrap();
            assert!(resolve_mut(&mut value, path.segments()).is_none(), "{raw}");
        }
        assert_eq!(value, json!({ "items": [1] }));
    }

    #[test]
    fn resolve_mut_refuses_to_descend_into_scalars() {
        let mut value = json!({ "a": 1 });
        let path = FieldPath::parse("a.b").unwrap();
        assert!(resolve_mut(&mut value, path.segments()).is_none());
    }

    #[test]
    fn deep_copy_is_equal() {
        let record = sample();
        assert_eq!(deep_copy(&record), record);
    }
}
