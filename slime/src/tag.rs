//! Typed access over the `fastnbt` tag tree.
//!
//! The codec treats compound/list tags as an opaque hierarchical model; these
//! helpers only add structural checks with explicit errors. A missing key or
//! a key holding the wrong tag kind is always reported, never a silent null.

use std::collections::HashMap;

use fastnbt::Value;

use crate::error::SlimeError;

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum TagError {
    #[error("missing key {0:?}")]
    MissingKey(String),

    #[error("wrong tag kind for {key:?}: expected {expected}, got {actual}")]
    WrongKind {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("list index {0} out of range")]
    OutOfRange(usize),
}

pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Byte(_) => "byte",
        Value::Short(_) => "short",
        Value::Int(_) => "int",
        Value::Long(_) => "long",
        Value::Float(_) => "float",
        Value::Double(_) => "double",
        Value::String(_) => "string",
        Value::ByteArray(_) => "byte array",
        Value::IntArray(_) => "int array",
        Value::LongArray(_) => "long array",
        Value::List(_) => "list",
        Value::Compound(_) => "compound",
    }
}

fn entries<'a>(tag: &'a Value, key: &str) -> Result<&'a HashMap<String, Value>, TagError> {
    match tag {
        Value::Compound(entries) => Ok(entries),
        other => Err(TagError::WrongKind {
            key: key.to_owned(),
            expected: "compound",
            actual: kind_name(other),
        }),
    }
}

pub fn get<'a>(tag: &'a Value, key: &str) -> Result<&'a Value, TagError> {
    entries(tag, key)?
        .get(key)
        .ok_or_else(|| TagError::MissingKey(key.to_owned()))
}

/// Get a child compound by key; the returned value is itself a compound.
pub fn get_compound<'a>(tag: &'a Value, key: &str) -> Result<&'a Value, TagError> {
    let child = get(tag, key)?;
    match child {
        Value::Compound(_) => Ok(child),
        other => Err(TagError::WrongKind {
            key: key.to_owned(),
            expected: "compound",
            actual: kind_name(other),
        }),
    }
}

pub fn get_list<'a>(tag: &'a Value, key: &str) -> Result<&'a [Value], TagError> {
    match get(tag, key)? {
        Value::List(items) => Ok(items),
        other => Err(TagError::WrongKind {
            key: key.to_owned(),
            expected: "list",
            actual: kind_name(other),
        }),
    }
}

/// Integer leaf accessor; narrower integer kinds widen losslessly.
pub fn get_int(tag: &Value, key: &str) -> Result<i32, TagError> {
    match get(tag, key)? {
        Value::Byte(v) => Ok(*v as i32),
        Value::Short(v) => Ok(*v as i32),
        Value::Int(v) => Ok(*v),
        other => Err(TagError::WrongKind {
            key: key.to_owned(),
            expected: "int",
            actual: kind_name(other),
        }),
    }
}

pub fn double_at(list: &[Value], index: usize) -> Result<f64, TagError> {
    match list.get(index) {
        Some(Value::Double(v)) => Ok(*v),
        Some(Value::Float(v)) => Ok(*v as f64),
        Some(other) => Err(TagError::WrongKind {
            key: format!("[{}]", index),
            expected: "double",
            actual: kind_name(other),
        }),
        None => Err(TagError::OutOfRange(index)),
    }
}

/// Serialize a compound holding a single tag list under `key`, the payload
/// shape of the tile-entity and entity frames.
pub fn list_payload(key: &str, tags: &[Value]) -> Result<Vec<u8>, SlimeError> {
    let compound = Value::Compound(HashMap::from([(
        key.to_owned(),
        Value::List(tags.to_vec()),
    )]));
    fastnbt::to_bytes(&compound).map_err(|err| SlimeError::Nbt(err.to_string()))
}

/// Serialize an empty compound, the payload of the reserved trailer frame.
pub fn empty_payload() -> Result<Vec<u8>, SlimeError> {
    fastnbt::to_bytes(&Value::Compound(HashMap::new()))
        .map_err(|err| SlimeError::Nbt(err.to_string()))
}

/// Deserialize a frame payload and pull the tag list stored under `key`.
pub fn parse_list_payload(payload: &[u8], key: &str) -> Result<Vec<Value>, SlimeError> {
    let compound: Value =
        fastnbt::from_bytes(payload).map_err(|err| SlimeError::Nbt(err.to_string()))?;
    Ok(get_list(&compound, key)?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compound(pairs: Vec<(&str, Value)>) -> Value {
        Value::Compound(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
        )
    }

    #[test]
    fn test_missing_key() {
        let tag = compound(vec![("x", Value::Int(3))]);
        assert_eq!(
            get_int(&tag, "z").unwrap_err(),
            TagError::MissingKey("z".to_owned())
        );
    }

    #[test]
    fn test_wrong_kind() {
        let tag = compound(vec![("tiles", Value::Int(1))]);
        assert_eq!(
            get_list(&tag, "tiles").unwrap_err(),
            TagError::WrongKind {
                key: "tiles".to_owned(),
                expected: "list",
                actual: "int",
            }
        );
    }

    #[test]
    fn test_int_widening() {
        let tag = compound(vec![("x", Value::Byte(-5)), ("z", Value::Short(300))]);
        assert_eq!(get_int(&tag, "x").unwrap(), -5);
        assert_eq!(get_int(&tag, "z").unwrap(), 300);
    }

    #[test]
    fn test_double_at() {
        let list = vec![Value::Double(1.5), Value::Double(64.0), Value::Double(-3.2)];
        assert_eq!(double_at(&list, 2).unwrap(), -3.2);
        assert_eq!(double_at(&list, 3).unwrap_err(), TagError::OutOfRange(3));
    }

    #[test]
    fn test_list_payload_roundtrip() {
        let tags = vec![
            compound(vec![("x", Value::Int(1)), ("z", Value::Int(2))]),
            compound(vec![("x", Value::Int(-4)), ("z", Value::Int(9))]),
        ];
        let payload = list_payload("tiles", &tags).unwrap();
        let decoded = parse_list_payload(&payload, "tiles").unwrap();
        assert_eq!(decoded, tags);
    }

    #[test]
    fn test_list_payload_missing_list_key() {
        let payload = empty_payload().unwrap();
        let err = parse_list_payload(&payload, "entities").unwrap_err();
        assert!(matches!(err, SlimeError::Tag(TagError::MissingKey(_))));
    }
}
