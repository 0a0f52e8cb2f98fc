//! Null-checked access to raw store records.
//!
//! A node record is `{"label": .., "properties": {..}}`; an edge record adds
//! `"src"` and `"dst"` endpoint ids. Every accessor checks presence and type
//! and reports a [`RecordError`] instead of panicking.

use serde_json::{Map, Value};

use crate::codec::CodecError;
use crate::error::RecordError;

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    label: String,
    src: Option<Value>,
    dst: Option<Value>,
    properties: Map<String, Value>,
}

fn invalid(key: &str, reason: impl Into<String>) -> RecordError {
    RecordError::InvalidProperty {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn as_int(key: &str, value: &Value) -> Result<i64, RecordError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| invalid(key, format!("{} is not an integer", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| invalid(key, format!("'{}' is not an integer", s))),
        other => Err(invalid(key, format!("expected integer, got {}", other))),
    }
}

fn as_id(key: &str, raw: i64) -> Result<Option<u32>, RecordError> {
    match raw {
        -1 => Ok(None),
        raw => u32::try_from(raw)
            .map(Some)
            .map_err(|_| invalid(key, format!("{} is not a valid id", raw))),
    }
}

/// The wire form of a node record.
pub fn node_json(label: &str, properties: Map<String, Value>) -> Value {
    let mut object = Map::new();
    object.insert("label".to_string(), Value::String(label.to_string()));
    object.insert("properties".to_string(), Value::Object(properties));
    Value::Object(object)
}

/// The wire form of an edge record; `src` and `dst` are the endpoints' ids.
pub fn edge_json(label: &str, src: Value, dst: Value, properties: Map<String, Value>) -> Value {
    let mut object = Map::new();
    object.insert("label".to_string(), Value::String(label.to_string()));
    object.insert("src".to_string(), src);
    object.insert("dst".to_string(), dst);
    object.insert("properties".to_string(), Value::Object(properties));
    Value::Object(object)
}

impl Record {
    pub fn from_json(value: Value) -> Result<Self, RecordError> {
        let Value::Object(mut object) = value else {
            return Err(RecordError::NotARecord);
        };
        let label = match object.remove("label") {
            Some(Value::String(label)) => label,
            _ => return Err(RecordError::NotARecord),
        };
        let properties = match object.remove("properties") {
            Some(Value::Object(properties)) => properties,
            Some(Value::Null) | None => Map::new(),
            Some(_) => return Err(RecordError::NotARecord),
        };
        Ok(Record {
            label,
            src: object.remove("src"),
            dst: object.remove("dst"),
            properties,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn has(&self, key: &str) -> bool {
        !matches!(self.properties.get(key), None | Some(Value::Null))
    }

    fn get(&self, key: &str) -> Result<&Value, RecordError> {
        match self.properties.get(key) {
            None | Some(Value::Null) => Err(RecordError::MissingProperty {
                key: key.to_string(),
            }),
            Some(value) => Ok(value),
        }
    }

    fn endpoint(&self, key: &str, value: &Option<Value>) -> Result<u32, RecordError> {
        let value = match value {
            None | Some(Value::Null) => {
                return Err(RecordError::MissingProperty {
                    key: key.to_string(),
                })
            }
            Some(value) => value,
        };
        as_id(key, as_int(key, value)?)?.ok_or_else(|| invalid(key, "endpoint is the sentinel"))
    }

    /// Source endpoint id of an edge record.
    pub fn src(&self) -> Result<u32, RecordError> {
        self.endpoint("src", &self.src)
    }

    /// Destination endpoint id of an edge record.
    pub fn dst(&self) -> Result<u32, RecordError> {
        self.endpoint("dst", &self.dst)
    }

    pub fn int(&self, key: &str) -> Result<i64, RecordError> {
        as_int(key, self.get(key)?)
    }

    pub fn uint(&self, key: &str) -> Result<u32, RecordError> {
        let raw = self.int(key)?;
        u32::try_from(raw).map_err(|_| invalid(key, format!("{} out of range", raw)))
    }

    /// An id that may be the `-1` sentinel.
    pub fn id(&self, key: &str) -> Result<Option<u32>, RecordError> {
        as_id(key, self.int(key)?)
    }

    /// An id that must not be the sentinel.
    pub fn req_id(&self, key: &str) -> Result<u32, RecordError> {
        self.id(key)?
            .ok_or_else(|| invalid(key, "mandatory id is the sentinel"))
    }

    pub fn flag(&self, key: &str) -> Result<bool, RecordError> {
        match self.get(key)? {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) if n.as_i64() == Some(0) => Ok(false),
            Value::Number(n) if n.as_i64() == Some(1) => Ok(true),
            Value::String(s) if s == "true" => Ok(true),
            Value::String(s) if s == "false" => Ok(false),
            other => Err(invalid(key, format!("expected boolean, got {}", other))),
        }
    }

    pub fn float(&self, key: &str) -> Result<f64, RecordError> {
        match self.get(key)? {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| invalid(key, "number is not representable")),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| invalid(key, format!("'{}' is not a float", s))),
            other => Err(invalid(key, format!("expected float, got {}", other))),
        }
    }

    pub fn text(&self, key: &str) -> Result<&str, RecordError> {
        match self.get(key)? {
            Value::String(s) => Ok(s),
            other => Err(invalid(key, format!("expected string, got {}", other))),
        }
    }

    /// Decodes a collection property; an absent property is an error, an
    /// empty one decodes to the empty collection.
    pub fn decoded<T>(
        &self,
        key: &str,
        decode: impl FnOnce(&str) -> Result<T, CodecError>,
    ) -> Result<T, RecordError> {
        decode(self.text(key)?).map_err(|source| RecordError::Codec {
            key: key.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_list;
    use serde_json::json;

    fn record() -> Record {
        Record::from_json(json!({
            "label": "ValVar",
            "src": 4,
            "dst": "5",
            "properties": {
                "id": 3,
                "icfg_node_id": -1,
                "bad_id": -7,
                "is_decl": 1,
                "name": "main",
                "ids": "1,2",
                "nothing": null,
                "dval": 0.5
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_typed_access() {
        let r = record();
        assert_eq!(r.label(), "ValVar");
        assert_eq!(r.req_id("id").unwrap(), 3);
        assert_eq!(r.id("icfg_node_id").unwrap(), None);
        assert!(r.flag("is_decl").unwrap());
        assert_eq!(r.text("name").unwrap(), "main");
        assert_eq!(r.float("dval").unwrap(), 0.5);
        assert_eq!(r.decoded("ids", decode_list::<u32>).unwrap(), vec![1, 2]);
        assert_eq!(r.src().unwrap(), 4);
        assert_eq!(r.dst().unwrap(), 5);
    }

    #[test]
    fn test_absent_and_null_are_missing() {
        let r = record();
        assert_eq!(
            r.int("missing").unwrap_err(),
            RecordError::MissingProperty { key: "missing".into() }
        );
        assert!(matches!(r.text("nothing"), Err(RecordError::MissingProperty { .. })));
        assert!(!r.has("nothing"));
        assert!(r.has("name"));
    }

    #[test]
    fn test_type_mismatch_and_bad_ids() {
        let r = record();
        assert!(matches!(r.int("name"), Err(RecordError::InvalidProperty { .. })));
        assert!(matches!(r.id("bad_id"), Err(RecordError::InvalidProperty { .. })));
        assert!(matches!(r.req_id("icfg_node_id"), Err(RecordError::InvalidProperty { .. })));
        assert!(matches!(r.decoded("name", decode_list::<u32>), Err(RecordError::Codec { .. })));
    }

    #[test]
    fn test_non_records_rejected() {
        assert_eq!(Record::from_json(json!([1, 2])).unwrap_err(), RecordError::NotARecord);
        assert_eq!(
            Record::from_json(json!({"properties": {}})).unwrap_err(),
            RecordError::NotARecord
        );
        let node = Record::from_json(json!({"label": "CHNode"})).unwrap();
        assert!(matches!(node.src(), Err(RecordError::MissingProperty { .. })));
    }
}
