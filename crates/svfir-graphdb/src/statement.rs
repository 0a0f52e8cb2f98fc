//! Parameterized graph statements.
//!
//! A [`Statement`] is a structured create/match/attach request. Backends
//! may execute it structurally; its [`Display`](std::fmt::Display) form is
//! the declarative query text. All text values and non-identifier names go
//! through [`quote`] and [`quote_name`], the only places that escape.

use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::codec::{self, CodecValue};

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl PropertyValue {
    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Str(s) => Value::String(s.clone()),
            PropertyValue::Int(i) => Value::from(*i),
            PropertyValue::Float(x) if x.is_finite() => Value::from(*x),
            PropertyValue::Float(x) => Value::String(non_finite_text(*x).to_string()),
            PropertyValue::Bool(b) => Value::Bool(*b),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Str(s) => f.write_str(&quote(s)),
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::Float(x) if x.is_finite() => write!(f, "{:?}", x),
            PropertyValue::Float(x) => f.write_str(&quote(non_finite_text(*x))),
            PropertyValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Text form of a non-finite float. JSON numbers cannot carry these, so
/// they are stored as strings and parsed back on read.
fn non_finite_text(x: f64) -> &'static str {
    if x.is_nan() {
        "NaN"
    } else if x > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

/// Quotes a string literal, escaping backslash, quotes and control
/// characters.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Renders a label or property name, backtick-quoting anything that is not
/// a plain identifier.
pub fn quote_name(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

/// An ordered property set, built field by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(IndexMap<String, PropertyValue>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: PropertyValue) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub fn int(self, key: &str, value: i64) -> Self {
        self.set(key, PropertyValue::Int(value))
    }

    pub fn uint(self, key: &str, value: u32) -> Self {
        self.int(key, i64::from(value))
    }

    pub fn float(self, key: &str, value: f64) -> Self {
        self.set(key, PropertyValue::Float(value))
    }

    pub fn flag(self, key: &str, value: bool) -> Self {
        self.set(key, PropertyValue::Bool(value))
    }

    pub fn text(self, key: &str, value: &str) -> Self {
        self.set(key, PropertyValue::Str(value.to_string()))
    }

    /// An id property, or the `-1` sentinel when absent.
    pub fn opt_id<I: Into<u32>>(self, key: &str, value: Option<I>) -> Self {
        self.int(key, value.map_or(-1, |v| i64::from(v.into())))
    }

    pub fn list<'a, T: CodecValue + 'a>(self, key: &str, items: impl IntoIterator<Item = &'a T>) -> Self {
        let encoded = codec::encode_list(items);
        self.set(key, PropertyValue::Str(encoded))
    }

    /// A pre-encoded collection.
    pub fn encoded(self, key: &str, encoded: String) -> Self {
        self.set(key, PropertyValue::Str(encoded))
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON object form, as stores return it in records.
    pub fn to_json(&self) -> Value {
        Value::Object(self.to_object())
    }

    pub fn to_object(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }

    fn write_map(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", quote_name(k), v)?;
        }
        f.write_str("}")
    }
}

/// Locates one endpoint node by label and key properties.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMatch {
    pub label: Option<&'static str>,
    pub keys: Properties,
}

impl NodeMatch {
    /// Matches the node with `id` among nodes of any label in the store.
    pub fn by_id(id: u32) -> Self {
        NodeMatch {
            label: None,
            keys: Properties::new().uint("id", id),
        }
    }

    pub fn labelled(label: &'static str, keys: Properties) -> Self {
        NodeMatch {
            label: Some(label),
            keys,
        }
    }

    /// Whether a stored node with `label` and `properties` satisfies this
    /// pattern.
    pub fn matches(&self, label: &str, properties: &Map<String, Value>) -> bool {
        self.label.map_or(true, |l| l == label)
            && self
                .keys
                .iter()
                .all(|(k, v)| properties.get(k) == Some(&v.to_json()))
    }

    /// The `id` key, when the pattern has an integer one.
    pub fn id(&self) -> Option<i64> {
        match self.keys.get("id") {
            Some(PropertyValue::Int(id)) => Some(*id),
            _ => None,
        }
    }

    fn write_pattern(&self, var: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", var)?;
        if let Some(label) = self.label {
            write!(f, ":{}", quote_name(label))?;
        }
        f.write_str(" ")?;
        self.keys.write_map(f)?;
        f.write_str(")")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Create one node.
    CreateNode {
        label: &'static str,
        properties: Properties,
    },
    /// Attach an edge between two existing nodes, merging on `key`.
    MergeEdge {
        label: &'static str,
        src: NodeMatch,
        dst: NodeMatch,
        key: Properties,
        properties: Properties,
    },
    /// One page of nodes with `label`.
    MatchNodes {
        label: &'static str,
        skip: usize,
        limit: usize,
    },
    /// One page of edges with `label`.
    MatchEdges {
        label: &'static str,
        skip: usize,
        limit: usize,
    },
    /// Remove every node and edge of the store.
    Clear,
}

impl Statement {
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Statement::CreateNode { label, .. }
            | Statement::MergeEdge { label, .. }
            | Statement::MatchNodes { label, .. }
            | Statement::MatchEdges { label, .. } => Some(label),
            Statement::Clear => None,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::CreateNode { label, properties } => {
                write!(f, "CREATE (n:{} ", quote_name(label))?;
                properties.write_map(f)?;
                f.write_str(")")
            }
            Statement::MergeEdge {
                label,
                src,
                dst,
                key,
                properties,
            } => {
                f.write_str("MATCH ")?;
                src.write_pattern("n", f)?;
                f.write_str(", ")?;
                dst.write_pattern("m", f)?;
                write!(f, " MERGE (n)-[r:{}", quote_name(label))?;
                if !key.is_empty() {
                    f.write_str(" ")?;
                    key.write_map(f)?;
                }
                f.write_str("]->(m)")?;
                for (i, (k, v)) in properties.iter().enumerate() {
                    f.write_str(if i == 0 { " SET " } else { ", " })?;
                    write!(f, "r.{} = {}", quote_name(k), v)?;
                }
                Ok(())
            }
            Statement::MatchNodes { label, skip, limit } => write!(
                f,
                "MATCH (n:{}) RETURN n SKIP {} LIMIT {}",
                quote_name(label),
                skip,
                limit
            ),
            Statement::MatchEdges { label, skip, limit } => write!(
                f,
                "MATCH ()-[r:{}]->() RETURN r SKIP {} LIMIT {}",
                quote_name(label),
                skip,
                limit
            ),
            Statement::Clear => f.write_str("MATCH (n) DETACH DELETE n"),
        }
    }
}
