use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::rules::values::{float_text, Scalar, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Binary,
    Timestamp,
    List,
    Dict,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Null => "null",
            NodeKind::Bool => "bool",
            NodeKind::Int => "int",
            NodeKind::Float => "float",
            NodeKind::String => "string",
            NodeKind::Binary => "binary",
            NodeKind::Timestamp => "timestamp",
            NodeKind::List => "list",
            NodeKind::Dict => "dict",
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Binary(String),
    Timestamp(DateTime<FixedOffset>),
    List(Vec<TypedNode>),
    Dict(Vec<TypedEntry>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedEntry {
    pub key: TypedNode,
    pub value: TypedNode,
}

///
/// One node of a validated document. `rule` names the innermost named rule
/// the node was matched through, if any.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedNode {
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    pub span: Span,
    pub value: TypedValue,
}

impl TypedNode {
    pub fn new(kind: NodeKind, span: Span, value: TypedValue) -> TypedNode {
        TypedNode {
            kind,
            rule: None,
            span,
            value,
        }
    }

    pub(crate) fn from_scalar(scalar: Scalar, span: Span) -> TypedNode {
        match scalar {
            Scalar::Null => TypedNode::new(NodeKind::Null, span, TypedValue::Null),
            Scalar::Bool(b) => TypedNode::new(NodeKind::Bool, span, TypedValue::Bool(b)),
            Scalar::Int(i) => TypedNode::new(NodeKind::Int, span, TypedValue::Int(i)),
            Scalar::Float(f) => TypedNode::new(NodeKind::Float, span, TypedValue::Float(f)),
            Scalar::String(s) => TypedNode::new(NodeKind::String, span, TypedValue::String(s)),
        }
    }

    pub fn list(span: Span, items: Vec<TypedNode>) -> TypedNode {
        TypedNode::new(NodeKind::List, span, TypedValue::List(items))
    }

    pub fn dict(span: Span, entries: Vec<TypedEntry>) -> TypedNode {
        TypedNode::new(NodeKind::Dict, span, TypedValue::Dict(entries))
    }

    pub fn kind(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Value of the first entry whose key reads as `key`, so `1` and `"1"`
    /// are both found by `get("1")`.
    pub fn get(&self, key: &str) -> Option<&TypedNode> {
        match &self.value {
            TypedValue::Dict(entries) => entries
                .iter()
                .find(|entry| entry.key.key_text().as_deref() == Some(key))
                .map(|entry| &entry.value),
            _ => None,
        }
    }

    pub fn entries(&self) -> Option<&[TypedEntry]> {
        match &self.value {
            TypedValue::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Text of a scalar node as written for a map key.
    pub fn key_text(&self) -> Option<String> {
        match &self.value {
            TypedValue::Null => Some("null".to_string()),
            TypedValue::Bool(b) => Some(b.to_string()),
            TypedValue::Int(i) => Some(i.to_string()),
            TypedValue::Float(f) => Some(float_text(*f)),
            TypedValue::String(s) | TypedValue::Binary(s) => Some(s.clone()),
            TypedValue::Timestamp(t) => Some(t.to_rfc3339()),
            TypedValue::List(_) | TypedValue::Dict(_) => None,
        }
    }

    pub fn items(&self) -> Option<&[TypedNode]> {
        match &self.value {
            TypedValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// The plain value of this node with kinds and spans stripped. Keys that
    /// read the same, like `1` and `"1"`, collapse to the last one.
    pub fn to_plain(&self) -> serde_json::Value {
        match &self.value {
            TypedValue::Null => serde_json::Value::Null,
            TypedValue::Bool(b) => serde_json::Value::Bool(*b),
            TypedValue::Int(i) => serde_json::Value::from(*i),
            TypedValue::Float(f) => Scalar::from_float(*f).to_plain(),
            TypedValue::String(s) | TypedValue::Binary(s) => serde_json::Value::String(s.clone()),
            TypedValue::Timestamp(t) => serde_json::Value::String(t.to_rfc3339()),
            TypedValue::List(items) => {
                serde_json::Value::Array(items.iter().map(TypedNode::to_plain).collect())
            }
            TypedValue::Dict(entries) => {
                let mut map = serde_json::Map::new();
                for entry in entries {
                    if let Some(key) = entry.key.key_text() {
                        map.insert(key, entry.value.to_plain());
                    }
                }
                serde_json::Value::Object(map)
            }
        }
    }
}
