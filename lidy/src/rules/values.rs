use serde::Serialize;

/// Byte range of a node inside the text it was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Span {
        Span { start, end }
    }
}

/// A loaded YAML node. Every variant carries the span it was read from, which
/// is what lets diagnostics point back into the source.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkedValue {
    Null(Span),
    BadValue(String, Span),
    String(String, Span),
    Int(i64, Span),
    Float(f64, Span),
    Bool(bool, Span),
    List(Vec<MarkedValue>, Span),
    Map(Vec<(MarkedValue, MarkedValue)>, Span),
}

impl MarkedValue {
    pub fn span(&self) -> Span {
        match self {
            MarkedValue::Null(span)
            | MarkedValue::BadValue(_, span)
            | MarkedValue::String(_, span)
            | MarkedValue::Int(_, span)
            | MarkedValue::Float(_, span)
            | MarkedValue::Bool(_, span)
            | MarkedValue::List(_, span)
            | MarkedValue::Map(_, span) => *span,
        }
    }

    pub(crate) fn span_mut(&mut self) -> &mut Span {
        match self {
            MarkedValue::Null(span)
            | MarkedValue::BadValue(_, span)
            | MarkedValue::String(_, span)
            | MarkedValue::Int(_, span)
            | MarkedValue::Float(_, span)
            | MarkedValue::Bool(_, span)
            | MarkedValue::List(_, span)
            | MarkedValue::Map(_, span) => span,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !self.is_mapping() && !self.is_sequence()
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, MarkedValue::Map(..))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, MarkedValue::List(..))
    }

    pub fn entries(&self) -> Option<&[(MarkedValue, MarkedValue)]> {
        match self {
            MarkedValue::Map(entries, _) => Some(entries),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[MarkedValue]> {
        match self {
            MarkedValue::List(items, _) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MarkedValue::String(s, _) => Some(s),
            _ => None,
        }
    }

    /// Text used to compare a mapping key against literal key names. Only
    /// defined for scalars.
    pub fn key_text(&self) -> Option<String> {
        match self {
            MarkedValue::String(s, _) | MarkedValue::BadValue(s, _) => Some(s.clone()),
            MarkedValue::Null(_) => Some("null".to_string()),
            MarkedValue::Bool(b, _) => Some(b.to_string()),
            MarkedValue::Int(i, _) => Some(i.to_string()),
            MarkedValue::Float(f, _) => Some(float_text(*f)),
            MarkedValue::List(..) | MarkedValue::Map(..) => None,
        }
    }

    pub fn to_scalar(&self) -> Option<Scalar> {
        match self {
            MarkedValue::Null(_) => Some(Scalar::Null),
            MarkedValue::Bool(b, _) => Some(Scalar::Bool(*b)),
            MarkedValue::Int(i, _) => Some(Scalar::Int(*i)),
            MarkedValue::Float(f, _) => Some(Scalar::from_float(*f)),
            MarkedValue::String(s, _) => Some(Scalar::String(s.clone())),
            MarkedValue::BadValue(..) | MarkedValue::List(..) | MarkedValue::Map(..) => None,
        }
    }

    /// Plain JSON value of this node with spans stripped. Integral floats are
    /// written as integers so the output agrees with the typed tree.
    pub fn to_plain(&self) -> serde_json::Value {
        match self {
            MarkedValue::List(items, _) => {
                serde_json::Value::Array(items.iter().map(MarkedValue::to_plain).collect())
            }
            MarkedValue::Map(entries, _) => {
                let mut map = serde_json::Map::new();
                for (key, value) in entries {
                    let key = key.key_text().unwrap_or_default();
                    map.insert(key, value.to_plain());
                }
                serde_json::Value::Object(map)
            }
            MarkedValue::BadValue(s, _) => serde_json::Value::String(s.clone()),
            scalar => scalar
                .to_scalar()
                .map_or(serde_json::Value::Null, |s| s.to_plain()),
        }
    }

    pub fn type_info(&self) -> &'static str {
        match self {
            MarkedValue::Null(_) => "null",
            MarkedValue::BadValue(..) => "malformed tagged scalar",
            MarkedValue::String(..) => "string",
            MarkedValue::Int(..) => "int",
            MarkedValue::Float(..) => "float",
            MarkedValue::Bool(..) => "bool",
            MarkedValue::List(..) => "list",
            MarkedValue::Map(..) => "map",
        }
    }
}

/// A scalar value with its span dropped, used by `_in`/`_notin` sets and by the
/// `any` classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    pub(crate) fn from_float(f: f64) -> Scalar {
        if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
            Scalar::Int(f as i64)
        } else {
            Scalar::Float(f)
        }
    }

    /// Equality used by `_in` and `_notin`, where `.nan` is one value.
    pub(crate) fn same_value(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Float(a), Scalar::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self == other,
        }
    }

    pub fn to_plain(&self) -> serde_json::Value {
        match self {
            Scalar::Null => serde_json::Value::Null,
            Scalar::Bool(b) => serde_json::Value::Bool(*b),
            Scalar::Int(i) => serde_json::Value::from(*i),
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Scalar::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(v) => f.write_str(&float_text(*v)),
            Scalar::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

pub(crate) fn float_text(f: f64) -> String {
    if f.is_nan() {
        ".nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { ".inf" } else { "-.inf" }.to_string()
    } else {
        f.to_string()
    }
}

#[cfg(test)]
#[path = "values_tests.rs"]
mod values_tests;
