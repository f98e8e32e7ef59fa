use lazy_static::lazy_static;
use std::borrow::Cow;

use fancy_regex::Regex;

use crate::rules::{
    errors::Error,
    libyaml::{
        event::{Event, Scalar, ScalarStyle},
        parser::Parser,
    },
    values::{MarkedValue, Span},
    Result,
};

lazy_static! {
    static ref PLAIN_FLOAT: Regex =
        Regex::new(r"^[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?$")
            .ok()
            .unwrap();
}

/// Deepest container nesting a document may have. Everything that walks a
/// loaded tree recurses, so deeper input is refused at load time.
pub const MAX_NESTING: usize = 1024;

/// Builds a [`MarkedValue`] tree from the libyaml event stream of the first
/// document in a text.
#[derive(Debug, Default)]
pub struct Loader {
    stack: Vec<MarkedValue>,
    last_container_index: Vec<usize>,
}

impl Loader {
    pub fn new() -> Loader {
        Loader::default()
    }

    pub fn load(&mut self, content: &str) -> Result<MarkedValue> {
        self.stack.clear();
        self.last_container_index.clear();
        let mut parser = Parser::new(Cow::Borrowed(content.as_bytes()))?;

        loop {
            let (event, span) = parser.next()?;
            match event {
                Event::StreamStart | Event::DocumentStart | Event::NoEvent => {}
                Event::StreamEnd => return Ok(MarkedValue::Null(span)),
                Event::DocumentEnd => {
                    let root = match self.stack.pop() {
                        Some(root) => root,
                        None => MarkedValue::Null(span),
                    };
                    self.stack.clear();
                    self.last_container_index.clear();
                    return Ok(root);
                }
                Event::MappingStart => {
                    self.handle_container_start(MarkedValue::Map(vec![], span))?
                }
                Event::MappingEnd => self.handle_mapping_end(span)?,
                Event::SequenceStart => {
                    self.handle_container_start(MarkedValue::List(vec![], span))?
                }
                Event::SequenceEnd => self.handle_sequence_end(span)?,
                Event::Scalar(scalar) => self.handle_scalar_event(scalar, span),
                Event::Alias(anchor) => {
                    return Err(Error::ParseError(format!(
                        "aliases are not supported, found *{}",
                        anchor
                    )))
                }
            }
        }
    }

    fn handle_scalar_event(&mut self, event: Scalar, span: Span) {
        let Scalar { tag, value, style } = event;
        let val = String::from_utf8_lossy(&value).into_owned();

        let value = match tag {
            Some(tag) => match tag.core_suffix() {
                Some(suffix) => handle_type_ref(val, span, &suffix),
                None => MarkedValue::String(val, span),
            },
            None if style != ScalarStyle::Plain => MarkedValue::String(val, span),
            None => resolve_plain(val, span),
        };

        self.stack.push(value);
    }

    fn handle_container_start(&mut self, container: MarkedValue) -> Result<()> {
        if self.last_container_index.len() >= MAX_NESTING {
            return Err(Error::ParseError(format!(
                "document nested deeper than {} levels at byte {}",
                MAX_NESTING,
                container.span().start
            )));
        }
        self.stack.push(container);
        self.last_container_index.push(self.stack.len() - 1);
        Ok(())
    }

    fn close_container(&mut self, end: Span) -> Result<(Vec<MarkedValue>, &mut MarkedValue)> {
        let index = self
            .last_container_index
            .pop()
            .ok_or_else(|| unbalanced("container end without a start"))?;
        let children: Vec<MarkedValue> = self.stack.drain(index + 1..).collect();
        let container = self
            .stack
            .last_mut()
            .ok_or_else(|| unbalanced("container end without a start"))?;
        container.span_mut().end = end.end;
        Ok((children, container))
    }

    fn handle_sequence_end(&mut self, end: Span) -> Result<()> {
        let (values, container) = self.close_container(end)?;
        match container {
            MarkedValue::List(items, _) => {
                items.extend(values);
                Ok(())
            }
            _ => Err(unbalanced("sequence end closes a mapping")),
        }
    }

    fn handle_mapping_end(&mut self, end: Span) -> Result<()> {
        let (key_values, container) = self.close_container(end)?;
        let entries = match container {
            MarkedValue::Map(entries, _) => entries,
            _ => return Err(unbalanced("mapping end closes a sequence")),
        };
        if key_values.len() % 2 != 0 {
            return Err(unbalanced("mapping with a key and no value"));
        }
        let mut iter = key_values.into_iter();
        while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
            entries.push((key, value));
        }
        Ok(())
    }
}

fn unbalanced(msg: &str) -> Error {
    Error::ParseError(format!("unbalanced YAML event stream, {}", msg))
}

fn resolve_plain(val: String, span: Span) -> MarkedValue {
    match val.as_str() {
        "" | "~" | "null" | "Null" | "NULL" => return MarkedValue::Null(span),
        "true" | "True" | "TRUE" => return MarkedValue::Bool(true, span),
        "false" | "False" | "FALSE" => return MarkedValue::Bool(false, span),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => {
            return MarkedValue::Float(f64::INFINITY, span)
        }
        "-.inf" | "-.Inf" | "-.INF" => return MarkedValue::Float(f64::NEG_INFINITY, span),
        ".nan" | ".NaN" | ".NAN" => return MarkedValue::Float(f64::NAN, span),
        _ => {}
    }

    if let Some(i) = parse_int(&val) {
        return MarkedValue::Int(i, span);
    }
    if PLAIN_FLOAT.is_match(&val).unwrap_or(false) {
        if let Ok(f) = val.parse::<f64>() {
            return MarkedValue::Float(f, span);
        }
    }
    MarkedValue::String(val, span)
}

fn parse_int(val: &str) -> Option<i64> {
    if let Some(hex) = val.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(oct) = val.strip_prefix("0o") {
        return i64::from_str_radix(oct, 8).ok();
    }
    let digits = val.strip_prefix(|c| c == '-' || c == '+').unwrap_or(val);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        val.parse::<i64>().ok()
    } else {
        None
    }
}

fn handle_type_ref(val: String, span: Span, type_ref: &str) -> MarkedValue {
    match type_ref {
        "bool" => match val.as_str() {
            "true" | "True" | "TRUE" => MarkedValue::Bool(true, span),
            "false" | "False" | "FALSE" => MarkedValue::Bool(false, span),
            _ => MarkedValue::BadValue(val, span),
        },
        "int" => match parse_int(&val) {
            Some(v) => MarkedValue::Int(v, span),
            None => MarkedValue::BadValue(val, span),
        },
        "float" => match resolve_plain(val.clone(), span) {
            MarkedValue::Int(i, _) => MarkedValue::Float(i as f64, span),
            MarkedValue::Float(f, _) => MarkedValue::Float(f, span),
            _ => MarkedValue::BadValue(val, span),
        },
        "null" => match val.as_str() {
            "" | "~" | "null" | "Null" | "NULL" => MarkedValue::Null(span),
            _ => MarkedValue::BadValue(val, span),
        },
        _ => MarkedValue::String(val, span),
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod loader_tests;
