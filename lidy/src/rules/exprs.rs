use std::collections::BTreeSet;
use std::fmt::Formatter;

use fancy_regex::Regex;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::rules::{
    errors::GrammarError,
    values::{Scalar, Span},
};

///
/// Predefined types that can be used as a rule body. Several have a second
/// spelling, `str` for `string`, `bool` for `boolean` and `base64` for
/// `binary`.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Atomic {
    Null,
    Boolean,
    Int,
    Float,
    String,
    Binary,
    Timestamp,
    Any,
}

impl Atomic {
    pub fn from_name(name: &str) -> Option<Atomic> {
        match name {
            "null" => Some(Atomic::Null),
            "boolean" | "bool" => Some(Atomic::Boolean),
            "int" => Some(Atomic::Int),
            "float" => Some(Atomic::Float),
            "string" | "str" => Some(Atomic::String),
            "binary" | "base64" => Some(Atomic::Binary),
            "timestamp" => Some(Atomic::Timestamp),
            "any" => Some(Atomic::Any),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Atomic::Null => "null",
            Atomic::Boolean => "boolean",
            Atomic::Int => "int",
            Atomic::Float => "float",
            Atomic::String => "string",
            Atomic::Binary => "binary",
            Atomic::Timestamp => "timestamp",
            Atomic::Any => "any",
        }
    }
}

impl std::fmt::Display for Atomic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

///
/// Bounds on the number of entries of a dict or items of a list, from
/// `_nb`, `_min` and `_max`.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Cardinality {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nb: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
}

impl Cardinality {
    pub fn is_unbounded(&self) -> bool {
        self.nb.is_none() && self.min.is_none() && self.max.is_none()
    }

    pub fn allows_zero(&self) -> bool {
        self.nb == Some(0) || self.min == Some(0)
    }

    /// Combines two sets of bounds, keeping the tightest of each.
    pub(crate) fn tighten(self, other: Cardinality, span: Span) -> Result<Cardinality, GrammarError> {
        let nb = match (self.nb, other.nb) {
            (Some(a), Some(b)) if a != b => {
                return Err(GrammarError::ContradictoryCardinality {
                    detail: format!("`_nb: {}` and `_nb: {}` are both required", a, b),
                    span,
                })
            }
            (a, b) => a.or(b),
        };
        let min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Cardinality { nb, min, max }.validated(span)
    }

    pub(crate) fn validated(self, span: Span) -> Result<Cardinality, GrammarError> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(GrammarError::ContradictoryCardinality {
                    detail: format!("`_min: {}` is greater than `_max: {}`", min, max),
                    span,
                });
            }
        }
        if let Some(nb) = self.nb {
            if self.min.map_or(false, |min| nb < min) || self.max.map_or(false, |max| nb > max) {
                return Err(GrammarError::ContradictoryCardinality {
                    detail: format!("`_nb: {}` is outside of the `_min`/`_max` bounds", nb),
                    span,
                });
            }
        }
        Ok(self)
    }

    /// Checks a count against the bounds, returning the message to report
    /// when it falls outside of them.
    pub fn check(&self, count: usize, noun: &str) -> Result<(), String> {
        if let Some(nb) = self.nb {
            if count != nb {
                return Err(format!("expected exactly {} {}, found {}", nb, noun, count));
            }
        }
        if let Some(min) = self.min {
            if count < min {
                return Err(format!("expected at least {} {}, found {}", min, noun, count));
            }
        }
        if let Some(max) = self.max {
            if count > max {
                return Err(format!("expected at most {} {}, found {}", max, noun, count));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyValueRule {
    pub key: Rule,
    pub value: Rule,
}

///
/// Canonical dictionary rule. `required` and `optional` are literal keys,
/// `of` is the clause for every other key.
///
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DictRule {
    pub required: IndexMap<String, Rule>,
    pub optional: IndexMap<String, Rule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub of: Option<Box<KeyValueRule>>,
    #[serde(skip_serializing_if = "Cardinality::is_unbounded")]
    pub card: Cardinality,
}

impl DictRule {
    pub fn clause(&self, key: &str) -> Option<&Rule> {
        self.required.get(key).or_else(|| self.optional.get(key))
    }

    pub(crate) fn literal_keys(&self) -> impl Iterator<Item = &String> {
        self.required.keys().chain(self.optional.keys())
    }
}

///
/// Canonical list rule. Positions in `optional_positions` are zero based and
/// may be skipped; `of` matches every item past the positional ones.
///
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListRule {
    pub positional: Vec<Rule>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub optional_positions: BTreeSet<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub of: Option<Box<Rule>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub allow_empty_of: bool,
    #[serde(skip_serializing_if = "Cardinality::is_unbounded")]
    pub card: Cardinality,
}

/// A compiled `_regexp` together with the text it was compiled from.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub(crate) fn new(source: &str, span: Span) -> Result<Pattern, GrammarError> {
        match Regex::new(source) {
            Ok(regex) => Ok(Pattern {
                source: source.to_string(),
                regex,
            }),
            Err(e) => Err(GrammarError::InvalidRegex {
                pattern: source.to_string(),
                source: Box::new(e),
                span,
            }),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for Pattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.source)
    }
}

///
/// A rule in canonical form. `_copy` and `_merge` have been folded away by
/// normalization and nested `_oneOf` alternatives are spliced into their
/// parent, so the matcher only ever sees these shapes.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Rule {
    Atomic(Atomic),
    Ref(String),
    Dict(DictRule),
    List(ListRule),
    OneOf(Vec<Rule>),
    In(Vec<Scalar>),
    NotIn(Vec<Scalar>),
    Regexp(Pattern),
}

impl Rule {
    /// Short human description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Rule::Atomic(atomic) => match atomic {
                Atomic::Any => "any value".to_string(),
                Atomic::Null => "null".to_string(),
                Atomic::Int => "an int".to_string(),
                other => format!("a {}", other),
            },
            Rule::Ref(name) => format!("`{}`", name),
            Rule::Dict(dict) => {
                let keys: Vec<&str> = dict.literal_keys().map(String::as_str).collect();
                if keys.is_empty() {
                    "a map".to_string()
                } else {
                    format!("a map with keys {}", keys.join(", "))
                }
            }
            Rule::List(_) => "a list".to_string(),
            Rule::OneOf(alternatives) => {
                let parts: Vec<String> = alternatives.iter().map(Rule::describe).collect();
                parts.join(" | ")
            }
            Rule::In(values) => format!("one of {}", scalars_text(values)),
            Rule::NotIn(values) => format!("none of {}", scalars_text(values)),
            Rule::Regexp(pattern) => format!("a string matching /{}/", pattern.source()),
        }
    }
}

pub(crate) fn scalars_text(values: &[Scalar]) -> String {
    let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

///
/// A compiled grammar: rule names mapped to canonical rules, in declaration
/// order. Built by [`crate::rules::normalize::compile_document`] and never
/// changed afterwards.
///
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Grammar {
    rules: IndexMap<String, Rule>,
    #[serde(skip)]
    exports: IndexMap<String, String>,
}

impl Grammar {
    pub(crate) fn new(rules: IndexMap<String, Rule>, exports: IndexMap<String, String>) -> Grammar {
        Grammar { rules, exports }
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Name the rule was exported under with `name:` or `name::export`.
    pub fn export_of(&self, name: &str) -> Option<&str> {
        self.exports.get(name).map(String::as_str)
    }

    pub fn rules(&self) -> impl Iterator<Item = (&String, &Rule)> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
#[path = "exprs_tests.rs"]
mod exprs_tests;
