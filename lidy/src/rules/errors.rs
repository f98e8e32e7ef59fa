use std::fmt::Debug;
use thiserror::Error;

use crate::rules::values::Span;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error parsing incoming JSON context {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Error writing YAML output {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Formatting error when writing {0}")]
    FormatError(#[from] std::fmt::Error),
    #[error("I/O error when reading {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parser Error when parsing `{0}`")]
    ParseError(String),
    #[error("{0}")]
    Grammar(#[from] GrammarError),
    #[error("No rule named `{0}` to start validation from")]
    MissingEntryRule(String),
    #[error("The path `{0}` does not exist")]
    FileNotFoundError(String),
    #[error("{0}")]
    IllegalArguments(String),
    #[error("Could not write shell completions: {0}")]
    InvalidCompletionsPath(String),
}

/// Problems found while compiling a grammar. Each one carries the span of the
/// grammar node at fault.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("the grammar must be a map from rule names to rules, found a {found}")]
    NotARuleMap { found: &'static str, span: Span },
    #[error("`{name}` is not a valid rule name")]
    InvalidRuleName { name: String, span: Span },
    #[error("rule `{name}` is declared more than once")]
    DuplicateRule { name: String, span: Span },
    #[error("`{name}` is a predefined type and cannot be redeclared")]
    ReservedRuleName { name: String, span: Span },
    #[error("no rule named `{name}`")]
    DanglingReference { name: String, span: Span },
    #[error("`{keyword}` is not a grammar keyword")]
    UnknownKeyword { keyword: String, span: Span },
    #[error("keyword `{keyword}` appears more than once in the same rule")]
    DuplicateKeyword { keyword: String, span: Span },
    #[error("keyword `{keyword}` expects {expected}")]
    MalformedClause {
        keyword: &'static str,
        expected: &'static str,
        span: Span,
    },
    #[error("expected a rule name or a map of keywords, found a {found}")]
    MalformedRule { found: &'static str, span: Span },
    #[error("keyword `{keyword}` cannot be combined with `{other}` in one rule")]
    ConflictingForms {
        keyword: &'static str,
        other: &'static str,
        span: Span,
    },
    #[error("a rule made of cardinality keywords alone needs `_dict` or `_list`")]
    MissingForm { span: Span },
    #[error("`{keyword}` is defined by more than one merged part")]
    DuplicateClause { keyword: &'static str, span: Span },
    #[error("key `{key}` is defined by more than one merged part")]
    ConflictingKey { key: String, span: Span },
    #[error("cannot merge {what}, only dict and list rules can be merged")]
    NotMergeable { what: String, span: Span },
    #[error("cannot merge a dict rule with a list rule")]
    MixedMerge { span: Span },
    #[error("`_copy` target `{name}` is not a dict rule")]
    InvalidCopyTarget { name: String, span: Span },
    #[error("rule `{name}` includes itself through `_copy` or `_merge`")]
    CyclicComposition { name: String, span: Span },
    #[error("rule `{name}` only aliases other rules and never reaches a concrete rule")]
    CyclicReference { name: String, span: Span },
    #[error("contradictory cardinality: {detail}")]
    ContradictoryCardinality { detail: String, span: Span },
    #[error("position {position} in `_optionalPositions` is out of range, the rule has {len} positional items")]
    PositionOutOfRange {
        position: usize,
        len: usize,
        span: Span,
    },
    #[error("invalid regular expression `{pattern}`: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: Box<fancy_regex::Error>,
        span: Span,
    },
}

impl GrammarError {
    pub fn span(&self) -> Span {
        match self {
            GrammarError::NotARuleMap { span, .. }
            | GrammarError::InvalidRuleName { span, .. }
            | GrammarError::DuplicateRule { span, .. }
            | GrammarError::ReservedRuleName { span, .. }
            | GrammarError::DanglingReference { span, .. }
            | GrammarError::UnknownKeyword { span, .. }
            | GrammarError::DuplicateKeyword { span, .. }
            | GrammarError::MalformedClause { span, .. }
            | GrammarError::MalformedRule { span, .. }
            | GrammarError::ConflictingForms { span, .. }
            | GrammarError::MissingForm { span }
            | GrammarError::DuplicateClause { span, .. }
            | GrammarError::ConflictingKey { span, .. }
            | GrammarError::NotMergeable { span, .. }
            | GrammarError::MixedMerge { span }
            | GrammarError::InvalidCopyTarget { span, .. }
            | GrammarError::CyclicComposition { span, .. }
            | GrammarError::CyclicReference { span, .. }
            | GrammarError::ContradictoryCardinality { span, .. }
            | GrammarError::PositionOutOfRange { span, .. }
            | GrammarError::InvalidRegex { span, .. } => *span,
        }
    }
}
