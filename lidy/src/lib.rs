// Copyright lidy developers. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//!
//! Grammar driven validation of YAML documents.
//!
//! A grammar is a YAML map from rule names to rules written with a small set
//! of keywords (`_dict`, `_listOf`, `_oneOf`, `_merge`, ...). It is compiled
//! once into canonical rules, then any number of documents can be matched
//! against one of its rules. Matching produces a typed tree with the source
//! span of every node, or the list of every problem found.
//!

pub mod command;
pub mod commands;
pub mod rules;
pub mod utils;

pub use crate::rules::builders::{BuildResult, Builders};
pub use crate::rules::diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use crate::rules::errors::{Error, GrammarError};
pub use crate::rules::exprs::Grammar;
pub use crate::rules::libyaml::loader::Loader;
pub use crate::rules::matcher::{ValidateOptions, Validation};
pub use crate::rules::normalize::{compile_document, compile_grammar, CompileOptions};
pub use crate::rules::typed::{NodeKind, TypedNode};
pub use crate::rules::values::{MarkedValue, Span};
pub use crate::utils::LineIndex;

///
/// Compiles `grammar_text` and validates `document_text` against the rule
/// named `entry`, with default options.
///
pub fn validate_str(
    grammar_text: &str,
    entry: &str,
    document_text: &str,
) -> crate::rules::Result<Validation> {
    let grammar = compile_grammar(grammar_text, &CompileOptions::default())?;
    let document = Loader::new().load(document_text)?;
    grammar.validate(entry, &document, &ValidateOptions::default())
}
