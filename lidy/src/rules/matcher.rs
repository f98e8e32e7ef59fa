use std::collections::HashSet;

use log::{debug, trace};
use serde::Serialize;

use crate::rules::{
    builders::Builders,
    diagnostics::{Diagnostic, DiagnosticCode, Diagnostics},
    errors::Error,
    exprs::{scalars_text, Atomic, DictRule, Grammar, ListRule, Pattern, Rule},
    scalars::{bool_token, is_base64, parse_timestamp},
    typed::{NodeKind, TypedEntry, TypedNode, TypedValue},
    values::{MarkedValue, Scalar, Span},
    Result, Status,
};

pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Nested rule applications, counting every list item, map entry and
    /// `any` subtree descended into, allowed before a branch fails with
    /// `RecursionLimit`.
    pub max_depth: usize,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        ValidateOptions {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Outcome of one validation run. `tree` is only present when `errors` is
/// empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validation {
    pub tree: Option<TypedNode>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn status(&self) -> Status {
        if self.is_valid() {
            Status::PASS
        } else {
            Status::FAIL
        }
    }
}

impl Grammar {
    ///
    /// Matches `document` against the rule named `entry`, which may also be one
    /// of the predefined type names. Data problems never make this fail, they
    /// end up in [`Validation::errors`].
    ///
    pub fn validate(
        &self,
        entry: &str,
        document: &MarkedValue,
        options: &ValidateOptions,
    ) -> Result<Validation> {
        self.validate_with(entry, document, options, &Builders::new())
    }

    /// Same as [`Grammar::validate`], running `builders` on every exported rule
    /// that matches.
    pub fn validate_with(
        &self,
        entry: &str,
        document: &MarkedValue,
        options: &ValidateOptions,
        builders: &Builders,
    ) -> Result<Validation> {
        let rule = match (self.rule(entry), Atomic::from_name(entry)) {
            (Some(_), _) => Rule::Ref(entry.to_string()),
            (None, Some(atomic)) => Rule::Atomic(atomic),
            (None, None) => return Err(Error::MissingEntryRule(entry.to_string())),
        };

        let mut diagnostics = Diagnostics::new();
        let mut matcher = Matcher::new(self, options, builders);
        let tree = matcher.match_rule(&rule, document, &mut diagnostics);
        let (errors, warnings) = diagnostics.into_parts();
        debug!(
            "validation from `{}` finished with {} errors and {} warnings",
            entry,
            errors.len(),
            warnings.len()
        );
        let tree = if errors.is_empty() { tree } else { None };
        Ok(Validation {
            tree,
            errors,
            warnings,
        })
    }
}

///
/// Recursive interpreter of canonical rules. Every `match_*` function
/// returns the typed node on success; on failure it has recorded at least one
/// error in the diagnostics it was handed and returns `None`.
///
pub(crate) struct Matcher<'g> {
    grammar: &'g Grammar,
    options: &'g ValidateOptions,
    builders: &'g Builders,
    depth: usize,
}

impl<'g> Matcher<'g> {
    pub(crate) fn new(
        grammar: &'g Grammar,
        options: &'g ValidateOptions,
        builders: &'g Builders,
    ) -> Matcher<'g> {
        Matcher {
            grammar,
            options,
            builders,
            depth: 0,
        }
    }

    pub(crate) fn match_rule(
        &mut self,
        rule: &Rule,
        node: &MarkedValue,
        diagnostics: &mut Diagnostics,
    ) -> Option<TypedNode> {
        if !self.descend(node, diagnostics) {
            return None;
        }
        let matched = match rule {
            Rule::Atomic(atomic) => self.match_atomic(*atomic, node, diagnostics),
            Rule::Ref(name) => self.match_named(name, node, diagnostics),
            Rule::Dict(dict) => self.match_dict(dict, node, diagnostics),
            Rule::List(list) => self.match_list(list, node, diagnostics),
            Rule::OneOf(alternatives) => self.match_one_of(alternatives, node, diagnostics),
            Rule::In(values) => self.match_membership(values, true, node, diagnostics),
            Rule::NotIn(values) => self.match_membership(values, false, node, diagnostics),
            Rule::Regexp(pattern) => self.match_regexp(pattern, node, diagnostics),
        };
        self.depth -= 1;
        matched
    }

    /// Enters one more level of nesting, or records `RecursionLimit` when the
    /// configured depth is already reached.
    fn descend(&mut self, node: &MarkedValue, diagnostics: &mut Diagnostics) -> bool {
        if self.depth >= self.options.max_depth {
            diagnostics.error(
                node.span(),
                DiagnosticCode::RecursionLimit,
                format!(
                    "document nesting exceeds the limit of {} rule applications",
                    self.options.max_depth
                ),
            );
            return false;
        }
        self.depth += 1;
        true
    }

    fn match_named(
        &mut self,
        name: &str,
        node: &MarkedValue,
        diagnostics: &mut Diagnostics,
    ) -> Option<TypedNode> {
        let grammar = self.grammar;
        let rule = match grammar.rule(name) {
            Some(rule) => rule,
            None => {
                diagnostics.error(
                    node.span(),
                    DiagnosticCode::UnresolvedRule,
                    format!("no rule named `{}`", name),
                );
                return None;
            }
        };
        trace!("matching `{}` at {:?}", name, node.span());
        let mut typed = self.match_rule(rule, node, diagnostics)?;
        typed.rule.get_or_insert_with(|| name.to_string());

        let builder = grammar
            .export_of(name)
            .and_then(|export| self.builders.get(export));
        match builder {
            None => Some(typed),
            Some(builder) => match builder(typed) {
                Ok(mut built) => {
                    built.rule.get_or_insert_with(|| name.to_string());
                    Some(built)
                }
                Err(message) => {
                    diagnostics.error(
                        node.span(),
                        DiagnosticCode::BuilderFailed,
                        format!("builder for `{}` failed: {}", name, message),
                    );
                    None
                }
            },
        }
    }

    fn wrong_type(&self, expected: &str, node: &MarkedValue, diagnostics: &mut Diagnostics) {
        diagnostics.error(
            node.span(),
            DiagnosticCode::WrongType,
            format!("expected {} but found a {}", expected, node.type_info()),
        );
    }

    fn match_atomic(
        &mut self,
        atomic: Atomic,
        node: &MarkedValue,
        diagnostics: &mut Diagnostics,
    ) -> Option<TypedNode> {
        let span = node.span();
        let converted = match (atomic, node) {
            (Atomic::Any, _) => return self.match_any(node, diagnostics),
            (Atomic::String, MarkedValue::String(s, _)) => {
                Some((NodeKind::String, TypedValue::String(s.clone())))
            }
            (Atomic::Int, MarkedValue::Int(i, _)) => Some((NodeKind::Int, TypedValue::Int(*i))),
            (Atomic::Int, MarkedValue::Float(f, _)) => match Scalar::from_float(*f) {
                Scalar::Int(i) => Some((NodeKind::Int, TypedValue::Int(i))),
                _ => None,
            },
            (Atomic::Float, MarkedValue::Int(i, _)) => {
                Some((NodeKind::Float, TypedValue::Float(*i as f64)))
            }
            (Atomic::Float, MarkedValue::Float(f, _)) => {
                Some((NodeKind::Float, TypedValue::Float(*f)))
            }
            (Atomic::Boolean, MarkedValue::Bool(b, _)) => {
                Some((NodeKind::Bool, TypedValue::Bool(*b)))
            }
            (Atomic::Boolean, MarkedValue::String(s, _)) => bool_token(s).map(|b| {
                diagnostics.warning(
                    span,
                    DiagnosticCode::DeprecatedBoolean,
                    format!("`{}` read as the boolean {}, write `{}` instead", s, b, b),
                );
                (NodeKind::Bool, TypedValue::Bool(b))
            }),
            (Atomic::Null, MarkedValue::Null(_)) => Some((NodeKind::Null, TypedValue::Null)),
            (Atomic::Binary, MarkedValue::String(s, _)) => {
                if is_base64(s) {
                    Some((NodeKind::Binary, TypedValue::Binary(s.clone())))
                } else {
                    diagnostics.error(
                        span,
                        DiagnosticCode::PatternMismatch,
                        "expected a base64 string",
                    );
                    return None;
                }
            }
            (Atomic::Timestamp, MarkedValue::String(s, _)) => match parse_timestamp(s) {
                Some(timestamp) => Some((NodeKind::Timestamp, TypedValue::Timestamp(timestamp))),
                None => {
                    diagnostics.error(
                        span,
                        DiagnosticCode::WrongType,
                        format!("expected an ISO 8601 timestamp but found `{}`", s),
                    );
                    return None;
                }
            },
            _ => None,
        };

        match converted {
            Some((kind, value)) => Some(TypedNode::new(kind, span, value)),
            None => {
                self.wrong_type(&Rule::Atomic(atomic).describe(), node, diagnostics);
                None
            }
        }
    }

    fn match_any(&mut self, node: &MarkedValue, diagnostics: &mut Diagnostics) -> Option<TypedNode> {
        if !self.descend(node, diagnostics) {
            return None;
        }
        let matched = self.match_any_value(node, diagnostics);
        self.depth -= 1;
        matched
    }

    fn match_any_value(
        &mut self,
        node: &MarkedValue,
        diagnostics: &mut Diagnostics,
    ) -> Option<TypedNode> {
        match node {
            MarkedValue::List(items, span) => {
                let mut typed = Vec::with_capacity(items.len());
                let mut ok = true;
                for item in items {
                    match self.match_any(item, diagnostics) {
                        Some(node) => typed.push(node),
                        None => ok = false,
                    }
                }
                ok.then(|| TypedNode::list(*span, typed))
            }
            MarkedValue::Map(entries, span) => {
                let mut typed = Vec::with_capacity(entries.len());
                let mut seen = HashSet::with_capacity(entries.len());
                let mut ok = true;
                for (key, value) in entries {
                    if self.entry_key(key, &mut seen, diagnostics).is_none() {
                        ok = false;
                        continue;
                    }
                    let key = self.match_any(key, diagnostics);
                    let value = self.match_any(value, diagnostics);
                    match key.zip(value) {
                        Some((key, value)) => typed.push(TypedEntry { key, value }),
                        None => ok = false,
                    }
                }
                ok.then(|| TypedNode::dict(*span, typed))
            }
            scalar => match scalar.to_scalar() {
                Some(value) => Some(TypedNode::from_scalar(value, scalar.span())),
                None => {
                    self.wrong_type("any value", scalar, diagnostics);
                    None
                }
            },
        }
    }

    ///
    /// Text of a mapping key, reporting collection keys and repeated keys. Two
    /// keys are the same only when both their type and text agree, so `1`,
    /// `"1"` and `1.0` are three different keys.
    ///
    fn entry_key(
        &self,
        key: &MarkedValue,
        seen: &mut HashSet<(&'static str, String)>,
        diagnostics: &mut Diagnostics,
    ) -> Option<String> {
        let name = match key.key_text() {
            Some(name) => name,
            None => {
                diagnostics.error(
                    key.span(),
                    DiagnosticCode::InvalidKey,
                    format!("map keys must be scalars, found a {}", key.type_info()),
                );
                return None;
            }
        };
        if !seen.insert((key.type_info(), name.clone())) {
            diagnostics.error(
                key.span(),
                DiagnosticCode::DuplicateKey,
                format!("key `{}` appears more than once", name),
            );
            return None;
        }
        Some(name)
    }

    fn match_dict(
        &mut self,
        rule: &DictRule,
        node: &MarkedValue,
        diagnostics: &mut Diagnostics,
    ) -> Option<TypedNode> {
        let (entries, span) = match node {
            MarkedValue::Map(entries, span) => (entries, *span),
            _ => {
                self.wrong_type(&Rule::Dict(rule.clone()).describe(), node, diagnostics);
                return None;
            }
        };
        if let Err(message) = rule.card.check(entries.len(), "entries") {
            diagnostics.error(span, DiagnosticCode::Cardinality, message);
            return None;
        }

        let mut ok = true;
        let present: HashSet<String> = entries
            .iter()
            .filter_map(|(key, _)| key.key_text())
            .collect();
        for key in rule.required.keys() {
            if !present.contains(key) {
                diagnostics.error(
                    span,
                    DiagnosticCode::MissingKey,
                    format!("missing required key `{}`", key),
                );
                ok = false;
            }
        }

        let mut typed = Vec::with_capacity(entries.len());
        let mut seen = HashSet::with_capacity(entries.len());
        let mut clauses_used = HashSet::new();
        for (key, value) in entries {
            let name = match self.entry_key(key, &mut seen, diagnostics) {
                Some(name) => name,
                None => {
                    ok = false;
                    continue;
                }
            };

            let entry = match (rule.clause(&name), &rule.of) {
                (Some(_), _) if !clauses_used.insert(name.clone()) => {
                    diagnostics.error(
                        key.span(),
                        DiagnosticCode::DuplicateKey,
                        format!("key `{}` appears more than once", name),
                    );
                    None
                }
                (Some(clause), _) => {
                    let key = TypedNode::new(
                        NodeKind::String,
                        key.span(),
                        TypedValue::String(name.clone()),
                    );
                    self.match_rule(clause, value, diagnostics)
                        .map(|value| TypedEntry { key, value })
                }
                (None, Some(of)) => {
                    let key = self.match_rule(&of.key, key, diagnostics);
                    let value = self.match_rule(&of.value, value, diagnostics);
                    key.zip(value).map(|(key, value)| TypedEntry { key, value })
                }
                (None, None) => {
                    let allowed: Vec<&str> = rule.literal_keys().map(String::as_str).collect();
                    diagnostics.error(
                        key.span(),
                        DiagnosticCode::UnknownKey,
                        if allowed.is_empty() {
                            format!("unknown key `{}`, no keys are allowed here", name)
                        } else {
                            format!("unknown key `{}`, expected one of {}", name, allowed.join(", "))
                        },
                    );
                    None
                }
            };

            match entry {
                Some(entry) => typed.push(entry),
                None => ok = false,
            }
        }

        ok.then(|| TypedNode::dict(span, typed))
    }

    fn match_list(
        &mut self,
        rule: &ListRule,
        node: &MarkedValue,
        diagnostics: &mut Diagnostics,
    ) -> Option<TypedNode> {
        let (items, span) = match node {
            MarkedValue::List(items, span) => (items, *span),
            _ => {
                self.wrong_type("a list", node, diagnostics);
                return None;
            }
        };
        if let Err(message) = rule.card.check(items.len(), "items") {
            diagnostics.error(span, DiagnosticCode::Cardinality, message);
            return None;
        }

        let mut typed = Vec::with_capacity(items.len());
        if self.match_positions(rule, items, span, 0, 0, &mut typed, diagnostics) {
            Some(TypedNode::list(span, typed))
        } else {
            None
        }
    }

    ///
    /// Matches positional rule `position` against item `index` and everything
    /// after it. An optional position is first tried consuming the item; if
    /// that attempt or anything after it fails, the attempt is rolled back and
    /// the position is skipped instead.
    ///
    #[allow(clippy::too_many_arguments)]
    fn match_positions(
        &mut self,
        rule: &ListRule,
        items: &[MarkedValue],
        span: Span,
        position: usize,
        index: usize,
        typed: &mut Vec<TypedNode>,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        let positional = match rule.positional.get(position) {
            Some(positional) => positional,
            None => return self.match_tail(rule, items, span, index, typed, diagnostics),
        };

        if rule.optional_positions.contains(&position) {
            if let Some(item) = items.get(index) {
                let checkpoint = diagnostics.checkpoint();
                let len = typed.len();
                if let Some(node) = self.match_rule(positional, item, diagnostics) {
                    typed.push(node);
                    let next = position + 1;
                    if self.match_positions(rule, items, span, next, index + 1, typed, diagnostics) {
                        return true;
                    }
                }
                diagnostics.rollback(checkpoint);
                typed.truncate(len);
            }
            return self.match_positions(rule, items, span, position + 1, index, typed, diagnostics);
        }

        let item = match items.get(index) {
            Some(item) => item,
            None => {
                diagnostics.error(
                    span,
                    DiagnosticCode::MissingElement,
                    format!(
                        "missing item at position {}, expected {}",
                        position + 1,
                        positional.describe()
                    ),
                );
                return false;
            }
        };
        let matched = self.match_rule(positional, item, diagnostics);
        let ok = matched.is_some();
        typed.extend(matched);
        let rest =
            self.match_positions(rule, items, span, position + 1, index + 1, typed, diagnostics);
        ok && rest
    }

    fn match_tail(
        &mut self,
        rule: &ListRule,
        items: &[MarkedValue],
        span: Span,
        index: usize,
        typed: &mut Vec<TypedNode>,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        let rest = items.get(index..).unwrap_or(&[]);
        let of = match &rule.of {
            Some(of) => of,
            None => {
                return match rest.first() {
                    Some(extra) => {
                        diagnostics.error(
                            extra.span(),
                            DiagnosticCode::TooManyElements,
                            format!(
                                "unexpected item at position {}, the list holds at most {} items",
                                index + 1,
                                rule.positional.len()
                            ),
                        );
                        false
                    }
                    None => true,
                }
            }
        };

        if rest.is_empty() && !rule.allow_empty_of && !rule.card.allows_zero() {
            diagnostics.error(
                span,
                DiagnosticCode::EmptyListOf,
                format!("expected at least one item of {}", of.describe()),
            );
            return false;
        }

        let mut ok = true;
        for item in rest {
            match self.match_rule(of, item, diagnostics) {
                Some(node) => typed.push(node),
                None => ok = false,
            }
        }
        ok
    }

    fn match_one_of(
        &mut self,
        alternatives: &[Rule],
        node: &MarkedValue,
        diagnostics: &mut Diagnostics,
    ) -> Option<TypedNode> {
        for alternative in alternatives {
            let checkpoint = diagnostics.checkpoint();
            if let Some(typed) = self.match_rule(alternative, node, diagnostics) {
                if !diagnostics.has_errors_since(checkpoint) {
                    return Some(typed);
                }
            }
            diagnostics.rollback(checkpoint);
        }
        diagnostics.error(
            node.span(),
            DiagnosticCode::NoAlternativeMatched,
            format!(
                "no alternative matched, expected {}",
                Rule::OneOf(alternatives.to_vec()).describe()
            ),
        );
        None
    }

    fn match_membership(
        &mut self,
        values: &[Scalar],
        member: bool,
        node: &MarkedValue,
        diagnostics: &mut Diagnostics,
    ) -> Option<TypedNode> {
        let scalar = match node.to_scalar() {
            Some(scalar) => scalar,
            None => {
                self.wrong_type("a scalar", node, diagnostics);
                return None;
            }
        };
        let found = values.iter().any(|value| value.same_value(&scalar));
        match (found, member) {
            (true, true) | (false, false) => Some(TypedNode::from_scalar(scalar, node.span())),
            (false, true) => {
                diagnostics.error(
                    node.span(),
                    DiagnosticCode::NotInSet,
                    format!("{} is not one of {}", scalar, scalars_text(values)),
                );
                None
            }
            (true, false) => {
                diagnostics.error(
                    node.span(),
                    DiagnosticCode::ForbiddenValue,
                    format!(
                        "{} is one of the forbidden values {}",
                        scalar,
                        scalars_text(values)
                    ),
                );
                None
            }
        }
    }

    fn match_regexp(
        &mut self,
        pattern: &Pattern,
        node: &MarkedValue,
        diagnostics: &mut Diagnostics,
    ) -> Option<TypedNode> {
        let text = match node {
            MarkedValue::String(text, _) => text,
            _ => {
                let expected = format!("a string matching /{}/", pattern.source());
                self.wrong_type(&expected, node, diagnostics);
                return None;
            }
        };
        match pattern.regex().is_match(text) {
            Ok(true) => Some(TypedNode::new(
                NodeKind::String,
                node.span(),
                TypedValue::String(text.clone()),
            )),
            Ok(false) => {
                diagnostics.error(
                    node.span(),
                    DiagnosticCode::PatternMismatch,
                    format!("`{}` does not match /{}/", text, pattern.source()),
                );
                None
            }
            Err(e) => {
                diagnostics.error(
                    node.span(),
                    DiagnosticCode::PatternMismatch,
                    format!("could not match /{}/ against `{}`: {}", pattern.source(), text, e),
                );
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod matcher_tests;
