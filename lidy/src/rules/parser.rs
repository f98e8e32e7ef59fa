use std::collections::HashSet;

use fancy_regex::Regex;
use indexmap::IndexMap;
use lazy_static::lazy_static;

use crate::rules::{
    errors::GrammarError,
    exprs::{Atomic, Cardinality},
    values::{MarkedValue, Scalar, Span},
};

lazy_static! {
    static ref RULE_NAME: Regex =
        Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*(\.[a-zA-Z][a-zA-Z0-9_]*)*$")
            .ok()
            .unwrap();
}

pub(crate) const DICT: &str = "_dict";
pub(crate) const DICT_OF: &str = "_dictOf";
pub(crate) const DICT_FACULTATIVE: &str = "_dictFacultative";
pub(crate) const OPTIONAL_KEYS: &str = "_optionalKeys";
pub(crate) const LIST: &str = "_list";
pub(crate) const LIST_OF: &str = "_listOf";
pub(crate) const LIST_FACULTATIVE: &str = "_listFacultative";
pub(crate) const OPTIONAL_POSITIONS: &str = "_optionalPositions";
pub(crate) const ONE_OF: &str = "_oneOf";
pub(crate) const MERGE: &str = "_merge";
pub(crate) const COPY: &str = "_copy";
pub(crate) const IN: &str = "_in";
pub(crate) const NOT_IN: &str = "_notin";
pub(crate) const REGEXP: &str = "_regexp";
pub(crate) const NB: &str = "_nb";
pub(crate) const MIN: &str = "_min";
pub(crate) const MAX: &str = "_max";

/// Grammar document after shape checking, before normalization.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawGrammar {
    pub(crate) rules: IndexMap<String, RawDefinition>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawDefinition {
    pub(crate) name_span: Span,
    /// Name the rule is exported under, from `name:` or `name::export`.
    pub(crate) export: Option<String>,
    pub(crate) body: RawRule,
}

#[derive(Debug, Clone)]
pub(crate) enum RawRule {
    Name(String, Span),
    Form(Box<RawForm>),
}

#[derive(Debug, Clone)]
pub(crate) struct RawEntry {
    pub(crate) key_span: Span,
    pub(crate) rule: RawRule,
}

///
/// The keywords of one rule map, each clause already checked for shape.
/// `merge` and `copy` only exist here; normalization folds them away.
///
#[derive(Debug, Clone, Default)]
pub(crate) struct RawForm {
    pub(crate) span: Span,
    pub(crate) dict: Option<IndexMap<String, RawEntry>>,
    pub(crate) optional_keys: Option<IndexMap<String, RawEntry>>,
    pub(crate) dict_of: Option<Box<(RawRule, RawRule)>>,
    pub(crate) list: Option<Vec<RawRule>>,
    pub(crate) list_facultative: Option<Vec<RawRule>>,
    pub(crate) optional_positions: Option<(Vec<usize>, Span)>,
    pub(crate) list_of: Option<Box<RawRule>>,
    pub(crate) one_of: Option<Vec<RawRule>>,
    pub(crate) merge: Option<Vec<RawRule>>,
    pub(crate) copy: Option<(String, Span)>,
    pub(crate) in_set: Option<Vec<Scalar>>,
    pub(crate) not_in: Option<Vec<Scalar>>,
    pub(crate) regexp: Option<(String, Span)>,
    pub(crate) card: Cardinality,
}

impl RawForm {
    pub(crate) fn has_dict_clauses(&self) -> bool {
        self.dict.is_some() || self.optional_keys.is_some() || self.dict_of.is_some()
    }

    pub(crate) fn has_list_clauses(&self) -> bool {
        self.list.is_some()
            || self.list_facultative.is_some()
            || self.optional_positions.is_some()
            || self.list_of.is_some()
    }

    pub(crate) fn is_sizing_only(&self) -> bool {
        !self.has_dict_clauses()
            && !self.has_list_clauses()
            && self.one_of.is_none()
            && self.merge.is_none()
            && self.copy.is_none()
            && self.in_set.is_none()
            && self.not_in.is_none()
            && self.regexp.is_none()
    }

    /// The rule's own clauses with `_merge` and `_copy` removed.
    pub(crate) fn own_clauses(&self) -> RawForm {
        RawForm {
            merge: None,
            copy: None,
            ..self.clone()
        }
    }

    fn first_card_keyword(&self) -> Option<&'static str> {
        if self.card.nb.is_some() {
            Some(NB)
        } else if self.card.min.is_some() {
            Some(MIN)
        } else if self.card.max.is_some() {
            Some(MAX)
        } else {
            None
        }
    }

    fn check_forms(&self) -> Result<(), GrammarError> {
        let mut forms: Vec<&'static str> = Vec::new();
        if self.has_dict_clauses() {
            forms.push(if self.dict.is_some() {
                DICT
            } else if self.dict_of.is_some() {
                DICT_OF
            } else {
                OPTIONAL_KEYS
            });
        }
        if self.has_list_clauses() {
            forms.push(if self.list.is_some() {
                LIST
            } else if self.list_of.is_some() {
                LIST_OF
            } else {
                OPTIONAL_POSITIONS
            });
        }
        if self.one_of.is_some() {
            forms.push(ONE_OF);
        }
        let scalar_forms: Vec<&'static str> = [
            (self.in_set.is_some(), IN),
            (self.not_in.is_some(), NOT_IN),
            (self.regexp.is_some(), REGEXP),
        ]
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, keyword)| *keyword)
        .collect();

        let conflict = |keyword: &'static str, other: &'static str| -> Result<(), GrammarError> {
            Err(GrammarError::ConflictingForms {
                keyword,
                other,
                span: self.span,
            })
        };

        // A merge distributes over `_oneOf` and reports dict/list mixes itself.
        if self.merge.is_none() && forms.len() > 1 {
            return conflict(forms[1], forms[0]);
        }
        if let Some(scalar) = scalar_forms.first().copied() {
            if let Some(other) = forms.first().copied().or_else(|| scalar_forms.get(1).copied()) {
                return conflict(scalar, other);
            }
            if self.merge.is_some() {
                return conflict(scalar, MERGE);
            }
            if self.copy.is_some() {
                return conflict(scalar, COPY);
            }
            if let Some(card) = self.first_card_keyword() {
                return conflict(card, scalar);
            }
        }
        if self.copy.is_some() && self.has_list_clauses() {
            return conflict(COPY, LIST);
        }
        if self.merge.is_none() && self.one_of.is_some() {
            if let Some(card) = self.first_card_keyword() {
                return conflict(card, ONE_OF);
            }
        }
        Ok(())
    }
}

impl RawRule {
    pub(crate) fn span(&self) -> Span {
        match self {
            RawRule::Name(_, span) => *span,
            RawRule::Form(form) => form.span,
        }
    }
}

pub(crate) fn is_rule_name(name: &str) -> bool {
    RULE_NAME.is_match(name).unwrap_or(false)
}

///
/// Splits a rule declaration into the rule name and the name it is exported
/// under. `animal` is not exported, `animal:` is exported as `animal` and
/// `animal::beast` as `beast`.
///
pub(crate) fn parse_declaration(text: &str) -> Option<(&str, Option<&str>)> {
    let (name, export) = match text.split_once(':') {
        None => (text, None),
        Some((name, "")) => (name, Some(name)),
        Some((name, rest)) => (name, Some(rest.strip_prefix(':')?)),
    };
    let valid = is_rule_name(name) && export.map_or(true, is_rule_name);
    valid.then_some((name, export))
}

///
/// Reads a grammar document: a map from rule names to rule bodies. Rule names
/// are checked here, rule bodies are checked for keyword spelling and clause
/// shape. References between rules are left for normalization.
///
pub(crate) fn parse_grammar(document: &MarkedValue) -> Result<RawGrammar, GrammarError> {
    let entries = match document {
        MarkedValue::Map(entries, _) => entries.as_slice(),
        MarkedValue::Null(_) => &[],
        other => {
            return Err(GrammarError::NotARuleMap {
                found: other.type_info(),
                span: other.span(),
            })
        }
    };

    let mut grammar = RawGrammar::default();
    for (key, body) in entries {
        let declaration = match key {
            MarkedValue::String(declaration, _) => declaration.as_str(),
            other => {
                return Err(GrammarError::InvalidRuleName {
                    name: other.key_text().unwrap_or_else(|| other.type_info().to_string()),
                    span: other.span(),
                })
            }
        };
        let (name, export) = match parse_declaration(declaration) {
            Some((name, export)) => (name.to_string(), export.map(str::to_string)),
            None => {
                return Err(GrammarError::InvalidRuleName {
                    name: declaration.to_string(),
                    span: key.span(),
                })
            }
        };
        if Atomic::from_name(&name).is_some() {
            return Err(GrammarError::ReservedRuleName {
                name,
                span: key.span(),
            });
        }
        if grammar.rules.contains_key(&name) {
            return Err(GrammarError::DuplicateRule {
                name,
                span: key.span(),
            });
        }
        let definition = RawDefinition {
            name_span: key.span(),
            export,
            body: parse_rule(body)?,
        };
        grammar.rules.insert(name, definition);
    }
    Ok(grammar)
}

pub(crate) fn parse_rule(value: &MarkedValue) -> Result<RawRule, GrammarError> {
    match value {
        MarkedValue::String(name, span) => Ok(RawRule::Name(name.clone(), *span)),
        MarkedValue::Null(span) => Ok(RawRule::Name(Atomic::Null.name().to_string(), *span)),
        MarkedValue::Map(entries, span) if entries.is_empty() => Err(GrammarError::MalformedRule {
            found: "empty map",
            span: *span,
        }),
        MarkedValue::Map(entries, span) => {
            Ok(RawRule::Form(Box::new(parse_form(entries, *span)?)))
        }
        other => Err(GrammarError::MalformedRule {
            found: other.type_info(),
            span: other.span(),
        }),
    }
}

fn parse_form(entries: &[(MarkedValue, MarkedValue)], span: Span) -> Result<RawForm, GrammarError> {
    let mut form = RawForm {
        span,
        ..RawForm::default()
    };
    let mut seen: HashSet<&'static str> = HashSet::new();

    for (key, value) in entries {
        let keyword = match key.as_str().and_then(lookup_keyword) {
            Some(keyword) => keyword,
            None => {
                return Err(GrammarError::UnknownKeyword {
                    keyword: key.key_text().unwrap_or_else(|| key.type_info().to_string()),
                    span: key.span(),
                })
            }
        };
        // `_dictFacultative` is another spelling of `_optionalKeys`.
        let slot = if keyword == DICT_FACULTATIVE { OPTIONAL_KEYS } else { keyword };
        if !seen.insert(slot) {
            return Err(GrammarError::DuplicateKeyword {
                keyword: keyword.to_string(),
                span: key.span(),
            });
        }

        match slot {
            DICT => form.dict = Some(parse_keyed_rules(keyword, value)?),
            OPTIONAL_KEYS => form.optional_keys = Some(parse_keyed_rules(keyword, value)?),
            DICT_OF => form.dict_of = Some(Box::new(parse_dict_of(value)?)),
            LIST => form.list = Some(parse_rules(keyword, value)?),
            LIST_FACULTATIVE => form.list_facultative = Some(parse_rules(keyword, value)?),
            OPTIONAL_POSITIONS => form.optional_positions = Some(parse_positions(value)?),
            LIST_OF => form.list_of = Some(Box::new(parse_rule(value)?)),
            ONE_OF => {
                let alternatives = parse_rules(keyword, value)?;
                if alternatives.is_empty() {
                    return Err(malformed(ONE_OF, "at least one alternative", value));
                }
                form.one_of = Some(alternatives)
            }
            MERGE => form.merge = Some(parse_rules(keyword, value)?),
            COPY => match value {
                MarkedValue::String(name, span) => form.copy = Some((name.clone(), *span)),
                _ => return Err(malformed(COPY, "the name of a dict rule", value)),
            },
            IN => form.in_set = Some(parse_scalars(IN, value)?),
            NOT_IN => form.not_in = Some(parse_scalars(NOT_IN, value)?),
            REGEXP => match value {
                MarkedValue::String(pattern, span) => form.regexp = Some((pattern.clone(), *span)),
                _ => return Err(malformed(REGEXP, "a regular expression string", value)),
            },
            NB => form.card.nb = Some(parse_count(NB, value)?),
            MIN => form.card.min = Some(parse_count(MIN, value)?),
            MAX => form.card.max = Some(parse_count(MAX, value)?),
            _ => {
                return Err(GrammarError::UnknownKeyword {
                    keyword: keyword.to_string(),
                    span: key.span(),
                })
            }
        }
    }

    form.check_forms()?;
    Ok(form)
}

fn lookup_keyword(text: &str) -> Option<&'static str> {
    [
        DICT,
        DICT_OF,
        DICT_FACULTATIVE,
        OPTIONAL_KEYS,
        LIST,
        LIST_OF,
        LIST_FACULTATIVE,
        OPTIONAL_POSITIONS,
        ONE_OF,
        MERGE,
        COPY,
        IN,
        NOT_IN,
        REGEXP,
        NB,
        MIN,
        MAX,
    ]
    .iter()
    .find(|keyword| **keyword == text)
    .copied()
}

fn malformed(keyword: &'static str, expected: &'static str, value: &MarkedValue) -> GrammarError {
    GrammarError::MalformedClause {
        keyword,
        expected,
        span: value.span(),
    }
}

fn parse_keyed_rules(
    keyword: &'static str,
    value: &MarkedValue,
) -> Result<IndexMap<String, RawEntry>, GrammarError> {
    let entries = match value {
        MarkedValue::Map(entries, _) => entries,
        _ => return Err(malformed(keyword, "a map of keys to rules", value)),
    };
    let mut rules = IndexMap::with_capacity(entries.len());
    for (key, rule) in entries {
        let name = match key.key_text() {
            Some(name) => name,
            None => return Err(malformed(keyword, "scalar keys", key)),
        };
        if rules.contains_key(&name) {
            return Err(GrammarError::ConflictingKey {
                key: name,
                span: key.span(),
            });
        }
        let entry = RawEntry {
            key_span: key.span(),
            rule: parse_rule(rule)?,
        };
        rules.insert(name, entry);
    }
    Ok(rules)
}

fn parse_dict_of(value: &MarkedValue) -> Result<(RawRule, RawRule), GrammarError> {
    match value {
        MarkedValue::Map(entries, _) if entries.len() == 1 => {
            let (key, rule) = &entries[0];
            Ok((parse_rule(key)?, parse_rule(rule)?))
        }
        _ => Err(malformed(
            DICT_OF,
            "a map with exactly one key rule and its value rule",
            value,
        )),
    }
}

fn parse_rules(keyword: &'static str, value: &MarkedValue) -> Result<Vec<RawRule>, GrammarError> {
    match value {
        MarkedValue::List(items, _) => items.iter().map(parse_rule).collect(),
        _ => Err(malformed(keyword, "a list of rules", value)),
    }
}

fn parse_positions(value: &MarkedValue) -> Result<(Vec<usize>, Span), GrammarError> {
    let expected = "a list of positions starting at 1";
    let items = match value {
        MarkedValue::List(items, _) => items,
        _ => return Err(malformed(OPTIONAL_POSITIONS, expected, value)),
    };
    let mut positions = Vec::with_capacity(items.len());
    for item in items {
        match item {
            MarkedValue::Int(position, _) if *position >= 1 => positions.push(*position as usize),
            _ => return Err(malformed(OPTIONAL_POSITIONS, expected, item)),
        }
    }
    Ok((positions, value.span()))
}

fn parse_scalars(keyword: &'static str, value: &MarkedValue) -> Result<Vec<Scalar>, GrammarError> {
    let items = match value {
        MarkedValue::List(items, _) => items,
        _ => return Err(malformed(keyword, "a list of scalar values", value)),
    };
    items
        .iter()
        .map(|item| {
            item.to_scalar()
                .ok_or_else(|| malformed(keyword, "a list of scalar values", item))
        })
        .collect()
}

fn parse_count(keyword: &'static str, value: &MarkedValue) -> Result<usize, GrammarError> {
    match value {
        MarkedValue::Int(count, _) if *count >= 0 => Ok(*count as usize),
        _ => Err(malformed(keyword, "a non-negative integer", value)),
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod parser_tests;
