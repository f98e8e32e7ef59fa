use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, trace, warn};

use crate::rules::{
    errors::GrammarError,
    exprs::{Atomic, Cardinality, DictRule, Grammar, KeyValueRule, ListRule, Pattern, Rule},
    libyaml::loader::Loader,
    parser::{parse_grammar, RawForm, RawGrammar, RawRule, DICT_OF, LIST_OF, ONE_OF},
    values::{MarkedValue, Span},
    Result,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Accept references to rules that are not declared, matching any value in
    /// their place.
    pub bypass_missing_rule: bool,
}

/// Loads grammar text and compiles it.
pub fn compile_grammar(text: &str, options: &CompileOptions) -> Result<Grammar> {
    let document = Loader::new().load(text)?;
    compile_document(&document, options)
}

///
/// Compiles an already loaded grammar document into canonical rules. Stops at
/// the first grammar error.
///
pub fn compile_document(document: &MarkedValue, options: &CompileOptions) -> Result<Grammar> {
    let raw = parse_grammar(document)?;
    let mut normalizer = Normalizer::new(&raw, options);
    let mut rules = IndexMap::with_capacity(raw.rules.len());
    for name in raw.rules.keys() {
        let rule = normalizer.normalize_definition(name)?;
        trace!("rule `{}` normalized to {:?}", name, rule);
        rules.insert(name.clone(), rule);
    }
    check_alias_cycles(&rules, &raw)?;
    let exports: IndexMap<String, String> = raw
        .rules
        .iter()
        .filter_map(|(name, definition)| {
            definition
                .export
                .as_ref()
                .map(|export| (name.clone(), export.clone()))
        })
        .collect();
    debug!(
        "compiled grammar with {} rules, {} exported",
        rules.len(),
        exports.len()
    );
    Ok(Grammar::new(rules, exports))
}

/// One operand of a `_merge` once normalized.
#[derive(Debug, Clone)]
enum Part {
    Rule(Rule, Span),
    Sizing(Cardinality, Span),
}

impl Part {
    fn is_one_of(&self) -> bool {
        matches!(self, Part::Rule(Rule::OneOf(_), _))
    }
}

///
/// Folds raw forms into canonical rules. Names stay lazy references except
/// where they are `_copy` or `_merge` operands, which are expanded in place.
/// `expanding` holds the chain of names currently being expanded so that a
/// rule composing itself is reported instead of looping.
///
struct Normalizer<'g> {
    raw: &'g RawGrammar,
    options: &'g CompileOptions,
    expanding: Vec<String>,
}

impl<'g> Normalizer<'g> {
    fn new(raw: &'g RawGrammar, options: &'g CompileOptions) -> Normalizer<'g> {
        Normalizer {
            raw,
            options,
            expanding: Vec::new(),
        }
    }

    fn normalize_definition(&mut self, name: &str) -> std::result::Result<Rule, GrammarError> {
        let raw = self.raw;
        let definition = match raw.rules.get(name) {
            Some(definition) => definition,
            None => {
                return Err(GrammarError::DanglingReference {
                    name: name.to_string(),
                    span: Span::default(),
                })
            }
        };
        self.expanding.clear();
        self.expanding.push(name.to_string());
        let rule = self.normalize(&definition.body);
        self.expanding.pop();
        rule
    }

    fn normalize(&mut self, raw: &RawRule) -> std::result::Result<Rule, GrammarError> {
        match raw {
            RawRule::Name(name, span) => self.resolve_name(name, *span),
            RawRule::Form(form) => self.normalize_form(form),
        }
    }

    fn resolve_name(&self, name: &str, span: Span) -> std::result::Result<Rule, GrammarError> {
        if let Some(atomic) = Atomic::from_name(name) {
            return Ok(Rule::Atomic(atomic));
        }
        if self.raw.rules.contains_key(name) {
            return Ok(Rule::Ref(name.to_string()));
        }
        if self.options.bypass_missing_rule {
            warn!("no rule named `{}`, any value is accepted in its place", name);
            return Ok(Rule::Atomic(Atomic::Any));
        }
        Err(GrammarError::DanglingReference {
            name: name.to_string(),
            span,
        })
    }

    fn normalize_form(&mut self, form: &RawForm) -> std::result::Result<Rule, GrammarError> {
        if form.merge.is_some() || form.copy.is_some() {
            return self.flatten_merge(form);
        }
        if let Some(alternatives) = &form.one_of {
            return self.flatten_one_of(alternatives);
        }
        if let Some(values) = &form.in_set {
            return Ok(Rule::In(values.clone()));
        }
        if let Some(values) = &form.not_in {
            return Ok(Rule::NotIn(values.clone()));
        }
        if let Some((source, span)) = &form.regexp {
            return Pattern::new(source, *span).map(Rule::Regexp);
        }
        if form.has_dict_clauses() {
            return self.build_dict(form).map(Rule::Dict);
        }
        if form.has_list_clauses() {
            return self.build_list(form).map(Rule::List);
        }
        Err(GrammarError::MissingForm { span: form.span })
    }

    fn build_dict(&mut self, form: &RawForm) -> std::result::Result<DictRule, GrammarError> {
        let mut dict = DictRule {
            card: form.card.validated(form.span)?,
            ..DictRule::default()
        };
        for (key, entry) in form.dict.iter().flatten() {
            dict.required.insert(key.clone(), self.normalize(&entry.rule)?);
        }
        for (key, entry) in form.optional_keys.iter().flatten() {
            if dict.required.contains_key(key) {
                return Err(GrammarError::ConflictingKey {
                    key: key.clone(),
                    span: entry.key_span,
                });
            }
            dict.optional.insert(key.clone(), self.normalize(&entry.rule)?);
        }
        if let Some(dict_of) = &form.dict_of {
            let (key, value) = &**dict_of;
            dict.of = Some(Box::new(KeyValueRule {
                key: self.normalize(key)?,
                value: self.normalize(value)?,
            }));
        }
        Ok(dict)
    }

    fn build_list(&mut self, form: &RawForm) -> std::result::Result<ListRule, GrammarError> {
        let mut list = ListRule {
            card: form.card.validated(form.span)?,
            ..ListRule::default()
        };
        for rule in form.list.iter().flatten() {
            list.positional.push(self.normalize(rule)?);
        }
        for rule in form.list_facultative.iter().flatten() {
            list.optional_positions.insert(list.positional.len());
            list.positional.push(self.normalize(rule)?);
        }
        if let Some((positions, span)) = &form.optional_positions {
            for position in positions {
                let index = position - 1;
                if index < list.positional.len() {
                    list.optional_positions.insert(index);
                } else if index == list.positional.len() {
                    list.allow_empty_of = true;
                } else {
                    return Err(GrammarError::PositionOutOfRange {
                        position: *position,
                        len: list.positional.len(),
                        span: *span,
                    });
                }
            }
        }
        if let Some(of) = &form.list_of {
            list.of = Some(Box::new(self.normalize(of)?));
        }
        Ok(list)
    }

    fn flatten_one_of(&mut self, alternatives: &[RawRule]) -> std::result::Result<Rule, GrammarError> {
        let mut flat = Vec::with_capacity(alternatives.len());
        for alternative in alternatives {
            match self.normalize(alternative)? {
                Rule::OneOf(nested) => flat.extend(nested),
                rule => flat.push(rule),
            }
        }
        Ok(Rule::OneOf(flat))
    }

    ///
    /// `_copy` and `_merge`. The copied rule comes first, then every merge
    /// operand in order, then the rule's own clauses as one last part.
    ///
    fn flatten_merge(&mut self, form: &RawForm) -> std::result::Result<Rule, GrammarError> {
        let mut parts = Vec::new();
        if let Some((name, span)) = &form.copy {
            parts.push(self.resolve_copy(name, *span, !form.card.is_unbounded())?);
        }
        for operand in form.merge.iter().flatten() {
            parts.push(self.merge_operand(operand)?);
        }
        let mut own = form.own_clauses();
        if let Some(alternatives) = own.one_of.take() {
            parts.push(Part::Rule(self.flatten_one_of(&alternatives)?, own.span));
        }
        if own.is_sizing_only() {
            if !own.card.is_unbounded() {
                parts.push(Part::Sizing(own.card.validated(own.span)?, own.span));
            }
        } else {
            parts.push(Part::Rule(self.normalize_form(&own)?, own.span));
        }
        self.combine(parts, form.span)
    }

    /// The dict rule named by `_copy`. Its bounds are dropped when the copying
    /// rule declares its own.
    fn resolve_copy(
        &mut self,
        name: &str,
        span: Span,
        own_bounds: bool,
    ) -> std::result::Result<Part, GrammarError> {
        match self.expand_named(name, span)? {
            Rule::Dict(mut dict) => {
                if own_bounds {
                    dict.card = Cardinality::default();
                }
                Ok(Part::Rule(Rule::Dict(dict), span))
            }
            _ => Err(GrammarError::InvalidCopyTarget {
                name: name.to_string(),
                span,
            }),
        }
    }

    fn merge_operand(&mut self, operand: &RawRule) -> std::result::Result<Part, GrammarError> {
        match operand {
            RawRule::Name(name, span) => {
                if let Some(atomic) = Atomic::from_name(name) {
                    return Err(GrammarError::NotMergeable {
                        what: format!("the predefined type `{}`", atomic),
                        span: *span,
                    });
                }
                Ok(Part::Rule(self.expand_named(name, *span)?, *span))
            }
            RawRule::Form(form) if form.is_sizing_only() => {
                Ok(Part::Sizing(form.card.validated(form.span)?, form.span))
            }
            RawRule::Form(form) => Ok(Part::Rule(self.normalize_form(form)?, operand.span())),
        }
    }

    /// The canonical body of a named rule, following plain aliases.
    fn expand_named(&mut self, name: &str, span: Span) -> std::result::Result<Rule, GrammarError> {
        let raw = self.raw;
        let definition = match raw.rules.get(name) {
            Some(definition) => definition,
            None => {
                return Err(GrammarError::DanglingReference {
                    name: name.to_string(),
                    span,
                })
            }
        };
        if self.expanding.iter().any(|expanding| expanding == name) {
            return Err(GrammarError::CyclicComposition {
                name: name.to_string(),
                span,
            });
        }

        self.expanding.push(name.to_string());
        let expanded = match self.normalize(&definition.body) {
            Ok(Rule::Ref(target)) => self.expand_named(&target, span),
            other => other,
        };
        self.expanding.pop();
        expanded
    }

    ///
    /// Combines merge parts into one rule. A `_oneOf` part is distributed
    /// first: the merge is redone once per alternative and the results become
    /// the alternatives of the outcome.
    ///
    fn combine(&mut self, parts: Vec<Part>, span: Span) -> std::result::Result<Rule, GrammarError> {
        let mut resolved = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Part::Rule(Rule::Ref(name), part_span) => {
                    resolved.push(Part::Rule(self.expand_named(&name, part_span)?, part_span))
                }
                other => resolved.push(other),
            }
        }

        if let Some(index) = resolved.iter().position(Part::is_one_of) {
            if let Part::Rule(Rule::OneOf(alternatives), one_of_span) = resolved.remove(index) {
                if alternatives.is_empty() {
                    return Err(GrammarError::MalformedClause {
                        keyword: ONE_OF,
                        expected: "at least one alternative",
                        span: one_of_span,
                    });
                }
                let mut distributed = Vec::with_capacity(alternatives.len());
                for alternative in alternatives {
                    let mut variant = resolved.clone();
                    variant.insert(index, Part::Rule(alternative, one_of_span));
                    match self.combine(variant, span)? {
                        Rule::OneOf(nested) => distributed.extend(nested),
                        rule => distributed.push(rule),
                    }
                }
                return Ok(Rule::OneOf(distributed));
            }
        }

        let mut dict: Option<DictRule> = None;
        let mut list: Option<ListRule> = None;
        let mut card = Cardinality::default();
        for part in resolved {
            match part {
                Part::Sizing(bounds, part_span) => card = card.tighten(bounds, part_span)?,
                Part::Rule(Rule::Dict(other), part_span) => {
                    if list.is_some() {
                        return Err(GrammarError::MixedMerge { span: part_span });
                    }
                    dict = Some(match dict {
                        Some(acc) => merge_dicts(acc, other, part_span)?,
                        None => other,
                    });
                }
                Part::Rule(Rule::List(other), part_span) => {
                    if dict.is_some() {
                        return Err(GrammarError::MixedMerge { span: part_span });
                    }
                    list = Some(match list {
                        Some(acc) => merge_lists(acc, other, part_span)?,
                        None => other,
                    });
                }
                Part::Rule(other, part_span) => {
                    return Err(GrammarError::NotMergeable {
                        what: other.describe(),
                        span: part_span,
                    })
                }
            }
        }

        match (dict, list) {
            (Some(mut dict), None) => {
                dict.card = dict.card.tighten(card, span)?;
                Ok(Rule::Dict(dict))
            }
            (None, Some(mut list)) => {
                list.card = list.card.tighten(card, span)?;
                Ok(Rule::List(list))
            }
            (None, None) => Err(GrammarError::MissingForm { span }),
            (Some(_), Some(_)) => Err(GrammarError::MixedMerge { span }),
        }
    }
}

fn merge_dicts(
    mut acc: DictRule,
    other: DictRule,
    span: Span,
) -> std::result::Result<DictRule, GrammarError> {
    for (key, rule) in other.required {
        if acc.clause(&key).is_some() {
            return Err(GrammarError::ConflictingKey { key, span });
        }
        acc.required.insert(key, rule);
    }
    for (key, rule) in other.optional {
        if acc.clause(&key).is_some() {
            return Err(GrammarError::ConflictingKey { key, span });
        }
        acc.optional.insert(key, rule);
    }
    if let Some(of) = other.of {
        if acc.of.is_some() {
            return Err(GrammarError::DuplicateClause {
                keyword: DICT_OF,
                span,
            });
        }
        acc.of = Some(of);
    }
    acc.card = acc.card.tighten(other.card, span)?;
    Ok(acc)
}

fn merge_lists(
    mut acc: ListRule,
    other: ListRule,
    span: Span,
) -> std::result::Result<ListRule, GrammarError> {
    let offset = acc.positional.len();
    acc.positional.extend(other.positional);
    acc.optional_positions
        .extend(other.optional_positions.iter().map(|position| position + offset));
    if let Some(of) = other.of {
        if acc.of.is_some() {
            return Err(GrammarError::DuplicateClause {
                keyword: LIST_OF,
                span,
            });
        }
        acc.of = Some(of);
    }
    acc.allow_empty_of |= other.allow_empty_of;
    acc.card = acc.card.tighten(other.card, span)?;
    Ok(acc)
}

/// Rejects rules that only alias each other in a loop, `a: b` with `b: a`.
fn check_alias_cycles(
    rules: &IndexMap<String, Rule>,
    raw: &RawGrammar,
) -> std::result::Result<(), GrammarError> {
    for start in rules.keys() {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut current = start.as_str();
        while let Some(Rule::Ref(target)) = rules.get(current) {
            if !visited.insert(current) {
                return Err(GrammarError::CyclicReference {
                    name: start.clone(),
                    span: raw
                        .rules
                        .get(start.as_str())
                        .map_or_else(Span::default, |definition| definition.name_span),
                });
            }
            current = target.as_str();
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod normalize_tests;
