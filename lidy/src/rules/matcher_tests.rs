use indoc::indoc;
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::rules::{
    builders::BuildResult,
    diagnostics::Severity,
    libyaml::loader::Loader,
    normalize::{compile_grammar, CompileOptions},
};

fn grammar(text: &str) -> Grammar {
    compile_grammar(text, &CompileOptions::default()).unwrap()
}

fn check(grammar_text: &str, entry: &str, document: &str) -> Validation {
    let document = Loader::new().load(document).unwrap();
    grammar(grammar_text)
        .validate(entry, &document, &ValidateOptions::default())
        .unwrap()
}

fn codes(diagnostics: &[Diagnostic]) -> Vec<DiagnosticCode> {
    diagnostics.iter().map(|d| d.code).collect()
}

fn text_at<'a>(document: &'a str, span: Span) -> &'a str {
    &document[span.start..span.end]
}

const PERSON: &str = indoc! {r#"
    main:
      _dict:
        a: str
        b: int
    "#};

#[test]
fn exact_dict_is_accepted() {
    let validation = check(PERSON, "main", "a: x\nb: 1\n");
    assert!(validation.is_valid());
    assert_eq!(Status::PASS, validation.status());
    let tree = validation.tree.unwrap();
    assert_eq!("dict", tree.kind());
    assert_eq!(Some("main".to_string()), tree.rule);
    assert_eq!(Some(&TypedValue::String("x".to_string())), tree.get("a").map(|n| &n.value));
    assert_eq!(Some(&TypedValue::Int(1)), tree.get("b").map(|n| &n.value));
}

#[test]
fn unknown_key_is_reported_at_the_key() {
    let document = "a: x\nb: 1\nz: 0\n";
    let validation = check(PERSON, "main", document);
    assert_eq!(vec![DiagnosticCode::UnknownKey], codes(&validation.errors));
    assert_eq!("z", text_at(document, validation.errors[0].span));
    assert!(validation.tree.is_none());
    assert_eq!(Status::FAIL, validation.status());
}

#[test]
fn missing_key_is_reported_on_the_map() {
    let validation = check(PERSON, "main", "a: x\n");
    assert_eq!(vec![DiagnosticCode::MissingKey], codes(&validation.errors));
    assert_eq!(0, validation.errors[0].span.start);
    assert!(validation.errors[0].message.contains("`b`"));
}

#[test]
fn every_problem_of_a_dict_is_reported() {
    let document = "a: 1\nz: 0\n";
    let validation = check(PERSON, "main", document);
    assert_eq!(
        vec![
            DiagnosticCode::MissingKey,
            DiagnosticCode::WrongType,
            DiagnosticCode::UnknownKey,
        ],
        codes(&validation.errors)
    );
    assert_eq!("1", text_at(document, validation.errors[1].span));
}

#[test]
fn optional_keys_may_be_absent() {
    let grammar_text = indoc! {r#"
        main:
          _dict: { a: str }
          _optionalKeys: { b: int }
        "#};
    assert!(check(grammar_text, "main", "a: x\n").is_valid());
    assert!(check(grammar_text, "main", "a: x\nb: 2\n").is_valid());
}

#[test]
fn dict_of_checks_keys_and_values() {
    let grammar_text = "main: { _dictOf: { int: str } }\n";
    let validation = check(grammar_text, "main", "1: one\n2: two\n");
    assert!(validation.is_valid());
    match validation.tree.map(|tree| tree.value) {
        Some(TypedValue::Dict(entries)) => {
            assert_eq!(NodeKind::Int, entries[0].key.kind);
            assert_eq!(NodeKind::String, entries[0].value.kind);
        }
        other => panic!("expected a dict, got {:?}", other),
    }

    let validation = check(grammar_text, "main", "one: 1\n");
    assert_eq!(
        vec![DiagnosticCode::WrongType, DiagnosticCode::WrongType],
        codes(&validation.errors)
    );
}

#[test]
fn duplicate_keys_are_reported_once() {
    let document = "a: 1\na: 2\n";
    let validation = check("main: { _dictOf: { str: int } }\n", "main", document);
    assert_eq!(vec![DiagnosticCode::DuplicateKey], codes(&validation.errors));
    assert_eq!(Span::new(5, 6), validation.errors[0].span);
}

#[test]
fn collection_keys_are_invalid() {
    let document = "? [a]\n: 1\n";
    let validation = check("main: any\n", "main", document);
    assert_eq!(vec![DiagnosticCode::InvalidKey], codes(&validation.errors));
    assert_eq!("[a]", text_at(document, validation.errors[0].span));
}

#[rstest]
#[case("true")]
#[case("3")]
#[case("-2.5")]
#[case("~")]
#[case("hello")]
#[case("[1, [two, 3.5], {k: v}]")]
#[case(indoc! {r#"
    name: lidy
    tags: [a, b]
    nested:
      deep: { x: 1, y: null }
      list:
        - yes
        - 0x10
"#})]
fn any_keeps_the_plain_value(#[case] document: &str) {
    let loaded = Loader::new().load(document).unwrap();
    let validation = grammar("main: any\n")
        .validate("main", &loaded, &ValidateOptions::default())
        .unwrap();
    assert!(validation.is_valid());
    assert_eq!(loaded.to_plain(), validation.tree.unwrap().to_plain());
}

#[test]
fn predefined_entry_rule() {
    let validation = check("", "int", "42\n");
    let tree = validation.tree.unwrap();
    assert_eq!(NodeKind::Int, tree.kind);
    assert_eq!(None, tree.rule);
}

#[test]
fn unknown_entry_rule() {
    let document = Loader::new().load("1").unwrap();
    let result = grammar(PERSON).validate("nowhere", &document, &ValidateOptions::default());
    assert!(matches!(result, Err(Error::MissingEntryRule(ref name)) if name == "nowhere"));
}

#[rstest]
#[case("int", "3", Some(TypedValue::Int(3)))]
#[case("int", "3.0", Some(TypedValue::Int(3)))]
#[case("int", "3.5", None)]
#[case("int", "'3'", None)]
#[case("float", "3", Some(TypedValue::Float(3.0)))]
#[case("float", "0.25", Some(TypedValue::Float(0.25)))]
#[case("string", "abc", Some(TypedValue::String("abc".to_string())))]
#[case("str", "12", None)]
#[case("boolean", "false", Some(TypedValue::Bool(false)))]
#[case("null", "~", Some(TypedValue::Null))]
#[case("null", "''", None)]
#[case("binary", "aGVsbG8=", Some(TypedValue::Binary("aGVsbG8=".to_string())))]
fn predefined_types(#[case] entry: &str, #[case] document: &str, #[case] expected: Option<TypedValue>) {
    let validation = check("", entry, document);
    assert_eq!(expected, validation.tree.map(|tree| tree.value));
}

#[test]
fn yaml_1_1_booleans_warn() {
    let validation = check("", "boolean", "yes");
    assert!(validation.is_valid());
    assert_eq!(Some(TypedValue::Bool(true)), validation.tree.map(|tree| tree.value));
    assert_eq!(vec![DiagnosticCode::DeprecatedBoolean], codes(&validation.warnings));
    assert_eq!(Severity::Warning, validation.warnings[0].severity);
}

#[test]
fn binary_outside_the_alphabet() {
    let validation = check("", "binary", "'not base64!'");
    assert_eq!(vec![DiagnosticCode::PatternMismatch], codes(&validation.errors));
}

#[test]
fn timestamps() {
    let validation = check("", "timestamp", "2001-12-14T21:59:43.10-05:00");
    let tree = validation.tree.unwrap();
    assert_eq!(NodeKind::Timestamp, tree.kind);
    assert_eq!(
        serde_json::json!("2001-12-14T21:59:43.100-05:00"),
        tree.to_plain()
    );

    let validation = check("", "timestamp", "soon");
    assert_eq!(vec![DiagnosticCode::WrongType], codes(&validation.errors));
    let validation = check("", "timestamp", "12");
    assert_eq!(vec![DiagnosticCode::WrongType], codes(&validation.errors));
}

#[test]
fn malformed_tagged_scalars_fail_every_type() {
    let validation = check("", "int", "!!int twelve");
    assert_eq!(vec![DiagnosticCode::WrongType], codes(&validation.errors));
    assert!(validation.errors[0].message.contains("malformed tagged scalar"));
}

#[rstest]
#[case("true", Some(TypedValue::Bool(true)))]
#[case("3", Some(TypedValue::Int(3)))]
#[case("x", None)]
fn first_alternative_wins(#[case] document: &str, #[case] expected: Option<TypedValue>) {
    let validation = check("main: { _oneOf: [boolean, int] }\n", "main", document);
    match expected {
        Some(value) => {
            assert!(validation.errors.is_empty());
            assert_eq!(Some(value), validation.tree.map(|tree| tree.value));
        }
        None => {
            assert_eq!(vec![DiagnosticCode::NoAlternativeMatched], codes(&validation.errors));
            assert_eq!(
                "no alternative matched, expected a boolean | an int",
                validation.errors[0].message
            );
        }
    }
}

#[test]
fn failed_alternatives_leave_no_trace() {
    let grammar_text = indoc! {r#"
        main:
          _oneOf:
            - _dict: { c: int }
            - _dict: { c: boolean }
        "#};
    let validation = check(grammar_text, "main", "c: true\n");
    assert!(validation.errors.is_empty());
    assert!(validation.warnings.is_empty());
    assert_eq!(
        Some(&TypedValue::Bool(true)),
        validation.tree.as_ref().and_then(|tree| tree.get("c")).map(|c| &c.value)
    );
}

#[test]
fn warnings_of_failed_alternatives_are_dropped() {
    let grammar_text = indoc! {r#"
        main:
          _oneOf:
            - _list: [boolean, int]
            - _list: [str, str]
        "#};
    let validation = check(grammar_text, "main", "[yes, no]");
    assert!(validation.is_valid());
    assert!(validation.warnings.is_empty());
    assert_eq!(
        serde_json::json!(["yes", "no"]),
        validation.tree.unwrap().to_plain()
    );
}

#[rstest]
#[case("{ _listOf: int, _min: 2 }", "[1]", false)]
#[case("{ _listOf: int, _min: 2 }", "[1, 2]", true)]
#[case("{ _listOf: int, _min: 1 }", "[1]", true)]
#[case("{ _listOf: int, _max: 2 }", "[1, 2, 3]", false)]
#[case("{ _listOf: int, _max: 3 }", "[1, 2, 3]", true)]
#[case("{ _listOf: int, _nb: 2 }", "[1, 2]", true)]
#[case("{ _listOf: int, _nb: 2 }", "[1, 2, 3]", false)]
#[case("{ _dictOf: { str: int }, _max: 1 }", "{a: 1, b: 2}", false)]
#[case("{ _dictOf: { str: int }, _max: 2 }", "{a: 1, b: 2}", true)]
#[case("{ _dict: { a: int }, _optionalKeys: { b: int }, _min: 2 }", "{a: 1}", false)]
fn cardinality_bounds(#[case] rule: &str, #[case] document: &str, #[case] valid: bool) {
    let validation = check(&format!("main: {}\n", rule), "main", document);
    assert_eq!(valid, validation.is_valid());
    if !valid {
        assert_eq!(vec![DiagnosticCode::Cardinality], codes(&validation.errors));
    }
}

#[test]
fn list_of_needs_an_item_unless_allowed() {
    let validation = check("main: { _listOf: int }\n", "main", "[]");
    assert_eq!(vec![DiagnosticCode::EmptyListOf], codes(&validation.errors));
    assert!(check("main: { _listOf: int, _min: 0 }\n", "main", "[]").is_valid());
    assert!(check("main: { _listOf: int, _nb: 0 }\n", "main", "[]").is_valid());
    let grammar_text = "main: { _list: [str], _listOf: int, _optionalPositions: [2] }\n";
    assert!(check(grammar_text, "main", "[a]").is_valid());
    assert!(check(grammar_text, "main", "[a, 1, 2]").is_valid());
}

#[test]
fn positional_items() {
    let grammar_text = "main: { _list: [str, int] }\n";
    let validation = check(grammar_text, "main", "[a, 1]");
    let tree = validation.tree.unwrap();
    let kinds: Vec<&str> = tree.items().unwrap().iter().map(TypedNode::kind).collect();
    assert_eq!(vec!["string", "int"], kinds);

    let validation = check(grammar_text, "main", "[a]");
    assert_eq!(vec![DiagnosticCode::MissingElement], codes(&validation.errors));

    let document = "[a, 1, 2]";
    let validation = check(grammar_text, "main", document);
    assert_eq!(vec![DiagnosticCode::TooManyElements], codes(&validation.errors));
    assert_eq!("2", text_at(document, validation.errors[0].span));
}

#[rstest]
#[case("[a, b]", None)]
#[case("[a, 1, b]", None)]
#[case("[a]", Some(DiagnosticCode::MissingElement))]
#[case("[a, 1]", Some(DiagnosticCode::WrongType))]
fn optional_positions_backtrack(#[case] document: &str, #[case] expected: Option<DiagnosticCode>) {
    let grammar_text = indoc! {r#"
        main:
          _list: [str, int, str]
          _optionalPositions: [2]
        "#};
    let validation = check(grammar_text, "main", document);
    assert_eq!(expected.into_iter().collect::<Vec<_>>(), codes(&validation.errors));
}

#[test]
fn facultative_positions() {
    let grammar_text = "main: { _list: [str], _listFacultative: [int, bool] }\n";
    assert!(check(grammar_text, "main", "[a]").is_valid());
    assert!(check(grammar_text, "main", "[a, 1]").is_valid());
    assert!(check(grammar_text, "main", "[a, 1, true]").is_valid());
    assert!(check(grammar_text, "main", "[a, true]").is_valid());
    assert!(!check(grammar_text, "main", "[a, x]").is_valid());
}

#[rstest]
#[case("{ _in: [red, green, 3] }", "green", None)]
#[case("{ _in: [red, green, 3] }", "3.0", None)]
#[case("{ _in: [red, green, 3] }", "blue", Some(DiagnosticCode::NotInSet))]
#[case("{ _in: [red, green, 3] }", "[red]", Some(DiagnosticCode::WrongType))]
#[case("{ _notin: [admin, root] }", "guest", None)]
#[case("{ _notin: [admin, root] }", "root", Some(DiagnosticCode::ForbiddenValue))]
#[case("{ _in: [.nan, 1.5] }", ".nan", None)]
#[case("{ _in: [.nan, 1.5] }", "1.5", None)]
#[case("{ _in: [.nan, 1.5] }", ".inf", Some(DiagnosticCode::NotInSet))]
#[case("{ _notin: [.nan] }", ".NaN", Some(DiagnosticCode::ForbiddenValue))]
#[case("{ _notin: [.nan] }", "0.5", None)]
#[case("{ _regexp: '^[a-z]+$' }", "abc", None)]
#[case("{ _regexp: 'b' }", "abc", None)]
#[case("{ _regexp: '^[a-z]+$' }", "ABC", Some(DiagnosticCode::PatternMismatch))]
#[case("{ _regexp: '^[0-9]+$' }", "12", Some(DiagnosticCode::WrongType))]
#[case("{ _regexp: '^(\\w)\\1$' }", "aa", None)]
fn scalar_constraints(#[case] rule: &str, #[case] document: &str, #[case] expected: Option<DiagnosticCode>) {
    let validation = check(&format!("main: {}\n", rule), "main", document);
    assert_eq!(expected.into_iter().collect::<Vec<_>>(), codes(&validation.errors));
}

#[test]
fn innermost_rule_names_the_node() {
    let grammar_text = indoc! {r#"
        outer: inner
        inner: { _dict: { a: int } }
        "#};
    let validation = check(grammar_text, "outer", "a: 1\n");
    assert_eq!(Some("inner".to_string()), validation.tree.unwrap().rule);
}

#[test]
fn recursive_grammar_on_nested_data() {
    let grammar_text = indoc! {r#"
        tree:
          _dict: { value: int }
          _optionalKeys: { children: { _listOf: tree } }
        "#};
    let document = indoc! {r#"
        value: 1
        children:
          - value: 2
          - value: 3
            children:
              - value: x
        "#};
    let validation = check(grammar_text, "tree", document);
    assert_eq!(vec![DiagnosticCode::WrongType], codes(&validation.errors));
    assert_eq!("x", text_at(document, validation.errors[0].span));
}

#[test]
fn nesting_limit() {
    let document = "[[[[]]]]";
    let loaded = Loader::new().load(document).unwrap();
    let options = ValidateOptions { max_depth: 7 };
    let validation = grammar("nest: { _listOf: nest, _min: 0 }\n")
        .validate("nest", &loaded, &options)
        .unwrap();
    assert_eq!(vec![DiagnosticCode::RecursionLimit], codes(&validation.errors));
    assert_eq!(Span::new(3, 5), validation.errors[0].span);

    let validation = grammar("nest: { _listOf: nest, _min: 0 }\n")
        .validate("nest", &loaded, &ValidateOptions::default())
        .unwrap();
    assert!(validation.is_valid());
}

#[rstest]
#[case::list_of_any("main: any\n", "[", "]")]
#[case::map_of_any("main: any\n", "{a: ", "}")]
#[case::recursive_rule("main: { _listOf: main, _min: 0 }\n", "[", "]")]
#[case::dict_of("main: { _dictOf: { str: main }, _min: 0 }\n", "{a: ", "}")]
fn deep_documents_hit_the_limit(
    #[case] grammar_text: &str,
    #[case] open: &str,
    #[case] close: &str,
) {
    let document = format!("{}{}", open.repeat(900), close.repeat(900));
    let loaded = Loader::new().load(&document).unwrap();
    let validation = grammar(grammar_text)
        .validate("main", &loaded, &ValidateOptions::default())
        .unwrap();
    assert_eq!(vec![DiagnosticCode::RecursionLimit], codes(&validation.errors));
    assert!(validation.tree.is_none());
}

#[test]
fn bypassed_rules_accept_anything() {
    let options = CompileOptions {
        bypass_missing_rule: true,
    };
    let compiled = compile_grammar("main: { _dict: { a: later } }\n", &options).unwrap();
    let document = Loader::new().load("a: [1, {b: c}]\n").unwrap();
    let validation = compiled
        .validate("main", &document, &ValidateOptions::default())
        .unwrap();
    assert!(validation.is_valid());
}

#[test]
fn merged_grammars_match_alike() {
    let grammar_text = indoc! {r#"
        a: { _dict: { x: int } }
        b: { _dict: { y: str } }
        c: { _optionalKeys: { z: bool } }
        ab: { _merge: [a, b] }
        bc: { _merge: [b, c] }
        left: { _merge: [ab, c] }
        right: { _merge: [a, bc] }
        "#};
    let compiled = grammar(grammar_text);
    for document in ["x: 1\ny: s\n", "x: 1\ny: s\nz: true\n", "x: 1\n", "x: 1\ny: s\nw: 0\n"] {
        let loaded = Loader::new().load(document).unwrap();
        let left = compiled
            .validate("left", &loaded, &ValidateOptions::default())
            .unwrap();
        let right = compiled
            .validate("right", &loaded, &ValidateOptions::default())
            .unwrap();
        assert_eq!(codes(&left.errors), codes(&right.errors));
        assert_eq!(
            left.tree.map(|tree| tree.to_plain()),
            right.tree.map(|tree| tree.to_plain())
        );
    }
}

#[test]
fn distributed_merge_picks_the_matching_shape() {
    let grammar_text = indoc! {r#"
        shape:
          _oneOf:
            - _dict: { radius: float }
            - _dict: { side: float }
        named:
          _merge: [shape]
          _dict: { name: str }
        "#};
    assert!(check(grammar_text, "named", "name: a\nside: 2\n").is_valid());
    assert!(check(grammar_text, "named", "name: a\nradius: 1.5\n").is_valid());
    let validation = check(grammar_text, "named", "name: a\n");
    assert_eq!(vec![DiagnosticCode::NoAlternativeMatched], codes(&validation.errors));
}

fn initial(node: TypedNode) -> BuildResult {
    match node.value {
        TypedValue::String(s) => Ok(TypedNode::new(
            NodeKind::String,
            node.span,
            TypedValue::String(s.chars().take(1).collect()),
        )),
        other => Err(format!("cannot shorten {:?}", other)),
    }
}

fn check_built(grammar_text: &str, document: &str, builders: &Builders) -> Validation {
    let document = Loader::new().load(document).unwrap();
    grammar(grammar_text)
        .validate_with("main", &document, &ValidateOptions::default(), builders)
        .unwrap()
}

#[test]
fn builders_replace_exported_nodes() {
    let grammar_text = indoc! {r#"
        main: { _dict: { name: animal, kind: cat, tag: tag } }
        animal:: str
        cat::pet: str
        tag: str
        "#};
    let builders = Builders::new()
        .with("animal", initial)
        .with("cat", initial)
        .with("pet", |node| initial(node).map(|n| TypedNode { rule: Some("pet".to_string()), ..n }))
        .with("tag", initial);
    let validation = check_built(grammar_text, "name: Jaguar\nkind: Cat\ntag: Wild\n", &builders);
    assert!(validation.is_valid());
    let tree = validation.tree.unwrap();

    let name = tree.get("name").unwrap();
    assert_eq!(TypedValue::String("J".to_string()), name.value);
    assert_eq!(Some("animal".to_string()), name.rule);

    let kind = tree.get("kind").unwrap();
    assert_eq!(TypedValue::String("C".to_string()), kind.value);
    assert_eq!(Some("pet".to_string()), kind.rule);

    // `tag` is not exported, its builder never runs
    assert_eq!(Some(&TypedValue::String("Wild".to_string())), tree.get("tag").map(|n| &n.value));
}

#[test]
fn exported_rules_without_builder_are_unchanged() {
    let validation = check("main:: str\n", "main", "Jaguar\n");
    assert!(validation.is_valid());
    assert_eq!(
        Some(TypedValue::String("Jaguar".to_string())),
        validation.tree.map(|tree| tree.value)
    );
}

#[test]
fn builder_errors_are_reported_at_the_node() {
    let grammar_text = indoc! {r#"
        main: { _listOf: animal }
        animal:: any
        "#};
    let builders = Builders::new().with("animal", initial);
    let document = "[Jaguar, 12]\n";
    let validation = check_built(grammar_text, document, &builders);
    assert_eq!(vec![DiagnosticCode::BuilderFailed], codes(&validation.errors));
    assert_eq!("12", text_at(document, validation.errors[0].span));
    assert!(validation.errors[0].message.contains("cannot shorten"));
    assert!(validation.tree.is_none());
}

#[test]
fn failed_builders_let_other_alternatives_match() {
    let grammar_text = indoc! {r#"
        main: { _oneOf: [strict, str] }
        strict:: str
        "#};
    let builders = Builders::new().with("strict", |_| Err("rejected".to_string()));
    let validation = check_built(grammar_text, "Jaguar\n", &builders);
    assert!(validation.is_valid());
    assert!(validation.warnings.is_empty());
    let tree = validation.tree.unwrap();
    assert_eq!(TypedValue::String("Jaguar".to_string()), tree.value);
    assert_eq!(Some("main".to_string()), tree.rule);
}

#[test]
fn keys_of_different_types_are_distinct() {
    let document = "1: a\n\"1\": b\n1.5: c\n\"1.5\": d\n";
    let validation = check("main: any\n", "main", document);
    assert!(validation.is_valid());
    let tree = validation.tree.unwrap();
    let kinds: Vec<NodeKind> = tree.entries().unwrap().iter().map(|e| e.key.kind).collect();
    assert_eq!(
        vec![NodeKind::Int, NodeKind::String, NodeKind::Float, NodeKind::String],
        kinds
    );
    assert_eq!(Some(&TypedValue::String("a".to_string())), tree.get("1").map(|n| &n.value));

    let validation = check("main: any\n", "main", "a: 1\nb: 2\na: 3\n");
    assert_eq!(vec![DiagnosticCode::DuplicateKey], codes(&validation.errors));
}

#[test]
fn literal_keys_are_claimed_once() {
    let document = "1: 2\n\"1\": 3\n";
    let validation = check("main: { _dict: { \"1\": int } }\n", "main", document);
    assert_eq!(vec![DiagnosticCode::DuplicateKey], codes(&validation.errors));
    assert_eq!("\"1\"", text_at(document, validation.errors[0].span));
}
