use super::*;
use pretty_assertions::assert_eq;

#[test]
fn rollback_truncates_both_lists() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.error(Span::new(0, 1), DiagnosticCode::WrongType, "kept");
    let checkpoint = diagnostics.checkpoint();

    diagnostics.error(Span::new(2, 3), DiagnosticCode::MissingKey, "dropped");
    diagnostics.warning(Span::new(2, 3), DiagnosticCode::DeprecatedBoolean, "dropped");
    assert!(diagnostics.has_errors_since(checkpoint));

    diagnostics.rollback(checkpoint);
    assert_eq!(1, diagnostics.errors().len());
    assert_eq!("kept", diagnostics.errors()[0].message);
    assert!(diagnostics.warnings().is_empty());
    assert!(!diagnostics.has_errors_since(checkpoint));
}

#[test]
fn nested_checkpoints_compose() {
    let mut diagnostics = Diagnostics::new();
    let outer = diagnostics.checkpoint();
    diagnostics.warning(Span::default(), DiagnosticCode::DeprecatedBoolean, "outer attempt");

    let inner = diagnostics.checkpoint();
    diagnostics.error(Span::default(), DiagnosticCode::WrongType, "inner attempt");
    diagnostics.rollback(inner);

    assert_eq!(1, diagnostics.warnings().len());
    assert!(diagnostics.is_clean());

    diagnostics.error(Span::default(), DiagnosticCode::WrongType, "second inner attempt");
    diagnostics.rollback(outer);
    assert_eq!(Diagnostics::new(), diagnostics);
}

#[test]
fn render_uses_one_based_positions() {
    colored::control::set_override(false);
    let text = "a: 1\nb: x\n";
    let index = LineIndex::new(text);
    let diagnostic = Diagnostic {
        severity: Severity::Error,
        code: DiagnosticCode::WrongType,
        message: "expected an int but found a string".to_string(),
        span: Span::new(8, 9),
    };
    assert_eq!(
        "doc.yaml:2:4: error[WrongType]: expected an int but found a string",
        diagnostic.render(&index, "doc.yaml")
    );
}
