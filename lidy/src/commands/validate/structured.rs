use std::io::Write;

use serde::Serialize;

use crate::commands::validate::{DocumentReport, OutputFormatType, Reporter};
use crate::rules::diagnostics::{Diagnostic, DiagnosticCode};
use crate::rules::values::Span;
use crate::rules::{Result, Status};
use crate::utils::writer::Writer;
use crate::utils::LineIndex;

#[derive(Debug, Serialize)]
struct LocatedDiagnostic {
    code: DiagnosticCode,
    message: String,
    line: usize,
    column: usize,
    span: Span,
}

impl LocatedDiagnostic {
    fn new(diagnostic: &Diagnostic, index: &LineIndex) -> Self {
        let (line, column) = index.line_col(diagnostic.span.start);
        LocatedDiagnostic {
            code: diagnostic.code,
            message: diagnostic.message.clone(),
            line,
            column,
            span: diagnostic.span,
        }
    }
}

#[derive(Debug, Serialize)]
struct DocumentRecord {
    document: String,
    grammar: String,
    entry: String,
    status: Status,
    errors: Vec<LocatedDiagnostic>,
    warnings: Vec<LocatedDiagnostic>,
}

/// Collects one record per document and writes them all as a JSON or YAML
/// list once the last document is in.
#[derive(Debug)]
pub(crate) struct StructuredReporter {
    output: OutputFormatType,
    records: Vec<DocumentRecord>,
}

impl StructuredReporter {
    pub(crate) fn new(output: OutputFormatType) -> Self {
        StructuredReporter {
            output,
            records: vec![],
        }
    }
}

impl Reporter for StructuredReporter {
    fn report(&mut self, _writer: &mut Writer, report: &DocumentReport<'_>) -> Result<()> {
        let index = LineIndex::new(report.content);
        let locate = |diagnostics: &[Diagnostic]| -> Vec<LocatedDiagnostic> {
            diagnostics
                .iter()
                .map(|diagnostic| LocatedDiagnostic::new(diagnostic, &index))
                .collect()
        };
        self.records.push(DocumentRecord {
            document: report.document.to_string(),
            grammar: report.grammar.to_string(),
            entry: report.entry.to_string(),
            status: report.validation.status(),
            errors: locate(&report.validation.errors),
            warnings: locate(&report.validation.warnings),
        });
        Ok(())
    }

    fn close(&mut self, writer: &mut Writer) -> Result<()> {
        match self.output {
            OutputFormatType::YAML => serde_yaml::to_writer(&mut *writer, &self.records)?,
            _ => {
                serde_json::to_writer_pretty(&mut *writer, &self.records)?;
                writeln!(writer)?;
            }
        }
        Ok(())
    }
}
