use std::io::Write;

use crate::commands::validate::{DocumentReport, Reporter};
use crate::rules::Result;
use crate::utils::writer::Writer;
use crate::utils::LineIndex;

///
/// Human readable output: one `file:line:col: severity[Code]: message` line
/// per diagnostic, errors first, then a status line for the document.
///
#[derive(Debug, Default)]
pub(crate) struct ConsoleReporter {}

impl ConsoleReporter {
    pub(crate) fn new() -> Self {
        ConsoleReporter {}
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, writer: &mut Writer, report: &DocumentReport<'_>) -> Result<()> {
        let index = LineIndex::new(report.content);
        let validation = report.validation;
        for diagnostic in validation.errors.iter().chain(validation.warnings.iter()) {
            writeln!(writer, "{}", diagnostic.render(&index, report.document))?;
        }
        writeln!(writer, "{} Status = {}", report.document, validation.status())?;
        Ok(())
    }
}
