use std::fmt::Debug;
use std::path::Path;

use clap::{value_parser, Arg, ArgAction, ArgMatches};
use colored::*;
use log::debug;

use crate::command::Command;
use crate::commands::files::{alphabetical, get_files_with_filter, has_a_supported_extension, read_path};
use crate::commands::validate::console_reporter::ConsoleReporter;
use crate::commands::validate::structured::StructuredReporter;
use crate::commands::{
    BYPASS_MISSING_RULE, DEFAULT_ENTRY_RULE, DOCUMENT, DOCUMENT_FILE_SUPPORTED_EXTENSIONS, ENTRY,
    ERROR_STATUS_CODE, FAILURE_STATUS_CODE, GRAMMAR, MAX_DEPTH, OUTPUT_FORMAT,
    SUCCESS_STATUS_CODE, VALIDATE, VERBOSE,
};
use crate::rules::errors::Error;
use crate::rules::exprs::{Atomic, Grammar};
use crate::rules::libyaml::loader::Loader;
use crate::rules::matcher::{ValidateOptions, Validation, DEFAULT_MAX_DEPTH};
use crate::rules::normalize::{compile_grammar, CompileOptions};
use crate::rules::Result;
use crate::utils::reader::Reader;
use crate::utils::writer::Writer;
use crate::utils::LineIndex;

pub(crate) mod console_reporter;
pub(crate) mod structured;

#[derive(Copy, Eq, Clone, Debug, PartialEq)]
pub(crate) enum OutputFormatType {
    SingleLineSummary,
    JSON,
    YAML,
}

impl OutputFormatType {
    fn from_arg(arg: &str) -> Result<OutputFormatType> {
        match arg {
            "single-line-summary" => Ok(OutputFormatType::SingleLineSummary),
            "json" => Ok(OutputFormatType::JSON),
            "yaml" => Ok(OutputFormatType::YAML),
            other => Err(Error::IllegalArguments(format!(
                "unknown output format `{}`",
                other
            ))),
        }
    }
}

/// One validated document as handed to a [`Reporter`].
pub(crate) struct DocumentReport<'report> {
    pub(crate) document: &'report str,
    pub(crate) grammar: &'report str,
    pub(crate) entry: &'report str,
    pub(crate) content: &'report str,
    pub(crate) validation: &'report Validation,
}

pub(crate) trait Reporter: Debug {
    fn report(&mut self, writer: &mut Writer, report: &DocumentReport<'_>) -> Result<()>;

    /// Called once after the last document.
    fn close(&mut self, _writer: &mut Writer) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Validate {}

#[allow(clippy::new_without_default)]
impl Validate {
    pub fn new() -> Self {
        Validate {}
    }
}

impl Command for Validate {
    fn name(&self) -> &'static str {
        VALIDATE
    }

    fn command(&self) -> clap::Command {
        clap::Command::new(VALIDATE)
            .about(r#"Validates YAML or JSON documents against a lidy grammar.
The documents are matched against the entry rule of the grammar and every
problem found is reported with its line and column. Exits with 19 when a
document does not match and with 5 when the grammar or a document cannot be
read."#)
            .arg(
                Arg::new(GRAMMAR.0)
                    .long(GRAMMAR.0)
                    .short(GRAMMAR.1)
                    .action(ArgAction::Set)
                    .required(true)
                    .help("Provide a grammar file"),
            )
            .arg(
                Arg::new(DOCUMENT.0)
                    .long(DOCUMENT.0)
                    .short(DOCUMENT.1)
                    .action(ArgAction::Append)
                    .help("Provide a document file or a directory of .yaml, .yml and .json files. Read from stdin when absent"),
            )
            .arg(
                Arg::new(ENTRY.0)
                    .long(ENTRY.0)
                    .short(ENTRY.1)
                    .action(ArgAction::Set)
                    .default_value(DEFAULT_ENTRY_RULE)
                    .help("Rule the documents are matched against"),
            )
            .arg(
                Arg::new(OUTPUT_FORMAT.0)
                    .long(OUTPUT_FORMAT.0)
                    .short(OUTPUT_FORMAT.1)
                    .value_parser(["single-line-summary", "json", "yaml"])
                    .default_value("single-line-summary")
                    .action(ArgAction::Set)
                    .help("Specify the format in which the output should be displayed"),
            )
            .arg(
                Arg::new(BYPASS_MISSING_RULE.0)
                    .long(BYPASS_MISSING_RULE.0)
                    .short(BYPASS_MISSING_RULE.1)
                    .action(ArgAction::SetTrue)
                    .help("Treat references to undeclared rules as `any`"),
            )
            .arg(
                Arg::new(MAX_DEPTH)
                    .long(MAX_DEPTH)
                    .value_parser(value_parser!(usize))
                    .action(ArgAction::Set)
                    .help("Nested rule applications allowed before matching gives up, 256 by default"),
            )
            .arg(
                Arg::new(VERBOSE.0)
                    .long(VERBOSE.0)
                    .short(VERBOSE.1)
                    .action(ArgAction::Count)
                    .help("Log what the compiler and the matcher do, repeat for more detail"),
            )
            .arg_required_else_help(true)
    }

    fn execute(&self, app: &ArgMatches, writer: &mut Writer, reader: &mut Reader) -> Result<i32> {
        let grammar_file = match app.get_one::<String>(GRAMMAR.0) {
            Some(file) => file.as_str(),
            None => return Err(Error::IllegalArguments(String::from("no grammar file given"))),
        };
        let grammar_text = read_path(Path::new(grammar_file))?;
        let compile_options = CompileOptions {
            bypass_missing_rule: app.get_flag(BYPASS_MISSING_RULE.0),
        };
        let grammar = match compile_grammar(&grammar_text, &compile_options) {
            Ok(grammar) => grammar,
            Err(e) => {
                writer.write_err(error_at(grammar_file, &grammar_text, &e))?;
                return Ok(ERROR_STATUS_CODE);
            }
        };

        let entry = app
            .get_one::<String>(ENTRY.0)
            .map_or(DEFAULT_ENTRY_RULE, String::as_str);
        if !has_entry(&grammar, entry) {
            writer.write_err(format!(
                "{}: {}: {}",
                grammar_file,
                "error".red().bold(),
                Error::MissingEntryRule(entry.to_string())
            ))?;
            return Ok(ERROR_STATUS_CODE);
        }

        let options = ValidateOptions {
            max_depth: app.get_one::<usize>(MAX_DEPTH).copied().unwrap_or(DEFAULT_MAX_DEPTH),
        };
        let output_format = match app.get_one::<String>(OUTPUT_FORMAT.0) {
            Some(format) => OutputFormatType::from_arg(format)?,
            None => OutputFormatType::SingleLineSummary,
        };
        let mut reporter: Box<dyn Reporter> = match output_format {
            OutputFormatType::SingleLineSummary => Box::new(ConsoleReporter::new()),
            structured => Box::new(StructuredReporter::new(structured)),
        };

        let mut failed = false;
        let mut errored = false;
        for (name, content) in collect_documents(app, writer, reader, &mut errored)? {
            let document = match Loader::new().load(&content) {
                Ok(document) => document,
                Err(e) => {
                    writer.write_err(error_at(&name, &content, &e))?;
                    errored = true;
                    continue;
                }
            };
            let validation = grammar.validate(entry, &document, &options)?;
            debug!("{} validated with status {:?}", name, validation.status());
            failed |= !validation.is_valid();
            reporter.report(
                writer,
                &DocumentReport {
                    document: &name,
                    grammar: grammar_file,
                    entry,
                    content: &content,
                    validation: &validation,
                },
            )?;
        }
        reporter.close(writer)?;

        Ok(if errored {
            ERROR_STATUS_CODE
        } else if failed {
            FAILURE_STATUS_CODE
        } else {
            SUCCESS_STATUS_CODE
        })
    }
}

fn has_entry(grammar: &Grammar, entry: &str) -> bool {
    grammar.rule(entry).is_some() || Atomic::from_name(entry).is_some()
}

/// Names and contents of the documents to validate. Unreadable files are
/// reported and flag `errored`, the remaining ones are still returned.
fn collect_documents(
    app: &ArgMatches,
    writer: &mut Writer,
    reader: &mut Reader,
    errored: &mut bool,
) -> Result<Vec<(String, String)>> {
    let paths: Vec<&String> = match app.get_many::<String>(DOCUMENT.0) {
        Some(paths) => paths.collect(),
        None => return Ok(vec![(String::from("<stdin>"), reader.content()?)]),
    };

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let files = match get_files_with_filter(path, alphabetical, |entry| {
            has_a_supported_extension(
                &entry.file_name().to_string_lossy(),
                &DOCUMENT_FILE_SUPPORTED_EXTENSIONS,
            )
        }) {
            Ok(files) => files,
            Err(e) => {
                writer.write_err(format!("{}: {}: {}", path, "error".red().bold(), e))?;
                *errored = true;
                continue;
            }
        };
        for file in files {
            let name = file.display().to_string();
            match read_path(&file) {
                Ok(content) => documents.push((name, content)),
                Err(e) => {
                    writer.write_err(format!("{}: {}: {}", name, "error".red().bold(), e))?;
                    *errored = true;
                }
            }
        }
    }
    Ok(documents)
}

///
/// One-line rendering of a compile or load error. Grammar errors carry a span
/// and are prefixed with `file:line:col`, load errors already mention their
/// position in the message.
///
pub(crate) fn error_at(file: &str, content: &str, error: &Error) -> String {
    match error {
        Error::Grammar(e) => {
            let (line, column) = LineIndex::new(content).line_col(e.span().start);
            format!("{}:{}:{}: {}: {}", file, line, column, "error".red().bold(), e)
        }
        other => format!("{}: {}: {}", file, "error".red().bold(), other),
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod validate_tests;
