use std::io::Write;
use std::path::Path;

use clap::{Arg, ArgAction, ArgMatches};

use crate::command::Command;
use crate::commands::files::read_path;
use crate::commands::validate::error_at;
use crate::commands::{
    BYPASS_MISSING_RULE, ENTRY, ERROR_STATUS_CODE, GRAMMAR, OUTPUT, PARSE_TREE, PRINT_JSON,
    PRINT_YAML, SUCCESS_STATUS_CODE,
};
use crate::rules::errors::Error;
use crate::rules::normalize::{compile_grammar, CompileOptions};
use crate::rules::Result;
use crate::utils::reader::Reader;
use crate::utils::writer::Writer;

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct ParseTree {}

#[allow(clippy::new_without_default)]
impl ParseTree {
    pub fn new() -> Self {
        ParseTree {}
    }
}

impl Command for ParseTree {
    fn name(&self) -> &'static str {
        PARSE_TREE
    }

    fn command(&self) -> clap::Command {
        clap::Command::new(PARSE_TREE)
            .about("Prints the compiled rules of a grammar, after _copy, _merge and _oneOf are flattened.")
            .arg(
                Arg::new(GRAMMAR.0)
                    .long(GRAMMAR.0)
                    .short(GRAMMAR.1)
                    .help("Provide a grammar file, read from stdin when absent")
                    .action(ArgAction::Set)
                    .required(false),
            )
            .arg(
                Arg::new(ENTRY.0)
                    .long(ENTRY.0)
                    .short(ENTRY.1)
                    .help("Print only the named rule")
                    .action(ArgAction::Set)
                    .required(false),
            )
            .arg(
                Arg::new(OUTPUT.0)
                    .long(OUTPUT.0)
                    .short(OUTPUT.1)
                    .help("Write to output file")
                    .action(ArgAction::Set)
                    .required(false),
            )
            .arg(
                Arg::new(PRINT_JSON.0)
                    .long(PRINT_JSON.0)
                    .short(PRINT_JSON.1)
                    .action(ArgAction::SetTrue)
                    .conflicts_with(PRINT_YAML.0)
                    .help("Print output in JSON format"),
            )
            .arg(
                Arg::new(PRINT_YAML.0)
                    .long(PRINT_YAML.0)
                    .short(PRINT_YAML.1)
                    .action(ArgAction::SetTrue)
                    .required(false)
                    .help("Print output in YAML format, the default"),
            )
            .arg(
                Arg::new(BYPASS_MISSING_RULE.0)
                    .long(BYPASS_MISSING_RULE.0)
                    .short(BYPASS_MISSING_RULE.1)
                    .action(ArgAction::SetTrue)
                    .help("Treat references to undeclared rules as `any`"),
            )
    }

    fn execute(&self, app: &ArgMatches, writer: &mut Writer, reader: &mut Reader) -> Result<i32> {
        let (name, content) = match app.get_one::<String>(GRAMMAR.0) {
            Some(file) => (file.clone(), read_path(Path::new(file))?),
            None => (String::from("<stdin>"), reader.content()?),
        };
        let options = CompileOptions {
            bypass_missing_rule: app.get_flag(BYPASS_MISSING_RULE.0),
        };

        let grammar = match compile_grammar(&content, &options) {
            Ok(grammar) => grammar,
            Err(e) => {
                writer.write_err(error_at(&name, &content, &e))?;
                return Ok(ERROR_STATUS_CODE);
            }
        };

        let json = app.get_flag(PRINT_JSON.0);
        match app.get_one::<String>(ENTRY.0) {
            Some(entry) => {
                let rule = grammar
                    .rule(entry)
                    .ok_or_else(|| Error::MissingEntryRule(entry.clone()))?;
                if json {
                    serde_json::to_writer_pretty(&mut *writer, rule)?;
                } else {
                    serde_yaml::to_writer(&mut *writer, rule)?;
                }
            }
            None => {
                if json {
                    serde_json::to_writer_pretty(&mut *writer, &grammar)?;
                } else {
                    serde_yaml::to_writer(&mut *writer, &grammar)?;
                }
            }
        }
        if json {
            writeln!(writer)?;
        }

        Ok(SUCCESS_STATUS_CODE)
    }
}
