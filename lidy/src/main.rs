use std::collections::HashMap;
use std::fs::File;
use std::process::exit;

use log::LevelFilter;
use simple_logger::SimpleLogger;

use lidy::command::Command;
use lidy::commands::{APP_NAME, APP_VERSION, OUTPUT, PARSE_TREE, VERBOSE};
use lidy::rules::errors::Error;
use lidy::utils::get_lidy_commands;
use lidy::utils::reader::{ReadBuffer, Reader};
use lidy::utils::writer::WriteBuffer::Stderr;
use lidy::utils::writer::{WriteBuffer::File as WBFile, WriteBuffer::Stdout, Writer};

fn main() -> Result<(), Error> {
    let mut app = clap::Command::new(APP_NAME)
        .version(APP_VERSION)
        .about(
            r#"
  lidy validates YAML and JSON documents against a grammar. A grammar is a YAML
  map from rule names to rules built from predefined types (string, int, float,
  boolean, null, timestamp, binary, any) and keywords for maps (_dict, _dictOf,
  _optionalKeys), lists (_list, _listOf, _optionalPositions), alternatives
  (_oneOf), composition (_copy, _merge) and scalar constraints (_in, _notin,
  _regexp). Every mismatch is reported with its line and column."#,
        )
        .arg_required_else_help(true);

    let commands: Vec<Box<dyn Command>> = get_lidy_commands();
    let mappings = commands.iter().map(|s| (s.name(), s)).fold(
        HashMap::with_capacity(commands.len()),
        |mut map, entry| {
            map.insert(entry.0, entry.1.as_ref());
            map
        },
    );

    for each in &commands {
        app = app.subcommand(each.command());
    }

    let help = app.render_usage();
    let app = app.get_matches();

    match app.subcommand() {
        Some((name, value)) => {
            if let Some(command) = mappings.get(name) {
                init_logger(value);

                let mut output_writer: Writer = match value
                    .try_get_one::<String>(OUTPUT.0)
                    .ok()
                    .flatten()
                    .filter(|_| command.name() == PARSE_TREE)
                {
                    Some(file) => {
                        Writer::new(WBFile(File::create(file)?), Stderr(std::io::stderr()))
                    }
                    None => Writer::new(Stdout(std::io::stdout()), Stderr(std::io::stderr())),
                };

                match (*command).execute(
                    value,
                    &mut output_writer,
                    &mut Reader::new(ReadBuffer::Stdin(std::io::stdin())),
                ) {
                    Err(e) => {
                        output_writer.write_err(format!("Error occurred {e}"))?;
                        exit(-1);
                    }
                    Ok(code) => exit(code),
                }
            } else {
                println!("{}", help);
            }
        }
        None => {
            println!("{}", help);
        }
    }

    Ok(())
}

/// Logging stays off unless `-v` is given; each repetition raises the level.
fn init_logger(args: &clap::ArgMatches) {
    let verbosity = match args.try_get_one::<u8>(VERBOSE.0) {
        Ok(Some(count)) => *count,
        _ => 0,
    };
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if SimpleLogger::new().with_level(level).init().is_err() {
        eprintln!("logger was already initialised");
    }
}
