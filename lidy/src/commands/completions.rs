use std::fs::File;
use std::io::Write;
use std::path::Path;

use clap::{Arg, ArgAction, ArgMatches, ValueEnum};

use crate::command::Command;
use crate::commands::{APP_NAME, APP_VERSION, COMPLETIONS, SHELL, SUCCESS_STATUS_CODE};
use crate::rules::errors::Error;
use crate::rules::Result;
use crate::utils::reader::Reader;
use crate::utils::writer::Writer;
use crate::utils::get_lidy_commands;

#[derive(Copy, Clone, ValueEnum, Debug, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

const LOCATION: (&str, char) = ("location", 'l');

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Completions {}

#[allow(clippy::new_without_default)]
impl Completions {
    pub fn new() -> Self {
        Completions {}
    }
}

impl Command for Completions {
    fn name(&self) -> &'static str {
        COMPLETIONS
    }

    fn command(&self) -> clap::Command {
        clap::Command::new(COMPLETIONS)
            .about("Generates a shell completions script for lidy.")
            .arg(
                Arg::new(SHELL.0)
                    .long(SHELL.0)
                    .short(SHELL.1)
                    .value_parser(clap::value_parser!(Shell))
                    .required(true)
                    .action(ArgAction::Set)
                    .help("the shell you are currently running"),
            )
            .arg(
                Arg::new(LOCATION.0)
                    .long(LOCATION.0)
                    .short(LOCATION.1)
                    .action(ArgAction::Set)
                    .help("the directory where the completions script will be written, stdout when absent"),
            )
    }

    fn execute(&self, app: &ArgMatches, writer: &mut Writer, _: &mut Reader) -> Result<i32> {
        let shell = match app.get_one::<Shell>(SHELL.0) {
            Some(shell) => *shell,
            None => return Err(Error::IllegalArguments(String::from("no shell given"))),
        };

        let mut command = clap::Command::new(APP_NAME).version(APP_VERSION);
        for each in get_lidy_commands() {
            command = command.subcommand(each.command());
        }

        let mut out: Box<dyn Write + '_> = match app.get_one::<String>(LOCATION.0) {
            Some(location) => {
                let path = Path::new(location);
                if !path.is_dir() {
                    return Err(Error::InvalidCompletionsPath(format!(
                        "`{}` is not a directory",
                        location
                    )));
                }
                Box::new(File::create(path.join(format!("{}.sh", APP_NAME)))?)
            }
            None => Box::new(writer),
        };

        match shell {
            Shell::Bash => {
                clap_complete::generate(clap_complete::shells::Bash, &mut command, APP_NAME, &mut out)
            }
            Shell::Zsh => {
                clap_complete::generate(clap_complete::shells::Zsh, &mut command, APP_NAME, &mut out)
            }
            Shell::Fish => {
                clap_complete::generate(clap_complete::shells::Fish, &mut command, APP_NAME, &mut out)
            }
            Shell::PowerShell => clap_complete::generate(
                clap_complete::shells::PowerShell,
                &mut command,
                APP_NAME,
                &mut out,
            ),
        }

        Ok(SUCCESS_STATUS_CODE)
    }
}
