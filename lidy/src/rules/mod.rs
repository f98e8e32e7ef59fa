pub mod builders;
pub mod diagnostics;
pub mod errors;
pub mod exprs;
pub mod libyaml;
pub mod matcher;
pub mod normalize;
pub(crate) mod parser;
pub(crate) mod scalars;
pub mod typed;
pub mod values;

use colored::*;
use serde::Serialize;
use std::fmt::Formatter;

pub use errors::Error;

pub type Result<R> = std::result::Result<R, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Copy, Serialize)]
pub enum Status {
    PASS,
    FAIL,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::PASS => write!(f, "{}", "PASS".green()),
            Status::FAIL => write!(f, "{}", "FAIL".red()),
        }
    }
}
