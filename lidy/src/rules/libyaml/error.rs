use crate::rules::libyaml::{
    cstr::CStr,
    util::{system_mark, Mark},
};
use std::{
    fmt::{self, Debug, Display},
    ptr::NonNull,
};
use unsafe_libyaml as sys;

/// Snapshot of the error state libyaml leaves on a failed parser.
pub(crate) struct Error {
    kind: sys::yaml_error_type_t,
    problem: CStr<'static>,
    problem_offset: u64,
    problem_mark: Mark,
    context: Option<CStr<'static>>,
    context_mark: Mark,
}

impl Error {
    pub unsafe fn parse_error(parser: *const sys::yaml_parser_t) -> Self {
        Error {
            kind: (&(*parser)).error,
            problem: match NonNull::new((&(*parser)).problem as *mut _) {
                Some(problem) => CStr::from_ptr(problem),
                None => CStr::from_bytes_with_nul(b"libyaml parser failed but there is no error\0"),
            },
            problem_offset: (&(*parser)).problem_offset,
            problem_mark: system_mark((&(*parser)).problem_mark),
            context: NonNull::new((&(*parser)).context as *mut _).map(|context| CStr::from_ptr(context)),
            context_mark: system_mark((&(*parser)).context_mark),
        }
    }
}

impl Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.problem)?;
        if !self.problem_mark.is_unset() {
            write!(formatter, " at {}", self.problem_mark)?;
        } else if self.problem_offset != 0 {
            write!(formatter, " at position {}", self.problem_offset)?;
        }
        if let Some(context) = &self.context {
            write!(formatter, ", {}", context)?;
            if !self.context_mark.is_unset() && self.context_mark != self.problem_mark {
                write!(formatter, " at {}", self.context_mark)?;
            }
        }
        Ok(())
    }
}

impl Debug for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let mut formatter = formatter.debug_struct("Error");
        if let Some(kind) = match self.kind {
            sys::YAML_MEMORY_ERROR => Some("MEMORY"),
            sys::YAML_READER_ERROR => Some("READER"),
            sys::YAML_SCANNER_ERROR => Some("SCANNER"),
            sys::YAML_PARSER_ERROR => Some("PARSER"),
            sys::YAML_COMPOSER_ERROR => Some("COMPOSER"),
            _ => None,
        } {
            formatter.field("kind", &format_args!("{}", kind));
        }
        formatter.field("problem", &self.problem);
        if !self.problem_mark.is_unset() {
            formatter.field("problem_mark", &self.problem_mark);
        } else if self.problem_offset != 0 {
            formatter.field("problem_offset", &self.problem_offset);
        }
        if let Some(context) = &self.context {
            formatter.field("context", context);
            if !self.context_mark.is_unset() {
                formatter.field("context_mark", &self.context_mark);
            }
        }
        formatter.finish()
    }
}
