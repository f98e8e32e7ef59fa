mod cstr;
pub(crate) mod error;
pub(crate) mod event;
pub mod loader;
pub(crate) mod parser;
pub(crate) mod tag;
pub(crate) mod util;
