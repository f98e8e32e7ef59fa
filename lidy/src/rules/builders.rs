use std::fmt::{self, Debug, Formatter};

use indexmap::IndexMap;

use crate::rules::typed::TypedNode;

/// Result of a builder. An `Err` message becomes a `BuilderFailed` error at
/// the node the rule matched.
pub type BuildResult = std::result::Result<TypedNode, String>;

type BuildFn = Box<dyn Fn(TypedNode) -> BuildResult + Send + Sync>;

///
/// Callbacks keyed by export name. After an exported rule (`name:` or
/// `name::export` in the grammar) matches, the builder registered under its
/// export name receives the typed node and returns the one that replaces it.
/// Exported rules without a builder keep their node unchanged.
///
#[derive(Default)]
pub struct Builders {
    map: IndexMap<String, BuildFn>,
}

impl Builders {
    pub fn new() -> Builders {
        Builders::default()
    }

    pub fn with<F>(mut self, export: &str, builder: F) -> Builders
    where
        F: Fn(TypedNode) -> BuildResult + Send + Sync + 'static,
    {
        self.map.insert(export.to_string(), Box::new(builder));
        self
    }

    pub fn get(&self, export: &str) -> Option<&(dyn Fn(TypedNode) -> BuildResult + Send + Sync)> {
        self.map.get(export).map(|builder| builder.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Debug for Builders {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.map.keys()).finish()
    }
}
