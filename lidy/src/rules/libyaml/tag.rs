use crate::rules::libyaml::cstr;
use std::fmt::{self, Debug};

pub(crate) const TYPE_REF_PREFIX: &str = "tag:yaml.org,2002:";

#[derive(Ord, PartialOrd, Eq, PartialEq)]
pub(crate) struct Tag(pub(in crate::rules::libyaml) Box<[u8]>);

impl Tag {
    fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    /// Suffix of a core schema tag, `int` for `!!int`. Local and custom tags
    /// have none.
    pub(crate) fn core_suffix(&self) -> Option<String> {
        self.as_string()
            .strip_prefix(TYPE_REF_PREFIX)
            .map(str::to_string)
    }
}

impl Debug for Tag {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        cstr::debug_lossy(&self.0, formatter)
    }
}
