pub mod completions;
pub(crate) mod files;
pub mod parse_tree;
pub mod validate;

//
// Constants
//
// Application metadata
pub const APP_NAME: &str = "lidy";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
// Commands
pub const PARSE_TREE: &str = "parse-tree";
pub const VALIDATE: &str = "validate";
pub const COMPLETIONS: &str = "completions";
// Arguments for validate, parse-tree
pub const GRAMMAR: (&str, char) = ("grammar", 'g');
pub const ENTRY: (&str, char) = ("entry", 'e');
// Arguments for validate
pub const DOCUMENT: (&str, char) = ("document", 'd');
pub const OUTPUT_FORMAT: (&str, char) = ("output-format", 'o');
pub const BYPASS_MISSING_RULE: (&str, char) = ("bypass-missing-rule", 'b');
pub const MAX_DEPTH: &str = "max-depth";
pub const VERBOSE: (&str, char) = ("verbose", 'v');
// Arguments for parse-tree
pub const OUTPUT: (&str, char) = ("output", 'o');
pub const PRINT_JSON: (&str, char) = ("print-json", 'j');
pub const PRINT_YAML: (&str, char) = ("print-yaml", 'y');
// Arguments for completions
pub const SHELL: (&str, char) = ("shell", 's');

pub const DEFAULT_ENTRY_RULE: &str = "main";

pub(crate) const DOCUMENT_FILE_SUPPORTED_EXTENSIONS: [&str; 3] = [".yaml", ".yml", ".json"];

pub const FAILURE_STATUS_CODE: i32 = 19;
pub const SUCCESS_STATUS_CODE: i32 = 0;
pub const ERROR_STATUS_CODE: i32 = 5;
