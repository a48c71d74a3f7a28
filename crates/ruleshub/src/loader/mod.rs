//! Rule loaders: enumerate raw units from one source type and parse each.
//!
//! A failure to parse one file is recorded in the returned
//! [`SourceLoad`] and logged; it never aborts the scan of the rest.

mod core;
mod report;


pub use self::core::{DirectoryLoader, RuleLoader, RULE_EXTENSIONS, YAML_FILE_LOADER};
pub use self::report::{LoadResult, LoadStatus, SourceLoad};
