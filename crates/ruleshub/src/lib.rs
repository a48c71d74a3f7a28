//! Rules hub: loads small YAML rule documents from configured sources and
//! serves them to AI agents.
//!
//! This crate provides:
//! - Pluggable loaders selected by source type tag (built-in: `YamlFile` directories)
//! - Per-file and per-source failure isolation during loading
//! - A concurrency-safe in-memory repository of rule metadata
//! - A lazily initialized query façade with on-demand content retrieval
//! - A JSON tool surface (`GetAllRulesMetadata`, `GetRuleContentById`)

pub mod config;
pub mod error;
pub mod hub;
pub mod loader;
pub mod orchestrator;
pub mod parser;
pub mod repository;
pub mod rule;
pub mod source;
pub mod tool;

pub use config::{EnvSourceProvider, FileSourceProvider, SourceConfig, SourceProvider, StaticSourceProvider};
pub use error::{Result, RuleError};
pub use hub::RulesHub;
pub use loader::{DirectoryLoader, LoadResult, LoadStatus, RuleLoader, SourceLoad};
pub use orchestrator::{LoadSummary, LoaderRegistry, Orchestrator};
pub use parser::{RuleParser, YamlRuleParser};
pub use repository::RuleRepository;
pub use rule::{normalize_id, Rule, RuleContent, RuleMetadata};
pub use source::{ContentSource, FileSource};
pub use tool::{RulesHubTool, ToolDefinition, ToolError};
