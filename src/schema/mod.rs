pub mod builtin;
mod entities;
mod graph;
mod source;
mod statements;
mod unit;

pub use entities::{platform_entities, platform_graph};
pub use graph::{DependencyGraph, GraphError};
pub use source::{DirectorySource, MigrationSource, StaticSource};
pub use statements::{created_entity, referenced_entities, split_statements};
pub use unit::MigrationUnit;
