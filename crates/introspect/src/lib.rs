//! Read-side of the generator: relational catalog introspection and
//! extraction of descriptor records from existing Rust sources.

pub mod balance;
pub mod catalog;
pub mod source;

pub use balance::{check_balance, Imbalance, Syntax};
pub use catalog::{
    CatalogSource, ColumnDescriptor, FieldRole, ForeignKey, ForeignKeyRef, PgCatalog,
    SchemaReader, SnapshotCatalog, SnapshotTable, TableSchema, UniqueConstraints,
};
pub use source::{
    extract_all, extract_commands, extract_packages, extract_patterns, CommandDescriptor,
    Extraction, OptionDescriptor, OptionKind, PackageDescriptor, PatternCategory,
    PatternDescriptor, Rejection, SourceBundle,
};
