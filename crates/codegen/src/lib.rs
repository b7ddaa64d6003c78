//! Generation side of crudforge: builds the canonical model from a table
//! schema, renders it through tera templates, validates the output and writes
//! it atomically.

pub mod escape;
pub mod format;
pub mod generator;
pub mod layout;
pub mod model;
pub mod reference;
pub mod renderer;
pub mod roles;
pub mod templates;
pub mod validate;
pub mod writer;

pub use generator::{
    Confirm, DenyOverwrite, GenerateOptions, GenerationReport, Generator, RoleOutcome,
    ValidationReport,
};
pub use model::{build, GenerationContext, Layout, ModelOptions, PackageTier, Target};
pub use reference::{ReferenceSync, SyncReport};
pub use renderer::{Renderer, TemplateId};
pub use roles::{synthesize, PgRoleStore, RoleOptions, RoleOutput, RoleSet, RoleStore};
pub use validate::{validate, OutputKind, Validation};
pub use writer::{AtomicWriter, PendingFile, WriteOptions, WriteResult, WriteStatus};
