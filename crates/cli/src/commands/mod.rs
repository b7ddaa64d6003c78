pub mod catalog;
pub mod generate;
pub mod reference;

use std::path::Path;

use crudforge_codegen::PgRoleStore;
use crudforge_core::{ForgeResult, GeneratorConfig};
use crudforge_introspect::{CatalogSource, PgCatalog, SnapshotCatalog};

use crate::output::mask_database_url;

/// Live database catalog or a YAML snapshot of one
pub enum CatalogHandle {
    Postgres(PgCatalog),
    Snapshot(SnapshotCatalog),
}

impl CatalogHandle {
    pub async fn open(config: &GeneratorConfig, snapshot: Option<&Path>) -> ForgeResult<Self> {
        if let Some(path) = snapshot {
            tracing::debug!("reading catalog snapshot {}", path.display());
            return Ok(Self::Snapshot(SnapshotCatalog::load(path)?));
        }

        let url = config.require_database_url()?;
        tracing::debug!("connecting to {}", mask_database_url(url));
        Ok(Self::Postgres(PgCatalog::connect(url).await?))
    }

    pub fn source(&self) -> &dyn CatalogSource {
        match self {
            Self::Postgres(catalog) => catalog,
            Self::Snapshot(catalog) => catalog,
        }
    }

    /// Writable role store; snapshots have none
    pub fn role_store(&self) -> Option<PgRoleStore> {
        match self {
            Self::Postgres(catalog) => Some(PgRoleStore::new(catalog.pool().clone())),
            Self::Snapshot(_) => None,
        }
    }

    pub async fn close(self) {
        if let Self::Postgres(catalog) = self {
            catalog.close().await;
        }
    }
}
