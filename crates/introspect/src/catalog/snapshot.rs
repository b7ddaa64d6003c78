//! Offline catalog loaded from a YAML or JSON snapshot.
//!
//! ```yaml
//! tables:
//!   departments:
//!     primary_key: [id]
//!     columns:
//!       - { name: id, data_type: uuid, udt_name: uuid }
//!       - { name: name, data_type: character varying, udt_name: varchar }
//! enums:
//!   employee_grade: [A, B]
//! ```
//! Snapshots describe a single schema; the schema argument of every lookup
//! is ignored.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use crudforge_core::{ForgeError, ForgeResult};
use serde::{Deserialize, Serialize};

use super::source::{
    CatalogSource, RawCheckConstraint, RawColumn, RawForeignKey, RawUniqueConstraint,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTable {
    pub columns: Vec<RawColumn>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<RawForeignKey>,
    #[serde(default)]
    pub check_constraints: Vec<RawCheckConstraint>,
    #[serde(default)]
    pub unique_constraints: Vec<RawUniqueConstraint>,
}

impl SnapshotTable {
    pub fn new<I, S>(primary_key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            primary_key: primary_key.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn column(mut self, column: RawColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn foreign_key(mut self, column: &str, table: &str, foreign_column: &str) -> Self {
        self.foreign_keys.push(RawForeignKey {
            constraint_name: format!("{}_fkey", column),
            column: column.to_string(),
            foreign_table: table.to_string(),
            foreign_column: foreign_column.to_string(),
        });
        self
    }

    pub fn check<I, S>(mut self, name: &str, columns: I, definition: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check_constraints.push(RawCheckConstraint {
            name: name.to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
            definition: definition.to_string(),
        });
        self
    }

    pub fn unique<I, S>(mut self, name: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_constraints.push(RawUniqueConstraint {
            name: name.to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotCatalog {
    #[serde(default)]
    pub tables: BTreeMap<String, SnapshotTable>,
    #[serde(default)]
    pub enums: BTreeMap<String, Vec<String>>,
}

impl SnapshotCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot; `.json` files are read as JSON, everything else as YAML
    pub fn load(path: &Path) -> ForgeResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ForgeError::filesystem(path, e))?;
        let catalog: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        tracing::debug!("Loaded catalog snapshot from {}", path.display());
        Ok(catalog)
    }

    pub fn with_table(mut self, name: impl Into<String>, table: SnapshotTable) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    pub fn with_enum<I, S>(mut self, type_name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enums
            .insert(type_name.into(), labels.into_iter().map(Into::into).collect());
        self
    }

    fn table(&self, table: &str) -> ForgeResult<&SnapshotTable> {
        self.tables
            .get(table)
            .ok_or_else(|| ForgeError::not_found("Table", table))
    }
}

#[async_trait]
impl CatalogSource for SnapshotCatalog {
    async fn table_exists(&self, _schema: &str, table: &str) -> ForgeResult<bool> {
        Ok(self.tables.contains_key(table))
    }

    async fn list_tables(&self, _schema: &str) -> ForgeResult<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    async fn columns(&self, _schema: &str, table: &str) -> ForgeResult<Vec<RawColumn>> {
        Ok(self.table(table)?.columns.clone())
    }

    async fn primary_key(&self, _schema: &str, table: &str) -> ForgeResult<Vec<String>> {
        Ok(self.table(table)?.primary_key.clone())
    }

    async fn foreign_keys(&self, _schema: &str, table: &str) -> ForgeResult<Vec<RawForeignKey>> {
        Ok(self.table(table)?.foreign_keys.clone())
    }

    async fn enum_values(&self, _schema: &str, type_name: &str) -> ForgeResult<Vec<String>> {
        Ok(self.enums.get(type_name).cloned().unwrap_or_default())
    }

    async fn check_constraints(
        &self,
        _schema: &str,
        table: &str,
    ) -> ForgeResult<Vec<RawCheckConstraint>> {
        Ok(self.table(table)?.check_constraints.clone())
    }

    async fn unique_constraints(
        &self,
        _schema: &str,
        table: &str,
    ) -> ForgeResult<Vec<RawUniqueConstraint>> {
        Ok(self.table(table)?.unique_constraints.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SNAPSHOT: &str = r#"
tables:
  widgets:
    primary_key: [id]
    columns:
      - { name: id, data_type: uuid, udt_name: uuid }
      - { name: name, data_type: character varying, udt_name: varchar, max_length: 120 }
      - { name: kind, data_type: USER-DEFINED, udt_name: widget_kind, is_nullable: true }
enums:
  widget_kind: [small, large]
"#;

    #[tokio::test]
    async fn test_load_yaml_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.yaml");
        fs::write(&path, SNAPSHOT).unwrap();

        let catalog = SnapshotCatalog::load(&path).unwrap();
        assert!(catalog.table_exists("public", "widgets").await.unwrap());
        assert_eq!(catalog.list_tables("public").await.unwrap(), vec!["widgets"]);

        let columns = catalog.columns("public", "widgets").await.unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[1].max_length, Some(120));
        assert!(columns[2].is_nullable);
        assert_eq!(
            catalog.enum_values("public", "widget_kind").await.unwrap(),
            vec!["small", "large"]
        );
    }

    #[test]
    fn test_load_missing_file_is_filesystem_error() {
        let err = SnapshotCatalog::load(Path::new("/nonexistent/catalog.yaml")).unwrap_err();
        assert!(matches!(err, ForgeError::Filesystem { .. }));
    }
}
