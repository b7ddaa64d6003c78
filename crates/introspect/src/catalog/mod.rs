//! Relational catalog introspection.
//!
//! A [`SchemaReader`] turns the raw rows of a [`CatalogSource`] into an
//! immutable [`TableSchema`]: columns in declaration order, each classified
//! into exactly one [`FieldRole`] by the rule table in [`inference`].

pub mod capabilities;
pub mod display;
pub mod inference;
pub mod postgres;
pub mod snapshot;
pub mod source;

use std::collections::HashMap;
use std::fmt;

use crudforge_core::{ForgeError, ForgeResult};
use serde::{Deserialize, Serialize};

pub use display::{select_display_columns, DISPLAY_PRIORITY};
pub use inference::{infer_role, parse_check_values, ColumnFacts, RoleRule, ROLE_RULES};
pub use postgres::PgCatalog;
pub use snapshot::{SnapshotCatalog, SnapshotTable};
pub use source::{CatalogSource, RawCheckConstraint, RawColumn, RawForeignKey, RawUniqueConstraint};

/// Semantic classification of a column, driving generated validation and UI hints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldRole {
    PrimaryKey,
    AuditTimestamp,
    AuditUser,
    ForeignKeyReference,
    Enumerated,
    Email,
    Password,
    Url,
    Boolean,
    DateTime,
    LongText,
    Numeric,
    PlainText,
}

impl FieldRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldRole::PrimaryKey => "primary-key",
            FieldRole::AuditTimestamp => "audit-timestamp",
            FieldRole::AuditUser => "audit-user",
            FieldRole::ForeignKeyReference => "foreign-key-reference",
            FieldRole::Enumerated => "enumerated",
            FieldRole::Email => "email",
            FieldRole::Password => "password",
            FieldRole::Url => "url",
            FieldRole::Boolean => "boolean",
            FieldRole::DateTime => "datetime",
            FieldRole::LongText => "long-text",
            FieldRole::Numeric => "numeric",
            FieldRole::PlainText => "plain-text",
        }
    }

    /// Columns the database fills in; excluded from create/update payloads
    pub fn is_managed(&self) -> bool {
        matches!(
            self,
            FieldRole::PrimaryKey | FieldRole::AuditTimestamp | FieldRole::AuditUser
        )
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of a foreign key, with the columns used to label referenced rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
    /// Filled by [`SchemaReader::read_schema_enhanced`]; empty otherwise
    #[serde(default)]
    pub display_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub udt_name: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub max_length: Option<i32>,
    pub is_primary_key: bool,
    pub foreign_key: Option<ForeignKeyRef>,
    /// Declared order of the allowed values; non-empty only for enumerated columns
    pub enum_values: Vec<String>,
    pub is_unique: bool,
    pub role: FieldRole,
}

impl ColumnDescriptor {
    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.is_some()
    }

    pub fn is_enumerated(&self) -> bool {
        self.role == FieldRole::Enumerated
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn is_text(&self) -> bool {
        display::is_text_type(&self.data_type, &self.udt_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub references: ForeignKeyRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraints {
    pub single_field: Vec<String>,
    pub composite: Vec<Vec<String>>,
}

impl UniqueConstraints {
    pub fn is_empty(&self) -> bool {
        self.single_field.is_empty() && self.composite.is_empty()
    }
}

/// Immutable snapshot of one table, built fresh for each run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub unique: UniqueConstraints,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// First primary-key column, if the table has one
    pub fn primary_column(&self) -> Option<&ColumnDescriptor> {
        self.primary_key.first().and_then(|pk| self.column(pk))
    }

    pub fn columns_with_role(&self, role: FieldRole) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(move |c| c.role == role)
    }

    /// Display columns of this table when it is the target of a foreign key
    pub fn display_columns(&self) -> Vec<String> {
        select_display_columns(&self.columns, &self.primary_key)
    }
}

/// Builds [`TableSchema`] snapshots from a catalog source
pub struct SchemaReader<'a> {
    source: &'a dyn CatalogSource,
    schema: String,
}

impl<'a> SchemaReader<'a> {
    pub fn new(source: &'a dyn CatalogSource, schema: impl Into<String>) -> Self {
        Self {
            source,
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub async fn list_tables(&self) -> ForgeResult<Vec<String>> {
        self.source.list_tables(&self.schema).await
    }

    /// Read one table; `NotFound` when it does not exist in the configured schema
    pub async fn read_schema(&self, table: &str) -> ForgeResult<TableSchema> {
        if !self.source.table_exists(&self.schema, table).await? {
            return Err(ForgeError::not_found("Table", format!("{}.{}", self.schema, table)));
        }

        let raw_columns = self.source.columns(&self.schema, table).await?;
        let primary_key = self.source.primary_key(&self.schema, table).await?;
        let raw_fks = self.source.foreign_keys(&self.schema, table).await?;
        let checks = self.source.check_constraints(&self.schema, table).await?;
        let uniques = self.source.unique_constraints(&self.schema, table).await?;

        // Single-column check constraints listing literal values act as enumerations
        let mut check_values: HashMap<String, Vec<String>> = HashMap::new();
        for check in checks.iter().filter(|c| c.columns.len() == 1) {
            if let Some(values) = parse_check_values(&check.definition) {
                check_values.insert(check.columns[0].clone(), values);
            }
        }

        let mut unique = UniqueConstraints::default();
        for constraint in &uniques {
            match constraint.columns.as_slice() {
                [single] => {
                    if !unique.single_field.contains(single) {
                        unique.single_field.push(single.clone());
                    }
                }
                [] => {}
                many => unique.composite.push(many.to_vec()),
            }
        }

        let mut columns = Vec::with_capacity(raw_columns.len());
        for raw in &raw_columns {
            let enum_values = if raw.data_type == "USER-DEFINED" {
                self.enum_labels(&raw.udt_name).await?
            } else {
                check_values.get(&raw.name).cloned().unwrap_or_default()
            };
            let fk = raw_fks.iter().find(|fk| fk.column == raw.name);
            let is_primary_key = primary_key.contains(&raw.name);

            let role = infer_role(&ColumnFacts {
                column: raw,
                is_primary_key,
                foreign_key: fk,
                enum_values: &enum_values,
            });

            columns.push(ColumnDescriptor {
                name: raw.name.clone(),
                data_type: raw.data_type.clone(),
                udt_name: raw.udt_name.clone(),
                nullable: raw.is_nullable,
                default: raw.default.clone(),
                max_length: raw.max_length,
                is_primary_key,
                foreign_key: fk.map(|fk| ForeignKeyRef {
                    table: fk.foreign_table.clone(),
                    column: fk.foreign_column.clone(),
                    display_columns: Vec::new(),
                }),
                enum_values,
                is_unique: unique.single_field.contains(&raw.name),
                role,
            });
        }

        let foreign_keys = raw_fks
            .iter()
            .map(|fk| ForeignKey {
                column: fk.column.clone(),
                references: ForeignKeyRef {
                    table: fk.foreign_table.clone(),
                    column: fk.foreign_column.clone(),
                    display_columns: Vec::new(),
                },
            })
            .collect();

        tracing::debug!(
            "Read {}.{}: {} columns, {} foreign keys",
            self.schema,
            table,
            columns.len(),
            raw_fks.len()
        );

        Ok(TableSchema {
            schema: self.schema.clone(),
            name: table.to_string(),
            columns,
            primary_key,
            foreign_keys,
            unique,
        })
    }

    /// Like [`read_schema`](Self::read_schema), additionally picking display
    /// columns of every referenced table
    pub async fn read_schema_enhanced(&self, table: &str) -> ForgeResult<TableSchema> {
        let mut schema = self.read_schema(table).await?;
        let mut cache: HashMap<String, Vec<String>> = HashMap::new();

        for fk in &schema.foreign_keys {
            let target = &fk.references.table;
            if cache.contains_key(target) {
                continue;
            }
            let display = if target == &schema.name {
                schema.display_columns()
            } else if self.source.table_exists(&self.schema, target).await? {
                let columns = self.source.columns(&self.schema, target).await?;
                let pk = self.source.primary_key(&self.schema, target).await?;
                display::select_display_columns_raw(&columns, &pk)
            } else {
                tracing::warn!(
                    "Referenced table {} not found in schema {}; labelling by {}",
                    target,
                    self.schema,
                    fk.references.column
                );
                vec![fk.references.column.clone()]
            };
            cache.insert(target.clone(), display);
        }

        for fk in &mut schema.foreign_keys {
            if let Some(display) = cache.get(&fk.references.table) {
                fk.references.display_columns = display.clone();
            }
        }
        for column in &mut schema.columns {
            if let Some(fk) = column.foreign_key.as_mut() {
                if let Some(display) = cache.get(&fk.table) {
                    fk.display_columns = display.clone();
                }
            }
        }

        Ok(schema)
    }

    async fn enum_labels(&self, type_name: &str) -> ForgeResult<Vec<String>> {
        let labels = self.source.enum_values(&self.schema, type_name).await?;
        if labels.is_empty() && self.schema != "public" {
            return self.source.enum_values("public", type_name).await;
        }
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SnapshotCatalog {
        SnapshotCatalog::new()
            .with_table(
                "departments",
                SnapshotTable::new(["id"])
                    .column(RawColumn::typed("id", "uuid"))
                    .column(RawColumn::typed("code", "varchar"))
                    .column(RawColumn::typed("name", "varchar")),
            )
            .with_table(
                "employees",
                SnapshotTable::new(["id"])
                    .column(RawColumn::typed("id", "uuid"))
                    .column(RawColumn::typed("email", "varchar"))
                    .column(RawColumn::typed("department_id", "uuid"))
                    .column(RawColumn::enumerated("grade", "employee_grade"))
                    .column(RawColumn::typed("status", "varchar"))
                    .column(RawColumn::typed("created_at", "timestamptz"))
                    .foreign_key("department_id", "departments", "id")
                    .check(
                        "employees_status_check",
                        ["status"],
                        "CHECK (((status)::text = ANY ((ARRAY['active'::character varying, 'left'::character varying])::text[])))",
                    )
                    .unique("employees_email_key", ["email"]),
            )
            .with_enum("employee_grade", ["A", "B"])
    }

    #[tokio::test]
    async fn test_read_schema_infers_roles() {
        let catalog = catalog();
        let reader = SchemaReader::new(&catalog, "public");
        let schema = reader.read_schema("employees").await.unwrap();

        assert_eq!(schema.primary_key, vec!["id"]);
        let role = |name: &str| schema.column(name).unwrap().role;
        assert_eq!(role("id"), FieldRole::PrimaryKey);
        assert_eq!(role("created_at"), FieldRole::AuditTimestamp);
        assert_eq!(role("department_id"), FieldRole::ForeignKeyReference);
        assert_eq!(role("email"), FieldRole::Email);
        assert_eq!(role("grade"), FieldRole::Enumerated);
        assert_eq!(schema.column("grade").unwrap().enum_values, vec!["A", "B"]);
        assert_eq!(role("status"), FieldRole::Enumerated);
        assert_eq!(
            schema.column("status").unwrap().enum_values,
            vec!["active", "left"]
        );
        assert!(schema.column("email").unwrap().is_unique);
        assert_eq!(schema.unique.single_field, vec!["email"]);
    }

    #[tokio::test]
    async fn test_read_schema_missing_table_is_not_found() {
        let catalog = catalog();
        let reader = SchemaReader::new(&catalog, "public");
        let err = reader.read_schema("nope").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_enhanced_schema_picks_display_columns() {
        let catalog = catalog();
        let reader = SchemaReader::new(&catalog, "public");
        let schema = reader.read_schema_enhanced("employees").await.unwrap();

        let fk = schema.column("department_id").unwrap().foreign_key.clone().unwrap();
        assert_eq!(fk.table, "departments");
        assert!(fk.display_columns.contains(&"name".to_string()));
        assert_eq!(
            schema.foreign_keys[0].references.display_columns,
            fk.display_columns
        );
    }

    #[tokio::test]
    async fn test_enhanced_schema_tolerates_missing_referenced_table() {
        let catalog = SnapshotCatalog::new().with_table(
            "notes",
            SnapshotTable::new(["id"])
                .column(RawColumn::typed("id", "int8"))
                .column(RawColumn::typed("author_id", "int8"))
                .foreign_key("author_id", "users", "id"),
        );
        let reader = SchemaReader::new(&catalog, "public");
        let schema = reader.read_schema_enhanced("notes").await.unwrap();
        let fk = schema.column("author_id").unwrap().foreign_key.clone().unwrap();
        assert_eq!(fk.display_columns, vec!["id"]);
    }
}
