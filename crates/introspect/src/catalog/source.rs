use async_trait::async_trait;
use crudforge_core::ForgeResult;
use serde::{Deserialize, Serialize};

/// One row of column metadata as the catalog reports it, before inference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    /// `information_schema.columns.data_type` (`character varying`, `USER-DEFINED`, ...)
    pub data_type: String,
    /// Underlying type name (`varchar`, `timestamptz`, or the enum type name)
    pub udt_name: String,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub max_length: Option<i32>,
}

impl RawColumn {
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        udt_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            udt_name: udt_name.into(),
            is_nullable: false,
            default: None,
            max_length: None,
        }
    }

    /// Build a column from its short type name, filling `data_type` the way
    /// `information_schema` spells it
    pub fn typed(name: impl Into<String>, udt_name: &str) -> Self {
        let data_type = match udt_name {
            "varchar" => "character varying",
            "bpchar" => "character",
            "bool" => "boolean",
            "int2" => "smallint",
            "int4" => "integer",
            "int8" => "bigint",
            "float4" => "real",
            "float8" => "double precision",
            "timestamptz" => "timestamp with time zone",
            "timestamp" => "timestamp without time zone",
            "timetz" => "time with time zone",
            "time" => "time without time zone",
            other => other,
        };
        Self::new(name, data_type, udt_name)
    }

    /// A column backed by a named enum type
    pub fn enumerated(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, "USER-DEFINED", type_name)
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_max_length(mut self, max_length: i32) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawForeignKey {
    #[serde(default)]
    pub constraint_name: String,
    pub column: String,
    pub foreign_table: String,
    pub foreign_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCheckConstraint {
    pub name: String,
    pub columns: Vec<String>,
    /// Constraint text as rendered by `pg_get_constraintdef`
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

/// Read-only access to relational catalog metadata
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn table_exists(&self, schema: &str, table: &str) -> ForgeResult<bool>;

    async fn list_tables(&self, schema: &str) -> ForgeResult<Vec<String>>;

    /// Columns in declaration order
    async fn columns(&self, schema: &str, table: &str) -> ForgeResult<Vec<RawColumn>>;

    /// Primary-key columns in key order
    async fn primary_key(&self, schema: &str, table: &str) -> ForgeResult<Vec<String>>;

    async fn foreign_keys(&self, schema: &str, table: &str) -> ForgeResult<Vec<RawForeignKey>>;

    /// Labels of an enum type in declaration order; empty when the type is not an enum
    async fn enum_values(&self, schema: &str, type_name: &str) -> ForgeResult<Vec<String>>;

    async fn check_constraints(
        &self,
        schema: &str,
        table: &str,
    ) -> ForgeResult<Vec<RawCheckConstraint>>;

    async fn unique_constraints(
        &self,
        schema: &str,
        table: &str,
    ) -> ForgeResult<Vec<RawUniqueConstraint>>;
}
