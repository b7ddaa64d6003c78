//! PostgreSQL catalog source backed by `information_schema` and `pg_catalog`.
//!
//! Queries are read-only and never retried. Identifier columns of
//! `information_schema` are domain types, so every selected value is cast to
//! a plain SQL type before decoding.

use std::time::Duration;

use async_trait::async_trait;
use crudforge_core::{ForgeError, ForgeResult};
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::source::{
    CatalogSource, RawCheckConstraint, RawColumn, RawForeignKey, RawUniqueConstraint,
};

const TABLE_EXISTS_SQL: &str = "\
SELECT EXISTS (
    SELECT 1 FROM information_schema.tables
    WHERE table_schema = $1 AND table_name = $2
)";

const LIST_TABLES_SQL: &str = "\
SELECT table_name::text
FROM information_schema.tables
WHERE table_schema = $1 AND table_type = 'BASE TABLE'
ORDER BY table_name";

const COLUMNS_SQL: &str = "\
SELECT column_name::text,
       data_type::text,
       udt_name::text,
       (is_nullable = 'YES') AS is_nullable,
       column_default::text,
       character_maximum_length::int4
FROM information_schema.columns
WHERE table_schema = $1 AND table_name = $2
ORDER BY ordinal_position";

const PRIMARY_KEY_SQL: &str = "\
SELECT kcu.column_name::text
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON tc.constraint_name = kcu.constraint_name
 AND tc.table_schema = kcu.table_schema
 AND tc.table_name = kcu.table_name
WHERE tc.constraint_type = 'PRIMARY KEY'
  AND tc.table_schema = $1 AND tc.table_name = $2
ORDER BY kcu.ordinal_position";

const FOREIGN_KEYS_SQL: &str = "\
SELECT tc.constraint_name::text,
       kcu.column_name::text,
       ccu.table_name::text,
       ccu.column_name::text
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON tc.constraint_name = kcu.constraint_name
 AND tc.table_schema = kcu.table_schema
JOIN information_schema.constraint_column_usage ccu
  ON ccu.constraint_name = tc.constraint_name
 AND ccu.constraint_schema = tc.constraint_schema
WHERE tc.constraint_type = 'FOREIGN KEY'
  AND tc.table_schema = $1 AND tc.table_name = $2
ORDER BY kcu.ordinal_position";

const ENUM_VALUES_SQL: &str = "\
SELECT e.enumlabel::text
FROM pg_catalog.pg_enum e
JOIN pg_catalog.pg_type t ON t.oid = e.enumtypid
JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
WHERE n.nspname = $1 AND t.typname = $2
ORDER BY e.enumsortorder";

const CHECK_CONSTRAINTS_SQL: &str = "\
SELECT c.conname::text,
       pg_get_constraintdef(c.oid)::text,
       ARRAY(
           SELECT a.attname::text
           FROM unnest(c.conkey) AS k(attnum)
           JOIN pg_catalog.pg_attribute a
             ON a.attrelid = c.conrelid AND a.attnum = k.attnum
       ) AS columns
FROM pg_catalog.pg_constraint c
JOIN pg_catalog.pg_class r ON r.oid = c.conrelid
JOIN pg_catalog.pg_namespace n ON n.oid = r.relnamespace
WHERE c.contype = 'c' AND n.nspname = $1 AND r.relname = $2
ORDER BY c.conname";

const UNIQUE_CONSTRAINTS_SQL: &str = "\
SELECT tc.constraint_name::text,
       array_agg(kcu.column_name::text ORDER BY kcu.ordinal_position) AS columns
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON tc.constraint_name = kcu.constraint_name
 AND tc.table_schema = kcu.table_schema
 AND tc.table_name = kcu.table_name
WHERE tc.constraint_type = 'UNIQUE'
  AND tc.table_schema = $1 AND tc.table_name = $2
GROUP BY tc.constraint_name
ORDER BY tc.constraint_name";

/// Live catalog reader; one small pool per run
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub async fn connect(database_url: &str) -> ForgeResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(ForgeError::catalog)?;
        tracing::debug!("Connected to catalog database");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CatalogSource for PgCatalog {
    async fn table_exists(&self, schema: &str, table: &str) -> ForgeResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(TABLE_EXISTS_SQL)
            .bind(schema)
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .map_err(ForgeError::catalog)?;
        Ok(exists)
    }

    async fn list_tables(&self, schema: &str) -> ForgeResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(LIST_TABLES_SQL)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(ForgeError::catalog)?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn columns(&self, schema: &str, table: &str) -> ForgeResult<Vec<RawColumn>> {
        let rows: Vec<(String, String, String, bool, Option<String>, Option<i32>)> =
            sqlx::query_as(COLUMNS_SQL)
                .bind(schema)
                .bind(table)
                .fetch_all(&self.pool)
                .await
                .map_err(ForgeError::catalog)?;

        Ok(rows
            .into_iter()
            .map(
                |(name, data_type, udt_name, is_nullable, default, max_length)| RawColumn {
                    name,
                    data_type,
                    udt_name,
                    is_nullable,
                    default,
                    max_length,
                },
            )
            .collect())
    }

    async fn primary_key(&self, schema: &str, table: &str) -> ForgeResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(PRIMARY_KEY_SQL)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(ForgeError::catalog)?;
        Ok(rows.into_iter().map(|(column,)| column).collect())
    }

    async fn foreign_keys(&self, schema: &str, table: &str) -> ForgeResult<Vec<RawForeignKey>> {
        let rows: Vec<(String, String, String, String)> = sqlx::query_as(FOREIGN_KEYS_SQL)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(ForgeError::catalog)?;

        Ok(rows
            .into_iter()
            .map(
                |(constraint_name, column, foreign_table, foreign_column)| RawForeignKey {
                    constraint_name,
                    column,
                    foreign_table,
                    foreign_column,
                },
            )
            .collect())
    }

    async fn enum_values(&self, schema: &str, type_name: &str) -> ForgeResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(ENUM_VALUES_SQL)
            .bind(schema)
            .bind(type_name)
            .fetch_all(&self.pool)
            .await
            .map_err(ForgeError::catalog)?;
        Ok(rows.into_iter().map(|(label,)| label).collect())
    }

    async fn check_constraints(
        &self,
        schema: &str,
        table: &str,
    ) -> ForgeResult<Vec<RawCheckConstraint>> {
        let rows: Vec<(String, String, Vec<String>)> = sqlx::query_as(CHECK_CONSTRAINTS_SQL)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(ForgeError::catalog)?;

        Ok(rows
            .into_iter()
            .map(|(name, definition, columns)| RawCheckConstraint {
                name,
                columns,
                definition,
            })
            .collect())
    }

    async fn unique_constraints(
        &self,
        schema: &str,
        table: &str,
    ) -> ForgeResult<Vec<RawUniqueConstraint>> {
        let rows: Vec<(String, Vec<String>)> = sqlx::query_as(UNIQUE_CONSTRAINTS_SQL)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(ForgeError::catalog)?;

        Ok(rows
            .into_iter()
            .map(|(name, columns)| RawUniqueConstraint { name, columns })
            .collect())
    }
}
