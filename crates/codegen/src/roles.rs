//! Permission and role synthesis for generated resources.
//!
//! Every resource gets four permissions, `<resource>.<action>`, and either a
//! single role holding all of them or an admin/editor/viewer split. The set is
//! delivered as a reversible SQL migration (the default) or written straight
//! into the catalog through a [`RoleStore`].

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use crudforge_core::{Environment, ForgeError, ForgeResult};
use serde::Serialize;
use sqlx::PgPool;

use crate::escape::sql_str;
use crate::format::without_timestamp;
use crate::renderer::{Renderer, TemplateId};

/// Actions every resource grants permissions for, in declaration order
pub const ACTIONS: [&str; 4] = ["create", "read", "update", "delete"];

const EDITOR_ACTIONS: [&str; 3] = ["create", "read", "update"];
const VIEWER_ACTIONS: [&str; 1] = ["read"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleOptions {
    pub multiple_roles: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permission {
    pub name: String,
    pub resource: String,
    pub action: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub name: String,
    pub description: String,
    /// Permission names granted to the role
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleSet {
    pub resource: String,
    pub permissions: Vec<Permission>,
    pub roles: Vec<Role>,
}

#[derive(Serialize)]
struct MigrationContext<'a> {
    resource: &'a str,
    permissions: &'a [Permission],
    roles: &'a [Role],
    role_list: String,
    permission_list: String,
}

pub fn synthesize(resource: &str, options: RoleOptions) -> RoleSet {
    let permission_name = |action: &str| format!("{}.{}", resource, action);
    let permissions = ACTIONS
        .iter()
        .map(|action| Permission {
            name: permission_name(action),
            resource: resource.to_string(),
            action: action.to_string(),
            description: format!("{} {}", capitalize(action), resource),
        })
        .collect();

    let grant = |actions: &[&str]| actions.iter().map(|a| permission_name(a)).collect::<Vec<_>>();
    let roles = if options.multiple_roles {
        vec![
            Role {
                name: format!("{}_admin", resource),
                description: format!("Full access to {}", resource),
                permissions: grant(&ACTIONS),
            },
            Role {
                name: format!("{}_editor", resource),
                description: format!("Create, read and update {}", resource),
                permissions: grant(&EDITOR_ACTIONS),
            },
            Role {
                name: format!("{}_viewer", resource),
                description: format!("Read-only access to {}", resource),
                permissions: grant(&VIEWER_ACTIONS),
            },
        ]
    } else {
        vec![Role {
            name: resource.to_string(),
            description: format!("Access to {}", resource),
            permissions: grant(&ACTIONS),
        }]
    };

    RoleSet {
        resource: resource.to_string(),
        permissions,
        roles,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn sql_list<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.map(sql_str).collect::<Vec<_>>().join(", ")
}

impl RoleSet {
    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }

    /// Unformatted migration body with its up and down sections
    pub fn render_migration(&self, renderer: &Renderer) -> ForgeResult<String> {
        let context = MigrationContext {
            resource: &self.resource,
            permissions: &self.permissions,
            roles: &self.roles,
            role_list: sql_list(self.roles.iter().map(|r| r.name.as_str())),
            permission_list: sql_list(self.permissions.iter().map(|p| p.name.as_str())),
        };
        renderer.render(TemplateId::PermissionsMigration, &context)
    }

    /// Statements the direct catalog mode executes, each guarded so rows that
    /// already exist are left alone
    pub fn statements(&self) -> Vec<String> {
        let mut statements = Vec::new();
        for p in &self.permissions {
            statements.push(format!(
                "INSERT INTO permissions (name, resource, action, description) SELECT {}, {}, {}, {} \
                 WHERE NOT EXISTS (SELECT 1 FROM permissions WHERE name = {})",
                sql_str(&p.name),
                sql_str(&p.resource),
                sql_str(&p.action),
                sql_str(&p.description),
                sql_str(&p.name),
            ));
        }
        for r in &self.roles {
            statements.push(format!(
                "INSERT INTO roles (name, description) SELECT {}, {} \
                 WHERE NOT EXISTS (SELECT 1 FROM roles WHERE name = {})",
                sql_str(&r.name),
                sql_str(&r.description),
                sql_str(&r.name),
            ));
        }
        for r in &self.roles {
            for permission in &r.permissions {
                statements.push(format!(
                    "INSERT INTO role_permissions (role_id, permission_id) SELECT r.id, p.id \
                     FROM roles r, permissions p WHERE r.name = {} AND p.name = {} \
                     AND NOT EXISTS (SELECT 1 FROM role_permissions rp \
                     WHERE rp.role_id = r.id AND rp.permission_id = p.id)",
                    sql_str(&r.name),
                    sql_str(permission),
                ));
            }
        }
        statements
    }
}

/// A permissions migration ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub path: PathBuf,
    pub content: String,
    /// An earlier migration for the same resource this one overwrites
    pub replaces: Option<PathBuf>,
}

/// How a role set leaves the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleOutput {
    Migration(MigrationFile),
    /// Unsafe: statements applied directly to the configured database
    DirectCatalog(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationPlan {
    Write(MigrationFile),
    /// An identical migration already exists
    Unchanged(PathBuf),
}

pub fn migration_file_name(resource: &str, at: DateTime<Utc>) -> String {
    format!("{}_add_{}_permissions.sql", at.format("%Y%m%d_%H%M%S"), resource)
}

/// Existing migrations for `resource`, oldest first
fn existing_migrations(dir: &Path, resource: &str) -> ForgeResult<Vec<PathBuf>> {
    let suffix = format!("_add_{}_permissions.sql", resource);
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ForgeError::filesystem(dir, e)),
    };
    let mut found = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ForgeError::filesystem(dir, e))?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(&suffix) && n.len() > suffix.len())
            .unwrap_or(false);
        if matches {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Decide where the migration goes. An identical earlier migration makes this
/// a no-op; a different one is replaced in place, and the caller treats that
/// replacement as an overwrite.
pub fn plan_migration(
    dir: &Path,
    resource: &str,
    content: &str,
    at: DateTime<Utc>,
) -> ForgeResult<MigrationPlan> {
    let existing = existing_migrations(dir, resource)?;
    if let Some(latest) = existing.last() {
        let current =
            fs::read_to_string(latest).map_err(|e| ForgeError::filesystem(latest, e))?;
        if without_timestamp(&current) == without_timestamp(content) {
            return Ok(MigrationPlan::Unchanged(latest.clone()));
        }
        tracing::debug!("{} differs from the new role set", latest.display());
        return Ok(MigrationPlan::Write(MigrationFile {
            path: latest.clone(),
            content: content.to_string(),
            replaces: Some(latest.clone()),
        }));
    }

    let mut at = at;
    let mut path = dir.join(migration_file_name(resource, at));
    while path.exists() {
        at += Duration::seconds(1);
        path = dir.join(migration_file_name(resource, at));
    }
    Ok(MigrationPlan::Write(MigrationFile {
        path,
        content: content.to_string(),
        replaces: None,
    }))
}

/// Direct catalog writes are refused in production and warned about elsewhere
pub fn guard_direct_writes(environment: Environment) -> ForgeResult<()> {
    if environment.is_production() {
        return Err(ForgeError::unsafe_operation(
            "direct role writes are disabled in production; generate a migration instead",
        ));
    }
    if !environment.is_development() {
        tracing::warn!("writing roles directly to the {:?} database", environment);
    }
    Ok(())
}

/// Rows a direct write inserted and the ones it found already present
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectReport {
    pub inserted: Vec<String>,
    pub skipped: Vec<String>,
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn apply(&self, set: &RoleSet) -> ForgeResult<DirectReport>;
}

/// [`RoleStore`] over the `permissions`, `roles` and `role_permissions` tables
pub struct PgRoleStore {
    pool: PgPool,
}

impl PgRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn apply(&self, set: &RoleSet) -> ForgeResult<DirectReport> {
        let mut report = DirectReport::default();
        let mut tx = self.pool.begin().await.map_err(ForgeError::catalog)?;

        for p in &set.permissions {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM permissions WHERE name = $1)")
                    .bind(&p.name)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(ForgeError::catalog)?;
            if exists {
                report.skipped.push(format!("permission {}", p.name));
                continue;
            }
            sqlx::query(
                "INSERT INTO permissions (name, resource, action, description) VALUES ($1, $2, $3, $4)",
            )
            .bind(&p.name)
            .bind(&p.resource)
            .bind(&p.action)
            .bind(&p.description)
            .execute(&mut *tx)
            .await
            .map_err(ForgeError::catalog)?;
            report.inserted.push(format!("permission {}", p.name));
        }

        for r in &set.roles {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roles WHERE name = $1)")
                    .bind(&r.name)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(ForgeError::catalog)?;
            if exists {
                report.skipped.push(format!("role {}", r.name));
                continue;
            }
            sqlx::query("INSERT INTO roles (name, description) VALUES ($1, $2)")
                .bind(&r.name)
                .bind(&r.description)
                .execute(&mut *tx)
                .await
                .map_err(ForgeError::catalog)?;
            report.inserted.push(format!("role {}", r.name));
        }

        for r in &set.roles {
            for permission in &r.permissions {
                let inserted = sqlx::query(
                    "INSERT INTO role_permissions (role_id, permission_id) \
                     SELECT r.id, p.id FROM roles r, permissions p \
                     WHERE r.name = $1 AND p.name = $2 \
                     AND NOT EXISTS (SELECT 1 FROM role_permissions rp \
                     WHERE rp.role_id = r.id AND rp.permission_id = p.id)",
                )
                .bind(&r.name)
                .bind(permission)
                .execute(&mut *tx)
                .await
                .map_err(ForgeError::catalog)?
                .rows_affected();
                let label = format!("grant {} -> {}", permission, r.name);
                if inserted > 0 {
                    report.inserted.push(label);
                } else {
                    report.skipped.push(label);
                }
            }
        }

        tx.commit().await.map_err(ForgeError::catalog)?;
        tracing::info!(
            "applied roles for {}: {} inserted, {} already present",
            set.resource,
            report.inserted.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{migration_sections, validate, OutputKind};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
    }

    #[test]
    fn test_multiple_roles_split_admin_editor_viewer() {
        let set = synthesize("widgets", RoleOptions { multiple_roles: true });
        assert_eq!(set.permissions.len(), 4);
        assert_eq!(set.roles.len(), 3);

        let editor = set.role("widgets_editor").unwrap();
        assert_eq!(
            editor.permissions,
            ["widgets.create", "widgets.read", "widgets.update"]
        );
        assert_eq!(set.role("widgets_viewer").unwrap().permissions, ["widgets.read"]);
        assert_eq!(set.role("widgets_admin").unwrap().permissions.len(), 4);
        assert_eq!(set.permissions[0].description, "Create widgets");
    }

    #[test]
    fn test_single_role_holds_everything() {
        let set = synthesize("widgets", RoleOptions::default());
        assert_eq!(set.roles.len(), 1);
        assert_eq!(set.roles[0].name, "widgets");
        assert_eq!(set.roles[0].permissions.len(), 4);
    }

    #[test]
    fn test_migration_is_valid_and_reversible() {
        let set = synthesize("widgets", RoleOptions { multiple_roles: true });
        let sql = set.render_migration(&Renderer::new().unwrap()).unwrap();
        assert!(validate(&sql, OutputKind::Sql).valid, "{}", sql);

        let (up, down) = migration_sections(&sql);
        assert_eq!(up.matches("ON CONFLICT (name) DO NOTHING").count(), 7);
        assert_eq!(up.matches("INSERT INTO role_permissions").count(), 4 + 3 + 1);
        for name in ["'widgets.create'", "'widgets.delete'", "'widgets_viewer'"] {
            assert!(down.contains(name), "down section misses {}", name);
        }
    }

    #[test]
    fn test_plan_names_new_migration() {
        let dir = TempDir::new().unwrap();
        let plan = plan_migration(dir.path(), "widgets", "-- x\n", at()).unwrap();
        match plan {
            MigrationPlan::Write(file) => {
                assert_eq!(
                    file.path,
                    dir.path().join("20260304_050607_add_widgets_permissions.sql")
                );
                assert!(file.replaces.is_none());
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_plan_detects_identical_and_replaced() {
        let dir = TempDir::new().unwrap();
        let existing = dir.path().join("20250101_000000_add_widgets_permissions.sql");
        fs::write(&existing, "-- Generated at: 2025-01-01T00:00:00Z\nSELECT 1;\n").unwrap();

        let same = "-- Generated at: 2026-03-04T05:06:07Z\nSELECT 1;\n";
        assert_eq!(
            plan_migration(dir.path(), "widgets", same, at()).unwrap(),
            MigrationPlan::Unchanged(existing.clone())
        );

        let different = "-- Generated at: 2026-03-04T05:06:07Z\nSELECT 2;\n";
        match plan_migration(dir.path(), "widgets", different, at()).unwrap() {
            MigrationPlan::Write(file) => {
                assert_eq!(file.path, existing);
                assert_eq!(file.replaces, Some(existing));
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_other_resources_do_not_conflict() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("20250101_000000_add_gadgets_permissions.sql"),
            "SELECT 1;\n",
        )
        .unwrap();
        let plan = plan_migration(dir.path(), "widgets", "SELECT 2;\n", at()).unwrap();
        assert!(matches!(plan, MigrationPlan::Write(_)));
    }

    #[test]
    fn test_direct_writes_refused_in_production() {
        let err = guard_direct_writes(Environment::Production).unwrap_err();
        assert!(matches!(err, ForgeError::Unsafe { .. }));
        assert!(guard_direct_writes(Environment::Development).is_ok());
    }

    #[test]
    fn test_direct_statements_are_guarded() {
        let set = synthesize("widgets", RoleOptions::default());
        let statements = set.statements();
        assert_eq!(statements.len(), 4 + 1 + 4);
        assert!(statements.iter().all(|s| s.contains("NOT EXISTS")));
    }
}
