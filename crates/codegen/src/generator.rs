//! Orchestration: catalog read, model build, render, validate, write, roles.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use crudforge_core::naming::to_snake_case;
use crudforge_core::{ForgeError, ForgeResult, GeneratorConfig};
use crudforge_introspect::{CatalogSource, SchemaReader, TableSchema};
use serde::Serialize;
use serde_json::json;

use crate::format::{format, without_timestamp, GenerationHeader};
use crate::layout::{
    domain_dir, domain_index_files, existing_routes, flat_files, frontend_file, layer_modules,
    route_files, PlannedFile,
};
use crate::model::{build, route_table_candidates, GenerationContext, Layout, ModelOptions, Target, CORE_ROUTE};
use crate::renderer::{Renderer, TemplateId};
use crate::roles::{
    guard_direct_writes, migration_file_name, plan_migration, synthesize, DirectReport,
    MigrationPlan, RoleOptions, RoleOutput, RoleSet, RoleStore,
};
use crate::validate::{validate, OutputKind, Validation};
use crate::writer::{AtomicWriter, PendingFile, WriteOptions, WriteResult};

/// Asked before existing files are overwritten
pub trait Confirm {
    fn confirm_overwrite(&self, paths: &[PathBuf]) -> bool;
}

/// Refuses every overwrite; for runs without a terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyOverwrite;

impl Confirm for DenyOverwrite {
    fn confirm_overwrite(&self, _paths: &[PathBuf]) -> bool {
        false
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub model: ModelOptions,
    pub dry_run: bool,
    pub force: bool,
    pub no_roles: bool,
    pub direct_db: bool,
    pub migration_only: bool,
    pub multiple_roles: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleOutcome {
    /// Written, or skipped when an identical migration already exists
    Migration(WriteResult),
    Applied(DirectReport),
    /// Direct-mode dry run: what would be executed
    Statements(Vec<String>),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub files: Vec<WriteResult>,
    pub roles: Vec<RoleOutcome>,
    pub warnings: Vec<String>,
}

impl GenerationReport {
    /// Module files and migrations that could not be written
    pub fn failures(&self) -> Vec<&WriteResult> {
        let migrations = self.roles.iter().filter_map(|outcome| match outcome {
            RoleOutcome::Migration(result) => Some(result),
            _ => None,
        });
        self.files
            .iter()
            .chain(migrations)
            .filter(|r| !r.success)
            .collect()
    }

    /// `Err` naming every failed write, if there was one
    pub fn ensure_written(&self) -> ForgeResult<()> {
        let failures: Vec<(PathBuf, String)> = self
            .failures()
            .into_iter()
            .map(|r| {
                let cause = r.error.clone().unwrap_or_else(|| "not written".to_string());
                (r.path.clone(), cause)
            })
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ForgeError::WriteFailed { failures })
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub files: Vec<(PathBuf, Validation)>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.files.iter().all(|(_, v)| v.valid)
    }
}

/// Rendered files of one run plus the role sets they need
#[derive(Default)]
struct Batch {
    files: Vec<PendingFile>,
    indexes: BTreeSet<PathBuf>,
    role_sets: Vec<RoleSet>,
    migrations_dir: PathBuf,
    warnings: Vec<String>,
}

pub struct Generator<'a> {
    config: &'a GeneratorConfig,
    catalog: &'a dyn CatalogSource,
    confirm: &'a dyn Confirm,
    renderer: Renderer,
    writer: AtomicWriter,
    role_store: Option<Box<dyn RoleStore + 'a>>,
    started: DateTime<Utc>,
}

impl<'a> Generator<'a> {
    pub fn new(
        config: &'a GeneratorConfig,
        catalog: &'a dyn CatalogSource,
        confirm: &'a dyn Confirm,
    ) -> ForgeResult<Self> {
        Ok(Self {
            config,
            catalog,
            confirm,
            renderer: Renderer::new()?,
            writer: AtomicWriter::new(),
            role_store: None,
            started: Utc::now(),
        })
    }

    /// Store used by `--direct-db`
    pub fn with_role_store(mut self, store: Box<dyn RoleStore + 'a>) -> Self {
        self.role_store = Some(store);
        self
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    fn reader(&self) -> SchemaReader<'a> {
        SchemaReader::new(self.catalog, self.config.db_schema.clone())
    }

    /// Generate the module for one table
    pub async fn generate(&self, table: &str, options: &GenerateOptions) -> ForgeResult<GenerationReport> {
        let batch = self.plan_resource(table, options).await?;
        self.execute(batch, options).await
    }

    /// Generate a domain with one file per route in each layer
    pub async fn generate_domain(
        &self,
        domain: &str,
        routes: &[String],
        options: &GenerateOptions,
    ) -> ForgeResult<GenerationReport> {
        let mut routes: Vec<String> = routes.iter().map(|r| to_snake_case(r)).collect();
        if routes.is_empty() {
            routes.push(CORE_ROUTE.to_string());
        }
        let mut seen = BTreeSet::new();
        routes.retain(|r| seen.insert(r.clone()));

        let batch = self.plan_routes(domain, &routes, &routes, options).await?;
        self.execute(batch, options).await
    }

    /// Add a route to an existing domain
    pub async fn add_route(
        &self,
        domain: &str,
        route: &str,
        options: &GenerateOptions,
    ) -> ForgeResult<GenerationReport> {
        let dir = domain_dir(&self.config.output_dir, domain);
        if !dir.is_dir() {
            return Err(ForgeError::not_found("Domain", dir.display().to_string()));
        }
        let route = to_snake_case(route);
        let mut all = existing_routes(&dir)?;
        if !all.contains(&route) {
            all.push(route.clone());
        }

        let batch = self.plan_routes(domain, &[route], &all, options).await?;
        self.execute(batch, options).await
    }

    /// Render and validate every file of a resource without writing
    pub async fn validate_resource(
        &self,
        table: &str,
        options: &GenerateOptions,
    ) -> ForgeResult<ValidationReport> {
        let mut batch = self.plan_resource(table, options).await?;
        for set in &batch.role_sets {
            let path = batch
                .migrations_dir
                .join(migration_file_name(&set.resource, self.started));
            let text = self.render_migration(set)?;
            batch.files.push(PendingFile::new(path, text));
        }

        let files = batch
            .files
            .iter()
            .map(|file| {
                let validation = validate(&file.content, file.kind);
                if !validation.valid {
                    tracing::warn!("{} is invalid: {}", file.path.display(), validation.diagnostics.join("; "));
                }
                (file.path.clone(), validation)
            })
            .collect();
        Ok(ValidationReport { files })
    }

    async fn plan_resource(&self, table: &str, options: &GenerateOptions) -> ForgeResult<Batch> {
        let schema = self.reader().read_schema_enhanced(table).await?;

        let mut model = options.model.clone();
        let explicit_domain = model.domain.clone();
        if model.layout == Layout::Domain {
            if model.domain.is_none() {
                model.domain = Some(to_snake_case(table));
            }
            if model.routes.is_empty() {
                model.routes.push(CORE_ROUTE.to_string());
            }
        }
        let context = build(&schema, &model)?;
        let sources = vec![catalog_label(&schema)];

        let mut batch = Batch {
            migrations_dir: self.config.migrations_dir_for(explicit_domain.as_deref()),
            ..Batch::default()
        };

        if !options.migration_only {
            match (context.target, context.layout) {
                (Target::Frontend, _) => {
                    let file = frontend_file(&context, &self.config.frontend_dir);
                    batch.files.push(self.render_planned(&file, &context, &sources)?);
                }
                (Target::Backend, Layout::Flat) => {
                    for file in flat_files(&context, &self.config.output_dir) {
                        batch.files.push(self.render_planned(&file, &context, &sources)?);
                    }
                }
                (Target::Backend, Layout::Domain) => {
                    let domain = context.domain.clone().unwrap_or_else(|| to_snake_case(table));
                    let dir = domain_dir(&self.config.output_dir, &domain);
                    let planned = route_files(&context, &dir);
                    for file in &planned {
                        batch.files.push(self.render_planned(file, &context, &sources)?);
                    }
                    self.render_indexes(&dir, &domain, &planned, &sources, &mut batch)?;
                }
            }
        }

        if context.target == Target::Frontend {
            tracing::debug!("frontend target: no roles synthesized");
        } else if !options.no_roles {
            batch.role_sets.push(self.role_set(&context, options));
        }
        Ok(batch)
    }

    async fn plan_routes(
        &self,
        domain: &str,
        routes: &[String],
        all_routes: &[String],
        options: &GenerateOptions,
    ) -> ForgeResult<Batch> {
        let dir = domain_dir(&self.config.output_dir, domain);
        let mut batch = Batch {
            migrations_dir: self.config.migrations_dir_for(Some(domain)),
            ..Batch::default()
        };
        let mut planned_all = Vec::new();
        let mut sources = Vec::new();

        for route in routes {
            let table = self.resolve_route_table(domain, route, &mut batch.warnings).await?;
            let schema = self.reader().read_schema_enhanced(&table).await?;
            let model = ModelOptions {
                layout: Layout::Domain,
                target: Target::Backend,
                domain: Some(domain.to_string()),
                routes: all_routes.to_vec(),
                route: Some(route.clone()),
                ..options.model.clone()
            };
            let context = build(&schema, &model)?;
            let label = catalog_label(&schema);

            if !options.migration_only {
                let planned = route_files(&context, &dir);
                for file in &planned {
                    batch
                        .files
                        .push(self.render_planned(file, &context, std::slice::from_ref(&label))?);
                }
                planned_all.extend(planned);
            }
            if !options.no_roles
                && !batch
                    .role_sets
                    .iter()
                    .any(|s| s.resource == context.resource.permission)
            {
                batch.role_sets.push(self.role_set(&context, options));
            }
            sources.push(label);
        }

        if !options.migration_only {
            sources.dedup();
            self.render_indexes(&dir, domain, &planned_all, &sources, &mut batch)?;
        }
        Ok(batch)
    }

    /// Table behind a domain route: the domain's own table for `core`,
    /// otherwise the first existing candidate, falling back to the domain table
    async fn resolve_route_table(
        &self,
        domain: &str,
        route: &str,
        warnings: &mut Vec<String>,
    ) -> ForgeResult<String> {
        let domain_table = to_snake_case(domain.rsplit('/').next().unwrap_or(domain));
        if route == CORE_ROUTE {
            return Ok(domain_table);
        }
        for candidate in route_table_candidates(domain, route) {
            if self
                .catalog
                .table_exists(&self.config.db_schema, &candidate)
                .await?
            {
                tracing::debug!("route {} uses table {}", route, candidate);
                return Ok(candidate);
            }
        }
        let warning = format!(
            "no table found for route `{}`; using the domain table `{}`",
            route, domain_table
        );
        tracing::warn!("{}", warning);
        warnings.push(warning);
        Ok(domain_table)
    }

    fn role_set(&self, context: &GenerationContext, options: &GenerateOptions) -> RoleSet {
        synthesize(
            &context.resource.permission,
            RoleOptions {
                multiple_roles: options.multiple_roles,
            },
        )
    }

    fn header(&self, sources: &[String]) -> GenerationHeader {
        GenerationHeader::new(sources.to_vec()).at(self.started)
    }

    fn render_planned<T: Serialize>(
        &self,
        file: &PlannedFile,
        context: &T,
        sources: &[String],
    ) -> ForgeResult<PendingFile> {
        let kind = OutputKind::for_path(&file.path);
        let body = self.renderer.render(file.template, context)?;
        let text = self.header(sources).apply(&format(&body, kind), kind);
        Ok(PendingFile::new(&file.path, text))
    }

    fn render_indexes(
        &self,
        dir: &Path,
        domain: &str,
        planned: &[PlannedFile],
        sources: &[String],
        batch: &mut Batch,
    ) -> ForgeResult<()> {
        for index in domain_index_files(dir) {
            let pending = if index.template == TemplateId::DomainMod {
                self.render_planned(&index, &json!({ "domain": domain }), sources)?
            } else {
                let layer = index.path.parent().unwrap_or(dir);
                let modules = layer_modules(layer, planned)?;
                self.render_planned(&index, &json!({ "modules": modules }), sources)?
            };
            batch.indexes.insert(pending.path.clone());
            batch.files.push(pending);
        }
        Ok(())
    }

    fn render_migration(&self, set: &RoleSet) -> ForgeResult<String> {
        let body = set.render_migration(&self.renderer)?;
        let sources = vec![format!("roles {}", set.resource)];
        Ok(self
            .header(&sources)
            .apply(&format(&body, OutputKind::Sql), OutputKind::Sql))
    }

    fn role_output(
        &self,
        set: &RoleSet,
        migrations_dir: &Path,
        options: &GenerateOptions,
        report: &mut GenerationReport,
    ) -> ForgeResult<Option<RoleOutput>> {
        if options.direct_db {
            return Ok(Some(RoleOutput::DirectCatalog(set.statements())));
        }
        let text = self.render_migration(set)?;
        match plan_migration(migrations_dir, &set.resource, &text, self.started)? {
            MigrationPlan::Write(file) => Ok(Some(RoleOutput::Migration(file))),
            MigrationPlan::Unchanged(path) => {
                tracing::debug!("{} unchanged", path.display());
                report.roles.push(RoleOutcome::Migration(WriteResult::skipped(
                    path,
                    "roles already migrated",
                )));
                Ok(None)
            }
        }
    }

    /// Paths that exist with different content, excluding module indexes
    fn overwrites(&self, batch: &Batch) -> ForgeResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for file in &batch.files {
            if batch.indexes.contains(&file.path) {
                continue;
            }
            match fs::read_to_string(&file.path) {
                Ok(existing) if without_timestamp(&existing) != without_timestamp(&file.content) => {
                    paths.push(file.path.clone())
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(ForgeError::filesystem(&file.path, e)),
            }
        }
        Ok(paths)
    }

    async fn execute(&self, mut batch: Batch, options: &GenerateOptions) -> ForgeResult<GenerationReport> {
        let mut report = GenerationReport {
            warnings: std::mem::take(&mut batch.warnings),
            ..GenerationReport::default()
        };

        // Migrations join the batch first so a replaced one is confirmed like any file
        let mut direct = Vec::new();
        let mut migrations = BTreeSet::new();
        let role_sets = std::mem::take(&mut batch.role_sets);
        for set in role_sets {
            match self.role_output(&set, &batch.migrations_dir, options, &mut report)? {
                Some(RoleOutput::Migration(file)) => {
                    if let Some(previous) = &file.replaces {
                        tracing::warn!("role set changed; replacing {}", previous.display());
                    }
                    migrations.insert(file.path.clone());
                    batch.files.push(PendingFile::new(file.path, file.content));
                }
                Some(RoleOutput::DirectCatalog(statements)) => direct.push((set, statements)),
                None => {}
            }
        }

        let overwrites = self.overwrites(&batch)?;
        if !overwrites.is_empty() {
            if options.dry_run {
                for path in &overwrites {
                    report
                        .warnings
                        .push(format!("would overwrite {}", path.display()));
                }
            } else if !options.force && !self.confirm.confirm_overwrite(&overwrites) {
                return Err(ForgeError::Conflict { paths: overwrites });
            }
        }

        if !direct.is_empty() && !options.dry_run {
            guard_direct_writes(self.config.environment)?;
            if self.role_store.is_none() {
                return Err(ForgeError::unsafe_operation(
                    "direct role writes need a database connection",
                ));
            }
        }

        let write_options = WriteOptions {
            dry_run: options.dry_run,
            ..WriteOptions::default()
        };
        for result in self.writer.write_batch(&batch.files, write_options)? {
            if migrations.contains(&result.path) {
                report.roles.push(RoleOutcome::Migration(result));
            } else {
                report.files.push(result);
            }
        }

        for (set, statements) in direct {
            if options.dry_run {
                report.roles.push(RoleOutcome::Statements(statements));
                continue;
            }
            if let Some(store) = &self.role_store {
                report.roles.push(RoleOutcome::Applied(store.apply(&set).await?));
            }
        }

        let failed = report.failures().len();
        if failed > 0 {
            report
                .warnings
                .push(format!("{} file(s) could not be written", failed));
        }
        Ok(report)
    }
}

fn catalog_label(schema: &TableSchema) -> String {
    format!("catalog {}.{}", schema.schema, schema.name)
}
