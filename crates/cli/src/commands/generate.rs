use clap::Args;
use console::style;
use crudforge_codegen::{
    Confirm, GenerateOptions, GenerationReport, Generator, Layout, ModelOptions, PackageTier,
    Target,
};
use crudforge_core::{ForgeError, ForgeResult, GeneratorConfig};

use super::CatalogHandle;
use crate::output::print_report;

/// Flags shared by every command that writes files
#[derive(Args, Debug, Clone, Default)]
pub struct WriteFlags {
    /// Feature package
    #[arg(long, short, default_value = "standard")]
    pub package: PackageTier,

    /// Emit event hooks alongside the service
    #[arg(long)]
    pub with_events: bool,

    /// Emit the bulk import module even for the standard package
    #[arg(long)]
    pub with_import: bool,

    /// Show what would be written without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,

    /// Overwrite locally edited files without asking
    #[arg(long)]
    pub force: bool,

    /// Skip role and permission synthesis
    #[arg(long)]
    pub no_roles: bool,

    /// Insert roles into the database instead of writing a migration
    #[arg(long)]
    pub direct_db: bool,

    /// Only write the role migration
    #[arg(long)]
    pub migration_only: bool,

    /// admin/editor/viewer roles instead of a single one
    #[arg(long)]
    pub multiple_roles: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl WriteFlags {
    fn options(&self, model: ModelOptions) -> GenerateOptions {
        GenerateOptions {
            model: ModelOptions {
                package: self.package,
                with_events: self.with_events,
                with_import: self.with_import,
                ..model
            },
            dry_run: self.dry_run,
            force: self.force,
            no_roles: self.no_roles,
            direct_db: self.direct_db,
            migration_only: self.migration_only,
            multiple_roles: self.multiple_roles,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Table to generate a module for
    pub resource: String,

    /// backend module or frontend client
    #[arg(long, short, default_value = "backend")]
    pub target: Target,

    /// One directory per resource instead of the domain layout
    #[arg(long, conflicts_with = "domain")]
    pub flat: bool,

    /// Domain path the resource belongs to (`inventory` or `inventory/stock`)
    #[arg(long)]
    pub domain: Option<String>,

    #[command(flatten)]
    pub flags: WriteFlags,
}

#[derive(Args, Debug, Clone)]
pub struct DomainArgs {
    /// Domain path
    pub name: String,

    /// Routes of the domain, comma separated
    #[arg(long, value_delimiter = ',')]
    pub routes: Vec<String>,

    #[command(flatten)]
    pub flags: WriteFlags,
}

#[derive(Args, Debug, Clone)]
pub struct RouteArgs {
    /// `<domain>/<route>`
    pub path: String,

    #[command(flatten)]
    pub flags: WriteFlags,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    pub resource: String,

    #[arg(long, short, default_value = "standard")]
    pub package: PackageTier,

    #[arg(long)]
    pub flat: bool,

    #[arg(long)]
    pub with_events: bool,

    #[arg(long)]
    pub multiple_roles: bool,
}

fn generator<'a>(
    config: &'a GeneratorConfig,
    catalog: &'a CatalogHandle,
    confirm: &'a dyn Confirm,
    flags: &WriteFlags,
) -> ForgeResult<Generator<'a>> {
    let generator = Generator::new(config, catalog.source(), confirm)?;
    if !flags.direct_db {
        return Ok(generator);
    }
    Ok(match catalog.role_store() {
        Some(store) => generator.with_role_store(Box::new(store)),
        None => generator,
    })
}

/// Print the report; any file that failed to write fails the command
fn finish(report: &GenerationReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_report(report);
    }
    report.ensure_written()?;
    Ok(())
}

pub async fn run(
    args: &GenerateArgs,
    config: &GeneratorConfig,
    catalog: &CatalogHandle,
    confirm: &dyn Confirm,
) -> anyhow::Result<()> {
    let model = ModelOptions {
        target: args.target,
        layout: if args.flat { Layout::Flat } else { Layout::Domain },
        domain: args.domain.clone(),
        ..ModelOptions::default()
    };
    let options = args.flags.options(model);

    if !args.flags.json {
        println!(
            "{} {}",
            style("Generating").bold().cyan(),
            style(&args.resource).bold()
        );
    }
    let report = generator(config, catalog, confirm, &args.flags)?
        .generate(&args.resource, &options)
        .await?;
    finish(&report, args.flags.json)
}

pub async fn domain(
    args: &DomainArgs,
    config: &GeneratorConfig,
    catalog: &CatalogHandle,
    confirm: &dyn Confirm,
) -> anyhow::Result<()> {
    let options = args.flags.options(ModelOptions::default());
    if !args.flags.json {
        println!(
            "{} domain {}",
            style("Generating").bold().cyan(),
            style(&args.name).bold()
        );
    }
    let report = generator(config, catalog, confirm, &args.flags)?
        .generate_domain(&args.name, &args.routes, &options)
        .await?;
    finish(&report, args.flags.json)
}

/// Split `inventory/stock/audit` into the domain `inventory/stock` and the
/// route `audit`
pub fn split_route_path(path: &str) -> ForgeResult<(&str, &str)> {
    match path.trim_matches('/').rsplit_once('/') {
        Some((domain, route)) if !domain.is_empty() && !route.is_empty() => Ok((domain, route)),
        _ => Err(ForgeError::validation(
            path,
            vec!["expected <domain>/<route>".to_string()],
        )),
    }
}

pub async fn route(
    args: &RouteArgs,
    config: &GeneratorConfig,
    catalog: &CatalogHandle,
    confirm: &dyn Confirm,
) -> anyhow::Result<()> {
    let (domain, route) = split_route_path(&args.path)?;
    let options = args.flags.options(ModelOptions::default());
    if !args.flags.json {
        println!(
            "{} route {} to {}",
            style("Adding").bold().cyan(),
            style(route).bold(),
            style(domain).bold()
        );
    }
    let report = generator(config, catalog, confirm, &args.flags)?
        .add_route(domain, route, &options)
        .await?;
    finish(&report, args.flags.json)
}

pub async fn validate(
    args: &ValidateArgs,
    config: &GeneratorConfig,
    catalog: &CatalogHandle,
    confirm: &dyn Confirm,
) -> anyhow::Result<()> {
    let options = GenerateOptions {
        model: ModelOptions {
            package: args.package,
            layout: if args.flat { Layout::Flat } else { Layout::Domain },
            with_events: args.with_events,
            ..ModelOptions::default()
        },
        multiple_roles: args.multiple_roles,
        ..GenerateOptions::default()
    };
    let report = Generator::new(config, catalog.source(), confirm)?
        .validate_resource(&args.resource, &options)
        .await?;

    let mut first_invalid = None;
    for (path, validation) in &report.files {
        if validation.valid {
            println!("  {} {}", style("✓").green(), path.display());
        } else {
            println!("  {} {}", style("✗").red().bold(), path.display());
            for diagnostic in &validation.diagnostics {
                println!("      {}", style(diagnostic).red());
            }
            first_invalid.get_or_insert((path, validation));
        }
        for warning in &validation.warnings {
            println!("      {} {}", style("!").yellow(), warning);
        }
    }

    match first_invalid {
        Some((path, validation)) => {
            Err(ForgeError::validation(path, validation.diagnostics.clone()).into())
        }
        None => {
            println!();
            println!(
                "{} {} file(s) valid",
                style("Done:").bold(),
                report.files.len()
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_route_path() {
        assert_eq!(split_route_path("inventory/stock").unwrap(), ("inventory", "stock"));
        assert_eq!(
            split_route_path("/inventory/stock/audit/").unwrap(),
            ("inventory/stock", "audit")
        );
    }

    #[test]
    fn test_route_path_needs_both_parts() {
        assert!(split_route_path("inventory").unwrap_err().is_validation());
        assert!(split_route_path("/audit").is_err());
    }

    #[test]
    fn test_flags_carry_into_options() {
        let flags = WriteFlags {
            package: PackageTier::Full,
            dry_run: true,
            multiple_roles: true,
            ..WriteFlags::default()
        };
        let options = flags.options(ModelOptions {
            layout: Layout::Flat,
            ..ModelOptions::default()
        });
        assert_eq!(options.model.package, PackageTier::Full);
        assert_eq!(options.model.layout, Layout::Flat);
        assert!(options.dry_run);
        assert!(options.multiple_roles);
        assert!(!options.force);
    }
}
