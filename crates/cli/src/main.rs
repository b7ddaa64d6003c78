mod commands;
mod interactive;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;
use crudforge_core::config::provenance;
use crudforge_core::{ForgeError, GeneratorConfig};
use tracing_subscriber::EnvFilter;

use commands::generate::{DomainArgs, GenerateArgs, RouteArgs, ValidateArgs};
use commands::CatalogHandle;

#[derive(Parser)]
#[command(name = "crudforge", version)]
#[command(about = "Generate CRUD modules and role migrations from a PostgreSQL catalog")]
struct Cli {
    /// Configuration file (defaults to ./crudforge.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read the catalog from a YAML snapshot instead of the database
    #[arg(long, global = true)]
    catalog_snapshot: Option<PathBuf>,

    /// PostgreSQL schema to read
    #[arg(long, global = true)]
    schema: Option<String>,

    /// Directory generated modules are written under
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the module for one table
    Generate(GenerateArgs),

    /// Generate a domain with one file per route in each layer
    Domain(DomainArgs),

    /// Add a route to an existing domain
    Route(RouteArgs),

    /// List the tables of the configured schema
    ListTables,

    /// Render and validate a resource without writing anything
    Validate(ValidateArgs),

    /// Show the feature packages
    Packages,

    /// Regenerate the reference-table module from the configured sources
    Sync {
        #[arg(long)]
        dry_run: bool,
    },
}

fn load_config(cli: &Cli) -> Result<GeneratorConfig, ForgeError> {
    let mut config = GeneratorConfig::load(cli.config.as_deref())?;
    if let Some(schema) = &cli.schema {
        config = config.with_schema(schema.clone());
    }
    if let Some(dir) = &cli.output_dir {
        config = config.with_output_dir(dir.clone());
    }
    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &GeneratorConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    init_tracing(&config, cli.verbose);
    for line in provenance(config.config_sources()) {
        tracing::debug!("config {}", line);
    }

    match &cli.command {
        Commands::Packages => return commands::reference::packages(&config),
        Commands::Sync { dry_run } => return commands::reference::sync(&config, *dry_run),
        _ => {}
    }

    let catalog = CatalogHandle::open(&config, cli.catalog_snapshot.as_deref()).await?;
    let confirm = interactive::confirmer();
    let result = match &cli.command {
        Commands::Generate(args) => {
            commands::generate::run(args, &config, &catalog, confirm.as_ref()).await
        }
        Commands::Domain(args) => {
            commands::generate::domain(args, &config, &catalog, confirm.as_ref()).await
        }
        Commands::Route(args) => {
            commands::generate::route(args, &config, &catalog, confirm.as_ref()).await
        }
        Commands::Validate(args) => {
            commands::generate::validate(args, &config, &catalog, confirm.as_ref()).await
        }
        Commands::ListTables => commands::catalog::list_tables(&config, &catalog).await,
        Commands::Packages | Commands::Sync { .. } => Ok(()),
    };
    catalog.close().await;
    result
}

fn exit_code(error: &anyhow::Error) -> u8 {
    error
        .downcast_ref::<ForgeError>()
        .map(ForgeError::exit_code)
        .unwrap_or(1)
        .clamp(1, 255) as u8
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{} {:#}", style("error:").red().bold(), error);
            if let Some(ForgeError::Conflict { paths }) = error.downcast_ref::<ForgeError>() {
                eprintln!("  rerun with --force to overwrite:");
                for path in paths {
                    eprintln!("    {}", path.display());
                }
            }
            ExitCode::from(exit_code(&error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_flags_parse() {
        let cli = Cli::try_parse_from([
            "crudforge",
            "generate",
            "widgets",
            "--package",
            "enterprise",
            "--flat",
            "--multiple-roles",
            "--schema",
            "shop",
        ])
        .unwrap();
        assert_eq!(cli.schema.as_deref(), Some("shop"));
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.resource, "widgets");
                assert!(args.flat);
                assert!(args.flags.multiple_roles);
                assert_eq!(args.flags.package.as_str(), "enterprise");
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_domain_routes_split_on_commas() {
        let cli =
            Cli::try_parse_from(["crudforge", "domain", "inventory", "--routes", "core,stock"])
                .unwrap();
        match cli.command {
            Commands::Domain(args) => assert_eq!(args.routes, ["core", "stock"]),
            _ => panic!("expected domain"),
        }
    }

    #[test]
    fn test_unknown_package_is_rejected() {
        assert!(Cli::try_parse_from(["crudforge", "generate", "widgets", "--package", "gold"])
            .is_err());
    }

    #[test]
    fn test_exit_codes_follow_error_kind() {
        let not_found = anyhow::Error::from(ForgeError::not_found("Table", "public.gadgets"));
        assert_eq!(exit_code(&not_found), 2);
        let conflict = anyhow::Error::from(ForgeError::Conflict { paths: vec![] });
        assert_eq!(exit_code(&conflict), 4);
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
    }
}
