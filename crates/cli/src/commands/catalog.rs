use console::style;
use crudforge_core::GeneratorConfig;
use crudforge_introspect::SchemaReader;

use super::CatalogHandle;

pub async fn list_tables(config: &GeneratorConfig, catalog: &CatalogHandle) -> anyhow::Result<()> {
    let reader = SchemaReader::new(catalog.source(), config.db_schema.clone());
    let tables = reader.list_tables().await?;

    if tables.is_empty() {
        println!(
            "{} no tables in schema {}",
            style("!").yellow(),
            style(&config.db_schema).bold()
        );
        return Ok(());
    }

    println!(
        "{} ({} tables)",
        style(&config.db_schema).bold().cyan(),
        tables.len()
    );
    for table in tables {
        println!("  {}", table);
    }
    Ok(())
}
