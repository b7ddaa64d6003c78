use console::style;
use crudforge_codegen::model::build_reference;
use crudforge_codegen::{ReferenceSync, Renderer, WriteOptions};
use crudforge_core::GeneratorConfig;
use crudforge_introspect::extract_all;

use crate::output::{print_warnings, status_line};

/// Feature packages, from the reference sources when configured
pub fn packages(config: &GeneratorConfig) -> anyhow::Result<()> {
    let bundle = extract_all(&config.reference.sources, &config.reference.docs)?;
    let model = build_reference(&bundle);

    for package in &model.packages {
        let placeholder = model.placeholder_packages.contains(&package.name);
        println!(
            "{}{}",
            style(&package.name).bold().cyan(),
            if placeholder {
                style(" (undocumented)").dim().to_string()
            } else {
                String::new()
            }
        );
        println!("  {}", package.description);
        if !package.features.is_empty() {
            println!("  features: {}", package.features.join(", "));
        }
        for use_case in &package.use_cases {
            println!("  - {}", use_case);
        }
        println!("  {}", style(&package.command).dim());
        println!();
    }
    Ok(())
}

/// Regenerate the reference-table module
pub fn sync(config: &GeneratorConfig, dry_run: bool) -> anyhow::Result<()> {
    let reference = &config.reference;
    if reference.sources.is_empty() {
        tracing::warn!("no reference sources configured; only placeholders will be written");
    }

    let renderer = Renderer::new()?;
    let options = WriteOptions {
        dry_run,
        ..WriteOptions::default()
    };
    let report = ReferenceSync::new(&renderer).run(
        &reference.sources,
        &reference.docs,
        &reference.output,
        options,
    )?;

    println!("  {}", status_line(&report.result));
    println!(
        "  {} commands, {} patterns, {} packages",
        report.commands, report.patterns, report.packages
    );

    let mut warnings: Vec<String> = report
        .placeholders
        .iter()
        .map(|name| format!("package `{}` has no source; wrote a placeholder", name))
        .collect();
    warnings.extend(report.rejected.iter().map(|(origin, rejection)| {
        format!(
            "{}: rejected {} `{}`: {}",
            origin.display(),
            rejection.kind,
            rejection.item,
            rejection.errors.join("; ")
        )
    }));
    print_warnings(&warnings);
    Ok(())
}
