#![allow(dead_code)]

use std::path::Path;

use crudforge_core::GeneratorConfig;
use crudforge_introspect::catalog::RawColumn;
use crudforge_introspect::{SnapshotCatalog, SnapshotTable};

/// departments, widgets and a small inventory domain
pub fn catalog() -> SnapshotCatalog {
    SnapshotCatalog::new()
        .with_table(
            "departments",
            SnapshotTable::new(["id"])
                .column(RawColumn::typed("id", "int4"))
                .column(RawColumn::typed("name", "varchar").with_max_length(80)),
        )
        .with_table(
            "widgets",
            SnapshotTable::new(["id"])
                .column(RawColumn::typed("id", "uuid").with_default("gen_random_uuid()"))
                .column(RawColumn::typed("name", "varchar").with_max_length(120))
                .column(RawColumn::typed("contact_email", "varchar").nullable())
                .column(
                    RawColumn::enumerated("status", "widget_status")
                        .with_default("'draft'::widget_status"),
                )
                .column(RawColumn::typed("price", "numeric").nullable())
                .column(RawColumn::typed("department_id", "int4"))
                .column(RawColumn::typed("description", "text").nullable())
                .column(RawColumn::typed("is_active", "bool").with_default("true"))
                .column(RawColumn::typed("created_at", "timestamptz").with_default("now()"))
                .column(RawColumn::typed("updated_at", "timestamptz").with_default("now()"))
                .column(RawColumn::typed("deleted_at", "timestamptz").nullable())
                .foreign_key("department_id", "departments", "id")
                .unique("widgets_name_key", ["name"]),
        )
        .with_enum("widget_status", ["draft", "in-stock", "retired"])
        .with_table(
            "inventory",
            SnapshotTable::new(["id"])
                .column(RawColumn::typed("id", "int8"))
                .column(RawColumn::typed("title", "varchar"))
                .column(RawColumn::typed("created_at", "timestamptz").with_default("now()")),
        )
        .with_table(
            "inventory_stock",
            SnapshotTable::new(["id"])
                .column(RawColumn::typed("id", "int8"))
                .column(RawColumn::typed("sku", "varchar").with_max_length(32))
                .column(RawColumn::typed("quantity", "int4").with_default("0")),
        )
}

/// Configuration writing every output under `root`
pub fn config(root: &Path) -> GeneratorConfig {
    let mut config = GeneratorConfig::new();
    config.output_dir = root.join("src/modules");
    config.frontend_dir = root.join("frontend/src/clients");
    config.migrations_dir = root.join("migrations");
    config
}

/// Every regular file under `dir`, relative and sorted
pub fn files_under(dir: &Path) -> Vec<String> {
    let mut found = Vec::new();
    collect(dir, dir, &mut found);
    found.sort();
    found
}

fn collect(root: &Path, dir: &Path, found: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(root, &path, found);
        } else if let Ok(relative) = path.strip_prefix(root) {
            found.push(relative.display().to_string());
        }
    }
}
