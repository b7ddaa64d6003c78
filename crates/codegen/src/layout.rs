//! Where each generated file lives for the flat and domain layouts.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crudforge_core::naming::{escape_rust_keyword, to_snake_case};
use crudforge_core::{ForgeError, ForgeResult};

use crate::model::GenerationContext;
use crate::renderer::TemplateId;

/// Layer directories of a domain, one file per route in each
pub const DOMAIN_LAYERS: [&str; 6] = [
    "controllers",
    "repositories",
    "routes",
    "schemas",
    "services",
    "types",
];

/// A file the generator will render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub path: PathBuf,
    pub template: TemplateId,
    /// Module index rebuilt from the directory contents on every run; never
    /// counts as a conflicting overwrite
    pub index: bool,
}

impl PlannedFile {
    fn new(path: PathBuf, template: TemplateId) -> Self {
        Self {
            path,
            template,
            index: false,
        }
    }

    fn index(path: PathBuf, template: TemplateId) -> Self {
        Self {
            path,
            template,
            index: true,
        }
    }
}

/// `<out>/widgets/{mod,types,...}.rs`
pub fn flat_files(context: &GenerationContext, output_dir: &Path) -> Vec<PlannedFile> {
    let dir = output_dir.join(&context.resource.snake);
    let mut files = vec![
        PlannedFile::new(dir.join("mod.rs"), TemplateId::ResourceMod),
        PlannedFile::new(dir.join("types.rs"), TemplateId::Types),
        PlannedFile::new(dir.join("schemas.rs"), TemplateId::Schemas),
        PlannedFile::new(dir.join("repository.rs"), TemplateId::Repository),
        PlannedFile::new(dir.join("service.rs"), TemplateId::Service),
        PlannedFile::new(dir.join("handlers.rs"), TemplateId::Handlers),
        PlannedFile::new(dir.join("routes.rs"), TemplateId::Routes),
    ];
    if context.features.events {
        files.push(PlannedFile::new(dir.join("events.rs"), TemplateId::Events));
    }
    if context.features.import {
        files.push(PlannedFile::new(dir.join("import.rs"), TemplateId::Import));
    }
    files
}

/// Directory of a domain; nested domains (`inventory/stock`) nest directories
pub fn domain_dir(output_dir: &Path, domain: &str) -> PathBuf {
    domain
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(output_dir.to_path_buf(), |dir, segment| dir.join(to_snake_case(segment)))
}

/// Per-route files of one route inside a domain
pub fn route_files(context: &GenerationContext, domain_dir: &Path) -> Vec<PlannedFile> {
    let route = to_snake_case(&context.route);
    let file = |layer: &str| domain_dir.join(layer).join(format!("{}.rs", route));
    let mut files = vec![
        PlannedFile::new(file("types"), TemplateId::Types),
        PlannedFile::new(file("schemas"), TemplateId::Schemas),
        PlannedFile::new(file("repositories"), TemplateId::Repository),
        PlannedFile::new(file("services"), TemplateId::Service),
        PlannedFile::new(file("controllers"), TemplateId::Handlers),
        PlannedFile::new(file("routes"), TemplateId::Routes),
    ];
    let services = domain_dir.join("services");
    if context.features.events {
        files.push(PlannedFile::new(
            services.join(format!("{}_events.rs", route)),
            TemplateId::Events,
        ));
    }
    if context.features.import {
        files.push(PlannedFile::new(
            services.join(format!("{}_import.rs", route)),
            TemplateId::Import,
        ));
    }
    files
}

/// The domain `mod.rs` and one `mod.rs` per layer
pub fn domain_index_files(domain_dir: &Path) -> Vec<PlannedFile> {
    let mut files = vec![PlannedFile::index(domain_dir.join("mod.rs"), TemplateId::DomainMod)];
    for layer in DOMAIN_LAYERS {
        let template = if layer == "routes" {
            TemplateId::RoutesMod
        } else {
            TemplateId::LayerMod
        };
        files.push(PlannedFile::index(domain_dir.join(layer).join("mod.rs"), template));
    }
    files
}

/// `<frontend>/widgets_client.rs`
pub fn frontend_file(context: &GenerationContext, frontend_dir: &Path) -> PlannedFile {
    PlannedFile::new(
        frontend_dir.join(format!("{}_client.rs", context.resource.snake)),
        TemplateId::FrontendClient,
    )
}

/// Module names a layer `mod.rs` declares: every `.rs` file already in the
/// directory plus the ones about to be written there, sorted
pub fn layer_modules(layer_dir: &Path, planned: &[PlannedFile]) -> ForgeResult<Vec<String>> {
    let mut stems = BTreeSet::new();

    match fs::read_dir(layer_dir) {
        Ok(entries) => {
            for entry in entries {
                let path = entry.map_err(|e| ForgeError::filesystem(layer_dir, e))?.path();
                if let Some(stem) = module_stem(&path) {
                    stems.insert(stem);
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(ForgeError::filesystem(layer_dir, e)),
    }

    for file in planned {
        if file.path.parent() == Some(layer_dir) {
            if let Some(stem) = module_stem(&file.path) {
                stems.insert(stem);
            }
        }
    }

    Ok(stems.into_iter().map(|s| escape_rust_keyword(&s)).collect())
}

fn module_stem(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("rs") {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| *s != "mod")
        .map(str::to_string)
}

/// Routes of an existing domain, read from its `routes/` layer
pub fn existing_routes(domain_dir: &Path) -> ForgeResult<Vec<String>> {
    layer_modules(&domain_dir.join("routes"), &[]).map(|modules| {
        modules
            .into_iter()
            .map(|m| m.trim_start_matches("r#").to_string())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_domain_dir_nests_segments() {
        assert_eq!(
            domain_dir(Path::new("src/modules"), "Inventory/stock-items"),
            PathBuf::from("src/modules/inventory/stock_items")
        );
    }

    #[test]
    fn test_layer_modules_merge_disk_and_plan() {
        let dir = TempDir::new().unwrap();
        let layer = dir.path().join("services");
        fs::create_dir_all(&layer).unwrap();
        fs::write(layer.join("core.rs"), "").unwrap();
        fs::write(layer.join("mod.rs"), "").unwrap();
        fs::write(layer.join("notes.txt"), "").unwrap();

        let planned = vec![
            PlannedFile::new(layer.join("stock.rs"), TemplateId::Service),
            PlannedFile::new(layer.join("stock_events.rs"), TemplateId::Events),
            PlannedFile::new(dir.path().join("types/stock.rs"), TemplateId::Types),
        ];
        assert_eq!(
            layer_modules(&layer, &planned).unwrap(),
            ["core", "stock", "stock_events"]
        );
    }

    #[test]
    fn test_layer_modules_of_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(layer_modules(&dir.path().join("nope"), &[]).unwrap().is_empty());
    }

    #[test]
    fn test_keyword_modules_are_escaped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("type.rs"), "").unwrap();
        assert_eq!(layer_modules(dir.path(), &[]).unwrap(), ["r#type"]);
    }

    #[test]
    fn test_existing_routes_strip_raw_prefix() {
        let dir = TempDir::new().unwrap();
        let routes = dir.path().join("routes");
        fs::create_dir_all(&routes).unwrap();
        fs::write(routes.join("core.rs"), "").unwrap();
        fs::write(routes.join("type.rs"), "").unwrap();
        assert_eq!(existing_routes(dir.path()).unwrap(), ["core", "type"]);
    }

    #[test]
    fn test_index_files_cover_every_layer() {
        let files = domain_index_files(Path::new("out/inventory"));
        assert_eq!(files.len(), 1 + DOMAIN_LAYERS.len());
        assert!(files.iter().all(|f| f.index));
        assert!(files
            .iter()
            .any(|f| f.template == TemplateId::RoutesMod
                && f.path == Path::new("out/inventory/routes/mod.rs")));
    }
}
