//! Regenerates the reference-table module from the configured sources.

use std::path::{Path, PathBuf};

use crudforge_core::ForgeResult;
use crudforge_introspect::{extract_all, Rejection, SourceBundle};
use serde::Serialize;

use crate::format::{format, GenerationHeader};
use crate::model::build_reference;
use crate::renderer::{Renderer, TemplateId};
use crate::validate::OutputKind;
use crate::writer::{AtomicWriter, WriteOptions, WriteResult};

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub result: WriteResult,
    pub commands: usize,
    pub patterns: usize,
    pub packages: usize,
    /// Package tiers no source declared
    pub placeholders: Vec<String>,
    pub rejected: Vec<(PathBuf, Rejection)>,
}

pub struct ReferenceSync<'a> {
    renderer: &'a Renderer,
    writer: AtomicWriter,
}

impl<'a> ReferenceSync<'a> {
    pub fn new(renderer: &'a Renderer) -> Self {
        Self {
            renderer,
            writer: AtomicWriter::new(),
        }
    }

    /// Formatted module text, header included
    pub fn render(&self, bundle: &SourceBundle) -> ForgeResult<String> {
        let model = build_reference(bundle);
        let body = self.renderer.render(TemplateId::ReferenceTable, &model)?;
        let sources = bundle
            .consulted
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        Ok(GenerationHeader::new(sources).apply(&format(&body, OutputKind::Rust), OutputKind::Rust))
    }

    pub fn run(
        &self,
        sources: &[PathBuf],
        docs: &[PathBuf],
        output: &Path,
        options: WriteOptions,
    ) -> ForgeResult<SyncReport> {
        let bundle = extract_all(sources, docs)?;
        for (origin, rejection) in &bundle.rejected {
            tracing::warn!(
                "{}: rejected {} `{}`{}: {}",
                origin.display(),
                rejection.kind,
                rejection.item,
                rejection
                    .line
                    .map(|l| format!(" (line {})", l))
                    .unwrap_or_default(),
                rejection.errors.join("; ")
            );
        }

        let text = self.render(&bundle)?;
        let result = self.writer.write(output, &text, options)?;
        let model = build_reference(&bundle);

        Ok(SyncReport {
            result,
            commands: model.commands.len(),
            patterns: model.patterns.len(),
            packages: model.packages.len(),
            placeholders: model.placeholder_packages,
            rejected: bundle.rejected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WriteStatus;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = r#"
pub const PACKAGES: &[PackageInfo] = &[
    PackageInfo {
        name: "standard",
        description: "Plain CRUD",
        features: &["list", "get"],
        use_cases: &[],
        command: "crudforge generate widgets",
    },
];
"#;

    #[test]
    fn test_run_fills_missing_tiers_and_is_stable() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("packages.rs");
        fs::write(&source, SOURCE).unwrap();
        let output = dir.path().join("reference/generated.rs");

        let renderer = Renderer::new().unwrap();
        let sync = ReferenceSync::new(&renderer);
        let report = sync
            .run(&[source.clone()], &[], &output, WriteOptions::default())
            .unwrap();
        assert_eq!(report.result.status, WriteStatus::Created);
        assert_eq!(report.packages, 3);
        assert_eq!(report.placeholders, ["enterprise", "full"]);

        let again = sync
            .run(&[source], &[], &output, WriteOptions::default())
            .unwrap();
        assert_eq!(again.result.status, WriteStatus::Unchanged);
    }
}
