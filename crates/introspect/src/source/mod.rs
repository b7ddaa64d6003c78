//! Extraction of command, pattern and package records from Rust sources.
//!
//! A source file declares its records as a top-level exported array of
//! struct literals:
//!
//! ```ignore
//! pub const COMMANDS: &[CommandInfo] = &[
//!     CommandInfo { name: "generate", description: "...", usage: "...", options: &[], .. },
//! ];
//! ```
//!
//! Malformed records are rejected individually and reported; an unreadable
//! or unparseable file aborts extraction.

pub mod descriptors;
pub mod docs;
pub mod visitor;

use std::path::{Path, PathBuf};

use crudforge_core::{ForgeError, ForgeResult};
use serde::Serialize;

pub use descriptors::{
    CommandDescriptor, Descriptor, OptionDescriptor, OptionKind, PackageDescriptor,
    PatternCategory, PatternDescriptor,
};
pub use docs::{extract_package_table, DocumentIndex, PACKAGE_TIERS};

/// A record excluded from generation, with every reason found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub kind: String,
    pub item: String,
    pub line: Option<usize>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction<T> {
    pub origin: PathBuf,
    /// Whether the file declares the binding at all
    pub binding_found: bool,
    pub valid: Vec<T>,
    pub rejected: Vec<Rejection>,
}

impl<T> Extraction<T> {
    fn empty(origin: &Path) -> Self {
        Self {
            origin: origin.to_path_buf(),
            binding_found: false,
            valid: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// A parsed Rust source file, reusable across bindings
pub struct SourceFile {
    origin: PathBuf,
    syntax: syn::File,
}

impl SourceFile {
    pub fn read(path: &Path) -> ForgeResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ForgeError::extraction(path, format!("cannot read file: {}", e)))?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, origin: &Path) -> ForgeResult<Self> {
        let syntax = syn::parse_file(content).map_err(|e| {
            ForgeError::extraction(
                origin,
                format!("line {}: {}", e.span().start().line, e),
            )
        })?;
        Ok(Self {
            origin: origin.to_path_buf(),
            syntax,
        })
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// Records of `T::BINDING`; a binding that is not an array literal aborts
    pub fn extract<T: Descriptor>(&self) -> ForgeResult<Extraction<T>> {
        let mut extraction = Extraction::empty(&self.origin);
        let Some(initializer) = visitor::find_binding(&self.syntax, T::BINDING) else {
            tracing::debug!("{} declares no {}", self.origin.display(), T::BINDING);
            return Ok(extraction);
        };
        extraction.binding_found = true;

        let elements = visitor::array_elements(&initializer).map_err(|message| {
            ForgeError::extraction(&self.origin, format!("`{}`: {}", T::BINDING, message))
        })?;

        for (index, element) in elements.iter().enumerate() {
            let line = visitor::line_of(element);
            let record = visitor::match_record(element);
            let label = record
                .as_ref()
                .ok()
                .and_then(|r| r.label())
                .unwrap_or_else(|| format!("#{}", index));

            let outcome = record.and_then(|r| T::from_record(&r)).and_then(|descriptor| {
                if extraction.valid.iter().any(|v: &T| v.name() == descriptor.name()) {
                    Err(vec![format!("duplicate {} name `{}`", T::KIND, descriptor.name())])
                } else {
                    Ok(descriptor)
                }
            });

            match outcome {
                Ok(descriptor) => extraction.valid.push(descriptor),
                Err(errors) => {
                    tracing::warn!(
                        "Rejected {} {} at {}:{}: {}",
                        T::KIND,
                        label,
                        self.origin.display(),
                        line,
                        errors.join("; ")
                    );
                    extraction.rejected.push(Rejection {
                        kind: T::KIND.to_string(),
                        item: label,
                        line: Some(line),
                        errors,
                    });
                }
            }
        }

        tracing::debug!(
            "Extracted {} {}(s) from {} ({} rejected)",
            extraction.valid.len(),
            T::KIND,
            self.origin.display(),
            extraction.rejected.len()
        );
        Ok(extraction)
    }
}

pub fn extract_commands(path: &Path) -> ForgeResult<Extraction<CommandDescriptor>> {
    SourceFile::read(path)?.extract()
}

pub fn extract_patterns(path: &Path) -> ForgeResult<Extraction<PatternDescriptor>> {
    SourceFile::read(path)?.extract()
}

pub fn extract_packages(path: &Path) -> ForgeResult<Extraction<PackageDescriptor>> {
    SourceFile::read(path)?.extract()
}

/// Everything extracted from a set of source and documentation files
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceBundle {
    pub commands: Vec<CommandDescriptor>,
    pub patterns: Vec<PatternDescriptor>,
    pub packages: Vec<PackageDescriptor>,
    pub rejected: Vec<(PathBuf, Rejection)>,
    /// Every file consulted, in the order read
    pub consulted: Vec<PathBuf>,
}

impl SourceBundle {
    fn absorb<T: Descriptor>(&mut self, extraction: Extraction<T>, into: fn(&mut Self) -> &mut Vec<T>) {
        let origin = extraction.origin;
        for rejection in extraction.rejected {
            self.rejected.push((origin.clone(), rejection));
        }
        let target = into(self);
        for descriptor in extraction.valid {
            if !target.iter().any(|d| d.name() == descriptor.name()) {
                target.push(descriptor);
            }
        }
    }
}

/// Extract all three bindings from each source, then enrich from documentation
pub fn extract_all(sources: &[PathBuf], docs: &[PathBuf]) -> ForgeResult<SourceBundle> {
    let mut bundle = SourceBundle::default();

    for path in sources {
        let file = SourceFile::read(path)?;
        bundle.absorb(file.extract::<CommandDescriptor>()?, |b| &mut b.commands);
        bundle.absorb(file.extract::<PatternDescriptor>()?, |b| &mut b.patterns);
        bundle.absorb(file.extract::<PackageDescriptor>()?, |b| &mut b.packages);
        bundle.consulted.push(path.clone());
    }

    let mut index = DocumentIndex::default();
    for path in docs {
        let markdown = std::fs::read_to_string(path)
            .map_err(|e| ForgeError::extraction(path, format!("cannot read file: {}", e)))?;
        index.merge(DocumentIndex::scan(&markdown));
        for package in extract_package_table(&markdown) {
            if !bundle.packages.iter().any(|p| p.name == package.name) {
                bundle.packages.push(package);
            }
        }
        bundle.consulted.push(path.clone());
    }
    index.enrich(&mut bundle.commands);

    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = r####"
use crate::types::*;

pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "generate",
        description: "Generate a CRUD module",
        usage: "crudforge generate <resource> [options]",
        options: &[
            CommandOption {
                name: "--package",
                alias: Some("-p"),
                kind: OptionKind::String,
                default: Some("standard"),
                description: "Feature package",
                choices: &["standard", "enterprise", "full"],
            },
            CommandOption {
                name: "--force",
                alias: None,
                kind: "boolean",
                default: Some(false),
                description: "Overwrite existing files",
                choices: &[],
            },
        ],
        examples: &["crudforge generate widgets"],
        notes: &[],
    },
    CommandInfo {
        name: "broken",
        usage: "crudforge broken",
        options: &[],
        examples: &[],
        notes: &[],
    },
    CommandInfo {
        name: "bad-option",
        description: "Option default outside its choices",
        usage: "crudforge bad-option",
        options: &[CommandOption {
            name: "--mode",
            alias: None,
            kind: OptionKind::String,
            default: Some("fast"),
            description: "Mode",
            choices: &["slow"],
        }],
        examples: &[],
        notes: &[],
    },
];

pub static PATTERNS: Vec<CodePattern> = vec![
    CodePattern {
        name: "template-literal",
        category: Category::Frontend,
        description: "Interpolation inside back-quotes",
        code: r#"const url = `${base}/items`;
const price = "$10";"#,
        language: "typescript",
        tags: &["strings"],
        notes: &[],
    },
    CodePattern {
        name: "unbalanced",
        category: Category::Backend,
        description: "Missing brace",
        code: "fn main() {",
        language: "rust",
        tags: &[],
        notes: &[],
    },
    CodePattern {
        name: "wrong-category",
        category: Category::Mobile,
        description: "Not a known category",
        code: "let x = 1;",
        tags: &[],
        notes: &[],
    },
];
"####;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_extract_commands_rejects_only_malformed_records() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "commands.rs", SOURCE);

        let extraction = extract_commands(&path).unwrap();
        assert!(extraction.binding_found);
        assert_eq!(extraction.valid.len(), 1);

        let generate = &extraction.valid[0];
        assert_eq!(generate.options.len(), 2);
        assert_eq!(generate.options[0].alias.as_deref(), Some("-p"));
        assert_eq!(generate.options[0].choices.len(), 3);
        assert_eq!(generate.options[1].kind, OptionKind::Boolean);
        assert_eq!(generate.options[1].default.as_deref(), Some("false"));

        assert_eq!(extraction.rejected.len(), 2);
        let broken = &extraction.rejected[0];
        assert_eq!(broken.item, "broken");
        assert!(broken.errors[0].contains("missing required field `description`"));
        assert!(broken.line.is_some());
        assert!(extraction.rejected[1].errors[0].contains("not one of the choices"));
    }

    #[test]
    fn test_extract_patterns_preserves_code_exactly() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "patterns.rs", SOURCE);

        let extraction = extract_patterns(&path).unwrap();
        assert_eq!(extraction.valid.len(), 1);
        assert_eq!(
            extraction.valid[0].code,
            "const url = `${base}/items`;\nconst price = \"$10\";"
        );
        assert_eq!(extraction.valid[0].category, PatternCategory::Frontend);

        let rejected: Vec<_> = extraction.rejected.iter().map(|r| r.item.as_str()).collect();
        assert_eq!(rejected, vec!["unbalanced", "wrong-category"]);
        assert!(extraction.rejected[1].errors[0].contains("unknown category"));
    }

    #[test]
    fn test_missing_binding_is_empty_not_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "other.rs", SOURCE);
        let extraction = extract_packages(&path).unwrap();
        assert!(!extraction.binding_found);
        assert!(extraction.valid.is_empty());
    }

    #[test]
    fn test_unparseable_file_aborts() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.rs", "pub const COMMANDS: &[C] = &[C { name: \"x\" ];");
        let err = extract_commands(&path).unwrap_err();
        assert!(matches!(err, ForgeError::Extraction { .. }));

        let err = extract_commands(&dir.path().join("missing.rs")).unwrap_err();
        assert!(matches!(err, ForgeError::Extraction { .. }));
    }

    #[test]
    fn test_non_array_binding_aborts() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "fn.rs", "pub const COMMANDS: usize = 3;");
        assert!(extract_commands(&path).is_err());
    }

    #[test]
    fn test_extract_all_merges_docs() {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "reference.rs", SOURCE);
        let guide = write(
            &dir,
            "guide.md",
            "```bash\ncrudforge generate orders --flat\n```\n\n## Package tiers\n\n| Tier | Command |\n|---|---|\n| full | `crudforge generate x --package full` |\n",
        );

        let bundle = extract_all(&[source.clone()], &[guide.clone()]).unwrap();
        assert_eq!(bundle.commands.len(), 1);
        assert!(bundle.commands[0]
            .examples
            .contains(&"crudforge generate orders --flat".to_string()));
        assert_eq!(bundle.patterns.len(), 1);
        assert_eq!(bundle.packages.len(), 1);
        assert_eq!(bundle.packages[0].name, "full");
        assert_eq!(bundle.rejected.len(), 4);
        assert_eq!(bundle.consulted, vec![source, guide]);
    }
}
