use std::fs;

use crudforge_codegen::{
    AtomicWriter, PendingFile, ReferenceSync, Renderer, WriteOptions, WriteStatus,
};
use crudforge_introspect::{extract_patterns, PatternCategory};
use tempfile::TempDir;

const ORIGINAL: &str = "pub fn kept() {}\n";

#[test]
fn test_abandoned_stage_leaves_target_intact() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("widgets/types.rs");
    let writer = AtomicWriter::new();
    writer
        .write(&target, ORIGINAL, WriteOptions::default())
        .unwrap();

    // dropped before commit: the temporary file is cleaned up
    let staged = writer.stage(&target, "pub fn half() {}\n").unwrap();
    let temp = staged.temp_path().to_path_buf();
    assert!(temp.exists());
    drop(staged);
    assert!(!temp.exists());
    assert_eq!(fs::read_to_string(&target).unwrap(), ORIGINAL);

    // interrupted process: the stray temporary file remains, the target does not change
    let staged = writer.stage(&target, "pub fn half() {}\n").unwrap();
    let temp = staged.temp_path().to_path_buf();
    std::mem::forget(staged);
    assert!(temp.exists());
    assert_eq!(fs::read_to_string(&target).unwrap(), ORIGINAL);
}

#[test]
fn test_invalid_file_blocks_whole_batch() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.rs");
    let bad = dir.path().join("bad.rs");
    let files = vec![
        PendingFile::new(&good, ORIGINAL),
        PendingFile::new(&bad, "pub fn broken() {\n"),
    ];

    let err = AtomicWriter::new()
        .write_batch(&files, WriteOptions::default())
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.exit_code(), 3);
    assert!(!good.exists());
    assert!(!bad.exists());
}

#[test]
fn test_unbalanced_sql_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("001_broken.sql");
    let err = AtomicWriter::new()
        .write(&path, "INSERT INTO roles (name VALUES ('x');\n", WriteOptions::default())
        .unwrap_err();
    assert!(err.is_validation());
    assert!(!path.exists());
}

const PATTERN_SOURCE: &str = r####"
pub static PATTERNS: Vec<CodePattern> = vec![
    CodePattern {
        name: "template-literal",
        category: Category::Frontend,
        description: "Interpolation inside back-quotes",
        code: r#"const url = `${base}/items?tag="new"`;
const price = '$10\n';"#,
        language: "typescript",
        tags: &["strings"],
        notes: &["keeps `$` and quotes"],
    },
    CodePattern {
        name: "spaced-items",
        category: Category::Backend,
        description: "Layout the formatter would otherwise rewrite",
        code: "fn a() {\n}\nfn b() {}\nlet s = 1;   \n\n\n\nend",
        language: "rust",
        tags: &["whitespace"],
        notes: &[],
    },
];
"####;

const PATTERN_CODE: &str = "const url = `${base}/items?tag=\"new\"`;\nconst price = '$10\\n';";

const SPACED_CODE: &str = "fn a() {\n}\nfn b() {}\nlet s = 1;   \n\n\n\nend";

#[test]
fn test_pattern_text_survives_reference_sync() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("patterns.rs");
    fs::write(&source, PATTERN_SOURCE).unwrap();
    let output = dir.path().join("reference/generated.rs");

    let renderer = Renderer::new().unwrap();
    let report = ReferenceSync::new(&renderer)
        .run(&[source], &[], &output, WriteOptions::default())
        .unwrap();
    assert_eq!(report.result.status, WriteStatus::Created);
    assert_eq!(report.patterns, 2);
    assert!(report.rejected.is_empty());

    let extraction = extract_patterns(&output).unwrap();
    assert!(extraction.binding_found);
    assert!(extraction.rejected.is_empty());
    let by_name = |name: &str| {
        extraction
            .valid
            .iter()
            .find(|p| p.name == name)
            .unwrap_or_else(|| panic!("{} missing from {}", name, output.display()))
    };

    let pattern = by_name("template-literal");
    assert_eq!(pattern.code, PATTERN_CODE);
    assert_eq!(pattern.category, PatternCategory::Frontend);
    assert_eq!(pattern.notes, ["keeps `$` and quotes"]);

    let spaced = by_name("spaced-items");
    assert_eq!(spaced.code, SPACED_CODE);

    // regenerating over the same output changes nothing
    let again = ReferenceSync::new(&renderer)
        .run(&[dir.path().join("patterns.rs")], &[], &output, WriteOptions::default())
        .unwrap();
    assert_eq!(again.result.status, WriteStatus::Unchanged);
}
