//! Structural validation of rendered output.
//!
//! Rust text must parse as a whole file with `syn`; SQL migrations must parse
//! section by section with the PostgreSQL dialect. Delimiter balance is
//! checked too, but only ever produces warnings.

use std::fmt;
use std::path::Path;

use crudforge_introspect::balance::{check_balance, Syntax};
use serde::Serialize;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Rust,
    Sql,
}

impl OutputKind {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("sql") => OutputKind::Sql,
            _ => OutputKind::Rust,
        }
    }

    /// Line-comment marker used for the generated header
    pub fn comment_prefix(&self) -> &'static str {
        match self {
            OutputKind::Rust => "//",
            OutputKind::Sql => "--",
        }
    }

    fn syntax(&self) -> Syntax {
        match self {
            OutputKind::Rust => Syntax::Rust,
            OutputKind::Sql => Syntax::Sql,
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Rust => f.write_str("rust"),
            OutputKind::Sql => f.write_str("sql"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub valid: bool,
    pub diagnostics: Vec<String>,
    pub warnings: Vec<String>,
}

impl Validation {
    fn from_parts(diagnostics: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: diagnostics.is_empty(),
            diagnostics,
            warnings,
        }
    }
}

pub fn validate(text: &str, kind: OutputKind) -> Validation {
    let diagnostics = match kind {
        OutputKind::Rust => validate_rust(text),
        OutputKind::Sql => validate_sql(text),
    };
    let warnings = check_balance(text, kind.syntax())
        .into_iter()
        .map(|issue| format!("delimiter balance: {}", issue))
        .collect();
    Validation::from_parts(diagnostics, warnings)
}

fn validate_rust(text: &str) -> Vec<String> {
    match syn::parse_file(text) {
        Ok(_) => Vec::new(),
        Err(e) => {
            let start = e.span().start();
            vec![format!("line {}, column {}: {}", start.line, start.column + 1, e)]
        }
    }
}

/// Split a migration into its `-- Up migration` / `-- Down migration`
/// sections; text outside any section counts as up
pub fn migration_sections(text: &str) -> (String, String) {
    let mut up = Vec::new();
    let mut down = Vec::new();
    let mut in_down = false;

    for line in text.lines() {
        let marker = line.trim().to_lowercase();
        if marker.starts_with("--") && marker.contains("up migration") {
            in_down = false;
            continue;
        }
        if marker.starts_with("--") && marker.contains("down migration") {
            in_down = true;
            continue;
        }
        if in_down {
            down.push(line);
        } else {
            up.push(line);
        }
    }

    (up.join("\n"), down.join("\n"))
}

fn validate_sql(text: &str) -> Vec<String> {
    let dialect = PostgreSqlDialect {};
    let (up, down) = migration_sections(text);
    let mut diagnostics = Vec::new();

    for (label, sql) in [("up", up), ("down", down)] {
        if let Err(e) = Parser::parse_sql(&dialect, &sql) {
            diagnostics.push(format!("{} section: {}", label, e));
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_rust() {
        let result = validate("pub fn answer() -> u32 {\n    42\n}\n", OutputKind::Rust);
        assert!(result.valid);
        assert!(result.diagnostics.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_unbalanced_rust_is_invalid() {
        let result = validate("pub fn answer() -> u32 {\n    42\n", OutputKind::Rust);
        assert!(!result.valid);
        assert_eq!(result.diagnostics.len(), 1);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_balanced_but_malformed_rust_is_invalid() {
        let result = validate("pub fn () {}", OutputKind::Rust);
        assert!(!result.valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_sql_sections() {
        let sql = "-- header\n-- Up migration\nINSERT INTO permissions (name) VALUES ('a.read') ON CONFLICT (name) DO NOTHING;\n\n-- Down migration\nDELETE FROM permissions WHERE name IN ('a.read');\n";
        let (up, down) = migration_sections(sql);
        assert!(up.contains("INSERT"));
        assert!(down.contains("DELETE"));
        assert!(validate(sql, OutputKind::Sql).valid);
    }

    #[test]
    fn test_invalid_sql_names_the_section() {
        let sql = "-- Up migration\nINSERT INTO;\n-- Down migration\nDELETE FROM t;\n";
        let result = validate(sql, OutputKind::Sql);
        assert!(!result.valid);
        assert!(result.diagnostics[0].starts_with("up section"));
    }
}
