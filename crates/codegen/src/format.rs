//! Textual normalization of rendered output and the generated-file header.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use proc_macro2::{TokenStream, TokenTree};
use serde::Serialize;

use crate::validate::OutputKind;

/// Label of the header line that changes on every run
pub const TIMESTAMP_LABEL: &str = "Generated at:";

const TOP_LEVEL_STARTS: &[&str] = &[
    "pub ", "pub(", "fn ", "async fn ", "impl ", "impl<", "struct ", "enum ", "mod ", "use ",
    "const ", "static ", "trait ", "type ", "#[", "///",
];

fn starts_top_level_item(line: &str) -> bool {
    TOP_LEVEL_STARTS.iter().any(|start| line.starts_with(start))
}

fn closes_top_level_block(line: &str) -> bool {
    matches!(line, "}" | "};" | "})" | "});")
}

/// Line numbers (1-based) covered by multi-line string literals
#[derive(Debug, Default)]
struct LiteralLines {
    /// Lines that begin inside a literal
    continued: HashSet<usize>,
    /// Lines whose newline is part of a literal
    open: HashSet<usize>,
}

impl LiteralLines {
    fn scan(text: &str, kind: OutputKind) -> Self {
        let mut lines = Self::default();
        if kind != OutputKind::Rust {
            return lines;
        }
        // Unparsable text is formatted as-is; validation rejects it later
        if let Ok(tokens) = text.parse::<TokenStream>() {
            lines.collect(tokens);
        }
        lines
    }

    fn collect(&mut self, tokens: TokenStream) {
        for tree in tokens {
            match tree {
                TokenTree::Group(group) => self.collect(group.stream()),
                TokenTree::Literal(literal) => {
                    let span = literal.span();
                    for line in span.start().line..span.end().line {
                        self.open.insert(line);
                        self.continued.insert(line + 1);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Trim trailing whitespace, cap runs of blank lines at two, separate
/// top-level Rust items that follow a closed block, and end with exactly one
/// newline. Text inside multi-line string literals is left byte for byte.
/// Idempotent.
pub fn format(text: &str, kind: OutputKind) -> String {
    let literals = LiteralLines::scan(text, kind);
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_run = 0;

    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let line = if literals.open.contains(&number) {
            raw
        } else {
            raw.trim_end()
        };
        if literals.continued.contains(&number) {
            blank_run = 0;
            lines.push(line);
            continue;
        }

        if line.is_empty() {
            blank_run += 1;
            if blank_run > 2 || lines.is_empty() {
                continue;
            }
        } else {
            if kind == OutputKind::Rust && blank_run == 0 && starts_top_level_item(line) {
                if let Some(previous) = lines.last() {
                    if closes_top_level_block(previous) {
                        lines.push("");
                    }
                }
            }
            blank_run = 0;
        }
        lines.push(line);
    }

    while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Provenance prefixed to every generated file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationHeader {
    pub generated_at: DateTime<Utc>,
    pub generator: String,
    pub version: String,
    pub sources: Vec<String>,
}

impl GenerationHeader {
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            generator: crudforge_core::GENERATOR_NAME.to_string(),
            version: crudforge_core::VERSION.to_string(),
            sources,
        }
    }

    pub fn at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn render(&self, kind: OutputKind) -> String {
        let c = kind.comment_prefix();
        let mut header = format!(
            "{c} @generated by {}@{}. Regenerate instead of editing by hand.\n\
             {c} {} {}\n",
            self.generator,
            self.version,
            TIMESTAMP_LABEL,
            self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        if !self.sources.is_empty() {
            header.push_str(&format!("{c} Sources: {}\n", self.sources.join(", ")));
        }
        header
    }

    /// Prefix formatted text with the header and a blank line
    pub fn apply(&self, formatted: &str, kind: OutputKind) -> String {
        format!("{}\n{}", self.render(kind), formatted)
    }
}

/// `text` without the timestamp line of its leading comment block
pub fn without_timestamp(text: &str) -> String {
    let mut in_header = true;
    let mut kept = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        let is_comment = trimmed.starts_with("//") || trimmed.starts_with("--");
        if in_header && !is_comment {
            in_header = false;
        }
        if in_header {
            let body = trimmed.trim_start_matches(['/', '-']).trim_start();
            if body.starts_with(TIMESTAMP_LABEL) {
                continue;
            }
        }
        kept.push(line);
    }
    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_normalizes_whitespace() {
        let input = "\n\nuse a;   \n\n\n\nfn x() {}  \n\n\n";
        assert_eq!(format(input, OutputKind::Rust), "use a;\n\n\nfn x() {}\n");
    }

    #[test]
    fn test_format_separates_items_after_blocks() {
        let input = "struct A {\n    x: u8,\n}\nimpl A {}\n#[derive(Debug)]\nstruct B;\n";
        assert_eq!(
            format(input, OutputKind::Rust),
            "struct A {\n    x: u8,\n}\n\nimpl A {}\n#[derive(Debug)]\nstruct B;\n"
        );
    }

    #[test]
    fn test_format_is_idempotent() {
        let input = "mod a;\n}\npub fn b() {\n\n\n    1\n}\nconst C: u8 = 1;";
        let once = format(input, OutputKind::Rust);
        assert_eq!(format(&once, OutputKind::Rust), once);
    }

    #[test]
    fn test_format_leaves_multiline_literals_alone() {
        let body = "fn a() {\n}\nfn b() {}\nlet s = 1;   \n\n\n\nend";
        let input = format!("pub const CODE: &str = r#\"{}\"#;\n\n\n\nfn next() {{}}   \n", body);
        let out = format(&input, OutputKind::Rust);
        assert_eq!(
            out,
            format!("pub const CODE: &str = r#\"{}\"#;\n\n\nfn next() {{}}\n", body)
        );
        assert_eq!(format(&out, OutputKind::Rust), out);
    }

    #[test]
    fn test_literal_opening_line_keeps_trailing_spaces() {
        let input = "const A: &str = \"x   \ny\";\n";
        assert_eq!(format(input, OutputKind::Rust), input);
    }

    #[test]
    fn test_header_and_timestamp_stripping() {
        let header = GenerationHeader::new(vec!["catalog public.widgets".into()])
            .at(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap());
        let rendered = header.apply("pub mod types;\n", OutputKind::Rust);
        assert!(rendered.contains("// Generated at: 2026-01-02T03:04:05Z\n"));
        assert!(rendered.contains("// Sources: catalog public.widgets\n"));

        let later = GenerationHeader::new(vec!["catalog public.widgets".into()])
            .apply("pub mod types;\n", OutputKind::Rust);
        assert_ne!(rendered, later);
        assert_eq!(without_timestamp(&rendered), without_timestamp(&later));
    }

    #[test]
    fn test_sql_header_uses_sql_comments() {
        let header = GenerationHeader::new(Vec::new());
        let rendered = header.render(OutputKind::Sql);
        assert!(rendered.lines().all(|l| l.starts_with("--")));
    }
}
