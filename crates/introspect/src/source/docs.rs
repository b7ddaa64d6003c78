//! Markdown documentation pass.
//!
//! Collects example lines from fenced code blocks and guidance notes from
//! callouts, then attaches them to the commands whose base name they mention.
//! Also reads the package table of a "Package" section.

use std::sync::OnceLock;

use regex::Regex;

use super::descriptors::{CommandDescriptor, PackageDescriptor};

pub const MAX_DOC_EXAMPLES: usize = 5;
pub const MAX_DOC_NOTES: usize = 5;

/// Package tier names, in ascending feature order
pub const PACKAGE_TIERS: &[&str] = &["standard", "enterprise", "full"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentIndex {
    pub code_lines: Vec<String>,
    pub notes: Vec<String>,
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !value.is_empty() && !list.contains(&value) {
        list.push(value);
    }
}

fn bullet_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    ["- ", "* ", "+ "]
        .iter()
        .find_map(|marker| trimmed.strip_prefix(marker))
        .map(str::trim)
}

/// `**Important:** text`, `**Note**: text`, `**Critical** text`
fn callout_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\*\*(important|note|critical)(?::\*\*|\*\*:?)\s*(.*)$")
            .expect("callout pattern compiles")
    })
}

/// `**DO:**` or `**DON'T**` heading a bullet list
fn guidance_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\*\*(do|don't|don’t)(?::\*\*|\*\*:?)\s*$")
            .expect("guidance pattern compiles")
    })
}

impl DocumentIndex {
    pub fn scan(markdown: &str) -> Self {
        let mut index = DocumentIndex::default();
        let callout = callout_re();
        let guidance = guidance_re();

        let lines: Vec<&str> = markdown.lines().collect();
        let mut in_code = false;
        let mut guidance_label: Option<&'static str> = None;
        let mut i = 0;

        while i < lines.len() {
            let trimmed = lines[i].trim();
            i += 1;

            if trimmed.starts_with("```") {
                in_code = !in_code;
                continue;
            }
            if in_code {
                if !trimmed.is_empty() && !trimmed.starts_with('#') {
                    push_unique(&mut index.code_lines, trimmed.to_string());
                }
                continue;
            }

            let text = trimmed.trim_start_matches('>').trim();

            if let Some(label) = guidance_label {
                if let Some(item) = bullet_text(text) {
                    push_unique(&mut index.notes, format!("{}: {}", label, item));
                    continue;
                }
                if text.is_empty() {
                    continue;
                }
                guidance_label = None;
            }

            if let Some(caps) = guidance.captures(text) {
                let label = if caps[1].eq_ignore_ascii_case("do") {
                    "DO"
                } else {
                    "DON'T"
                };
                guidance_label = Some(label);
                continue;
            }

            if let Some(caps) = callout.captures(text) {
                let kind = caps[1].to_ascii_lowercase();
                let mut body = caps[2].trim().to_string();
                let label = match kind.as_str() {
                    "important" => {
                        // The paragraph continues until a blank line or heading
                        while i < lines.len() {
                            let next = lines[i].trim().trim_start_matches('>').trim();
                            if next.is_empty() || next.starts_with('#') || next.starts_with("```")
                            {
                                break;
                            }
                            if !body.is_empty() {
                                body.push(' ');
                            }
                            body.push_str(next);
                            i += 1;
                        }
                        "Important"
                    }
                    "note" => "Note",
                    _ => "CRITICAL",
                };
                if !body.is_empty() {
                    push_unique(&mut index.notes, format!("{}: {}", label, body));
                }
            }
        }

        index
    }

    pub fn merge(&mut self, other: DocumentIndex) {
        for line in other.code_lines {
            push_unique(&mut self.code_lines, line);
        }
        for note in other.notes {
            push_unique(&mut self.notes, note);
        }
    }

    pub fn examples_for(&self, base_name: &str) -> Vec<String> {
        matching(&self.code_lines, base_name)
    }

    pub fn notes_for(&self, base_name: &str) -> Vec<String> {
        matching(&self.notes, base_name)
    }

    /// Append documented examples and notes to each command, keeping what it
    /// already declares first
    pub fn enrich(&self, commands: &mut [CommandDescriptor]) {
        for command in commands.iter_mut() {
            let base = command.base_name().to_string();
            let mut added = 0;
            for example in self.examples_for(&base) {
                if added == MAX_DOC_EXAMPLES {
                    break;
                }
                if !command.examples.contains(&example) {
                    command.examples.push(example);
                    added += 1;
                }
            }
            let mut added = 0;
            for note in self.notes_for(&base) {
                if added == MAX_DOC_NOTES {
                    break;
                }
                if !command.notes.contains(&note) {
                    command.notes.push(note);
                    added += 1;
                }
            }
        }
    }
}

/// Case-insensitive whole-word match; `-` and `:` count as word characters
fn whole_word(base_name: &str) -> Option<Regex> {
    if base_name.is_empty() {
        return None;
    }
    Regex::new(&format!(
        r"(?i)(?:^|[^\w:-]){}(?:$|[^\w:-])",
        regex::escape(base_name)
    ))
    .ok()
}

fn matching(lines: &[String], base_name: &str) -> Vec<String> {
    match whole_word(base_name) {
        Some(re) => lines.iter().filter(|l| re.is_match(l)).cloned().collect(),
        None => Vec::new(),
    }
}

fn table_cells(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    if !trimmed.starts_with('|') {
        return None;
    }
    let inner = trimmed.trim_start_matches('|').trim_end_matches('|');
    Some(
        inner
            .split('|')
            .map(|cell| cell.trim().trim_matches('`').trim_matches('*').trim().to_string())
            .collect(),
    )
}

fn is_separator_row(cells: &[String]) -> bool {
    cells.iter().all(|c| {
        let c = c.trim_matches(':');
        !c.is_empty() && c.chars().all(|ch| ch == '-')
    })
}

fn tier_of(first_cell: &str, command: &str) -> Option<&'static str> {
    let first = first_cell.to_ascii_lowercase();
    if let Some(tier) = PACKAGE_TIERS.iter().find(|t| first == **t) {
        return Some(tier);
    }
    let command = command.to_ascii_lowercase();
    if command.contains("full") {
        Some("full")
    } else if command.contains("enterprise") || command.contains("import") {
        Some("enterprise")
    } else if command.contains("events") {
        None
    } else {
        Some("standard")
    }
}

/// Packages listed in the first table under a heading mentioning "package"
pub fn extract_package_table(markdown: &str) -> Vec<PackageDescriptor> {
    let mut packages: Vec<PackageDescriptor> = Vec::new();
    let mut in_section = false;
    let mut seen_header = false;

    for line in markdown.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            if in_section && seen_header {
                break;
            }
            in_section = trimmed.to_ascii_lowercase().contains("package");
            continue;
        }
        if !in_section {
            continue;
        }
        let Some(cells) = table_cells(trimmed) else {
            continue;
        };
        if !seen_header {
            seen_header = true;
            continue;
        }
        if is_separator_row(&cells) || cells.len() < 2 {
            continue;
        }

        let command = cells[1].clone();
        let Some(tier) = tier_of(&cells[0], &command) else {
            continue;
        };
        if packages.iter().any(|p| p.name == tier) {
            continue;
        }
        packages.push(PackageDescriptor {
            name: tier.to_string(),
            description: cells.get(2).cloned().unwrap_or_default(),
            features: Vec::new(),
            use_cases: Vec::new(),
            command,
        });
    }

    packages
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUIDE: &str = r#"
# Generator guide

```bash
# generate a standard module
crudforge generate widgets --package standard
crudforge domain inventory --routes items,stock
crudforge generate-all
```

**Important**: Run `generate` only after the
table migration has been applied.

> **Note**: `domain` creates one folder per route.

**CRITICAL**: never run generate with --direct-db against production

**DO:**
- Use --dry-run with generate first

**DON'T:**
- Edit generated files by hand

## Packages

| Package | Command | Description |
|---|---|---|
| `standard` | `crudforge generate widgets` | Basic CRUD |
| Import | `crudforge generate widgets --with-import` | Bulk import |
| Events | `crudforge generate widgets --with-events` | Realtime |
| `full` | `crudforge generate widgets --package full` | Everything |
"#;

    #[test]
    fn test_scan_collects_code_and_callouts() {
        let index = DocumentIndex::scan(GUIDE);
        assert!(index
            .code_lines
            .contains(&"crudforge generate widgets --package standard".to_string()));
        assert!(!index.code_lines.iter().any(|l| l.starts_with('#')));
        assert!(index.notes.contains(
            &"Important: Run `generate` only after the table migration has been applied."
                .to_string()
        ));
        assert!(index
            .notes
            .contains(&"Note: `domain` creates one folder per route.".to_string()));
        assert!(index.notes.iter().any(|n| n.starts_with("CRITICAL: never run")));
        assert!(index
            .notes
            .contains(&"DO: Use --dry-run with generate first".to_string()));
        assert!(index
            .notes
            .contains(&"DON'T: Edit generated files by hand".to_string()));
    }

    #[test]
    fn test_callout_forms() {
        for line in ["**Important:** a", "**NOTE**: a", "**critical** a"] {
            assert!(callout_re().is_match(line), "{}", line);
        }
        for line in ["**Do:**", "**DON'T**", "**don’t**:"] {
            assert!(guidance_re().is_match(line), "{}", line);
        }
        assert!(!guidance_re().is_match("**Do:** inline text"));
        assert!(std::ptr::eq(callout_re(), callout_re()));
    }

    #[test]
    fn test_whole_word_association() {
        let index = DocumentIndex::scan(GUIDE);
        let examples = index.examples_for("generate");
        assert_eq!(examples.len(), 1);
        assert!(!examples.iter().any(|e| e.contains("generate-all")));
        assert_eq!(index.examples_for("DOMAIN").len(), 1);
    }

    #[test]
    fn test_enrich_keeps_declared_entries_first() {
        let index = DocumentIndex::scan(GUIDE);
        let mut commands = vec![CommandDescriptor {
            name: "generate <resource>".into(),
            description: "Generate a module".into(),
            usage: "crudforge generate <resource>".into(),
            options: Vec::new(),
            examples: vec!["crudforge generate orders".into()],
            notes: Vec::new(),
        }];
        index.enrich(&mut commands);
        assert_eq!(commands[0].examples[0], "crudforge generate orders");
        assert_eq!(commands[0].examples.len(), 2);
        assert!(commands[0].notes.iter().any(|n| n.starts_with("Important:")));
    }

    #[test]
    fn test_package_table() {
        let packages = extract_package_table(GUIDE);
        let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["standard", "enterprise", "full"]);
        assert_eq!(packages[1].command, "crudforge generate widgets --with-import");
        assert_eq!(packages[0].description, "Basic CRUD");
    }
}
