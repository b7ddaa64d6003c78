use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::visitor::{FieldReader, Record};
use crate::balance::{check_balance, Syntax};

/// A record shape extracted from a named top-level binding
pub trait Descriptor: Sized {
    /// Identifier of the `const`/`static` holding the records
    const BINDING: &'static str;
    /// Human label used in diagnostics
    const KIND: &'static str;

    fn from_record(record: &Record) -> Result<Self, Vec<String>>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Boolean,
    String,
    Number,
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::Boolean => "boolean",
            OptionKind::String => "string",
            OptionKind::Number => "number",
        }
    }

    /// Variant identifier as written in Rust source
    pub fn variant(&self) -> &'static str {
        match self {
            OptionKind::Boolean => "Boolean",
            OptionKind::String => "String",
            OptionKind::Number => "Number",
        }
    }
}

impl FromStr for OptionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Ok(OptionKind::Boolean),
            "string" | "str" => Ok(OptionKind::String),
            "number" => Ok(OptionKind::Number),
            other => Err(format!(
                "unknown option kind `{}` (expected boolean, string or number)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternCategory {
    Backend,
    Frontend,
    Database,
    Testing,
    Security,
}

impl PatternCategory {
    pub const ALL: [PatternCategory; 5] = [
        PatternCategory::Backend,
        PatternCategory::Frontend,
        PatternCategory::Database,
        PatternCategory::Testing,
        PatternCategory::Security,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternCategory::Backend => "backend",
            PatternCategory::Frontend => "frontend",
            PatternCategory::Database => "database",
            PatternCategory::Testing => "testing",
            PatternCategory::Security => "security",
        }
    }

    pub fn variant(&self) -> &'static str {
        match self {
            PatternCategory::Backend => "Backend",
            PatternCategory::Frontend => "Frontend",
            PatternCategory::Database => "Database",
            PatternCategory::Testing => "Testing",
            PatternCategory::Security => "Security",
        }
    }
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatternCategory::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| {
                format!(
                    "unknown category `{}` (expected one of backend, frontend, database, testing, security)",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDescriptor {
    pub name: String,
    pub alias: Option<String>,
    pub kind: OptionKind,
    pub default: Option<String>,
    pub description: String,
    pub choices: Vec<String>,
}

impl OptionDescriptor {
    fn from_record(record: &Record) -> Result<Self, Vec<String>> {
        let mut reader = FieldReader::new(record);
        let name = reader.required_str("name");
        let alias = reader.optional_str("alias");
        let kind = reader
            .required_variant("kind")
            .and_then(|k| reader.check(k.parse::<OptionKind>()));
        let default = reader.optional_scalar("default");
        let description = reader.required_str("description");
        let choices = reader.str_list("choices");

        if let (Some(default), false) = (&default, choices.is_empty()) {
            if !choices.contains(default) {
                reader.error(format!(
                    "default `{}` is not one of the choices [{}]",
                    default,
                    choices.join(", ")
                ));
            }
        }

        reader.finish(|| OptionDescriptor {
            name,
            alias,
            kind: kind.unwrap_or(OptionKind::String),
            default,
            description,
            choices,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub name: String,
    pub description: String,
    pub usage: String,
    pub options: Vec<OptionDescriptor>,
    pub examples: Vec<String>,
    pub notes: Vec<String>,
}

impl CommandDescriptor {
    /// First word of the name, used to associate documentation
    pub fn base_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

impl Descriptor for CommandDescriptor {
    const BINDING: &'static str = "COMMANDS";
    const KIND: &'static str = "command";

    fn from_record(record: &Record) -> Result<Self, Vec<String>> {
        let mut reader = FieldReader::new(record);
        let name = reader.required_str("name");
        let description = reader.required_str("description");
        let usage = reader.required_str("usage");
        let examples = reader.str_list("examples");
        let notes = reader.str_list("notes");

        let mut options = Vec::new();
        for (index, option) in reader.records("options").into_iter().enumerate() {
            match OptionDescriptor::from_record(option) {
                Ok(option) => options.push(option),
                Err(errors) => {
                    let label = option
                        .label()
                        .unwrap_or_else(|| format!("#{}", index));
                    for error in errors {
                        reader.error(format!("option {}: {}", label, error));
                    }
                }
            }
        }

        reader.finish(|| CommandDescriptor {
            name,
            description,
            usage,
            options,
            examples,
            notes,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDescriptor {
    pub name: String,
    pub category: PatternCategory,
    pub description: String,
    pub code: String,
    pub language: String,
    pub tags: Vec<String>,
    pub notes: Vec<String>,
}

impl Descriptor for PatternDescriptor {
    const BINDING: &'static str = "PATTERNS";
    const KIND: &'static str = "pattern";

    fn from_record(record: &Record) -> Result<Self, Vec<String>> {
        let mut reader = FieldReader::new(record);
        let name = reader.required_str("name");
        let category = reader
            .required_variant("category")
            .and_then(|c| reader.check(c.parse::<PatternCategory>()));
        let description = reader.required_str("description");
        let code = reader.required_str("code");
        let language = reader
            .optional_str("language")
            .unwrap_or_else(|| "rust".to_string());
        let tags = reader.str_list("tags");
        let notes = reader.str_list("notes");

        for issue in check_balance(&code, Syntax::for_language(&language)) {
            reader.error(format!("code: {}", issue));
        }

        reader.finish(|| PatternDescriptor {
            name,
            category: category.unwrap_or(PatternCategory::Backend),
            description,
            code,
            language,
            tags,
            notes,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub description: String,
    pub features: Vec<String>,
    pub use_cases: Vec<String>,
    pub command: String,
}

impl Descriptor for PackageDescriptor {
    const BINDING: &'static str = "PACKAGES";
    const KIND: &'static str = "package";

    fn from_record(record: &Record) -> Result<Self, Vec<String>> {
        let mut reader = FieldReader::new(record);
        let name = reader.required_str("name");
        let description = reader.required_str("description");
        let features = reader.str_list("features");
        let use_cases = reader.str_list("use_cases");
        let command = reader.required_str("command");

        reader.finish(|| PackageDescriptor {
            name,
            description,
            features,
            use_cases,
            command,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("Backend".parse::<PatternCategory>(), Ok(PatternCategory::Backend));
        assert!("ui".parse::<PatternCategory>().is_err());
    }

    #[test]
    fn test_option_kind_aliases() {
        assert_eq!("bool".parse::<OptionKind>(), Ok(OptionKind::Boolean));
        assert_eq!("Number".parse::<OptionKind>(), Ok(OptionKind::Number));
        assert!("array".parse::<OptionKind>().is_err());
    }
}
