use std::collections::HashMap;
use std::fmt;

/// Layer a resolved setting came from. Variants are ordered by precedence,
/// lowest first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in default, with its value
    Default(String),
    /// YAML configuration file
    File(String),
    /// Environment variable
    Env(String),
    /// Command-line flag
    CommandLine,
}

impl ConfigSource {
    pub fn is_default(&self) -> bool {
        matches!(self, ConfigSource::Default(_))
    }

    /// Short name of the layer
    pub fn layer(&self) -> &'static str {
        match self {
            ConfigSource::Default(_) => "default",
            ConfigSource::File(_) => "file",
            ConfigSource::Env(_) => "env",
            ConfigSource::CommandLine => "flag",
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Default(value) => write!(f, "default ({})", value),
            ConfigSource::File(path) => write!(f, "{}", path),
            ConfigSource::Env(var) => write!(f, "${}", var),
            ConfigSource::CommandLine => f.write_str("command line"),
        }
    }
}

/// `field: source` lines sorted by field name
pub fn provenance(sources: &HashMap<String, ConfigSource>) -> Vec<String> {
    let mut lines: Vec<String> = sources
        .iter()
        .map(|(field, source)| format!("{}: {}", field, source))
        .collect();
    lines.sort();
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layers_order_by_precedence() {
        assert!(ConfigSource::Default("public".into()) < ConfigSource::File("crudforge.yaml".into()));
        assert!(ConfigSource::File("crudforge.yaml".into()) < ConfigSource::Env("CRUDFORGE_SCHEMA".into()));
        assert!(ConfigSource::Env("CRUDFORGE_SCHEMA".into()) < ConfigSource::CommandLine);
    }

    #[test]
    fn test_provenance_is_sorted() {
        let mut sources = HashMap::new();
        sources.insert("schema".to_string(), ConfigSource::Env("CRUDFORGE_SCHEMA".into()));
        sources.insert("output_dir".to_string(), ConfigSource::CommandLine);
        assert_eq!(
            provenance(&sources),
            ["output_dir: command line", "schema: $CRUDFORGE_SCHEMA"]
        );
    }
}
