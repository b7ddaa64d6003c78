use crate::config::{
    ConfigError, ConfigSource, ConfigValidator, DatabaseUrlValidator, IdentifierValidator,
    LogLevelValidator,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "crudforge.yaml";

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_ENVIRONMENT: &str = "CRUDFORGE_ENV";
pub const ENV_SCHEMA: &str = "CRUDFORGE_SCHEMA";
pub const ENV_OUTPUT_DIR: &str = "CRUDFORGE_OUTPUT_DIR";
pub const ENV_MIGRATIONS_DIR: &str = "CRUDFORGE_MIGRATIONS_DIR";
pub const ENV_LOG_LEVEL: &str = "CRUDFORGE_LOG";

/// Environment enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::invalid_value(
                "environment",
                s,
                "development, testing, or production",
            )),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env_str = match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Production => "production",
        };
        write!(f, "{}", env_str)
    }
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Inputs and output of the reference-table sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Rust source files declaring `COMMANDS`, `PATTERNS` or `PACKAGES`
    pub sources: Vec<PathBuf>,
    /// Markdown documents mined for examples and notes
    pub docs: Vec<PathBuf>,
    /// Generated reference module
    pub output: PathBuf,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            docs: Vec::new(),
            output: PathBuf::from("src/reference/generated.rs"),
        }
    }
}

/// On-disk shape of `crudforge.yaml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub environment: Option<Environment>,
    pub database_url: Option<String>,
    pub schema: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub frontend_dir: Option<PathBuf>,
    pub migrations_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub reference: Option<ReferenceConfig>,
}

/// Resolved generator configuration: defaults, then file, then environment
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub environment: Environment,
    pub database_url: Option<String>,
    pub db_schema: String,
    pub output_dir: PathBuf,
    pub frontend_dir: PathBuf,
    pub migrations_dir: PathBuf,
    pub log_level: String,
    pub reference: ReferenceConfig,
    sources: HashMap<String, ConfigSource>,
}

impl GeneratorConfig {
    pub fn new() -> Self {
        let mut sources = HashMap::new();
        for (field, value) in [
            ("environment", "development"),
            ("database_url", "unset"),
            ("schema", "public"),
            ("output_dir", "src/modules"),
            ("frontend_dir", "frontend/src/clients"),
            ("migrations_dir", "migrations"),
            ("log_level", "info"),
        ] {
            sources.insert(field.to_string(), ConfigSource::Default(value.to_string()));
        }

        Self {
            environment: Environment::Development,
            database_url: None,
            db_schema: "public".to_string(),
            output_dir: PathBuf::from("src/modules"),
            frontend_dir: PathBuf::from("frontend/src/clients"),
            migrations_dir: PathBuf::from("migrations"),
            log_level: "info".to_string(),
            reference: ReferenceConfig::default(),
            sources,
        }
    }

    /// Load configuration from an explicit file (which must exist) or from
    /// `crudforge.yaml` in the working directory when present, then overlay
    /// environment variables and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::new();

        match path {
            Some(path) => config.apply_file(path)?,
            None => {
                let implicit = Path::new(DEFAULT_CONFIG_FILE);
                if implicit.exists() {
                    config.apply_file(implicit)?;
                }
            }
        }

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from a YAML configuration file
    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileSystemError {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let file: ConfigFile =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParsingError {
                message: format!("{}: {}", path.display(), e),
            })?;

        tracing::debug!("applying configuration file {}", path.display());
        let origin = ConfigSource::File(path.display().to_string());

        if let Some(environment) = file.environment {
            self.environment = environment;
            self.mark("environment", origin.clone());
        }
        if let Some(url) = file.database_url {
            self.database_url = Some(url);
            self.mark("database_url", origin.clone());
        }
        if let Some(schema) = file.schema {
            self.db_schema = schema;
            self.mark("schema", origin.clone());
        }
        if let Some(dir) = file.output_dir {
            self.output_dir = dir;
            self.mark("output_dir", origin.clone());
        }
        if let Some(dir) = file.frontend_dir {
            self.frontend_dir = dir;
            self.mark("frontend_dir", origin.clone());
        }
        if let Some(dir) = file.migrations_dir {
            self.migrations_dir = dir;
            self.mark("migrations_dir", origin.clone());
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
            self.mark("log_level", origin.clone());
        }
        if let Some(reference) = file.reference {
            self.reference = reference;
            self.mark("reference", origin);
        }

        Ok(())
    }

    /// Overlay values from environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(env_str) = env::var(ENV_ENVIRONMENT) {
            self.environment = env_str.parse()?;
            self.mark("environment", ConfigSource::Env(ENV_ENVIRONMENT.to_string()));
        }
        if let Ok(url) = env::var(ENV_DATABASE_URL) {
            self.database_url = Some(url);
            self.mark("database_url", ConfigSource::Env(ENV_DATABASE_URL.to_string()));
        }
        if let Ok(schema) = env::var(ENV_SCHEMA) {
            self.db_schema = schema;
            self.mark("schema", ConfigSource::Env(ENV_SCHEMA.to_string()));
        }
        if let Ok(dir) = env::var(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
            self.mark("output_dir", ConfigSource::Env(ENV_OUTPUT_DIR.to_string()));
        }
        if let Ok(dir) = env::var(ENV_MIGRATIONS_DIR) {
            self.migrations_dir = PathBuf::from(dir);
            self.mark("migrations_dir", ConfigSource::Env(ENV_MIGRATIONS_DIR.to_string()));
        }
        if let Ok(level) = env::var(ENV_LOG_LEVEL) {
            self.log_level = level;
            self.mark("log_level", ConfigSource::Env(ENV_LOG_LEVEL.to_string()));
        }
        Ok(())
    }

    /// Override the catalog schema from the command line
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.db_schema = schema.into();
        self.mark("schema", ConfigSource::CommandLine);
        self
    }

    /// Override the output directory from the command line
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self.mark("output_dir", ConfigSource::CommandLine);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        IdentifierValidator.validate("schema", &self.db_schema)?;
        LogLevelValidator.validate("log_level", &self.log_level)?;
        if let Some(url) = &self.database_url {
            DatabaseUrlValidator::default().validate("database_url", url)?;
        }
        Ok(())
    }

    /// The database URL, required by every catalog-backed command
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url.as_deref().ok_or_else(|| {
            ConfigError::missing_required(
                "database_url",
                format!(
                    "set {} or database_url in {}, or pass --catalog-snapshot",
                    ENV_DATABASE_URL, DEFAULT_CONFIG_FILE
                ),
            )
        })
    }

    /// Migrations directory, partitioned per domain root (`migrations-<domain>`)
    pub fn migrations_dir_for(&self, domain: Option<&str>) -> PathBuf {
        match domain.and_then(|d| d.split('/').next()).filter(|d| !d.is_empty()) {
            Some(root) => {
                let kebab = root.to_lowercase().replace('_', "-");
                let base = self
                    .migrations_dir
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_else(|| "migrations".to_string());
                self.migrations_dir
                    .with_file_name(format!("{}-{}", base, kebab))
            }
            None => self.migrations_dir.clone(),
        }
    }

    /// Provenance of every resolved field
    pub fn config_sources(&self) -> &HashMap<String, ConfigSource> {
        &self.sources
    }

    fn mark(&mut self, field: &str, source: ConfigSource) {
        self.sources.insert(field.to_string(), source);
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        for var in [
            ENV_DATABASE_URL,
            ENV_ENVIRONMENT,
            ENV_SCHEMA,
            ENV_OUTPUT_DIR,
            ENV_MIGRATIONS_DIR,
            ENV_LOG_LEVEL,
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = GeneratorConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.db_schema, "public");
        assert!(config.config_sources()["schema"].is_default());
    }

    #[test]
    #[serial]
    fn test_file_then_env_precedence() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("crudforge.yaml");
        std::fs::write(
            &path,
            "schema: inventory\noutput_dir: api/modules\nenvironment: testing\n",
        )
        .unwrap();

        env::set_var(ENV_SCHEMA, "billing");
        let config = GeneratorConfig::load(Some(&path)).unwrap();
        clear_env();

        assert_eq!(config.db_schema, "billing");
        assert_eq!(config.output_dir, PathBuf::from("api/modules"));
        assert_eq!(config.environment, Environment::Testing);
        assert_eq!(config.config_sources()["schema"].layer(), "env");
        assert_eq!(config.config_sources()["output_dir"].layer(), "file");
    }

    #[test]
    #[serial]
    fn test_unknown_keys_are_rejected() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("crudforge.yaml");
        std::fs::write(&path, "shema: typo\n").unwrap();

        let result = GeneratorConfig::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::ParsingError { .. })));
    }

    #[test]
    #[serial]
    fn test_invalid_schema_from_env_fails_validation() {
        clear_env();
        env::set_var(ENV_SCHEMA, "Robert'); DROP");
        let result = GeneratorConfig::load(None);
        clear_env();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_missing_database_url_has_hint() {
        let config = GeneratorConfig::new();
        let err = config.require_database_url().unwrap_err();
        assert!(err.to_string().contains(ENV_DATABASE_URL));
    }

    #[test]
    fn test_migrations_dir_for_domain() {
        let config = GeneratorConfig::new();
        assert_eq!(config.migrations_dir_for(None), PathBuf::from("migrations"));
        assert_eq!(
            config.migrations_dir_for(Some("inventory/master_data")),
            PathBuf::from("migrations-inventory")
        );
        assert_eq!(
            config.migrations_dir_for(Some("Human_Resources")),
            PathBuf::from("migrations-human-resources")
        );
    }
}
