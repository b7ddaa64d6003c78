use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("File system error: {message}")]
    FileSystemError { message: String },

    #[error("Parsing error: {message}")]
    ParsingError { message: String },
}

impl ConfigError {
    /// Create a missing required field error
    pub fn missing_required(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T: ?Sized> {
    fn validate(&self, field: &str, value: &T) -> Result<(), ConfigError>;
}

/// Accepts SQL identifiers usable unquoted (schema and table names)
pub struct IdentifierValidator;

impl ConfigValidator<str> for IdentifierValidator {
    fn validate(&self, field: &str, value: &str) -> Result<(), ConfigError> {
        let mut chars = value.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

        if !valid_start || !valid_rest || value.len() > 63 {
            return Err(ConfigError::invalid_value(
                field,
                value,
                "lowercase SQL identifier ([a-z_][a-z0-9_]*, at most 63 characters)",
            ));
        }
        Ok(())
    }
}

/// Database URL validator
pub struct DatabaseUrlValidator {
    pub schemes: Vec<String>,
}

impl Default for DatabaseUrlValidator {
    fn default() -> Self {
        Self {
            schemes: vec!["postgres".to_string(), "postgresql".to_string()],
        }
    }
}

impl ConfigValidator<str> for DatabaseUrlValidator {
    fn validate(&self, field: &str, value: &str) -> Result<(), ConfigError> {
        let has_valid_scheme = self
            .schemes
            .iter()
            .any(|scheme| value.starts_with(&format!("{}://", scheme)));

        if !has_valid_scheme {
            return Err(ConfigError::invalid_value(
                field,
                value,
                format!("URL with scheme: {}", self.schemes.join(", ")),
            ));
        }
        Ok(())
    }
}

/// Log level validator
pub struct LogLevelValidator;

impl ConfigValidator<str> for LogLevelValidator {
    fn validate(&self, field: &str, value: &str) -> Result<(), ConfigError> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&value) {
            return Err(ConfigError::invalid_value(
                field,
                value,
                format!("one of: {}", valid_levels.join(", ")),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validator() {
        let validator = IdentifierValidator;

        assert!(validator.validate("schema", "public").is_ok());
        assert!(validator.validate("schema", "inventory_2").is_ok());
        assert!(validator.validate("schema", "_private").is_ok());
        assert!(validator.validate("schema", "").is_err());
        assert!(validator.validate("schema", "2fast").is_err());
        assert!(validator.validate("schema", "Public").is_err());
        assert!(validator.validate("schema", "drop table;").is_err());
    }

    #[test]
    fn test_database_url_validator() {
        let validator = DatabaseUrlValidator::default();

        assert!(validator
            .validate("database_url", "postgres://localhost/app")
            .is_ok());
        assert!(validator
            .validate("database_url", "postgresql://u:p@db:5432/app")
            .is_ok());
        assert!(validator
            .validate("database_url", "mysql://localhost/app")
            .is_err());
    }

    #[test]
    fn test_log_level_validator() {
        assert!(LogLevelValidator.validate("log_level", "debug").is_ok());
        assert!(LogLevelValidator.validate("log_level", "verbose").is_err());
    }
}
