pub mod config;
pub mod errors;
pub mod naming;

pub use config::{ConfigError, ConfigSource, Environment, GeneratorConfig, ReferenceConfig};
pub use errors::{ForgeError, ForgeResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generator identity written into every generated file header
pub const GENERATOR_NAME: &str = "crudforge";

/// `crudforge@<version>`
pub fn generator_identity() -> String {
    format!("{}@{}", GENERATOR_NAME, VERSION)
}
