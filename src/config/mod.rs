//! Configuration management for Toolpack.
//!
//! # Overview
//!
//! Toolpack uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `TOOLPACK_<SECTION>_<KEY>` environment overrides
//! - Default values for every setting
//! - Validation of each section on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use toolpack::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("toolpack.toml")?;
//! println!("Scratch root: {}", config.export.scratch_root);
//! println!("Step timeout: {}s", config.export.step_timeout_seconds);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`ExportConfig`] - Scratch space, step timeout, retry and backoff
//! - [`RegistryConfig`] - Tool registry source
//! - [`PostgreSQLConfig`] - PostgreSQL connection and pool settings
//! - [`LoggingConfig`] - Local file logging
//!
//! # Example Configuration
//!
//! ```toml
//! database_target = "postgresql"
//!
//! [application]
//! log_level = "info"
//!
//! [export]
//! scratch_root = "/var/lib/toolpack/exports"
//! step_timeout_seconds = 300
//! max_attempts = 3
//! backoff_base_seconds = 2
//!
//! [postgresql]
//! connection_string = "${TOOLPACK_PG_DSN}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, DatabaseTarget, ExportConfig, LoggingConfig, PostgreSQLConfig,
    RegistryConfig, ToolpackConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};

/// Serializes unit tests that read or write `TOOLPACK_*` variables
#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
