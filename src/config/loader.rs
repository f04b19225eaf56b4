//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{DatabaseTarget, ToolpackConfig};
use super::secret::secret_string;
use crate::domain::errors::ToolpackError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into ToolpackConfig
/// 4. Applies environment variable overrides (TOOLPACK_* prefix)
/// 5. Validates the configuration
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use toolpack::config::loader::load_config;
///
/// let config = load_config("toolpack.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ToolpackConfig> {
    let path = path.as_ref();

    // Check if file exists
    if !path.exists() {
        return Err(ToolpackError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    // Read file contents
    let contents = fs::read_to_string(path).map_err(|e| {
        ToolpackError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    // Perform environment variable substitution
    let contents = substitute_env_vars(&contents)?;

    // Parse TOML
    let mut config: ToolpackConfig = toml::from_str(&contents)
        .map_err(|e| ToolpackError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    // Apply environment variable overrides
    apply_env_overrides(&mut config)?;

    // Validate configuration
    config.validate().map_err(|e| {
        ToolpackError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes `${VAR_NAME}` placeholders with environment values
///
/// Comment lines are copied untouched, so documented placeholders in
/// comments never need to be set.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| {
        ToolpackError::Configuration(format!("Invalid substitution pattern: {}", e))
    })?;
    let mut missing_vars: Vec<String> = Vec::new();
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
        } else {
            let substituted = re.replace_all(line, |cap: &regex::Captures<'_>| {
                let var_name = &cap[1];
                std::env::var(var_name).unwrap_or_else(|_| {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    cap[0].to_string()
                })
            });
            result.push_str(&substituted);
        }
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(ToolpackError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using TOOLPACK_* prefix
///
/// Environment variables follow the pattern: TOOLPACK_<SECTION>_<KEY>
/// For example: TOOLPACK_EXPORT_SCRATCH_ROOT, TOOLPACK_DATABASE_TARGET
///
/// # Errors
///
/// Returns an error if an override cannot be parsed
fn apply_env_overrides(config: &mut ToolpackConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("TOOLPACK_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Export overrides
    if let Ok(val) = std::env::var("TOOLPACK_EXPORT_SCRATCH_ROOT") {
        config.export.scratch_root = val;
    }
    if let Some(val) = parse_env("TOOLPACK_EXPORT_STEP_TIMEOUT_SECONDS")? {
        config.export.step_timeout_seconds = val;
    }
    if let Some(val) = parse_env("TOOLPACK_EXPORT_MAX_ATTEMPTS")? {
        config.export.max_attempts = val;
    }
    if let Some(val) = parse_env("TOOLPACK_EXPORT_BACKOFF_BASE_SECONDS")? {
        config.export.backoff_base_seconds = val;
    }
    if let Some(val) = parse_env("TOOLPACK_EXPORT_RECOVER_ON_STARTUP")? {
        config.export.recover_on_startup = val;
    }

    // Registry overrides
    if let Ok(val) = std::env::var("TOOLPACK_REGISTRY_TOOLS_FILE") {
        config.registry.tools_file = Some(val);
    }

    // Database overrides
    if let Ok(val) = std::env::var("TOOLPACK_DATABASE_TARGET") {
        config.database_target = match val.to_lowercase().as_str() {
            "memory" => DatabaseTarget::Memory,
            "postgresql" => DatabaseTarget::PostgreSQL,
            other => {
                return Err(ToolpackError::Configuration(format!(
                    "Invalid TOOLPACK_DATABASE_TARGET '{}'. Must be memory or postgresql",
                    other
                )))
            }
        };
    }
    if let Some(ref mut pg_config) = config.postgresql {
        if let Ok(val) = std::env::var("TOOLPACK_POSTGRESQL_CONNECTION_STRING") {
            pg_config.connection_string = secret_string(val);
        }
        if let Some(val) = parse_env("TOOLPACK_POSTGRESQL_MAX_CONNECTIONS")? {
            pg_config.max_connections = val;
        }
        if let Ok(val) = std::env::var("TOOLPACK_POSTGRESQL_SSL_MODE") {
            pg_config.ssl_mode = val;
        }
    }

    // Logging overrides
    if let Some(val) = parse_env("TOOLPACK_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = val;
    }
    if let Ok(val) = std::env::var("TOOLPACK_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("TOOLPACK_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(val) => val.trim().parse().map(Some).map_err(|e: T::Err| {
            ToolpackError::Configuration(format!("Invalid value '{}' for {}: {}", val, name, e))
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_MUTEX;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_substitute_env_vars() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("TOOLPACK_TEST_VAR", "test_value");
        let result = substitute_env_vars("password = \"${TOOLPACK_TEST_VAR}\"").unwrap();
        assert_eq!(result.trim_end(), "password = \"test_value\"");
        std::env::remove_var("TOOLPACK_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var("TOOLPACK_MISSING_VAR");
        let result = substitute_env_vars("password = \"${TOOLPACK_MISSING_VAR}\"");
        assert!(result.unwrap_err().to_string().contains("TOOLPACK_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        let result = substitute_env_vars("# uses ${TOOLPACK_UNSET_IN_COMMENT}\nkey = 1").unwrap();
        assert!(result.contains("${TOOLPACK_UNSET_IN_COMMENT}"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-toolpack.toml");
        assert!(matches!(result, Err(ToolpackError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let temp_file = write_config(
            r#"
database_target = "memory"

[application]
log_level = "debug"

[export]
scratch_root = "/tmp/toolpack-test"
max_attempts = 5

[registry]
tools_file = "tools.json"
"#,
        );

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.export.max_attempts, 5);
        assert_eq!(config.registry.tools_file.as_deref(), Some("tools.json"));
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let temp_file = write_config("[export]\nmax_attempts = 0\n");
        let err = load_config(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_env_overrides() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("TOOLPACK_EXPORT_MAX_ATTEMPTS", "4");
        std::env::set_var("TOOLPACK_EXPORT_SCRATCH_ROOT", "/tmp/override");

        let temp_file = write_config("[export]\nmax_attempts = 2\n");
        let result = load_config(temp_file.path());

        std::env::remove_var("TOOLPACK_EXPORT_MAX_ATTEMPTS");
        std::env::remove_var("TOOLPACK_EXPORT_SCRATCH_ROOT");

        let config = result.unwrap();
        assert_eq!(config.export.max_attempts, 4);
        assert_eq!(config.export.scratch_root, "/tmp/override");
    }

    #[test]
    fn test_env_override_parse_error() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("TOOLPACK_EXPORT_MAX_ATTEMPTS", "many");
        let temp_file = write_config("");
        let result = load_config(temp_file.path());
        std::env::remove_var("TOOLPACK_EXPORT_MAX_ATTEMPTS");

        assert!(result.unwrap_err().to_string().contains("TOOLPACK_EXPORT_MAX_ATTEMPTS"));
    }
}
