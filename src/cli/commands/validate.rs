//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Toolpack configuration file.

use super::EXIT_CONFIGURATION;
use crate::config::load_config;
use crate::config::schema::DatabaseTarget;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIGURATION);
            }
        };

        match config.validate() {
            Ok(_) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Log Level: {}", config.application.log_level);

                match config.database_target {
                    DatabaseTarget::Memory => {
                        println!("  Database Target: memory");
                    }
                    DatabaseTarget::PostgreSQL => {
                        if let Some(ref pg_config) = config.postgresql {
                            use secrecy::ExposeSecret;
                            println!("  Database Target: PostgreSQL");
                            println!(
                                "  PostgreSQL Connection: {}",
                                pg_config
                                    .connection_string
                                    .expose_secret()
                                    .as_str()
                                    .split('@')
                                    .next_back()
                                    .unwrap_or("***")
                            );
                            println!("  Max Connections: {}", pg_config.max_connections);
                            println!("  SSL Mode: {}", pg_config.ssl_mode);
                        }
                    }
                }

                println!(
                    "  Tools File: {}",
                    config.registry.tools_file.as_deref().unwrap_or("(none)")
                );
                println!("  Scratch Root: {}", config.export.scratch_root);
                println!("  Step Timeout: {}s", config.export.step_timeout_seconds);
                println!(
                    "  Retries: {} attempt(s), {}s backoff base",
                    config.export.max_attempts, config.export.backoff_base_seconds
                );
                println!("  Recover On Startup: {}", config.export.recover_on_startup);
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(EXIT_CONFIGURATION)
            }
        }
    }
}
