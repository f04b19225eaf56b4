// Toolpack - Export Job Orchestrator
// Copyright (c) 2025 Toolpack Contributors
// Licensed under the MIT License

//! # Toolpack - Export Job Orchestrator
//!
//! Toolpack turns a registered tool (a form, workflow or theme stored in a
//! tool registry) into a standalone deployable package. Every export runs as
//! a tracked background job through a sequence of reversible steps.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Starting** export jobs after pre-flight and permission checks
//! - **Executing** strategy-defined steps with per-step timeout and retry
//! - **Tracking** progress in a durable job record
//! - **Cancelling** jobs cooperatively at step boundaries
//! - **Rolling back** completed steps in reverse on failure or cancellation
//! - **Recovering** jobs left unfinished by a crashed process
//!
//! ## Architecture
//!
//! Toolpack follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Orchestration, step execution, rollback, strategies
//! - [`adapters`] - Tool registry and job repositories (memory, PostgreSQL)
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use toolpack::adapters::memory::{InMemoryExportJobRepository, InMemoryToolRegistry};
//! use toolpack::core::export::ExportOrchestrator;
//! use toolpack::domain::{ToolId, UserId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tools = Arc::new(InMemoryToolRegistry::from_json_file("tools.json").await?);
//!     let jobs = Arc::new(InMemoryExportJobRepository::new());
//!     let orchestrator = ExportOrchestrator::builder(tools, jobs).build();
//!
//!     let job = orchestrator
//!         .start_export(&ToolId::new("contact-form"), &UserId::new("u-1"))
//!         .await?;
//!     println!("Started export job {}", job.job_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Toolpack uses the [`domain::ToolpackError`] type for all library errors:
//!
//! ```rust,no_run
//! use toolpack::domain::ToolpackError;
//!
//! fn example() -> Result<(), ToolpackError> {
//!     let config = toolpack::config::load_config("toolpack.toml")?;
//!     println!("scratch root: {}", config.export.scratch_root);
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Toolpack uses structured logging with the `tracing` crate; every job
//! related event carries a `job_id` field:
//!
//! ```rust
//! use toolpack::domain::{JobId, JobStatus};
//! use toolpack::log_job_transition;
//!
//! let job_id = JobId::generate();
//! log_job_transition!(job_id, JobStatus::InProgress);
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
