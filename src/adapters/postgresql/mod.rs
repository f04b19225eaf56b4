//! PostgreSQL database integration
//!
//! Durable storage for export job records and a read-only view of the tool
//! registry. The schema lives in `migrations/001_initial_schema.sql`.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::{PostgreSQLExportJobRepository, PostgreSQLToolRegistry};
pub use client::PostgreSQLClient;
