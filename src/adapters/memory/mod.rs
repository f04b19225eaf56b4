//! In-process repository implementations
//!
//! These back the `memory` database target and the test suites.

pub mod jobs;
pub mod tools;

pub use jobs::InMemoryExportJobRepository;
pub use tools::InMemoryToolRegistry;
