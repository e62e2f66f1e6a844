//! Infrastructure: persistence adapters, telemetry, and their errors.

pub mod db;
pub mod error;
pub mod telemetry;

pub use db::{MemoryStore, memory_repos};
pub use error::InfraError;
