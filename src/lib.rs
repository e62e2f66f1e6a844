//! Content-management core: a hierarchical category tree with
//! materialized paths, a cache-coherent object cache, a listing URL
//! resolver, and a polymorphic relation registry.
//!
//! The crate is layered bottom-up:
//!
//! - [`domain`]: records, value types, and pure helpers.
//! - [`application`]: repository traits and the services implementing the
//!   category tree, listing resolution, relations, hit counting, polls,
//!   and render boxes.
//! - [`cache`]: the object cache with event-driven invalidation.
//! - [`infra`]: persistence adapters and telemetry.
//! - [`config`]: layered settings.
//!
//! [`Core`] wires everything together over a repository bundle.

pub mod application;
pub mod cache;
pub mod config;
pub mod core;
pub mod domain;
pub mod infra;

pub use crate::core::Core;
