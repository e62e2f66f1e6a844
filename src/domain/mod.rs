//! Domain layer: persistent records, value types, and slug derivation.

pub mod entities;
pub mod error;
pub mod slug;
pub mod types;
