pub mod memory;

pub use memory::{MemoryStore, memory_repos};
