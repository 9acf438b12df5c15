//! Convenient re-exports for downstream crates.

pub use crate::budget::MemoryBudget;
pub use crate::config::{BufferConfig, DEFAULT_MEMORY_BUDGET, SPILL_FILE_PREFIX};
pub use crate::error::{Error, Result};
