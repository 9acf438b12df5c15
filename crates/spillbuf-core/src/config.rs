//! Buffer configuration that callers can serialize/deserialize.

use serde::{Deserialize, Serialize};

/// Default in-memory budget: 256 KiB.
pub const DEFAULT_MEMORY_BUDGET: u64 = 1 << 18;

/// Filename prefix for spill files in the host temp directory.
pub const SPILL_FILE_PREFIX: &str = "mem-buf-";

/// Environment variable overriding [`BufferConfig::memory_budget`].
pub const ENV_MEMORY_BUDGET: &str = "SPILLBUF_MEMORY_BUDGET";

/// Environment variable overriding [`BufferConfig::remove_on_close`].
pub const ENV_REMOVE_ON_CLOSE: &str = "SPILLBUF_REMOVE_ON_CLOSE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Bytes that may be held in memory before the buffer spills to disk.
    /// Exactly this many bytes stay in memory; one more spills.
    pub memory_budget: u64,

    /// Delete the spill file when the buffer is closed.
    pub remove_on_close: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            memory_budget: DEFAULT_MEMORY_BUDGET,
            remove_on_close: true,
        }
    }
}

impl BufferConfig {
    pub fn new(memory_budget: u64, remove_on_close: bool) -> Self {
        Self {
            memory_budget,
            remove_on_close,
        }
    }

    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = bytes;
        self
    }

    pub fn with_remove_on_close(mut self, remove: bool) -> Self {
        self.remove_on_close = remove;
        self
    }

    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `SPILLBUF_MEMORY_BUDGET`: in-memory budget in bytes
    /// - `SPILLBUF_REMOVE_ON_CLOSE`: `true`/`false` (also `1`/`0`, `yes`/`no`)
    ///
    /// Values that fail to parse are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`BufferConfig::from_env`] with a caller-supplied variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(s) = lookup(ENV_MEMORY_BUDGET) {
            if let Ok(v) = s.trim().parse::<u64>() {
                cfg.memory_budget = v;
            }
        }

        if let Some(s) = lookup(ENV_REMOVE_ON_CLOSE) {
            if let Some(v) = parse_flag(&s) {
                cfg.remove_on_close = v;
            }
        }

        cfg
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
