#![forbid(unsafe_code)]
//! spillbuf: stage a byte stream of unknown size without unbounded memory use.
//!
//! Small payloads stay in memory; anything past the configured budget is
//! moved to a temporary file. Either way the data is read back through the
//! same `Read`/`Seek`/`read_at` surface.
//!
//! ```no_run
//! use std::io::Read;
//! use spillbuf::{BufferConfig, SpillBuffer};
//!
//! let mut buf = SpillBuffer::new(BufferConfig::default().with_memory_budget(1024));
//! let mut body: &[u8] = b"request body";
//! buf.read_from(&mut body)?;
//!
//! let mut out = Vec::new();
//! buf.read_to_end(&mut out)?;
//! buf.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use spillbuf_core::budget::MemoryBudget;
pub use spillbuf_core::config::{BufferConfig, DEFAULT_MEMORY_BUDGET, SPILL_FILE_PREFIX};
pub use spillbuf_core::error::{Error, Result};
pub use spillbuf_mem::{ReadAt, SpillBuffer};

pub mod prelude {
    pub use spillbuf_core::prelude::*;
    pub use spillbuf_mem::SpillBuffer;
}
