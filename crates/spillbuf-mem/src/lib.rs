#![forbid(unsafe_code)]
//! spillbuf-mem: a staging buffer that keeps small payloads in memory and
//! spills large ones to a temporary file.
//!
//! Writes go to a `Vec<u8>` while they fit within the remaining memory budget.
//! The first ingest that would exceed it moves everything to a file in the
//! host temp directory. Reads are served through one lazily resolved handle,
//! so callers see the same `Read`/`Seek`/`read_at` surface either way.

pub mod buffer;
pub mod spill;
pub mod store;

pub use buffer::SpillBuffer;
pub use spill::SpillFile;
pub use store::{FileHandle, MemoryWindow, ReadAt, ReadHandle};

pub use spillbuf_core::config::{BufferConfig, DEFAULT_MEMORY_BUDGET, SPILL_FILE_PREFIX};
pub use spillbuf_core::error::{Error, Result};
