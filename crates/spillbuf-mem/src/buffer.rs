//! The staging buffer: memory while the payload fits the budget, a temporary
//! file once it does not.
//!
//! Lifecycle:
//! 1. Write phase: `read_from` / `io::Write` append against the remaining
//!    budget. The call that would exceed it spills everything to a file, and
//!    later calls append to that file.
//! 2. Read phase: the first `read`, `read_at` or `seek` resolves one read
//!    handle and seals the buffer against further writes.
//! 3. `close` releases the handle and, when `remove_on_close` is set, deletes
//!    the spill file. `remove` deletes it explicitly at any time.

use std::fmt;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::mem;
use std::path::{Path, PathBuf};

use spillbuf_core::budget::MemoryBudget;
use spillbuf_core::config::BufferConfig;
use spillbuf_core::error::{Error, Result};

use crate::spill::SpillFile;
use crate::store::{FileHandle, MemoryWindow, ReadAt, ReadHandle};

/// Where the ingested bytes live. Moves from `Memory` to `Disk` at most once.
enum BackingStore {
    Memory(Vec<u8>),
    Disk(SpillFile),
    /// Memory released by `close`, or spill file deleted by `remove`.
    Released,
}

/// Write-once read handle slot.
enum ReadState {
    /// Still in the write phase.
    Pending,
    Ready(ReadHandle),
    /// Resolution failed; reported again on every read-phase call.
    Unavailable {
        kind: io::ErrorKind,
        reason: String,
    },
    Released,
}

/// Byte buffer bounded in memory, spilling to a temporary file when large.
///
/// Single writer, then single reader. Not meant for concurrent use.
pub struct SpillBuffer {
    config: BufferConfig,
    budget: MemoryBudget,
    total: u64,
    store: BackingStore,
    read: ReadState,
    spilled: bool,
    closed: bool,
    /// Overrides the host temp directory for spill files (tests only).
    spill_dir: Option<PathBuf>,
}

impl SpillBuffer {
    pub fn new(config: BufferConfig) -> Self {
        Self {
            budget: MemoryBudget::new(config.memory_budget),
            config,
            total: 0,
            store: BackingStore::Memory(Vec::new()),
            read: ReadState::Pending,
            spilled: false,
            closed: false,
            spill_dir: None,
        }
    }

    pub fn with_budget(memory_budget: u64, remove_on_close: bool) -> Self {
        Self::new(BufferConfig::new(memory_budget, remove_on_close))
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    #[cfg(test)]
    fn with_spill_dir(mut self, dir: &Path) -> Self {
        self.spill_dir = Some(dir.to_path_buf());
        self
    }

    /// Total bytes ingested so far.
    pub fn len(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Whether the contents moved to a spill file.
    pub fn is_spilled(&self) -> bool {
        self.spilled
    }

    /// Bytes that may still be ingested before the buffer spills.
    pub fn remaining_budget(&self) -> u64 {
        self.budget.remaining()
    }

    /// Path of the spill file, while one exists on disk.
    pub fn spill_path(&self) -> Option<&Path> {
        match &self.store {
            BackingStore::Disk(spill) => Some(spill.path()),
            _ => None,
        }
    }

    /// Ingest everything `source` yields. Returns the number of bytes taken.
    ///
    /// At most `remaining_budget() + 1` bytes are pulled into memory; if the
    /// extra byte arrives, the memory contents and the rest of `source` are
    /// written to a new spill file. Once spilled, ingests append to the file.
    ///
    /// If the bytes of this call go nowhere (source or spill failure while
    /// still in memory), the buffer keeps what earlier calls ingested. A
    /// failure while appending to an existing spill file leaves a partial
    /// tail; discard the buffer then.
    pub fn read_from<R: Read + ?Sized>(&mut self, source: &mut R) -> Result<u64> {
        self.ensure_writable()?;
        let before = self.total;

        let spilled = match &mut self.store {
            BackingStore::Memory(memory) => {
                let start = memory.len();
                let probe = self.budget.probe_len();
                if let Err(e) = (&mut *source).take(probe).read_to_end(memory) {
                    memory.truncate(start);
                    return Err(Error::Source(e));
                }

                let n = (memory.len() - start) as u64;
                if self.budget.try_charge(n) {
                    self.total += n;
                    None
                } else {
                    let head = mem::take(memory);
                    let res = match self.spill_dir.as_deref() {
                        Some(dir) => SpillFile::spill_in(dir, &head, source),
                        None => SpillFile::spill(&head, source),
                    };
                    match res {
                        Ok(spill) => Some(spill),
                        Err(e) => {
                            // Back to what earlier ingests left in memory
                            *memory = head;
                            memory.truncate(start);
                            return Err(e);
                        }
                    }
                }
            }
            BackingStore::Disk(spill) => {
                self.total += spill.append(source)?;
                None
            }
            BackingStore::Released => return Err(Error::Closed),
        };

        if let Some(spill) = spilled {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                path = %spill.path().display(),
                bytes = spill.written(),
                budget = self.budget.limit(),
                "memory budget exceeded, spilled to disk"
            );
            self.total = spill.written();
            self.budget.exhaust();
            self.spilled = true;
            self.store = BackingStore::Disk(spill);
        }

        Ok(self.total - before)
    }

    /// Sequential read from the current position. `Ok(0)` at end of data.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.handle()?.read(buf).map_err(Error::Read)
    }

    /// Read at `offset` without moving the sequential position.
    ///
    /// Fills `buf` unless end of data comes first; `Ok(0)` at or past the end.
    pub fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.handle()?.read_at(buf, offset).map_err(Error::Read)
    }

    /// Reposition the cursor; returns the new absolute position.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.handle()?.seek(pos).map_err(Error::Read)
    }

    /// Delete the spill file, if any, releasing open handles on it.
    ///
    /// A no-op when nothing was spilled or the file is already removed. If
    /// deletion fails for a reason other than the file being gone, the path is
    /// kept so a later call can retry.
    pub fn remove(&mut self) -> Result<()> {
        let BackingStore::Disk(spill) = &mut self.store else {
            return Ok(());
        };

        spill.release();
        if matches!(self.read, ReadState::Ready(_)) {
            self.read = ReadState::Released;
        }

        let res = fs::remove_file(spill.path());
        let path = spill.path().to_path_buf();
        match res {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(path = %path.display(), "removed spill file");
                self.store = BackingStore::Released;
                self.read = ReadState::Released;
                Ok(())
            }
            Err(source) => {
                if source.kind() == io::ErrorKind::NotFound {
                    self.store = BackingStore::Released;
                    self.read = ReadState::Released;
                }
                Err(Error::Remove { path, source })
            }
        }
    }

    /// Release the read handle and in-memory data; delete the spill file too
    /// when `remove_on_close` is set.
    ///
    /// Safe to call repeatedly. Each call retries a still-pending removal.
    pub fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.read = ReadState::Released;
        if let BackingStore::Disk(spill) = &mut self.store {
            spill.release();
        } else {
            self.store = BackingStore::Released;
        }

        if self.config.remove_on_close {
            self.remove()
        } else {
            Ok(())
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.closed || matches!(self.store, BackingStore::Released) {
            return Err(Error::Closed);
        }
        match self.read {
            ReadState::Pending => Ok(()),
            _ => Err(Error::Sealed),
        }
    }

    /// Resolve the read handle on first use, then hand out the same one.
    fn handle(&mut self) -> Result<&mut ReadHandle> {
        if self.closed {
            return Err(Error::Closed);
        }
        if matches!(self.read, ReadState::Pending) {
            self.read = self.resolve();
        }
        match &mut self.read {
            ReadState::Ready(handle) => Ok(handle),
            ReadState::Unavailable { kind, reason } => Err(Error::StoreUnavailable {
                kind: *kind,
                reason: reason.clone(),
            }),
            ReadState::Pending | ReadState::Released => Err(Error::Closed),
        }
    }

    fn resolve(&mut self) -> ReadState {
        let state = match &mut self.store {
            BackingStore::Memory(memory) => {
                ReadState::Ready(ReadHandle::Memory(MemoryWindow::new(mem::take(memory))))
            }
            BackingStore::Disk(spill) => match spill.finish() {
                Err(e) => ReadState::Unavailable {
                    kind: io::ErrorKind::Other,
                    reason: e.to_string(),
                },
                Ok(()) => match FileHandle::open(spill.path()) {
                    Ok(handle) => ReadState::Ready(ReadHandle::File(handle)),
                    Err(e) => ReadState::Unavailable {
                        kind: e.kind(),
                        reason: format!("open '{}': {e}", spill.path().display()),
                    },
                },
            },
            BackingStore::Released => ReadState::Released,
        };

        log_resolution(&state);
        state
    }
}

fn log_resolution(_state: &ReadState) {
    #[cfg(feature = "tracing")]
    {
        match _state {
            ReadState::Ready(handle) => {
                tracing::trace!(
                    store = handle.kind(),
                    size = handle.size(),
                    "read handle resolved"
                )
            }
            ReadState::Unavailable { reason, .. } => {
                tracing::debug!(%reason, "backing store unavailable")
            }
            _ => {}
        }
    }
}

impl Default for SpillBuffer {
    fn default() -> Self {
        Self::new(BufferConfig::default())
    }
}

impl fmt::Debug for SpillBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match (&self.read, self.closed) {
            (_, true) => "closed",
            (ReadState::Pending, false) => "write",
            (ReadState::Ready(_), false) => "read",
            (ReadState::Unavailable { .. }, false) => "unavailable",
            (ReadState::Released, false) => "released",
        };
        f.debug_struct("SpillBuffer")
            .field("len", &self.total)
            .field("remaining_budget", &self.budget.remaining())
            .field("spill_path", &self.spill_path())
            .field("phase", &phase)
            .finish()
    }
}

impl Drop for SpillBuffer {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(_e) = self.close() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_e, "failed to clean up spill buffer on drop");
        }
    }
}

impl Write for SpillBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut src = buf;
        self.read_from(&mut src)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.store {
            BackingStore::Disk(spill) => Ok(spill.flush()?),
            _ => Ok(()),
        }
    }
}

impl Read for SpillBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(SpillBuffer::read(self, buf)?)
    }
}

impl Seek for SpillBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(SpillBuffer::seek(self, pos)?)
    }
}
