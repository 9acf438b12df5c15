//! Read handles over the two backing stores.
//!
//! - `MemoryWindow`: read-only view over exactly the ingested bytes.
//! - `FileHandle`: the spill file opened for reading.
//!
//! Both expose the same small capability set: `Read`, `Seek` and `ReadAt`.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// Positional reads that leave the sequential cursor where it was.
pub trait ReadAt {
    /// Read into `buf` starting at byte `offset`.
    ///
    /// Fills `buf` unless end of data is reached first; returns the number of
    /// bytes read, `0` at or past the end.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Total readable bytes.
    fn size(&self) -> u64;
}

/// Read-only window over in-memory bytes.
#[derive(Debug)]
pub struct MemoryWindow {
    data: Cursor<Box<[u8]>>,
}

impl MemoryWindow {
    /// Takes ownership of the store; spare capacity is dropped.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            data: Cursor::new(bytes.into_boxed_slice()),
        }
    }
}

impl Read for MemoryWindow {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}

impl Seek for MemoryWindow {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.data.seek(pos)
    }
}

impl ReadAt for MemoryWindow {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let data = self.data.get_ref();
        if offset >= data.len() as u64 {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.data.get_ref().len() as u64
    }
}

/// Spill file opened read-only.
#[derive(Debug)]
pub struct FileHandle {
    file: File,
    size: u64,
}

impl FileHandle {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self { file, size })
    }

    #[cfg(unix)]
    fn pread(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        use std::os::unix::fs::FileExt;
        self.file.read_at(buf, offset)
    }

    // Without pread, seek there and restore the cursor afterwards.
    #[cfg(not(unix))]
    fn pread(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let mut f = &self.file;
        let pos = f.stream_position()?;
        f.seek(SeekFrom::Start(offset))?;
        let res = f.read(buf);
        f.seek(SeekFrom::Start(pos))?;
        res
    }
}

impl Read for FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for FileHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl ReadAt for FileHandle {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.pread(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// The read handle a buffer resolves once, at the start of its read phase.
#[derive(Debug)]
pub enum ReadHandle {
    Memory(MemoryWindow),
    File(FileHandle),
}

impl ReadHandle {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ReadHandle::Memory(_) => "memory",
            ReadHandle::File(_) => "file",
        }
    }
}

impl Read for ReadHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ReadHandle::Memory(m) => m.read(buf),
            ReadHandle::File(f) => f.read(buf),
        }
    }
}

impl Seek for ReadHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            ReadHandle::Memory(m) => m.seek(pos),
            ReadHandle::File(f) => f.seek(pos),
        }
    }
}

impl ReadAt for ReadHandle {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        match self {
            ReadHandle::Memory(m) => m.read_at(buf, offset),
            ReadHandle::File(f) => f.read_at(buf, offset),
        }
    }

    fn size(&self) -> u64 {
        match self {
            ReadHandle::Memory(m) => m.size(),
            ReadHandle::File(f) => f.size(),
        }
    }
}
