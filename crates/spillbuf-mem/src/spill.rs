//! Spill file creation and appends.
//!
//! Spill files live in the host temp directory, named `mem-buf-` plus the
//! unique suffix `tempfile` generates. Until the initial copy succeeds the file
//! is held as a `NamedTempFile`, so a failed spill deletes it on drop. After
//! that the path is kept and owned by the buffer.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use spillbuf_core::config::SPILL_FILE_PREFIX;
use spillbuf_core::error::{Error, Result};
use tempfile::NamedTempFile;

const COPY_CHUNK: usize = 64 * 1024;

/// A spill file that is still open for appends until the read phase.
#[derive(Debug)]
pub struct SpillFile {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    written: u64,
}

impl SpillFile {
    /// Create a spill file holding `head` followed by everything left in `rest`.
    pub fn spill<R: Read + ?Sized>(head: &[u8], rest: &mut R) -> Result<Self> {
        Self::spill_in(&std::env::temp_dir(), head, rest)
    }

    pub(crate) fn spill_in<R: Read + ?Sized>(
        dir: &Path,
        head: &[u8],
        rest: &mut R,
    ) -> Result<Self> {
        let tmp = tempfile::Builder::new()
            .prefix(SPILL_FILE_PREFIX)
            .tempfile_in(dir)
            .map_err(Error::SpillCreate)?;
        let path = tmp.path().to_path_buf();

        let mut writer = BufWriter::with_capacity(COPY_CHUNK, tmp);
        writer.write_all(head).map_err(|e| write_err(&path, e))?;
        let copied = copy_from(rest, &mut writer, &path)?;
        writer.flush().map_err(|e| write_err(&path, e))?;

        let tmp: NamedTempFile = writer
            .into_inner()
            .map_err(|e| write_err(&path, e.into_error()))?;
        let (file, path) = tmp.keep().map_err(|e| write_err(&path, e.error))?;

        Ok(Self {
            path,
            writer: Some(BufWriter::with_capacity(COPY_CHUNK, file)),
            written: head.len() as u64 + copied,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written to the file so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append the whole of `source` to the file. Returns the bytes appended.
    pub fn append<R: Read + ?Sized>(&mut self, source: &mut R) -> Result<u64> {
        let writer = self.writer.as_mut().ok_or(Error::Sealed)?;
        let n = copy_from(source, writer, &self.path)?;
        self.written += n;
        Ok(n)
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush().map_err(|e| write_err(&self.path, e))?;
        }
        Ok(())
    }

    /// Flush and close the write side; no appends after this.
    pub fn finish(&mut self) -> Result<()> {
        self.flush()?;
        self.writer = None;
        Ok(())
    }

    /// Close the write side without reporting flush failures.
    pub fn release(&mut self) {
        self.writer = None;
    }
}

fn write_err(path: &Path, source: io::Error) -> Error {
    Error::SpillWrite {
        path: path.to_path_buf(),
        source,
    }
}

/// `io::copy` that tells source failures apart from spill-file failures.
fn copy_from<R, W>(source: &mut R, sink: &mut W, path: &Path) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut chunk = vec![0u8; COPY_CHUNK];
    let mut total = 0u64;
    loop {
        let n = match source.read(&mut chunk) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Source(e)),
        };
        sink.write_all(&chunk[..n]).map_err(|e| write_err(path, e))?;
        total += n as u64;
    }
}
