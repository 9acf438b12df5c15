//! Staging buffer behaviour: spill decision, read-back, lifecycle.

use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};

use spillbuf::{BufferConfig, Error, SpillBuffer, SPILL_FILE_PREFIX};

const ALPHABET: &str = "1234567890abcdefghijklmnopqrstuvwxyz";

fn ingest(buf: &mut SpillBuffer, data: &[u8]) -> u64 {
    let mut src = data;
    buf.read_from(&mut src).expect("ingest failed")
}

fn read_all(buf: &mut SpillBuffer) -> Vec<u8> {
    let mut out = Vec::new();
    buf.read_to_end(&mut out).expect("read failed");
    out
}

/// Source that yields `data` and then fails.
struct Flaky<'a> {
    data: &'a [u8],
}

impl Read for Flaky<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.data.is_empty() {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "upload aborted"));
        }
        let n = buf.len().min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

#[test]
fn test_small_budget_spills_to_disk() {
    let mut buf = SpillBuffer::with_budget(10, true);
    assert_eq!(ingest(&mut buf, ALPHABET.as_bytes()), 36);
    assert_eq!(buf.len(), 36);
    assert!(buf.is_spilled());

    let path = buf.spill_path().expect("spill path").to_path_buf();
    assert!(path.exists());
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with(SPILL_FILE_PREFIX));
    assert_eq!(fs::metadata(&path).unwrap().len(), 36);

    let mut out = [0u8; 36];
    buf.read_exact(&mut out).unwrap();
    assert_eq!(&out[..], ALPHABET.as_bytes());
    buf.close().unwrap();
}

#[test]
fn test_large_budget_stays_in_memory() {
    let mut buf = SpillBuffer::with_budget(40, true);
    assert_eq!(ingest(&mut buf, ALPHABET.as_bytes()), 36);
    assert_eq!(buf.len(), 36);
    assert!(!buf.is_spilled());
    assert!(buf.spill_path().is_none());
    assert_eq!(buf.remaining_budget(), 4);

    assert_eq!(read_all(&mut buf), ALPHABET.as_bytes());
    buf.close().unwrap();
}

#[test]
fn test_close_removes_spill_file() {
    let mut buf = SpillBuffer::with_budget(4, true);
    ingest(&mut buf, b"12345");
    let path = buf.spill_path().expect("spilled").to_path_buf();
    assert!(path.exists());

    buf.close().unwrap();
    assert!(!path.exists());
    assert!(buf.spill_path().is_none());
}

#[test]
fn test_exact_budget_does_not_spill() {
    let mut buf = SpillBuffer::with_budget(5, true);
    ingest(&mut buf, b"12345");
    assert!(!buf.is_spilled());

    let mut buf = SpillBuffer::with_budget(5, true);
    ingest(&mut buf, b"123456");
    assert!(buf.is_spilled());
    assert_eq!(read_all(&mut buf), b"123456");
}

#[test]
fn test_empty_source() {
    let mut buf = SpillBuffer::with_budget(0, true);
    assert_eq!(ingest(&mut buf, b""), 0);
    assert!(buf.is_empty());
    assert!(!buf.is_spilled());

    let mut chunk = [0u8; 8];
    assert_eq!(buf.read(&mut chunk).unwrap(), 0);
    assert_eq!(buf.read_at(&mut chunk, 0).unwrap(), 0);
}

#[test]
fn test_zero_budget_spills_any_byte() {
    let mut buf = SpillBuffer::with_budget(0, true);
    ingest(&mut buf, b"x");
    assert!(buf.is_spilled());
    assert_eq!(buf.len(), 1);
}

#[test]
fn test_read_at_leaves_cursor() {
    for budget in [4u64, 1024] {
        let mut buf = SpillBuffer::with_budget(budget, true);
        ingest(&mut buf, ALPHABET.as_bytes());

        let mut head = [0u8; 10];
        buf.read_exact(&mut head).unwrap();

        let mut letters = [0u8; 5];
        assert_eq!(buf.read_at(&mut letters, 10).unwrap(), 5);
        assert_eq!(&letters, b"abcde");

        // Short at the tail, empty past it
        assert_eq!(buf.read_at(&mut letters, 34).unwrap(), 2);
        assert_eq!(&letters[..2], b"yz");
        assert_eq!(buf.read_at(&mut letters, 36).unwrap(), 0);
        assert_eq!(buf.read_at(&mut letters, 4096).unwrap(), 0);

        assert_eq!(buf.seek(SeekFrom::Current(0)).unwrap(), 10);
        let mut next = [0u8; 3];
        buf.read_exact(&mut next).unwrap();
        assert_eq!(&next, b"abc");
    }
}

#[test]
fn test_seek_positions() {
    for budget in [4u64, 1024] {
        let mut buf = SpillBuffer::with_budget(budget, true);
        ingest(&mut buf, ALPHABET.as_bytes());

        assert_eq!(buf.seek(SeekFrom::End(-4)).unwrap(), 32);
        assert_eq!(read_all(&mut buf), b"wxyz");
        assert_eq!(buf.seek(SeekFrom::Start(0)).unwrap(), 0);
        assert_eq!(buf.seek(SeekFrom::Current(26)).unwrap(), 26);
        assert_eq!(read_all(&mut buf), b"qrstuvwxyz");

        // Past the end is allowed and reads nothing
        assert_eq!(buf.seek(SeekFrom::Start(100)).unwrap(), 100);
        let mut chunk = [0u8; 4];
        assert_eq!(buf.read(&mut chunk).unwrap(), 0);

        // Before the start is not
        let err = buf.seek(SeekFrom::End(-100)).unwrap_err();
        assert!(matches!(err, Error::Read(_)));
    }
}

#[test]
fn test_io_traits_round_trip() {
    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

    let mut buf = SpillBuffer::new(BufferConfig::default().with_memory_budget(1000));
    for chunk in payload.chunks(333) {
        buf.write_all(chunk).unwrap();
    }
    buf.flush().unwrap();
    assert!(buf.is_spilled());
    assert_eq!(buf.len(), payload.len() as u64);

    let mut out = Vec::new();
    io::copy(&mut buf, &mut out).unwrap();
    assert_eq!(out, payload);

    Seek::seek(&mut buf, SeekFrom::Start(9_990)).unwrap();
    let mut tail = Vec::new();
    Read::read_to_end(&mut buf, &mut tail).unwrap();
    assert_eq!(tail, &payload[9_990..]);
}

#[test]
fn test_appends_across_spill() {
    let mut buf = SpillBuffer::with_budget(8, true);
    assert_eq!(ingest(&mut buf, b"12345"), 5);
    assert_eq!(buf.remaining_budget(), 3);
    assert!(!buf.is_spilled());

    assert_eq!(ingest(&mut buf, b"67890"), 5);
    assert!(buf.is_spilled());
    let path = buf.spill_path().unwrap().to_path_buf();

    assert_eq!(ingest(&mut buf, b"abc"), 3);
    assert_eq!(buf.spill_path(), Some(path.as_path()));
    assert_eq!(buf.len(), 13);
    assert_eq!(read_all(&mut buf), b"1234567890abc");
}

#[test]
fn test_ingest_after_read_is_rejected() {
    let mut buf = SpillBuffer::with_budget(64, true);
    ingest(&mut buf, b"head");
    let mut chunk = [0u8; 2];
    buf.read(&mut chunk).unwrap();

    let mut more: &[u8] = b"tail";
    assert!(matches!(buf.read_from(&mut more), Err(Error::Sealed)));
    let err = buf.write(b"tail").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    assert_eq!(buf.len(), 4);
}

#[test]
fn test_source_failure_surfaces() {
    let mut buf = SpillBuffer::with_budget(1024, true);
    let mut src = Flaky { data: b"partial" };
    let err = buf.read_from(&mut src).unwrap_err();
    assert!(matches!(err, Error::Source(ref e) if e.kind() == io::ErrorKind::ConnectionReset));
    assert!(!buf.is_spilled());

    // Failing after the spill decision: no spill file survives
    let mut buf = SpillBuffer::with_budget(3, true);
    let mut src = Flaky { data: b"more than three" };
    let err = buf.read_from(&mut src).unwrap_err();
    assert!(matches!(err, Error::Source(_)));
    assert!(buf.spill_path().is_none());
}

#[test]
fn test_missing_spill_file_is_sticky() {
    let mut buf = SpillBuffer::with_budget(4, true);
    ingest(&mut buf, ALPHABET.as_bytes());
    let path = buf.spill_path().unwrap().to_path_buf();
    fs::remove_file(&path).unwrap();

    let mut chunk = [0u8; 4];
    let err = buf.read(&mut chunk).unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable { kind: io::ErrorKind::NotFound, .. }));

    // Not reopened even once the file is back
    fs::write(&path, ALPHABET).unwrap();
    assert!(matches!(buf.seek(SeekFrom::Start(0)), Err(Error::StoreUnavailable { .. })));
    assert!(matches!(buf.read_at(&mut chunk, 0), Err(Error::StoreUnavailable { .. })));

    buf.close().unwrap();
    assert!(!path.exists());
}

#[test]
fn test_close_reports_vanished_file() {
    let mut buf = SpillBuffer::with_budget(4, true);
    ingest(&mut buf, ALPHABET.as_bytes());
    let path = buf.spill_path().unwrap().to_path_buf();
    fs::remove_file(&path).unwrap();

    let err = buf.close().unwrap_err();
    match err {
        Error::Remove { path: p, source } => {
            assert_eq!(p, path);
            assert_eq!(source.kind(), io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other}"),
    }
    // Path forgotten: the next close is clean
    buf.close().unwrap();
}

#[test]
fn test_remove_is_idempotent() {
    let mut buf = SpillBuffer::with_budget(4, false);
    ingest(&mut buf, ALPHABET.as_bytes());
    let path = buf.spill_path().unwrap().to_path_buf();

    buf.remove().unwrap();
    assert!(!path.exists());
    assert!(buf.spill_path().is_none());
    buf.remove().unwrap();
    assert!(buf.spill_path().is_none());

    // Nothing left to read from
    let mut chunk = [0u8; 4];
    assert!(matches!(buf.read(&mut chunk), Err(Error::Closed)));
}

#[test]
fn test_remove_without_spill_is_noop() {
    let mut buf = SpillBuffer::with_budget(1024, true);
    ingest(&mut buf, ALPHABET.as_bytes());
    buf.remove().unwrap();
    buf.remove().unwrap();
    assert_eq!(read_all(&mut buf), ALPHABET.as_bytes());
}

#[test]
fn test_keep_on_close_leaves_file() {
    let mut buf = SpillBuffer::with_budget(4, false);
    ingest(&mut buf, ALPHABET.as_bytes());
    let path = buf.spill_path().unwrap().to_path_buf();
    let mut chunk = [0u8; 4];
    buf.read(&mut chunk).unwrap();

    buf.close().unwrap();
    assert!(path.exists());
    assert_eq!(fs::read(&path).unwrap(), ALPHABET.as_bytes());
    assert!(matches!(buf.read(&mut chunk), Err(Error::Closed)));

    // The caller can still clean up through the buffer
    buf.remove().unwrap();
    assert!(!path.exists());
}

#[test]
fn test_close_is_repeatable() {
    let mut buf = SpillBuffer::with_budget(1024, true);
    ingest(&mut buf, b"abc");
    buf.close().unwrap();
    buf.close().unwrap();

    let mut more: &[u8] = b"more";
    assert!(matches!(buf.read_from(&mut more), Err(Error::Closed)));
    assert!(matches!(buf.seek(SeekFrom::Start(0)), Err(Error::Closed)));
}

#[test]
fn test_drop_applies_remove_policy() {
    let path = {
        let mut buf = SpillBuffer::with_budget(4, true);
        ingest(&mut buf, ALPHABET.as_bytes());
        buf.spill_path().unwrap().to_path_buf()
    };
    assert!(!path.exists());

    let path = {
        let mut buf = SpillBuffer::with_budget(4, false);
        ingest(&mut buf, ALPHABET.as_bytes());
        buf.spill_path().unwrap().to_path_buf()
    };
    assert!(path.exists());
    fs::remove_file(&path).unwrap();
}
