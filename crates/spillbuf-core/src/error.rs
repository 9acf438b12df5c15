use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Canonical result for the staging buffer.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The stream supplying bytes failed before end of data. The buffer is
    /// left partially filled and should be discarded.
    #[error("source stream failed: {0}")]
    Source(#[source] io::Error),

    #[error("failed to create spill file: {0}")]
    SpillCreate(#[source] io::Error),

    #[error("failed to write spill file '{}': {source}", path.display())]
    SpillWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The resolved backing store could not be opened when the read phase
    /// began. Sticky: later reads report it again without reopening.
    #[error("backing store unavailable: {reason}")]
    StoreUnavailable { kind: io::ErrorKind, reason: String },

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("failed to remove spill file '{}': {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("buffer is sealed: the read phase has already started")]
    Sealed,

    #[error("buffer is closed")]
    Closed,
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Source(inner) | Error::SpillCreate(inner) | Error::Read(inner) => inner,
            Error::SpillWrite { source, .. } | Error::Remove { source, .. } => source,
            Error::StoreUnavailable { kind, reason } => io::Error::new(kind, reason),
            Error::Sealed => io::Error::new(io::ErrorKind::Unsupported, Error::Sealed.to_string()),
            Error::Closed => io::Error::new(io::ErrorKind::BrokenPipe, Error::Closed.to_string()),
        }
    }
}
