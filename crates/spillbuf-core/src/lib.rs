#![forbid(unsafe_code)]
//! spillbuf-core: configuration, the remaining-memory budget, and the error
//! taxonomy shared by the staging buffer.
//!
//! The buffer itself lives in `spillbuf-mem`. This crate stays free of file
//! handling so it can be depended on for configuration alone.

pub mod budget;
pub mod config;
pub mod error;
pub mod prelude;
