//! Error taxonomy for the box-tree reader/writer.
//!
//! Every public operation in this crate returns `Result<T, Error>`. Nothing
//! is recovered silently: a malformed descendant box surfaces an error
//! rather than being skipped.

use thiserror::Error;

/// Everything that can go wrong while reading, assembling, or rewriting an
/// ISO-BMFF file.
#[derive(Debug, Error)]
pub enum Error {
    #[error("truncated box header at offset {pos}")]
    TruncatedBox { pos: u64 },

    #[error("truncated {which} table: expected at least {expected} bytes, got {actual}")]
    TruncatedTable {
        which: &'static str,
        expected: u64,
        actual: u64,
    },

    #[error("required top-level box '{fourcc}' is missing")]
    MissingBox { fourcc: &'static str },

    #[error("moov precedes mdat; in-place rewriting would require renumbering sample offsets")]
    FaststartUnsupported,

    #[error("corrupt sample table: {0}")]
    CorruptSampleTable(String),

    #[error("unsupported creation-date format: {0:?}")]
    UnsupportedDateFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("box size computation overflowed")]
    Overflow,
}

pub type Result<T> = std::result::Result<T, Error>;
