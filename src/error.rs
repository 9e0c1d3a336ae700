//! Error type for loading debug information.
//!
//! Rendering never fails: problems found while interpreting memory degrade
//! into placeholder text. Only opening and decoding a binary produce errors.

use std::path::PathBuf;

use thiserror::Error;

/// Things that can go wrong while loading a binary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("object file: {0}")]
    Object(#[from] object::read::Error),

    #[error("DWARF: {0}")]
    Dwarf(#[from] gimli::Error),

    /// An attribute we rely on was present but encoded in a form we cannot
    /// interpret.
    #[error("entry at .debug_info+{offset:#x}: {attr} has unexpected form ({found})")]
    Attribute {
        offset: usize,
        attr: gimli::DwAt,
        found: &'static str,
    },

    #[error("entry at .debug_info+{offset:#x}: array type without a leading subrange")]
    MissingSubrange { offset: usize },

    #[error("entry at .debug_info+{offset:#x}: enumerator without a constant value")]
    MissingConstValue { offset: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
