//! Class file reader errors.

use thiserror::Error;

/// Error type for class file reading failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassFileError {
    #[error("Not a class file (magic {0:#010x})")]
    BadMagic(u32),

    #[error("Class file is truncated")]
    Truncated,

    #[error("Malformed class file at offset {offset}")]
    Malformed { offset: usize },

    #[error("Unknown constant pool tag {tag} at offset {offset}")]
    UnknownConstant { tag: u8, offset: usize },

    #[error("Constant pool entry #{index} is not a valid class reference")]
    InvalidClassReference { index: u16 },

    #[error("Unsupported class file version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
}
