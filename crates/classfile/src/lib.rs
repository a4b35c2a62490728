//! Rivet Classfile - Class file header reading using nom combinators.

mod error;
mod header;
mod reader;
mod writer;

pub use error::ClassFileError;
pub use header::{AccessFlags, ClassHeader};
pub use reader::{MAGIC, VERSION_PREFIX_LEN, is_class_file, read_header};
pub use writer::write_class;
