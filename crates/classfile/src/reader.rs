//! Nom parsers for the class file header and constant pool.

use nom::{
    IResult, Parser,
    bytes::complete::take,
    error::ErrorKind,
    number::complete::{be_u8, be_u16, be_u32},
};
use rivet_core::TypeName;

use crate::error::ClassFileError;
use crate::header::{AccessFlags, ClassHeader};

/// Class file magic number.
pub const MAGIC: u32 = 0xCAFE_BABE;

/// Length of magic plus minor and major version.
pub const VERSION_PREFIX_LEN: usize = 8;

type Input<'a> = &'a [u8];

type ParseResult<'a, O> = IResult<Input<'a>, O>;

/// A constant pool slot, reduced to what the header needs.
#[derive(Debug, Clone, PartialEq)]
enum Constant {
    Utf8(String),
    Class(u16),
    /// A long or double; occupies the following slot as well.
    Wide,
    Other,
    /// Slot zero and the slot after a wide constant.
    Unusable,
}

// ============================================================================
// Primitive parsers
// ============================================================================

fn u1(input: Input) -> ParseResult<u8> {
    be_u8(input)
}

fn u2(input: Input) -> ParseResult<u16> {
    be_u16(input)
}

fn u4(input: Input) -> ParseResult<u32> {
    be_u32(input)
}

fn skip(input: Input, len: usize) -> ParseResult<Input> {
    take(len).parse(input)
}

// ============================================================================
// Structure parsers
// ============================================================================

fn constant(input: Input) -> ParseResult<Constant> {
    let (rest, tag) = u1(input)?;

    match tag {
        1 => {
            let (rest, len) = u2(rest)?;
            let (rest, bytes) = skip(rest, len as usize)?;
            // Modified UTF-8 only differs for NUL and supplementary characters,
            // neither of which appear in type names.
            let value = String::from_utf8_lossy(bytes).into_owned();
            Ok((rest, Constant::Utf8(value)))
        }
        7 => {
            let (rest, name_index) = u2(rest)?;
            Ok((rest, Constant::Class(name_index)))
        }
        8 | 16 | 19 | 20 => skip(rest, 2).map(|(rest, _)| (rest, Constant::Other)),
        15 => skip(rest, 3).map(|(rest, _)| (rest, Constant::Other)),
        3 | 4 | 9 | 10 | 11 | 12 | 17 | 18 => {
            skip(rest, 4).map(|(rest, _)| (rest, Constant::Other))
        }
        5 | 6 => skip(rest, 8).map(|(rest, _)| (rest, Constant::Wide)),
        _ => Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::Tag,
        ))),
    }
}

fn constant_pool(input: Input) -> ParseResult<Vec<Constant>> {
    let (mut input, count) = u2(input)?;
    let count = count as usize;

    let mut pool = Vec::with_capacity(count);
    pool.push(Constant::Unusable);

    while pool.len() < count {
        let (rest, entry) = constant(input)?;
        input = rest;

        let wide = entry == Constant::Wide;
        pool.push(entry);
        if wide {
            pool.push(Constant::Unusable);
        }
    }

    Ok((input, pool))
}

fn class_indices(input: Input) -> ParseResult<Vec<u16>> {
    let (mut input, count) = u2(input)?;
    let mut indices = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (rest, index) = u2(input)?;
        input = rest;
        indices.push(index);
    }
    Ok((input, indices))
}

struct RawHeader {
    minor: u16,
    major: u16,
    pool: Vec<Constant>,
    access: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
}

fn raw_header(input: Input) -> ParseResult<RawHeader> {
    let (input, minor) = u2(input)?;
    let (input, major) = u2(input)?;
    let (input, pool) = constant_pool(input)?;
    let (input, access) = u2(input)?;
    let (input, this_class) = u2(input)?;
    let (input, super_class) = u2(input)?;
    let (input, interfaces) = class_indices(input)?;

    Ok((
        input,
        RawHeader {
            minor,
            major,
            pool,
            access,
            this_class,
            super_class,
            interfaces,
        },
    ))
}

// ============================================================================
// Public API
// ============================================================================

/// Reads the header of a class file.
///
/// Only the prefix up to the interface table is read; fields, methods and
/// attributes are left untouched.
pub fn read_header(bytes: &[u8]) -> Result<ClassHeader, ClassFileError> {
    let (rest, magic) = u4(bytes).map_err(|e| convert_error(bytes, e))?;
    if magic != MAGIC {
        return Err(ClassFileError::BadMagic(magic));
    }

    let (_, raw) = raw_header(rest).map_err(|e| convert_error(bytes, e))?;

    let this_class = class_name(&raw.pool, raw.this_class)?;
    let super_class = match raw.super_class {
        0 => None,
        index => Some(class_name(&raw.pool, index)?),
    };
    let interfaces = raw
        .interfaces
        .iter()
        .map(|&index| class_name(&raw.pool, index))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ClassHeader {
        minor: raw.minor,
        major: raw.major,
        access: AccessFlags(raw.access),
        this_class,
        super_class,
        interfaces,
    })
}

/// Returns true if `bytes` starts with the class file magic.
pub fn is_class_file(bytes: &[u8]) -> bool {
    matches!(u4(bytes), Ok((_, MAGIC)))
}

fn class_name(pool: &[Constant], index: u16) -> Result<TypeName, ClassFileError> {
    let invalid = || ClassFileError::InvalidClassReference { index };

    let name_index = match pool.get(index as usize) {
        Some(Constant::Class(name_index)) => *name_index,
        _ => return Err(invalid()),
    };

    match pool.get(name_index as usize) {
        Some(Constant::Utf8(name)) if !name.is_empty() => Ok(TypeName::new(name)),
        _ => Err(invalid()),
    }
}

fn convert_error(bytes: &[u8], error: nom::Err<nom::error::Error<Input>>) -> ClassFileError {
    match error {
        nom::Err::Incomplete(_) => ClassFileError::Truncated,
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let offset = bytes.len() - e.input.len();
            match e.code {
                ErrorKind::Eof => ClassFileError::Truncated,
                ErrorKind::Tag => ClassFileError::UnknownConstant {
                    tag: e.input.first().copied().unwrap_or_default(),
                    offset,
                },
                _ => ClassFileError::Malformed { offset },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::write_class;
    use rivet_core::CodeVersion;

    fn java17() -> CodeVersion {
        CodeVersion::of_java_version(17).unwrap()
    }

    #[test]
    fn test_read_written_header() {
        let header = ClassHeader::new("com.example.Service", java17())
            .with_super_class("com.example.Base")
            .with_interface("java.lang.Runnable")
            .with_interface("java.io.Closeable");

        let parsed = read_header(&write_class(&header)).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.code_version().unwrap(), java17());
    }

    #[test]
    fn test_wide_constants_take_two_slots() {
        // Pool: #1 Long (takes #1 and #2), #3 Utf8 "A", #4 Class #3
        let mut bytes = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 61, 0, 5];
        bytes.extend([5, 0, 0, 0, 0, 0, 0, 0, 42]);
        bytes.extend([1, 0, 1, b'A']);
        bytes.extend([7, 0, 3]);
        bytes.extend([0, 0x21, 0, 4, 0, 0, 0, 0]);

        let header = read_header(&bytes).unwrap();
        assert_eq!(header.this_class, TypeName::new("A"));
        assert_eq!(header.super_class, None);
    }

    #[test]
    fn test_bad_magic() {
        assert_eq!(
            read_header(&[0xDE, 0xAD, 0xBE, 0xEF, 0, 0, 0, 52]),
            Err(ClassFileError::BadMagic(0xDEAD_BEEF))
        );
        assert!(!is_class_file(b"plain text"));
    }

    #[test]
    fn test_truncated() {
        let bytes = write_class(&ClassHeader::new("a.B", java17()));
        assert_eq!(read_header(&bytes[..12]), Err(ClassFileError::Truncated));
        assert_eq!(read_header(&bytes[..2]), Err(ClassFileError::Truncated));
    }

    #[test]
    fn test_unknown_constant_tag() {
        let bytes = [0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 61, 0, 2, 99, 0, 0];
        assert_eq!(
            read_header(&bytes),
            Err(ClassFileError::UnknownConstant { tag: 99, offset: 10 })
        );
    }

    #[test]
    fn test_invalid_this_class() {
        // #1 Utf8 "A", this_class points at the Utf8 entry instead of a Class.
        let mut bytes = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 61, 0, 2];
        bytes.extend([1, 0, 1, b'A']);
        bytes.extend([0, 0x21, 0, 1, 0, 0, 0, 0]);

        assert_eq!(
            read_header(&bytes),
            Err(ClassFileError::InvalidClassReference { index: 1 })
        );
    }
}
