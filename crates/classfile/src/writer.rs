//! Emits minimal class files.

use crate::header::ClassHeader;
use crate::reader::MAGIC;

/// Writes a class file declaring `header` with no fields, methods or attributes.
///
/// Plugins use this to emit auxiliary types; the output is accepted by
/// [`read_header`](crate::read_header).
pub fn write_class(header: &ClassHeader) -> Vec<u8> {
    let mut pool = ConstantPool::default();
    let this_class = pool.class(header.this_class.internal_name());
    let super_class = header
        .super_class
        .as_ref()
        .map(|name| pool.class(name.internal_name()))
        .unwrap_or(0);
    let interfaces: Vec<u16> = header
        .interfaces
        .iter()
        .map(|name| pool.class(name.internal_name()))
        .collect();

    let mut out = Vec::with_capacity(64 + pool.bytes.len());
    out.extend_from_slice(&MAGIC.to_be_bytes());
    out.extend_from_slice(&header.minor.to_be_bytes());
    out.extend_from_slice(&header.major.to_be_bytes());
    out.extend_from_slice(&pool.next.to_be_bytes());
    out.extend_from_slice(&pool.bytes);
    out.extend_from_slice(&header.access.0.to_be_bytes());
    out.extend_from_slice(&this_class.to_be_bytes());
    out.extend_from_slice(&super_class.to_be_bytes());
    out.extend_from_slice(&(interfaces.len() as u16).to_be_bytes());
    for index in interfaces {
        out.extend_from_slice(&index.to_be_bytes());
    }

    // fields_count, methods_count, attributes_count
    out.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
    out
}

struct ConstantPool {
    bytes: Vec<u8>,
    next: u16,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self {
            bytes: Vec::new(),
            next: 1,
        }
    }
}

impl ConstantPool {
    fn class(&mut self, internal_name: String) -> u16 {
        let name = internal_name.as_bytes();
        self.bytes.push(1);
        self.bytes.extend_from_slice(&(name.len() as u16).to_be_bytes());
        self.bytes.extend_from_slice(name);
        let name_index = self.next;

        self.bytes.push(7);
        self.bytes.extend_from_slice(&name_index.to_be_bytes());
        self.next += 2;
        name_index + 1
    }
}
