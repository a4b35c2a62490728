//! Class file header model.

use rivet_core::{CodeVersion, TypeName};

use crate::error::ClassFileError;

/// Class access flags as stored in the class file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessFlags(pub u16);

impl AccessFlags {
    pub const PUBLIC: u16 = 0x0001;
    pub const FINAL: u16 = 0x0010;
    pub const SUPER: u16 = 0x0020;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const SYNTHETIC: u16 = 0x1000;
    pub const ANNOTATION: u16 = 0x2000;
    pub const ENUM: u16 = 0x4000;
    pub const MODULE: u16 = 0x8000;

    /// Returns true if every bit of `flag` is set.
    pub fn contains(self, flag: u16) -> bool {
        self.0 & flag == flag
    }

    pub fn is_interface(self) -> bool {
        self.contains(Self::INTERFACE)
    }

    pub fn is_abstract(self) -> bool {
        self.contains(Self::ABSTRACT)
    }

    pub fn is_annotation(self) -> bool {
        self.contains(Self::ANNOTATION)
    }

    pub fn is_enum(self) -> bool {
        self.contains(Self::ENUM)
    }
}

/// The identifying part of a class file: version, flags and hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
    /// Minor version.
    pub minor: u16,

    /// Major version.
    pub major: u16,

    /// Access flags.
    pub access: AccessFlags,

    /// The type this class file declares.
    pub this_class: TypeName,

    /// The direct superclass; `None` only for the root of the hierarchy and
    /// for module descriptors.
    pub super_class: Option<TypeName>,

    /// Directly implemented interfaces, in declaration order.
    pub interfaces: Vec<TypeName>,
}

impl ClassHeader {
    /// Creates a public class header extending `java.lang.Object`.
    pub fn new(this_class: impl Into<TypeName>, version: CodeVersion) -> Self {
        Self {
            minor: 0,
            major: version.major(),
            access: AccessFlags(AccessFlags::PUBLIC | AccessFlags::SUPER),
            this_class: this_class.into(),
            super_class: Some(TypeName::new("java.lang.Object")),
            interfaces: Vec::new(),
        }
    }

    /// Sets the superclass.
    pub fn with_super_class(mut self, super_class: impl Into<TypeName>) -> Self {
        self.super_class = Some(super_class.into());
        self
    }

    /// Adds an implemented interface.
    pub fn with_interface(mut self, interface: impl Into<TypeName>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Sets the access flags.
    pub fn with_access(mut self, access: u16) -> Self {
        self.access = AccessFlags(access);
        self
    }

    /// Returns the class file version as a code version.
    pub fn code_version(&self) -> Result<CodeVersion, ClassFileError> {
        CodeVersion::of_major(self.major).map_err(|_| ClassFileError::UnsupportedVersion {
            major: self.major,
            minor: self.minor,
        })
    }

    /// Iterates over the superclass followed by the interfaces.
    pub fn super_types(&self) -> impl Iterator<Item = &TypeName> {
        self.super_class.iter().chain(self.interfaces.iter())
    }
}
