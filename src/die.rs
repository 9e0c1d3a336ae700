//! Debug info entries, as handed to the walker.
//!
//! The gimli adapter in `dwarf_parser` converts each compile unit into a tree
//! of `Die`s with references, strings, addresses and file names already
//! resolved. Everything downstream works on this tree, which keeps the type
//! builder independent of section layout and lets tests describe programs
//! directly.

use gimli::{DwAt, DwTag};

use crate::error::{Error, Result};
use crate::model::TypeId;

/// A decoded attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Unsigned(u64),
    Signed(i64),
    Flag(bool),
    String(String),
    /// A type or entry reference, rebased to an absolute offset.
    Ref(TypeId),
    Address(u64),
    /// A source file, resolved through the unit's line program.
    File(String),
    /// A form we do not decode for this attribute, e.g. a location
    /// expression where a constant was expected.
    Unsupported(&'static str),
}

impl AttrValue {
    fn form(&self) -> &'static str {
        match self {
            Self::Unsigned(_) => "unsigned constant",
            Self::Signed(_) => "signed constant",
            Self::Flag(_) => "flag",
            Self::String(_) => "string",
            Self::Ref(_) => "reference",
            Self::Address(_) => "address",
            Self::File(_) => "file",
            Self::Unsupported(what) => what,
        }
    }
}

/// One debug info entry and its children.
#[derive(Clone, Debug)]
pub struct Die {
    /// Absolute offset of the entry in `.debug_info`; this becomes the
    /// `TypeId` of any type built from it.
    pub offset: usize,
    pub tag: DwTag,
    pub attrs: Vec<(DwAt, AttrValue)>,
    pub children: Vec<Die>,
}

impl Die {
    pub fn new(offset: usize, tag: DwTag) -> Self {
        Self {
            offset,
            tag,
            attrs: vec![],
            children: vec![],
        }
    }

    pub fn with_attr(mut self, at: DwAt, value: AttrValue) -> Self {
        self.attrs.push((at, value));
        self
    }

    pub fn with_child(mut self, child: Die) -> Self {
        self.children.push(child);
        self
    }

    pub fn id(&self) -> TypeId {
        TypeId(self.offset)
    }

    pub fn first_child(&self) -> Option<&Die> {
        self.children.first()
    }

    pub fn attr(&self, at: DwAt) -> Option<&AttrValue> {
        self.attrs.iter().find(|(a, _)| *a == at).map(|(_, v)| v)
    }

    fn unexpected(&self, at: DwAt, value: &AttrValue) -> Error {
        Error::Attribute {
            offset: self.offset,
            attr: at,
            found: value.form(),
        }
    }

    /// Reads a string attribute.
    pub fn string(&self, at: DwAt) -> Result<Option<&str>> {
        match self.attr(at) {
            None => Ok(None),
            Some(AttrValue::String(s)) => Ok(Some(s)),
            Some(v) => Err(self.unexpected(at, v)),
        }
    }

    /// Reads `DW_AT_name`.
    pub fn name(&self) -> Result<Option<&str>> {
        self.string(gimli::DW_AT_name)
    }

    /// Reads an unsigned constant. Non-negative signed constants are
    /// accepted.
    pub fn udata(&self, at: DwAt) -> Result<Option<u64>> {
        match self.attr(at) {
            None => Ok(None),
            Some(AttrValue::Unsigned(v)) => Ok(Some(*v)),
            Some(AttrValue::Signed(v)) if *v >= 0 => Ok(Some(*v as u64)),
            Some(v) => Err(self.unexpected(at, v)),
        }
    }

    /// Reads a constant, trying the unsigned interpretation first and the
    /// signed one second. Signed values are returned as their two's
    /// complement bit pattern.
    pub fn constant(&self, at: DwAt) -> Result<Option<u64>> {
        match self.attr(at) {
            None => Ok(None),
            Some(AttrValue::Unsigned(v)) => Ok(Some(*v)),
            Some(AttrValue::Signed(v)) => Ok(Some(*v as u64)),
            Some(v) => Err(self.unexpected(at, v)),
        }
    }

    /// Reads a reference attribute such as `DW_AT_type`.
    pub fn type_ref(&self, at: DwAt) -> Result<Option<TypeId>> {
        match self.attr(at) {
            None => Ok(None),
            Some(AttrValue::Ref(id)) => Ok(Some(*id)),
            Some(v) => Err(self.unexpected(at, v)),
        }
    }

    /// Reads a flag; absent flags are false.
    pub fn flag(&self, at: DwAt) -> Result<bool> {
        match self.attr(at) {
            None => Ok(false),
            Some(AttrValue::Flag(f)) => Ok(*f),
            Some(v) => Err(self.unexpected(at, v)),
        }
    }

    /// Reads a file attribute such as `DW_AT_decl_file`.
    pub fn file(&self, at: DwAt) -> Result<Option<&str>> {
        match self.attr(at) {
            None => Ok(None),
            Some(AttrValue::File(f)) => Ok(Some(f)),
            Some(v) => Err(self.unexpected(at, v)),
        }
    }

    pub fn address(&self, at: DwAt) -> Result<Option<u64>> {
        match self.attr(at) {
            None => Ok(None),
            Some(AttrValue::Address(a)) => Ok(Some(*a)),
            Some(v) => Err(self.unexpected(at, v)),
        }
    }
}
