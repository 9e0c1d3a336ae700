//! Data model types.
//!
//! This is our abstract description of the types in a program, one
//! `TypeDescriptor` per type-describing debug info entry.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::registry::TypeRegistry;

/// Identifies a specific type within a program, using its offset within the
/// `.debug_info` section.
///
/// Sometimes types appear more than once in debug info. In that case, each
/// copy has a distinct `TypeId`. "No type" (`void`) is represented as
/// `Option::<TypeId>::None` wherever a reference can be absent.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TypeId(pub usize);

impl TypeId {
    /// Rebases a unit-relative reference found on an entry into an absolute
    /// section offset.
    ///
    /// `entry_offset` is the entry's own section offset, `entry_unit_offset`
    /// the same entry's offset relative to its unit, and `referenced` the
    /// unit-relative offset stored in the attribute.
    pub fn rebase(
        entry_offset: usize,
        entry_unit_offset: usize,
        referenced: usize,
    ) -> Self {
        Self(entry_offset - entry_unit_offset + referenced)
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<.debug_info+0x{:08x}>", self.0)
    }
}

/// Name given to the synthetic member standing in for a base class.
pub const INHERIT_MEMBER_NAME: &str = "<inherit>";

/// Name used for entries that carry no `DW_AT_name`.
pub const NO_NAME: &str = "<no name>";

/// Display names nest through pointers, qualifiers and subroutine signatures.
/// Well-formed debug info never gets close to this; malformed info could loop.
const NAME_DEPTH_LIMIT: usize = 32;

/// Information about a type from a program.
///
/// There are many kinds of types; this enum distinguishes between them.
#[derive(Clone, Debug)]
pub enum TypeDescriptor {
    Primitive(Primitive),
    StructOrUnion(StructOrUnion),
    Pointer(Pointer),
    CvQualified(CvQualified),
    Alias(Alias),
    Subroutine(Subroutine),
    Array(Array),
    Enumeration(Enumeration),
}

impl TypeDescriptor {
    /// Short name of the variant, for listings.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Primitive(_) => "base",
            Self::StructOrUnion(s) => match s.kind {
                AggregateKind::Struct => "struct",
                AggregateKind::Class => "class",
                AggregateKind::Union => "union",
            },
            Self::Pointer(_) => "ptr",
            Self::CvQualified(_) => "cv",
            Self::Alias(_) => "typedef",
            Self::Subroutine(_) => "subr",
            Self::Array(_) => "array",
            Self::Enumeration(_) => "enum",
        }
    }

    /// The name under which this descriptor is entered in the by-name index,
    /// if any.
    ///
    /// Pointers, qualifiers, arrays and subroutines have only derived names
    /// and are never indexed by name. Anonymous aggregates and enumerations
    /// are reachable by ID only.
    pub fn registered_name(&self) -> Option<&str> {
        match self {
            Self::Primitive(p) => Some(&p.name),
            Self::StructOrUnion(s) => s.name.as_deref(),
            Self::Alias(a) => Some(&a.name),
            Self::Enumeration(e) => e.name.as_deref(),
            _ => None,
        }
    }

    /// Determines the display name of the type, recursing into referenced
    /// descriptors where the name is derived.
    pub fn name<'a>(&'a self, types: &'a TypeRegistry) -> Cow<'a, str> {
        self.name_at_depth(types, 0)
    }

    fn name_at_depth<'a>(
        &'a self,
        types: &'a TypeRegistry,
        depth: usize,
    ) -> Cow<'a, str> {
        if depth > NAME_DEPTH_LIMIT {
            return "...".into();
        }
        match self {
            Self::Primitive(p) => (&p.name).into(),
            Self::StructOrUnion(s) => match &s.name {
                Some(n) => n.into(),
                None => match s.kind {
                    AggregateKind::Union => "<anonymous union>".into(),
                    AggregateKind::Class => "<anonymous class>".into(),
                    AggregateKind::Struct => "<anonymous struct>".into(),
                },
            },
            Self::Pointer(p) => {
                let pointee = referenced_name(types, p.type_id, depth);
                format!("{}{}", pointee, p.kind.suffix()).into()
            }
            Self::CvQualified(c) => referenced_name(types, c.type_id, depth),
            Self::Alias(a) => (&a.name).into(),
            Self::Subroutine(s) => {
                let ret = referenced_name(types, s.return_type_id, depth);
                let mut args = s
                    .parameters
                    .iter()
                    .map(|&p| referenced_name(types, p, depth).into_owned())
                    .collect::<Vec<_>>();
                if s.variadic {
                    args.push("...".to_string());
                }
                format!("{}({})", ret, args.join(", ")).into()
            }
            Self::Array(a) => {
                let elt = match a.element_type_id {
                    Some(id) => match types.get(id) {
                        Some(t) => t.name_at_depth(types, depth + 1),
                        None => "???".into(),
                    },
                    None => "???".into(),
                };
                format!("{}[{}]", elt, a.count).into()
            }
            Self::Enumeration(e) => match &e.name {
                Some(n) => n.into(),
                None => "<anonymous enum>".into(),
            },
        }
    }
}

/// Names a possibly-void, possibly-unresolved reference.
fn referenced_name(
    types: &TypeRegistry,
    id: Option<TypeId>,
    depth: usize,
) -> Cow<'_, str> {
    match id {
        None => "void".into(),
        Some(id) => match types.get(id) {
            Some(t) => t.name_at_depth(types, depth + 1),
            None => "???".into(),
        },
    }
}

impl From<Primitive> for TypeDescriptor {
    fn from(x: Primitive) -> Self {
        Self::Primitive(x)
    }
}

impl From<StructOrUnion> for TypeDescriptor {
    fn from(x: StructOrUnion) -> Self {
        Self::StructOrUnion(x)
    }
}

impl From<Pointer> for TypeDescriptor {
    fn from(x: Pointer) -> Self {
        Self::Pointer(x)
    }
}

impl From<CvQualified> for TypeDescriptor {
    fn from(x: CvQualified) -> Self {
        Self::CvQualified(x)
    }
}

impl From<Alias> for TypeDescriptor {
    fn from(x: Alias) -> Self {
        Self::Alias(x)
    }
}

impl From<Subroutine> for TypeDescriptor {
    fn from(x: Subroutine) -> Self {
        Self::Subroutine(x)
    }
}

impl From<Array> for TypeDescriptor {
    fn from(x: Array) -> Self {
        Self::Array(x)
    }
}

impl From<Enumeration> for TypeDescriptor {
    fn from(x: Enumeration) -> Self {
        Self::Enumeration(x)
    }
}

/// A "base type," also known as a "primitive type," is not constructed by
/// aggregating other types. Examples in C include `int` and `char`.
#[derive(Clone, Debug)]
pub struct Primitive {
    /// Name of the type.
    pub name: String,
    /// Number of bytes in a value of the type. Only 1, 2, 4 and 8 can be
    /// rendered.
    pub byte_size: u64,
    /// How to interpret the type's bits.
    pub encoding: Encoding,
}

impl Primitive {
    /// Single-byte primitives render as booleans when their name says so or
    /// their encoding is boolean; every other single-byte primitive is a
    /// character.
    pub fn is_bool(&self) -> bool {
        self.byte_size == 1
            && (self.encoding == Encoding::Boolean || self.name.contains("bool"))
    }

    /// Whether pointers to and arrays of this type render as strings.
    pub fn is_char(&self) -> bool {
        self.byte_size == 1 && self.name == "char"
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Encoding {
    Signed,
    Unsigned,
    SignedChar,
    UnsignedChar,
    Boolean,
    Float,
    Other,
}

impl Encoding {
    pub fn from_dwarf(ate: gimli::DwAte) -> Self {
        match ate {
            gimli::DW_ATE_signed => Self::Signed,
            gimli::DW_ATE_unsigned => Self::Unsigned,
            gimli::DW_ATE_signed_char => Self::SignedChar,
            gimli::DW_ATE_unsigned_char => Self::UnsignedChar,
            gimli::DW_ATE_boolean => Self::Boolean,
            gimli::DW_ATE_float => Self::Float,
            _ => Self::Other,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AggregateKind {
    Struct,
    Class,
    Union,
}

/// A record whose members each have their own type. Structs, classes and
/// unions share this representation; union members all sit at offset 0.
#[derive(Clone, Debug)]
pub struct StructOrUnion {
    pub kind: AggregateKind,
    /// `None` for anonymous aggregates that could not borrow a name through
    /// `DW_AT_specification`.
    pub name: Option<String>,
    /// Set for forward declarations (`DW_AT_declaration`), which carry no
    /// members.
    pub declaration: bool,
    pub members: Vec<Member>,
}

#[derive(Clone, Debug)]
pub struct Member {
    pub name: String,
    pub type_id: Option<TypeId>,
    /// Byte offset from the start of the enclosing aggregate.
    pub offset: u64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PointerKind {
    Pointer,
    Reference,
    RvalueReference,
}

impl PointerKind {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Pointer => "*",
            Self::Reference => "&",
            Self::RvalueReference => "&&",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Pointer {
    /// Pointee; `None` for `void*`.
    pub type_id: Option<TypeId>,
    pub kind: PointerKind,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Qualifier {
    Const,
    Volatile,
    Restrict,
}

/// A qualified type. Qualifiers are transparent: the name and the rendering
/// are those of the referenced type.
#[derive(Clone, Debug)]
pub struct CvQualified {
    pub qualifier: Qualifier,
    pub type_id: Option<TypeId>,
}

/// A typedef. Renders as the referenced type but keeps its own name.
#[derive(Clone, Debug)]
pub struct Alias {
    pub name: String,
    pub type_id: Option<TypeId>,
}

/// The type of a function, as seen through function pointers.
#[derive(Clone, Debug)]
pub struct Subroutine {
    /// `None` for functions returning `void`.
    pub return_type_id: Option<TypeId>,
    pub parameters: Vec<Option<TypeId>>,
    /// Set when the parameter list ends in `...`.
    pub variadic: bool,
}

#[derive(Clone, Debug)]
pub struct Array {
    pub element_type_id: Option<TypeId>,
    /// Number of elements; 0 when the bound is unknown.
    pub count: u64,
}

/// A C-style enumeration: an integer with names for some of its values.
#[derive(Clone, Debug)]
pub struct Enumeration {
    pub name: Option<String>,
    pub byte_size: u64,
    /// Enumerator values, truncated to `byte_size` bytes, mapped to names.
    pub enumerators: BTreeMap<u64, String>,
}

impl Enumeration {
    /// Width used to read values when the debug info omits one.
    pub const DEFAULT_BYTE_SIZE: u64 = 4;

    /// Truncates `value` to this enumeration's width.
    pub fn normalize(&self, value: u64) -> u64 {
        match self.byte_size {
            1 => value & 0xff,
            2 => value & 0xffff,
            4 => value & 0xffff_ffff,
            _ => value,
        }
    }

    /// Looks up the name of a raw stored value.
    pub fn lookup(&self, raw: u64) -> Option<&str> {
        self.enumerators.get(&self.normalize(raw)).map(String::as_str)
    }
}
