//! Construction of type descriptors from debug info entries.
//!
//! There is one `build_*` function per kind of type-describing entry. Each
//! reads the attributes it needs from a `Die` and produces the corresponding
//! model type; the walker decides which one to call and where the result
//! goes.

use std::collections::BTreeMap;

use gimli::constants as gim_con;

use crate::die::{AttrValue, Die};
use crate::error::{Error, Result};
use crate::model::{
    AggregateKind, Alias, Array, CvQualified, Encoding, Enumeration, Member,
    Pointer, PointerKind, Primitive, Qualifier, StructOrUnion, Subroutine,
    TypeDescriptor, INHERIT_MEMBER_NAME, NO_NAME,
};
use crate::registry::TypeRegistry;

/// Builds the descriptor for a type-describing entry, or returns `None` if
/// `die` does not describe a type.
///
/// `types` is consulted only for names borrowed through
/// `DW_AT_specification`.
pub fn build_type(
    die: &Die,
    types: &TypeRegistry,
) -> Result<Option<TypeDescriptor>> {
    let ty: TypeDescriptor = match die.tag {
        gim_con::DW_TAG_base_type => build_primitive(die)?.into(),
        gim_con::DW_TAG_structure_type => {
            build_aggregate(die, AggregateKind::Struct, types)?.into()
        }
        gim_con::DW_TAG_class_type => {
            build_aggregate(die, AggregateKind::Class, types)?.into()
        }
        gim_con::DW_TAG_union_type => {
            build_aggregate(die, AggregateKind::Union, types)?.into()
        }
        gim_con::DW_TAG_pointer_type => {
            build_pointer(die, PointerKind::Pointer)?.into()
        }
        gim_con::DW_TAG_reference_type => {
            build_pointer(die, PointerKind::Reference)?.into()
        }
        gim_con::DW_TAG_rvalue_reference_type => {
            build_pointer(die, PointerKind::RvalueReference)?.into()
        }
        gim_con::DW_TAG_const_type => build_cv(die, Qualifier::Const)?.into(),
        gim_con::DW_TAG_volatile_type => {
            build_cv(die, Qualifier::Volatile)?.into()
        }
        gim_con::DW_TAG_restrict_type => {
            build_cv(die, Qualifier::Restrict)?.into()
        }
        gim_con::DW_TAG_typedef => build_alias(die)?.into(),
        gim_con::DW_TAG_subroutine_type => build_subroutine(die)?.into(),
        gim_con::DW_TAG_array_type => build_array(die)?.into(),
        gim_con::DW_TAG_enumeration_type => build_enumeration(die)?.into(),
        _ => return Ok(None),
    };
    Ok(Some(ty))
}

pub fn build_primitive(die: &Die) -> Result<Primitive> {
    let encoding = match die.udata(gim_con::DW_AT_encoding)? {
        Some(e) => Encoding::from_dwarf(gimli::DwAte(e as u8)),
        None => Encoding::Other,
    };
    Ok(Primitive {
        name: die.name()?.unwrap_or(NO_NAME).to_string(),
        byte_size: die.udata(gim_con::DW_AT_byte_size)?.unwrap_or(0),
        encoding,
    })
}

/// Builds a struct, class or union.
///
/// Members are taken from `DW_TAG_member` children in order; base classes
/// (`DW_TAG_inheritance`) become members named `<inherit>`. Static data
/// members carry no storage in the aggregate and are left out.
pub fn build_aggregate(
    die: &Die,
    kind: AggregateKind,
    types: &TypeRegistry,
) -> Result<StructOrUnion> {
    let name = match die.name()? {
        Some(n) => Some(n.to_string()),
        None => die
            .type_ref(gim_con::DW_AT_specification)?
            .and_then(|id| types.get(id))
            .and_then(|t| t.registered_name())
            .map(str::to_string),
    };

    let mut members = vec![];
    for child in &die.children {
        match child.tag {
            gim_con::DW_TAG_member => {
                if is_static_member(child)? {
                    continue;
                }
                let offset = match kind {
                    AggregateKind::Union => 0,
                    _ => member_offset(child)?,
                };
                members.push(Member {
                    name: child.name()?.unwrap_or(NO_NAME).to_string(),
                    type_id: child.type_ref(gim_con::DW_AT_type)?,
                    offset,
                });
            }
            gim_con::DW_TAG_inheritance => {
                members.push(Member {
                    name: INHERIT_MEMBER_NAME.to_string(),
                    type_id: child.type_ref(gim_con::DW_AT_type)?,
                    offset: member_offset(child)?,
                });
            }
            _ => (),
        }
    }

    Ok(StructOrUnion {
        kind,
        name,
        declaration: die.flag(gim_con::DW_AT_declaration)?,
        members,
    })
}

/// Members declared `static` show up as external declarations with no
/// location.
fn is_static_member(die: &Die) -> Result<bool> {
    let flagged = die.flag(gim_con::DW_AT_external)?
        || die.flag(gim_con::DW_AT_declaration)?;
    Ok(flagged && die.attr(gim_con::DW_AT_data_member_location).is_none())
}

fn member_offset(die: &Die) -> Result<u64> {
    Ok(die.udata(gim_con::DW_AT_data_member_location)?.unwrap_or(0))
}

pub fn build_pointer(die: &Die, kind: PointerKind) -> Result<Pointer> {
    Ok(Pointer {
        type_id: die.type_ref(gim_con::DW_AT_type)?,
        kind,
    })
}

pub fn build_cv(die: &Die, qualifier: Qualifier) -> Result<CvQualified> {
    Ok(CvQualified {
        qualifier,
        type_id: die.type_ref(gim_con::DW_AT_type)?,
    })
}

pub fn build_alias(die: &Die) -> Result<Alias> {
    Ok(Alias {
        name: die.name()?.unwrap_or(NO_NAME).to_string(),
        type_id: die.type_ref(gim_con::DW_AT_type)?,
    })
}

pub fn build_subroutine(die: &Die) -> Result<Subroutine> {
    let mut parameters = vec![];
    let mut variadic = false;
    for child in &die.children {
        match child.tag {
            gim_con::DW_TAG_formal_parameter => {
                parameters.push(child.type_ref(gim_con::DW_AT_type)?);
            }
            gim_con::DW_TAG_unspecified_parameters => variadic = true,
            _ => (),
        }
    }
    Ok(Subroutine {
        return_type_id: die.type_ref(gim_con::DW_AT_type)?,
        parameters,
        variadic,
    })
}

/// Builds an array from its element type and its first subrange.
///
/// The element count is `upper_bound + 1`, or `DW_AT_count` when there is no
/// upper bound. Bounds given as expressions (variable-length arrays) count as
/// absent, as does a missing bound, giving a count of 0.
pub fn build_array(die: &Die) -> Result<Array> {
    let subrange = match die.first_child() {
        Some(c) if c.tag == gim_con::DW_TAG_subrange_type => c,
        _ => return Err(Error::MissingSubrange { offset: die.offset }),
    };

    let count = match constant_bound(subrange, gim_con::DW_AT_upper_bound) {
        Some(upper) => upper.wrapping_add(1),
        None => constant_bound(subrange, gim_con::DW_AT_count).unwrap_or(0),
    };

    Ok(Array {
        element_type_id: die.type_ref(gim_con::DW_AT_type)?,
        count,
    })
}

fn constant_bound(die: &Die, at: gimli::DwAt) -> Option<u64> {
    match die.attr(at)? {
        AttrValue::Unsigned(v) => Some(*v),
        // An upper bound of -1 is how an empty array is spelled.
        AttrValue::Signed(v) => Some(*v as u64),
        _ => None,
    }
}

/// Builds an enumeration. Enumerators are read in declaration order, so a
/// value given two names keeps the later one.
pub fn build_enumeration(die: &Die) -> Result<Enumeration> {
    let mut e = Enumeration {
        name: die.name()?.map(str::to_string),
        byte_size: die
            .udata(gim_con::DW_AT_byte_size)?
            .unwrap_or(Enumeration::DEFAULT_BYTE_SIZE),
        enumerators: BTreeMap::new(),
    };

    for child in &die.children {
        if child.tag != gim_con::DW_TAG_enumerator {
            continue;
        }
        let value = child
            .constant(gim_con::DW_AT_const_value)?
            .ok_or(Error::MissingConstValue { offset: child.offset })?;
        let name = child.name()?.unwrap_or(NO_NAME).to_string();
        let key = e.normalize(value);
        e.enumerators.insert(key, name);
    }

    Ok(e)
}
