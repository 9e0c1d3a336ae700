//! Adapter between Gimli and our entry trees.
//!
//! Each compile unit is decoded into an owned `Die` tree. References are
//! rebased to absolute `.debug_info` offsets, strings are fetched from
//! whichever string section holds them, and file indices are resolved through
//! the unit's line program, so nothing downstream needs the unit again.

use std::borrow::Cow;

use gimli::constants as gim_con;
use object::{Object, ObjectSection, ObjectSymbol, RelocationKind, RelocationTarget};
use scroll::Pwrite;
use tracing::{debug, warn};

use crate::die::{AttrValue, Die};
use crate::error::Result;
use crate::model::TypeId;

// Internal type abbreviations
type RtSlice<'a> = gimli::EndianSlice<'a, gimli::RunTimeEndian>;

/// Attributes carried into the entry tree. Everything else is dropped during
/// conversion.
const KEPT_ATTRIBUTES: &[gimli::DwAt] = &[
    gim_con::DW_AT_name,
    gim_con::DW_AT_linkage_name,
    gim_con::DW_AT_type,
    gim_con::DW_AT_byte_size,
    gim_con::DW_AT_encoding,
    gim_con::DW_AT_data_member_location,
    gim_con::DW_AT_upper_bound,
    gim_con::DW_AT_count,
    gim_con::DW_AT_const_value,
    gim_con::DW_AT_declaration,
    gim_con::DW_AT_external,
    gim_con::DW_AT_specification,
    gim_con::DW_AT_low_pc,
    gim_con::DW_AT_high_pc,
    gim_con::DW_AT_decl_file,
    gim_con::DW_AT_decl_line,
];

/// Decodes every unit in `object`'s debug info, handing each unit's entry
/// tree to `visit` as soon as it is complete.
pub fn parse_file<'a>(
    object: &'a object::File<'a>,
    mut visit: impl FnMut(Die) -> Result<()>,
) -> Result<()> {
    let endian = if object.is_little_endian() {
        gimli::RunTimeEndian::Little
    } else {
        gimli::RunTimeEndian::Big
    };

    let load_section = |id: gimli::SectionId| -> Result<Cow<'a, [u8]>> {
        match object.section_by_name(id.name()) {
            Some(section) => section_data(object, &section),
            None => Ok(Cow::Borrowed(&[][..])),
        }
    };

    let dwarf_cow = gimli::Dwarf::load(&load_section)?;

    let dwarf =
        dwarf_cow.borrow(|section| gimli::EndianSlice::new(section, endian));

    let mut iter = dwarf.units();
    while let Some(header) = iter.next()? {
        let unit = dwarf.unit(header)?;
        let mut tree = unit.entries_tree(None)?;
        let root = tree.root()?;
        let die = convert_node(&dwarf, &unit, root)?;
        debug!(
            "unit {}: {} top-level entries",
            die.id(),
            die.children.len(),
        );
        visit(die)?;
    }

    Ok(())
}

/// Fetches a section's contents. Relocatable objects (archive members, for
/// instance) have their debug sections patched with absolute relocations,
/// since their cross-section offsets are otherwise left at zero.
fn section_data<'a>(
    object: &'a object::File<'a>,
    section: &object::Section<'a, 'a>,
) -> Result<Cow<'a, [u8]>> {
    let data = section.uncompressed_data()?;
    if object.kind() != object::ObjectKind::Relocatable {
        return Ok(data);
    }
    let mut relocations = section.relocations().peekable();
    if relocations.peek().is_none() {
        return Ok(data);
    }

    let endian = if object.is_little_endian() {
        scroll::Endian::Little
    } else {
        scroll::Endian::Big
    };
    let name = section.name().unwrap_or("<section>");
    let mut patched = data.into_owned();
    for (offset, reloc) in relocations {
        if reloc.kind() != RelocationKind::Absolute {
            continue;
        }
        let target = match reloc.target() {
            RelocationTarget::Symbol(index) => object.symbol_by_index(index)?.address(),
            RelocationTarget::Section(index) => object.section_by_index(index)?.address(),
            _ => 0,
        };
        let offset = offset as usize;
        let implicit = if reloc.has_implicit_addend() {
            read_implicit_addend(&patched, offset, reloc.size(), endian)
        } else {
            0
        };
        let value = target
            .wrapping_add(reloc.addend() as u64)
            .wrapping_add(implicit);
        let written: std::result::Result<usize, scroll::Error> = match reloc.size() {
            32 => patched.as_mut_slice().pwrite_with(value as u32, offset, endian),
            64 => patched.as_mut_slice().pwrite_with(value, offset, endian),
            other => {
                warn!("{}: unsupported {}-bit relocation at {:#x}", name, other, offset);
                continue;
            }
        };
        if let Err(e) = written {
            warn!("{}: relocation at {:#x} not applied: {}", name, offset, e);
        }
    }
    Ok(Cow::Owned(patched))
}

fn read_implicit_addend(
    data: &[u8],
    offset: usize,
    size: u8,
    endian: scroll::Endian,
) -> u64 {
    use scroll::Pread;
    match size {
        32 => data.pread_with::<u32>(offset, endian).map(u64::from).unwrap_or(0),
        64 => data.pread_with::<u64>(offset, endian).unwrap_or(0),
        _ => 0,
    }
}

fn convert_node<'d>(
    dwarf: &gimli::Dwarf<RtSlice<'d>>,
    unit: &gimli::Unit<RtSlice<'d>>,
    node: gimli::EntriesTreeNode<'_, '_, '_, RtSlice<'d>>,
) -> Result<Die> {
    let mut die = convert_entry(dwarf, unit, node.entry())?;
    let mut children = node.children();
    while let Some(child) = children.next()? {
        die.children.push(convert_node(dwarf, unit, child)?);
    }
    Ok(die)
}

fn convert_entry<'d>(
    dwarf: &gimli::Dwarf<RtSlice<'d>>,
    unit: &gimli::Unit<RtSlice<'d>>,
    entry: &gimli::DebuggingInformationEntry<'_, '_, RtSlice<'d>>,
) -> Result<Die> {
    let unit_offset = entry.offset();
    let offset = unit_offset
        .to_debug_info_offset(&unit.header)
        .map(|o| o.0)
        .unwrap_or(unit_offset.0);
    let mut die = Die::new(offset, entry.tag());

    let mut attrs = entry.attrs();
    while let Some(attr) = attrs.next()? {
        if !KEPT_ATTRIBUTES.contains(&attr.name()) {
            continue;
        }
        let value = convert_value(dwarf, unit, offset, unit_offset.0, attr.value())?;
        die.attrs.push((attr.name(), value));
    }
    Ok(die)
}

fn convert_value<'d>(
    dwarf: &gimli::Dwarf<RtSlice<'d>>,
    unit: &gimli::Unit<RtSlice<'d>>,
    entry_offset: usize,
    entry_unit_offset: usize,
    value: gimli::AttributeValue<RtSlice<'d>>,
) -> Result<AttrValue> {
    use gimli::AttributeValue as Av;

    Ok(match value {
        Av::String(_)
        | Av::DebugStrRef(_)
        | Av::DebugStrOffsetsIndex(_)
        | Av::DebugLineStrRef(_) => {
            AttrValue::String(get_attr_string(dwarf, unit, value)?.into_owned())
        }
        Av::UnitRef(o) => AttrValue::Ref(TypeId::rebase(entry_offset, entry_unit_offset, o.0)),
        Av::DebugInfoRef(o) => AttrValue::Ref(TypeId(o.0)),
        Av::Addr(a) => AttrValue::Address(a),
        Av::DebugAddrIndex(i) => AttrValue::Address(dwarf.address(unit, i)?),
        Av::Flag(f) => AttrValue::Flag(f),
        Av::FileIndex(f) => AttrValue::File(resolve_file(dwarf, unit, f)?),
        Av::Sdata(v) => AttrValue::Signed(v),
        Av::Encoding(e) => AttrValue::Unsigned(u64::from(e.0)),
        Av::Exprloc(expr) => match plus_constant(unit, expr)? {
            Some(v) => AttrValue::Unsigned(v),
            None => AttrValue::Unsupported("location expression"),
        },
        other => match (other.udata_value(), other.sdata_value()) {
            (Some(v), _) => AttrValue::Unsigned(v),
            (None, Some(v)) => AttrValue::Signed(v),
            (None, None) => AttrValue::Unsupported("unsupported form"),
        },
    })
}

fn get_attr_string<'d>(
    dwarf: &gimli::Dwarf<RtSlice<'d>>,
    unit: &gimli::Unit<RtSlice<'d>>,
    attrval: gimli::AttributeValue<RtSlice<'d>>,
) -> Result<Cow<'d, str>> {
    Ok(dwarf.attr_string(unit, attrval)?.to_string_lossy())
}

/// Member offsets in older DWARF are a one-operation expression,
/// `DW_OP_plus_uconst N`.
fn plus_constant<'d>(
    unit: &gimli::Unit<RtSlice<'d>>,
    expr: gimli::Expression<RtSlice<'d>>,
) -> Result<Option<u64>> {
    let mut ops = expr.operations(unit.encoding());
    let first = ops.next()?;
    if ops.next()?.is_some() {
        return Ok(None);
    }
    Ok(match first {
        Some(gimli::Operation::PlusConstant { value }) => Some(value),
        _ => None,
    })
}

/// Resolves a file index through the unit's line program, joining the
/// directory when the file name is relative. Returns an empty string if the
/// index does not resolve.
fn resolve_file<'d>(
    dwarf: &gimli::Dwarf<RtSlice<'d>>,
    unit: &gimli::Unit<RtSlice<'d>>,
    index: u64,
) -> Result<String> {
    let lp = match &unit.line_program {
        Some(lp) => lp,
        None => {
            debug!("file index {} in unit without a line program", index);
            return Ok(String::new());
        }
    };
    let header = lp.header();
    let fent = match header.file(index) {
        Some(f) => f,
        None => {
            debug!("invalid file index {}", index);
            return Ok(String::new());
        }
    };
    let file = get_attr_string(dwarf, unit, fent.path_name())?;
    if file.starts_with('/') {
        return Ok(file.into_owned());
    }
    match fent.directory(header) {
        Some(dv) => Ok(format!("{}/{}", get_attr_string(dwarf, unit, dv)?, file)),
        None => Ok(file.into_owned()),
    }
}
