//! Extraction of scalar values from memory.
//!
//! Inspected memory shares the layout and byte order of this process, so
//! everything here decodes in native byte order.

use scroll::Pread;

use crate::memory::Memory;

/// Size of a pointer in the inspected program.
pub const POINTER_SIZE: usize = std::mem::size_of::<usize>();

/// Reads a `width`-byte unsigned integer. Only widths 1, 2, 4 and 8 are
/// supported.
pub fn load_unsigned(mem: &impl Memory, addr: u64, width: usize) -> Option<u64> {
    let mut buf = [0u8; 8];
    let bytes = buf.get_mut(..width)?;
    mem.read(addr, bytes)?;
    let bytes = &buf[..width];
    match width {
        1 => Some(u64::from(bytes[0])),
        2 => bytes.pread_with::<u16>(0, scroll::NATIVE).ok().map(u64::from),
        4 => bytes.pread_with::<u32>(0, scroll::NATIVE).ok().map(u64::from),
        8 => bytes.pread_with::<u64>(0, scroll::NATIVE).ok(),
        _ => None,
    }
}

/// Reads a pointer-sized value.
pub fn load_pointer(mem: &impl Memory, addr: u64) -> Option<u64> {
    load_unsigned(mem, addr, POINTER_SIZE)
}

/// Interprets the low `width` bytes of `raw` as a two's complement integer.
pub fn sign_extend(raw: u64, width: usize) -> i64 {
    match width {
        1 => raw as u8 as i8 as i64,
        2 => raw as u16 as i16 as i64,
        4 => raw as u32 as i32 as i64,
        _ => raw as i64,
    }
}

/// Interprets `raw` as an IEEE float of the given width, if there is one.
pub fn to_float(raw: u64, width: usize) -> Option<f64> {
    match width {
        4 => Some(f64::from(f32::from_bits(raw as u32))),
        8 => Some(f64::from_bits(raw)),
        _ => None,
    }
}
