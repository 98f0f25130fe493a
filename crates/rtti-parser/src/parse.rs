//! Walks vtable → Complete Object Locator → Type Descriptor → Class
//! Hierarchy Descriptor → Base Class Descriptors (spec.md §4.E "Recovering
//! a class from a vtable").

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use dma_core::{Address, MemoryReader};

use crate::demangle::demangle_rtti;
use crate::layout::{self, CHD_MULTIPLE_INHERITANCE, CHD_VIRTUAL_INHERITANCE};
use crate::methods::{self, DEFAULT_METHOD_CAP};
use crate::RttiClass;

const COL_SIGNATURE: u32 = 1;

/// Per-scan cache of `type_descriptor_rva -> mangled name`, and the module
/// base once self-recovered from a COL's `self_rva`. Neither is shared
/// across calls: a fresh [`Context`] belongs to one parse or one scan.
pub(crate) struct Context {
    module_base: Cell<Address>,
    name_cache: RefCell<HashMap<i32, String>>,
}

impl Context {
    pub(crate) fn new(module_base: Address) -> Self {
        Self { module_base: Cell::new(module_base), name_cache: RefCell::new(HashMap::new()) }
    }

    fn mangled_name<R: MemoryReader + ?Sized>(&self, reader: &R, rva: i32) -> Option<String> {
        if let Some(name) = self.name_cache.borrow().get(&rva) {
            return Some(name.clone());
        }
        let addr = self.module_base.get() + rva as u64;
        let name = layout::read_mangled_name(reader, addr)?;
        self.name_cache.borrow_mut().insert(rva, name.clone());
        Some(name)
    }
}

pub(crate) fn parse_col<R: MemoryReader + ?Sized>(
    reader: &R,
    col_address: Address,
    ctx: &Context,
) -> Option<RttiClass> {
    let col = layout::read_col(reader, col_address)?;
    if col.signature != COL_SIGNATURE {
        return None;
    }
    if !layout::is_plausible_rva(col.type_descriptor_rva, None) {
        return None;
    }
    if !layout::is_plausible_rva(col.class_hierarchy_rva, None) {
        return None;
    }

    // Self-recovery: once we trust a COL's self_rva, derive the module
    // base from it so later RVA-relative reads (names, CHD, BCDs) land in
    // the right place even when the caller didn't know the base.
    if ctx.module_base.get() == 0 && col.self_rva > 0 {
        ctx.module_base.set(col_address.wrapping_sub(col.self_rva as u64));
    }

    let mangled_name = ctx.mangled_name(reader, col.type_descriptor_rva)?;
    if !mangled_name.starts_with(".?A") {
        return None;
    }
    let demangled_name = demangle_rtti(&mangled_name);

    let mut has_multiple_inheritance = false;
    let mut has_virtual_inheritance = false;
    let mut base_class_names = Vec::new();
    let chd_addr = ctx.module_base.get() + col.class_hierarchy_rva as u64;
    if let Some(chd) = layout::read_chd(reader, chd_addr) {
        has_multiple_inheritance = chd.attributes & CHD_MULTIPLE_INHERITANCE != 0;
        has_virtual_inheritance = chd.attributes & CHD_VIRTUAL_INHERITANCE != 0;
        base_class_names = base_class_names_of(reader, &chd, ctx);
    }

    Some(RttiClass {
        vtable_address: 0,
        col_address,
        mangled_name,
        demangled_name,
        vftable_offset: col.offset,
        has_virtual_inheritance,
        has_multiple_inheritance,
        method_count: 0,
        base_class_names,
    })
}

fn base_class_names_of<R: MemoryReader + ?Sized>(reader: &R, chd: &layout::Chd, ctx: &Context) -> Vec<String> {
    if chd.num_base_classes == 0 {
        return Vec::new();
    }
    let array_addr = ctx.module_base.get() + chd.base_class_array_rva as u64;
    let array_bytes = reader.read(array_addr, chd.num_base_classes as usize * 4);
    if array_bytes.len() < chd.num_base_classes as usize * 4 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(chd.num_base_classes as usize);
    for i in 0..chd.num_base_classes as usize {
        let off = i * 4;
        let bcd_rva = i32::from_le_bytes(array_bytes[off..off + 4].try_into().expect("checked length"));
        if !layout::is_plausible_rva(bcd_rva, None) {
            continue;
        }
        let bcd_addr = ctx.module_base.get() + bcd_rva as u64;
        let Some(bcd) = layout::read_bcd(reader, bcd_addr) else { continue };
        let Some(name) = ctx.mangled_name(reader, bcd.type_descriptor_rva) else { continue };
        out.push(demangle_rtti(&name));
    }
    out
}

/// Reads the vtable's hidden `[-1]` slot to find the COL and, from there,
/// the rest of the class's RTTI chain.
pub fn parse_from_vtable<R: MemoryReader + ?Sized>(
    reader: &R,
    vtable_address: Address,
    module_base: Address,
) -> Option<RttiClass> {
    let col_ptr_raw = reader.read(vtable_address.checked_sub(8)?, 8);
    if col_ptr_raw.len() < 8 {
        return None;
    }
    let col_address = u64::from_le_bytes(col_ptr_raw.try_into().expect("checked length"));
    if col_address == 0 {
        return None;
    }

    let ctx = Context::new(module_base);
    let mut class = parse_col(reader, col_address, &ctx)?;
    class.vtable_address = vtable_address;
    class.method_count = methods::count_vtable_methods(reader, vtable_address, DEFAULT_METHOD_CAP);
    Some(class)
}

/// Parses a class starting directly from a known COL address, without a
/// vtable (so `vtable_address`/`method_count` are left at zero).
pub fn parse_from_col<R: MemoryReader + ?Sized>(
    reader: &R,
    col_address: Address,
    module_base: Address,
) -> Option<RttiClass> {
    let ctx = Context::new(module_base);
    parse_col(reader, col_address, &ctx)
}
