//! Virtual method counting and enumeration by walking a vtable's function
//! pointer slots until one stops looking like code (spec.md §4.E "Method
//! counting").

use dma_core::{Address, MemoryReader};

/// Default cap on how many vtable slots are walked, matching the original
/// tool's guard against running off the end of a misidentified vtable.
pub const DEFAULT_METHOD_CAP: usize = 1024;

const SLOT_SIZE: u64 = 8;
const MIN_USER_MODE_ADDRESS: u64 = 0x1_0000;
const MAX_USER_MODE_ADDRESS: u64 = 0x0000_7FFF_FFFF_FFFF;

/// A single resolved entry in a vtable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VTableEntry {
    pub index: u32,
    pub address: Address,
}

/// `true` if `func_addr` is a plausible code pointer and the four bytes at
/// that address (`code`) don't look like padding or a small embedded
/// integer masquerading as a pointer.
fn looks_like_code(func_addr: u64, code: [u8; 4]) -> bool {
    if func_addr == 0 || func_addr <= MIN_USER_MODE_ADDRESS || func_addr >= MAX_USER_MODE_ADDRESS {
        return false;
    }
    match (code[0], code[1]) {
        (0x00, 0x00) | (0xCC, 0xCC) | (0x90, 0x90) | (0xFF, 0xFF) => return false,
        _ => {}
    }
    if code[0] < 0x40 && code[1] == 0 && code[2] == 0 && code[3] == 0 {
        return false;
    }
    true
}

fn read_slot<R: MemoryReader + ?Sized>(reader: &R, vtable_address: Address, index: u32) -> Option<u64> {
    let raw = reader.read(vtable_address + u64::from(index) * SLOT_SIZE, SLOT_SIZE as usize);
    if raw.len() < SLOT_SIZE as usize {
        return None;
    }
    Some(u64::from_le_bytes(raw.try_into().expect("checked length")))
}

pub fn count_vtable_methods<R: MemoryReader + ?Sized>(reader: &R, vtable_address: Address, cap: usize) -> u32 {
    let mut count = 0u32;
    for index in 0..cap as u32 {
        let Some(func_addr) = read_slot(reader, vtable_address, index) else { break };
        let code = reader.read(func_addr, 4);
        if code.len() < 4 {
            break;
        }
        let code4: [u8; 4] = code[..4].try_into().expect("checked length");
        if !looks_like_code(func_addr, code4) {
            break;
        }
        count += 1;
    }
    count
}

pub fn enumerate_vtable_entries<R: MemoryReader + ?Sized>(
    reader: &R,
    vtable_address: Address,
    cap: usize,
) -> Vec<VTableEntry> {
    let mut entries = Vec::new();
    for index in 0..cap as u32 {
        let Some(func_addr) = read_slot(reader, vtable_address, index) else { break };
        let code = reader.read(func_addr, 4);
        if code.len() < 4 {
            break;
        }
        let code4: [u8; 4] = code[..4].try_into().expect("checked length");
        if !looks_like_code(func_addr, code4) {
            break;
        }
        entries.push(VTableEntry { index, address: func_addr });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FakeReader {
        vtable: RefCell<Vec<u8>>,
        code_at: RefCell<HashMap<u64, [u8; 4]>>,
    }

    impl MemoryReader for FakeReader {
        fn read(&self, address: Address, length: usize) -> Vec<u8> {
            if let Some(code) = self.code_at.borrow().get(&address) {
                return code[..length.min(4)].to_vec();
            }
            let buf = self.vtable.borrow();
            let start = address as usize;
            buf.get(start..(start + length).min(buf.len())).map_or_else(Vec::new, <[u8]>::to_vec)
        }
    }

    fn build_vtable(funcs: &[u64]) -> FakeReader {
        let mut vtable = Vec::new();
        for &f in funcs {
            vtable.extend_from_slice(&f.to_le_bytes());
        }
        let mut code_at = HashMap::new();
        for &f in funcs {
            if f != 0 {
                code_at.insert(f, [0x48, 0x89, 0x5C, 0x24]);
            }
        }
        FakeReader { vtable: RefCell::new(vtable), code_at: RefCell::new(code_at) }
    }

    #[test]
    fn stops_on_null_slot() {
        let reader = build_vtable(&[0x1000, 0x2000, 0]);
        assert_eq!(count_vtable_methods(&reader, 0, 16), 2);
    }

    #[test]
    fn stops_on_padding_pattern() {
        let reader = build_vtable(&[0x1000]);
        reader.code_at.borrow_mut().insert(0x1000, [0xCC, 0xCC, 0xCC, 0xCC]);
        assert_eq!(count_vtable_methods(&reader, 0, 16), 0);
    }

    #[test]
    fn stops_on_small_embedded_integer() {
        let reader = build_vtable(&[0x1000]);
        reader.code_at.borrow_mut().insert(0x1000, [0x05, 0x00, 0x00, 0x00]);
        assert_eq!(count_vtable_methods(&reader, 0, 16), 0);
    }

    #[test]
    fn respects_cap() {
        let reader = build_vtable(&[0x1000, 0x2000, 0x3000, 0x4000]);
        assert_eq!(count_vtable_methods(&reader, 0, 2), 2);
    }

    #[test]
    fn enumerate_matches_count() {
        let reader = build_vtable(&[0x1000, 0x2000, 0]);
        let entries = enumerate_vtable_entries(&reader, 0, 16);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], VTableEntry { index: 0, address: 0x1000 });
        assert_eq!(entries[1], VTableEntry { index: 1, address: 0x2000 });
    }
}
