//! Import Directory walk (spec.md §4.D "Imports").

use dma_core::{Address, MemoryReader};

use crate::error::PeError;
use crate::headers::{ParsedCore, DIRECTORY_IMPORT};
use crate::read_utils::{read_cstr, u16_at, u32_at, u64_at};

const DESCRIPTOR_SIZE: usize = 20;
const ORDINAL_FLAG_64: u64 = 0x8000_0000_0000_0000;
const ORDINAL_FLAG_32: u64 = 0x8000_0000;

/// One function imported from one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedFunction {
    pub module_name: String,
    pub by_ordinal: bool,
    pub name: Option<String>,
    pub hint_or_ordinal: u16,
    pub iat_rva: u32,
    pub resolved_address: u64,
}

pub(crate) fn read_imports<R: MemoryReader + ?Sized>(
    reader: &R,
    base: Address,
    core: &ParsedCore,
) -> Result<Vec<ImportedFunction>, PeError> {
    let dir = core.headers.data_directories[DIRECTORY_IMPORT];
    if dir.rva == 0 {
        return Err(PeError::DirectoryMissing("import"));
    }

    let thunk_size: usize = if core.headers.is_64bit { 8 } else { 4 };
    let ordinal_flag: u64 = if core.headers.is_64bit { ORDINAL_FLAG_64 } else { ORDINAL_FLAG_32 };

    let mut out = Vec::new();
    let mut descriptor_addr = base + u64::from(dir.rva);

    loop {
        let raw = reader.read(descriptor_addr, DESCRIPTOR_SIZE);
        if raw.len() < DESCRIPTOR_SIZE {
            break;
        }
        let original_first_thunk = u32_at(&raw, 0).unwrap_or(0);
        let name_rva = u32_at(&raw, 12).unwrap_or(0);
        let first_thunk = u32_at(&raw, 16).unwrap_or(0);

        if original_first_thunk == 0 && name_rva == 0 && first_thunk == 0 {
            break;
        }

        let module_name = read_cstr(reader, base + u64::from(name_rva), 256);
        let hint_thunks_rva = if original_first_thunk != 0 { original_first_thunk } else { first_thunk };

        let mut i: u64 = 0;
        loop {
            let hint_thunk_addr = base + u64::from(hint_thunks_rva) + i * thunk_size as u64;
            let iat_rva = first_thunk + (i * thunk_size as u64) as u32;
            let iat_addr = base + u64::from(iat_rva);

            let thunk_value = read_thunk(reader, hint_thunk_addr, thunk_size);
            let Some(thunk_value) = thunk_value else { break };
            if thunk_value == 0 {
                break;
            }

            let resolved_address = read_thunk(reader, iat_addr, thunk_size).unwrap_or(0);

            if thunk_value & ordinal_flag != 0 {
                out.push(ImportedFunction {
                    module_name: module_name.clone(),
                    by_ordinal: true,
                    name: None,
                    hint_or_ordinal: (thunk_value & 0xFFFF) as u16,
                    iat_rva,
                    resolved_address,
                });
            } else {
                let name_addr = base + (thunk_value & 0x7FFF_FFFF);
                let hint_bytes = reader.read(name_addr, 2);
                let hint = u16_at(&hint_bytes, 0).unwrap_or(0);
                let name = read_cstr(reader, name_addr + 2, 256);
                out.push(ImportedFunction {
                    module_name: module_name.clone(),
                    by_ordinal: false,
                    name: Some(name),
                    hint_or_ordinal: hint,
                    iat_rva,
                    resolved_address,
                });
            }

            i += 1;
        }

        descriptor_addr += DESCRIPTOR_SIZE as u64;
    }

    Ok(out)
}

fn read_thunk<R: MemoryReader + ?Sized>(reader: &R, addr: Address, thunk_size: usize) -> Option<u64> {
    let raw = reader.read(addr, thunk_size);
    if raw.len() < thunk_size {
        return None;
    }
    if thunk_size == 8 {
        u64_at(&raw, 0)
    } else {
        u32_at(&raw, 0).map(u64::from)
    }
}
