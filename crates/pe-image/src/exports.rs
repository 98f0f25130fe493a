//! Export Directory walk (spec.md §4.D "Exports").

use std::collections::HashMap;

use dma_core::{Address, MemoryReader};

use crate::error::PeError;
use crate::headers::{ParsedCore, DIRECTORY_EXPORT};
use crate::read_utils::{read_cstr, u16_at, u32_at};

const DIRECTORY_SIZE: usize = 40;

/// One exported symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFunction {
    pub name: String,
    pub ordinal: u32,
    pub rva: u32,
    pub is_forwarder: bool,
    pub forwarder_target: Option<String>,
}

pub(crate) fn read_exports<R: MemoryReader + ?Sized>(
    reader: &R,
    base: Address,
    core: &ParsedCore,
) -> Result<Vec<ExportedFunction>, PeError> {
    let dir = core.headers.data_directories[DIRECTORY_EXPORT];
    if dir.rva == 0 {
        return Err(PeError::DirectoryMissing("export"));
    }

    let raw = reader.read(base + u64::from(dir.rva), DIRECTORY_SIZE);
    if raw.len() < DIRECTORY_SIZE {
        return Err(PeError::TooShort("export directory"));
    }

    let ordinal_base = u32_at(&raw, 16).unwrap_or(0);
    let number_of_functions = u32_at(&raw, 20).unwrap_or(0);
    let number_of_names = u32_at(&raw, 24).unwrap_or(0);
    let address_of_functions = u32_at(&raw, 28).unwrap_or(0);
    let address_of_names = u32_at(&raw, 32).unwrap_or(0);
    let address_of_name_ordinals = u32_at(&raw, 36).unwrap_or(0);

    // index-into-AddressOfFunctions -> name, built from the parallel
    // AddressOfNames / AddressOfNameOrdinals arrays.
    let mut index_to_name: HashMap<u32, String> = HashMap::new();
    for n in 0..number_of_names {
        let name_rva_addr = base + u64::from(address_of_names) + u64::from(n) * 4;
        let name_rva_raw = reader.read(name_rva_addr, 4);
        let Some(name_rva) = u32_at(&name_rva_raw, 0) else { continue };

        let ordinal_idx_addr = base + u64::from(address_of_name_ordinals) + u64::from(n) * 2;
        let ordinal_idx_raw = reader.read(ordinal_idx_addr, 2);
        let Some(index) = u16_at(&ordinal_idx_raw, 0) else { continue };

        let name = read_cstr(reader, base + u64::from(name_rva), 512);
        index_to_name.insert(u32::from(index), name);
    }

    let export_dir_start = dir.rva;
    let export_dir_end = dir.rva + dir.size;

    let mut out = Vec::with_capacity(number_of_functions as usize);
    for i in 0..number_of_functions {
        let func_addr = base + u64::from(address_of_functions) + u64::from(i) * 4;
        let func_raw = reader.read(func_addr, 4);
        let Some(func_rva) = u32_at(&func_raw, 0) else { continue };
        if func_rva == 0 {
            continue; // non-exported ordinal hole
        }

        let ordinal = ordinal_base + i;
        let is_forwarder = func_rva >= export_dir_start && func_rva < export_dir_end;

        if is_forwarder {
            let target = read_cstr(reader, base + u64::from(func_rva), 512);
            out.push(ExportedFunction {
                name: index_to_name.get(&i).cloned().unwrap_or_default(),
                ordinal,
                rva: func_rva,
                is_forwarder: true,
                forwarder_target: Some(target),
            });
        } else {
            out.push(ExportedFunction {
                name: index_to_name.get(&i).cloned().unwrap_or_default(),
                ordinal,
                rva: func_rva,
                is_forwarder: false,
                forwarder_target: None,
            });
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::parse_core;
    use crate::test_support::{FakeImage, PeBuilder, SectionSpec, CHAR_INITIALIZED_DATA_READWRITE};

    fn le32(v: u32) -> [u8; 4] {
        v.to_le_bytes()
    }

    /// One named export, one ordinal-only export (hole-free), and one
    /// forwarder export whose target string lives inside the export
    /// directory's own RVA range.
    fn synth_with_exports() -> Vec<u8> {
        let edata_rva = 0x4000u32;
        let dir_size = 0x200u32;
        let mut edata = vec![0u8; 0x300];

        let functions_off = 0x40u32;
        let names_off = 0x60u32;
        let name_ordinals_off = 0x70u32;
        let name0_off = 0x80u32;
        let forwarder_str_off = 0x90u32;

        edata[16..20].copy_from_slice(&le32(1)); // Base
        edata[20..24].copy_from_slice(&le32(3)); // NumberOfFunctions
        edata[24..28].copy_from_slice(&le32(1)); // NumberOfNames
        edata[28..32].copy_from_slice(&le32(edata_rva + functions_off));
        edata[32..36].copy_from_slice(&le32(edata_rva + names_off));
        edata[36..40].copy_from_slice(&le32(edata_rva + name_ordinals_off));

        // AddressOfFunctions[0] = named export at rva 0x1234
        edata[functions_off as usize..functions_off as usize + 4].copy_from_slice(&le32(0x1234));
        // AddressOfFunctions[1] = forwarder, RVA inside export dir range
        edata[functions_off as usize + 4..functions_off as usize + 8]
            .copy_from_slice(&le32(forwarder_str_off + edata_rva));
        // AddressOfFunctions[2] = 0 => ordinal hole, skipped

        edata[names_off as usize..names_off as usize + 4].copy_from_slice(&le32(edata_rva + name0_off));
        edata[name_ordinals_off as usize..name_ordinals_off as usize + 2]
            .copy_from_slice(&0u16.to_le_bytes());

        edata[name0_off as usize..name0_off as usize + 9].copy_from_slice(b"MyExport\0");
        edata[forwarder_str_off as usize..forwarder_str_off as usize + 19]
            .copy_from_slice(b"KERNEL32.ExitProcess");
        edata[forwarder_str_off as usize + 19] = 0;

        PeBuilder::new()
            .section(SectionSpec {
                name: ".edata",
                rva: edata_rva,
                virtual_size: 0x1000,
                characteristics: CHAR_INITIALIZED_DATA_READWRITE,
                data: edata,
            })
            .data_directory(0, edata_rva, dir_size)
            .build()
    }

    #[test]
    fn named_ordinal_hole_and_forwarder() {
        let bytes = synth_with_exports();
        let image = FakeImage::new(bytes);
        let core = parse_core(&image, 0).unwrap();
        let exports = read_exports(&image, 0, &core).unwrap();

        // ordinal hole (index 2) is skipped entirely
        assert_eq!(exports.len(), 2);

        let named = exports.iter().find(|e| e.rva == 0x1234).unwrap();
        assert_eq!(named.name, "MyExport");
        assert_eq!(named.ordinal, 1);
        assert!(!named.is_forwarder);

        let forwarder = exports.iter().find(|e| e.is_forwarder).unwrap();
        assert_eq!(forwarder.forwarder_target.as_deref(), Some("KERNEL32.ExitProcess"));
        assert_eq!(forwarder.ordinal, 2);
    }

    #[test]
    fn missing_export_directory_is_an_error() {
        let bytes = PeBuilder::new()
            .section(SectionSpec {
                name: ".text",
                rva: 0x1000,
                virtual_size: 0x1000,
                characteristics: 0x6000_0020,
                data: Vec::new(),
            })
            .build();
        let image = FakeImage::new(bytes);
        let core = parse_core(&image, 0).unwrap();
        assert!(read_exports(&image, 0, &core).is_err());
    }
}
