//! Scans a module's non-executable initialized-data sections for COL
//! pointers and recovers a class for each one found (spec.md §4.E
//! "Scanning a module").

use dma_core::{Address, MemoryReader};
use pe_image::PeImage;

use crate::parse::{self, Context};
use crate::methods::DEFAULT_METHOD_CAP;
use crate::RttiClass;

/// Matches [`dma_core::DEFAULT_CHUNK_SIZE`]'s order of magnitude; kept
/// local since a scan here walks 8-byte pointer slots, not bytes.
const SCAN_CHUNK_SIZE: usize = 4 * 1024 * 1024;
const SLOT_SIZE: u64 = 8;
const MIN_SECTION_SIZE: u32 = 4096;

fn is_rtti_candidate_section(section: &pe_image::PeSection) -> bool {
    !section.is_executable()
        && section.is_initialized_data()
        && section.virtual_size >= MIN_SECTION_SIZE
        && (section.name == ".rdata" || section.name == ".data")
}

/// Scans every qualifying section of the module at `module_base`,
/// returning every class recovered.
pub fn scan_module<R: MemoryReader + ?Sized>(reader: &R, module_base: Address) -> Vec<RttiClass> {
    let mut out = Vec::new();
    scan_module_with(reader, module_base, |class| out.push(class.clone()));
    out
}

/// Same walk as [`scan_module`], but invokes `callback` for each class as
/// it is found instead of collecting into a `Vec`. Returns the count
/// found. Useful for a caller streaming results to a UI without waiting
/// for the whole module to finish.
pub fn scan_module_with<R: MemoryReader + ?Sized>(
    reader: &R,
    module_base: Address,
    mut callback: impl FnMut(&RttiClass),
) -> usize {
    let image = PeImage::new(reader, module_base);
    let Ok(sections) = image.sections() else { return 0 };

    let ctx = Context::new(module_base);
    let mut found = 0usize;

    for section in sections.iter().filter(|s| is_rtti_candidate_section(s)) {
        let section_base = module_base + section.va_rva as u64;
        let mut offset: u64 = 0;
        while offset < section.virtual_size as u64 {
            let remaining = (section.virtual_size as u64 - offset) as usize;
            let chunk_len = SCAN_CHUNK_SIZE.min(remaining);
            let chunk = reader.read(section_base + offset, chunk_len);
            if chunk.len() < SLOT_SIZE as usize {
                offset += chunk_len as u64;
                continue;
            }

            let mut i = 0usize;
            while i + SLOT_SIZE as usize <= chunk.len() {
                let slot_addr = section_base + offset + i as u64;
                let candidate = u64::from_le_bytes(
                    chunk[i..i + SLOT_SIZE as usize].try_into().expect("checked length"),
                );
                i += SLOT_SIZE as usize;
                if candidate == 0 {
                    continue;
                }

                let Some(mut class) = parse::parse_col(reader, candidate, &ctx) else { continue };
                let vtable_address = slot_addr + SLOT_SIZE;
                class.vtable_address = vtable_address;
                class.method_count =
                    crate::methods::count_vtable_methods(reader, vtable_address, DEFAULT_METHOD_CAP);
                callback(&class);
                found += 1;
            }

            offset += chunk_len as u64;
        }
    }

    found
}
