//! Section enumeration and RVA <-> file-offset remap (spec.md §4.D).

use dma_core::{Address, MemoryReader};

use crate::error::PeError;
use crate::headers::{self, ParsedCore};
use crate::read_utils::u32_at;

const IMAGE_SCN_CNT_CODE: u32 = 0x0000_0020;
const IMAGE_SCN_CNT_INITIALIZED_DATA: u32 = 0x0000_0040;
const IMAGE_SCN_MEM_EXECUTE: u32 = 0x2000_0000;
const IMAGE_SCN_MEM_READ: u32 = 0x4000_0000;
const IMAGE_SCN_MEM_WRITE: u32 = 0x8000_0000;

/// One 40-byte section header, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeSection {
    pub name: String,
    pub va_rva: u32,
    pub virtual_size: u32,
    pub raw_size: u32,
    pub raw_offset: u32,
    pub characteristics: u32,
}

impl PeSection {
    #[must_use]
    pub const fn is_executable(&self) -> bool {
        self.characteristics & IMAGE_SCN_MEM_EXECUTE != 0
    }

    #[must_use]
    pub const fn is_readable(&self) -> bool {
        self.characteristics & IMAGE_SCN_MEM_READ != 0
    }

    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.characteristics & IMAGE_SCN_MEM_WRITE != 0
    }

    #[must_use]
    pub const fn is_initialized_data(&self) -> bool {
        self.characteristics & IMAGE_SCN_CNT_INITIALIZED_DATA != 0
    }

    #[must_use]
    pub const fn is_code(&self) -> bool {
        self.characteristics & IMAGE_SCN_CNT_CODE != 0
    }

    #[must_use]
    pub const fn contains_rva(&self, rva: u32) -> bool {
        rva >= self.va_rva && rva < self.va_rva + self.virtual_size
    }
}

pub(crate) fn read_sections<R: MemoryReader + ?Sized>(
    reader: &R,
    base: Address,
    core: &ParsedCore,
) -> Result<Vec<PeSection>, PeError> {
    let mut out = Vec::with_capacity(core.headers.section_count as usize);
    let size = headers::section_header_size();
    for i in 0..core.headers.section_count {
        let addr = base + u64::from(core.section_header_start) + u64::from(i) * size as u64;
        let raw = reader.read(addr, size);
        if raw.len() < size {
            return Err(PeError::TooShort("section header"));
        }
        let nul = raw[..8].iter().position(|&b| b == 0).unwrap_or(8);
        let name = String::from_utf8_lossy(&raw[..nul]).into_owned();
        out.push(PeSection {
            name,
            virtual_size: u32_at(&raw, 8).unwrap_or(0),
            va_rva: u32_at(&raw, 12).unwrap_or(0),
            raw_size: u32_at(&raw, 16).unwrap_or(0),
            raw_offset: u32_at(&raw, 20).unwrap_or(0),
            characteristics: u32_at(&raw, 36).unwrap_or(0),
        });
    }
    Ok(out)
}

/// Remap `rva` to a file offset given the section table: finds the unique
/// section containing it and translates via that section's raw offset.
/// RVAs inside the headers region (before any section starts) pass through
/// unchanged, per spec.md §4.D.
pub(crate) fn rva_to_file_offset(sections: &[PeSection], rva: u32) -> Result<u32, PeError> {
    let headers_region_end = sections.iter().map(|s| s.va_rva).min().unwrap_or(u32::MAX);
    if rva < headers_region_end {
        return Ok(rva);
    }
    sections
        .iter()
        .find(|s| s.contains_rva(rva))
        .map(|s| rva - s.va_rva + s.raw_offset)
        .ok_or(PeError::SectionNotFound(rva))
}
