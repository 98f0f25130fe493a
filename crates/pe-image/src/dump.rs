//! In-memory image dump, optionally unmapped back to on-disk file layout
//! (spec.md §4.D "Dump").

use dma_core::{Address, MemoryReader};

use crate::error::PeError;
use crate::headers::{self, ParsedCore};
use crate::read_utils::align_up;
use crate::sections::PeSection;

const DEFAULT_FILE_ALIGNMENT: u32 = 0x200;
const SIZE_OF_HEADERS_OFFSET: usize = 60;
const FILE_ALIGNMENT_OFFSET: usize = 36;

/// Controls how [`crate::dump`] reconstructs the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpOptions {
    /// Rebuild on-disk file layout (`PointerToRawData`/`SizeOfRawData` per
    /// section) instead of returning the in-memory layout verbatim.
    pub unmap_sections: bool,
    /// When unmapping, patch the optional header's `FileAlignment` and
    /// `SizeOfHeaders` to match the produced file.
    pub fix_headers: bool,
    /// File alignment used when unmapping. `0` means the default `0x200`.
    pub file_alignment: u32,
    /// Reserved: the source never rebuilds the IAT even when this is set
    /// (spec.md §9 Open Questions).
    pub rebuild_iat: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            unmap_sections: false,
            fix_headers: false,
            file_alignment: DEFAULT_FILE_ALIGNMENT,
            rebuild_iat: false,
        }
    }
}

pub(crate) fn dump<R: MemoryReader + ?Sized>(
    reader: &R,
    base: Address,
    core: &ParsedCore,
    sections: &[PeSection],
    options: &DumpOptions,
) -> Result<Vec<u8>, PeError> {
    let mem = reader.read(base, core.headers.image_size as usize);
    if mem.is_empty() {
        return Err(PeError::TooShort("image"));
    }

    if !options.unmap_sections {
        return Ok(mem);
    }

    let file_alignment = if options.file_alignment == 0 {
        DEFAULT_FILE_ALIGNMENT
    } else {
        options.file_alignment
    };

    let section_header_size = headers::section_header_size() as u32;
    let headers_size_raw = core.section_header_start + sections.len() as u32 * section_header_size;
    let headers_size = align_up(headers_size_raw, file_alignment);

    let mut out = vec![0u8; headers_size as usize];
    let copy_len = (headers_size_raw as usize).min(mem.len());
    out[..copy_len].copy_from_slice(&mem[..copy_len]);

    let mut raw_offset = headers_size;
    for (i, section) in sections.iter().enumerate() {
        // Empty sections still get one alignment unit of zeroed padding.
        let raw_size = align_up(section.virtual_size.max(1), file_alignment);

        let sh_off = (core.section_header_start + i as u32 * section_header_size) as usize;
        if sh_off + 24 <= out.len() {
            out[sh_off + 16..sh_off + 20].copy_from_slice(&raw_size.to_le_bytes());
            out[sh_off + 20..sh_off + 24].copy_from_slice(&raw_offset.to_le_bytes());
        }

        let end = (raw_offset + raw_size) as usize;
        if out.len() < end {
            out.resize(end, 0);
        }

        let src_start = section.va_rva as usize;
        let available = mem.len().saturating_sub(src_start);
        let copy_n = (section.virtual_size as usize).min(available);
        if copy_n > 0 {
            out[raw_offset as usize..raw_offset as usize + copy_n]
                .copy_from_slice(&mem[src_start..src_start + copy_n]);
        }

        raw_offset += raw_size;
    }

    if options.fix_headers {
        let opt_off = (core.e_lfanew + 4 + 20) as usize;
        if opt_off + SIZE_OF_HEADERS_OFFSET + 4 <= out.len() {
            out[opt_off + FILE_ALIGNMENT_OFFSET..opt_off + FILE_ALIGNMENT_OFFSET + 4]
                .copy_from_slice(&file_alignment.to_le_bytes());
            out[opt_off + SIZE_OF_HEADERS_OFFSET..opt_off + SIZE_OF_HEADERS_OFFSET + 4]
                .copy_from_slice(&headers_size.to_le_bytes());
        }
    }

    Ok(out)
}
