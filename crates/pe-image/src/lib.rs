//! PE/COFF header, section, import/export parsing and in-memory-to-file
//! layout dumping.
//!
//! [`PeImage`] wraps a [`MemoryReader`] and an image base and exposes the
//! header walk, section table, import/export directories, and the dumper
//! from spec.md §4.D. Every operation fails with a [`PeError`] on a
//! structural violation rather than panicking; short reads surface as
//! [`PeError::TooShort`].

mod dump;
mod error;
mod exports;
mod headers;
mod imports;
mod read_utils;
mod sections;
#[cfg(test)]
mod test_support;

use dma_core::{Address, MemoryReader};

pub use dump::DumpOptions;
pub use error::PeError;
pub use exports::ExportedFunction;
pub use headers::{DataDirectory, PeHeaders, DIRECTORY_EXPORT, DIRECTORY_IMPORT, NUM_DATA_DIRECTORIES};
pub use imports::ImportedFunction;
pub use sections::PeSection;

/// A PE image living at `base` in a process's address space, read through
/// `reader`.
pub struct PeImage<'r, R: MemoryReader + ?Sized> {
    reader: &'r R,
    base: Address,
}

impl<'r, R: MemoryReader + ?Sized> PeImage<'r, R> {
    #[must_use]
    pub const fn new(reader: &'r R, base: Address) -> Self {
        Self { reader, base }
    }

    /// Parse the DOS/PE/COFF/optional headers (spec.md §4.D "Header walk").
    ///
    /// # Errors
    ///
    /// Fails on a bad DOS magic, bad PE signature, unsupported optional
    /// header magic, or a short read anywhere along the walk.
    pub fn parse_headers(&self) -> Result<PeHeaders, PeError> {
        headers::parse_core(self.reader, self.base).map(|core| core.headers)
    }

    /// Enumerate the section table (spec.md §4.D "Section enumeration").
    ///
    /// # Errors
    ///
    /// Fails if the header walk fails, or a section header read is short.
    pub fn sections(&self) -> Result<Vec<PeSection>, PeError> {
        let core = headers::parse_core(self.reader, self.base)?;
        sections::read_sections(self.reader, self.base, &core)
    }

    /// Translate an RVA to a file offset via the section table. RVAs
    /// inside the headers region (before any section) pass through
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Fails if no section contains `rva`.
    pub fn rva_to_file_offset(&self, rva: u32) -> Result<u32, PeError> {
        let sections = self.sections()?;
        sections::rva_to_file_offset(&sections, rva)
    }

    /// Walk the Import Directory (spec.md §4.D "Imports").
    ///
    /// # Errors
    ///
    /// Fails if the header walk fails or the image has no import
    /// directory.
    pub fn imports(&self) -> Result<Vec<ImportedFunction>, PeError> {
        let core = headers::parse_core(self.reader, self.base)?;
        imports::read_imports(self.reader, self.base, &core)
    }

    /// Walk the Export Directory (spec.md §4.D "Exports").
    ///
    /// # Errors
    ///
    /// Fails if the header walk fails or the image has no export
    /// directory.
    pub fn exports(&self) -> Result<Vec<ExportedFunction>, PeError> {
        let core = headers::parse_core(self.reader, self.base)?;
        exports::read_exports(self.reader, self.base, &core)
    }

    /// Dump the image (spec.md §4.D "Dump"): the raw in-memory bytes, or,
    /// with `options.unmap_sections`, a reconstructed on-disk file layout.
    ///
    /// # Errors
    ///
    /// Fails if the header walk fails or the image read comes back empty.
    pub fn dump(&self, options: &DumpOptions) -> Result<Vec<u8>, PeError> {
        let core = headers::parse_core(self.reader, self.base)?;
        let sections = sections::read_sections(self.reader, self.base, &core)?;
        dump::dump(self.reader, self.base, &core, &sections, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::{FakeImage, PeBuilder, SectionSpec, CHAR_CODE_EXECUTE_READ};

    #[test]
    fn facade_composes_header_and_section_walk() {
        let bytes = PeBuilder::new()
            .section(SectionSpec {
                name: ".text",
                rva: 0x1000,
                virtual_size: 0x1000,
                characteristics: CHAR_CODE_EXECUTE_READ,
                data: Vec::new(),
            })
            .build();
        let image = FakeImage::new(bytes);
        let pe = PeImage::new(&image, 0);
        let headers = pe.parse_headers().unwrap();
        assert!(headers.is_64bit);
        let sections = pe.sections().unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, ".text");
    }

    #[test]
    fn rejects_non_pe_buffer() {
        let image = FakeImage::new(vec![0u8; 0x100]);
        let pe = PeImage::new(&image, 0);
        assert!(pe.parse_headers().is_err());
    }
}
