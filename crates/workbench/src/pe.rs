//! PE-image delegation (spec.md §4.D via §4.H).

use dma_core::{Address, DmaReader};
use pe_image::{DumpOptions, ExportedFunction, ImportedFunction, PeError, PeHeaders, PeImage, PeSection};

use crate::Workbench;

impl<D: DmaReader + Send + Sync + 'static> Workbench<D> {
    /// # Errors
    ///
    /// See [`PeImage::parse_headers`].
    pub fn pe_headers(&self, base: Address) -> Result<PeHeaders, PeError> {
        self.pe_result(PeImage::new(&self.reader(), base).parse_headers())
    }

    /// # Errors
    ///
    /// See [`PeImage::sections`].
    pub fn pe_sections(&self, base: Address) -> Result<Vec<PeSection>, PeError> {
        self.pe_result(PeImage::new(&self.reader(), base).sections())
    }

    /// # Errors
    ///
    /// See [`PeImage::imports`].
    pub fn pe_imports(&self, base: Address) -> Result<Vec<ImportedFunction>, PeError> {
        self.pe_result(PeImage::new(&self.reader(), base).imports())
    }

    /// # Errors
    ///
    /// See [`PeImage::exports`].
    pub fn pe_exports(&self, base: Address) -> Result<Vec<ExportedFunction>, PeError> {
        self.pe_result(PeImage::new(&self.reader(), base).exports())
    }

    /// # Errors
    ///
    /// See [`PeImage::dump`].
    pub fn pe_dump(&self, base: Address, options: &DumpOptions) -> Result<Vec<u8>, PeError> {
        self.pe_result(PeImage::new(&self.reader(), base).dump(options))
    }

    fn pe_result<T>(&self, result: Result<T, PeError>) -> Result<T, PeError> {
        match &result {
            Ok(_) => self.clear_last_error(),
            Err(e) => self.set_last_error(e.to_string()),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeDma;

    #[test]
    fn pe_headers_surfaces_bad_magic_as_last_error() {
        let wb = Workbench::new(FakeDma::new(1, 0, vec![0u8; 0x100]), 1);
        let result = wb.pe_headers(0);
        assert!(result.is_err());
        assert!(wb.last_error().unwrap().contains("DOS header"));
    }
}
