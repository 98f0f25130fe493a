//! String-extractor delegation (spec.md §4.C via §4.H).

use dma_core::{Address, ByteRange, CancelFlag, DmaReader, MemoryReader, Progress, ScanOutcome, DEFAULT_CHUNK_SIZE};
use string_extractor::{extract, Config, FoundString};

use crate::Workbench;

impl<D: DmaReader + Send + Sync + 'static> Workbench<D> {
    /// Extracts ASCII/UTF-16LE strings from a single read of
    /// `[address, address + length)` in the current process.
    #[must_use]
    pub fn extract_strings(&self, address: Address, length: usize, config: &Config) -> Vec<FoundString> {
        let data = self.reader().read(address, length);
        let found = extract(&data, address, config);
        if found.is_empty() {
            self.set_last_error("no strings found");
        } else {
            self.clear_last_error();
        }
        found
    }

    /// Chunked string extraction across a wider range, cancellable at
    /// chunk boundaries (spec.md §4.C "Range extraction").
    #[must_use]
    pub fn extract_strings_range(
        &self,
        range: ByteRange,
        config: &Config,
        cancel: &CancelFlag,
        progress: Option<&Progress>,
    ) -> ScanOutcome<FoundString> {
        let outcome = string_extractor::extract_range(&self.reader(), range, config, DEFAULT_CHUNK_SIZE, cancel, progress);
        if outcome.items.is_empty() && !outcome.was_cancelled() {
            self.set_last_error("no strings found in range");
        } else {
            self.clear_last_error();
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeDma;

    #[test]
    fn extract_strings_reads_through_the_bound_process() {
        let data = b"Hi\0Password123\0".to_vec();
        let wb = Workbench::new(FakeDma::new(3, 0x3000, data), 3);
        let found = wb.extract_strings(0x3000, 16, &Config { min_chars: 4, require_nul_terminator: true, ..Config::default() });
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].decoded_utf8, "Password123");
    }

    #[test]
    fn extract_strings_sets_last_error_when_empty() {
        let wb = Workbench::new(FakeDma::new(1, 0, vec![0u8; 8]), 1);
        let found = wb.extract_strings(0, 8, &Config::default());
        assert!(found.is_empty());
        assert_eq!(wb.last_error(), Some("no strings found".to_string()));
    }
}
