//! Pattern-engine delegation (spec.md §4.B via §4.H).

use dma_core::{Address, ByteRange, CancelFlag, DmaReader, MemoryReader, Progress, ScanOutcome, DEFAULT_CHUNK_SIZE};
use pattern_engine::{scan_multiple, CompiledPattern, FoundMatch, PatternError, DEFAULT_CONTEXT_RADIUS};

use crate::Workbench;

impl<D: DmaReader + Send + Sync + 'static> Workbench<D> {
    /// Compiles `pattern_text` and scans `[address, address + length)` of
    /// the current process for it, returning the matched absolute
    /// addresses. Attaches a last-error string if compilation fails.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if `pattern_text` fails to compile.
    pub fn scan_pattern(
        &self,
        pattern_text: &str,
        address: Address,
        length: usize,
    ) -> Result<Vec<Address>, PatternError> {
        let pattern = CompiledPattern::compile(pattern_text).inspect_err(|e| self.set_last_error(e.to_string()))?;
        let data = self.reader().read(address, length);
        let hits: Vec<_> = pattern_engine::scan_buffer(&data, &pattern, 0).into_iter().map(|off| address + off as u64).collect();
        if hits.is_empty() {
            self.set_last_error("pattern not found");
        } else {
            self.clear_last_error();
        }
        Ok(hits)
    }

    /// Chunked pattern scan across a wider range, cancellable at chunk
    /// boundaries (spec.md §4.B "Range scanning").
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if `pattern_text` fails to compile.
    pub fn scan_pattern_range(
        &self,
        pattern_text: &str,
        range: ByteRange,
        cancel: &CancelFlag,
        progress: Option<&Progress>,
    ) -> Result<ScanOutcome<Address>, PatternError> {
        let pattern = CompiledPattern::compile(pattern_text).inspect_err(|e| self.set_last_error(e.to_string()))?;
        let outcome = pattern_engine::scan_range(&self.reader(), range, &pattern, DEFAULT_CHUNK_SIZE, cancel, progress);
        if outcome.items.is_empty() && !outcome.was_cancelled() {
            self.set_last_error("pattern not found in range");
        } else {
            self.clear_last_error();
        }
        Ok(outcome)
    }

    /// Single-pass multi-pattern scan over a fully read buffer, with a
    /// surrounding-bytes context window per hit (spec.md §4.B "Multi-pattern
    /// scan").
    ///
    /// # Errors
    ///
    /// Returns the first [`PatternError`] hit while compiling `patterns`.
    pub fn scan_patterns(
        &self,
        patterns: &[&str],
        address: Address,
        length: usize,
    ) -> Result<Vec<FoundMatch>, PatternError> {
        let compiled: Vec<CompiledPattern> =
            patterns.iter().map(|text| CompiledPattern::compile(text)).collect::<Result<_, _>>()?;
        let data = self.reader().read(address, length);
        let hits = scan_multiple(&data, &compiled, address, DEFAULT_CONTEXT_RADIUS);
        if hits.is_empty() {
            self.set_last_error("no pattern matched in range");
        } else {
            self.clear_last_error();
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeDma;

    #[test]
    fn scan_pattern_finds_and_translates_hits() {
        let data = vec![0x48, 0x8B, 0x05, 0xAA, 0xBB, 0xCC, 0xDD, 0x90];
        let wb = Workbench::new(FakeDma::new(1, 0x2000, data), 1);
        let hits = wb.scan_pattern("48 8B 05 ?? ?? ?? ??", 0x2000, 8).unwrap();
        assert_eq!(hits, vec![0x2000]);
        assert!(wb.last_error().is_none());
    }

    #[test]
    fn scan_pattern_sets_last_error_on_empty_result() {
        let wb = Workbench::new(FakeDma::new(1, 0, vec![0u8; 8]), 1);
        let hits = wb.scan_pattern("FF FF", 0, 8).unwrap();
        assert!(hits.is_empty());
        assert_eq!(wb.last_error(), Some("pattern not found".to_string()));
    }

    #[test]
    fn scan_pattern_surfaces_compile_error() {
        let wb = Workbench::new(FakeDma::new(1, 0, Vec::new()), 1);
        assert!(wb.scan_pattern("ZZ", 0, 0).is_err());
        assert!(wb.last_error().is_some());
    }
}
