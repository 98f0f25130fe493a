//! Chunked scan over a module-sized address range.

use dma_core::{Address, ByteRange, CancelFlag, MemoryReader, Progress, ScanOutcome, DEFAULT_CHUNK_SIZE};

use crate::compile::CompiledPattern;
use crate::match_positions;

/// Scan `range` for `pattern`, reading in chunks of at most `chunk_size`
/// bytes rather than the whole range at once.
///
/// Matches that straddle a chunk boundary are caught by carrying the last
/// `len(pattern) - 1` bytes of each chunk and re-scanning the concatenation
/// of that tail with the head of the next chunk, counting only matches that
/// start in the carried tail (the chunk-proper scan already covers matches
/// starting later). A short or empty read from `reader` is tolerated: the
/// scan advances past that chunk with an empty carried tail and continues.
///
/// Results are de-duplicated and sorted by address. `cancel` is observed
/// before each chunk read and each chunk scan; on cancellation the matches
/// found so far are returned with [`ScanOutcome::was_cancelled`] set.
#[must_use]
pub fn scan_range<R: MemoryReader>(
    reader: &R,
    range: ByteRange,
    pattern: &CompiledPattern,
    chunk_size: usize,
    cancel: &CancelFlag,
    progress: Option<&Progress>,
) -> ScanOutcome<Address> {
    let plen = pattern.len().max(1);
    let chunk_size = chunk_size.min(DEFAULT_CHUNK_SIZE).max(plen);

    let mut matches = Vec::new();
    let mut prev_tail: Vec<u8> = Vec::new();
    let mut offset: u64 = 0;

    while offset < range.length {
        if cancel.is_cancelled() {
            return finish_cancelled(matches);
        }

        let remaining = range.length - offset;
        let this_len = chunk_size.min(remaining as usize);
        let chunk = reader.read(range.address + offset, this_len);

        if cancel.is_cancelled() {
            return finish_cancelled(matches);
        }

        if !prev_tail.is_empty() && plen > 1 && !chunk.is_empty() {
            let head_len = (plen - 1).min(chunk.len());
            let mut boundary = prev_tail.clone();
            boundary.extend_from_slice(&chunk[..head_len]);
            for start in match_positions(&boundary, pattern) {
                if start < prev_tail.len() {
                    let abs = range.address + offset - prev_tail.len() as u64 + start as u64;
                    matches.push(abs);
                }
            }
        }

        for start in match_positions(&chunk, pattern) {
            matches.push(range.address + offset + start as u64);
        }

        // A short read (chunk.len() < this_len) leaves a gap of unread
        // bytes between this chunk and the next one we'll request; the
        // carried tail's absolute address math assumes no such gap, so any
        // short read — not just a fully empty one — must drop the tail.
        prev_tail = if chunk.len() < this_len {
            Vec::new()
        } else {
            let tail_len = plen.saturating_sub(1).min(chunk.len());
            chunk[chunk.len() - tail_len..].to_vec()
        };

        offset += this_len as u64;
        if let Some(p) = progress {
            p.advance();
        }
    }

    matches.sort_unstable();
    matches.dedup();
    ScanOutcome::completed(matches)
}

fn finish_cancelled(mut matches: Vec<Address>) -> ScanOutcome<Address> {
    matches.sort_unstable();
    matches.dedup();
    ScanOutcome::cancelled(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dma_core::DmaReader;

    struct FakeDma {
        image: Vec<u8>,
    }

    impl DmaReader for FakeDma {
        fn read(&self, _pid: u32, address: Address, length: usize) -> Vec<u8> {
            let offset = address as usize;
            if offset >= self.image.len() {
                return Vec::new();
            }
            let end = (offset + length).min(self.image.len());
            self.image[offset..end].to_vec()
        }
    }

    /// Scenario 1 from spec.md §8: 2 MiB of 0x90 followed by a seven-byte
    /// needle, followed by more 0x90, scanned in 1 MiB chunks. The needle
    /// straddles the chunk boundary at exactly 2 MiB.
    #[test]
    fn finds_match_straddling_chunk_boundary() {
        let mut image = vec![0x90u8; 2 * 1024 * 1024];
        image.extend_from_slice(&[0x48, 0x8B, 0x05, 0xAA, 0xBB, 0xCC, 0xDD]);
        image.extend(vec![0x90u8; 4096]);

        let dma = FakeDma { image: image.clone() };
        let pattern = CompiledPattern::compile("48 8B 05 ?? ?? ?? ??").unwrap();
        let reader = dma_core::BoundReader::new(&dma, 1);
        let range = ByteRange::new(0, image.len() as u64);
        let cancel = CancelFlag::new();

        let outcome = scan_range(&reader, range, &pattern, 1024 * 1024, &cancel, None);
        assert!(!outcome.was_cancelled());
        assert_eq!(outcome.items, vec![2 * 1024 * 1024]);
    }

    #[test]
    fn matches_independent_of_chunk_size() {
        let mut image = vec![0u8; 10];
        image[3] = 0xDE;
        image[4] = 0xAD;
        let dma = FakeDma { image };
        let pattern = CompiledPattern::compile("DE AD").unwrap();
        let reader = dma_core::BoundReader::new(&dma, 1);
        let cancel = CancelFlag::new();

        for chunk_size in [2usize, 3, 4, 100] {
            let out = scan_range(&reader, ByteRange::new(0, 10), &pattern, chunk_size, &cancel, None);
            assert_eq!(out.items, vec![3], "chunk_size={chunk_size}");
        }
    }

    #[test]
    fn short_reads_are_tolerated_and_advance() {
        struct FlakyDma;
        impl DmaReader for FlakyDma {
            fn read(&self, _pid: u32, _address: Address, _length: usize) -> Vec<u8> {
                Vec::new()
            }
        }
        let dma = FlakyDma;
        let reader = dma_core::BoundReader::new(&dma, 1);
        let pattern = CompiledPattern::compile("FF FF").unwrap();
        let cancel = CancelFlag::new();
        let out = scan_range(&reader, ByteRange::new(0, 1024), &pattern, 256, &cancel, None);
        assert!(out.items.is_empty());
        assert!(!out.was_cancelled());
    }

    #[test]
    fn partial_short_read_drops_carried_tail_instead_of_misplacing_boundary_matches() {
        // A DMA that only ever returns half of what's asked for, simulating
        // a region that goes partly unmapped mid-chunk: every read is
        // short, never empty.
        struct HalfDma {
            image: Vec<u8>,
        }
        impl DmaReader for HalfDma {
            fn read(&self, _pid: u32, address: Address, length: usize) -> Vec<u8> {
                let offset = address as usize;
                if offset >= self.image.len() {
                    return Vec::new();
                }
                let short_len = (length / 2).max(1);
                let end = (offset + short_len).min(self.image.len());
                self.image[offset..end].to_vec()
            }
        }

        // image[7] ends chunk 0's short read (offset 0, 8 of 16 bytes
        // returned) and image[16] starts chunk 1's short read (offset 16).
        // Carrying chunk 0's last byte as a boundary tail into chunk 1
        // would splice these two physically non-adjacent bytes together
        // and report a match at the fabricated address 15, even though
        // bytes 8..16 were never read from the target at all.
        let mut image = vec![0u8; 32];
        image[7] = 0xDE;
        image[16] = 0xAD;
        let dma = HalfDma { image };
        let reader = dma_core::BoundReader::new(&dma, 1);
        let pattern = CompiledPattern::compile("DE AD").unwrap();
        let cancel = CancelFlag::new();

        let out = scan_range(&reader, ByteRange::new(0, 32), &pattern, 16, &cancel, None);
        assert!(!out.items.contains(&15), "spurious boundary match across an unread gap: {:?}", out.items);
    }

    #[test]
    fn cancellation_returns_partial_results() {
        let mut image = vec![0u8; 4096];
        image[10] = 0xAA;
        image[2000] = 0xAA;
        let dma = FakeDma { image };
        let reader = dma_core::BoundReader::new(&dma, 1);
        let pattern = CompiledPattern::compile("AA").unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let out = scan_range(&reader, ByteRange::new(0, 4096), &pattern, 256, &cancel, None);
        assert!(out.was_cancelled());
        assert!(out.items.is_empty());
    }
}
