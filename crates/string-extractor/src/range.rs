//! Chunked string extraction over a large address range.

use dma_core::{Address, ByteRange, CancelFlag, MemoryReader, Progress, ScanOutcome, DEFAULT_CHUNK_SIZE};

use crate::config::Config;
use crate::FoundString;

/// Extract strings across `range`, reading in chunks of at most
/// `chunk_size` bytes (further capped at 2 MiB) plus an overlap of
/// `config.max_chars` bytes borrowed from the start of the next chunk, so a
/// string starting near the end of a chunk still decodes in full. Only
/// strings whose start falls in a chunk's primary (non-overlap) region are
/// emitted, so nothing is reported twice.
#[must_use]
pub fn extract_range<R: MemoryReader>(
    reader: &R,
    range: ByteRange,
    config: &Config,
    chunk_size: usize,
    cancel: &CancelFlag,
    progress: Option<&Progress>,
) -> ScanOutcome<FoundString> {
    let chunk_size = chunk_size.min(DEFAULT_CHUNK_SIZE).max(1);
    let overlap = config.max_chars;

    let mut results = Vec::new();
    let mut offset: u64 = 0;

    while offset < range.length {
        if cancel.is_cancelled() {
            return finish_cancelled(results);
        }

        let primary_len = chunk_size.min((range.length - offset) as usize);
        let read_len = primary_len + overlap;
        let chunk_base = range.address + offset;
        let chunk = reader.read(chunk_base, read_len);

        if cancel.is_cancelled() {
            return finish_cancelled(results);
        }

        for found in crate::extract(&chunk, chunk_base, config) {
            if found.address - chunk_base < primary_len as u64 {
                results.push(found);
            }
        }

        offset += primary_len as u64;
        if let Some(p) = progress {
            p.advance();
        }
    }

    finalize(&mut results);
    ScanOutcome::completed(results)
}

fn finish_cancelled(mut results: Vec<FoundString>) -> ScanOutcome<FoundString> {
    finalize(&mut results);
    ScanOutcome::cancelled(results)
}

fn finalize(results: &mut Vec<FoundString>) {
    results.sort_by_key(|s| s.address);
    results.dedup_by_key(|s| s.address);
}
