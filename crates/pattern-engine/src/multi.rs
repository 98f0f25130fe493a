//! Multi-pattern single-pass scan with a surrounding-bytes context window.

use crate::compile::CompiledPattern;

/// Default context window radius, in bytes, either side of a match.
pub const DEFAULT_CONTEXT_RADIUS: usize = 16;

/// A single hit from [`scan_multiple`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundMatch {
    pub address: u64,
    /// Bytes surrounding the match, clamped to the buffer (§9: the exact
    /// clamp at the buffer end is underspecified upstream; this engine
    /// clamps deterministically rather than padding or omitting the hit).
    pub context: Vec<u8>,
}

/// Scan `data` once for every pattern in `patterns`, emitting one
/// [`FoundMatch`] per hit with a `context_radius`-byte window (clamped to
/// the buffer) either side of the match.
#[must_use]
pub fn scan_multiple(
    data: &[u8],
    patterns: &[CompiledPattern],
    base_address: u64,
    context_radius: usize,
) -> Vec<FoundMatch> {
    let Some(min_len) = patterns.iter().map(CompiledPattern::len).min() else {
        return Vec::new();
    };
    if data.len() < min_len {
        return Vec::new();
    }

    let mut out = Vec::new();
    for start in 0..=(data.len() - min_len) {
        for pattern in patterns {
            if start + pattern.len() > data.len() {
                continue;
            }
            if matches_at(data, start, pattern) {
                let ctx_start = start.saturating_sub(context_radius);
                let ctx_end = (start + pattern.len() + context_radius).min(data.len());
                out.push(FoundMatch {
                    address: base_address + start as u64,
                    context: data[ctx_start..ctx_end].to_vec(),
                });
            }
        }
    }
    out
}

fn matches_at(data: &[u8], pos: usize, pattern: &CompiledPattern) -> bool {
    let bytes = pattern.bytes();
    let mask = pattern.mask();
    for k in 0..bytes.len() {
        if mask[k] && data[pos + k] != bytes[k] {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_one_hit_per_pattern_with_clamped_context() {
        let data = [0u8; 4].iter().chain(&[0x90, 0x91]).copied().collect::<Vec<_>>();
        let p1 = CompiledPattern::compile("90").unwrap();
        let hits = scan_multiple(&data, std::slice::from_ref(&p1), 0x1000, 16);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].address, 0x1004);
        // context radius 16 but buffer is only 6 bytes long: clamp, don't pad.
        assert_eq!(hits[0].context, data);
    }

    #[test]
    fn empty_pattern_list_yields_nothing() {
        assert!(scan_multiple(&[1, 2, 3], &[], 0, 4).is_empty());
    }
}
