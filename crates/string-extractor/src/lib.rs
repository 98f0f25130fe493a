//! ASCII and UTF-16LE string discovery.
//!
//! [`extract`] runs both passes over a single in-memory buffer and merges
//! the results; [`extract_range`] does the same over a large address range
//! using the same ≤2 MiB chunked-read protocol as `pattern-engine`, with an
//! overlap sized to the configured maximum string length so no string is
//! missed or duplicated across a chunk boundary.

mod ascii;
mod config;
mod decode;
mod range;
mod utf16;

pub use config::Config;
pub use decode::{decode_utf16be, decode_utf8};
pub use range::extract_range;

/// How a string was discovered (`Ascii`/`Utf16Le`) or may be decoded
/// on demand (`Utf8`/`Utf16Be`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringType {
    Ascii,
    Utf16Le,
    Utf16Be,
    Utf8,
}

/// A string discovered in a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundString {
    pub address: u64,
    pub string_type: StringType,
    pub raw_byte_length: usize,
    pub decoded_utf8: String,
}

/// Run the ASCII and UTF-16LE passes over `data` and merge the results:
/// concatenated, sorted by address, then de-duplicated so at most one
/// string per starting address survives.
#[must_use]
pub fn extract(data: &[u8], base_address: u64, config: &Config) -> Vec<FoundString> {
    let mut found = Vec::new();
    if config.scan_ascii {
        found.extend(ascii::extract_ascii(data, base_address, config));
    }
    if config.scan_utf16le {
        found.extend(utf16::extract_utf16le(data, base_address, config));
    }
    found.sort_by_key(|s| s.address);
    found.dedup_by_key(|s| s.address);
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario 2 from spec.md §8.
    #[test]
    fn ascii_minimum_length_and_nul_termination() {
        let data = b"Hi\0Password123\0\x01\x02Secret!\0";
        let config = Config {
            min_chars: 4,
            require_nul_terminator: true,
            ..Config::default()
        };
        let found = extract(data, 0, &config);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].address, 3);
        assert_eq!(found[0].decoded_utf8, "Password123");
        assert_eq!(found[1].address, 17);
        assert_eq!(found[1].decoded_utf8, "Secret!");
    }

    /// Scenario 3 from spec.md §8.
    #[test]
    fn utf16le_extraction() {
        let mut data = vec![0x48, 0x00, 0x65, 0x00, 0x6C, 0x00, 0x6C, 0x00, 0x6F, 0x00];
        data.extend_from_slice(&[0x00, 0x00]);
        let config = Config {
            min_chars: 4,
            scan_ascii: false,
            scan_utf16le: true,
            ..Config::default()
        };
        let found = extract(&data, 0, &config);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].string_type, StringType::Utf16Le);
        assert_eq!(found[0].decoded_utf8, "Hello");
        assert_eq!(found[0].raw_byte_length, 12);
    }

    #[test]
    fn merge_deduplicates_by_start_address() {
        // "AB" repeated is ASCII-printable; force an artificial duplicate
        // start by scanning the same buffer twice via direct calls.
        let data = b"WXYZ";
        let config = Config { min_chars: 4, ..Config::default() };
        let mut found = extract(data, 100, &config);
        found.extend(extract(data, 100, &config));
        found.sort_by_key(|s| s.address);
        found.dedup_by_key(|s| s.address);
        assert_eq!(found.len(), 1);
    }
}
