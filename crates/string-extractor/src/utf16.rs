//! UTF-16LE printable-run extraction.

use crate::config::{is_utf16_printable, Config};
use crate::{FoundString, StringType};

pub(crate) fn extract_utf16le(data: &[u8], base: u64, config: &Config) -> Vec<FoundString> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i + 1 < data.len() {
        let unit = u16::from_le_bytes([data[i], data[i + 1]]);
        if is_utf16_printable(unit) {
            let start = i;
            let mut j = i;
            let mut count = 0usize;
            while j + 1 < data.len() && count < config.max_chars {
                let u = u16::from_le_bytes([data[j], data[j + 1]]);
                if !is_utf16_printable(u) {
                    break;
                }
                j += 2;
                count += 1;
            }
            let terminated = j + 1 < data.len() && data[j] == 0 && data[j + 1] == 0;
            let accept = count >= config.min_chars
                && (!config.require_nul_terminator || terminated);
            if accept {
                let units: Vec<u16> = data[start..j]
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                let decoded = String::from_utf16(&units).unwrap_or_default();
                let mut raw_len = j - start;
                if terminated {
                    raw_len += 2;
                }
                out.push(FoundString {
                    address: base + start as u64,
                    string_type: StringType::Utf16Le,
                    raw_byte_length: raw_len,
                    decoded_utf8: decoded,
                });
            }
            i = j;
        } else {
            i += 2;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_without_terminator_is_not_consumed_twice() {
        let mut data = Vec::new();
        for c in "Hi!!".encode_utf16() {
            data.extend_from_slice(&c.to_le_bytes());
        }
        let config = Config { min_chars: 2, require_nul_terminator: false, ..Config::default() };
        let found = extract_utf16le(&data, 0, &config);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].decoded_utf8, "Hi!!");
        assert_eq!(found[0].raw_byte_length, 8);
    }

    #[test]
    fn require_nul_terminator_rejects_unterminated_run() {
        let mut data = Vec::new();
        for c in "test".encode_utf16() {
            data.extend_from_slice(&c.to_le_bytes());
        }
        let config = Config { min_chars: 2, require_nul_terminator: true, ..Config::default() };
        assert!(extract_utf16le(&data, 0, &config).is_empty());
    }
}
