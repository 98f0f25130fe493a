//! ASCII printable-run extraction.

use crate::config::{is_ascii_printable, Config};
use crate::{FoundString, StringType};

pub(crate) fn extract_ascii(data: &[u8], base: u64, config: &Config) -> Vec<FoundString> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        if is_ascii_printable(data[i]) {
            let start = i;
            let mut j = i;
            while j < data.len() && is_ascii_printable(data[j]) && (j - start) < config.max_chars {
                j += 1;
            }
            let run_len = j - start;
            let terminated_by_nul = j < data.len() && data[j] == 0;
            let accept = run_len >= config.min_chars
                && (!config.require_nul_terminator || terminated_by_nul);
            if accept {
                let decoded = String::from_utf8(data[start..j].to_vec()).unwrap_or_default();
                out.push(FoundString {
                    address: base + start as u64,
                    string_type: StringType::Ascii,
                    raw_byte_length: run_len,
                    decoded_utf8: decoded,
                });
            }
            i = j;
        } else {
            i += 1;
        }
    }
    out
}
