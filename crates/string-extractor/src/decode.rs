//! Decode-only helpers for string types the scanner never produces directly
//! (`StringType::Utf8`, `StringType::Utf16Be`) but callers may still want to
//! interpret a known byte range as.

/// Decode `bytes` as UTF-8, returning `None` if it is not valid UTF-8.
#[must_use]
pub fn decode_utf8(bytes: &[u8]) -> Option<String> {
    std::str::from_utf8(bytes).ok().map(str::to_owned)
}

/// Decode `bytes` as big-endian UTF-16, returning `None` on a trailing odd
/// byte or an invalid code unit sequence.
#[must_use]
pub fn decode_utf16be(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_valid_utf16be() {
        let bytes = [0x00, 0x48, 0x00, 0x69]; // "Hi"
        assert_eq!(decode_utf16be(&bytes).as_deref(), Some("Hi"));
    }

    #[test]
    fn rejects_odd_length_utf16be() {
        assert_eq!(decode_utf16be(&[0x00]), None);
    }

    #[test]
    fn decodes_valid_utf8() {
        assert_eq!(decode_utf8(b"hello").as_deref(), Some("hello"));
    }
}
