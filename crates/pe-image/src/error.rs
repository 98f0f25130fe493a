//! Parse failures. Every structural violation is rejected locally with a
//! human-readable reason rather than panicking (spec.md §7).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeError {
    TooShort(&'static str),
    BadDosMagic,
    BadPeSignature,
    BadOptionalMagic(u16),
    SectionNotFound(u32),
    DirectoryMissing(&'static str),
}

impl fmt::Display for PeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort(what) => write!(f, "DMA read failed reading {what}"),
            Self::BadDosMagic => write!(f, "invalid DOS header (expected 'MZ')"),
            Self::BadPeSignature => write!(f, "invalid PE signature (expected 'PE\\0\\0')"),
            Self::BadOptionalMagic(m) => {
                write!(f, "unsupported optional header magic {m:#06X} (expected 0x10B or 0x20B)")
            }
            Self::SectionNotFound(rva) => write!(f, "RVA {rva:#010X} not present in any section"),
            Self::DirectoryMissing(which) => write!(f, "{which} directory not present"),
        }
    }
}

impl std::error::Error for PeError {}
