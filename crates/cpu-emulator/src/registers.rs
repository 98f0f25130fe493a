//! The x64 register set the bridge exposes (spec.md §4.G "Register API"):
//! the 16 general-purpose registers, RIP, RFLAGS, and XMM0-15.

/// One addressable general-purpose or control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CpuRegister {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
    Rip,
    Rflags,
}

/// The 16 general-purpose registers snapshotted by an [`crate::EmulationResult`],
/// in the order `set_registers`/the original tool lists them.
pub const GP_REGISTERS: [CpuRegister; 16] = [
    CpuRegister::Rax,
    CpuRegister::Rbx,
    CpuRegister::Rcx,
    CpuRegister::Rdx,
    CpuRegister::Rsi,
    CpuRegister::Rdi,
    CpuRegister::Rbp,
    CpuRegister::Rsp,
    CpuRegister::R8,
    CpuRegister::R9,
    CpuRegister::R10,
    CpuRegister::R11,
    CpuRegister::R12,
    CpuRegister::R13,
    CpuRegister::R14,
    CpuRegister::R15,
];

impl CpuRegister {
    /// Its lowercase mnemonic, as accepted by [`parse_register_name`] and
    /// used as the key type for `set_registers`.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Rax => "rax",
            Self::Rbx => "rbx",
            Self::Rcx => "rcx",
            Self::Rdx => "rdx",
            Self::Rsi => "rsi",
            Self::Rdi => "rdi",
            Self::Rbp => "rbp",
            Self::Rsp => "rsp",
            Self::R8 => "r8",
            Self::R9 => "r9",
            Self::R10 => "r10",
            Self::R11 => "r11",
            Self::R12 => "r12",
            Self::R13 => "r13",
            Self::R14 => "r14",
            Self::R15 => "r15",
            Self::Rip => "rip",
            Self::Rflags => "rflags",
        }
    }
}

/// Parses a lowercase register mnemonic (`"rax"`, `"r12"`, `"rip"`,
/// `"rflags"`). Returns `None` for XMM names and anything unrecognized;
/// XMM registers go through `set_xmm`/`get_xmm`, not this path.
#[must_use]
pub fn parse_register_name(name: &str) -> Option<CpuRegister> {
    Some(match name {
        "rax" => CpuRegister::Rax,
        "rbx" => CpuRegister::Rbx,
        "rcx" => CpuRegister::Rcx,
        "rdx" => CpuRegister::Rdx,
        "rsi" => CpuRegister::Rsi,
        "rdi" => CpuRegister::Rdi,
        "rbp" => CpuRegister::Rbp,
        "rsp" => CpuRegister::Rsp,
        "r8" => CpuRegister::R8,
        "r9" => CpuRegister::R9,
        "r10" => CpuRegister::R10,
        "r11" => CpuRegister::R11,
        "r12" => CpuRegister::R12,
        "r13" => CpuRegister::R13,
        "r14" => CpuRegister::R14,
        "r15" => CpuRegister::R15,
        "rip" => CpuRegister::Rip,
        "rflags" => CpuRegister::Rflags,
        _ => return None,
    })
}

/// Parses an XMM register name (`"xmm0"`..`"xmm15"`) into its index.
#[must_use]
pub fn parse_xmm_index(name: &str) -> Option<u8> {
    let digits = name.strip_prefix("xmm")?;
    let index: u8 = digits.parse().ok()?;
    (index <= 15).then_some(index)
}

/// A 128-bit SSE register, as two 64-bit halves (low-order first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Xmm128 {
    pub low: u64,
    pub high: u64,
}

impl Xmm128 {
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self { low: value as u64, high: (value >> 64) as u64 }
    }

    #[must_use]
    pub const fn to_u128(self) -> u128 {
        (self.high as u128) << 64 | self.low as u128
    }
}
