//! Tunables for one emulation session (spec.md §4.G "Initialisation").

const DEFAULT_STACK_BASE: u64 = 0x8000_0000;
const DEFAULT_STACK_SIZE: usize = 0x20_0000;
const DEFAULT_MAX_INSTRUCTIONS: u64 = 100_000;
const DEFAULT_TIMEOUT_US: u64 = 5_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmulatorConfig {
    /// Base address of the emulated stack.
    pub stack_base: u64,
    /// Size in bytes of the mapped stack region.
    pub stack_size: usize,
    /// Hard cap on instructions executed by a single `run`/`run_instructions`.
    pub max_instructions: u64,
    /// Hard cap on wall-clock microseconds for a single run.
    pub timeout_us: u64,
    /// When set, an access to an unmapped page reads it in from the DMA
    /// backend and maps it lazily instead of the access faulting.
    pub lazy_page_fill: bool,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            stack_base: DEFAULT_STACK_BASE,
            stack_size: DEFAULT_STACK_SIZE,
            max_instructions: DEFAULT_MAX_INSTRUCTIONS,
            timeout_us: DEFAULT_TIMEOUT_US,
            lazy_page_fill: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = EmulatorConfig::default();
        assert_eq!(config.stack_base, 0x8000_0000);
        assert_eq!(config.stack_size, 0x20_0000);
        assert_eq!(config.max_instructions, 100_000);
        assert_eq!(config.timeout_us, 5_000_000);
        assert!(config.lazy_page_fill);
    }
}
