//! [`Emulator`]: the bridge spec.md §4.G describes, generic over a
//! [`CpuBackend`] (so tests run against [`backend::tests::FakeBackend`]
//! without linking `unicorn-engine`) and a [`MemoryReader`] (so it never
//! holds a DMA session directly, matching every other subsystem here).

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

use dma_core::MemoryReader;

use crate::backend::{CpuBackend, Permissions, StopReason};
use crate::config::EmulatorConfig;
use crate::module_lookup::ModuleLookup;
use crate::registers::{parse_register_name, parse_xmm_index, CpuRegister, Xmm128, GP_REGISTERS};
use crate::result::EmulationResult;

const PAGE_SIZE: u64 = 4096;
/// RFLAGS reset value: only the interrupt-enable flag (bit 9) set.
const RESET_RFLAGS: u64 = 0x202;

fn page_align(address: u64) -> u64 {
    address & !(PAGE_SIZE - 1)
}

/// Drives one emulation session against a single target process, faulting
/// pages in from `reader` on demand (spec.md §4.G).
pub struct Emulator<B: CpuBackend, R: MemoryReader> {
    backend: B,
    reader: R,
    config: EmulatorConfig,
    accessed_pages: RefCell<HashSet<u64>>,
}

impl<B: CpuBackend, R: MemoryReader> Emulator<B, R> {
    /// Creates a fresh backend, maps the stack, and seeds `RSP`/`RBP` at
    /// its midpoint (spec.md §4.G "Initialisation").
    ///
    /// # Errors
    ///
    /// Fails if the backend can't be created or the stack can't be mapped.
    pub fn init(reader: R, config: EmulatorConfig) -> Result<Self, String> {
        let mut backend = B::new()?;
        backend.mem_map(config.stack_base, config.stack_size, Permissions::RW)?;
        let mid = config.stack_base + (config.stack_size as u64) / 2;
        backend.reg_write(CpuRegister::Rsp, mid)?;
        backend.reg_write(CpuRegister::Rbp, mid)?;
        backend.reg_write(CpuRegister::Rflags, RESET_RFLAGS)?;
        Ok(Self { backend, reader, config, accessed_pages: RefCell::new(HashSet::new()) })
    }

    #[must_use]
    pub const fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Every 4 KiB page touched (read, write, or fetch) by a `run`/
    /// `run_instructions` call so far, for introspection.
    #[must_use]
    pub fn accessed_pages(&self) -> Vec<u64> {
        let mut pages: Vec<u64> = self.accessed_pages.borrow().iter().copied().collect();
        pages.sort_unstable();
        pages
    }

    /// Pre-maps `size` bytes starting from the page containing `address`,
    /// reading the target in one shot; a short read is zero-filled rather
    /// than rejected (spec.md §4.G "Map operations"). Mapping an
    /// already-mapped page is a no-op, not an error.
    ///
    /// # Errors
    ///
    /// Only if the backend itself rejects the mapping.
    pub fn map_region(&mut self, address: u64, size: usize) -> Result<(), String> {
        let aligned = page_align(address);
        let pages = ((address - aligned) as usize + size).div_ceil(PAGE_SIZE as usize).max(1);
        let mapped_len = pages * PAGE_SIZE as usize;
        self.backend.mem_map(aligned, mapped_len, Permissions::RWX)?;
        let bytes = self.reader.read(aligned, mapped_len);
        if !bytes.is_empty() {
            self.backend.mem_write(aligned, &bytes)?;
        }
        Ok(())
    }

    /// Resolves `name` through `lookup` and maps its full image
    /// (spec.md §4.G "Map operations").
    ///
    /// # Errors
    ///
    /// Fails if `lookup` doesn't know `name`, or the underlying
    /// `map_region` fails.
    pub fn map_module(&mut self, name: &str, lookup: &dyn ModuleLookup) -> Result<(), String> {
        let module = lookup.resolve(name).ok_or_else(|| format!("module not found: {name}"))?;
        self.map_region(module.base, module.size)
    }

    /// # Errors
    ///
    /// Propagates the backend's write failure, if any.
    pub fn set_register(&mut self, reg: CpuRegister, value: u64) -> Result<(), String> {
        self.backend.reg_write(reg, value)
    }

    #[must_use]
    pub fn get_register(&self, reg: CpuRegister) -> Option<u64> {
        self.backend.reg_read(reg).ok()
    }

    /// # Errors
    ///
    /// Fails if `index > 15` or the backend write fails.
    pub fn set_xmm(&mut self, index: u8, value: Xmm128) -> Result<(), String> {
        if index > 15 {
            return Err(format!("xmm index {index} out of range [0, 15]"));
        }
        self.backend.xmm_write(index, value)
    }

    #[must_use]
    pub fn get_xmm(&self, index: u8) -> Option<Xmm128> {
        if index > 15 {
            return None;
        }
        self.backend.xmm_read(index).ok()
    }

    /// Bulk register setter keyed by lowercase mnemonic (spec.md §4.G
    /// "Register API"): `rax`..`r15`, `rip`, `rflags`, `xmm0`..`xmm15`.
    /// An XMM name sets only the low 64 bits, preserving whatever high
    /// bits were already there (the map's values are plain `u64`; there's
    /// no 128-bit slot for a full XMM write through this path — use
    /// [`Self::set_xmm`] for that).
    ///
    /// # Errors
    ///
    /// Fails on the first unrecognized name, with everything set before
    /// it already applied.
    pub fn set_registers(&mut self, values: &BTreeMap<String, u64>) -> Result<(), String> {
        for (name, &value) in values {
            if let Some(reg) = parse_register_name(name) {
                self.set_register(reg, value)?;
            } else if let Some(index) = parse_xmm_index(name) {
                let high = self.get_xmm(index).unwrap_or_default().high;
                self.set_xmm(index, Xmm128 { low: value, high })?;
            } else {
                return Err(format!("unrecognized register name: {name}"));
            }
        }
        Ok(())
    }

    /// Runs from `start`, stopping when `RIP == end` or on exception
    /// (spec.md §4.G "Execution"). When `lazy_page_fill` is off, the whole
    /// `[start, end)` code region is pre-mapped; when it's on, only the
    /// starting page is, and the rest faults in through
    /// [`Self::map_region`] as execution advances.
    pub fn run(&mut self, start: u64, end: u64) -> EmulationResult {
        if self.config.lazy_page_fill {
            let _ = self.map_region(start, 1);
        } else if end > start {
            let _ = self.map_region(start, (end - start) as usize);
        } else {
            let _ = self.map_region(start, 1);
        }
        self.run_bounded(start, end, self.config.max_instructions)
    }

    /// Runs from `start` for up to `count` instructions, or until an
    /// exception or the configured timeout (spec.md §4.G "Execution").
    /// `until == start` tells the backend to run by instruction budget
    /// alone rather than stopping at a target address.
    pub fn run_instructions(&mut self, start: u64, count: u64) -> EmulationResult {
        if self.config.lazy_page_fill {
            let _ = self.map_region(start, 1);
        }
        self.run_bounded(start, start, count.min(self.config.max_instructions))
    }

    fn run_bounded(&mut self, start: u64, until: u64, max_instructions: u64) -> EmulationResult {
        let lazy = self.config.lazy_page_fill;
        let reader = &self.reader;
        let mut fetch = |page: u64| -> Option<Vec<u8>> {
            if !lazy {
                return None;
            }
            Some(reader.read(page, PAGE_SIZE as usize))
        };
        let accessed = &self.accessed_pages;
        let mut trace = |page: u64| {
            accessed.borrow_mut().insert(page);
        };

        let (stop, executed) =
            self.backend.run(start, until, max_instructions, self.config.timeout_us, &mut fetch, &mut trace);

        // The lazy-fill hook only maps a page inside the backend's own
        // engine; mirror the fill into this side's bookkeeping so a later
        // `accessed_pages` call sees every page the run actually touched.
        if lazy {
            if let Ok(top) = self.backend.reg_read(CpuRegister::Rip) {
                accessed.borrow_mut().insert(page_align(top));
            }
        }

        self.snapshot(stop, executed)
    }

    fn snapshot(&self, stop: StopReason, executed: u64) -> EmulationResult {
        let mut gp = BTreeMap::new();
        for reg in GP_REGISTERS {
            gp.insert(reg, self.backend.reg_read(reg).unwrap_or(0));
        }
        let mut xmm = [Xmm128::default(); 16];
        for (i, slot) in xmm.iter_mut().enumerate() {
            *slot = self.backend.xmm_read(i as u8).unwrap_or_default();
        }
        let final_rip = self.backend.reg_read(CpuRegister::Rip).unwrap_or(0);
        let final_rflags = self.backend.reg_read(CpuRegister::Rflags).unwrap_or(0);

        let (success, error) = match stop {
            StopReason::ReachedEnd | StopReason::InstructionCount => (true, None),
            StopReason::Exception(msg) => (false, Some(msg)),
        };

        EmulationResult {
            success,
            error,
            final_rip,
            final_rflags,
            final_gp_registers: gp,
            final_xmm_registers: xmm,
            instructions_executed: executed,
        }
    }

    /// Zeroes GP/XMM registers and restores the stack pointer and RFLAGS
    /// to their initial values (spec.md §4.G "Reset").
    ///
    /// # Errors
    ///
    /// Propagates a backend register-write failure.
    pub fn reset_cpu(&mut self) -> Result<(), String> {
        for reg in GP_REGISTERS {
            self.backend.reg_write(reg, 0)?;
        }
        for i in 0..16u8 {
            self.backend.xmm_write(i, Xmm128::default())?;
        }
        let mid = self.config.stack_base + (self.config.stack_size as u64) / 2;
        self.backend.reg_write(CpuRegister::Rsp, mid)?;
        self.backend.reg_write(CpuRegister::Rbp, mid)?;
        self.backend.reg_write(CpuRegister::Rflags, RESET_RFLAGS)?;
        Ok(())
    }

    /// [`Self::reset_cpu`] plus tearing down the engine handle and its
    /// mapped-page set, then remapping a fresh stack (spec.md §4.G
    /// "Reset"; this is the "until ... drop" mapped-page lifecycle the
    /// data model describes as `reset_memory`).
    ///
    /// # Errors
    ///
    /// Propagates a backend teardown or remap failure.
    pub fn reset_all(&mut self) -> Result<(), String> {
        self.backend.teardown()?;
        self.accessed_pages.borrow_mut().clear();
        self.backend.mem_map(self.config.stack_base, self.config.stack_size, Permissions::RW)?;
        self.reset_cpu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::FakeBackend;

    struct FakeReader {
        image: std::collections::HashMap<u64, Vec<u8>>,
    }

    impl MemoryReader for FakeReader {
        fn read(&self, address: u64, length: usize) -> Vec<u8> {
            self.image.get(&page_align(address)).map_or_else(Vec::new, |page| page[..length.min(page.len())].to_vec())
        }
    }

    fn reader_with_page(page: u64, fill: u8) -> FakeReader {
        let mut image = std::collections::HashMap::new();
        image.insert(page, vec![fill; PAGE_SIZE as usize]);
        FakeReader { image }
    }

    #[test]
    fn init_maps_stack_and_seeds_pointer_registers() {
        let emu = Emulator::<FakeBackend, _>::init(reader_with_page(0, 0), EmulatorConfig::default()).unwrap();
        let mid = emu.config.stack_base + emu.config.stack_size as u64 / 2;
        assert_eq!(emu.get_register(CpuRegister::Rsp), Some(mid));
        assert_eq!(emu.get_register(CpuRegister::Rbp), Some(mid));
        assert_eq!(emu.get_register(CpuRegister::Rflags), Some(0x202));
    }

    #[test]
    fn map_region_zero_fills_a_short_read() {
        let mut emu =
            Emulator::<FakeBackend, _>::init(FakeReader { image: std::collections::HashMap::new() }, EmulatorConfig::default())
                .unwrap();
        emu.map_region(0x5000, 16).unwrap();
        assert!(emu.backend.is_mapped(0x5000));
    }

    #[test]
    fn register_round_trip() {
        let mut emu = Emulator::<FakeBackend, _>::init(reader_with_page(0, 0), EmulatorConfig::default()).unwrap();
        emu.set_register(CpuRegister::Rax, 0x1234).unwrap();
        assert_eq!(emu.get_register(CpuRegister::Rax), Some(0x1234));
        emu.set_xmm(0, Xmm128 { low: 1, high: 2 }).unwrap();
        assert_eq!(emu.get_xmm(0), Some(Xmm128 { low: 1, high: 2 }));
        assert!(emu.set_xmm(16, Xmm128::default()).is_err());
    }

    #[test]
    fn set_registers_accepts_gp_and_xmm_names() {
        let mut emu = Emulator::<FakeBackend, _>::init(reader_with_page(0, 0), EmulatorConfig::default()).unwrap();
        let mut values = BTreeMap::new();
        values.insert("rax".to_string(), 42);
        values.insert("xmm3".to_string(), 7);
        emu.set_registers(&values).unwrap();
        assert_eq!(emu.get_register(CpuRegister::Rax), Some(42));
        assert_eq!(emu.get_xmm(3).unwrap().low, 7);

        let mut bad = BTreeMap::new();
        bad.insert("not_a_register".to_string(), 0);
        assert!(emu.set_registers(&bad).is_err());
    }

    #[test]
    fn run_reaches_end_and_snapshots_registers() {
        let mut emu = Emulator::<FakeBackend, _>::init(reader_with_page(0, 0), EmulatorConfig::default()).unwrap();
        emu.map_region(0x1000, 0x100).unwrap();
        let result = emu.run(0x1000, 0x1010);
        assert!(result.success);
        assert!(result.error.is_none());
        assert!(result.instructions_executed > 0);
    }

    #[test]
    fn run_instructions_respects_count() {
        let mut emu = Emulator::<FakeBackend, _>::init(reader_with_page(0, 0), EmulatorConfig::default()).unwrap();
        emu.map_region(0x1000, 0x100).unwrap();
        let result = emu.run_instructions(0x1000, 5);
        assert!(result.success);
        assert_eq!(result.instructions_executed, 5);
        assert!(result.instructions_executed <= emu.config.max_instructions);
    }

    #[test]
    fn lazy_fill_maps_unmapped_page_on_access() {
        let mut emu = Emulator::<FakeBackend, _>::init(reader_with_page(0x9000, 0xAA), EmulatorConfig::default()).unwrap();
        // No explicit map_region call; lazy_page_fill pre-maps just the
        // starting page and the run reads through it successfully.
        let result = emu.run_instructions(0x9000, 1);
        assert!(result.success);
        assert!(emu.accessed_pages().contains(&0x9000));
    }

    #[test]
    fn non_lazy_fill_faults_on_unmapped_access() {
        let config = EmulatorConfig { lazy_page_fill: false, ..EmulatorConfig::default() };
        let mut emu = Emulator::<FakeBackend, _>::init(reader_with_page(0, 0), config).unwrap();
        // Nothing pre-mapped at 0x9000 and lazy fill is off: the access must fault.
        let result = emu.run_instructions(0x9000, 1);
        assert!(!result.success);
    }

    #[test]
    fn reset_cpu_clears_registers_and_restores_stack_pointer() {
        let mut emu = Emulator::<FakeBackend, _>::init(reader_with_page(0, 0), EmulatorConfig::default()).unwrap();
        emu.set_register(CpuRegister::Rax, 0xDEAD).unwrap();
        emu.reset_cpu().unwrap();
        assert_eq!(emu.get_register(CpuRegister::Rax), Some(0));
        let mid = emu.config.stack_base + emu.config.stack_size as u64 / 2;
        assert_eq!(emu.get_register(CpuRegister::Rsp), Some(mid));
        assert_eq!(emu.get_register(CpuRegister::Rflags), Some(0x202));
    }

    #[test]
    fn reset_all_clears_mapped_pages() {
        let mut emu = Emulator::<FakeBackend, _>::init(reader_with_page(0, 0), EmulatorConfig::default()).unwrap();
        emu.map_region(0x2000, 0x100).unwrap();
        assert!(emu.backend.is_mapped(0x2000));
        emu.reset_all().unwrap();
        assert!(!emu.backend.is_mapped(0x2000));
        assert!(emu.accessed_pages().is_empty());
    }

    #[test]
    fn map_module_resolves_through_lookup() {
        let mut emu = Emulator::<FakeBackend, _>::init(reader_with_page(0x4000, 0x11), EmulatorConfig::default()).unwrap();
        let lookup = |name: &str| {
            (name == "game.exe").then_some(crate::module_lookup::ModuleInfo { base: 0x4000, size: 0x1000 })
        };
        emu.map_module("game.exe", &lookup).unwrap();
        assert!(emu.backend.is_mapped(0x4000));
        assert!(emu.map_module("missing.dll", &lookup).is_err());
    }
}
