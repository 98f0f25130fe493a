//! Orchestrator façade composing the DMA read contract with the pattern,
//! string, PE, RTTI, watcher, and emulator subsystems behind one process
//! handle (spec.md §4.H).
//!
//! [`Workbench`] holds a single live [`DmaReader`] and the currently
//! selected process id. Every operation below binds that pair into a
//! [`MemoryReader`] and delegates to the matching subsystem crate; the
//! façade itself keeps no state beyond the reader, the pid, and a
//! `MemoryWatcher` cache keyed by pid. Concurrency between analyses is
//! left entirely to the caller (spec.md §5 "Scheduling model").

mod emulator;
mod pattern;
mod pe;
mod reader;
mod rtti;
mod strings;
#[cfg(test)]
mod test_support;
mod watcher;

use std::sync::{Arc, Mutex};

use dma_core::{Address, DmaReader, MemoryReader};

use reader::PidReader;

pub use dma_core::{ByteRange, CancelFlag, Progress, ScanOutcome, ScanStatus};
pub use pattern_engine::{CompiledPattern, FoundMatch, PatternError, DEFAULT_CONTEXT_RADIUS};
pub use string_extractor::{Config as StringConfig, FoundString, StringType};
pub use pe_image::{
    DataDirectory, DumpOptions, ExportedFunction, ImportedFunction, PeError, PeHeaders, PeSection,
};
pub use rtti_parser::{RttiClass, VTableEntry};
pub use memory_watcher::{MemoryChange, MemoryWatcher, MemoryWriter, WatchKind, WatchRegion};
pub use cpu_emulator::{CpuRegister, EmulationResult, EmulatorConfig, ModuleInfo, ModuleLookup, UnicornBackend, Xmm128};

/// The façade from spec.md §4.H: one live [`DmaReader`], the process
/// currently selected for analysis, and the subsystem state that needs to
/// persist across calls (today, just the watcher cache).
pub struct Workbench<D: DmaReader + Send + Sync + 'static> {
    dma: Arc<D>,
    pid: Mutex<u32>,
    watchers: watcher::WatcherCache<D>,
    last_error: Mutex<Option<String>>,
}

impl<D: DmaReader + Send + Sync + 'static> Workbench<D> {
    #[must_use]
    pub fn new(dma: D, pid: u32) -> Self {
        Self {
            dma: Arc::new(dma),
            pid: Mutex::new(pid),
            watchers: watcher::WatcherCache::new(),
            last_error: Mutex::new(None),
        }
    }

    /// Switches the process every following operation reads from. Takes
    /// effect immediately; in-flight reads bound to the previous pid are
    /// unaffected.
    pub fn set_process(&self, pid: u32) {
        *self.pid.lock().unwrap() = pid;
    }

    #[must_use]
    pub fn process(&self) -> u32 {
        *self.pid.lock().unwrap()
    }

    /// Reads `length` bytes at `address` from the current process,
    /// short-read semantics unchanged (spec.md §4.A).
    #[must_use]
    pub fn read(&self, address: Address, length: usize) -> Vec<u8> {
        self.reader().read(address, length)
    }

    /// The last diagnostic string attached by an operation that returned
    /// an empty result (spec.md §7 "User-visible failure behavior"), if
    /// any operation has run yet.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    fn set_last_error(&self, message: impl Into<String>) {
        *self.last_error.lock().unwrap() = Some(message.into());
    }

    fn clear_last_error(&self) {
        *self.last_error.lock().unwrap() = None;
    }

    pub(crate) fn reader(&self) -> PidReader<D> {
        PidReader::new(Arc::clone(&self.dma), self.process())
    }
}
