//! The minimal surface [`crate::Emulator`] needs from an emulation engine
//! (spec.md §4.G), split out behind [`CpuBackend`] so the lazy-page-fill
//! and access-tracking logic the spec actually cares about can be unit
//! tested against [`tests::FakeBackend`] without linking a real CPU
//! emulator.

use crate::registers::{CpuRegister, Xmm128};

/// Requested protection for a mapped region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub exec: bool,
}

impl Permissions {
    pub const RW: Self = Self { read: true, write: true, exec: false };
    pub const RWX: Self = Self { read: true, write: true, exec: true };
}

/// Why a run stopped; carried into `EmulationResult` as `success`/`error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    ReachedEnd,
    InstructionCount,
    Exception(String),
}

/// Called when the guest touches a page the backend hasn't mapped.
/// Returning `Some(bytes)` maps the page read+write+execute and fills it
/// with `bytes` (zero-padded to a page); returning `None` lets the access
/// fault.
pub trait UnmappedAccessHandler: FnMut(u64) -> Option<Vec<u8>> {}
impl<T: FnMut(u64) -> Option<Vec<u8>>> UnmappedAccessHandler for T {}

/// Called on every memory access the backend makes during a run, with the
/// 4KiB-aligned page touched.
pub trait AccessTraceHandler: FnMut(u64) {}
impl<T: FnMut(u64)> AccessTraceHandler for T {}

/// Adapter trait wrapping a concrete emulation engine. [`crate::Emulator`]
/// is generic over this so the bridge logic doesn't depend on any one
/// engine's FFI shape.
pub trait CpuBackend: Sized {
    /// Creates a fresh engine handle with an empty mapped-page set.
    fn new() -> Result<Self, String>;

    fn mem_map(&mut self, address: u64, size: usize, perms: Permissions) -> Result<(), String>;
    fn mem_write(&mut self, address: u64, data: &[u8]) -> Result<(), String>;
    fn mem_read(&self, address: u64, size: usize) -> Result<Vec<u8>, String>;
    fn is_mapped(&self, page_address: u64) -> bool;

    fn reg_write(&mut self, reg: CpuRegister, value: u64) -> Result<(), String>;
    fn reg_read(&self, reg: CpuRegister) -> Result<u64, String>;
    fn xmm_write(&mut self, index: u8, value: Xmm128) -> Result<(), String>;
    fn xmm_read(&self, index: u8) -> Result<Xmm128, String>;

    /// Tears down and recreates the underlying engine handle and its
    /// mapped-page set, as used by `reset_all`.
    fn teardown(&mut self) -> Result<(), String>;

    /// Runs from `start` until `until` (or indefinitely if `until ==
    /// start`, for `run_instructions`), stopping after `max_instructions`
    /// or `timeout_us`, whichever comes first. `on_unmapped` and
    /// `on_access` are wired to the backend's own unmapped-access and
    /// memory-trace hooks for the duration of this call only.
    fn run(
        &mut self,
        start: u64,
        until: u64,
        max_instructions: u64,
        timeout_us: u64,
        on_unmapped: &mut dyn UnmappedAccessHandler,
        on_access: &mut dyn AccessTraceHandler,
    ) -> (StopReason, u64);
}
