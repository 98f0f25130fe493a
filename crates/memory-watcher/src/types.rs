use dma_core::Address;

pub const MIN_WATCH_SIZE: usize = 1;
pub const MAX_WATCH_SIZE: usize = 1024;

/// What a watch is looking for. The hardware channel underneath has no
/// read-trap (§4.A's DMA contract is read-by-polling, not a breakpoint),
/// so `Read` is scanned identically to `Value`/`ReadWrite` today; it is
/// kept as its own variant so a future backend that *can* trap reads has
/// somewhere to plug in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    Read,
    Write,
    ReadWrite,
    Value,
}

/// A watched region of memory and the last bytes observed there.
#[derive(Debug, Clone)]
pub struct WatchRegion {
    pub id: u64,
    pub address: Address,
    pub size: usize,
    pub kind: WatchKind,
    pub name: String,
    pub enabled: bool,
    pub frozen: bool,
    /// Number of changes detected at this region specifically, across the
    /// watcher's lifetime (spec.md §3 `WatchRegion.change_count`).
    pub change_count: u64,
    pub(crate) last_value: Vec<u8>,
}

/// A single detected change at a watched region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryChange {
    pub watch_id: u64,
    pub address: Address,
    pub kind: WatchKind,
    pub old_value: Vec<u8>,
    pub new_value: Vec<u8>,
    /// Monotonically increasing across the watcher's lifetime; stands in
    /// for a wall-clock timestamp without pulling in a time source.
    pub sequence: u64,
    /// The owning region's own `change_count` immediately after this
    /// change was recorded (spec.md §3 `MemoryChange.change_count_after`,
    /// §8 scenario 6).
    pub change_count_after: u64,
}
