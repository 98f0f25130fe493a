//! Binds a `DmaReader` plus a process id into an owned `MemoryReader`, so
//! a per-pid subsystem cache (e.g. a `MemoryWatcher`) can hold one past
//! the call that created it (spec.md §4.H).
//!
//! `dma_core::BoundReader` borrows its `DmaReader` for a lifetime tied to
//! one call site; the façade's caches need an owned equivalent instead.

use std::sync::Arc;

use dma_core::{Address, DmaReader, MemoryReader};

pub(crate) struct PidReader<D: DmaReader> {
    dma: Arc<D>,
    pid: u32,
}

impl<D: DmaReader> PidReader<D> {
    pub(crate) const fn new(dma: Arc<D>, pid: u32) -> Self {
        Self { dma, pid }
    }
}

impl<D: DmaReader> MemoryReader for PidReader<D> {
    fn read(&self, address: Address, length: usize) -> Vec<u8> {
        self.dma.read(self.pid, address, length)
    }
}
