//! The DMA read contract and the per-process read function subsystems use.

use crate::Address;

/// A live channel onto a target machine's physical memory.
///
/// Mirrors the teacher's `Bus` trait in shape: one method, minimal surface,
/// implemented once for the real backend and any number of times for test
/// fakes. A `DmaReader` may outlive any number of analysis calls; it is
/// process-wide and keyed by pid, not owned by any single analysis.
///
/// `read` may return fewer bytes than requested, or zero bytes, when the
/// target region is unmapped, paged out, or the physical channel dropped.
/// It must never panic and must never block indefinitely (the backend is
/// responsible for its own wall-clock timeout). Callers must treat a short
/// read as "end of trustworthy data from this address", not pad it.
pub trait DmaReader {
    fn read(&self, pid: u32, address: Address, length: usize) -> Vec<u8>;
}

/// The read function every analysis subsystem is actually handed: a
/// `DmaReader` with the process id already bound.
///
/// Subsystems take `R: MemoryReader` as a generic parameter (or, where
/// trait objects are more convenient at the call site, `&dyn MemoryReader`)
/// rather than holding a `DmaReader` + pid pair, so tests can substitute an
/// in-memory fake with no DMA backend at all.
pub trait MemoryReader {
    fn read(&self, address: Address, length: usize) -> Vec<u8>;
}

impl<F: Fn(Address, usize) -> Vec<u8>> MemoryReader for F {
    fn read(&self, address: Address, length: usize) -> Vec<u8> {
        self(address, length)
    }
}

/// Binds a `DmaReader` to one process id, turning it into a `MemoryReader`.
///
/// This is the adapter the orchestrator façade (§4.H) constructs once per
/// active process and hands to every subsystem.
pub struct BoundReader<'a, D: DmaReader + ?Sized> {
    dma: &'a D,
    pid: u32,
}

impl<'a, D: DmaReader + ?Sized> BoundReader<'a, D> {
    pub const fn new(dma: &'a D, pid: u32) -> Self {
        Self { dma, pid }
    }
}

impl<D: DmaReader + ?Sized> MemoryReader for BoundReader<'_, D> {
    fn read(&self, address: Address, length: usize) -> Vec<u8> {
        self.dma.read(self.pid, address, length)
    }
}
