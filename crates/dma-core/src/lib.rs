//! Shared primitives for the DMA-backed analysis crates.
//!
//! Every analysis crate (`pattern-engine`, `string-extractor`, `pe-image`,
//! `rtti-parser`, `memory-watcher`, `cpu-emulator`) is handed a read
//! function rather than a DMA session. This crate defines that contract
//! (`DmaReader`, `MemoryReader`), the value types every subsystem shares
//! (`Address`, `Rva`, `ByteRange`), and the chunked-scan scaffolding
//! (`CancelFlag`, `Progress`, `ScanOutcome`, `DEFAULT_CHUNK_SIZE`) so each
//! subsystem does not reinvent cancellation and progress reporting.

mod address;
mod cancel;
mod progress;
mod reader;
mod scan;

pub use address::{Address, ByteRange, Rva};
pub use cancel::CancelFlag;
pub use progress::Progress;
pub use reader::{BoundReader, DmaReader, MemoryReader};
pub use scan::{ScanOutcome, ScanStatus, DEFAULT_CHUNK_SIZE};
