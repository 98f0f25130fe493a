//! x64 user-mode CPU emulation bridge over a third-party engine
//! (`unicorn-engine`), with pages faulted in lazily from a target process
//! on access (spec.md §4.G).
//!
//! [`Emulator`] is generic over [`CpuBackend`] so the lazy-fill, register,
//! and reset logic this spec actually cares about is unit-tested against
//! an in-memory fake backend (`backend::tests::FakeBackend`) with no
//! dependency on the real emulator; [`UnicornBackend`] is the production
//! implementation used by the orchestrator façade.

mod backend;
mod config;
mod emulator;
mod module_lookup;
mod registers;
mod result;
mod unicorn_backend;

pub use backend::{AccessTraceHandler, CpuBackend, Permissions, StopReason, UnmappedAccessHandler};
pub use config::EmulatorConfig;
pub use emulator::Emulator;
pub use module_lookup::{ModuleInfo, ModuleLookup};
pub use registers::{parse_register_name, parse_xmm_index, CpuRegister, Xmm128, GP_REGISTERS};
pub use result::EmulationResult;
pub use unicorn_backend::UnicornBackend;
