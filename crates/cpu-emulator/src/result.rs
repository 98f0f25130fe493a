use std::collections::BTreeMap;

use crate::registers::{CpuRegister, Xmm128};

/// A full register snapshot plus outcome, populated regardless of success
/// (spec.md §4.G "Each run ... snapshots all GP registers, RIP, RFLAGS,
/// and XMM0..15 into `EmulationResult.final_*` regardless of
/// success/failure").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulationResult {
    pub success: bool,
    pub error: Option<String>,
    pub final_rip: u64,
    pub final_rflags: u64,
    pub final_gp_registers: BTreeMap<CpuRegister, u64>,
    pub final_xmm_registers: [Xmm128; 16],
    pub instructions_executed: u64,
}
