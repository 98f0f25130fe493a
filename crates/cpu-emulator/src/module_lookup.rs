//! `map_module`'s collaborator interface (spec.md §4.G "Map operations").
//!
//! Process and module enumeration are explicitly out of scope for this
//! workspace (spec.md §4.A: "process enumeration, module enumeration ...
//! are out of scope here"). `map_module` still needs *some* way to turn a
//! name into a base/size, so it takes that lookup as an injected
//! collaborator rather than reaching for a concrete process-enumeration
//! implementation this crate doesn't own.

/// A loaded module's base address and image size, as resolved by whatever
/// process/module enumeration collaborator the caller has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleInfo {
    pub base: u64,
    pub size: usize,
}

/// Resolves a module name to its base and size. Implemented once by the
/// orchestrator façade (`workbench`) over whatever enumeration channel it
/// has; tests substitute a fixed in-memory map.
pub trait ModuleLookup {
    fn resolve(&self, name: &str) -> Option<ModuleInfo>;
}

impl<F: Fn(&str) -> Option<ModuleInfo>> ModuleLookup for F {
    fn resolve(&self, name: &str) -> Option<ModuleInfo> {
        self(name)
    }
}
