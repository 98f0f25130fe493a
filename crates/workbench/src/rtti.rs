//! RTTI-parser delegation (spec.md §4.E via §4.H).

use dma_core::{Address, DmaReader};
use rtti_parser::{parse_from_col, parse_from_vtable, scan_module, RttiClass};

use crate::Workbench;

impl<D: DmaReader + Send + Sync + 'static> Workbench<D> {
    /// Recovers a class by walking back from a vtable address (spec.md
    /// §4.E "Parsing from a vtable").
    #[must_use]
    pub fn rtti_from_vtable(&self, vtable_address: Address, module_base: Address) -> Option<RttiClass> {
        let class = parse_from_vtable(&self.reader(), vtable_address, module_base);
        self.rtti_result(class.as_ref())
    }

    /// Recovers a class directly from a known Complete Object Locator
    /// address (spec.md §4.E "Parsing from a COL").
    #[must_use]
    pub fn rtti_from_col(&self, col_address: Address, module_base: Address) -> Option<RttiClass> {
        let class = parse_from_col(&self.reader(), col_address, module_base);
        self.rtti_result(class.as_ref())
    }

    /// Scans every qualifying section of a module for recoverable classes
    /// (spec.md §4.E "Scanning a module").
    #[must_use]
    pub fn rtti_scan_module(&self, module_base: Address) -> Vec<RttiClass> {
        let classes = scan_module(&self.reader(), module_base);
        if classes.is_empty() {
            self.set_last_error("no RTTI classes found in module");
        } else {
            self.clear_last_error();
        }
        classes
    }

    fn rtti_result(&self, class: Option<&RttiClass>) -> Option<RttiClass> {
        if class.is_none() {
            self.set_last_error("no RTTI chain found at that address");
        } else {
            self.clear_last_error();
        }
        class.cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeDma;

    #[test]
    fn rtti_from_vtable_sets_last_error_when_absent() {
        let wb = Workbench::new(FakeDma::new(1, 0, vec![0u8; 64]), 1);
        assert!(wb.rtti_from_vtable(32, 0).is_none());
        assert_eq!(wb.last_error(), Some("no RTTI chain found at that address".to_string()));
    }
}
