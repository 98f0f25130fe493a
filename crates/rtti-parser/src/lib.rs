//! MSVC x64 RTTI recovery (spec.md §4.E): walks a vtable back to its
//! Complete Object Locator, demangles the class name, and follows the
//! Class Hierarchy Descriptor out to base classes.

mod demangle;
mod layout;
mod methods;
mod parse;
mod scan;

pub use demangle::demangle_rtti;
pub use methods::{count_vtable_methods, enumerate_vtable_entries, VTableEntry, DEFAULT_METHOD_CAP};
pub use parse::{parse_from_col, parse_from_vtable};
pub use scan::{scan_module, scan_module_with};

/// A C++ class recovered from RTTI, along with everything gathered while
/// walking there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RttiClass {
    /// Address of the vtable, or `0` if recovered via [`parse_from_col`]
    /// without a known vtable.
    pub vtable_address: u64,
    pub col_address: u64,
    /// The raw `.?A...` mangled Type Descriptor name.
    pub mangled_name: String,
    /// [`demangle_rtti`] applied to `mangled_name`.
    pub demangled_name: String,
    /// The COL's `offset`: this vtable's byte offset within the complete
    /// object, nonzero under multiple inheritance.
    pub vftable_offset: u32,
    pub has_virtual_inheritance: bool,
    pub has_multiple_inheritance: bool,
    /// Number of virtual methods found by walking the vtable's slots.
    pub method_count: u32,
    /// Demangled names of every base class found via the Class Hierarchy
    /// Descriptor, in Base Class Descriptor array order.
    pub base_class_names: Vec<String>,
}

impl RttiClass {
    /// A short flag string summarizing inheritance shape: `"M"` for
    /// multiple inheritance, `"V"` for virtual inheritance, `"MV"` for
    /// both, `""` for neither.
    #[must_use]
    pub fn flags(&self) -> String {
        let mut flags = String::new();
        if self.has_multiple_inheritance {
            flags.push('M');
        }
        if self.has_virtual_inheritance {
            flags.push('V');
        }
        flags
    }

    /// Renders `demangled_name` and `base_class_names` as a single
    /// colon-separated inheritance line, e.g. `"class UI::Widget : class
    /// UI::Drawable, class Base"`.
    #[must_use]
    pub fn hierarchy_string(&self) -> String {
        if self.base_class_names.is_empty() {
            return self.demangled_name.clone();
        }
        format!("{} : {}", self.demangled_name, self.base_class_names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_class() -> RttiClass {
        RttiClass {
            vtable_address: 0x1000,
            col_address: 0x2000,
            mangled_name: ".?AVWidget@UI@@".to_string(),
            demangled_name: "class UI::Widget".to_string(),
            vftable_offset: 0,
            has_virtual_inheritance: true,
            has_multiple_inheritance: true,
            method_count: 3,
            base_class_names: vec!["class UI::Drawable".to_string(), "class Base".to_string()],
        }
    }

    #[test]
    fn flags_combine_in_mv_order() {
        assert_eq!(sample_class().flags(), "MV");
        let mut single = sample_class();
        single.has_multiple_inheritance = false;
        assert_eq!(single.flags(), "V");
        single.has_virtual_inheritance = false;
        assert_eq!(single.flags(), "");
    }

    #[test]
    fn hierarchy_string_lists_bases() {
        assert_eq!(
            sample_class().hierarchy_string(),
            "class UI::Widget : class UI::Drawable, class Base"
        );
    }

    #[test]
    fn hierarchy_string_with_no_bases_is_just_the_name() {
        let mut leaf = sample_class();
        leaf.base_class_names.clear();
        assert_eq!(leaf.hierarchy_string(), "class UI::Widget");
    }
}
