//! Demangles the RTTI form of an MSVC Type Descriptor name
//! (`.?A[VUTW]<name>@<namespace>@@`) into a C++-ish display string
//! (spec.md §4.E "Demangling"). This only understands the RTTI form, not
//! general MSVC name mangling.

/// `.?AV` = class, `.?AU` = struct, `.?AT` = union, `.?AW` = enum.
pub fn demangle_rtti(mangled: &str) -> String {
    let bytes = mangled.as_bytes();
    if bytes.len() < 4 || &mangled[..3] != ".?A" {
        return mangled.to_string();
    }
    let prefix = match bytes[3] {
        b'V' => "class ",
        b'U' => "struct ",
        b'T' => "union ",
        b'W' => "enum ",
        _ => return mangled.to_string(),
    };

    let rest = &mangled[4..];
    let mut segments: Vec<&str> = rest.split('@').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return mangled.to_string();
    }
    segments.reverse();
    format!("{prefix}{}", segments.join("::"))
}
