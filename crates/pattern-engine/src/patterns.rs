//! Common x64 / reversing byte patterns, carried over from the original
//! tool's `namespace patterns` (pure data, no UI dependency — see
//! `SPEC_FULL.md` §4).

/// `call rel32`.
pub const CALL_REL32: &str = "E8 ?? ?? ?? ??";
/// `jmp rel32`.
pub const JMP_REL32: &str = "E9 ?? ?? ?? ??";
/// `lea reg, [rip + disp32]` (REX.W form).
pub const LEA_RIP_REL: &str = "48 8D ?? ?? ?? ?? ??";
/// `mov rax, imm64`.
pub const MOV_RAX_IMM64: &str = "48 B8 ?? ?? ?? ?? ?? ?? ?? ??";
/// `mov rcx, imm64`.
pub const MOV_RCX_IMM64: &str = "48 B9 ?? ?? ?? ?? ?? ?? ?? ??";

/// `push rbp; sub rsp, ...` (a common x64 function prologue).
pub const FUNC_PROLOGUE_1: &str = "40 55 48 83 EC";
/// `mov [rsp+?], rbx; mov [rsp+?], rbp`.
pub const FUNC_PROLOGUE_2: &str = "48 89 5C 24 ?? 48 89 6C";
/// `sub rsp, ?; mov r?, ...`.
pub const FUNC_PROLOGUE_3: &str = "48 83 EC ?? 48 8B";

/// `call qword ptr [IsDebuggerPresent]; test eax, eax; jz`.
pub const ISDEBUGGERPRESENT: &str = "FF 15 ?? ?? ?? ?? 85 C0 74";
/// `mov ecx, 7` — `ProcessDebugPort` as an argument to `NtQueryInformationProcess`.
pub const NTQUERYINFO: &str = "B9 07 00 00 00";
