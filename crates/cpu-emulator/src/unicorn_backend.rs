//! [`CpuBackend`] implemented on top of the `unicorn-engine` crate.
//!
//! `unicorn-engine`'s hook closures are bounded `'static`, but
//! `CpuBackend::run`'s `on_unmapped`/`on_access` callbacks borrow from the
//! calling `Emulator` for the duration of a single `run` call only. The
//! hooks are installed immediately before `emu_start` and removed right
//! after, so the borrow never actually outlives the call; the lifetime
//! extension below just tells the compiler what's already true.

use std::cell::RefCell;

use unicorn_engine::unicorn_const::{Arch, HookType, MemType, Mode, Permission};
use unicorn_engine::{RegisterX86, Unicorn};

use crate::backend::{AccessTraceHandler, CpuBackend, Permissions, StopReason, UnmappedAccessHandler};
use crate::registers::{CpuRegister, Xmm128};

const PAGE_SIZE: u64 = 4096;

fn page_align(address: u64) -> u64 {
    address & !(PAGE_SIZE - 1)
}

fn to_uc_permission(perms: Permissions) -> Permission {
    let mut p = Permission::NONE;
    if perms.read {
        p |= Permission::READ;
    }
    if perms.write {
        p |= Permission::WRITE;
    }
    if perms.exec {
        p |= Permission::EXEC;
    }
    p
}

fn to_uc_register(reg: CpuRegister) -> RegisterX86 {
    match reg {
        CpuRegister::Rax => RegisterX86::RAX,
        CpuRegister::Rbx => RegisterX86::RBX,
        CpuRegister::Rcx => RegisterX86::RCX,
        CpuRegister::Rdx => RegisterX86::RDX,
        CpuRegister::Rsi => RegisterX86::RSI,
        CpuRegister::Rdi => RegisterX86::RDI,
        CpuRegister::Rbp => RegisterX86::RBP,
        CpuRegister::Rsp => RegisterX86::RSP,
        CpuRegister::R8 => RegisterX86::R8,
        CpuRegister::R9 => RegisterX86::R9,
        CpuRegister::R10 => RegisterX86::R10,
        CpuRegister::R11 => RegisterX86::R11,
        CpuRegister::R12 => RegisterX86::R12,
        CpuRegister::R13 => RegisterX86::R13,
        CpuRegister::R14 => RegisterX86::R14,
        CpuRegister::R15 => RegisterX86::R15,
        CpuRegister::Rip => RegisterX86::RIP,
        CpuRegister::Rflags => RegisterX86::RFLAGS,
    }
}

fn to_uc_xmm_register(index: u8) -> RegisterX86 {
    match index {
        0 => RegisterX86::XMM0,
        1 => RegisterX86::XMM1,
        2 => RegisterX86::XMM2,
        3 => RegisterX86::XMM3,
        4 => RegisterX86::XMM4,
        5 => RegisterX86::XMM5,
        6 => RegisterX86::XMM6,
        7 => RegisterX86::XMM7,
        8 => RegisterX86::XMM8,
        9 => RegisterX86::XMM9,
        10 => RegisterX86::XMM10,
        11 => RegisterX86::XMM11,
        12 => RegisterX86::XMM12,
        13 => RegisterX86::XMM13,
        14 => RegisterX86::XMM14,
        15 => RegisterX86::XMM15,
        _ => unreachable!("xmm index validated to [0, 15] by caller"),
    }
}

pub struct UnicornBackend {
    uc: Unicorn<'static, ()>,
    mapped_pages: RefCell<std::collections::HashSet<u64>>,
}

impl UnicornBackend {
    pub fn new() -> Result<Self, String> {
        let uc = Unicorn::new(Arch::X86, Mode::MODE_64).map_err(|e| format!("unicorn init failed: {e:?}"))?;
        Ok(Self { uc, mapped_pages: RefCell::new(std::collections::HashSet::new()) })
    }
}

impl CpuBackend for UnicornBackend {
    fn new() -> Result<Self, String> {
        Self::new()
    }

    fn mem_map(&mut self, address: u64, size: usize, perms: Permissions) -> Result<(), String> {
        let aligned = page_align(address);
        let pages = size.div_ceil(PAGE_SIZE as usize).max(1);
        if self.mapped_pages.borrow().contains(&aligned) {
            return Ok(());
        }
        self.uc
            .mem_map(aligned, pages * PAGE_SIZE as usize, to_uc_permission(perms))
            .map_err(|e| format!("mem_map failed at {aligned:#x}: {e:?}"))?;
        for i in 0..pages as u64 {
            self.mapped_pages.borrow_mut().insert(aligned + i * PAGE_SIZE);
        }
        Ok(())
    }

    fn mem_write(&mut self, address: u64, data: &[u8]) -> Result<(), String> {
        self.uc.mem_write(address, data).map_err(|e| format!("mem_write failed at {address:#x}: {e:?}"))
    }

    fn mem_read(&self, address: u64, size: usize) -> Result<Vec<u8>, String> {
        let mut buf = vec![0u8; size];
        self.uc
            .mem_read(address, &mut buf)
            .map_err(|e| format!("mem_read failed at {address:#x}: {e:?}"))?;
        Ok(buf)
    }

    fn is_mapped(&self, page_address: u64) -> bool {
        self.mapped_pages.borrow().contains(&page_align(page_address))
    }

    fn reg_write(&mut self, reg: CpuRegister, value: u64) -> Result<(), String> {
        self.uc.reg_write(to_uc_register(reg), value).map_err(|e| format!("reg_write {reg:?} failed: {e:?}"))
    }

    fn reg_read(&self, reg: CpuRegister) -> Result<u64, String> {
        self.uc.reg_read(to_uc_register(reg)).map_err(|e| format!("reg_read {reg:?} failed: {e:?}"))
    }

    fn xmm_write(&mut self, index: u8, value: Xmm128) -> Result<(), String> {
        self.uc
            .reg_write_long(to_uc_xmm_register(index), value.to_u128())
            .map_err(|e| format!("xmm_write {index} failed: {e:?}"))
    }

    fn xmm_read(&self, index: u8) -> Result<Xmm128, String> {
        self.uc
            .reg_read_long(to_uc_xmm_register(index))
            .map(Xmm128::from_u128)
            .map_err(|e| format!("xmm_read {index} failed: {e:?}"))
    }

    fn teardown(&mut self) -> Result<(), String> {
        self.uc = Unicorn::new(Arch::X86, Mode::MODE_64).map_err(|e| format!("unicorn re-init failed: {e:?}"))?;
        self.mapped_pages.borrow_mut().clear();
        Ok(())
    }

    fn run(
        &mut self,
        start: u64,
        until: u64,
        max_instructions: u64,
        timeout_us: u64,
        on_unmapped: &mut dyn UnmappedAccessHandler,
        on_access: &mut dyn AccessTraceHandler,
    ) -> (StopReason, u64) {
        // SAFETY: both hooks are installed here and removed before this
        // function returns, so the 'static bound `add_mem_hook` requires
        // never outlives the actual borrow of `on_unmapped`/`on_access`.
        let unmapped_static: &'static mut dyn UnmappedAccessHandler =
            unsafe { std::mem::transmute(on_unmapped) };
        let access_static: &'static mut dyn AccessTraceHandler = unsafe { std::mem::transmute(on_access) };

        let instruction_count = std::rc::Rc::new(std::cell::Cell::new(0u64));
        let instruction_count_hook = std::rc::Rc::clone(&instruction_count);

        let code_hook = self.uc.add_code_hook(1, 0, move |_uc: &mut Unicorn<'_, ()>, _address: u64, _size: u32| {
            instruction_count_hook.set(instruction_count_hook.get() + 1);
        });

        let unmapped_hook = self.uc.add_mem_hook(
            HookType::MEM_UNMAPPED,
            1,
            0,
            move |uc: &mut Unicorn<'_, ()>, _mem_type: MemType, address: u64, size: usize, _value: i64| {
                let page = page_align(address);
                if let Some(bytes) = unmapped_static(page) {
                    let mut buf = vec![0u8; PAGE_SIZE as usize];
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if uc.mem_map(page, PAGE_SIZE as usize, Permission::ALL).is_err() {
                        return false;
                    }
                    if uc.mem_write(page, &buf).is_err() {
                        return false;
                    }
                    let _ = size;
                    true
                } else {
                    false
                }
            },
        );

        let access_hook = self.uc.add_mem_hook(
            HookType::MEM_READ | HookType::MEM_WRITE,
            1,
            0,
            move |_uc: &mut Unicorn<'_, ()>, _mem_type: MemType, address: u64, _size: usize, _value: i64| {
                access_static(page_align(address));
            },
        );

        let result = self.uc.emu_start(start, until, timeout_us, max_instructions as usize);

        if let Ok(hook) = code_hook {
            let _ = self.uc.remove_hook(hook);
        }
        if let Ok(hook) = unmapped_hook {
            let _ = self.uc.remove_hook(hook);
        }
        if let Ok(hook) = access_hook {
            let _ = self.uc.remove_hook(hook);
        }

        let executed = instruction_count.get();
        match result {
            Ok(()) => (StopReason::ReachedEnd, executed),
            Err(e) => (StopReason::Exception(format!("{e:?}")), executed),
        }
    }
}
