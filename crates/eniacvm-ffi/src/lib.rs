//! C ABI shim exposing [`eniacvm_core::Vm`] and [`eniacvm_host`]'s
//! checkpoint bridge to the outer ENIAC simulator.
//!
//! `vm.h`'s comment that "eniacsim... treats `VM*` as opaque" is taken at
//! face value: the host never reads [`CVm`]'s fields itself, it only
//! holds the pointer [`vm_new`] returns and passes it back into
//! [`vm_step`]/[`vm_step_to`]/[`vm_import`]/[`vm_export`]. [`CVm`] still
//! honors spec.md §6's declared field order, since a debugger or a future
//! caller that *does* peek at the layout should find exactly what the
//! contract promises.
//!
//! `ENIAC`, by contrast, is a struct the host constructs and reads
//! directly (`eniacsim` "copies the definition of struct ENIAC"), so
//! [`CEniac`] mirrors `vm.h`'s byte layout precisely, including the
//! C string's trailing NUL.
//!
//! This is the one crate in the workspace where `unsafe` is necessary —
//! every exported function dereferences a raw pointer the host supplies.
//! `#![allow(unsafe_code)]` overrides the workspace's blanket
//! `unsafe_code = "deny"` lint locally, the way any teacher crate needing
//! `unsafe` would scope the override rather than relax it workspace-wide.

#![allow(unsafe_code)]
#![warn(missing_docs)]

use log::warn;

use eniacvm_core::{ErrorFlags, InstructionRegister, LoadStore, RegisterFile, Status, Vm};
use eniacvm_host::Eniac;

/// The C-compatible mirror of `vm.h`'s `VM` struct. Field order matches
/// spec.md §6's layout contract exactly: `cycles, status, error, pc,
/// old_pc, ir[6], ir_index, a, b, c, d, e, f, g, h, i, j, mem[15][5],
/// function_table[400][6], ft_initialized, profile[400][7]`.
///
/// `function_table` and `profile` are sized `400`, not `300`, and indexed
/// directly by `pc` — rows `0..100` are unused padding, matching the
/// original layout rather than `eniacvm-core`'s internal `pc - 100`
/// indexing.
#[repr(C)]
pub struct CVm {
    /// Monotonic cycle counter.
    pub cycles: u64,
    /// [`Status`] bits, widened to a plain `int`-sized field for the ABI.
    pub status: i32,
    /// [`ErrorFlags`] bits, widened to a plain `int`-sized field.
    pub error: i32,
    /// Program counter.
    pub pc: i32,
    /// Saved return address.
    pub old_pc: i32,
    /// Raw instruction-register slot contents.
    pub ir: [i32; 6],
    /// Instruction-register read position, `0..=6`.
    pub ir_index: i32,
    /// Register `A`.
    pub a: i32,
    /// Register `B`.
    pub b: i32,
    /// Register `C`.
    pub c: i32,
    /// Register `D`.
    pub d: i32,
    /// Register `E`.
    pub e: i32,
    /// Scratch register `F`.
    pub f: i32,
    /// Scratch register `G`.
    pub g: i32,
    /// Scratch register `H`.
    pub h: i32,
    /// Scratch register `I`.
    pub i: i32,
    /// Scratch register `J`.
    pub j: i32,
    /// 15x5 accumulator memory.
    pub mem: [[i32; 5]; 15],
    /// 400x6 function-table ROM, indexed directly by `pc`.
    pub function_table: [[i32; 6]; 400],
    /// Nonzero once the host has populated `function_table`.
    pub ft_initialized: i32,
    /// `profile[pc][ir_index]`, indexed directly by `pc`.
    pub profile: [[u64; 7]; 400],
}

/// The C-compatible mirror of `vm.h`'s `ENIAC` struct: the host's
/// checkpoint snapshot, byte-for-byte. Unlike [`CVm`], the host
/// constructs and reads this struct directly, so its layout (including
/// the accumulator strings' trailing NUL) must match `vm.h` exactly.
#[repr(C)]
pub struct CEniac {
    /// Cycle count at the checkpoint.
    pub cycles: u64,
    /// Nonzero if the VM had latched an error at the checkpoint.
    pub error_code: i32,
    /// Nonzero if the outer simulator should take over for this checkpoint.
    pub rollback: i32,
    /// Twenty NUL-terminated `[PM]` + ten-digit accumulator strings.
    pub acc: [[u8; 12]; 20],
    /// Three 104x14 digit function tables.
    pub ft: [[[i32; 14]; 104]; 3],
}

fn vm_from_c(raw: &CVm) -> Vm {
    let mut vm = Vm::new();
    vm.cycles = raw.cycles;
    vm.status = Status::from_bits_retain(raw.status as u8);
    vm.error = ErrorFlags::from_bits_retain(raw.error as u32);
    vm.pc = raw.pc;
    vm.old_pc = raw.old_pc;
    vm.ir = InstructionRegister::from_raw(raw.ir, raw.ir_index as usize);
    vm.rf = RegisterFile { a: raw.a, b: raw.b, c: raw.c, d: raw.d, e: raw.e };
    vm.ls = LoadStore { f: raw.f, g: raw.g, h: raw.h, i: raw.i, j: raw.j };
    for acc in 0..15 {
        for word in 0..5 {
            vm.mem.set_word(acc, word, raw.mem[acc][word]);
        }
    }
    if raw.ft_initialized != 0 {
        vm.ft.mark_initialized();
        for pc in 100..400i32 {
            vm.ft.set_row(pc, raw.function_table[pc as usize]);
        }
    }
    vm.profile = raw.profile;
    vm
}

fn c_from_vm(vm: &Vm) -> CVm {
    let mut function_table = [[0i32; 6]; 400];
    for pc in 100..400i32 {
        function_table[pc as usize] = vm.ft.row(pc);
    }
    let mut mem = [[0i32; 5]; 15];
    for (acc, row) in mem.iter_mut().enumerate() {
        for (word, slot) in row.iter_mut().enumerate() {
            *slot = vm.mem.word(acc, word);
        }
    }
    CVm {
        cycles: vm.cycles,
        status: i32::from(vm.status.bits()),
        error: vm.error.bits() as i32,
        pc: vm.pc,
        old_pc: vm.old_pc,
        ir: vm.ir.slots(),
        ir_index: vm.ir.index() as i32,
        a: vm.rf.a,
        b: vm.rf.b,
        c: vm.rf.c,
        d: vm.rf.d,
        e: vm.rf.e,
        f: vm.ls.f,
        g: vm.ls.g,
        h: vm.ls.h,
        i: vm.ls.i,
        j: vm.ls.j,
        mem,
        function_table,
        ft_initialized: i32::from(vm.ft.is_initialized()),
        profile: vm.profile,
    }
}

fn eniac_from_c(raw: &CEniac) -> Eniac {
    let mut host = Eniac::new();
    host.cycles = raw.cycles;
    host.error_code = raw.error_code;
    host.rollback = raw.rollback != 0;
    for (dst, src) in host.acc.iter_mut().zip(raw.acc.iter()) {
        dst.copy_from_slice(&src[..11]);
    }
    host.ft = raw.ft;
    host
}

fn c_from_eniac(host: &Eniac) -> CEniac {
    let mut acc = [[0u8; 12]; 20];
    for (dst, src) in acc.iter_mut().zip(host.acc.iter()) {
        dst[..11].copy_from_slice(src);
        dst[11] = 0;
    }
    CEniac {
        cycles: host.cycles,
        error_code: host.error_code,
        rollback: i32::from(host.rollback),
        acc,
        ft: host.ft,
    }
}

/// Allocates and initializes a new VM, returning an owning pointer the
/// caller must eventually pass to [`vm_free`].
///
/// # Safety
/// The returned pointer is non-null and uniquely owned by the caller.
#[no_mangle]
pub extern "C" fn vm_new() -> *mut CVm {
    Box::into_raw(Box::new(c_from_vm(&Vm::new())))
}

/// Frees a VM previously returned by [`vm_new`].
///
/// # Safety
/// `vm` must be a pointer returned by [`vm_new`] that has not already
/// been freed, or null (a no-op).
#[no_mangle]
pub unsafe extern "C" fn vm_free(vm: *mut CVm) {
    if vm.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(vm) });
}

/// Populates `vm` from `eniac`. Returns `0` on success, nonzero if the
/// current-pc bank digits were illegal (the checkpoint is rejected and
/// `vm` is left unmodified).
///
/// # Safety
/// `vm` and `eniac` must be valid, non-null, non-aliasing pointers.
#[no_mangle]
pub unsafe extern "C" fn vm_import(vm: *mut CVm, eniac: *const CEniac) -> i32 {
    let Some(vm_ref) = (unsafe { vm.as_mut() }) else { return 1 };
    let Some(eniac_ref) = (unsafe { eniac.as_ref() }) else { return 1 };

    let mut inner = vm_from_c(vm_ref);
    let host_eniac = eniac_from_c(eniac_ref);
    match eniacvm_host::bridge::import(&mut inner, &host_eniac) {
        Ok(()) => {
            *vm_ref = c_from_vm(&inner);
            0
        }
        Err(err) => {
            warn!("vm_import: {err}");
            1
        }
    }
}

/// Populates `eniac` from `vm`'s current state.
///
/// # Safety
/// `vm` and `eniac` must be valid, non-null, non-aliasing pointers.
#[no_mangle]
pub unsafe extern "C" fn vm_export(vm: *const CVm, eniac: *mut CEniac) {
    let Some(vm_ref) = (unsafe { vm.as_ref() }) else { return };
    let Some(eniac_ref) = (unsafe { eniac.as_mut() }) else { return };

    let inner = vm_from_c(vm_ref);
    let mut host_eniac = Eniac::new();
    eniacvm_host::bridge::export(&inner, &mut host_eniac);
    *eniac_ref = c_from_eniac(&host_eniac);
}

/// Runs `vm` until the next fetch boundary, status bit, or error.
///
/// # Safety
/// `vm` must be a valid, non-null pointer from [`vm_new`].
#[no_mangle]
pub unsafe extern "C" fn vm_step(vm: *mut CVm) {
    let Some(vm_ref) = (unsafe { vm.as_mut() }) else { return };
    let mut inner = vm_from_c(vm_ref);
    inner.step();
    *vm_ref = c_from_vm(&inner);
}

/// Runs `vm` up to and including `cycle`, never past.
///
/// # Safety
/// `vm` must be a valid, non-null pointer from [`vm_new`].
#[no_mangle]
pub unsafe extern "C" fn vm_step_to(vm: *mut CVm, cycle: u64) {
    let Some(vm_ref) = (unsafe { vm.as_mut() }) else { return };
    let mut inner = vm_from_c(vm_ref);
    inner.step_to(cycle);
    *vm_ref = c_from_vm(&inner);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_c_layout_preserves_state() {
        let mut vm = Vm::new();
        vm.rf.a = 10;
        vm.rf.d = 72;
        vm.ft.set_row(100, [70, 95, 0, 0, 0, 0]);
        vm.step();

        let raw = c_from_vm(&vm);
        let restored = vm_from_c(&raw);
        assert_eq!(restored, vm);
    }

    #[test]
    fn new_free_step_round_trip_does_not_crash() {
        unsafe {
            let vm = vm_new();
            (*vm).function_table[100] = [95, 0, 0, 0, 0, 0];
            (*vm).ft_initialized = 1;
            vm_step(vm);
            assert_ne!((*vm).status & 0x01, 0, "halt bit should be set");
            vm_free(vm);
        }
    }

    #[test]
    fn import_export_round_trips_through_c_eniac() {
        let mut eniac = CEniac {
            cycles: 1000,
            error_code: 0,
            rollback: 0,
            acc: [*b"P00000000000"; 20],
            ft: [[[0; 14]; 104]; 3],
        };
        eniac.acc[0] = *b"P0000000909\0"; // bank 1, offset 9 -> pc = 109

        unsafe {
            let vm = vm_new();
            let imported = vm_import(vm, std::ptr::addr_of!(eniac));
            assert_eq!(imported, 0);
            assert_eq!((*vm).pc, 109);

            let mut exported = CEniac {
                cycles: 0,
                error_code: 0,
                rollback: 0,
                acc: [*b"P00000000000"; 20],
                ft: [[[0; 14]; 104]; 3],
            };
            vm_export(vm, std::ptr::addr_of_mut!(exported));
            assert_eq!(&exported.acc[0][..11], b"P0000000909");
            vm_free(vm);
        }
    }
}
