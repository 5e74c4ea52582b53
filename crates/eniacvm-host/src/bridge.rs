//! Checkpoint import/export between [`Vm`] and [`Eniac`].
//!
//! Grounded on `chsim/vm.cc`'s `vm_import`/`vm_export`. The accumulator
//! layout `eniacsim` uses: accumulator `0` carries the PC/old-PC bank
//! encoding, `3` is the load/store scratch (`F..J`), `12` is the register
//! file (`A..E`), and the remaining seventeen slots (`4..12`, `13..20`)
//! hold the VM's fifteen memory words in order, skipping over `12`.

use log::warn;

use eniacvm_core::{LoadStore, RegisterFile, Vm};

use crate::codec::{encode_bank_digits, pack_acc, unpack_acc, unpack_word};
use crate::eniac::Eniac;
use crate::HostBridgeError;

/// Accumulator index carrying the load/store scratch registers.
const LS_ACC: usize = 3;
/// Accumulator index carrying the register file.
const RF_ACC: usize = 12;
/// First accumulator index used for VM memory; `RF_ACC` is skipped when
/// the running index reaches it.
const MEM_ACC_START: usize = 4;

/// Populates `vm` from a host checkpoint. Mirrors `vm_import`: returns an
/// error (refusing the checkpoint) only when the *current*-pc bank digits
/// are illegal; an unrecognized *old*-pc bank resets `old_pc` to `0`
/// rather than failing, since `old_pc` is legitimately unset before the
/// first `jsr`.
pub fn import(vm: &mut Vm, eniac: &Eniac) -> Result<(), HostBridgeError> {
    vm.cycles = eniac.cycles;
    vm.status.clear_transient();

    let old_bank = unpack_word(&eniac.acc[0], 3)?;
    let old_pc_offset = unpack_word(&eniac.acc[0], 5)?;
    vm.old_pc = match old_bank {
        9 => 100 + old_pc_offset,
        90 => 200 + old_pc_offset,
        99 => 300 + old_pc_offset,
        _ => 0,
    };

    let bank = unpack_word(&eniac.acc[0], 7)?;
    let pc_offset = unpack_word(&eniac.acc[0], 9)?;
    vm.pc = match bank {
        9 => 100 + pc_offset,
        90 => 200 + pc_offset,
        99 => 300 + pc_offset,
        _ => {
            warn!("vm_import: current-pc bank digits {bank:02} name neither bank 1, 2, nor 3");
            return Err(HostBridgeError::IllegalCurrentBank(bank / 10, bank % 10));
        }
    };
    vm.ir.force_empty();

    let (f, g, h, i, j) = unpack_acc(&eniac.acc[LS_ACC])?;
    vm.ls = LoadStore { f, g, h, i, j };
    let (a, b, c, d, e) = unpack_acc(&eniac.acc[RF_ACC])?;
    vm.rf = RegisterFile { a, b, c, d, e };

    let mut acc_index = MEM_ACC_START;
    for mem_index in 0..eniacvm_core::memory::ACCUMULATOR_COUNT {
        if acc_index == RF_ACC {
            acc_index += 1;
        }
        let (m0, m1, m2, m3, m4) = unpack_acc(&eniac.acc[acc_index])?;
        vm.mem.set_word(mem_index, 0, m0);
        vm.mem.set_word(mem_index, 1, m1);
        vm.mem.set_word(mem_index, 2, m2);
        vm.mem.set_word(mem_index, 3, m3);
        vm.mem.set_word(mem_index, 4, m4);
        acc_index += 1;
    }

    if !vm.ft.is_initialized() {
        for table in 0..3usize {
            // `chsim/vm.cc` loops `r` up to 104, but only rows 2..102 hold
            // real per-bank data (100 rows/bank); rows 102/103 are where the
            // C source overruns into adjacent struct fields, which a strict
            // `[[i32; 6]; 300]` has no equivalent of to overrun into.
            for row in 2..102usize {
                let offset = (table as i32 + 1) * 100 + (row as i32 - 2);
                let b_sign = table == 2 && eniac.ft[2][row][13] != 0;
                let word0_digits = 10 * eniac.ft[table][row][1] + eniac.ft[table][row][2];
                let word0 = if b_sign { word0_digits - 100 } else { word0_digits };
                vm.ft.set_row(
                    offset,
                    [
                        word0,
                        10 * eniac.ft[table][row][3] + eniac.ft[table][row][4],
                        10 * eniac.ft[table][row][5] + eniac.ft[table][row][6],
                        10 * eniac.ft[table][row][7] + eniac.ft[table][row][8],
                        10 * eniac.ft[table][row][9] + eniac.ft[table][row][10],
                        10 * eniac.ft[table][row][11] + eniac.ft[table][row][12],
                    ],
                );
            }
        }
        vm.ft.mark_initialized();
    }

    Ok(())
}

/// Populates `eniac` from `vm`'s current state. Mirrors `vm_export`,
/// which is infallible: every field of `vm` is already known-valid by the
/// time a checkpoint is taken (bounds are enforced after every
/// instruction by [`eniacvm_core::vm::Vm::step`]).
pub fn export(vm: &Vm, eniac: &mut Eniac) {
    eniac.cycles = vm.cycles;
    eniac.error_code = vm.error.bits() as i32;
    eniac.rollback = !vm.status.is_empty();

    let bank = (vm.pc / 100) % 10;
    let old_bank = (vm.old_pc / 100) % 10;
    let (old_tens, old_ones) = encode_bank_digits(old_bank);
    let (tens, ones) = encode_bank_digits(bank);
    eniac.acc[0] = [
        b'P',
        b'0',
        b'0',
        old_tens,
        old_ones,
        b'0' + ((vm.old_pc / 10) % 10) as u8,
        b'0' + (vm.old_pc % 10) as u8,
        tens,
        ones,
        b'0' + ((vm.pc / 10) % 10) as u8,
        b'0' + (vm.pc % 10) as u8,
    ];

    eniac.acc[LS_ACC] = pack_acc(vm.ls.f, vm.ls.g, vm.ls.h, vm.ls.i, vm.ls.j);
    eniac.acc[RF_ACC] = pack_acc(vm.rf.a, vm.rf.b, vm.rf.c, vm.rf.d, vm.rf.e);

    let mut acc_index = MEM_ACC_START;
    for mem_index in 0..eniacvm_core::memory::ACCUMULATOR_COUNT {
        if acc_index == RF_ACC {
            acc_index += 1;
        }
        eniac.acc[acc_index] = pack_acc(
            vm.mem.word(mem_index, 0),
            vm.mem.word(mem_index, 1),
            vm.mem.word(mem_index, 2),
            vm.mem.word(mem_index, 3),
            vm.mem.word(mem_index, 4),
        );
        acc_index += 1;
    }
}
