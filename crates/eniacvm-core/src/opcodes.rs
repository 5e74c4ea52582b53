//! Instruction bodies, one free function per opcode, dispatched from
//! [`dispatch`]. Grounded on `chsim/vm.cc`'s `step_one_instruction` switch;
//! cycle costs from spec.md §4.3.
//!
//! ISA v4's opcode space is sparse (about thirty opcodes scattered over
//! `0..100`), so dispatch is a `match` rather than the dense lookup table a
//! byte-wide ISA would use.

use log::warn;

use crate::decimal;
use crate::error::ErrorFlags;
use crate::status::Status;
use crate::vm::Vm;

/// Runs the instruction named by `opcode` against `vm`. `opcode` has
/// already been consumed from the instruction register by the caller.
pub(crate) fn dispatch(vm: &mut Vm, opcode: i32) {
    match opcode {
        0 => clrall(vm),
        1 => swap_a_b(vm),
        2 => swap_a_c(vm),
        3 => swap_a_d(vm),
        4 => swap_a_e(vm),
        10 => loadacc(vm),
        11 => storeacc(vm),
        12 => swapall(vm),
        14 => ftl(vm),
        20 => mov_b_a(vm),
        21 => mov_c_a(vm),
        22 => mov_d_a(vm),
        23 => mov_e_a(vm),
        30 => mov_g_a(vm),
        31 => mov_h_a(vm),
        32 => mov_i_a(vm),
        33 => mov_j_a(vm),
        34 => mov_f_a(vm),
        40 => mov_imm_a(vm),
        41 => mov_indexed_to_a(vm),
        42 => mov_a_to_indexed(vm),
        43 => lodig(vm),
        44 => swapdig(vm),
        52 => inc_a(vm),
        53 => dec_a(vm),
        54 => flipn(vm),
        70 => add_d_a(vm),
        71 => add_imm_a(vm),
        72 => sub_d_a(vm),
        73 => jmp_near(vm),
        74 => jmp_far(vm),
        80 => jn(vm),
        81 => jz(vm),
        82 => jil(vm),
        84 => jsr_far(vm),
        85 => ret(vm),
        90 => clr_a(vm),
        91 => read(vm),
        92 => print(vm),
        94 => brk(vm),
        95 => halt(vm),
        99 => {} // sled: no-op
        _ => illegal_opcode(vm),
    }
}

fn clrall(vm: &mut Vm) {
    vm.rf = crate::registers::RegisterFile::default();
    vm.cycles += 4;
}

fn swap_a_b(vm: &mut Vm) {
    decimal::swap_dropping_sign(&mut vm.rf.a, &mut vm.rf.b);
    vm.cycles += 4;
}

fn swap_a_c(vm: &mut Vm) {
    decimal::swap_dropping_sign(&mut vm.rf.a, &mut vm.rf.c);
    vm.cycles += 4;
}

fn swap_a_d(vm: &mut Vm) {
    decimal::swap_dropping_sign(&mut vm.rf.a, &mut vm.rf.d);
    vm.cycles += 4;
}

fn swap_a_e(vm: &mut Vm) {
    decimal::swap_dropping_sign(&mut vm.rf.a, &mut vm.rf.e);
    vm.cycles += 4;
}

fn loadacc(vm: &mut Vm) {
    let acc = vm.rf.a;
    if !(0..15).contains(&acc) {
        warn!("loadacc: accumulator index {acc} out of range");
        vm.error |= ErrorFlags::ILLEGAL_ACC;
        vm.status |= Status::HALT;
        return;
    }
    vm.mem.load_into(acc as usize, &mut vm.ls);
    vm.cycles += 11;
}

fn storeacc(vm: &mut Vm) {
    let acc = vm.rf.a;
    if !(0..15).contains(&acc) {
        warn!("storeacc: accumulator index {acc} out of range");
        vm.error |= ErrorFlags::ILLEGAL_ACC;
        vm.status |= Status::HALT;
        return;
    }
    let acc = acc as usize;
    vm.ls.f = decimal::copy_sign(vm.mem.word(acc, 0), vm.ls.f);
    vm.mem.store_from(acc, &vm.ls);
    vm.cycles += 13;
}

fn swapall(vm: &mut Vm) {
    std::mem::swap(&mut vm.rf.a, &mut vm.ls.f);
    std::mem::swap(&mut vm.rf.b, &mut vm.ls.g);
    std::mem::swap(&mut vm.rf.c, &mut vm.ls.h);
    std::mem::swap(&mut vm.rf.d, &mut vm.ls.i);
    std::mem::swap(&mut vm.rf.e, &mut vm.ls.j);
    vm.cycles += 5;
}

fn ftl(vm: &mut Vm) {
    let offset = decimal::drop_sign(vm.rf.a);
    if !(8..=99).contains(&offset) {
        warn!("ftl: offset {offset} out of range");
        vm.error |= ErrorFlags::ILLEGAL_FTL;
        vm.status |= Status::HALT;
        return;
    }
    vm.rf.a = vm.ft.word(300 + offset, 0);
    vm.cycles += 7;
}

fn mov_b_a(vm: &mut Vm) {
    vm.rf.a = vm.rf.b;
    vm.cycles += 9;
}

fn mov_c_a(vm: &mut Vm) {
    vm.rf.a = vm.rf.c;
    vm.cycles += 9;
}

fn mov_d_a(vm: &mut Vm) {
    vm.rf.a = vm.rf.d;
    vm.cycles += 9;
}

fn mov_e_a(vm: &mut Vm) {
    vm.rf.a = vm.rf.e;
    vm.cycles += 9;
}

fn mov_f_a(vm: &mut Vm) {
    vm.rf.a = decimal::drop_sign(vm.ls.f);
    vm.cycles += 9;
}

fn mov_g_a(vm: &mut Vm) {
    vm.rf.a = vm.ls.g;
    vm.cycles += 9;
}

fn mov_h_a(vm: &mut Vm) {
    vm.rf.a = vm.ls.h;
    vm.cycles += 9;
}

fn mov_i_a(vm: &mut Vm) {
    vm.rf.a = vm.ls.i;
    vm.cycles += 9;
}

fn mov_j_a(vm: &mut Vm) {
    vm.rf.a = vm.ls.j;
    vm.cycles += 9;
}

fn mov_imm_a(vm: &mut Vm) {
    vm.rf.a = vm.ir.consume_operand(&mut vm.status, &mut vm.error);
    vm.cycles += 4;
}

/// Resolves the `mov [B],A` / `mov A,[B]` linear address, latching
/// `ILLEGAL_ADDRESS|HALT` and returning `None` if `B` is out of range.
fn indexed_address(vm: &mut Vm) -> Option<(usize, usize)> {
    let b = vm.rf.b;
    if !(0..75).contains(&b) {
        warn!("indexed memory access: address {b} out of range");
        vm.error |= ErrorFlags::ILLEGAL_ADDRESS;
        vm.status |= Status::HALT;
        return None;
    }
    Some((b as usize / 5, b as usize % 5))
}

fn mov_indexed_to_a(vm: &mut Vm) {
    let Some((acc, word)) = indexed_address(vm) else { return };
    vm.mem.load_into(acc, &mut vm.ls);
    vm.rf.a = match word {
        0 => decimal::drop_sign(vm.ls.f),
        1 => vm.ls.g,
        2 => vm.ls.h,
        3 => vm.ls.i,
        _ => vm.ls.j,
    };
    vm.cycles += 28;
}

fn mov_a_to_indexed(vm: &mut Vm) {
    let Some((acc, word)) = indexed_address(vm) else { return };
    vm.mem.load_into(acc, &mut vm.ls);
    match word {
        0 => vm.ls.f = decimal::copy_sign(vm.ls.f, vm.rf.a),
        1 => vm.ls.g = decimal::drop_sign(vm.rf.a),
        2 => vm.ls.h = decimal::drop_sign(vm.rf.a),
        3 => vm.ls.i = decimal::drop_sign(vm.rf.a),
        _ => vm.ls.j = decimal::drop_sign(vm.rf.a),
    }
    vm.mem.store_from(acc, &vm.ls);
    vm.cycles += 37;
}

fn lodig(vm: &mut Vm) {
    vm.rf.a = decimal::ones_digit_signed(vm.rf.a);
    vm.cycles += 5;
}

fn swapdig(vm: &mut Vm) {
    vm.rf.a = decimal::swap_digits_signed(vm.rf.a);
    vm.cycles += 5;
}

fn inc_a(vm: &mut Vm) {
    vm.rf.a = decimal::wrapping_inc(vm.rf.a);
    vm.cycles += 1;
}

fn dec_a(vm: &mut Vm) {
    vm.rf.a = decimal::wrapping_dec(vm.rf.a);
    vm.cycles += 1;
}

fn flipn(vm: &mut Vm) {
    vm.rf.a = decimal::flip_sign_band(vm.rf.a);
    vm.cycles += 2;
}

fn add_d_a(vm: &mut Vm) {
    vm.rf.a = decimal::wrapping_add(vm.rf.a, vm.rf.d);
    vm.cycles += 5;
}

fn add_imm_a(vm: &mut Vm) {
    let operand = vm.ir.consume_operand(&mut vm.status, &mut vm.error);
    vm.rf.a = decimal::wrapping_add(vm.rf.a, operand);
    vm.cycles += 2;
}

fn sub_d_a(vm: &mut Vm) {
    vm.rf.a = decimal::wrapping_sub(vm.rf.a, vm.rf.d);
    vm.cycles += 5;
}

fn jmp_near(vm: &mut Vm) {
    vm.pc = vm.ir.consume_near_address(vm.pc, &mut vm.status, &mut vm.error);
    vm.ir.force_empty();
    vm.cycles += 2;
}

fn jmp_far(vm: &mut Vm) {
    let (target, _) = vm.ir.consume_far_address(&mut vm.pc, &vm.ft, &mut vm.status, &mut vm.error);
    vm.pc = target;
    vm.update_bank_mirror();
    vm.ir.force_empty();
    vm.cycles += 6;
}

fn jn(vm: &mut Vm) {
    let taken_pc = vm.ir.consume_near_address(vm.pc, &mut vm.status, &mut vm.error);
    if vm.rf.a < 0 {
        vm.pc = taken_pc;
        vm.ir.force_empty();
    }
    vm.cycles += 6;
}

fn jz(vm: &mut Vm) {
    let taken_pc = vm.ir.consume_near_address(vm.pc, &mut vm.status, &mut vm.error);
    if vm.rf.a == 0 || vm.rf.a == -100 {
        vm.pc = taken_pc;
        vm.ir.force_empty();
    }
    vm.cycles += 10;
}

fn jil(vm: &mut Vm) {
    let taken_pc = vm.ir.consume_near_address(vm.pc, &mut vm.status, &mut vm.error);
    let digits = if vm.rf.a < 0 { 100 + vm.rf.a } else { vm.rf.a };
    let ones = digits % 10;
    let tens = (digits / 10) % 10;
    if ones == 0 || ones == 9 || tens == 0 || tens == 9 {
        vm.pc = taken_pc;
        vm.ir.force_empty();
    }
    vm.cycles += 10;
}

fn jsr_far(vm: &mut Vm) {
    vm.old_pc = vm.pc;
    let (target, _) = vm.ir.consume_far_address(&mut vm.pc, &vm.ft, &mut vm.status, &mut vm.error);
    vm.pc = target;
    vm.update_bank_mirror();
    vm.ir.force_empty();
    vm.cycles += 6;
}

fn ret(vm: &mut Vm) {
    vm.pc = vm.old_pc;
    vm.update_bank_mirror();
    vm.old_pc = 0;
    vm.ir.force_empty();
    vm.cycles += 6;
}

fn clr_a(vm: &mut Vm) {
    vm.rf.a = 0;
    vm.cycles += 2;
}

fn read(vm: &mut Vm) {
    vm.status |= Status::IO_READ;
}

fn print(vm: &mut Vm) {
    vm.status |= Status::IO_PRINT;
}

fn brk(vm: &mut Vm) {
    vm.status |= Status::BREAK;
}

fn halt(vm: &mut Vm) {
    vm.status |= Status::HALT;
}

fn illegal_opcode(vm: &mut Vm) {
    warn!("illegal opcode at pc={}", vm.pc);
    vm.error |= ErrorFlags::ILLEGAL_OPCODE;
    vm.status |= Status::HALT;
}
