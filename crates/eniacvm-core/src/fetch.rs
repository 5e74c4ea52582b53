//! The fetch pipeline: the 6-slot instruction register (IR) and the
//! operand/address decoders built on top of it.
//!
//! Grounded on `chsim/vm.cc`'s `consume_ir`, `consume_operand`,
//! `consume_near_address`, `consume_far_address`.

use crate::error::ErrorFlags;
use crate::function_table::FunctionTable;
use crate::status::Status;

/// Value returned by `consume_ir` on a fetch error, matching `vm.cc`
/// returning the halt opcode (`95`) rather than garbage.
const HALT_OPCODE: i32 = 95;

/// The 6-slot instruction register latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionRegister {
    slots: [i32; 6],
    /// `0..6`; `6` means empty, refetch on next `consume_ir`.
    index: usize,
}

impl Default for InstructionRegister {
    fn default() -> Self {
        Self { slots: [0; 6], index: 6 }
    }
}

impl InstructionRegister {
    /// Rebuilds an instruction register from its raw slot contents and
    /// read position. Used only by `eniacvm-ffi` to round-trip the C
    /// layout's `ir`/`ir_index` fields; normal execution never needs to
    /// construct an `InstructionRegister` other than via `Default`.
    #[inline]
    #[must_use]
    pub const fn from_raw(slots: [i32; 6], index: usize) -> Self {
        Self { slots, index }
    }

    /// Current read position, `0..=6`.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Whether the row has been fully consumed (a fetch boundary).
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.index == 6
    }

    /// Forces `ir_index := 6`, as every control-transfer opcode does after
    /// committing a jump. The stale slot contents are irrelevant: nothing
    /// reads them again before the next `consume_ir` refetches the row.
    #[inline]
    pub fn force_empty(&mut self) {
        self.index = 6;
    }

    /// Raw slot contents, for inspection/testing.
    #[inline]
    #[must_use]
    pub const fn slots(&self) -> [i32; 6] {
        self.slots
    }

    /// The length of the longest all-`99` suffix of the row — the "sled".
    /// Carries during `consume_operand` stop one slot short of this.
    fn sled_start(&self) -> usize {
        let mut start = 6;
        while start > 0 && self.slots[start - 1] == 99 {
            start -= 1;
        }
        start
    }

    /// `consume_ir`: fetches a fresh row if empty, then returns the next
    /// slot. Returns `(opcode_or_slot, fetched_fresh_row)` so the caller can
    /// charge the right fetch cost.
    pub fn consume_ir(
        &mut self,
        pc: &mut i32,
        ft: &FunctionTable,
        status: &mut Status,
        error: &mut ErrorFlags,
    ) -> (i32, bool) {
        let mut fetched = false;
        if self.index == 6 {
            fetched = true;
            self.index = usize::from(*pc >= 300);
            self.slots = ft.row(*pc);
            *pc += 1;
            if *pc == 200 || *pc == 300 {
                *error |= ErrorFlags::PC_WRAPPED;
                *status |= Status::HALT;
                return (HALT_OPCODE, fetched);
            }
        }
        let value = self.slots[self.index];
        self.index += 1;
        (value, fetched)
    }

    /// `consume_operand`: treats the current slot as inline data, pre-
    /// incrementing it (with sled-aware carry) before returning it.
    pub fn consume_operand(&mut self, status: &mut Status, error: &mut ErrorFlags) -> i32 {
        if self.index == 6 {
            *error |= ErrorFlags::OPERAND_MISALIGNED;
            *status |= Status::HALT;
            return HALT_OPCODE;
        }
        let sled_start = self.sled_start();
        self.slots[self.index] += 1;
        let mut i = self.index;
        while i < 6 && self.slots[i] == 100 {
            self.slots[i] = 0;
            if i < sled_start.saturating_sub(1) {
                self.slots[i + 1] += 1;
            }
            i += 1;
        }
        let value = self.slots[self.index];
        self.index += 1;
        value
    }

    /// `consume_near_address`: a jump target within the current bank.
    pub fn consume_near_address(
        &mut self,
        pc: i32,
        status: &mut Status,
        error: &mut ErrorFlags,
    ) -> i32 {
        100 * (pc / 100) + self.consume_operand(status, error)
    }

    /// `consume_far_address`: an operand plus a trailing bank digit read via
    /// `consume_ir`, mapping `9`/`90`/`99` to banks `1`/`2`/`3`.
    ///
    /// Returns `(target_pc, fetched_fresh_row)`. If the bank digit is not
    /// one of the three valid encodings, latches `ILLEGAL_BANK|HALT` and
    /// returns the current `pc` unchanged (`chsim/vm.cc`'s `return
    /// vm->pc;`), so the caller's unconditional `vm.pc = target` assignment
    /// is a harmless no-op rather than a jump to a garbage address.
    pub fn consume_far_address(
        &mut self,
        pc: &mut i32,
        ft: &FunctionTable,
        status: &mut Status,
        error: &mut ErrorFlags,
    ) -> (i32, bool) {
        let offset = self.consume_operand(status, error);
        let (bank_digit, fetched) = self.consume_ir(pc, ft, status, error);
        let bank = match bank_digit {
            9 => 1,
            90 => 2,
            99 => 3,
            _ => {
                *error |= ErrorFlags::ILLEGAL_BANK;
                *status |= Status::HALT;
                return (*pc, fetched);
            }
        };
        (100 * bank + offset, fetched)
    }
}
