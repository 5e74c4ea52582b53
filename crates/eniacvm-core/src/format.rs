//! Typed value types for the ISA v4 ".e" program-file directives and the
//! I/O wire tokens, documented but not shipped with a loader or CLI.
//!
//! Parsing a whole `.e` file line-by-line, and reading/writing the
//! deck/stdout wire format, are external-collaborator concerns (spec.md
//! §1: "the textual program-file parser... is a trivial line-oriented
//! reader"). What belongs here is the *shape* of one directive or token, so
//! an external loader has something concrete to parse into and hand to
//! [`crate::function_table::FunctionTable`] / [`crate::vm::Vm`].
//!
//! Grounded on `chsim/main.cc`'s `read_program` (the `sscanf` patterns) and
//! `step_and_handle_status` (the `fscanf`/`printf` wire format).

use thiserror::Error;

/// Errors recognizing a line of an ISA v4 `.e` program file.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatchError {
    /// The line matched neither known directive shape.
    #[error("unrecognized directive: {0:?}")]
    UnrecognizedDirective(String),
    /// `ft` was not in `1..=3`.
    #[error("function table {0} out of range 1-3")]
    FunctionTableOutOfRange(i32),
    /// The row digit was not in `0..100`.
    #[error("row {0} out of range 0-99")]
    RowOutOfRange(i32),
    /// `Idx` was not in `1..=6`.
    #[error("row index {0} out of range 1-6")]
    RowIndexOutOfRange(i32),
    /// `D` was not in `0..=9`.
    #[error("digit {0} out of range 0-9")]
    DigitOutOfRange(i32),
}

/// Which half of a function-table row a digit-deposit directive targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    /// Word slots 0..3.
    A,
    /// Word slots 3..6.
    B,
}

/// A parsed `s fT.RBankRR LIdx D` directive: deposit digit `digit` at
/// position `index` of `bank`'s word of row `row` of function table `ft`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitDeposit {
    /// Function table, `1..=3`.
    pub ft: i32,
    /// `A` or `B` half of the row.
    pub bank: Bank,
    /// Row within the table, `0..100`.
    pub row: i32,
    /// Position within the bank, `1..=6`.
    pub index: i32,
    /// Digit value, `0..=9`.
    pub digit: i32,
}

impl DigitDeposit {
    /// Validates field ranges (mirrors `read_program`'s checks).
    pub fn validate(self) -> Result<Self, PatchError> {
        if !(1..=3).contains(&self.ft) {
            return Err(PatchError::FunctionTableOutOfRange(self.ft));
        }
        if !(0..100).contains(&self.row) {
            return Err(PatchError::RowOutOfRange(self.row));
        }
        if !(1..=6).contains(&self.index) {
            return Err(PatchError::RowIndexOutOfRange(self.index));
        }
        if !(0..=9).contains(&self.digit) {
            return Err(PatchError::DigitOutOfRange(self.digit));
        }
        Ok(self)
    }

    /// The `(row_index, word_index)` this directive targets in a 400x6
    /// function table, and the digit value shifted into its tens/ones
    /// position, ready to be added (not assigned — deposits accumulate
    /// additively within a fresh, zeroed row; spec.md §6).
    #[must_use]
    pub fn target(self) -> (usize, usize, i32) {
        let row_index = (self.ft * 100 + self.row) as usize;
        let bank_base = match self.bank {
            Bank::A => 0,
            Bank::B => 3,
        };
        let word_index = (bank_base + (6 - self.index) / 2) as usize;
        let shifted_digit = if self.index % 2 == 0 { 10 * self.digit } else { self.digit };
        (row_index, word_index, shifted_digit)
    }
}

/// A parsed `s f3.RBRRS SIGN` directive: row `row` of function table 3
/// carries a negative word 0 once ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSign {
    /// Row within function table 3, `0..100`.
    pub row: i32,
    /// `true` for `M` (negative); `false` for `P`.
    pub negative: bool,
}

/// One I/O-read token: `ffggh`, assigning `F`, `G`, and the tens digit of
/// `H` (the ones digit of `H` is left untouched).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoReadToken {
    /// New value for `F`.
    pub f: i32,
    /// New value for `G`.
    pub g: i32,
    /// New tens digit of `H`.
    pub h_tens: i32,
}

impl IoReadToken {
    /// Applies this token to `h`'s previous value, producing `H`'s new
    /// value (`10 * h_tens + (h % 10)`, per `chsim/main.cc`).
    #[must_use]
    pub const fn apply_to_h(self, previous_h: i32) -> i32 {
        10 * self.h_tens + (previous_h % 10)
    }
}

/// One I/O-print line: `PPBB`, where `PP = drop_sign(A)` and `BB = B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoPrintLine {
    /// `drop_sign(A)` at the time of the `print` opcode.
    pub a_digits: i32,
    /// `B` at the time of the `print` opcode.
    pub b: i32,
}

impl IoPrintLine {
    /// Builds the line from the VM's registers (`drop_sign(a)`, `b`).
    #[must_use]
    pub const fn from_registers(dropped_a: i32, b: i32) -> Self {
        Self { a_digits: dropped_a, b }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_deposit_targets_bank_a_even_index() {
        // s f1.RA10 L2 D5: ft=1, bank=A, row=10, index=2, digit=5
        let deposit = DigitDeposit { ft: 1, bank: Bank::A, row: 10, index: 2, digit: 5 };
        let (row_index, word_index, shifted) = deposit.target();
        assert_eq!(row_index, 110);
        assert_eq!(word_index, 2);
        assert_eq!(shifted, 50);
    }

    #[test]
    fn digit_deposit_targets_bank_b_odd_index() {
        let deposit = DigitDeposit { ft: 2, bank: Bank::B, row: 0, index: 3, digit: 7 };
        let (row_index, word_index, shifted) = deposit.target();
        assert_eq!(row_index, 200);
        assert_eq!(word_index, 3 + (6 - 3) / 2);
        assert_eq!(shifted, 7);
    }

    #[test]
    fn digit_deposit_validates_ranges() {
        let bad = DigitDeposit { ft: 4, bank: Bank::A, row: 0, index: 1, digit: 0 };
        assert_eq!(bad.validate(), Err(PatchError::FunctionTableOutOfRange(4)));
    }

    #[test]
    fn io_read_token_preserves_h_ones_digit() {
        let token = IoReadToken { f: 12, g: 34, h_tens: 5 };
        assert_eq!(token.apply_to_h(29), 59);
    }
}
