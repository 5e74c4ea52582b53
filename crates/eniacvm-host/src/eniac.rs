//! The host-side checkpoint representation: twenty ASCII accumulators and
//! three 104-row function tables, exactly as the outer ENIAC simulator
//! (`eniacsim`) holds them. Grounded on `chsim/vm.h`'s `struct eniac_t`.

/// One packed accumulator: a sign byte (`P`/`M`) followed by five
/// two-digit decimal words (`[-100, 100)` then four `[0, 100)` words).
pub const ACC_BYTES: usize = 11;
/// Number of accumulators the host exposes (`acc[20]` in `vm.h`).
pub const ACC_COUNT: usize = 20;
/// Function tables per checkpoint (`ft[3]` in `vm.h`).
pub const FT_COUNT: usize = 3;
/// Rows per host-side function table; the first two rows (`0`, `1`) are
/// unused padding carried over from the original ENIAC panel layout —
/// only rows `2..104` decode into `eniacvm-core`'s 100-row banks.
pub const FT_ROWS: usize = 104;
/// Digit columns per host-side function-table row.
pub const FT_COLUMNS: usize = 14;

/// Host checkpoint state, exchanged with [`crate::bridge::import`] and
/// [`crate::bridge::export`]. Field layout matches `vm.h`'s `ENIAC` in
/// spirit (not byte-for-byte, since this is a plain Rust struct, not an
/// FFI boundary — `eniacvm-ffi` owns the `#[repr(C)]` mirror of this shape).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eniac {
    /// Cycle count at the checkpoint.
    pub cycles: u64,
    /// Nonzero if the VM had latched an error at the checkpoint.
    pub error_code: i32,
    /// Set when the VM hit I/O, a breakpoint, or halted; tells the outer
    /// simulator to take over for this checkpoint rather than trust it.
    pub rollback: bool,
    /// Twenty packed accumulators, ASCII `[PM]` followed by ten digits.
    pub acc: [[u8; ACC_BYTES]; ACC_COUNT],
    /// Three 104x14 digit function tables.
    pub ft: [[[i32; FT_COLUMNS]; FT_ROWS]; FT_COUNT],
}

impl Default for Eniac {
    fn default() -> Self {
        let mut acc = [[0u8; ACC_BYTES]; ACC_COUNT];
        for word in &mut acc {
            *word = *b"P0000000000";
        }
        Self {
            cycles: 0,
            error_code: 0,
            rollback: false,
            acc,
            ft: [[[0; FT_COLUMNS]; FT_ROWS]; FT_COUNT],
        }
    }
}

impl Eniac {
    /// A zeroed checkpoint with every accumulator reading `P0000000000`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_accumulators_are_positive_zero() {
        let eniac = Eniac::new();
        for word in eniac.acc {
            assert_eq!(&word, b"P0000000000");
        }
    }
}
