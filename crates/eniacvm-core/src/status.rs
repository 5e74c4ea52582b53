//! VM status bitfield.
//!
//! ```text
//! 3  2  1  0
//! P  R  B  H
//! │  │  │  └─ HALT (sticky)
//! │  │  └──── BREAK (transient)
//! │  └─────── IO_READ (transient)
//! └────────── IO_PRINT (transient)
//! ```
//!
//! `HALT` latches and is never cleared by the VM itself. The other three
//! bits are cleared at the start of every `step`/`step_to` call.

use bitflags::bitflags;

bitflags! {
    /// VM status flags (spec.md §6).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Status: u8 {
        /// Execution has halted; sticky, never cleared once set.
        const HALT = 0x01;
        /// A `brk` instruction executed; cleared at the start of the next step.
        const BREAK = 0x02;
        /// A `read` instruction executed; the host must supply input.
        const IO_READ = 0x04;
        /// A `print` instruction executed; the host must consume `A`/`B`.
        const IO_PRINT = 0x08;
    }
}

impl Status {
    /// Flags cleared at the start of every `step`/`step_to` call.
    pub const TRANSIENT: Self = Self::BREAK.union(Self::IO_READ).union(Self::IO_PRINT);

    /// Clears the transient status bits, leaving `HALT` untouched.
    #[inline]
    pub fn clear_transient(&mut self) {
        self.remove(Self::TRANSIENT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        assert_eq!(Status::default(), Status::empty());
    }

    #[test]
    fn clear_transient_keeps_halt() {
        let mut status = Status::HALT | Status::BREAK | Status::IO_READ | Status::IO_PRINT;
        status.clear_transient();
        assert_eq!(status, Status::HALT);
    }

    #[test]
    fn clear_transient_on_empty_is_noop() {
        let mut status = Status::empty();
        status.clear_transient();
        assert!(status.is_empty());
    }
}
