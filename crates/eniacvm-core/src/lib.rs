//! Cycle-counting checkpoint VM for ISA v4, a small decimal instruction set
//! that runs atop a historical ENIAC-level computing substrate.
//!
//! The VM executes programs stored in a read-only decimal function table,
//! manipulates decimal registers and memory, and exposes a checkpoint
//! discipline (see [`Vm::step`] / [`Vm::step_to`]) that lets an outer host
//! alternate fast execution here with a slower, detailed simulation,
//! rolling back whenever I/O, a breakpoint, or an error occurs.
//!
//! # Example
//!
//! ```
//! use eniacvm_core::Vm;
//!
//! let mut vm = Vm::new();
//! vm.ft.mark_initialized();
//! vm.rf.a = 10;
//! vm.rf.d = 72;
//! vm.ft.set_row(100, [70, 95, 0, 0, 0, 0]); // add D,A ; halt
//! vm.step();
//! assert_eq!(vm.rf.a, 82);
//! ```

#![warn(missing_docs)]

pub mod decimal;
pub mod error;
pub mod fetch;
pub mod format;
pub mod function_table;
pub mod memory;
mod opcodes;
pub mod registers;
pub mod status;
pub mod vm;

pub use error::ErrorFlags;
pub use fetch::InstructionRegister;
pub use function_table::{Bank, FunctionTable};
pub use memory::Memory;
pub use registers::{LoadStore, RegisterFile};
pub use status::Status;
pub use vm::Vm;
