//! Checkpoint bridge between [`eniacvm_core::Vm`] and the host ENIAC
//! checkpoint format (`ENIAC` in `chsim/vm.h`): twenty ASCII accumulators
//! and three 104-row decimal function tables, as the outer `eniacsim`
//! simulator exchanges them at every checkpoint.
//!
//! # Example
//!
//! ```
//! use eniacvm_core::Vm;
//! use eniacvm_host::{bridge, Eniac};
//!
//! let mut vm = Vm::new();
//! let mut eniac = Eniac::new();
//! eniac.acc[0] = *b"P0000000909"; // pc = bank 1, offset 9 -> 109
//! bridge::import(&mut vm, &eniac).unwrap();
//! assert_eq!(vm.pc, 109);
//! ```

#![warn(missing_docs)]

pub mod bridge;
pub mod codec;
pub mod eniac;

pub use codec::HostBridgeError;
pub use eniac::Eniac;
