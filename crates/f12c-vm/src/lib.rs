//! f12c-vm - The Stack Virtual Machine
//!
//! A register-less, byte-addressed stack machine executing the bytecode
//! produced by the emitter. See [`vm::Vm`] for the machine itself and
//! [`heap::Heap`] for the explicit `new`/`free` allocator.
//!
//! Runtime failures (unknown opcode, division by zero, out of heap
//! memory, malformed pointers) stop the machine and surface as a
//! [`VmError`]; there is no unwinding and no recovery.

mod error;
pub mod heap;
pub mod vm;

pub use error::VmError;
pub use vm::{Vm, VmOptions};
