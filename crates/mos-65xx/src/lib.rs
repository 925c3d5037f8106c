//! MOS 6502-family CPU emulator.
//!
//! Cycle-accurate whole-instruction execution against a pluggable memory
//! bus, with selectable chip personalities:
//!
//! - [`Variant::Nmos6502`] — the original NMOS part, including its
//!   indirect-jump page-wrap bug and binary-derived decimal-mode flags.
//!   Undocumented opcodes are not modeled; fetching one is a fatal decode
//!   fault.
//! - [`Variant::Cmos65C02`] — the CMOS redesign: new instructions and
//!   addressing modes, the indirect-jump bug fixed, corrected decimal-mode
//!   flags (at the cost of a cycle), and every leftover opcode a documented
//!   no-op.
//!
//! Timing counts everything: base instruction cycles, page-cross and
//! branch penalties, interrupt and reset sequences, and whatever mapped
//! devices charge for their accesses. The session clock is shared between
//! the CPU and the bus, so device time and CPU time land on one timeline.

mod addressing;
mod cpu;
pub mod flags;
mod instruction;
mod registers;
mod system;
mod variant;

pub use addressing::{Operand, Resolved};
pub use cpu::{Fault, IRQ_VECTOR, Mos65xx, NMI_VECTOR, RESET_VECTOR, State, StepError};
pub use flags::Status;
pub use instruction::{AddressingMode, Instruction, InstructionSet, Mnemonic};
pub use registers::Registers;
pub use system::{BuildError, System, SystemBuilder};
pub use variant::Variant;
