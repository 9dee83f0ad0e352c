//! Phase-graph register VM.
//!
//! A [`Program`] is a flat list of [`GraphInstruction`]s executed against
//! caller-owned [`RegisterBanks`]. There is no call stack; control flow is
//! limited to relative jumps and every invocation is capped by a step
//! budget. Opcode handlers are plain function pointers in an
//! [`OpcodeTable`], so the instruction set can be extended without dynamic
//! dispatch.
mod error;
mod exec;
mod opcode;
mod ops;
mod program;
mod registers;
mod state;
mod table;

pub use error::{GraphError, ProgramError, RegisterBank};
pub use exec::{ExecutionReport, execute, execute_validation};
pub use opcode::{GraphInstruction, Opcode};
pub use program::Program;
pub use registers::RegisterBanks;
pub use state::{ExecutionMode, Flow, GraphApi, GraphExecutionState, TriggerContext};
pub use table::{OpHandler, OpcodeTable};
