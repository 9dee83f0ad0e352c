use strum::{EnumCount, IntoEnumIterator};

use super::{Flow, GraphError, GraphExecutionState, GraphInstruction, Opcode, ops};

/// Native implementation of one opcode.
pub type OpHandler =
    fn(&mut GraphExecutionState<'_>, &GraphInstruction) -> Result<Flow, GraphError>;

/// Flat opcode → handler table.
///
/// [`OpcodeTable::standard`] wires every opcode to its built-in handler;
/// embedders can replace individual entries with [`OpcodeTable::set`].
#[derive(Clone)]
pub struct OpcodeTable {
    handlers: [OpHandler; Opcode::COUNT],
}

impl OpcodeTable {
    pub fn standard() -> Self {
        let mut handlers: [OpHandler; Opcode::COUNT] =
            [ops::handler_for(Opcode::Halt); Opcode::COUNT];
        for op in Opcode::iter() {
            handlers[op as usize] = ops::handler_for(op);
        }
        Self { handlers }
    }

    pub fn set(&mut self, op: Opcode, handler: OpHandler) {
        self.handlers[op as usize] = handler;
    }

    #[inline]
    pub fn get(&self, op: Opcode) -> OpHandler {
        self.handlers[op as usize]
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl core::fmt::Debug for OpcodeTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OpcodeTable")
            .field("opcodes", &Opcode::COUNT)
            .finish()
    }
}
