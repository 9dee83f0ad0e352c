use crate::config::CoreConfig;

use super::{GraphInstruction, ProgramError};

/// An immutable, validated instruction sequence.
///
/// Construction checks the length limit and that every jump lands inside
/// `0..=len` (landing on `len` ends the program).
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    instructions: Vec<GraphInstruction>,
}

impl Program {
    pub fn new(instructions: Vec<GraphInstruction>) -> Result<Self, ProgramError> {
        let len = instructions.len();
        if len > CoreConfig::MAX_PROGRAM_LEN {
            return Err(ProgramError::TooLong {
                len,
                max: CoreConfig::MAX_PROGRAM_LEN,
            });
        }
        for (pc, instruction) in instructions.iter().enumerate() {
            if !instruction.op.is_jump() {
                continue;
            }
            let target = jump_target(pc, instruction.imm_int);
            if target < 0 || target > len as i64 {
                return Err(ProgramError::JumpOutOfRange { pc, target, len });
            }
        }
        Ok(Self { instructions })
    }

    pub fn instructions(&self) -> &[GraphInstruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Absolute target of a jump at `pc` with relative `offset`.
pub(crate) fn jump_target(pc: usize, offset: i32) -> i64 {
    pc as i64 + 1 + offset as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_jump_past_end() {
        let error = Program::new(vec![
            GraphInstruction::const_int(0, 1),
            GraphInstruction::jump(5),
        ])
        .unwrap_err();
        assert_eq!(
            error,
            ProgramError::JumpOutOfRange {
                pc: 1,
                target: 7,
                len: 2
            }
        );
    }

    #[test]
    fn accepts_jump_to_end_and_backwards() {
        let program = Program::new(vec![
            GraphInstruction::const_int(0, 1),
            GraphInstruction::jump(0),
            GraphInstruction::jump(-3),
        ]);
        assert!(program.is_ok());
    }

    #[test]
    fn rejects_oversized_program() {
        let instructions = vec![GraphInstruction::halt(); CoreConfig::MAX_PROGRAM_LEN + 1];
        assert!(matches!(
            Program::new(instructions),
            Err(ProgramError::TooLong { .. })
        ));
    }
}
