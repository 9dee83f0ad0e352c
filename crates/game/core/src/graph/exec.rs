use crate::config::CoreConfig;

use super::program::jump_target;
use super::{ExecutionMode, Flow, GraphError, GraphExecutionState, OpcodeTable, Program};

/// Outcome of a completed invocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Instructions retired.
    pub steps: u32,
    /// Whether a `Halt` ended the program before its last instruction.
    pub halted: bool,
}

/// Runs `program` against `state`.
///
/// Execution is linear except for relative jumps and stops at the end of the
/// program, on `Halt`, or when [`CoreConfig::MAX_GRAPH_STEPS`] instructions
/// have retired.
pub fn execute(
    state: &mut GraphExecutionState<'_>,
    program: &Program,
    table: &OpcodeTable,
) -> Result<ExecutionReport, GraphError> {
    let instructions = program.instructions();
    let mut report = ExecutionReport::default();
    let mut pc = 0usize;

    while pc < instructions.len() {
        if report.steps >= CoreConfig::MAX_GRAPH_STEPS {
            return Err(GraphError::StepBudgetExceeded {
                steps: CoreConfig::MAX_GRAPH_STEPS,
            });
        }
        let instruction = &instructions[pc];
        if state.mode == ExecutionMode::Validation && instruction.op.is_mutating() {
            return Err(GraphError::MutationInValidation {
                op: instruction.op,
                pc,
            });
        }

        let flow = table.get(instruction.op)(state, instruction)?;
        report.steps += 1;
        match flow {
            Flow::Next => pc += 1,
            Flow::Halt => {
                report.halted = true;
                break;
            }
            Flow::Jump(offset) => {
                let target = jump_target(pc, offset);
                if target < 0 || target > instructions.len() as i64 {
                    return Err(GraphError::JumpOutOfRange { pc, target });
                }
                pc = target as usize;
            }
        }
    }

    tracing::trace!(
        target: "core::graph",
        steps = report.steps,
        halted = report.halted,
        "graph executed"
    );
    Ok(report)
}

/// Runs a gating program and returns its verdict.
///
/// Bool register 0 starts `true`; the program clears it to deny. Mutating
/// opcodes fail with [`GraphError::MutationInValidation`].
pub fn execute_validation(
    state: &mut GraphExecutionState<'_>,
    program: &Program,
    table: &OpcodeTable,
) -> Result<bool, GraphError> {
    let previous = state.mode;
    state.mode = ExecutionMode::Validation;
    state.registers.bools[0] = true;
    let result = execute(state, program, table);
    state.mode = previous;
    result?;
    Ok(state.registers.bools[0])
}
