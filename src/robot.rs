use std::sync::Arc;

use tracing::trace;

use crate::error::ExecError;
use crate::instruction::{Instruction, LineNumber};
use crate::program::Program;

/// What a call to [`Robot::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// One move was made; the tick was consumed.
    Moved,
    /// A jump reached a halt line. No time was consumed.
    Halted,
    /// The robot was already halted; nothing happened.
    Frozen,
}

/// One robot: a program counter and a position on the line, driven by a
/// shared read-only [`Program`].
///
/// Execution state is either running or halted. Halting is permanent and
/// happens when control jumps to the configured halt line, when a jump
/// targets its own line, or on a fault.
#[derive(Debug, Clone)]
pub struct Robot {
    program: Arc<Program>,
    position: i64,
    pc: LineNumber,
    halt_line: Option<LineNumber>,
    halted: bool,
    fault: Option<ExecError>,
}

impl Robot {
    /// Create a running robot at `position`, about to execute line `entry`.
    ///
    /// `entry` is not checked; an entry outside the program faults on the
    /// first advance.
    pub fn new(
        program: Arc<Program>,
        position: i64,
        entry: LineNumber,
        halt_line: Option<LineNumber>,
    ) -> Self {
        Self {
            program,
            position,
            pc: entry,
            halt_line,
            halted: false,
            fault: None,
        }
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn program_counter(&self) -> LineNumber {
        self.pc
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// The fault that halted this robot, if it halted by faulting.
    pub fn fault(&self) -> Option<ExecError> {
        self.fault
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// Run instant instructions until one move is made or the robot halts.
    ///
    /// `flag` is the only outside state the robot reads. A fault halts the
    /// robot and is returned; later calls report [`Step::Frozen`].
    pub fn advance(&mut self, flag: i64) -> Result<Step, ExecError> {
        if self.halted {
            return Ok(Step::Frozen);
        }

        // Without a move the position is fixed, so each line behaves the same
        // on every visit. More instant steps than lines means a cycle.
        let mut instant_budget = self.program.len();

        loop {
            let Some(instr) = self.program.get(self.pc) else {
                return Err(self.fail(ExecError::OutOfBounds { line: self.pc }));
            };

            match instr {
                Instruction::MoveLeft => {
                    return self.step_past_move(self.position.checked_sub(1));
                }
                Instruction::MoveRight => {
                    return self.step_past_move(self.position.checked_add(1));
                }
                Instruction::BranchIfOnFlag | Instruction::Jump(_) if instant_budget == 0 => {
                    return Err(self.fail(ExecError::NoProgress { line: self.pc }));
                }
                Instruction::BranchIfOnFlag => {
                    instant_budget -= 1;
                    let skip = if self.position == flag { 1 } else { 2 };
                    match self.pc.checked_add(skip) {
                        Some(next) => self.pc = next,
                        None => return Err(self.fail(ExecError::OutOfBounds { line: self.pc })),
                    }
                }
                Instruction::Jump(target) => {
                    instant_budget -= 1;
                    let from = self.pc;
                    self.pc = target;
                    if target == from || Some(target) == self.halt_line {
                        self.halted = true;
                        trace!(from, to = target, position = self.position, "robot halted");
                        return Ok(Step::Halted);
                    }
                }
            }
        }
    }

    fn step_past_move(&mut self, position: Option<i64>) -> Result<Step, ExecError> {
        let Some(position) = position else {
            return Err(self.fail(ExecError::PositionOverflow { line: self.pc }));
        };
        self.position = position;
        match self.pc.checked_add(1) {
            Some(next) => {
                self.pc = next;
                Ok(Step::Moved)
            }
            // The move itself happened; there is just nowhere to continue.
            None => Err(self.fail(ExecError::OutOfBounds { line: self.pc })),
        }
    }

    fn fail(&mut self, err: ExecError) -> ExecError {
        self.halted = true;
        self.fault = Some(err);
        err
    }
}
