use thiserror::Error;

use crate::instruction::LineNumber;

/// Why a program listing could not be turned into a [`Program`](crate::program::Program).
///
/// `row` is the 1-based row of the listing the problem was found on, which is
/// not necessarily the line number written on that row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedProgram {
    #[error("row {row}: expected `<line>: <instruction>`, got {text:?}")]
    MissingColon { row: usize, text: String },

    #[error("row {row}: invalid line number {text:?}")]
    BadLineNumber { row: usize, text: String },

    #[error("row {row}: line {line} is defined more than once")]
    DuplicateLine { row: usize, line: LineNumber },

    #[error("row {row}: line {line} has no instruction")]
    MissingOpcode { row: usize, line: LineNumber },

    #[error("row {row}: line {line}: unknown instruction {text:?}")]
    UnknownOpcode {
        row: usize,
        line: LineNumber,
        text: String,
    },

    #[error("row {row}: line {line}: GOTO needs a target line")]
    MissingTarget { row: usize, line: LineNumber },

    #[error("row {row}: line {line}: invalid GOTO target {text:?}")]
    BadJumpTarget {
        row: usize,
        line: LineNumber,
        text: String,
    },

    #[error("row {row}: line {line}: unexpected trailing {text:?}")]
    TrailingTokens {
        row: usize,
        line: LineNumber,
        text: String,
    },

    #[error("program has no instructions")]
    Empty,
}

/// A fault raised while a robot executes its program.
///
/// Faults are local: the robot that raised one halts, everything else keeps
/// running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExecError {
    /// The program counter points at a line the program does not define.
    #[error("program counter {line} does not name a program line")]
    OutOfBounds { line: LineNumber },

    /// A move would step past the end of the integer line.
    #[error("move at line {line} leaves the line")]
    PositionOverflow { line: LineNumber },

    /// Only branches and jumps were executed, more of them than the program
    /// has lines, so control is cycling without ever moving.
    #[error("no move reached from line {line}: zero-time loop")]
    NoProgress { line: LineNumber },
}

/// A simulation that ended without the robots meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("robots did not meet within {max_ticks} ticks (positions {positions:?})")]
    Timeout { max_ticks: u64, positions: [i64; 2] },
}

/// Everything that can stop a run before or during setup.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Malformed(#[from] MalformedProgram),

    #[error(transparent)]
    Simulation(#[from] SimError),

    #[error("search power {power} exceeds the maximum of {max}")]
    SearchPowerTooLarge { power: u32, max: u32 },

    #[error("span {span} must be between 1 and {max}")]
    SpanOutOfRange { span: i64, max: i64 },

    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
