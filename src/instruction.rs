use std::fmt;

use crate::error::MalformedProgram;

/// A line number in a program listing. Always positive.
pub type LineNumber = u32;

const MOVE_LEFT: &str = "ML";
const MOVE_RIGHT: &str = "MR";
const IF: &str = "IF";
const FLAG: &str = "FLAG";
const GOTO: &str = "GOTO";

/// The robot instruction set.
///
/// Moves take one unit of simulated time. Branches and jumps are instant:
/// they only redirect control before the next move.
///
/// Text forms:
/// - `ML`: step one cell left
/// - `MR`: step one cell right
/// - `IF FLAG`: fall through to the next line when standing on the flag,
///   otherwise skip it
/// - `GOTO n`: continue at line `n`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    MoveLeft,
    MoveRight,
    BranchIfOnFlag,
    Jump(LineNumber),
}

impl Instruction {
    /// True for the instructions that consume a tick.
    pub fn is_move(self) -> bool {
        matches!(self, Instruction::MoveLeft | Instruction::MoveRight)
    }

    /// Decode the text after the colon of listing line `line`.
    ///
    /// `row` is only used to locate errors in the listing.
    pub fn parse(row: usize, line: LineNumber, body: &str) -> Result<Self, MalformedProgram> {
        let mut tokens = body.split_whitespace();
        let opcode = tokens
            .next()
            .ok_or(MalformedProgram::MissingOpcode { row, line })?;

        let instr = match opcode {
            MOVE_LEFT => Instruction::MoveLeft,
            MOVE_RIGHT => Instruction::MoveRight,
            IF => match tokens.next() {
                Some(FLAG) => Instruction::BranchIfOnFlag,
                other => {
                    return Err(MalformedProgram::UnknownOpcode {
                        row,
                        line,
                        text: match other {
                            Some(t) => format!("{IF} {t}"),
                            None => IF.to_string(),
                        },
                    });
                }
            },
            GOTO => {
                let target = tokens
                    .next()
                    .ok_or(MalformedProgram::MissingTarget { row, line })?;
                match target.parse::<LineNumber>() {
                    Ok(t) if t > 0 => Instruction::Jump(t),
                    _ => {
                        return Err(MalformedProgram::BadJumpTarget {
                            row,
                            line,
                            text: target.to_string(),
                        });
                    }
                }
            }
            other => {
                return Err(MalformedProgram::UnknownOpcode {
                    row,
                    line,
                    text: other.to_string(),
                });
            }
        };

        let rest: Vec<&str> = tokens.collect();
        if !rest.is_empty() {
            return Err(MalformedProgram::TrailingTokens {
                row,
                line,
                text: rest.join(" "),
            });
        }
        Ok(instr)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::MoveLeft => f.write_str(MOVE_LEFT),
            Instruction::MoveRight => f.write_str(MOVE_RIGHT),
            Instruction::BranchIfOnFlag => write!(f, "{IF} {FLAG}"),
            Instruction::Jump(target) => write!(f, "{GOTO} {target}"),
        }
    }
}
