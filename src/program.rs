use std::collections::BTreeMap;
use std::fmt;

use crate::error::MalformedProgram;
use crate::instruction::{Instruction, LineNumber};

/// A parsed robot program: a table from line number to instruction.
///
/// Line numbers need not be contiguous or sorted in the source listing.
/// A `Program` is never modified after parsing, so two robots can share one
/// through an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    lines: BTreeMap<LineNumber, Instruction>,
}

impl Program {
    /// Parse a listing of `"<line>: <instruction>"` rows.
    ///
    /// Blank rows are skipped, and anything after a `#` is a comment.
    pub fn parse<I, S>(listing: I) -> Result<Self, MalformedProgram>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lines = BTreeMap::new();

        for (idx, raw) in listing.into_iter().enumerate() {
            let row = idx + 1;
            let text = raw.as_ref();
            let text = match text.find('#') {
                Some(hash) => &text[..hash],
                None => text,
            };
            if text.trim().is_empty() {
                continue;
            }

            let (number, body) = text.split_once(':').ok_or_else(|| {
                MalformedProgram::MissingColon {
                    row,
                    text: text.trim().to_string(),
                }
            })?;

            let line = match number.trim().parse::<LineNumber>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(MalformedProgram::BadLineNumber {
                        row,
                        text: number.trim().to_string(),
                    });
                }
            };

            let instr = Instruction::parse(row, line, body)?;
            if lines.insert(line, instr).is_some() {
                return Err(MalformedProgram::DuplicateLine { row, line });
            }
        }

        if lines.is_empty() {
            return Err(MalformedProgram::Empty);
        }
        Ok(Self { lines })
    }

    /// Parse a whole text blob, one instruction per line.
    pub fn parse_str(source: &str) -> Result<Self, MalformedProgram> {
        Self::parse(source.lines())
    }

    /// The instruction at `line`, if the program defines it.
    #[inline]
    pub fn get(&self, line: LineNumber) -> Option<Instruction> {
        self.lines.get(&line).copied()
    }

    /// Number of defined lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The lowest line number, used as the entry point when none is given.
    pub fn first_line(&self) -> Option<LineNumber> {
        self.lines.keys().next().copied()
    }

    /// Iterate over `(line, instruction)` in ascending line order.
    pub fn iter(&self) -> impl Iterator<Item = (LineNumber, Instruction)> + '_ {
        self.lines.iter().map(|(&line, &instr)| (line, instr))
    }

    /// Lines holding a `GOTO` back to themselves.
    pub fn self_jumps(&self) -> impl Iterator<Item = LineNumber> + '_ {
        self.iter()
            .filter(|&(line, instr)| instr == Instruction::Jump(line))
            .map(|(line, _)| line)
    }

    /// Number of instructions that consume time.
    pub fn move_count(&self) -> usize {
        self.lines.values().filter(|i| i.is_move()).count()
    }
}

/// Renders the program back into the listing format accepted by
/// [`Program::parse`], in ascending line order.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (line, instr) in self.iter() {
            writeln!(f, "{line}: {instr}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unsorted_sparse_listing() {
        let program = Program::parse([
            "100: MR",
            "3: GOTO 100",
            "101: IF FLAG",
            "1: MR",
            "2: GOTO 1",
            "102: GOTO 1",
            "103: GOTO 200",
            "200: ML",
        ])
        .unwrap();
        assert_eq!(program.len(), 8);
        assert_eq!(program.first_line(), Some(1));
        assert_eq!(program.get(3), Some(Instruction::Jump(100)));
        assert_eq!(program.get(101), Some(Instruction::BranchIfOnFlag));
        assert_eq!(program.get(4), None);
        assert_eq!(program.move_count(), 3);
    }

    #[test]
    fn test_comments_and_blank_rows_are_skipped() {
        let source = "\
# hunt mode
1: GOTO 1   # rest here

2: MR
";
        let program = Program::parse_str(source).unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(program.get(1), Some(Instruction::Jump(1)));
        assert_eq!(program.get(2), Some(Instruction::MoveRight));
    }

    #[test]
    fn test_missing_colon() {
        let err = Program::parse(["1: MR", "2 ML"]).unwrap_err();
        assert_eq!(
            err,
            MalformedProgram::MissingColon {
                row: 2,
                text: "2 ML".to_string()
            }
        );
    }

    #[test]
    fn test_bad_line_numbers() {
        for bad in ["x: MR", "0: MR", "-4: MR", ": MR"] {
            assert!(
                matches!(
                    Program::parse([bad]),
                    Err(MalformedProgram::BadLineNumber { row: 1, .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_duplicate_line() {
        let err = Program::parse(["1: MR", "2: ML", "1: ML"]).unwrap_err();
        assert_eq!(err, MalformedProgram::DuplicateLine { row: 3, line: 1 });
    }

    #[test]
    fn test_instruction_errors_carry_row() {
        let err = Program::parse(["1: MR", "", "5: HOP"]).unwrap_err();
        assert_eq!(
            err,
            MalformedProgram::UnknownOpcode {
                row: 3,
                line: 5,
                text: "HOP".to_string()
            }
        );
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(
            Program::parse(Vec::<String>::new()),
            Err(MalformedProgram::Empty)
        );
        assert_eq!(
            Program::parse_str("# nothing\n\n"),
            Err(MalformedProgram::Empty)
        );
    }

    #[test]
    fn test_colon_split_is_on_first_colon_only() {
        // The body keeps any later colon and is then rejected as an opcode.
        let err = Program::parse(["1: MR: ML"]).unwrap_err();
        assert!(matches!(err, MalformedProgram::UnknownOpcode { .. }));
    }

    #[test]
    fn test_dangling_jump_is_accepted() {
        let program = Program::parse(["1: GOTO 99"]).unwrap();
        assert_eq!(program.get(1), Some(Instruction::Jump(99)));
    }

    #[test]
    fn test_self_jumps() {
        let program = Program::parse(["1: GOTO 1", "2: MR", "3: GOTO 2", "4: GOTO 4"]).unwrap();
        assert_eq!(program.self_jumps().collect::<Vec<_>>(), vec![1, 4]);
    }

    #[test]
    fn test_display_reparses_to_same_program() {
        let program = Program::parse(["7: IF FLAG", "2: GOTO 7", "3: ML"]).unwrap();
        let text = program.to_string();
        assert_eq!(text, "2: GOTO 7\n3: ML\n7: IF FLAG\n");
        assert_eq!(Program::parse_str(&text).unwrap(), program);
    }
}
