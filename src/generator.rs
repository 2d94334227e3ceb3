use crate::error::{Error, MalformedProgram, Result};
use crate::instruction::{Instruction, LineNumber};
use crate::program::Program;

/// Largest search power the generator accepts. The listing grows as
/// `18 * 2^power` lines, so this keeps a full listing near a million rows.
pub const MAX_SEARCH_POWER: u32 = 16;

/// The line every successful flag check jumps to.
pub const HUNT_LINE: LineNumber = 1;

/// What a robot does once its flag check succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HuntMode {
    /// The hunt line is a self-jump: the robot halts on the flag.
    #[default]
    Rest,
    /// The hunt block steps right forever (`1: MR`, `2: GOTO 1`).
    Chase,
}

/// A generated expanding-search program in listing form, together with the
/// line robots start on and the line that halts them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchProgram {
    pub listing: Vec<String>,
    pub entry: LineNumber,
    pub halt_line: Option<LineNumber>,
    /// The trailing self-jump.
    pub sentinel: LineNumber,
}

impl SearchProgram {
    /// Generate the search for powers `0..power`.
    ///
    /// For each power `p`, with `d = 2^p`, the robot walks `d` cells right,
    /// `d` left, `2d` left and `2d` right, checking for the flag after every
    /// single step. Each step takes three lines:
    ///
    /// ```text
    /// n:   MR        (or ML)
    /// n+1: IF FLAG
    /// n+2: GOTO 1    (skipped when the check fails)
    /// ```
    ///
    /// The listing ends with a self-jump sentinel so a robot that exhausts
    /// the search halts instead of running off the end. With `power == 0`
    /// the entry line is that sentinel.
    pub fn generate(power: u32, mode: HuntMode) -> Result<Self> {
        if power > MAX_SEARCH_POWER {
            return Err(Error::SearchPowerTooLarge {
                power,
                max: MAX_SEARCH_POWER,
            });
        }

        let mut listing = Vec::with_capacity(3 * move_count(power) as usize + 3);
        let emit = |listing: &mut Vec<String>, line: LineNumber, instr: Instruction| {
            listing.push(format!("{line}: {instr}"));
        };

        let (entry, halt_line) = match mode {
            HuntMode::Rest => {
                emit(&mut listing, HUNT_LINE, Instruction::Jump(HUNT_LINE));
                (HUNT_LINE + 1, Some(HUNT_LINE))
            }
            HuntMode::Chase => {
                emit(&mut listing, HUNT_LINE, Instruction::MoveRight);
                emit(&mut listing, HUNT_LINE + 1, Instruction::Jump(HUNT_LINE));
                (HUNT_LINE + 2, None)
            }
        };

        let mut line = entry;
        for p in 0..power {
            let d = 1u32 << p;
            let phases = [
                (Instruction::MoveRight, d),
                (Instruction::MoveLeft, d),
                (Instruction::MoveLeft, 2 * d),
                (Instruction::MoveRight, 2 * d),
            ];
            for (step, count) in phases {
                for _ in 0..count {
                    emit(&mut listing, line, step);
                    emit(&mut listing, line + 1, Instruction::BranchIfOnFlag);
                    emit(&mut listing, line + 2, Instruction::Jump(HUNT_LINE));
                    line += 3;
                }
            }
        }

        emit(&mut listing, line, Instruction::Jump(line));

        Ok(Self {
            listing,
            entry,
            halt_line,
            sentinel: line,
        })
    }

    /// Parse the listing into an executable program.
    pub fn compile(&self) -> Result<Program, MalformedProgram> {
        Program::parse(&self.listing)
    }
}

/// Total moves in a search of the given power: `6 * 2^p` per power level.
pub fn move_count(power: u32) -> u64 {
    (0..power).map(|p| 6u64 << p).sum()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn listing_always_parses(power in 0u32..=8, chase in any::<bool>()) {
            let mode = if chase { HuntMode::Chase } else { HuntMode::Rest };
            let search = SearchProgram::generate(power, mode).unwrap();
            let program = search.compile().unwrap();
            prop_assert_eq!(program.len(), search.listing.len());
            prop_assert!(program.get(search.entry).is_some());
        }

        #[test]
        fn rest_mode_has_hunt_and_sentinel_self_jumps(power in 0u32..=8) {
            let search = SearchProgram::generate(power, HuntMode::Rest).unwrap();
            let program = search.compile().unwrap();
            let jumps: Vec<LineNumber> = program.self_jumps().collect();
            prop_assert_eq!(jumps, vec![HUNT_LINE, search.sentinel]);
            // The sentinel is the last line.
            prop_assert_eq!(program.iter().last().map(|(l, _)| l), Some(search.sentinel));
        }

        #[test]
        fn move_total_matches_doubling_sum(power in 0u32..=8) {
            let search = SearchProgram::generate(power, HuntMode::Rest).unwrap();
            let program = search.compile().unwrap();
            let expected: u64 = (0..power).map(|p| {
                let d = 1u64 << p;
                d + d + 2 * d + 2 * d
            }).sum();
            prop_assert_eq!(program.move_count() as u64, expected);
            prop_assert_eq!(
                u64::from(search.sentinel),
                u64::from(search.entry) + 3 * expected
            );
        }

        #[test]
        fn every_move_is_followed_by_check_and_hunt_jump(power in 1u32..=6) {
            let search = SearchProgram::generate(power, HuntMode::Rest).unwrap();
            let program = search.compile().unwrap();
            for (line, instr) in program.iter() {
                if instr.is_move() {
                    prop_assert_eq!(program.get(line + 1), Some(Instruction::BranchIfOnFlag));
                    prop_assert_eq!(program.get(line + 2), Some(Instruction::Jump(HUNT_LINE)));
                }
            }
        }
    }
}
