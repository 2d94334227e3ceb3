use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::{ExecError, SimError};
use crate::generator::HUNT_LINE;
use crate::instruction::LineNumber;
use crate::program::Program;
use crate::robot::Robot;

/// Configuration for a two-robot run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Start positions of robot A and robot B.
    pub starts: [i64; 2],
    /// Position of the flag. Fixed for the run.
    pub flag: i64,
    /// Ticks allowed before the run is abandoned.
    pub max_ticks: u64,
    /// Line both robots start on.
    pub entry: LineNumber,
    /// Jumping here halts a robot. `None` leaves only self-jumps halting.
    pub halt_line: Option<LineNumber>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            starts: [-5, 10],
            flag: 0,
            max_ticks: 100,
            entry: HUNT_LINE + 1,
            halt_line: Some(HUNT_LINE),
        }
    }
}

/// Observable state of one robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotSnapshot {
    pub position: i64,
    pub program_counter: LineNumber,
    pub halted: bool,
    pub faulted: bool,
}

impl From<&Robot> for RobotSnapshot {
    fn from(robot: &Robot) -> Self {
        Self {
            position: robot.position(),
            program_counter: robot.program_counter(),
            halted: robot.is_halted(),
            faulted: robot.fault().is_some(),
        }
    }
}

/// Both robots as seen after `time` ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub time: u64,
    pub robots: [RobotSnapshot; 2],
}

/// The two robots stood on the same cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meeting {
    pub time: u64,
    pub position: i64,
}

/// Receives progress from a running [`Simulation`].
///
/// Reporting is one-way: nothing a reporter does feeds back into the run.
/// Every method but `on_tick` defaults to doing nothing.
pub trait Reporter {
    /// Called once with the state before the first tick.
    fn on_start(&mut self, _config: &SimConfig, _start: &Snapshot) {}

    /// Called after every tick.
    fn on_tick(&mut self, snapshot: &Snapshot);

    /// Called when robot `robot` (0 or 1) faults during a tick.
    fn on_fault(&mut self, _robot: usize, _time: u64, _err: &ExecError) {}

    /// Called once with the result of [`Simulation::run`].
    fn on_finish(&mut self, _outcome: &Result<Meeting, SimError>) {}
}

/// The null reporter.
impl Reporter for () {
    fn on_tick(&mut self, _snapshot: &Snapshot) {}
}

/// Records every tick, in order.
impl Reporter for Vec<Snapshot> {
    fn on_tick(&mut self, snapshot: &Snapshot) {
        self.push(*snapshot);
    }
}

/// Two robots running the same program in lockstep on one line.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    robots: [Robot; 2],
    time: u64,
}

impl Simulation {
    pub fn new(config: SimConfig, program: Arc<Program>) -> Self {
        let robots = config.starts.map(|start| {
            Robot::new(program.clone(), start, config.entry, config.halt_line)
        });
        Self {
            config,
            robots,
            time: 0,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn robots(&self) -> &[Robot; 2] {
        &self.robots
    }

    /// Ticks elapsed so far.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            time: self.time,
            robots: [(&self.robots[0]).into(), (&self.robots[1]).into()],
        }
    }

    /// Advance both robots by one unit of time.
    ///
    /// A robot that faults is halted and the fault is returned alongside the
    /// snapshot; the other robot is unaffected.
    pub fn tick(&mut self) -> (Snapshot, [Option<ExecError>; 2]) {
        let flag = self.config.flag;
        let mut faults = [None, None];
        for (idx, robot) in self.robots.iter_mut().enumerate() {
            if let Err(err) = robot.advance(flag) {
                warn!(robot = idx, time = self.time, %err, "robot faulted");
                faults[idx] = Some(err);
            }
        }
        self.time += 1;

        let snapshot = self.snapshot();
        trace!(
            time = snapshot.time,
            a = snapshot.robots[0].position,
            b = snapshot.robots[1].position,
            "tick"
        );
        (snapshot, faults)
    }

    /// Tick until the robots share a cell or the tick budget is spent.
    ///
    /// Positions are compared before each tick, so robots that start together
    /// meet at time 0. The run gives up once more than `max_ticks` ticks have
    /// passed.
    pub fn run<R: Reporter>(&mut self, reporter: &mut R) -> Result<Meeting, SimError> {
        debug!(
            starts = ?self.config.starts,
            flag = self.config.flag,
            max_ticks = self.config.max_ticks,
            "simulation start"
        );
        reporter.on_start(&self.config, &self.snapshot());

        let outcome = loop {
            let [a, b] = [self.robots[0].position(), self.robots[1].position()];
            if a == b {
                break Ok(Meeting {
                    time: self.time,
                    position: a,
                });
            }
            if self.time > self.config.max_ticks {
                break Err(SimError::Timeout {
                    max_ticks: self.config.max_ticks,
                    positions: [a, b],
                });
            }

            let (snapshot, faults) = self.tick();
            for (idx, fault) in faults.iter().enumerate() {
                if let Some(err) = fault {
                    reporter.on_fault(idx, snapshot.time, err);
                }
            }
            reporter.on_tick(&snapshot);
        };

        match &outcome {
            Ok(meeting) => debug!(time = meeting.time, position = meeting.position, "robots met"),
            Err(err) => debug!(%err, "simulation gave up"),
        }
        reporter.on_finish(&outcome);
        outcome
    }
}
