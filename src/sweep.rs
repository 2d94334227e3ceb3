use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rayon::prelude::*;

use crate::error::{Error, Result, SimError};
use crate::program::Program;
use crate::world::{Meeting, SimConfig, Simulation};

/// Largest accepted `span`. Starts lie within `2 * span` of zero, leaving
/// room for the search to walk without leaving `i64`.
pub const MAX_SPAN: i64 = i64::MAX / 4;

/// Configuration for a batch of randomly placed runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Number of runs.
    pub trials: usize,
    /// Seed for scenario placement.
    pub seed: u64,
    /// The flag lies in `[-span, span]`; each robot at most `span` cells
    /// from it, one on either side.
    pub span: i64,
    /// Template for every run. `starts` and `flag` are overwritten.
    pub base: SimConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            trials: 1000,
            seed: 0,
            span: 16,
            base: SimConfig::default(),
        }
    }
}

/// One finished run of a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trial {
    pub config: SimConfig,
    pub outcome: Result<Meeting, SimError>,
}

/// Aggregate results of a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepSummary {
    pub trials: usize,
    pub met: usize,
    pub timed_out: usize,
    /// Mean meeting time over the runs that met, 0.0 if none did.
    pub mean_time: f64,
    pub max_time: u64,
}

/// Draw the scenarios for a sweep. Robot A starts left of the flag and
/// robot B right of it.
///
/// Drawing is sequential so the same seed always gives the same scenarios,
/// regardless of how the runs are later scheduled. `span` must lie in
/// `1..=MAX_SPAN`.
pub fn scenarios(config: &SweepConfig) -> Result<Vec<SimConfig>> {
    let span = config.span;
    if !(1..=MAX_SPAN).contains(&span) {
        return Err(Error::SpanOutOfRange {
            span,
            max: MAX_SPAN,
        });
    }
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let drawn: Vec<SimConfig> = (0..config.trials)
        .map(|_| {
            let flag = rng.gen_range(-span..=span);
            let a = flag - rng.gen_range(1..=span);
            let b = flag + rng.gen_range(1..=span);
            SimConfig {
                starts: [a, b],
                flag,
                ..config.base.clone()
            }
        })
        .collect();
    Ok(drawn)
}

/// Run every scenario of the sweep against one shared program, in parallel.
/// Results come back in scenario order.
pub fn run_sweep(config: &SweepConfig, program: &Arc<Program>) -> Result<Vec<Trial>> {
    let trials: Vec<Trial> = scenarios(config)?
        .into_par_iter()
        .map(|scenario| {
            let mut sim = Simulation::new(scenario.clone(), Arc::clone(program));
            let outcome = sim.run(&mut ());
            Trial {
                config: scenario,
                outcome,
            }
        })
        .collect();
    Ok(trials)
}

pub fn summarize(trials: &[Trial]) -> SweepSummary {
    let times: Vec<u64> = trials
        .iter()
        .filter_map(|t| t.outcome.as_ref().ok().map(|m| m.time))
        .collect();
    let met = times.len();
    let mean_time = if met == 0 {
        0.0
    } else {
        times.iter().sum::<u64>() as f64 / met as f64
    };
    SweepSummary {
        trials: trials.len(),
        met,
        timed_out: trials.len() - met,
        mean_time,
        max_time: times.iter().copied().max().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{HuntMode, SearchProgram};

    fn rest_program(power: u32) -> (Arc<Program>, SimConfig) {
        let search = SearchProgram::generate(power, HuntMode::Rest).unwrap();
        let base = SimConfig {
            entry: search.entry,
            halt_line: search.halt_line,
            max_ticks: 2000,
            ..SimConfig::default()
        };
        (Arc::new(search.compile().unwrap()), base)
    }

    #[test]
    fn test_scenarios_deterministic() {
        let config = SweepConfig {
            trials: 50,
            seed: 42,
            ..Default::default()
        };
        assert_eq!(scenarios(&config).unwrap(), scenarios(&config).unwrap());
        let other = SweepConfig { seed: 43, ..config.clone() };
        assert_ne!(scenarios(&config).unwrap(), scenarios(&other).unwrap());
    }

    #[test]
    fn test_scenarios_place_flag_between_robots() {
        let config = SweepConfig {
            trials: 200,
            seed: 7,
            span: 5,
            ..Default::default()
        };
        for s in scenarios(&config).unwrap() {
            let [a, b] = s.starts;
            assert!(a < s.flag && s.flag < b);
            assert!((-5..=5).contains(&s.flag));
            assert!(s.flag - a <= 5 && b - s.flag <= 5);
        }
    }

    #[test]
    fn test_sweep_matches_sequential_runs() {
        let (program, base) = rest_program(4);
        let config = SweepConfig {
            trials: 64,
            seed: 1,
            span: 8,
            base,
        };
        let trials = run_sweep(&config, &program).unwrap();
        assert_eq!(trials.len(), 64);
        for (trial, scenario) in trials.iter().zip(scenarios(&config).unwrap()) {
            assert_eq!(trial.config, scenario);
            let mut sim = Simulation::new(scenario, program.clone());
            assert_eq!(sim.run(&mut ()), trial.outcome);
        }
    }

    #[test]
    fn test_flags_within_reach_always_meet() {
        // Power 5 reaches 16 cells right and 32 left, so every span-8
        // scenario halts both robots on the flag.
        let (program, base) = rest_program(5);
        let config = SweepConfig {
            trials: 100,
            seed: 3,
            span: 8,
            base,
        };
        let trials = run_sweep(&config, &program).unwrap();
        for t in &trials {
            let meeting = t.outcome.as_ref().unwrap();
            assert_eq!(meeting.position, t.config.flag);
        }
        let summary = summarize(&trials);
        assert_eq!(summary.met, 100);
        assert_eq!(summary.timed_out, 0);
        assert!(summary.mean_time > 0.0);
        assert!(summary.max_time as f64 >= summary.mean_time);
    }

    #[test]
    fn test_widest_span_draws_without_overflow() {
        let config = SweepConfig {
            trials: 200,
            seed: 0,
            span: MAX_SPAN,
            ..Default::default()
        };
        for s in scenarios(&config).unwrap() {
            let [a, b] = s.starts;
            assert!(a < s.flag && s.flag < b);
            assert!(a >= -2 * MAX_SPAN && b <= 2 * MAX_SPAN);
        }
    }

    #[test]
    fn test_span_out_of_range_is_rejected() {
        for span in [0, -3, MAX_SPAN + 1, i64::MAX] {
            let config = SweepConfig {
                trials: 5,
                span,
                ..Default::default()
            };
            assert!(
                matches!(
                    scenarios(&config),
                    Err(Error::SpanOutOfRange { span: s, max }) if s == span && max == MAX_SPAN
                ),
                "span {span} should be rejected"
            );
        }
    }

    #[test]
    fn test_widest_span_runs_without_overflow() {
        let (program, base) = rest_program(3);
        let config = SweepConfig {
            trials: 20,
            seed: 9,
            span: MAX_SPAN,
            base: SimConfig { max_ticks: 200, ..base },
        };
        let trials = run_sweep(&config, &program).unwrap();
        assert_eq!(trials.len(), 20);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.trials, 0);
        assert_eq!(summary.met, 0);
        assert_eq!(summary.mean_time, 0.0);
        assert_eq!(summary.max_time, 0);
    }
}
