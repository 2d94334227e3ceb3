use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use flagbots::error::{Error, ExecError, MalformedProgram, Result, SimError};
use flagbots::generator::{HuntMode, MAX_SEARCH_POWER, SearchProgram};
use flagbots::instruction::LineNumber;
use flagbots::program::Program;
use flagbots::sweep::{MAX_SPAN, SweepConfig, run_sweep, summarize};
use flagbots::world::{Meeting, Reporter, SimConfig, Simulation, Snapshot};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(
    name = "flagbots",
    about = "Two robots search a line for a flag, then meet",
    allow_negative_numbers = true
)]
struct Cli {
    /// Start position of robot A.
    #[arg(long, default_value_t = -5)]
    left: i64,

    /// Start position of robot B.
    #[arg(long, default_value_t = 10)]
    right: i64,

    /// Position of the flag.
    #[arg(long, default_value_t = 0)]
    flag: i64,

    /// Search power: the generated search doubles its reach this many times.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(0..=MAX_SEARCH_POWER as i64))]
    power: u32,

    /// Give up after this many ticks.
    #[arg(long, default_value_t = 100)]
    max_ticks: u64,

    /// What a robot does after finding the flag.
    #[arg(long, value_enum, default_value_t = Hunt::Rest)]
    hunt: Hunt,

    /// Run a program listing from a file instead of the generated search.
    #[arg(long)]
    program: Option<String>,

    /// Line to start on (default: the search entry, or the first line of --program).
    #[arg(long)]
    entry: Option<LineNumber>,

    /// Line that halts a robot when jumped to.
    #[arg(long)]
    halt_line: Option<LineNumber>,

    /// Pause between ticks, in milliseconds.
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Only print the start and the result.
    #[arg(long)]
    quiet: bool,

    /// Print the program listing and exit.
    #[arg(long)]
    listing: bool,

    /// Run this many randomly placed scenarios instead of one; prints CSV.
    #[arg(long)]
    trials: Option<usize>,

    /// Random seed for --trials.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Maximum distance of the flag from 0 and of each robot from the flag, for --trials.
    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(i64).range(1..=MAX_SPAN))]
    span: i64,
}

#[derive(Clone, Copy, ValueEnum)]
enum Hunt {
    Rest,
    Chase,
}

impl From<Hunt> for HuntMode {
    fn from(hunt: Hunt) -> Self {
        match hunt {
            Hunt::Rest => HuntMode::Rest,
            Hunt::Chase => HuntMode::Chase,
        }
    }
}

/// Narrates a run on stdout, one line per tick.
struct Console {
    quiet: bool,
    delay: Duration,
}

fn robot_label(idx: usize) -> char {
    if idx == 0 { 'A' } else { 'B' }
}

impl Reporter for Console {
    fn on_start(&mut self, config: &SimConfig, start: &Snapshot) {
        println!(
            "Start. Robot A: {}, robot B: {}, flag: {}",
            start.robots[0].position, start.robots[1].position, config.flag
        );
        println!("{}", "-".repeat(40));
    }

    fn on_tick(&mut self, snapshot: &Snapshot) {
        if self.quiet {
            return;
        }
        let [a, b] = snapshot.robots.map(|r| {
            let state = if r.faulted {
                " fault"
            } else if r.halted {
                " halt"
            } else {
                ""
            };
            format!("{:>5} (pc {:>4}){state}", r.position, r.program_counter)
        });
        println!("time {:>4} | A {a} | B {b}", snapshot.time);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }

    fn on_fault(&mut self, robot: usize, time: u64, err: &ExecError) {
        println!("time {time:>4} | robot {} stopped: {err}", robot_label(robot));
    }

    fn on_finish(&mut self, outcome: &Result<Meeting, SimError>) {
        println!("{}", "-".repeat(40));
        if let Ok(meeting) = outcome {
            println!(
                "Met at position {} after {} ticks.",
                meeting.position, meeting.time
            );
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default
/// `warn` filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load or generate the program, and work out where robots start and halt.
fn load_program(cli: &Cli) -> Result<(Program, LineNumber, Option<LineNumber>)> {
    match &cli.program {
        Some(path) => {
            let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            let program = Program::parse_str(&source)?;
            let entry = match cli.entry {
                Some(line) => line,
                None => program.first_line().ok_or(MalformedProgram::Empty)?,
            };
            Ok((program, entry, cli.halt_line))
        }
        None => {
            let search = SearchProgram::generate(cli.power, cli.hunt.into())?;
            let program = search.compile()?;
            Ok((
                program,
                cli.entry.unwrap_or(search.entry),
                cli.halt_line.or(search.halt_line),
            ))
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let (program, entry, halt_line) = load_program(cli)?;
    if cli.listing {
        print!("{program}");
        return Ok(());
    }

    let program = Arc::new(program);
    let base = SimConfig {
        starts: [cli.left, cli.right],
        flag: cli.flag,
        max_ticks: cli.max_ticks,
        entry,
        halt_line,
    };

    if let Some(trials) = cli.trials {
        return run_trials(base, &program, trials, cli.seed, cli.span);
    }

    let mut sim = Simulation::new(base, program);
    let mut console = Console {
        quiet: cli.quiet,
        delay: Duration::from_millis(cli.delay_ms),
    };
    sim.run(&mut console)?;
    Ok(())
}

fn run_trials(
    base: SimConfig,
    program: &Arc<Program>,
    trials: usize,
    seed: u64,
    span: i64,
) -> Result<()> {
    let config = SweepConfig {
        trials,
        seed,
        span,
        base,
    };

    let start = std::time::Instant::now();
    let results = run_sweep(&config, program)?;
    let elapsed = start.elapsed();

    println!("flag,a,b,met,time,position");
    for trial in &results {
        let [a, b] = trial.config.starts;
        match trial.outcome {
            Ok(m) => println!("{},{a},{b},1,{},{}", trial.config.flag, m.time, m.position),
            Err(SimError::Timeout { max_ticks, .. }) => {
                println!("{},{a},{b},0,{max_ticks},", trial.config.flag)
            }
        }
    }

    let summary = summarize(&results);
    eprintln!("Sweep results:");
    eprintln!("  Trials:      {}", summary.trials);
    eprintln!("  Met:         {}", summary.met);
    eprintln!("  Timed out:   {}", summary.timed_out);
    eprintln!("  Mean time:   {:.1}", summary.mean_time);
    eprintln!("  Max time:    {}", summary.max_time);
    eprintln!("  Elapsed:     {elapsed:.2?}");
    Ok(())
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
