//! Sweetspot CLI
//!
//! Usage:
//!   sweetspot play                              # Interactive session (+/- to adjust)
//!   sweetspot simulate --seed 7 --strategy track  # Headless deterministic run
//!   sweetspot stats [--json]                    # Ledger statistics
//!   sweetspot liquidate                         # Sell all trays for cash
//!   sweetspot export | import <file> | clear    # Ledger maintenance
//!   sweetspot serve --addr 127.0.0.1:3000       # HTTP API server

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sweetspot::core::{run_server, FeedbackEngine, FeedbackSignal, FileStore, Ledger, Session, SessionOutcome};
use sweetspot::types::{
    ActivityEntry, Direction, GameConfig, Outcome, QualityTier, Recorded, ReasonCode, SessionStatus,
    TickOutput,
};
use sweetspot::VERSION;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(
    name = "sweetspot",
    version = VERSION,
    about = "Sweetspot - keep the oven inside a drifting sweet spot",
    long_about = "Sweetspot is a temperature-control game.\n\n\
                  Nudge the temperature up or down to keep it inside a sweet spot\n\
                  that relocates every few seconds. Feedback arrives late. Stay\n\
                  outside too long and the cook fails; survive the whole session\n\
                  and earn trays graded by time spent in the spot.\n\n\
                  Statuses:\n  \
                  NOT_STARTED - Waiting to begin\n  \
                  RUNNING     - Session in progress\n  \
                  SUCCEEDED   - Session completed, trays awarded\n  \
                  FAILED      - Too long outside the sweet spot"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Game configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger file (default: ~/.sweetspot/ledger.json)
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(long, global = true)]
    verbose: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play interactively: '+'/'u' heat up, '-'/'d' cool down, 'q' quit
    Play {
        /// Seed for a reproducible session
        #[arg(long)]
        seed: Option<u64>,

        /// Wall-clock tick rate (default: one tick per configured interval)
        #[arg(long)]
        ticks_per_second: Option<u32>,
    },
    /// Run a whole session headless with a scripted player
    Simulate {
        #[arg(long, default_value_t = 1)]
        seed: u64,

        #[arg(long, value_enum, default_value_t = Strategy::Track)]
        strategy: Strategy,

        /// Record the outcome in the ledger
        #[arg(long)]
        record: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show ledger statistics and recent activity
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sell every tray for cash
    Liquidate,
    /// Print the ledger as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replace the ledger with an exported file
    Import { file: PathBuf },
    /// Wipe the ledger
    Clear,
    /// Run as HTTP API server
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
    },
}

/// Scripted player for `simulate`
#[derive(ValueEnum, Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Strategy {
    /// Step toward the window whenever outside it
    Track,
    /// Never touch the controls
    Idle,
    /// Random nudges
    Random,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    if args.no_color {
        colored::control::set_override(false);
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

async fn run(args: Args) -> CliResult {
    let config = load_config(args.config.as_deref())?;
    let ledger_path = args.ledger.clone().unwrap_or_else(FileStore::default_path);
    debug!(path = %ledger_path.display(), "Using ledger");
    let mut ledger = Ledger::open(FileStore::new(ledger_path));

    let command = args.command.unwrap_or(Command::Play {
        seed: None,
        ticks_per_second: None,
    });

    match command {
        Command::Play { seed, ticks_per_second } => {
            run_play(config, &mut ledger, seed, ticks_per_second).await
        }
        Command::Simulate { seed, strategy, record, json } => {
            run_simulate(config, &mut ledger, seed, strategy, record, json)
        }
        Command::Stats { json } => run_stats(&ledger, json),
        Command::Liquidate => {
            let sale = ledger.liquidate();
            println!(
                "💰 Sold {} trays for ${} (cash: ${})",
                sale.value.trays_sold,
                sale.value.amount.to_string().green().bold(),
                sale.value.cash_balance
            );
            warn_unsaved(&ledger, sale.persisted);
            Ok(())
        }
        Command::Export { output } => {
            let json = ledger.export()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("Ledger exported to {}", path.display());
                }
                None => println!("{}", json),
            }
            Ok(())
        }
        Command::Import { file } => {
            let json = std::fs::read_to_string(&file)?;
            let persisted = ledger.import(&json)?;
            let data = ledger.aggregate();
            println!(
                "Imported {} trays and {} games from {}",
                data.trays.len(),
                data.total_games,
                file.display()
            );
            warn_unsaved(&ledger, persisted);
            Ok(())
        }
        Command::Clear => {
            let persisted = ledger.clear();
            println!("Ledger cleared");
            warn_unsaved(&ledger, persisted);
            Ok(())
        }
        Command::Serve { addr } => {
            print_header("API Server");
            run_server(&addr, config, ledger).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<GameConfig, sweetspot::error::ConfigError> {
    match path {
        Some(path) => GameConfig::from_file(path),
        None => Ok(GameConfig::default()),
    }
}

/// Interactive session on stdin, ticking on a wall-clock interval
async fn run_play(
    config: GameConfig,
    ledger: &mut Ledger,
    seed: Option<u64>,
    ticks_per_second: Option<u32>,
) -> CliResult {
    let dt = config.tick_interval();
    let period = match ticks_per_second {
        Some(rate) if rate > 0 => Duration::from_millis(1000 / rate as u64),
        _ => dt,
    }
    .max(Duration::from_millis(1));
    let ticks_per_report = (1000 / config.tick_interval_ms.max(1)).max(1);

    let mut session = match seed {
        Some(seed) => Session::seeded(config, seed),
        None => Session::from_entropy(config),
    };
    let mut feedback = FeedbackEngine::new(session.config().feedback_delay());

    print_header("Play");
    println!("Keep the temperature inside the sweet spot.");
    println!("Enter '+' or 'u' to heat, '-' or 'd' to cool, 'q' to quit.");
    println!("The sensor reading lags {} ms behind.", session.config().feedback_delay_ms);
    println!();

    session.start();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut interval = tokio::time::interval(period);
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let output = session.tick(dt);
                let signal = feedback.update(&session);
                ticks += 1;
                let notable = output.shifted
                    || output.reason.is_transition()
                    || ticks % ticks_per_report == 0;
                if notable {
                    print_tick(&output, signal, session.quality_score());
                }
                if session.is_over() {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    None => stdin_open = false,
                    Some(line) => match line.trim() {
                        "+" | "u" | "up" => {
                            session.adjust(Direction::Up);
                        }
                        "-" | "d" | "down" => {
                            session.adjust(Direction::Down);
                        }
                        "q" | "quit" | "exit" => {
                            println!("Session abandoned, nothing recorded.");
                            return Ok(());
                        }
                        "" => {}
                        other => println!("{}", format!("Unknown input '{}'", other).yellow()),
                    },
                }
            }
        }
    }

    if let Some(outcome) = session.outcome() {
        let recorded = ledger.record_session(&outcome);
        print_outcome(&outcome, &recorded);
        warn_unsaved(ledger, recorded.persisted);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    seed: u64,
    strategy: Strategy,
    ticks: u64,
    shifts: u32,
    adjustments: u32,
    outcome: SessionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    recorded: Option<Recorded<Outcome>>,
}

/// Headless session at fixed ticks
fn run_simulate(
    config: GameConfig,
    ledger: &mut Ledger,
    seed: u64,
    strategy: Strategy,
    record: bool,
    json: bool,
) -> CliResult {
    let dt = config.tick_interval();
    let mut session = Session::seeded(config, seed);
    let mut player = StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut ticks = 0;
    let mut shifts = 0;
    let mut adjustments = 0;

    session.start();
    while session.status() == SessionStatus::Running {
        let direction = match strategy {
            Strategy::Track if session.value() < session.target_min() => Some(Direction::Up),
            Strategy::Track if session.value() > session.target_max() => Some(Direction::Down),
            Strategy::Track | Strategy::Idle => None,
            Strategy::Random => match player.gen_range(0..3) {
                0 => Some(Direction::Up),
                1 => Some(Direction::Down),
                _ => None,
            },
        };
        if let Some(direction) = direction {
            if session.adjust(direction) {
                adjustments += 1;
            }
        }

        let output = session.tick(dt);
        ticks += 1;
        if output.shifted {
            shifts += 1;
        }
        if !json && (output.shifted || output.reason.is_transition()) {
            print_tick(&output, FeedbackSignal::default(), session.quality_score());
        }
    }

    let Some(outcome) = session.outcome() else {
        return Err("simulation ended without an outcome".into());
    };
    let recorded = record.then(|| ledger.record_session(&outcome));

    if json {
        let report = SimulationReport {
            seed,
            strategy,
            ticks,
            shifts,
            adjustments,
            outcome,
            recorded,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!(
        "{} ticks | {} shifts | {} adjustments",
        ticks, shifts, adjustments
    );
    match recorded {
        Some(recorded) => {
            print_outcome(&outcome, &recorded);
            warn_unsaved(ledger, recorded.persisted);
        }
        None => print_score(&outcome),
    }
    Ok(())
}

fn run_stats(ledger: &Ledger, json: bool) -> CliResult {
    let stats = ledger.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    print_header("Stats");
    println!("Games:        {}", stats.total_games);
    println!(
        "Succeeded:    {} ({}%)",
        stats.successful_games, stats.success_rate
    );
    println!("Failed:       {}", stats.total_failures);
    println!("Best score:   {}%", stats.best_score);
    println!("Average:      {}%", stats.average_score);
    println!("Trays:        {}", stats.total_trays);
    println!("Cash:         ${}", stats.cash.to_string().green());

    if !stats.quality_counts.is_empty() {
        println!();
        println!("{}", "Trays by quality".bold());
        for tier in QualityTier::ALL.iter().rev() {
            let count = stats.quality_counts.get(tier).copied().unwrap_or(0);
            println!(
                "  {} {:<10} {:>4}  (${} each)",
                tier.emoji(),
                tier.name(),
                count,
                tier.tray_value()
            );
        }
    }
    if !stats.failure_reasons.is_empty() {
        println!();
        println!("{}", "Failures".bold());
        for (reason, count) in &stats.failure_reasons {
            println!("  {:<30} {}", reason, count);
        }
    }

    let recent = ledger.recent_activity(5);
    if !recent.is_empty() {
        println!();
        println!("{}", "Recent activity".bold());
        for entry in &recent {
            let when = chrono::DateTime::from_timestamp_millis(entry.timestamp())
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            let label = match entry {
                ActivityEntry::Success(_) => entry.label().green(),
                ActivityEntry::Failure(_) => entry.label().red(),
            };
            println!("  {}  {:<10} {}%", when, label, entry.score());
        }
    }
    Ok(())
}

fn print_header(mode: &str) {
    println!("{}", "========================================".bold());
    println!("{}", format!("  Sweetspot v{} - {}", VERSION, mode).bold());
    println!("{}", "========================================".bold());
    println!();
}

fn print_tick(output: &TickOutput, signal: FeedbackSignal, score: u32) {
    let sensor = match (signal.available, signal.in_window) {
        (false, _) => "--".dimmed(),
        (true, true) => "IN".green(),
        (true, false) => "OUT".red(),
    };
    if colored::control::SHOULD_COLORIZE.should_colorize() {
        println!("{} | sensor={} | score={}%", output.to_terminal_string(), sensor, score);
    } else {
        println!("{} | sensor={} | score={}%", output.to_parseable_string(), sensor, score);
    }
    match output.reason {
        ReasonCode::S003_WINDOW_SHIFTED => println!("{}", "  ↔ Sweet spot moved".cyan()),
        ReasonCode::S004_FAILURE_WARNING => {
            println!("{}", "  ⚠ Get back in the sweet spot!".yellow())
        }
        _ => {}
    }
}

fn print_score(outcome: &SessionOutcome) {
    if outcome.failed {
        println!(
            "{} score {}%: {}",
            "✗ FAILED".red().bold(),
            outcome.score,
            outcome.reason.as_deref().unwrap_or("unknown")
        );
    } else {
        println!("{} score {}%", "✓ SUCCEEDED".green().bold(), outcome.score);
    }
}

fn print_outcome(outcome: &SessionOutcome, recorded: &Recorded<Outcome>) {
    print_score(outcome);
    match &recorded.value {
        Outcome::Failed { .. } => println!("  No trays this time."),
        Outcome::Succeeded {
            reward_units,
            quality,
            new_best_score,
        } => {
            println!(
                "  {} {} quality: {} trays",
                quality.emoji(),
                quality.name().bold(),
                reward_units
            );
            if *new_best_score {
                println!("{}", "  ★ New best score!".yellow().bold());
            }
        }
    }
}

fn warn_unsaved(ledger: &Ledger, persisted: bool) {
    if persisted {
        return;
    }
    let detail = ledger
        .last_write_error()
        .map(|e| e.to_string())
        .unwrap_or_default();
    eprintln!(
        "{} ledger not saved, changes kept in memory only: {}",
        "warning:".yellow().bold(),
        detail
    );
}
