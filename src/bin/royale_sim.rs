//! Offline roulette simulator
//!
//! Plays rounds through the round controller with the local RNG and reports
//! the observed return to player against the single-zero house edge.

use clap::Parser;
use log::{debug, info, warn};
use roulette_royale::errors::{GameError, RoyaleError};
use roulette_royale::games::{BetKind, BetTarget, LocalRng, RoundController};
use std::time::Instant;

/// Theoretical house edge of a single-zero wheel
const HOUSE_EDGE: f64 = 1.0 / 37.0;

#[derive(Parser, Debug)]
#[command(name = "royale-sim")]
#[command(about = "Simulate offline roulette rounds", long_about = None)]
struct Args {
    /// Number of rounds to play
    #[arg(short, long, default_value = "100000")]
    rounds: u64,

    /// Bet kind (STRAIGHT, RED, BLACK, EVEN, ODD, LOW, HIGH, DOZEN_1..3, COLUMN_1..3)
    #[arg(short, long, default_value = "RED")]
    bet: BetKind,

    /// Straight-up number, or a board label; defaults to the kind's own spot
    #[arg(short, long)]
    target: Option<String>,

    /// Stake per round
    #[arg(short, long, default_value = "10")]
    stake: u64,

    /// Starting bankroll, restored whenever it runs dry
    #[arg(long, default_value = "10000")]
    bankroll: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Default)]
struct Tally {
    rounds: u64,
    wins: u64,
    wagered: u64,
    paid_out: u64,
    reloads: u64,
}

impl Tally {
    fn rtp(&self) -> f64 {
        if self.wagered == 0 {
            0.0
        } else {
            self.paid_out as f64 / self.wagered as f64
        }
    }
}

fn parse_target(kind: BetKind, raw: Option<&str>) -> BetTarget {
    match raw {
        Some(raw) => match raw.parse::<u8>() {
            Ok(n) => BetTarget::Number(n),
            Err(_) => BetTarget::Label(raw.to_string()),
        },
        None => BetTarget::default_for(kind),
    }
}

fn run(args: &Args) -> Result<Tally, RoyaleError> {
    let target = parse_target(args.bet, args.target.as_deref());
    let mut table = RoundController::new("simulator", args.bankroll, LocalRng).with_history_limit(1);
    let mut tally = Tally::default();

    table.place_amount(args.bet, &target, args.stake)?;

    while tally.rounds < args.rounds {
        let outcome = table.spin()?;
        tally.rounds += 1;
        tally.wagered += outcome.settlement.total_wagered;
        tally.paid_out += outcome.settlement.total_payout;
        if outcome.settlement.total_payout > 0 {
            tally.wins += 1;
        }
        debug!(
            "round {} -> {} ({:?}), balance {}",
            tally.rounds, outcome.settlement.winning_number, outcome.settlement.winning_color, outcome.balance
        );

        if tally.rounds == args.rounds {
            break;
        }

        match table.rebet() {
            Ok(_) => {}
            Err(GameError::InsufficientFunds { .. }) => {
                tally.reloads += 1;
                debug!("bankroll exhausted after {} rounds, reloading", tally.rounds);
                table = RoundController::new("simulator", args.bankroll, LocalRng).with_history_limit(1);
                table.place_amount(args.bet, &target, args.stake)?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(tally)
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    info!(
        "🎲 Simulating {} rounds of {} on {:?} at {} per spin",
        args.rounds, args.bet, args.target, args.stake
    );

    let started = Instant::now();
    let tally = match run(&args) {
        Ok(tally) => tally,
        Err(e) => {
            eprintln!("❌ Simulation failed: {}", e);
            std::process::exit(1);
        }
    };
    let elapsed = started.elapsed();

    if tally.reloads > 0 {
        warn!("Bankroll was reloaded {} times", tally.reloads);
    }

    let rtp = tally.rtp();
    println!("\n🎯 Simulation Results:");
    println!("Rounds played: {}", tally.rounds);
    println!("Winning rounds: {} ({:.2}%)", tally.wins, tally.wins as f64 / tally.rounds.max(1) as f64 * 100.0);
    println!("Total wagered: {}", tally.wagered);
    println!("Total paid out: {}", tally.paid_out);
    println!("Return to player: {:.3}%", rtp * 100.0);
    println!("Observed house edge: {:.3}%", (1.0 - rtp) * 100.0);
    println!("Theoretical house edge: {:.3}%", HOUSE_EDGE * 100.0);
    println!(
        "Elapsed: {:.2?} ({:.0} rounds/s)",
        elapsed,
        tally.rounds as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
}
