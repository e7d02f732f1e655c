//! Arena CLI
//!
//! Run agent matches and round-robin tournaments, store finished games in
//! SQLite and keep an Elo leaderboard.
//!
//! ```text
//! arena match gpt-4o first-legal --opening "1. e4 e5"
//! arena tournament gpt-4o claude random --games 2
//! arena ratings --participant gpt-4o
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use arena_core::{HistoryFilter, MatchSnapshot, RatingEngine, RatingTable, TournamentSnapshot};
use arena_runner::{Arena, ArenaEvent, RecordSink};
use arena_server::{ServerConfig, SqliteSink, DEFAULT_CONFIG_PATH};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "arena")]
#[command(version, about = "Agent chess arena", long_about = None)]
struct Args {
    /// Config file (TOML); defaults are used if it does not exist
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// More logging (-v debug, -vv trace); overrides RUST_LOG
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a single game
    Match {
        white: String,
        black: String,
        /// Opening line played before the participants take over
        #[arg(long, default_value = "")]
        opening: String,
        /// Delay between moves in milliseconds
        #[arg(long, default_value_t = 0)]
        pacing_ms: u64,
        /// Print each move as it is played
        #[arg(long)]
        follow: bool,
    },
    /// Play a round robin between the given participants
    Tournament {
        #[arg(required = true, num_args = 2..)]
        participants: Vec<String>,
        /// Games per ordered pairing
        #[arg(short, long, default_value_t = 1)]
        games: u32,
    },
    /// Recompute ratings from the stored history and print the leaderboard
    Ratings {
        #[arg(long)]
        participant: Option<String>,
        /// Only the most recent N games
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn init_tracing(verbose: u8, level: &str) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        1 => EnvFilter::new("debug,sqlx=warn"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ServerConfig::load(&args.config)?;
    init_tracing(args.verbose, &config.logging.level);

    let sink = Arc::new(
        SqliteSink::connect(&config.storage.database_url)
            .await
            .with_context(|| format!("failed to open database {}", config.storage.database_url))?,
    );

    match args.command {
        Command::Match {
            white,
            black,
            opening,
            pacing_ms,
            follow,
        } => {
            let arena = Arena::new(config.arena.clone(), Arc::new(config.roster()), sink.clone());
            let result = run_match(&arena, &white, &black, &opening, pacing_ms, follow).await;
            arena.shutdown().await;
            result?;
            update_ratings(&config, sink.as_ref()).await?;
        }
        Command::Tournament {
            participants,
            games,
        } => {
            let arena = Arena::new(config.arena.clone(), Arc::new(config.roster()), sink.clone());
            let result = run_tournament(&arena, participants, games).await;
            arena.shutdown().await;
            result?;
            update_ratings(&config, sink.as_ref()).await?;
        }
        Command::Ratings { participant, limit } => {
            let filter = HistoryFilter {
                participant,
                limit,
                ..HistoryFilter::all()
            };
            let records = sink
                .load_match_history(&filter)
                .await
                .context("failed to load match history")?;
            if records.is_empty() {
                println!("No games recorded yet. Run some matches first!");
            } else {
                let table = RatingEngine::new(config.arena.rating.clone()).compute(&records);
                print!("{}", table.format_leaderboard());
                if let Some(participant) = &filter.participant {
                    print_rating_trail(&table, participant);
                }
            }
        }
    }

    sink.close().await;
    Ok(())
}

async fn run_match(
    arena: &Arena,
    white: &str,
    black: &str,
    opening: &str,
    pacing_ms: u64,
    follow: bool,
) -> Result<()> {
    let mut events = arena.subscribe();
    let id = arena
        .start_match(white, black, opening, Duration::from_millis(pacing_ms))
        .context("could not start match")?;
    println!("=== Match: {white} vs {black} ===");

    let mut follow = follow;
    let snapshot = loop {
        tokio::select! {
            event = events.recv(), if follow => match event {
                Some(ArenaEvent::MoveMade { snapshot, .. }) => {
                    if let Some(mv) = snapshot.moves.last() {
                        println!("{:>3}. {:<8} {}", mv.ply, mv.san, mv.actor);
                    }
                }
                Some(_) => {}
                None => follow = false,
            },
            snapshot = arena.wait_for_match(id) => break snapshot?,
            _ = tokio::signal::ctrl_c() => {
                warn!(match_id = %id, "interrupted, stopping match");
                arena.stop_match(id)?;
            }
        }
    };

    print_match(&snapshot);
    Ok(())
}

async fn run_tournament(arena: &Arena, participants: Vec<String>, games: u32) -> Result<()> {
    let id = arena
        .start_tournament(participants.clone(), games)
        .context("could not start tournament")?;
    println!("=== Tournament: {} ===", participants.join(", "));

    let snapshot = tokio::select! {
        snapshot = arena.wait_for_tournament(id) => snapshot?,
        _ = tokio::signal::ctrl_c() => {
            warn!(tournament_id = %id, "interrupted, stopping after the current pairing");
            arena.stop_tournament(id)?;
            arena.wait_for_tournament(id).await?
        }
    };

    print_standings(&snapshot);
    Ok(())
}

fn print_match(snapshot: &MatchSnapshot) {
    println!();
    println!("{}", snapshot.transcript);
    println!();
    match (&snapshot.error, snapshot.termination) {
        (Some(error), _) => println!("Match {} ended with an error: {error}", snapshot.status),
        (None, Some(termination)) => println!("Result: {} ({termination})", snapshot.result),
        (None, None) => println!("Match {}", snapshot.status),
    }
}

fn print_standings(snapshot: &TournamentSnapshot) {
    println!();
    println!(
        "Tournament {} after {}/{} games",
        snapshot.status,
        snapshot.completed_games(),
        snapshot.total_games
    );
    println!("{:<30} {:>7} {:>5} {:>5} {:>5}", "Participant", "Points", "W", "D", "L");
    println!("{}", "-".repeat(56));
    for standing in &snapshot.standings {
        println!(
            "{:<30} {:>7.1} {:>5} {:>5} {:>5}",
            standing.participant, standing.points, standing.wins, standing.draws, standing.losses
        );
    }
}

fn print_rating_trail(table: &RatingTable, participant: &str) {
    println!();
    println!("Rating history for {participant}");
    for point in table.history_for(participant) {
        let game = point.record_id.map(|id| format!("#{id}")).unwrap_or_default();
        println!("{}  {:>5}  {game}", point.date.format("%Y-%m-%d %H:%M"), point.rating);
    }
}

/// Recompute ratings from the full history, save them and print the table.
async fn update_ratings(config: &ServerConfig, sink: &SqliteSink) -> Result<()> {
    let records = sink
        .load_match_history(&HistoryFilter::all())
        .await
        .context("failed to load match history")?;
    let table = RatingEngine::new(config.arena.rating.clone()).compute(&records);
    let path = &config.storage.ratings_path;
    match table.save(path) {
        Ok(()) => info!(path = %path.display(), "saved ratings"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to save ratings"),
    }
    println!();
    print!("{}", table.format_leaderboard());
    Ok(())
}
