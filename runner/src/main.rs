// ═══════════════════════════════════════════════════════════════════════
// Runner — CLI entry point for running matches and tournaments
// ═══════════════════════════════════════════════════════════════════════

use clap::{Args, Parser, Subcommand};
use conquest_agents::{Agent, HeuristicAgent, RandomAgent};
use conquest_engine::config::MatchConfig;
use conquest_engine::map::Map;
use conquest_engine::types::PlayerId;
use conquest_tournament::{database::Database, run_batch, run_game};
use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const ELO_K: f64 = 32.0;

#[derive(Parser)]
#[command(name = "conquest", about = "Territorial conquest strategy lab")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Map reference data (JSON). Defaults to the built-in world.
    #[arg(long, global = true)]
    map: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Match settings shared by play and tournament. Flags override the file.
#[derive(Args)]
struct MatchArgs {
    /// TOML file with match settings and rules
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    players: Option<u8>,
    #[arg(long)]
    max_rounds: Option<u32>,
    /// Agent type: "random", "heuristic", or "mixed" (alternating seats)
    #[arg(short, long, default_value = "heuristic")]
    agent: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single match
    Play {
        #[arg(short, long)]
        seed: Option<u64>,
        #[command(flatten)]
        settings: MatchArgs,
    },
    /// Run a tournament of N matches in parallel
    Tournament {
        #[arg(short, long, default_value_t = 100)]
        games: u32,
        #[arg(short, long, default_value = "results.db")]
        db: String,
        #[command(flatten)]
        settings: MatchArgs,
    },
    /// Show leaderboard from database
    Leaderboard {
        #[arg(short, long, default_value = "results.db")]
        db: String,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Play { seed, settings } => {
            let mut config = load_config(&settings)?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            cmd_play(load_map(cli.map.as_deref())?, &config, &settings.agent)
        }
        Commands::Tournament { games, db, settings } => {
            let config = load_config(&settings)?;
            cmd_tournament(load_map(cli.map.as_deref())?, &config, games, &db, &settings.agent);
            Ok(())
        }
        Commands::Leaderboard { db } => {
            cmd_leaderboard(&db);
            Ok(())
        }
    }
}

fn load_map(path: Option<&Path>) -> Result<Arc<Map>, Box<dyn Error>> {
    let map = match path {
        Some(path) => Map::from_file(path)?,
        None => Map::standard()?,
    };
    Ok(Arc::new(map))
}

fn load_config(args: &MatchArgs) -> Result<MatchConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "loading match config");
            toml::from_str(&std::fs::read_to_string(path)?)?
        }
        None => MatchConfig::default(),
    };
    if let Some(players) = args.players {
        config.players = players;
    }
    if let Some(max_rounds) = args.max_rounds {
        config.max_rounds = max_rounds;
    }
    Ok(config)
}

fn cmd_play(map: Arc<Map>, config: &MatchConfig, agent_type: &str) -> Result<(), Box<dyn Error>> {
    println!("=== Conquest Strategy Lab ===\n");
    println!("Running single match: seed={}, players={}, agent={}\n", config.seed, config.players, agent_type);

    let mut agents = make_agents(config.seed, config.players, agent_type);
    let result = run_game(map, &mut agents, config)?;

    println!("Match finished!");
    match result.winner {
        Some(winner) => println!("  Winner: {} ({})", winner, result.player_results[winner.index()].label),
        None => println!("  Draw: round limit reached"),
    }
    println!("  Rounds played: {}", result.rounds_played);
    println!("  Decisions: {}", result.decisions);
    println!();
    println!("  Final standings:");
    for pr in &result.player_results {
        println!("    {:7} {:10} -- territories: {:>2}, armies: {:>4}{}  [{}]",
            pr.label,
            pr.agent_name,
            pr.final_territories,
            pr.final_armies,
            if pr.eliminated { ", eliminated" } else { "" },
            pr.objective,
        );
    }
    Ok(())
}

fn cmd_tournament(map: Arc<Map>, config: &MatchConfig, games: u32, db_path: &str, agent_type: &str) {
    println!("=== Tournament: {} matches, {} players, agent={} ===\n", games, config.players, agent_type);

    let db = Database::new(db_path);
    let results = run_batch(map, config, games, |seed| make_agents(seed, config.players, agent_type));

    let mut wins: HashMap<String, u32> = HashMap::new();
    let mut draws = 0u32;
    let mut errors = 0u32;

    for (seed, outcome) in results {
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                errors += 1;
                eprintln!("Match seed={}: ERROR -- {}", seed, e);
                continue;
            }
        };

        let seats: Vec<(PlayerId, i64)> = result.player_results.iter()
            .map(|pr| (pr.player, db.register_agent(&pr.agent_name)))
            .collect();
        db.store_game(&result, &seats);

        match result.winner {
            Some(winner) => {
                let winner_id = seats[winner.index()].1;
                let mut losers: Vec<i64> = seats.iter()
                    .map(|(_, id)| *id)
                    .filter(|&id| id != winner_id)
                    .collect();
                losers.sort_unstable();
                losers.dedup();
                db.update_elo(winner_id, &losers, ELO_K);
                *wins.entry(result.player_results[winner.index()].agent_name.clone()).or_insert(0) += 1;
            }
            None => draws += 1,
        }
    }

    println!("--- Summary ({} matches, {} draws, {} errors) ---", games, draws, errors);
    let mut names: Vec<&String> = wins.keys().collect();
    names.sort();
    for name in names {
        let w = wins[name];
        let pct = if games > 0 { w as f64 / games as f64 * 100.0 } else { 0.0 };
        println!("  {:10}: {:>4} wins ({:.1}%)", name, w, pct);
    }
    println!("\nResults saved to: {}", db_path);
    println!("Total matches in DB: {}", db.game_count());
}

fn cmd_leaderboard(db_path: &str) {
    let db = Database::new(db_path);
    let board = db.leaderboard();
    if board.is_empty() {
        println!("No agents found. Run some tournaments first.");
        return;
    }
    println!("=== Leaderboard ===\n");
    println!("{:<20} {:>8} {:>8} {:>8} {:>10}", "Agent", "ELO", "Games", "Wins", "Avg terr.");
    println!("{}", "-".repeat(58));
    for s in &board {
        println!("{:<20} {:>8.1} {:>8} {:>8} {:>10.1}", s.name, s.elo, s.games, s.wins, s.avg_territories);
    }
}

fn make_agents(seed: u64, player_count: u8, agent_type: &str) -> HashMap<PlayerId, Box<dyn Agent>> {
    let mut agents: HashMap<PlayerId, Box<dyn Agent>> = HashMap::new();
    for i in 0..player_count {
        let player = PlayerId(i);
        let agent_seed = seed.wrapping_add(i as u64);
        let agent: Box<dyn Agent> = match agent_type {
            "random" => Box::new(RandomAgent::new(player, agent_seed)),
            "mixed" => {
                if i % 2 == 0 {
                    Box::new(HeuristicAgent::new(player, agent_seed))
                } else {
                    Box::new(RandomAgent::new(player, agent_seed))
                }
            }
            _ => Box::new(HeuristicAgent::new(player, agent_seed)),
        };
        agents.insert(player, agent);
    }
    agents
}
