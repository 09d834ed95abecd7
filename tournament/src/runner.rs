// ═══════════════════════════════════════════════════════════════════════
// Game Runner — runs complete headless matches with agents
// ═══════════════════════════════════════════════════════════════════════

use conquest_agents::Agent;
use conquest_engine::cards::find_exchange_set;
use conquest_engine::config::MatchConfig;
use conquest_engine::engine::{Command, TurnController};
use conquest_engine::error::{CommandError, SetupError};
use conquest_engine::map::Map;
use conquest_engine::setup::MatchBuilder;
use conquest_engine::types::*;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Result of a completed match.
#[derive(Debug, Clone)]
pub struct GameResult {
    pub seed: u64,
    /// None when the round limit was reached first.
    pub winner: Option<PlayerId>,
    pub rounds_played: u32,
    pub decisions: usize,
    pub player_results: Vec<PlayerResult>,
}

#[derive(Debug, Clone)]
pub struct PlayerResult {
    pub player: PlayerId,
    pub label: String,
    pub agent_name: String,
    pub objective: String,
    pub final_territories: usize,
    pub final_armies: u32,
    pub eliminated: bool,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("no agent for seat {0}")]
    MissingAgent(PlayerId),

    #[error("match exceeded {limit} decisions without finishing (round {round})")]
    DecisionLimit { limit: usize, round: u32 },

    #[error("{player} is stuck in {phase}: {source}")]
    Stuck {
        player: PlayerId,
        phase: Phase,
        source: CommandError,
    },
}

/// Run a complete match with the given agents.
/// Each agent in the map controls one seat.
pub fn run_game(
    map: Arc<Map>,
    agents: &mut HashMap<PlayerId, Box<dyn Agent>>,
    config: &MatchConfig,
) -> Result<GameResult, RunError> {
    let mut game = MatchBuilder::from_config(map, config).build()?;
    let mut decisions = 0;

    loop {
        if let Some(winner) = game.winner() {
            info!(seed = config.seed, %winner, round = game.round(), "match won");
            return Ok(build_result(&game, agents, config.seed, Some(winner), decisions));
        }
        if game.round() >= config.max_rounds {
            info!(seed = config.seed, round = game.round(), "round limit reached, match drawn");
            return Ok(build_result(&game, agents, config.seed, None, decisions));
        }

        let player = game.current_player();
        let agent = agents.get_mut(&player).ok_or(RunError::MissingAgent(player))?;
        let command = agent.decide(&game);

        if let Err(err) = game.apply(command.clone()) {
            debug!(%player, ?command, %err, "command rejected");
            let fallback = fallback_command(&game);
            warn!(%player, agent = agent.name(), ?fallback, "falling back after rejected command");
            game.apply(fallback).map_err(|source| RunError::Stuck {
                player,
                phase: game.phase(),
                source,
            })?;
        }

        decisions += 1;
        if decisions > config.max_decisions {
            return Err(RunError::DecisionLimit { limit: config.max_decisions, round: game.round() });
        }
    }
}

/// A command that always moves the match forward: trade a set if the hand
/// blocks leaving REINFORCE, otherwise advance the phase.
fn fallback_command(game: &TurnController) -> Command {
    let hand = game.player(game.current_player())
        .map(|p| p.hand.as_slice())
        .unwrap_or_default();
    if game.phase() == Phase::Reinforce && hand.len() >= game.rules().hand_limit {
        if let Some(set) = find_exchange_set(hand) {
            return Command::ExchangeCards(set.to_vec());
        }
    }
    Command::AdvancePhase
}

/// Play `games` independent matches in parallel. Match `g` uses seed
/// `config.seed + g * 1000`; `make_agents` builds the seats for a seed.
pub fn run_batch<F>(
    map: Arc<Map>,
    config: &MatchConfig,
    games: u32,
    make_agents: F,
) -> Vec<(u64, Result<GameResult, RunError>)>
where
    F: Fn(u64) -> HashMap<PlayerId, Box<dyn Agent>> + Sync,
{
    (0..games)
        .into_par_iter()
        .map(|g| {
            let seed = config.seed.wrapping_add(g as u64 * 1000);
            let config = MatchConfig { seed, ..config.clone() };
            let mut agents = make_agents(seed);
            (seed, run_game(map.clone(), &mut agents, &config))
        })
        .collect()
}

fn build_result(
    game: &TurnController,
    agents: &HashMap<PlayerId, Box<dyn Agent>>,
    seed: u64,
    winner: Option<PlayerId>,
    decisions: usize,
) -> GameResult {
    let player_results = game.players().iter()
        .map(|p| PlayerResult {
            player: p.id,
            label: p.label.clone(),
            agent_name: agents.get(&p.id).map(|a| a.name().to_string()).unwrap_or_default(),
            objective: p.objective.as_ref().map(|o| o.title.clone()).unwrap_or_default(),
            final_territories: game.territory_count(p.id),
            final_armies: game.state().total_armies(p.id),
            eliminated: !p.active,
        })
        .collect();

    GameResult {
        seed,
        winner,
        rounds_played: game.round(),
        decisions,
        player_results,
    }
}
