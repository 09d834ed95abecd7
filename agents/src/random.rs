// ═══════════════════════════════════════════════════════════════════════
// Random Agent — makes all decisions randomly.
// Serves as baseline and for testing game engine stability.
// ═══════════════════════════════════════════════════════════════════════

use crate::agent::Agent;
use conquest_engine::cards::find_exchange_set;
use conquest_engine::engine::{Occupation, TurnController};
use conquest_engine::types::*;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub struct RandomAgent {
    player: PlayerId,
    rng: ChaCha8Rng,
    /// (round, turn) of the last fortify, one move per turn.
    fortified: Option<(u32, usize)>,
}

impl RandomAgent {
    pub fn new(player: PlayerId, seed: u64) -> Self {
        RandomAgent {
            player,
            rng: ChaCha8Rng::seed_from_u64(seed),
            fortified: None,
        }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str { "Random" }
    fn player(&self) -> PlayerId { self.player }

    fn exchange(&mut self, game: &TurnController, hand: &[Card]) -> Option<Vec<Card>> {
        if game.phase() != Phase::Reinforce {
            return None;
        }
        let set = find_exchange_set(hand)?;
        let forced = hand.len() >= game.rules().hand_limit;
        if forced || self.rng.gen_bool(0.5) {
            Some(set.to_vec())
        } else {
            None
        }
    }

    fn place(&mut self, game: &TurnController) -> Option<(TerritoryId, u32)> {
        let pool = game.player(self.player)?.reinforcements;
        if pool == 0 {
            return None;
        }
        let owned = game.territories_of(self.player);
        let &territory = owned.choose(&mut self.rng)?;
        let amount = self.rng.gen_range(1..=pool);
        Some((territory, amount))
    }

    fn attack(&mut self, game: &TurnController) -> Option<(TerritoryId, TerritoryId, u32)> {
        if self.rng.gen_bool(0.25) {
            return None;
        }
        let attacks = game.legal_attacks(self.player);
        let &(from, to) = attacks.choose(&mut self.rng)?;
        let max = (game.armies(from) - 1).min(3);
        Some((from, to, self.rng.gen_range(1..=max)))
    }

    fn occupy(&mut self, _game: &TurnController, occupation: Occupation) -> u32 {
        self.rng.gen_range(1..=occupation.survivors)
    }

    fn fortify(&mut self, game: &TurnController) -> Option<(TerritoryId, TerritoryId, u32)> {
        let now = (game.round(), game.turn());
        if self.fortified == Some(now) {
            return None;
        }
        self.fortified = Some(now);

        let moves: Vec<(TerritoryId, TerritoryId)> = game.territories_of(self.player).into_iter()
            .filter(|&t| game.armies(t) > 1)
            .flat_map(|from| game.friendly_neighbors(from).into_iter().map(move |to| (from, to)))
            .collect();
        let &(from, to) = moves.choose(&mut self.rng)?;
        let amount = self.rng.gen_range(1..=game.armies(from) - 1);
        Some((from, to, amount))
    }
}
