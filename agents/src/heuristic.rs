// ═══════════════════════════════════════════════════════════════════════
// Heuristic Agent — makes decisions using simple strategic heuristics.
// Significantly stronger than RandomAgent.
//
// The scoring functions are free functions over the controller's query
// surface so they can be tested (and reused) without an agent instance.
// ═══════════════════════════════════════════════════════════════════════

use crate::agent::Agent;
use conquest_engine::cards::find_exchange_set;
use conquest_engine::engine::{Occupation, TurnController};
use conquest_engine::objectives::Objective;
use conquest_engine::types::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

/// Attacks scoring at or below this are not worth the dice.
pub const ATTACK_THRESHOLD: f64 = 30.0;

/// Added to an attack on a player who holds a continent or is down to
/// their last territory.
const STRATEGIC_BONUS: f64 = 40.0;

// ── Scoring ────────────────────────────────────────────────────────────

/// Enemy armies bordering `territory` minus the armies on it.
pub fn defense_need(game: &TurnController, territory: TerritoryId) -> i64 {
    let threat: u32 = game.enemy_neighbors(territory).iter().map(|&n| game.armies(n)).sum();
    threat as i64 - game.armies(territory) as i64
}

/// How much holding `territory` advances the player's secret objective.
pub fn objective_affinity(game: &TurnController, player: PlayerId, territory: TerritoryId) -> f64 {
    let objective = match game.player(player).and_then(|p| p.objective.as_ref()) {
        Some(dealt) => &dealt.objective,
        None => return 0.0,
    };
    match objective {
        Objective::DominateContinents { continents, .. } => {
            match game.continent_of(territory) {
                Some(c) if continents.contains(&c) => 10.0,
                _ => 1.0,
            }
        }
        Objective::TerritoryCount { .. } => 2.0,
        Objective::EliminatePlayer { target, .. } => {
            if *target != player && game.owner(territory) == Some(*target) {
                15.0
            } else {
                1.0
            }
        }
        Objective::Unattainable => 0.0,
    }
}

/// Multiplier on a continent bonus at full control.
const EXPANSION_WEIGHT: f64 = 4.0;

/// Value of pushing further into the territory's continent. Rises as the
/// missing share shrinks and holds at `bonus * EXPANSION_WEIGHT` once the
/// continent is complete.
pub fn continent_expansion(game: &TurnController, player: PlayerId, territory: TerritoryId) -> f64 {
    let Some(continent) = game.continent_of(territory).and_then(|c| game.map().graph.continent(c)) else {
        return 0.0;
    };
    let size = continent.territories.len();
    if size == 0 {
        return 0.0;
    }
    let missing = continent.territories.iter()
        .filter(|&&t| game.owner(t) != Some(player))
        .count();
    let control = 1.0 - missing as f64 / size as f64;
    continent.bonus as f64 * EXPANSION_WEIGHT * control
}

pub fn placement_score(game: &TurnController, player: PlayerId, territory: TerritoryId) -> f64 {
    defense_need(game, territory) as f64
        + objective_affinity(game, player, territory)
        + continent_expansion(game, player, territory)
}

/// Score an attack, or None when the odds are not in the attacker's favour.
pub fn attack_score(game: &TurnController, player: PlayerId, from: TerritoryId, to: TerritoryId) -> Option<f64> {
    let attackers = game.armies(from);
    let defenders = game.armies(to);
    if attackers <= defenders + 1 || defenders == 0 {
        return None;
    }

    let ratio = 20.0 * attackers as f64 / defenders as f64;
    let strategic = match game.owner(to) {
        Some(enemy) => {
            let holds_continent = !game.state().held_continents(enemy).is_empty();
            if holds_continent || game.territory_count(enemy) == 1 {
                STRATEGIC_BONUS
            } else {
                0.0
            }
        }
        None => 0.0,
    };
    let exposure: u32 = game.enemy_neighbors(from).iter()
        .filter(|&&n| n != to)
        .map(|&n| game.armies(n))
        .sum();

    Some(ratio + objective_affinity(game, player, to) + strategic - 2.0 * exposure as f64)
}

/// Move spare armies toward the neediest territory. Donors bordering an
/// enemy only give half their spare.
pub fn fortify_decision(game: &TurnController, player: PlayerId) -> Option<(TerritoryId, TerritoryId, u32)> {
    let (needy, need) = game.territories_of(player).into_iter()
        .map(|t| (t, defense_need(game, t)))
        .filter(|&(_, need)| need > 0)
        .max_by_key(|&(_, need)| need)?;
    trace!(territory = game.map().territory_name(needy), need, "fortify target");

    let (donor, spare) = game.friendly_neighbors(needy).into_iter()
        .map(|n| {
            let spare = game.armies(n).saturating_sub(1);
            let spare = if game.is_frontline(n) { spare / 2 } else { spare };
            (n, spare)
        })
        .max_by_key(|&(_, spare)| spare)?;

    (spare > 0).then_some((donor, needy, spare))
}

// ── Agent ──────────────────────────────────────────────────────────────

pub struct HeuristicAgent {
    player: PlayerId,
    rng: ChaCha8Rng,
    /// (round, turn) of the last fortify, one move per turn.
    fortified: Option<(u32, usize)>,
}

impl HeuristicAgent {
    pub fn new(player: PlayerId, seed: u64) -> Self {
        HeuristicAgent {
            player,
            rng: ChaCha8Rng::seed_from_u64(seed),
            fortified: None,
        }
    }

    /// Own territories in a shuffled order, so ties do not always go to the
    /// first territory in map order.
    fn shuffled_territories(&mut self, game: &TurnController) -> Vec<TerritoryId> {
        let mut owned = game.territories_of(self.player);
        owned.shuffle(&mut self.rng);
        owned
    }
}

impl Agent for HeuristicAgent {
    fn name(&self) -> &str { "Heuristic" }
    fn player(&self) -> PlayerId { self.player }

    /// Trade whenever a set is available during REINFORCE, the armies are
    /// worth more now than later.
    fn exchange(&mut self, game: &TurnController, hand: &[Card]) -> Option<Vec<Card>> {
        if game.phase() != Phase::Reinforce {
            return None;
        }
        find_exchange_set(hand).map(|set| set.to_vec())
    }

    fn place(&mut self, game: &TurnController) -> Option<(TerritoryId, u32)> {
        let pool = game.player(self.player)?.reinforcements;
        if pool == 0 {
            return None;
        }
        let owned = self.shuffled_territories(game);
        let frontline: Vec<TerritoryId> = owned.iter().copied().filter(|&t| game.is_frontline(t)).collect();
        let candidates = if frontline.is_empty() { owned } else { frontline };

        let best = candidates.into_iter()
            .map(|t| (t, placement_score(game, self.player, t)))
            .max_by(|a, b| a.1.total_cmp(&b.1))?
            .0;
        let amount = if pool <= 3 { pool } else { pool / 2 };
        Some((best, amount))
    }

    fn attack(&mut self, game: &TurnController) -> Option<(TerritoryId, TerritoryId, u32)> {
        let mut attacks = game.legal_attacks(self.player);
        attacks.shuffle(&mut self.rng);

        let ((from, to), score) = attacks.into_iter()
            .filter_map(|(from, to)| attack_score(game, self.player, from, to).map(|s| ((from, to), s)))
            .max_by(|a, b| a.1.total_cmp(&b.1))?;
        if score <= ATTACK_THRESHOLD {
            return None;
        }
        let troops = (game.armies(from) - 1).min(3);
        Some((from, to, troops))
    }

    /// Everything moves in, unless the source still borders other enemies,
    /// in which case the survivors are split.
    fn occupy(&mut self, game: &TurnController, occupation: Occupation) -> u32 {
        let source_threatened = game.enemy_neighbors(occupation.from).iter().any(|&n| n != occupation.to);
        if source_threatened {
            occupation.survivors.div_ceil(2)
        } else {
            occupation.survivors
        }
    }

    fn fortify(&mut self, game: &TurnController) -> Option<(TerritoryId, TerritoryId, u32)> {
        let now = (game.round(), game.turn());
        if self.fortified == Some(now) {
            return None;
        }
        self.fortified = Some(now);
        fortify_decision(game, self.player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conquest_engine::combat::ScriptedDice;
    use conquest_engine::engine::Command;
    use conquest_engine::map::Map;
    use conquest_engine::setup::MatchBuilder;
    use std::sync::Arc;

    const P0: PlayerId = PlayerId(0);
    const P1: PlayerId = PlayerId(1);

    fn tid(game: &TurnController, name: &str) -> TerritoryId {
        game.map().graph.id(name).unwrap()
    }

    /// P1 holds South America; P0 the rest with 2 armies each, except a
    /// stack of 12 in North Africa.
    fn south_america(objective: Objective) -> TurnController {
        MatchBuilder::new(Arc::new(Map::standard().unwrap()), 2)
            .place("Venezuela", P1, 2)
            .place("Peru", P1, 1)
            .place("Brazil", P1, 3)
            .place("Argentina", P1, 1)
            .place("North Africa", P0, 12)
            .fill(P0, 2)
            .objective(P0, objective)
            .dice(ScriptedDice::new([6, 6, 6, 1, 1]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_defense_need() {
        let game = south_america(Objective::Unattainable);
        // Brazil (3) borders Venezuela, Peru, Argentina (own) and North Africa (12).
        assert_eq!(defense_need(&game, tid(&game, "Brazil")), 12 - 3);
        assert_eq!(defense_need(&game, tid(&game, "Alaska")), -2);
    }

    #[test]
    fn test_objective_affinity() {
        let map = Map::standard().unwrap();
        let sa = map.graph.continent_by_key("SA").unwrap();
        let game = south_america(Objective::DominateContinents { continents: vec![sa], extra: 0 });
        assert_eq!(objective_affinity(&game, P0, tid(&game, "Brazil")), 10.0);
        assert_eq!(objective_affinity(&game, P0, tid(&game, "Egypt")), 1.0);

        let game = south_america(Objective::EliminatePlayer { target: P1, fallback_territories: 30 });
        assert_eq!(objective_affinity(&game, P0, tid(&game, "Peru")), 15.0);
        assert_eq!(objective_affinity(&game, P0, tid(&game, "Egypt")), 1.0);

        let game = south_america(Objective::Unattainable);
        assert_eq!(objective_affinity(&game, P0, tid(&game, "Peru")), 0.0);
    }

    #[test]
    fn test_continent_expansion_saturates() {
        let game = south_america(Objective::Unattainable);
        // P1 holds all of South America (bonus 2).
        assert_eq!(continent_expansion(&game, P1, tid(&game, "Peru")), 2.0 * EXPANSION_WEIGHT);
        assert_eq!(continent_expansion(&game, P0, tid(&game, "Peru")), 0.0);
        // P0 holds all of Africa (bonus 3).
        assert_eq!(continent_expansion(&game, P0, tid(&game, "Egypt")), 3.0 * EXPANSION_WEIGHT);
    }

    #[test]
    fn test_continent_expansion_never_drops_as_control_grows() {
        let map = Arc::new(Map::standard().unwrap());
        let au = map.graph.continent_by_key("AU").unwrap();
        let members: Vec<String> = map.graph.continent(au).unwrap().territories.iter()
            .map(|&t| map.territory_name(t).to_string())
            .collect();

        let values: Vec<f64> = (1..=members.len())
            .map(|held| {
                let mut builder = MatchBuilder::new(map.clone(), 2);
                for (i, name) in members.iter().enumerate() {
                    builder = builder.place(name, if i < held { P0 } else { P1 }, 1);
                }
                let game = builder.fill(P1, 1).build().unwrap();
                continent_expansion(&game, P0, tid(&game, &members[0]))
            })
            .collect();

        assert!(values.windows(2).all(|w| w[1] >= w[0]), "{values:?}");
        let bonus = map.graph.continent(au).unwrap().bonus as f64;
        assert_eq!(values.last().copied(), Some(bonus * EXPANSION_WEIGHT));
    }

    #[test]
    fn test_attack_score_requires_odds() {
        let game = south_america(Objective::Unattainable);
        let north_africa = tid(&game, "North Africa");
        let brazil = tid(&game, "Brazil");
        let score = attack_score(&game, P0, north_africa, brazil).unwrap();
        // 20 * 12/3, plus the continent-holder bonus, no other exposure.
        assert_eq!(score, 80.0 + STRATEGIC_BONUS);
        assert!(score > ATTACK_THRESHOLD);

        // Brazil (3) against North Africa (12): no.
        assert_eq!(attack_score(&game, P1, brazil, north_africa), None);
        // 2 against 1 is not "more than one army ahead".
        let venezuela = tid(&game, "Venezuela");
        let central_america = tid(&game, "Central America");
        assert_eq!(attack_score(&game, P0, central_america, venezuela), None);
    }

    #[test]
    fn test_attack_score_penalises_exposure() {
        let game = MatchBuilder::new(Arc::new(Map::standard().unwrap()), 2)
            .place("Brazil", P1, 9)
            .place("Peru", P1, 1)
            .place("Venezuela", P0, 1)
            .place("North Africa", P0, 5)
            .fill(P1, 1)
            .objective(P1, Objective::Unattainable)
            .build()
            .unwrap();
        let score = attack_score(&game, P1, tid(&game, "Brazil"), tid(&game, "Venezuela")).unwrap();
        // 20 * 9 + strategic 0 - 2 * 5 (North Africa threatens Brazil).
        assert_eq!(score, 180.0 - 10.0);
    }

    #[test]
    fn test_heuristic_declines_marginal_attacks() {
        // Venezuela (4) is P0's only stack. Brazil (2) scores 20 * 4/2 minus
        // 2 * 5 for Peru, which is exactly the threshold. Peru itself is too
        // strong to attack. P1 holds no continent and more than one territory.
        let mut game = MatchBuilder::new(Arc::new(Map::standard().unwrap()), 2)
            .place("Venezuela", P0, 4)
            .place("Brazil", P1, 2)
            .place("Peru", P1, 5)
            .fill(P0, 1)
            .objective(P0, Objective::Unattainable)
            .build()
            .unwrap();
        let venezuela = tid(&game, "Venezuela");
        let brazil = tid(&game, "Brazil");
        assert_eq!(attack_score(&game, P0, venezuela, brazil), Some(ATTACK_THRESHOLD));

        game.advance_phase().unwrap();
        assert_eq!(game.phase(), Phase::Attack);
        let mut agent = HeuristicAgent::new(P0, 5);
        assert_eq!(agent.attack(&game), None);
        assert_eq!(agent.decide(&game), Command::AdvancePhase);
    }

    #[test]
    fn test_fortify_decision() {
        let game = south_america(Objective::Unattainable);
        // P1's neediest territory is Brazil. Its best donor is Venezuela, a
        // frontline territory with one spare army, which halves to nothing.
        assert_eq!(fortify_decision(&game, P1), None);

        let game = MatchBuilder::new(Arc::new(Map::standard().unwrap()), 2)
            .place("Brazil", P1, 2)
            .place("Argentina", P1, 7)
            .place("Peru", P1, 5)
            .place("North Africa", P0, 12)
            .place("Venezuela", P0, 1)
            .fill(P0, 1)
            .build()
            .unwrap();
        // Brazil needs 12 + 1 - 2. Argentina borders no enemy: full spare of 6.
        // Peru borders Venezuela: half of 4.
        let brazil = tid(&game, "Brazil");
        let argentina = tid(&game, "Argentina");
        assert_eq!(fortify_decision(&game, P1), Some((argentina, brazil, 6)));
    }

    #[test]
    fn test_agent_decisions_are_legal() {
        let mut game = south_america(Objective::Unattainable);
        let mut agent = HeuristicAgent::new(P0, 3);
        let turn_over = |g: &TurnController| g.current_player() != P0 || g.round() > 0;
        for _ in 0..500 {
            if turn_over(&game) {
                break;
            }
            let command = agent.decide(&game);
            game.apply(command).unwrap();
        }
        assert!(turn_over(&game));
    }

    #[test]
    fn test_heuristic_places_on_threatened_border() {
        let game = south_america(Objective::Unattainable);
        let pool = game.player(P0).unwrap().reinforcements;
        let mut agent = HeuristicAgent::new(P0, 1);
        match agent.decide(&game) {
            Command::PlaceReinforcement { territory, amount } => {
                assert!(game.is_frontline(territory));
                assert_eq!(amount, pool / 2);
            }
            other => panic!("expected a placement, got {other:?}"),
        }
    }
}
