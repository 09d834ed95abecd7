// ═══════════════════════════════════════════════════════════════════════
// Match setup — seats players, distributes territories, builds the deck
//
// A random match deals every territory with one army each. Tests and
// scenarios can instead script the board with place()/fill().
// ═══════════════════════════════════════════════════════════════════════

use crate::cards::CardEconomy;
use crate::combat::DiceSource;
use crate::config::{MatchConfig, Rules};
use crate::engine::TurnController;
use crate::error::SetupError;
use crate::map::Map;
use crate::objectives::{DealtObjective, Objective};
use crate::types::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::info;

pub const MIN_PLAYERS: u8 = 2;
pub const MAX_PLAYERS: u8 = 6;

pub const PLAYER_LABELS: [&str; MAX_PLAYERS as usize] =
    ["Red", "Blue", "Green", "Yellow", "Black", "White"];

/// Offset separating the dice stream from the shuffle stream of one seed.
const DICE_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

pub struct MatchBuilder {
    map: Arc<Map>,
    players: u8,
    seed: u64,
    rules: Rules,
    dice: Option<Box<dyn DiceSource>>,
    layout: Vec<(String, PlayerId, u32)>,
    fill: Option<(PlayerId, u32)>,
    objectives: Vec<(PlayerId, Objective)>,
}

impl MatchBuilder {
    pub fn new(map: Arc<Map>, players: u8) -> Self {
        MatchBuilder {
            map,
            players,
            seed: 0,
            rules: Rules::default(),
            dice: None,
            layout: Vec::new(),
            fill: None,
            objectives: Vec::new(),
        }
    }

    pub fn from_config(map: Arc<Map>, config: &MatchConfig) -> Self {
        MatchBuilder::new(map, config.players)
            .seed(config.seed)
            .rules(config.rules.clone())
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn rules(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the seeded dice, e.g. with `ScriptedDice`.
    pub fn dice(mut self, dice: impl DiceSource + 'static) -> Self {
        self.dice = Some(Box::new(dice));
        self
    }

    /// Script one territory. Any scripted territory disables random distribution.
    pub fn place(mut self, territory: &str, player: PlayerId, armies: u32) -> Self {
        self.layout.push((territory.to_string(), player, armies));
        self
    }

    /// Give every territory not named by place() to `player`.
    pub fn fill(mut self, player: PlayerId, armies: u32) -> Self {
        self.fill = Some((player, armies));
        self
    }

    /// Override the dealt objective of one player.
    pub fn objective(mut self, player: PlayerId, objective: Objective) -> Self {
        self.objectives.push((player, objective));
        self
    }

    pub fn build(self) -> Result<TurnController, SetupError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.players) {
            return Err(SetupError::PlayerCount { got: self.players, min: MIN_PLAYERS, max: MAX_PLAYERS });
        }
        if self.map.graph.is_empty() {
            return Err(SetupError::EmptyMap);
        }
        self.rules.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut players: Vec<Player> = (0..self.players)
            .map(|i| Player::new(PlayerId(i), PLAYER_LABELS[i as usize]))
            .collect();

        let territories = if self.layout.is_empty() && self.fill.is_none() {
            self.distribute(&mut rng)
        } else {
            self.scripted_board()?
        };

        for player in &mut players {
            if !territories.iter().any(|t| t.owner == Some(player.id)) {
                player.active = false;
            }
        }
        let turn = players.iter().position(|p| p.active).unwrap_or(0);

        let cards = CardEconomy::new(self.map.card_set(), self.rules.hand_limit, &mut rng);
        let state = GameState {
            map: self.map.clone(),
            players,
            territories,
            round: 0,
            turn,
            phase: Phase::Reinforce,
            cards,
        };

        let dice: Box<dyn DiceSource> = match self.dice {
            Some(dice) => dice,
            None => Box::new(ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(DICE_STREAM))),
        };
        let mut controller = TurnController::start(state, self.rules, rng, dice);
        controller.assign_objectives();
        for (player, objective) in self.objectives {
            controller.set_objective(player, DealtObjective::untitled(objective));
        }

        info!(players = self.players, seed = self.seed, "match created");
        Ok(controller)
    }

    fn distribute(&self, rng: &mut ChaCha8Rng) -> Vec<TerritoryState> {
        let mut territories = vec![TerritoryState::default(); self.map.territory_count()];
        let allotments = self.map.graph.distribute(self.players as usize, rng);
        for (seat, allotment) in allotments.into_iter().enumerate() {
            for t in allotment {
                territories[t.index()] = TerritoryState { owner: Some(PlayerId(seat as u8)), armies: 1 };
            }
        }
        territories
    }

    fn scripted_board(&self) -> Result<Vec<TerritoryState>, SetupError> {
        let mut territories = vec![TerritoryState::default(); self.map.territory_count()];
        let seated = |p: PlayerId| p.0 < self.players;

        for (name, player, armies) in &self.layout {
            let id = self.map.graph.id(name)
                .ok_or_else(|| SetupError::UnknownTerritory(name.clone()))?;
            if !seated(*player) {
                return Err(SetupError::UnknownPlayer(*player));
            }
            if *armies == 0 {
                return Err(SetupError::EmptyTerritory(name.clone()));
            }
            territories[id.index()] = TerritoryState { owner: Some(*player), armies: *armies };
        }

        for id in self.map.graph.ids() {
            if territories[id.index()].owner.is_some() {
                continue;
            }
            let name = self.map.territory_name(id).to_string();
            match self.fill {
                Some((player, _)) if !seated(player) => return Err(SetupError::UnknownPlayer(player)),
                Some((_, 0)) => return Err(SetupError::EmptyTerritory(name)),
                Some((player, armies)) => {
                    territories[id.index()] = TerritoryState { owner: Some(player), armies };
                }
                None => return Err(SetupError::Unassigned(name)),
            }
        }
        Ok(territories)
    }
}

/// Random match on `map` with default rules.
pub fn create_match(map: Arc<Map>, players: u8, seed: u64) -> Result<TurnController, SetupError> {
    MatchBuilder::new(map, players).seed(seed).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> Arc<Map> {
        Arc::new(Map::standard().unwrap())
    }

    #[test]
    fn test_player_count_bounds() {
        assert!(matches!(create_match(world(), 1, 1), Err(SetupError::PlayerCount { got: 1, .. })));
        assert!(matches!(create_match(world(), 7, 1), Err(SetupError::PlayerCount { got: 7, .. })));
        for n in MIN_PLAYERS..=MAX_PLAYERS {
            assert!(create_match(world(), n, 1).is_ok());
        }
    }

    #[test]
    fn test_distribution_deals_every_territory_once() {
        let game = create_match(world(), 6, 42).unwrap();
        let state = game.state();
        assert!(state.territories.iter().all(|t| t.owner.is_some() && t.armies == 1));

        // 44 territories over 6 seats: 7 each, the two leftovers to seats 0 and 1.
        let counts: Vec<usize> = (0..6).map(|i| state.territory_count(PlayerId(i))).collect();
        assert_eq!(counts, vec![8, 8, 7, 7, 7, 7]);
    }

    #[test]
    fn test_initial_phase_and_income() {
        let game = create_match(world(), 4, 9).unwrap();
        assert_eq!(game.round(), 0);
        assert_eq!(game.turn(), 0);
        assert_eq!(game.phase(), Phase::Reinforce);

        let p0 = game.player(PlayerId(0)).unwrap();
        assert_eq!(p0.reinforcements, game.reinforcement_income(PlayerId(0)));
        assert_eq!(game.player(PlayerId(1)).unwrap().reinforcements, 0);
    }

    #[test]
    fn test_deck_holds_full_card_set() {
        let game = create_match(world(), 3, 5).unwrap();
        assert_eq!(game.state().cards.deck().draw_pile_len(), 46);
        assert_eq!(game.state().cards.deck().discard_pile_len(), 0);
    }

    #[test]
    fn test_every_player_gets_an_objective() {
        let game = create_match(world(), 5, 17).unwrap();
        assert!(game.players().iter().all(|p| p.objective.is_some()));
    }

    #[test]
    fn test_deterministic_seed() {
        let a = create_match(world(), 4, 123).unwrap();
        let b = create_match(world(), 4, 123).unwrap();
        assert_eq!(a.state().territories, b.state().territories);
        let titles = |g: &TurnController| -> Vec<String> {
            g.players().iter().filter_map(|p| p.objective.as_ref()).map(|o| o.title.clone()).collect()
        };
        assert_eq!(titles(&a), titles(&b));

        let c = create_match(world(), 4, 124).unwrap();
        assert_ne!(a.state().territories, c.state().territories);
    }

    #[test]
    fn test_scripted_layout() {
        let game = MatchBuilder::new(world(), 2)
            .place("Brazil", PlayerId(1), 4)
            .fill(PlayerId(0), 2)
            .build()
            .unwrap();
        let brazil = game.map().graph.id("Brazil").unwrap();
        assert_eq!(game.owner(brazil), Some(PlayerId(1)));
        assert_eq!(game.armies(brazil), 4);
        assert_eq!(game.territory_count(PlayerId(0)), 43);
    }

    #[test]
    fn test_scripted_layout_errors() {
        let err = MatchBuilder::new(world(), 2).place("Atlantis", PlayerId(0), 1).fill(PlayerId(1), 1).build();
        assert!(matches!(err, Err(SetupError::UnknownTerritory(_))));

        let err = MatchBuilder::new(world(), 2).place("Brazil", PlayerId(4), 1).fill(PlayerId(1), 1).build();
        assert!(matches!(err, Err(SetupError::UnknownPlayer(PlayerId(4)))));

        let err = MatchBuilder::new(world(), 2).place("Brazil", PlayerId(0), 1).build();
        assert!(matches!(err, Err(SetupError::Unassigned(_))));
    }

    #[test]
    fn test_build_rejects_invalid_rules() {
        let rules = Rules { hand_limit: 2, ..Rules::default() };
        let err = MatchBuilder::new(world(), 4).rules(rules).build();
        assert!(matches!(err, Err(SetupError::InvalidRules { rule: "hand_limit", .. })));

        let rules = Rules { max_defender_dice: 0, ..Rules::default() };
        let err = MatchBuilder::new(world(), 4).rules(rules).build();
        assert!(matches!(err, Err(SetupError::InvalidRules { rule: "max_defender_dice", .. })));
    }

    #[test]
    fn test_player_without_territory_starts_inactive() {
        let game = MatchBuilder::new(world(), 3)
            .place("Peru", PlayerId(2), 3)
            .fill(PlayerId(1), 1)
            .build()
            .unwrap();
        assert!(!game.state().is_active(PlayerId(0)));
        assert_eq!(game.current_player(), PlayerId(1));
    }
}
