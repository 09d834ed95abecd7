// ═══════════════════════════════════════════════════════════════════════
// Core types — ids, phases, cards, per-player and per-territory state
// ═══════════════════════════════════════════════════════════════════════

use crate::cards::CardEconomy;
use crate::map::Map;
use crate::objectives::DealtObjective;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ── Ids ────────────────────────────────────────────────────────────────
// Compact, copyable identifiers. Each one indexes a Vec owned by the map
// or by the game state.

/// Seat index of a player, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct PlayerId(pub u8);

impl PlayerId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct TerritoryId(pub u16);

impl TerritoryId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ContinentId(pub u8);

impl ContinentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ── Phase ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Reinforce,
    Attack,
    Fortify,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Reinforce, Phase::Attack, Phase::Fortify];

    /// Following phase within the same turn. None after Fortify.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Reinforce => Some(Phase::Attack),
            Phase::Attack => Some(Phase::Fortify),
            Phase::Fortify => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Reinforce => write!(f, "REINFORCE"),
            Phase::Attack => write!(f, "ATTACK"),
            Phase::Fortify => write!(f, "FORTIFY"),
        }
    }
}

// ── Cards ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    Triangle,
    Circle,
    Square,
    Wildcard,
}

impl Symbol {
    /// The three symbols that make up regular sets.
    pub const PLAIN: [Symbol; 3] = [Symbol::Triangle, Symbol::Circle, Symbol::Square];
}

/// A territory card. Wildcards carry no territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub territory: Option<TerritoryId>,
    pub symbol: Symbol,
}

impl Card {
    pub fn territory(territory: TerritoryId, symbol: Symbol) -> Self {
        Card { territory: Some(territory), symbol }
    }

    pub fn wildcard() -> Self {
        Card { territory: None, symbol: Symbol::Wildcard }
    }

    pub fn is_wild(&self) -> bool {
        self.symbol == Symbol::Wildcard
    }
}

// ── Territory (board tile) ─────────────────────────────────────────────

/// Dynamic per-territory state during a match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryState {
    pub owner: Option<PlayerId>,
    pub armies: u32,
}

// ── Player ─────────────────────────────────────────────────────────────

/// Per-player state. Owned territories and their armies live in
/// `GameState::territories`; query them through the game state.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub label: String,
    /// Armies received but not yet placed.
    pub reinforcements: u32,
    pub hand: Vec<Card>,
    pub objective: Option<DealtObjective>,
    pub active: bool,
    /// Round in which this player last drew a conquest card.
    pub last_card_round: Option<u32>,
}

impl Player {
    pub fn new(id: PlayerId, label: impl Into<String>) -> Self {
        Player {
            id,
            label: label.into(),
            reinforcements: 0,
            hand: Vec::new(),
            objective: None,
            active: true,
            last_card_round: None,
        }
    }
}

// ── Game State ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GameState {
    pub map: Arc<Map>,
    /// Seated players, indexed by PlayerId.
    pub players: Vec<Player>,
    /// Dynamic state per territory, indexed by TerritoryId.
    pub territories: Vec<TerritoryState>,
    pub round: u32,
    /// Seat whose turn it is.
    pub turn: usize,
    pub phase: Phase,
    /// Deck plus the global exchange counter.
    pub cards: CardEconomy,
}

impl GameState {
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn current_player(&self) -> PlayerId {
        self.players[self.turn].id
    }

    /// None for a seat that is not in the roster.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.index())
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        &mut self.players[id.index()]
    }

    pub fn is_active(&self, id: PlayerId) -> bool {
        self.player(id).is_some_and(|p| p.active)
    }

    pub fn territory(&self, id: TerritoryId) -> Option<&TerritoryState> {
        self.territories.get(id.index())
    }

    pub(crate) fn territory_mut(&mut self, id: TerritoryId) -> &mut TerritoryState {
        &mut self.territories[id.index()]
    }

    pub fn owner(&self, id: TerritoryId) -> Option<PlayerId> {
        self.territory(id).and_then(|t| t.owner)
    }

    pub fn armies(&self, id: TerritoryId) -> u32 {
        self.territory(id).map_or(0, |t| t.armies)
    }

    /// Territories owned by a player, in map order.
    pub fn territories_of(&self, player: PlayerId) -> Vec<TerritoryId> {
        self.territories.iter().enumerate()
            .filter(|(_, t)| t.owner == Some(player))
            .map(|(i, _)| TerritoryId(i as u16))
            .collect()
    }

    pub fn territory_count(&self, player: PlayerId) -> usize {
        self.territories.iter().filter(|t| t.owner == Some(player)).count()
    }

    pub fn total_armies(&self, player: PlayerId) -> u32 {
        self.territories.iter()
            .filter(|t| t.owner == Some(player))
            .map(|t| t.armies)
            .sum()
    }

    /// True when the player owns every territory of the continent.
    pub fn controls_continent(&self, player: PlayerId, continent: ContinentId) -> bool {
        self.map.graph.continent(continent).is_some_and(|c| {
            !c.territories.is_empty()
                && c.territories.iter().all(|&t| self.owner(t) == Some(player))
        })
    }

    /// Continents fully held by a player.
    pub fn held_continents(&self, player: PlayerId) -> Vec<ContinentId> {
        self.map.graph.continent_ids()
            .filter(|&c| self.controls_continent(player, c))
            .collect()
    }
}
