// ═══════════════════════════════════════════════════════════════════════
// Error types — reference-data loading, match setup, rejected commands
// ═══════════════════════════════════════════════════════════════════════

use crate::types::{Card, Phase, PlayerId, TerritoryId};
use thiserror::Error;

/// Problems found while loading map reference data.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{context} references unknown territory '{name}'")]
    UnknownTerritory { context: String, name: String },

    #[error("territory '{0}' does not belong to any continent")]
    Orphan(String),

    #[error("territory '{name}' is listed in both {first} and {second}")]
    DuplicateMembership {
        name: String,
        first: String,
        second: String,
    },

    #[error("territory '{0}' has no card symbol")]
    MissingSymbol(String),

    #[error("map has {0} territories, more than a TerritoryId can address")]
    TooManyTerritories(usize),
}

/// Problems building a match.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("player count must be {min}–{max}, got {got}")]
    PlayerCount { got: u8, min: u8, max: u8 },

    #[error("unknown territory '{0}' in layout")]
    UnknownTerritory(String),

    #[error("layout assigns territory to {0}, who is not seated")]
    UnknownPlayer(PlayerId),

    #[error("layout places zero armies on '{0}'")]
    EmptyTerritory(String),

    #[error("layout leaves '{0}' without an owner")]
    Unassigned(String),

    #[error("map has no territories")]
    EmptyMap,

    #[error("rule {rule} = {value} is out of range, expected {expected}")]
    InvalidRules { rule: &'static str, value: u64, expected: &'static str },
}

/// A rejected command. The match state is untouched when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command requires the {expected:?} phase, current phase is {actual:?}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("unknown territory {0:?}")]
    UnknownTerritory(TerritoryId),

    #[error("territory {territory:?} is not owned by {player}")]
    NotOwned { territory: TerritoryId, player: PlayerId },

    #[error("{player} cannot attack their own territory {territory:?}")]
    OwnTerritory { territory: TerritoryId, player: PlayerId },

    #[error("{from:?} does not border {to:?}")]
    NotAdjacent { from: TerritoryId, to: TerritoryId },

    #[error("{territory:?} holds {available} armies, cannot commit {requested} and keep one behind")]
    InsufficientArmies {
        territory: TerritoryId,
        available: u32,
        requested: u32,
    },

    #[error("reinforcement pool holds {available}, cannot place {requested}")]
    InsufficientReinforcements { available: u32, requested: u32 },

    #[error("amount must be at least 1")]
    ZeroAmount,

    #[error("cards do not form a valid exchange set")]
    InvalidCardSet,

    #[error("card {0:?} is not in the player's hand")]
    CardNotHeld(Card),

    #[error("{held} cards in hand, an exchange is required before leaving reinforcement")]
    MustExchange { held: usize },

    #[error("no conquered territory is waiting to be occupied")]
    NoPendingOccupation,

    #[error("occupation must move 1..={survivors} troops, got {requested}")]
    InvalidOccupation { survivors: u32, requested: u32 },
}
