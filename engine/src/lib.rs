pub mod types;
pub mod error;
pub mod config;
pub mod map;
pub mod combat;
pub mod cards;
pub mod objectives;
pub mod setup;
pub mod engine;


pub use types::*;
pub use error::{CommandError, LoadError, SetupError};
pub use config::{CardAward, MatchConfig, Rules};
pub use map::{Map, TerritoryGraph};
pub use combat::{BattleRoll, DiceSource, ScriptedDice};
pub use cards::{find_exchange_set, is_valid_set, ExchangeReport};
pub use objectives::{DealtObjective, Objective};
pub use setup::{create_match, MatchBuilder};
pub use engine::{AttackReport, Command, CommandOutcome, Occupation, PhaseChange, TurnController};
