// ═══════════════════════════════════════════════════════════════════════
// Configuration — rule variants and match parameters
// ═══════════════════════════════════════════════════════════════════════

use crate::combat::MAX_ATTACKER_DICE;
use crate::error::SetupError;
use serde::{Deserialize, Serialize};

/// Cards traded in one exchange. A smaller hand limit could never be cleared.
const SET_SIZE: usize = 3;

/// When a conquering player earns a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardAward {
    /// First conquest of each round only.
    OncePerRound,
    /// Every conquest, hand limit permitting.
    EveryConquest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Dice thrown by a defender with enough armies. Classic rules use 2.
    pub max_defender_dice: u32,
    /// Cards a player may hold before being forced to exchange.
    pub hand_limit: usize,
    /// Armies placed on each owned territory named by exchanged cards.
    pub exchange_territory_bonus: u32,
    /// Floor of the per-turn territory income.
    pub min_reinforcements: u32,
    pub card_award: CardAward,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            max_defender_dice: 3,
            hand_limit: 5,
            exchange_territory_bonus: 2,
            min_reinforcements: 3,
            card_award: CardAward::OncePerRound,
        }
    }
}

impl Rules {
    /// Reject variants under which a match cannot progress: a defender
    /// without dice never loses armies, and a hand limit below a full set
    /// can never be traded down.
    pub fn validate(&self) -> Result<(), SetupError> {
        if !(1..=MAX_ATTACKER_DICE).contains(&self.max_defender_dice) {
            return Err(SetupError::InvalidRules {
                rule: "max_defender_dice",
                value: self.max_defender_dice as u64,
                expected: "1 to 3",
            });
        }
        if self.hand_limit < SET_SIZE {
            return Err(SetupError::InvalidRules {
                rule: "hand_limit",
                value: self.hand_limit as u64,
                expected: "at least 3",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub players: u8,
    pub seed: u64,
    /// Rounds after which a headless match is called a draw.
    pub max_rounds: u32,
    /// Safety limit on agent decisions per match.
    pub max_decisions: usize,
    pub rules: Rules,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            players: 4,
            seed: 42,
            max_rounds: 150,
            max_decisions: 200_000,
            rules: Rules::default(),
        }
    }
}
