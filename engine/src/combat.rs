// ═══════════════════════════════════════════════════════════════════════
// Combat — dice resolution for a single attack
// ═══════════════════════════════════════════════════════════════════════

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub const MAX_ATTACKER_DICE: u32 = 3;

/// Source of six-sided die faces. The match RNG implements it; tests
/// substitute scripted faces.
pub trait DiceSource: Send {
    /// A face in 1..=6.
    fn roll(&mut self) -> u8;
}

impl DiceSource for ChaCha8Rng {
    fn roll(&mut self) -> u8 {
        self.gen_range(1..=6)
    }
}

/// Replays a fixed list of faces, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    faces: Vec<u8>,
    next: usize,
}

impl ScriptedDice {
    pub fn new(faces: impl Into<Vec<u8>>) -> Self {
        ScriptedDice { faces: faces.into(), next: 0 }
    }
}

impl DiceSource for ScriptedDice {
    fn roll(&mut self) -> u8 {
        if self.faces.is_empty() {
            return 1;
        }
        let face = self.faces[self.next % self.faces.len()];
        self.next += 1;
        face.clamp(1, 6)
    }
}

/// Dice thrown by both sides and the armies each side lost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleRoll {
    /// Sorted descending.
    pub attacker_dice: Vec<u8>,
    /// Sorted descending.
    pub defender_dice: Vec<u8>,
    pub attacker_loss: u32,
    pub defender_loss: u32,
}

/// Roll one battle. The attacker throws one die per committed troop (max 3),
/// the defender one per army up to `max_defender_dice`.
pub fn resolve_attack(
    troops: u32,
    defender_armies: u32,
    max_defender_dice: u32,
    dice: &mut dyn DiceSource,
) -> BattleRoll {
    let attacker_dice = throw(troops.min(MAX_ATTACKER_DICE), dice);
    let defender_dice = throw(defender_armies.min(max_defender_dice), dice);
    let (attacker_loss, defender_loss) = compare_dice(&attacker_dice, &defender_dice);
    BattleRoll { attacker_dice, defender_dice, attacker_loss, defender_loss }
}

/// Pair the highest dice positionally. Defender wins ties.
/// Both slices must already be sorted descending.
pub fn compare_dice(attacker: &[u8], defender: &[u8]) -> (u32, u32) {
    attacker.iter().zip(defender)
        .fold((0, 0), |(atk_loss, def_loss), (a, d)| {
            if a > d {
                (atk_loss, def_loss + 1)
            } else {
                (atk_loss + 1, def_loss)
            }
        })
}

fn throw(count: u32, dice: &mut dyn DiceSource) -> Vec<u8> {
    let mut faces: Vec<u8> = (0..count).map(|_| dice.roll()).collect();
    faces.sort_unstable_by(|a, b| b.cmp(a));
    faces
}
