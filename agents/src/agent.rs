// ═══════════════════════════════════════════════════════════════════════
// Agent Trait — interface that all AI agents must implement
//
// Agents read the match through TurnController's query surface and answer
// with a Command. They never mutate the match themselves: every decision
// goes back through TurnController::apply, which validates it like any
// other caller's command.
// ═══════════════════════════════════════════════════════════════════════

use conquest_engine::engine::{Command, Occupation, TurnController};
use conquest_engine::types::*;

/// Trait that all AI agents must implement.
/// Each method corresponds to one kind of decision.
pub trait Agent: Send + Sync {
    /// Human-readable name for this agent (e.g., "Heuristic").
    fn name(&self) -> &str;

    /// The seat this agent is playing.
    fn player(&self) -> PlayerId;

    /// Pick the next command: a pending occupation first, then a card trade, then the phase action.
    fn decide(&mut self, game: &TurnController) -> Command {
        if let Some(occupation) = game.pending_occupation() {
            return Command::Occupy { troops: self.occupy(game, occupation) };
        }

        let hand = game.player(self.player())
            .map(|p| p.hand.clone())
            .unwrap_or_default();
        if let Some(cards) = self.exchange(game, &hand) {
            return Command::ExchangeCards(cards);
        }

        match game.phase() {
            Phase::Reinforce => match self.place(game) {
                Some((territory, amount)) => Command::PlaceReinforcement { territory, amount },
                None => Command::AdvancePhase,
            },
            Phase::Attack => match self.attack(game) {
                Some((from, to, troops)) => Command::Attack { from, to, troops },
                None => Command::AdvancePhase,
            },
            Phase::Fortify => match self.fortify(game) {
                Some((from, to, amount)) => Command::Fortify { from, to, amount },
                None => Command::AdvancePhase,
            },
        }
    }

    // ── Individual decision methods ────────────────────────────────────

    /// Cards to trade now, if any. Must return a set when the hand is full
    /// during REINFORCE, or the agent can never leave the phase.
    fn exchange(&mut self, game: &TurnController, hand: &[Card]) -> Option<Vec<Card>>;

    /// Where to put reinforcements. None = done placing.
    fn place(&mut self, game: &TurnController) -> Option<(TerritoryId, u32)>;

    /// Next attack as (from, to, troops). None = stop attacking.
    fn attack(&mut self, game: &TurnController) -> Option<(TerritoryId, TerritoryId, u32)>;

    /// How many of the surviving attackers stay in the conquered territory.
    fn occupy(&mut self, game: &TurnController, occupation: Occupation) -> u32;

    /// A fortify move as (from, to, amount). Called until it returns None.
    fn fortify(&mut self, game: &TurnController) -> Option<(TerritoryId, TerritoryId, u32)>;
}
