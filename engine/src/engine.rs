// ═══════════════════════════════════════════════════════════════════════
// Turn controller — the authoritative match state machine
//
// Architecture:
//   The controller owns the GameState and is the only thing that mutates
//   it. Callers (runner, agents, tests) read through the query methods and
//   submit commands. Every command validates fully before touching state,
//   so a rejected command leaves the match exactly as it was.
//
// Flow per player turn:
//   REINFORCE  place the income pool, exchange cards (forced at 5+)
//   ATTACK     any number of attacks; a conquest may be followed by occupy()
//   FORTIFY    move armies between adjacent owned territories
//   advance_phase() after FORTIFY passes the turn to the next active seat.
// ═══════════════════════════════════════════════════════════════════════

use crate::combat::{self, BattleRoll, DiceSource};
use crate::config::{CardAward, Rules};
use crate::error::CommandError;
use crate::map::Map;
use crate::objectives::{deal_objectives, DealtObjective};
use crate::cards::ExchangeReport;
use crate::types::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Commands a player (human, agent or test) can submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    PlaceReinforcement { territory: TerritoryId, amount: u32 },
    Attack { from: TerritoryId, to: TerritoryId, troops: u32 },
    /// Set how many surviving attackers stay in the territory just conquered.
    Occupy { troops: u32 },
    Fortify { from: TerritoryId, to: TerritoryId, amount: u32 },
    ExchangeCards(Vec<Card>),
    AdvancePhase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Placed { territory: TerritoryId, armies: u32, remaining: u32 },
    Battle(AttackReport),
    Occupied { territory: TerritoryId, armies: u32 },
    Fortified { from: TerritoryId, to: TerritoryId, amount: u32 },
    Exchanged(ExchangeReport),
    PhaseAdvanced(PhaseChange),
}

/// Everything a presentation layer needs to show one attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackReport {
    pub attacker: PlayerId,
    pub defender: PlayerId,
    pub from: TerritoryId,
    pub to: TerritoryId,
    pub roll: BattleRoll,
    pub conquered: bool,
    /// Set when the conquest took the defender's last territory.
    pub eliminated: Option<PlayerId>,
    /// Card drawn for the conquest, if one was awarded.
    pub card: Option<Card>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChange {
    pub player: PlayerId,
    pub phase: Phase,
    pub round: u32,
    /// Armies granted when the change started a new turn.
    pub income: Option<u32>,
}

/// A conquered territory whose garrison can still be adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupation {
    pub from: TerritoryId,
    pub to: TerritoryId,
    pub survivors: u32,
}

pub struct TurnController {
    state: GameState,
    rules: Rules,
    /// Shuffles: deck recycling and objective dealing.
    rng: ChaCha8Rng,
    dice: Box<dyn DiceSource>,
    pending_occupation: Option<Occupation>,
}

impl std::fmt::Debug for TurnController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnController")
            .field("round", &self.state.round)
            .field("turn", &self.state.turn)
            .field("phase", &self.state.phase)
            .field("pending_occupation", &self.pending_occupation)
            .finish_non_exhaustive()
    }
}

impl TurnController {
    /// Wrap a prepared state and start the first turn. Used by the setup
    /// module once territories are distributed.
    pub(crate) fn start(state: GameState, rules: Rules, rng: ChaCha8Rng, dice: Box<dyn DiceSource>) -> Self {
        let mut controller = TurnController {
            state,
            rules,
            rng,
            dice,
            pending_occupation: None,
        };
        let first = controller.current_player();
        let income = controller.grant_income(first);
        debug!(player = %first, income, "match started");
        controller
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn map(&self) -> &Map {
        &self.state.map
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn round(&self) -> u32 {
        self.state.round
    }

    pub fn turn(&self) -> usize {
        self.state.turn
    }

    pub fn current_player(&self) -> PlayerId {
        self.state.current_player()
    }

    pub fn players(&self) -> &[Player] {
        &self.state.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.state.player(id)
    }

    pub fn owner(&self, territory: TerritoryId) -> Option<PlayerId> {
        self.state.owner(territory)
    }

    pub fn armies(&self, territory: TerritoryId) -> u32 {
        self.state.armies(territory)
    }

    pub fn territories_of(&self, player: PlayerId) -> Vec<TerritoryId> {
        self.state.territories_of(player)
    }

    pub fn territory_count(&self, player: PlayerId) -> usize {
        self.state.territory_count(player)
    }

    pub fn continent_of(&self, territory: TerritoryId) -> Option<ContinentId> {
        self.state.map.graph.continent_of(territory)
    }

    pub fn controls_continent(&self, player: PlayerId, continent: ContinentId) -> bool {
        self.state.controls_continent(player, continent)
    }

    /// Neighbours held by the territory's owner.
    pub fn friendly_neighbors(&self, territory: TerritoryId) -> Vec<TerritoryId> {
        let owner = self.owner(territory);
        self.state.map.graph.neighbors(territory).iter()
            .copied()
            .filter(|&n| owner.is_some() && self.owner(n) == owner)
            .collect()
    }

    /// Neighbours held by someone other than the territory's owner.
    pub fn enemy_neighbors(&self, territory: TerritoryId) -> Vec<TerritoryId> {
        let owner = self.owner(territory);
        self.state.map.graph.neighbors(territory).iter()
            .copied()
            .filter(|&n| self.owner(n).is_some() && self.owner(n) != owner)
            .collect()
    }

    /// A territory bordering at least one enemy.
    pub fn is_frontline(&self, territory: TerritoryId) -> bool {
        !self.enemy_neighbors(territory).is_empty()
    }

    /// Every (source, target) pair the player could attack right now,
    /// ignoring the phase.
    pub fn legal_attacks(&self, player: PlayerId) -> Vec<(TerritoryId, TerritoryId)> {
        self.territories_of(player).into_iter()
            .filter(|&from| self.armies(from) > 1)
            .flat_map(|from| {
                self.enemy_neighbors(from).into_iter().map(move |to| (from, to))
            })
            .collect()
    }

    pub fn next_exchange_bonus(&self) -> u32 {
        self.state.cards.next_exchange_bonus()
    }

    /// (draw pile, discard pile)
    pub fn deck_sizes(&self) -> (usize, usize) {
        let deck = self.state.cards.deck();
        (deck.draw_pile_len(), deck.discard_pile_len())
    }

    pub fn pending_occupation(&self) -> Option<Occupation> {
        self.pending_occupation
    }

    /// Income a player would receive at the start of their turn.
    pub fn reinforcement_income(&self, player: PlayerId) -> u32 {
        let by_territory = (self.territory_count(player) / 2) as u32;
        let by_continent: u32 = self.state.held_continents(player).into_iter()
            .filter_map(|c| self.state.map.graph.continent(c))
            .map(|c| c.bonus)
            .sum();
        by_territory.max(self.rules.min_reinforcements) + by_continent
    }

    /// Whether the player's objective is met.
    pub fn check_victory(&self, player: PlayerId) -> bool {
        self.player(player)
            .filter(|p| p.active)
            .and_then(|p| p.objective.as_ref())
            .is_some_and(|o| o.objective.check_win(player, &self.state))
    }

    /// First active seat whose objective is met.
    pub fn winner(&self) -> Option<PlayerId> {
        self.state.players.iter()
            .map(|p| p.id)
            .find(|&id| self.check_victory(id))
    }

    // ── Commands ───────────────────────────────────────────────────────

    /// Single entry point for all commands.
    pub fn apply(&mut self, command: Command) -> Result<CommandOutcome, CommandError> {
        match command {
            Command::PlaceReinforcement { territory, amount } => {
                let remaining = self.place_reinforcement(territory, amount)?;
                Ok(CommandOutcome::Placed { territory, armies: self.armies(territory), remaining })
            }
            Command::Attack { from, to, troops } => {
                self.attack(from, to, troops).map(CommandOutcome::Battle)
            }
            Command::Occupy { troops } => {
                let territory = self.occupy(troops)?;
                Ok(CommandOutcome::Occupied { territory, armies: self.armies(territory) })
            }
            Command::Fortify { from, to, amount } => {
                self.fortify(from, to, amount)?;
                Ok(CommandOutcome::Fortified { from, to, amount })
            }
            Command::ExchangeCards(cards) => {
                self.exchange_cards(&cards).map(CommandOutcome::Exchanged)
            }
            Command::AdvancePhase => self.advance_phase().map(CommandOutcome::PhaseAdvanced),
        }
    }

    /// REINFORCE → ATTACK → FORTIFY → next active player's REINFORCE.
    /// Leaving REINFORCE is refused while the hand is at the limit.
    pub fn advance_phase(&mut self) -> Result<PhaseChange, CommandError> {
        let player = self.current_player();
        if self.state.phase == Phase::Reinforce {
            let held = self.state.players[self.state.turn].hand.len();
            if held >= self.rules.hand_limit {
                debug!(%player, held, "advance refused, exchange required");
                return Err(CommandError::MustExchange { held });
            }
        }
        self.pending_occupation = None;

        let change = match self.state.phase.next() {
            Some(phase) => {
                self.state.phase = phase;
                PhaseChange { player, phase, round: self.state.round, income: None }
            }
            None => self.pass_turn(),
        };
        debug!(player = %change.player, phase = %change.phase, round = change.round, "phase advanced");
        Ok(change)
    }

    /// Move armies from the current player's pool onto one of their territories.
    /// Returns the pool left over.
    pub fn place_reinforcement(&mut self, territory: TerritoryId, amount: u32) -> Result<u32, CommandError> {
        self.require_phase(Phase::Reinforce)?;
        let player = self.current_player();
        if amount == 0 {
            return Err(CommandError::ZeroAmount);
        }
        self.require_owned(territory, player)?;
        let available = self.state.players[self.state.turn].reinforcements;
        if amount > available {
            return Err(CommandError::InsufficientReinforcements { available, requested: amount });
        }

        self.pending_occupation = None;
        self.state.player_mut(player).reinforcements -= amount;
        self.state.territory_mut(territory).armies += amount;
        debug!(%player, territory = self.map().territory_name(territory), amount, "reinforcements placed");
        Ok(available - amount)
    }

    /// Attack `to` from `from` with `troops` armies, at least one of which
    /// must stay behind. On conquest the survivors move in.
    pub fn attack(&mut self, from: TerritoryId, to: TerritoryId, troops: u32) -> Result<AttackReport, CommandError> {
        self.require_phase(Phase::Attack)?;
        let attacker = self.current_player();
        if troops == 0 {
            return Err(CommandError::ZeroAmount);
        }
        self.require_owned(from, attacker)?;
        let defender = match self.state.territory(to) {
            None => return Err(CommandError::UnknownTerritory(to)),
            Some(t) => match t.owner {
                Some(owner) if owner == attacker => {
                    return Err(CommandError::OwnTerritory { territory: to, player: attacker })
                }
                Some(owner) => owner,
                None => return Err(CommandError::UnknownTerritory(to)),
            },
        };
        if !self.state.map.graph.are_adjacent(from, to) {
            return Err(CommandError::NotAdjacent { from, to });
        }
        let available = self.armies(from);
        if available <= troops {
            return Err(CommandError::InsufficientArmies { territory: from, available, requested: troops });
        }

        self.pending_occupation = None;
        let roll = combat::resolve_attack(
            troops,
            self.armies(to),
            self.rules.max_defender_dice,
            self.dice.as_mut(),
        );
        self.state.territory_mut(from).armies -= roll.attacker_loss;
        self.state.territory_mut(to).armies -= roll.defender_loss;

        let mut report = AttackReport {
            attacker,
            defender,
            from,
            to,
            roll,
            conquered: false,
            eliminated: None,
            card: None,
        };
        debug!(
            %attacker, %defender,
            from = self.map().territory_name(from),
            to = self.map().territory_name(to),
            attacker_loss = report.roll.attacker_loss,
            defender_loss = report.roll.defender_loss,
            "battle"
        );

        if self.armies(to) == 0 {
            let survivors = troops - report.roll.attacker_loss;
            self.state.territory_mut(from).armies -= survivors;
            *self.state.territory_mut(to) = TerritoryState { owner: Some(attacker), armies: survivors };
            self.pending_occupation = Some(Occupation { from, to, survivors });
            report.conquered = true;
            info!(%attacker, %defender, territory = self.map().territory_name(to), survivors, "territory conquered");

            if self.state.territory_count(defender) == 0 {
                self.eliminate(defender);
                report.eliminated = Some(defender);
            }
            report.card = self.award_card(attacker);
        }
        Ok(report)
    }

    /// Adjust the garrison of the territory just conquered: `troops` stay,
    /// the rest of the survivors return to the attacking territory.
    pub fn occupy(&mut self, troops: u32) -> Result<TerritoryId, CommandError> {
        let occupation = self.pending_occupation.ok_or(CommandError::NoPendingOccupation)?;
        if troops == 0 || troops > occupation.survivors {
            return Err(CommandError::InvalidOccupation { survivors: occupation.survivors, requested: troops });
        }

        self.pending_occupation = None;
        self.state.territory_mut(occupation.to).armies = troops;
        self.state.territory_mut(occupation.from).armies += occupation.survivors - troops;
        debug!(territory = self.map().territory_name(occupation.to), troops, "occupation set");
        Ok(occupation.to)
    }

    /// Move armies between two adjacent territories of the current player.
    pub fn fortify(&mut self, from: TerritoryId, to: TerritoryId, amount: u32) -> Result<(), CommandError> {
        self.require_phase(Phase::Fortify)?;
        let player = self.current_player();
        if amount == 0 {
            return Err(CommandError::ZeroAmount);
        }
        self.require_owned(from, player)?;
        self.require_owned(to, player)?;
        if !self.state.map.graph.are_adjacent(from, to) {
            return Err(CommandError::NotAdjacent { from, to });
        }
        let available = self.armies(from);
        if amount >= available {
            return Err(CommandError::InsufficientArmies { territory: from, available, requested: amount });
        }

        self.pending_occupation = None;
        self.state.territory_mut(from).armies -= amount;
        self.state.territory_mut(to).armies += amount;
        debug!(
            %player,
            from = self.map().territory_name(from),
            to = self.map().territory_name(to),
            amount,
            "fortified"
        );
        Ok(())
    }

    /// Trade three cards from the current player's hand. Legal in any phase.
    pub fn exchange_cards(&mut self, cards: &[Card]) -> Result<ExchangeReport, CommandError> {
        let player = self.current_player();
        let bonus = self.rules.exchange_territory_bonus;
        let GameState { players, territories, cards: economy, .. } = &mut self.state;
        let report = economy.execute_card_exchange(cards, &mut players[player.index()], territories, bonus)?;

        self.pending_occupation = None;
        info!(%player, bonus = report.bonus, exchange = report.exchange_number, "cards exchanged");
        Ok(report)
    }

    /// Deal objectives from the map's templates to every active player,
    /// replacing any held before.
    pub fn assign_objectives(&mut self) {
        let roster: Vec<PlayerId> = self.state.players.iter()
            .filter(|p| p.active)
            .map(|p| p.id)
            .collect();
        let map = self.state.map.clone();
        let dealt = deal_objectives(map.objective_templates(), &map.graph, &roster, &mut self.rng);
        for (id, objective) in roster.into_iter().zip(dealt) {
            debug!(player = %id, title = %objective.title, "objective dealt");
            self.state.player_mut(id).objective = Some(objective);
        }
    }

    /// Give one player a specific objective.
    pub fn set_objective(&mut self, player: PlayerId, objective: DealtObjective) {
        if let Some(p) = self.state.players.get_mut(player.index()) {
            p.objective = Some(objective);
        }
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn require_phase(&self, expected: Phase) -> Result<(), CommandError> {
        if self.state.phase == expected {
            Ok(())
        } else {
            Err(CommandError::WrongPhase { expected, actual: self.state.phase })
        }
    }

    fn require_owned(&self, territory: TerritoryId, player: PlayerId) -> Result<(), CommandError> {
        match self.state.territory(territory) {
            None => Err(CommandError::UnknownTerritory(territory)),
            Some(t) if t.owner == Some(player) => Ok(()),
            Some(_) => Err(CommandError::NotOwned { territory, player }),
        }
    }

    /// Hand the turn to the next active seat and grant its income.
    fn pass_turn(&mut self) -> PhaseChange {
        let seats = self.state.players.len();
        loop {
            self.state.turn = (self.state.turn + 1) % seats;
            if self.state.turn == 0 {
                self.state.round += 1;
            }
            if self.state.players[self.state.turn].active {
                break;
            }
        }
        self.state.phase = Phase::Reinforce;
        let player = self.current_player();
        let income = self.grant_income(player);
        PhaseChange { player, phase: Phase::Reinforce, round: self.state.round, income: Some(income) }
    }

    fn grant_income(&mut self, player: PlayerId) -> u32 {
        let income = self.reinforcement_income(player);
        self.state.player_mut(player).reinforcements += income;
        income
    }

    fn eliminate(&mut self, player: PlayerId) {
        let hand = std::mem::take(&mut self.state.player_mut(player).hand);
        self.state.cards.discard(hand);
        self.state.player_mut(player).active = false;
        info!(%player, "player eliminated");
    }

    fn award_card(&mut self, player: PlayerId) -> Option<Card> {
        let round = self.state.round;
        let GameState { players, cards, .. } = &mut self.state;
        let p = &mut players[player.index()];
        if self.rules.card_award == CardAward::OncePerRound && p.last_card_round == Some(round) {
            return None;
        }
        let card = cards.draw_card_for_player(p, &mut self.rng)?;
        p.last_card_round = Some(round);
        Some(card)
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }
}
