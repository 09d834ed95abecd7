// ═══════════════════════════════════════════════════════════════════════
// Card economy — deck lifecycle and the 3-card exchange
// ═══════════════════════════════════════════════════════════════════════

use crate::error::CommandError;
use crate::types::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

// ── Exchange rules ─────────────────────────────────────────────────────

/// Bonus for the first six exchanges of the match.
pub const EXCHANGE_BONUSES: [u32; 6] = [4, 6, 8, 10, 12, 15];

/// Armies granted by exchange number `n` (0-based, counted across all players).
pub fn exchange_bonus(n: u32) -> u32 {
    match EXCHANGE_BONUSES.get(n as usize) {
        Some(&bonus) => bonus,
        None => 15 + 5 * (n - 5),
    }
}

/// Three of a kind, one of each, or anything with a wildcard.
pub fn is_valid_set(cards: &[Card]) -> bool {
    let [a, b, c] = cards else {
        return false;
    };
    if a.is_wild() || b.is_wild() || c.is_wild() {
        return true;
    }
    let all_same = a.symbol == b.symbol && b.symbol == c.symbol;
    let all_distinct = a.symbol != b.symbol && b.symbol != c.symbol && a.symbol != c.symbol;
    all_same || all_distinct
}

/// Pick a valid set from a hand by counting symbols. Plain sets are
/// preferred so wildcards stay in hand.
pub fn find_exchange_set(hand: &[Card]) -> Option<[Card; 3]> {
    let bucket = |symbol: Symbol| -> Vec<Card> {
        hand.iter().filter(|c| c.symbol == symbol).copied().collect()
    };
    let plain: Vec<Vec<Card>> = Symbol::PLAIN.iter().map(|&s| bucket(s)).collect();
    let wild = bucket(Symbol::Wildcard);

    if let Some(group) = plain.iter().find(|g| g.len() >= 3) {
        return Some([group[0], group[1], group[2]]);
    }
    if plain.iter().all(|g| !g.is_empty()) {
        return Some([plain[0][0], plain[1][0], plain[2][0]]);
    }
    if wild.is_empty() {
        return None;
    }

    // One wildcard completes a pair, or two distinct singles.
    if let Some(pair) = plain.iter().find(|g| g.len() >= 2) {
        return Some([pair[0], pair[1], wild[0]]);
    }
    let singles: Vec<Card> = plain.iter().filter_map(|g| g.first().copied()).collect();
    match (singles.as_slice(), wild.len()) {
        ([x, y, ..], _) => Some([*x, *y, wild[0]]),
        ([x], w) if w >= 2 => Some([*x, wild[0], wild[1]]),
        ([], w) if w >= 3 => Some([wild[0], wild[1], wild[2]]),
        _ => None,
    }
}

// ── Deck ───────────────────────────────────────────────────────────────

/// Draw pile plus discard pile. Together with the players' hands these
/// always hold the full card set.
#[derive(Debug, Clone)]
pub struct Deck {
    draw_pile: Vec<Card>,
    discard_pile: Vec<Card>,
}

impl Deck {
    pub fn new<R: Rng + ?Sized>(cards: Vec<Card>, rng: &mut R) -> Self {
        let mut draw_pile = cards;
        draw_pile.shuffle(rng);
        Deck { draw_pile, discard_pile: Vec::new() }
    }

    /// Take the top card. An empty draw pile is refilled from the discard
    /// pile and reshuffled first.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Card> {
        if self.draw_pile.is_empty() {
            self.draw_pile.append(&mut self.discard_pile);
            self.draw_pile.shuffle(rng);
        }
        self.draw_pile.pop()
    }

    pub fn discard(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.discard_pile.extend(cards);
    }

    pub fn draw_pile_len(&self) -> usize {
        self.draw_pile.len()
    }

    pub fn discard_pile_len(&self) -> usize {
        self.discard_pile.len()
    }
}

// ── Card economy ───────────────────────────────────────────────────────

/// Result of a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeReport {
    pub player: PlayerId,
    /// 0-based position of this exchange in the match.
    pub exchange_number: u32,
    pub bonus: u32,
    /// Owned territories that received the per-card bonus.
    pub reinforced: Vec<TerritoryId>,
    pub cards: [Card; 3],
}

#[derive(Debug, Clone)]
pub struct CardEconomy {
    deck: Deck,
    exchanges: u32,
    hand_limit: usize,
}

impl CardEconomy {
    pub fn new<R: Rng + ?Sized>(cards: Vec<Card>, hand_limit: usize, rng: &mut R) -> Self {
        CardEconomy {
            deck: Deck::new(cards, rng),
            exchanges: 0,
            hand_limit,
        }
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn hand_limit(&self) -> usize {
        self.hand_limit
    }

    /// Exchanges made so far by all players.
    pub fn exchanges_made(&self) -> u32 {
        self.exchanges
    }

    /// What the next exchange, by anyone, would grant.
    pub fn next_exchange_bonus(&self) -> u32 {
        exchange_bonus(self.exchanges)
    }

    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Card> {
        self.deck.draw(rng)
    }

    pub fn discard(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.deck.discard(cards);
    }

    /// Deal a card into the player's hand while it is below the hand limit.
    pub fn draw_card_for_player<R: Rng + ?Sized>(&mut self, player: &mut Player, rng: &mut R) -> Option<Card> {
        if player.hand.len() >= self.hand_limit {
            return None;
        }
        let card = self.deck.draw(rng)?;
        player.hand.push(card);
        Some(card)
    }

    /// Trade three cards from the player's hand. The bonus goes to the
    /// player's pool; every traded card naming an owned territory puts
    /// `territory_bonus` armies directly on it. Nothing changes on error.
    pub fn execute_card_exchange(
        &mut self,
        cards: &[Card],
        player: &mut Player,
        territories: &mut [TerritoryState],
        territory_bonus: u32,
    ) -> Result<ExchangeReport, CommandError> {
        let [a, b, c] = *cards else {
            return Err(CommandError::InvalidCardSet);
        };
        if !is_valid_set(cards) {
            return Err(CommandError::InvalidCardSet);
        }

        // Match each card to a distinct hand slot.
        let mut slots: Vec<usize> = Vec::with_capacity(3);
        for card in [a, b, c] {
            let slot = (0..player.hand.len())
                .find(|&i| player.hand[i] == card && !slots.contains(&i))
                .ok_or(CommandError::CardNotHeld(card))?;
            slots.push(slot);
        }

        slots.sort_unstable_by(|x, y| y.cmp(x));
        for slot in slots {
            player.hand.remove(slot);
        }

        let exchange_number = self.exchanges;
        let bonus = exchange_bonus(exchange_number);
        self.exchanges += 1;
        player.reinforcements += bonus;

        let mut reinforced = Vec::new();
        for territory in [a, b, c].iter().filter_map(|card| card.territory) {
            if let Some(state) = territories.get_mut(territory.index()) {
                if state.owner == Some(player.id) {
                    state.armies += territory_bonus;
                    reinforced.push(territory);
                }
            }
        }

        self.deck.discard([a, b, c]);

        Ok(ExchangeReport {
            player: player.id,
            exchange_number,
            bonus,
            reinforced,
            cards: [a, b, c],
        })
    }
}
