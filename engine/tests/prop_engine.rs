//! Property-based tests for the board graph, card economy and combat.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use conquest_engine::cards::{exchange_bonus, find_exchange_set, is_valid_set, Deck};
use conquest_engine::combat::{resolve_attack, ScriptedDice};
use conquest_engine::{Card, Map, Symbol, TerritoryGraph, TerritoryId};

fn symbol() -> impl Strategy<Value = Symbol> {
    prop_oneof![
        Just(Symbol::Triangle),
        Just(Symbol::Circle),
        Just(Symbol::Square),
        Just(Symbol::Wildcard),
    ]
}

fn hand() -> impl Strategy<Value = Vec<Card>> {
    prop::collection::vec(symbol(), 0..9).prop_map(|symbols| {
        symbols.into_iter().enumerate()
            .map(|(i, s)| match s {
                Symbol::Wildcard => Card::wildcard(),
                s => Card::territory(TerritoryId(i as u16), s),
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Every edge added is visible from both ends, exactly once.
    #[test]
    fn prop_edges_symmetric(edges in prop::collection::vec((0u8..20, 0u8..20), 0..80)) {
        let mut graph = TerritoryGraph::new();
        for (a, b) in &edges {
            graph.add_edge(&format!("T{a}"), &format!("T{b}"));
        }
        for a in graph.ids() {
            let neighbors = graph.neighbors(a);
            for &b in neighbors {
                prop_assert!(graph.are_adjacent(b, a));
                prop_assert_ne!(a, b);
                prop_assert_eq!(neighbors.iter().filter(|&&n| n == b).count(), 1);
            }
        }
    }

    /// Distribution hands out every territory once, shares differ by at most one,
    /// and the extras go to the lowest seats.
    #[test]
    fn prop_distribution_balanced(players in 2usize..=6, seed in any::<u64>()) {
        let map = Map::standard().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let allotments = map.graph.distribute(players, &mut rng);

        let mut all: Vec<TerritoryId> = allotments.iter().flatten().copied().collect();
        all.sort();
        all.dedup();
        prop_assert_eq!(all.len(), map.territory_count());

        let sizes: Vec<usize> = allotments.iter().map(Vec::len).collect();
        prop_assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
        prop_assert!(sizes[0] - sizes[players - 1] <= 1);
    }

    /// Draws and discards never create or lose a card.
    #[test]
    fn prop_deck_conserves_cards(ops in prop::collection::vec(any::<bool>(), 0..200), seed in any::<u64>()) {
        let map = Map::standard().unwrap();
        let total = map.card_set().len();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut deck = Deck::new(map.card_set(), &mut rng);
        let mut held: Vec<Card> = Vec::new();

        for draw in ops {
            if draw {
                if let Some(card) = deck.draw(&mut rng) {
                    held.push(card);
                }
            } else if let Some(card) = held.pop() {
                deck.discard([card]);
            }
            prop_assert_eq!(deck.draw_pile_len() + deck.discard_pile_len() + held.len(), total);
        }

        let mut territories: Vec<TerritoryId> = held.iter().filter_map(|c| c.territory).collect();
        let count = territories.len();
        territories.sort();
        territories.dedup();
        prop_assert_eq!(territories.len(), count);
    }

    /// Dice counts follow the caps and every compared pair costs exactly one army.
    #[test]
    fn prop_combat_losses(
        troops in 1u32..20,
        defenders in 1u32..20,
        cap in 1u32..=3,
        faces in prop::collection::vec(1u8..=6, 1..12)
    ) {
        let mut dice = ScriptedDice::new(faces);
        let roll = resolve_attack(troops, defenders, cap, &mut dice);

        prop_assert_eq!(roll.attacker_dice.len() as u32, troops.min(3));
        prop_assert_eq!(roll.defender_dice.len() as u32, defenders.min(cap));
        prop_assert!(roll.attacker_dice.windows(2).all(|w| w[0] >= w[1]));
        prop_assert!(roll.defender_dice.windows(2).all(|w| w[0] >= w[1]));
        let pairs = roll.attacker_dice.len().min(roll.defender_dice.len()) as u32;
        prop_assert_eq!(roll.attacker_loss + roll.defender_loss, pairs);
        prop_assert!(roll.defender_loss <= defenders);
    }

    /// Any set found in a hand is valid and made of cards from that hand.
    #[test]
    fn prop_found_set_is_valid(hand in hand()) {
        match find_exchange_set(&hand) {
            Some(set) => {
                prop_assert!(is_valid_set(&set));
                let mut remaining = hand.clone();
                for card in set {
                    let slot = remaining.iter().position(|c| *c == card);
                    prop_assert!(slot.is_some());
                    remaining.remove(slot.unwrap());
                }
            }
            None => prop_assert!(hand.len() < 5),
        }
    }

    #[test]
    fn prop_exchange_bonus_increasing(n in 0u32..500) {
        prop_assert!(exchange_bonus(n + 1) > exchange_bonus(n));
    }
}
