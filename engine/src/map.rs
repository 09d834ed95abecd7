// ═══════════════════════════════════════════════════════════════════════
// Map — territory graph, continents, card table, objective templates
//
// The graph is an arena: territories are numbered in load order and every
// lookup goes through a TerritoryId. Reference data is JSON; the standard
// 44-territory world ships embedded in the binary.
// ═══════════════════════════════════════════════════════════════════════

use crate::error::LoadError;
use crate::objectives::ObjectiveTemplate;
use crate::types::{Card, ContinentId, Symbol, TerritoryId};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

const STANDARD_WORLD: &str = include_str!("../data/world.json");

/// A named group of territories granting a bonus when fully held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continent {
    /// Short key used by objective templates, e.g. "SA".
    pub key: String,
    pub name: String,
    pub bonus: u32,
    pub territories: Vec<TerritoryId>,
}

// ── Territory graph ────────────────────────────────────────────────────

/// Undirected adjacency between territories plus continent membership.
/// Unknown ids and names yield empty answers rather than errors.
#[derive(Debug, Clone, Default)]
pub struct TerritoryGraph {
    names: Vec<String>,
    index: HashMap<String, TerritoryId>,
    adjacent: Vec<Vec<TerritoryId>>,
    continents: Vec<Continent>,
    continent_of: Vec<Option<ContinentId>>,
}

impl TerritoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a territory, returning its id. Adding an existing name is a no-op.
    pub fn add_vertex(&mut self, name: &str) -> TerritoryId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = TerritoryId(self.names.len() as u16);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        self.adjacent.push(Vec::new());
        self.continent_of.push(None);
        id
    }

    /// Border two territories, creating either endpoint if missing.
    /// The relation is stored in both directions, once per pair.
    pub fn add_edge(&mut self, a: &str, b: &str) {
        let a = self.add_vertex(a);
        let b = self.add_vertex(b);
        if a == b {
            return;
        }
        if !self.adjacent[a.index()].contains(&b) {
            self.adjacent[a.index()].push(b);
        }
        if !self.adjacent[b.index()].contains(&a) {
            self.adjacent[b.index()].push(a);
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = TerritoryId> {
        (0..self.names.len()).map(|i| TerritoryId(i as u16))
    }

    pub fn id(&self, name: &str) -> Option<TerritoryId> {
        self.index.get(name).copied()
    }

    pub fn name(&self, id: TerritoryId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    pub fn neighbors(&self, id: TerritoryId) -> &[TerritoryId] {
        self.adjacent.get(id.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn neighbors_by_name(&self, name: &str) -> Vec<&str> {
        self.id(name)
            .map(|id| self.neighbors(id).iter().filter_map(|&n| self.name(n)).collect())
            .unwrap_or_default()
    }

    pub fn are_adjacent(&self, a: TerritoryId, b: TerritoryId) -> bool {
        self.neighbors(a).contains(&b)
    }

    // ── Continents ─────────────────────────────────────────────────────

    /// Register a continent over existing territories. A territory keeps
    /// its first continent if listed twice.
    pub fn add_continent(&mut self, key: &str, name: &str, bonus: u32, members: &[TerritoryId]) -> ContinentId {
        let id = ContinentId(self.continents.len() as u8);
        let mut territories = Vec::with_capacity(members.len());
        for &t in members {
            if let Some(slot) = self.continent_of.get_mut(t.index()) {
                if slot.is_none() {
                    *slot = Some(id);
                    territories.push(t);
                }
            }
        }
        self.continents.push(Continent {
            key: key.to_string(),
            name: name.to_string(),
            bonus,
            territories,
        });
        id
    }

    pub fn continents(&self) -> &[Continent] {
        &self.continents
    }

    pub fn continent_ids(&self) -> impl Iterator<Item = ContinentId> {
        (0..self.continents.len()).map(|i| ContinentId(i as u8))
    }

    pub fn continent(&self, id: ContinentId) -> Option<&Continent> {
        self.continents.get(id.index())
    }

    pub fn continent_by_key(&self, key: &str) -> Option<ContinentId> {
        self.continents.iter()
            .position(|c| c.key == key)
            .map(|i| ContinentId(i as u8))
    }

    pub fn continent_of(&self, territory: TerritoryId) -> Option<ContinentId> {
        self.continent_of.get(territory.index()).copied().flatten()
    }

    /// Continent key → member territory ids.
    pub fn territories_by_continent(&self) -> HashMap<&str, Vec<TerritoryId>> {
        self.continents.iter()
            .map(|c| (c.key.as_str(), c.territories.clone()))
            .collect()
    }

    // ── Initial distribution ───────────────────────────────────────────

    /// Shuffle every territory and deal them out: each player in turn gets
    /// `total / player_count`, then the remainder goes round-robin from
    /// player 0. Returns one allotment per player.
    pub fn distribute<R: Rng + ?Sized>(&self, player_count: usize, rng: &mut R) -> Vec<Vec<TerritoryId>> {
        if player_count == 0 {
            return Vec::new();
        }
        let mut ids: Vec<TerritoryId> = self.ids().collect();
        ids.shuffle(rng);

        let share = ids.len() / player_count;
        let mut deal = ids.into_iter();
        let mut allotments: Vec<Vec<TerritoryId>> = (0..player_count)
            .map(|_| deal.by_ref().take(share).collect())
            .collect();
        for (i, t) in deal.enumerate() {
            allotments[i % player_count].push(t);
        }
        allotments
    }
}

// ── Reference data (serde) ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapData {
    /// Territory name → bordering territory names.
    pub borders: BTreeMap<String, Vec<String>>,
    /// Continent key → definition.
    pub continents: BTreeMap<String, ContinentData>,
    pub cards: CardData,
    #[serde(default)]
    pub objectives: Vec<ObjectiveTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinentData {
    pub name: String,
    pub bonus: u32,
    pub territories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardData {
    pub symbols: BTreeMap<String, Symbol>,
    #[serde(default)]
    pub wildcards: u8,
}

// ── Map ────────────────────────────────────────────────────────────────

/// Everything about the board that never changes during a match.
#[derive(Debug, Clone)]
pub struct Map {
    pub graph: TerritoryGraph,
    /// Card symbol per territory, indexed by TerritoryId.
    symbols: Vec<Symbol>,
    wildcards: u8,
    objectives: Vec<ObjectiveTemplate>,
}

impl Map {
    /// The built-in 44-territory world.
    pub fn standard() -> Result<Map, LoadError> {
        Map::from_json(STANDARD_WORLD)
    }

    pub fn from_json(json: &str) -> Result<Map, LoadError> {
        let data: MapData = serde_json::from_str(json)?;
        Map::from_data(data)
    }

    pub fn from_file(path: &Path) -> Result<Map, LoadError> {
        let content = std::fs::read_to_string(path)?;
        Map::from_json(&content)
    }

    pub fn from_data(data: MapData) -> Result<Map, LoadError> {
        if data.borders.len() > u16::MAX as usize {
            return Err(LoadError::TooManyTerritories(data.borders.len()));
        }

        let mut graph = TerritoryGraph::new();
        for name in data.borders.keys() {
            graph.add_vertex(name);
        }
        for (name, borders) in &data.borders {
            for other in borders {
                if graph.id(other).is_none() {
                    return Err(LoadError::UnknownTerritory {
                        context: format!("borders of '{name}'"),
                        name: other.clone(),
                    });
                }
                graph.add_edge(name, other);
            }
        }

        let mut seen: HashMap<&str, &str> = HashMap::new();
        for (key, continent) in &data.continents {
            let mut members = Vec::with_capacity(continent.territories.len());
            for name in &continent.territories {
                let id = graph.id(name).ok_or_else(|| LoadError::UnknownTerritory {
                    context: format!("continent '{key}'"),
                    name: name.clone(),
                })?;
                if let Some(first) = seen.insert(name.as_str(), key.as_str()) {
                    return Err(LoadError::DuplicateMembership {
                        name: name.clone(),
                        first: first.to_string(),
                        second: key.clone(),
                    });
                }
                members.push(id);
            }
            graph.add_continent(key, &continent.name, continent.bonus, &members);
        }
        if let Some(orphan) = graph.ids().find(|&t| graph.continent_of(t).is_none()) {
            return Err(LoadError::Orphan(graph.name(orphan).unwrap_or_default().to_string()));
        }

        let mut symbols = Vec::with_capacity(graph.len());
        for t in graph.ids() {
            let name = graph.name(t).unwrap_or_default();
            let symbol = data.cards.symbols.get(name)
                .copied()
                .ok_or_else(|| LoadError::MissingSymbol(name.to_string()))?;
            symbols.push(symbol);
        }
        if let Some(stray) = data.cards.symbols.keys().find(|n| graph.id(n).is_none()) {
            return Err(LoadError::UnknownTerritory {
                context: "card table".to_string(),
                name: stray.clone(),
            });
        }

        Ok(Map {
            graph,
            symbols,
            wildcards: data.cards.wildcards,
            objectives: data.objectives,
        })
    }

    pub fn territory_count(&self) -> usize {
        self.graph.len()
    }

    pub fn territory_name(&self, id: TerritoryId) -> &str {
        self.graph.name(id).unwrap_or("?")
    }

    pub fn symbol(&self, id: TerritoryId) -> Option<Symbol> {
        self.symbols.get(id.index()).copied()
    }

    /// The full card universe: one card per territory, then the wildcards.
    pub fn card_set(&self) -> Vec<Card> {
        let mut cards: Vec<Card> = self.graph.ids()
            .zip(self.symbols.iter())
            .map(|(t, &s)| Card::territory(t, s))
            .collect();
        cards.extend((0..self.wildcards).map(|_| Card::wildcard()));
        cards
    }

    pub fn objective_templates(&self) -> &[ObjectiveTemplate] {
        &self.objectives
    }
}
