// ═══════════════════════════════════════════════════════════════════════
// Objectives — secret win conditions and the template factory
// ═══════════════════════════════════════════════════════════════════════

use crate::map::TerritoryGraph;
use crate::types::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Territories an elimination objective falls back to when the template
/// does not say.
pub const DEFAULT_ELIMINATION_FALLBACK: u32 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    /// Hold at least `required` territories.
    TerritoryCount { required: u32 },
    /// Hold every listed continent plus `extra` territories beyond them.
    DominateContinents { continents: Vec<ContinentId>, extra: u32 },
    /// Knock `target` out of the match, or hold `fallback_territories`.
    EliminatePlayer { target: PlayerId, fallback_territories: u32 },
    /// Placeholder for templates that could not be understood. Never won.
    Unattainable,
}

impl Objective {
    pub fn check_win(&self, player: PlayerId, state: &GameState) -> bool {
        let held = state.territory_count(player) as u32;
        match self {
            Objective::TerritoryCount { required } => held >= *required,
            Objective::DominateContinents { continents, extra } => {
                let all_held = continents.iter().all(|&c| state.controls_continent(player, c));
                let needed: u32 = continents.iter()
                    .filter_map(|&c| state.map.graph.continent(c))
                    .map(|c| c.territories.len() as u32)
                    .sum::<u32>()
                    + extra;
                all_held && held >= needed
            }
            Objective::EliminatePlayer { target, fallback_territories } => {
                held >= *fallback_territories
                    || (*target != player && !state.is_active(*target))
            }
            Objective::Unattainable => false,
        }
    }

    /// Build an objective from a declarative template. Anything that does
    /// not resolve becomes `Unattainable`.
    pub fn from_template(template: &ObjectiveTemplate, graph: &TerritoryGraph) -> Objective {
        let target = &template.target;
        match template.kind.as_str() {
            "territory_count" => match target.territory_count {
                Some(required) => Objective::TerritoryCount { required },
                None => unattainable(template, "missing territory_count"),
            },
            "conquest" | "mixed" => {
                let keys = target.continents.as_deref().unwrap_or_default();
                if keys.is_empty() {
                    return unattainable(template, "no continents listed");
                }
                let mut continents = Vec::with_capacity(keys.len());
                for key in keys {
                    match graph.continent_by_key(key) {
                        Some(id) => continents.push(id),
                        None => return unattainable(template, "unknown continent"),
                    }
                }
                Objective::DominateContinents {
                    continents,
                    extra: target.territory_count.unwrap_or(0),
                }
            }
            "elimination" => match target.eliminate_player {
                Some(seat) => Objective::EliminatePlayer {
                    target: PlayerId(seat),
                    fallback_territories: target.territory_count
                        .unwrap_or(DEFAULT_ELIMINATION_FALLBACK),
                },
                None => unattainable(template, "missing eliminate_player"),
            },
            _ => unattainable(template, "unknown objective type"),
        }
    }
}

fn unattainable(template: &ObjectiveTemplate, reason: &str) -> Objective {
    warn!(kind = %template.kind, title = %template.title, reason, "objective template not understood");
    Objective::Unattainable
}

// ── Templates ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveTemplate {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target: ObjectiveTarget,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveTarget {
    #[serde(default)]
    pub continents: Option<Vec<String>>,
    #[serde(default)]
    pub territory_count: Option<u32>,
    #[serde(default)]
    pub eliminate_player: Option<u8>,
}

/// An objective as held by a player, with its card text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealtObjective {
    pub title: String,
    pub description: String,
    pub objective: Objective,
}

impl DealtObjective {
    pub fn from_template(template: &ObjectiveTemplate, graph: &TerritoryGraph) -> Self {
        DealtObjective {
            title: template.title.clone(),
            description: template.description.clone(),
            objective: Objective::from_template(template, graph),
        }
    }

    /// Wrap a bare objective with a generated title.
    pub fn untitled(objective: Objective) -> Self {
        DealtObjective {
            title: format!("{objective:?}"),
            description: String::new(),
            objective,
        }
    }
}

/// Shuffle the templates and deal one to each seat in `roster`.
/// Elimination cards aimed at seats outside the roster are removed first.
/// If the pool runs dry the remaining seats get `Unattainable`.
pub fn deal_objectives<R: Rng + ?Sized>(
    templates: &[ObjectiveTemplate],
    graph: &TerritoryGraph,
    roster: &[PlayerId],
    rng: &mut R,
) -> Vec<DealtObjective> {
    let mut pool: Vec<DealtObjective> = templates.iter()
        .map(|t| DealtObjective::from_template(t, graph))
        .filter(|dealt| match dealt.objective {
            Objective::EliminatePlayer { target, .. } => roster.contains(&target),
            _ => true,
        })
        .collect();
    pool.shuffle(rng);

    let mut pool = pool.into_iter();
    roster.iter()
        .map(|_| pool.next().unwrap_or_else(|| DealtObjective::untitled(Objective::Unattainable)))
        .collect()
}
