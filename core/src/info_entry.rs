//! Guide entries unlocked by the prompts a player sees while progressing.
//!
//! Harvester and market prompts take precedence over the early-game
//! explore / build / farm prompts. Each entry is recorded once, in the
//! order it was first shown.

use crate::{
    building::{can_build, BuildingKind},
    state::GameState,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoEntryId {
    Explore,
    Build,
    Farm,
    Harvester,
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InfoEntry {
    pub id:          InfoEntryId,
    pub title:       &'static str,
    pub description: &'static str,
}

impl InfoEntryId {
    pub const ALL: [InfoEntryId; 5] =
        [Self::Explore, Self::Build, Self::Farm, Self::Harvester, Self::Market];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explore   => "explore",
            Self::Build     => "build",
            Self::Farm      => "farm",
            Self::Harvester => "harvester",
            Self::Market    => "market",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == raw)
    }

    pub fn entry(&self) -> InfoEntry {
        let (title, description) = match self {
            Self::Explore => ("Scout the Surface", "Clicking the planet produces a settler."),
            Self::Build => (
                "Establish Housing",
                "Having a settler allows you to build a house. Houses expand your population capacity.",
            ),
            Self::Farm => (
                "Cultivate Farms",
                "Having at least ten settlers allows you to build a farm. Farms produce crops that can be processed into grains.",
            ),
            Self::Harvester => (
                "Deploy a Harvester",
                "Gather at least five crop bundles to assemble a harvester. It automates grain collection to keep supplies flowing.",
            ),
            Self::Market => (
                "Open the Market",
                "Stockpile thirty grains to build a market. Markets convert grains into coins.",
            ),
        };
        InfoEntry { id: *self, title, description }
    }
}

/// The prompt a player would currently be shown, if any.
pub fn active_prompt(state: &GameState) -> Option<InfoEntryId> {
    if can_build(state, BuildingKind::Market) {
        return Some(InfoEntryId::Market);
    }
    if can_build(state, BuildingKind::Harvester) {
        return Some(InfoEntryId::Harvester);
    }

    let alive = state.alive_count();
    if alive == 0 {
        Some(InfoEntryId::Explore)
    } else if state.houses.is_empty() {
        Some(InfoEntryId::Build)
    } else if alive >= 10 && state.farms.is_empty() {
        Some(InfoEntryId::Farm)
    } else {
        None
    }
}

/// Record the active prompt's entry. Returns it when newly unlocked.
pub fn unlock_active(state: &mut GameState) -> Option<InfoEntryId> {
    let id = active_prompt(state)?;
    if state.info_entry_ids.iter().any(|known| known == id.as_str()) {
        return None;
    }
    state.info_entry_ids.push(id.as_str().to_string());
    Some(id)
}

/// Known entries for `ids`, deduplicated, unknown ids dropped.
pub fn resolve_entries(ids: &[String]) -> Vec<InfoEntry> {
    let mut seen = Vec::new();
    ids.iter()
        .filter_map(|raw| InfoEntryId::parse(raw))
        .filter(|id| {
            let fresh = !seen.contains(id);
            seen.push(*id);
            fresh
        })
        .map(|id| id.entry())
        .collect()
}
