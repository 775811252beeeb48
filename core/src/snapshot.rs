//! Read-only summary of a game state, for front ends and the runner.
//!
//! Built from `&GameState` on demand; never persisted.

use crate::{
    info_entry::{active_prompt, resolve_entries},
    research::available_nodes,
    state::GameState,
    types::{Millis, Tick},
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSnapshot {
    pub tick:                Tick,
    pub now_ms:              Millis,
    pub paused:              bool,
    pub planet_name:         String,
    pub alive_settlers:      u64,
    pub fading_settlers:     u64,
    /// None when population is unlimited.
    pub population_capacity: Option<u64>,
    pub houses:              usize,
    pub farms:               usize,
    pub crops:               usize,
    pub grains:              u64,
    pub grains_in_flight:    u64,
    pub grain_capacity:      u64,
    pub coins:               u64,
    pub coins_in_flight:     u64,
    pub coin_capacity:       u64,
    pub has_harvester:       bool,
    pub harvester_spin:      f64,
    pub has_market:          bool,
    pub has_researcher:      bool,
    pub completed_research:  Vec<String>,
    pub available_research:  Vec<&'static str>,
    pub info_entries:        Vec<&'static str>,
    pub active_prompt:       Option<&'static str>,
}

impl SimulationSnapshot {
    /// Tick and pause flag are the engine's to fill in.
    pub fn capture(state: &GameState, now: Millis) -> Self {
        let alive = state.alive_count();
        Self {
            tick:                0,
            now_ms:              now,
            paused:              false,
            planet_name:         state.planet_name.clone(),
            alive_settlers:      alive,
            fading_settlers:     state.settlers.len() as u64 - alive,
            population_capacity: state.population_capacity(),
            houses:              state.houses.len(),
            farms:               state.farms.len(),
            crops:               state.crops.len(),
            grains:              state.grains(),
            grains_in_flight:    state.grains_in_flight(),
            grain_capacity:      state.economy.grain_pile_capacity,
            coins:               state.coins,
            coins_in_flight:     state.coins_in_flight(),
            coin_capacity:       state.economy.coin_capacity,
            has_harvester:       state.harvester.is_some(),
            harvester_spin:      state.harvester.as_ref().map_or(0.0, |h| h.spin_level),
            has_market:          state.market.is_some(),
            has_researcher:      state.researcher.is_some(),
            completed_research:  state.completed_research_node_ids.clone(),
            available_research:  available_nodes(state).into_iter().map(|n| n.id).collect(),
            info_entries:        resolve_entries(&state.info_entry_ids)
                .into_iter()
                .map(|e| e.id.as_str())
                .collect(),
            active_prompt:       active_prompt(state).map(|id| id.as_str()),
        }
    }
}
