//! Research tree.
//!
//! A node is visible once every node it depends on is completed. Clicking a
//! visible node adds one click, capped at its click requirement. A node
//! completes when the click gate passes and the purse covers the cost; the
//! cost is paid once and the node's effect applied.
//!
//! RULE: effects are idempotent. apply_completed_effects() runs after every
//! load and must converge to the same constants however often it runs.

use crate::{state::GameState, types::Millis};
use serde::{Deserialize, Serialize};

pub const HABITATION_EFFICIENCY_INTERVAL_MS: Millis = 2_000.0;
pub const COIN_STORAGE_CAPACITY: u64 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchRequirements {
    pub click_count: Option<u32>,
    pub coin_cost:   Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchNode {
    pub id:           &'static str,
    pub title:        &'static str,
    pub description:  &'static str,
    pub depends_on:   &'static [&'static str],
    pub requirements: Option<ResearchRequirements>,
}

pub const RESEARCH_NODES: &[ResearchNode] = &[
    ResearchNode {
        id:          "core-theory",
        title:       "Core Hypothesis",
        description: "Establish a unified model for planetary growth to unlock future breakthroughs.",
        depends_on:  &[],
        requirements: Some(ResearchRequirements { click_count: Some(100), coin_cost: Some(100) }),
    },
    ResearchNode {
        id:          "habitation-efficiency",
        title:       "Habitation Efficiency",
        description: "+1 settler per 2 seconds.",
        depends_on:  &["core-theory"],
        requirements: Some(ResearchRequirements { click_count: Some(150), coin_cost: Some(200) }),
    },
    ResearchNode {
        id:          "coin-storage",
        title:       "Coin Storage",
        description: "Increase the maximum coin capacity to 400.",
        depends_on:  &["core-theory"],
        requirements: Some(ResearchRequirements { click_count: Some(150), coin_cost: Some(200) }),
    },
];

pub fn find_node(node_id: &str) -> Option<&'static ResearchNode> {
    RESEARCH_NODES.iter().find(|node| node.id == node_id)
}

/// What a click did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResearchOutcome {
    /// Unknown, hidden or already completed node.
    Ignored,
    /// Click recorded (or the click gate is met and the purse is short).
    Progressed { clicks: u32 },
    Completed { coins_spent: u64 },
}

pub fn is_visible(state: &GameState, node: &ResearchNode) -> bool {
    node.depends_on.iter().all(|dep| state.is_research_completed(dep))
}

/// Nodes the player can currently click.
pub fn available_nodes(state: &GameState) -> Vec<&'static ResearchNode> {
    RESEARCH_NODES
        .iter()
        .filter(|node| is_visible(state, node) && !state.is_research_completed(node.id))
        .collect()
}

pub fn clicks_for(state: &GameState, node_id: &str) -> u32 {
    state.research_progress.get(node_id).copied().unwrap_or(0)
}

pub fn click_node(state: &mut GameState, node_id: &str) -> ResearchOutcome {
    let Some(node) = find_node(node_id) else {
        return ResearchOutcome::Ignored;
    };
    if state.is_research_completed(node.id) || !is_visible(state, node) {
        return ResearchOutcome::Ignored;
    }

    let click_count = node.requirements.and_then(|r| r.click_count);
    let coin_cost = node.requirements.and_then(|r| r.coin_cost).unwrap_or(0);

    let progress = state.research_progress.entry(node.id.to_string()).or_insert(0);
    let next = progress.saturating_add(1);
    *progress = click_count.map_or(next, |cap| next.min(cap));
    let clicks = *progress;

    let clicks_met = click_count.is_none_or(|required| clicks >= required);
    if !clicks_met || state.coins < coin_cost {
        return ResearchOutcome::Progressed { clicks };
    }

    state.coins = state.coins.saturating_sub(coin_cost);
    state.completed_research_node_ids.push(node.id.to_string());
    apply_node_effect(state, node.id);
    log::info!("Research '{}' completed for {} coins", node.id, coin_cost);
    ResearchOutcome::Completed { coins_spent: coin_cost }
}

pub fn apply_node_effect(state: &mut GameState, node_id: &str) {
    let economy = &mut state.economy;
    match node_id {
        "habitation-efficiency" => {
            economy.house_spawn_interval_ms =
                economy.house_spawn_interval_ms.min(HABITATION_EFFICIENCY_INTERVAL_MS);
        }
        "coin-storage" => {
            economy.coin_capacity = economy.coin_capacity.max(COIN_STORAGE_CAPACITY);
        }
        _ => {}
    }
}

pub fn apply_completed_effects(state: &mut GameState) {
    let completed = state.completed_research_node_ids.clone();
    for node_id in &completed {
        apply_node_effect(state, node_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependent_nodes_are_hidden_until_parent_completes() {
        let mut state = GameState::default();
        assert_eq!(click_node(&mut state, "coin-storage"), ResearchOutcome::Ignored);
        assert_eq!(click_node(&mut state, "no-such-node"), ResearchOutcome::Ignored);
        assert_eq!(available_nodes(&state).len(), 1);

        state.completed_research_node_ids.push("core-theory".into());
        assert_eq!(available_nodes(&state).len(), 2);
    }

    #[test]
    fn clicks_cap_and_wait_for_coins() {
        let mut state = GameState::default();
        for _ in 0..150 {
            click_node(&mut state, "core-theory");
        }
        assert_eq!(clicks_for(&state, "core-theory"), 100);
        assert!(!state.is_research_completed("core-theory"));

        state.coins = 130;
        assert_eq!(
            click_node(&mut state, "core-theory"),
            ResearchOutcome::Completed { coins_spent: 100 }
        );
        assert_eq!(state.coins, 30);
        assert_eq!(click_node(&mut state, "core-theory"), ResearchOutcome::Ignored);
        assert_eq!(state.completed_research_node_ids, vec!["core-theory".to_string()]);
    }
}
