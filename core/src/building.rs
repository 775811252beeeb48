//! Player construction.
//!
//! Checks run in a fixed order and the first failure wins:
//!   1. position inside the planet        (OutOfBounds)
//!   2. building-specific precondition    (BuildPreconditionUnmet)
//!   3. house / farm count limit          (CapacityExceeded)
//!   4. singleton not yet built           (BuildPreconditionUnmet)
//!
//! RULE: a refused build leaves the state untouched.

use crate::{
    error::ActionError,
    geometry::point_within_planet,
    state::{Farm, GameState, Harvester, House, Market, Researcher},
    types::{FarmId, HouseId, Millis, Point},
};
use serde::{Deserialize, Serialize};

pub const HOUSE_MIN_ALIVE: u64 = 1;
pub const FARM_MIN_ALIVE: u64 = 10;
pub const HARVESTER_MIN_CROPS: usize = 5;
pub const MARKET_MIN_GRAINS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    House,
    Farm,
    Harvester,
    Market,
    Researcher,
}

impl BuildingKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::House      => "house",
            Self::Farm       => "farm",
            Self::Harvester  => "harvester",
            Self::Market     => "market",
            Self::Researcher => "researcher",
        }
    }
}

/// What a successful build created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "building", rename_all = "snake_case")]
pub enum BuiltEntity {
    House { id: HouseId },
    Farm { id: FarmId },
    Harvester,
    Market,
    Researcher,
}

impl BuiltEntity {
    pub fn entity_id(&self) -> Option<u64> {
        match self {
            Self::House { id } | Self::Farm { id } => Some(*id),
            _ => None,
        }
    }
}

fn unmet(building: BuildingKind, reason: impl Into<String>) -> ActionError {
    ActionError::BuildPreconditionUnmet { building, reason: reason.into() }
}

/// Conditions that do not depend on where the building goes.
pub fn check_preconditions(state: &GameState, kind: BuildingKind) -> Result<(), ActionError> {
    let alive = state.alive_count();
    match kind {
        BuildingKind::House if alive < HOUSE_MIN_ALIVE => {
            return Err(unmet(kind, format!("needs {HOUSE_MIN_ALIVE} living settler")));
        }
        BuildingKind::Farm if alive < FARM_MIN_ALIVE => {
            return Err(unmet(kind, format!("needs {FARM_MIN_ALIVE} living settlers, have {alive}")));
        }
        BuildingKind::Harvester if state.crops.len() < HARVESTER_MIN_CROPS => {
            return Err(unmet(
                kind,
                format!("needs {HARVESTER_MIN_CROPS} crops, have {}", state.crops.len()),
            ));
        }
        BuildingKind::Market if state.grains() < MARKET_MIN_GRAINS => {
            return Err(unmet(
                kind,
                format!("needs {MARKET_MIN_GRAINS} grains in the pile, have {}", state.grains()),
            ));
        }
        BuildingKind::Researcher if state.market.is_none() => {
            return Err(unmet(kind, "needs a market"));
        }
        _ => {}
    }

    let economy = &state.economy;
    match kind {
        BuildingKind::House => {
            let limit = economy.houses_base_capacity;
            let current = state.houses.len() as u64;
            if limit > 0 && current >= limit {
                return Err(ActionError::CapacityExceeded { what: "house", current, limit });
            }
        }
        BuildingKind::Farm => {
            let limit = economy.farms_base_capacity;
            let current = state.farms.len() as u64;
            if limit > 0 && current >= limit {
                return Err(ActionError::CapacityExceeded { what: "farm", current, limit });
            }
        }
        BuildingKind::Harvester if state.harvester.is_some() => {
            return Err(unmet(kind, "already built"));
        }
        BuildingKind::Market if state.market.is_some() => {
            return Err(unmet(kind, "already built"));
        }
        BuildingKind::Researcher if state.researcher.is_some() => {
            return Err(unmet(kind, "already built"));
        }
        _ => {}
    }
    Ok(())
}

pub fn check(state: &GameState, kind: BuildingKind, at: Point) -> Result<(), ActionError> {
    if !point_within_planet(at) {
        return Err(ActionError::OutOfBounds { x: at.x, y: at.y });
    }
    check_preconditions(state, kind)
}

/// True when `kind` could be built somewhere on the planet right now.
pub fn can_build(state: &GameState, kind: BuildingKind) -> bool {
    check_preconditions(state, kind).is_ok()
}

pub fn build(
    state: &mut GameState,
    kind: BuildingKind,
    at: Point,
    now: Millis,
) -> Result<BuiltEntity, ActionError> {
    check(state, kind, at)?;

    let built = match kind {
        BuildingKind::House => {
            let id = state.ids.next_house();
            state.houses.push(House::new(id, at, now));
            BuiltEntity::House { id }
        }
        BuildingKind::Farm => {
            let id = state.ids.next_farm();
            // First crop is due immediately.
            let last_produced_ms = now - state.economy.farm_crop_spawn_interval_ms;
            state.farms.push(Farm { id, position: at, built_ms: now, last_produced_ms });
            apply_farm_lifespan_bonus(state);
            BuiltEntity::Farm { id }
        }
        BuildingKind::Harvester => {
            state.harvester = Some(Harvester::new(at, now));
            BuiltEntity::Harvester
        }
        BuildingKind::Market => {
            state.market = Some(Market { position: at, built_ms: now, last_sale_ms: now });
            BuiltEntity::Market
        }
        BuildingKind::Researcher => {
            state.researcher = Some(Researcher { position: at, built_ms: now });
            BuiltEntity::Researcher
        }
    };

    log::info!("Built {} at ({:.1}, {:.1})", kind.name(), at.x, at.y);
    Ok(built)
}

/// Every farm extends both lifespan bounds and every living mortal settler.
fn apply_farm_lifespan_bonus(state: &mut GameState) {
    let bonus = state.economy.farm_lifespan_bonus_per_farm_ms;
    state.economy.settler_min_lifespan_ms += bonus;
    state.economy.settler_max_lifespan_ms += bonus;
    for settler in state.settlers.iter_mut().filter(|s| s.is_alive() && !s.is_immortal()) {
        settler.lifespan_ms += bonus;
    }
}
