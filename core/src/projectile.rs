//! In-flight resource transfers.
//!
//! RULE: a projectile is never cancelled. Once launched it counts against
//! its destination's capacity until `deliver` lands it, exactly once.
//!
//! Dispatch table:
//!   Crop        → spawns a Grain aimed at the pile (held while no pile exists)
//!   Grain       → +1 grain in the pile, clamped to capacity
//!   MarketGrain → spawns a Coin rising above the market (held while no market)
//!   Coin        → +1 coin, clamped to coin capacity

use crate::{
    event::SimEvent,
    rng::SubsystemRng,
    state::GameState,
    types::{Millis, Point, ProjectileId},
};
use serde::{Deserialize, Serialize};

pub const CROP_FLIGHT_DURATION_MS: Millis = 700.0;
pub const GRAIN_THROW_DURATION_MS: Millis = 600.0;
pub const MARKET_GRAIN_FLIGHT_DURATION_MS: Millis = 800.0;
pub const COIN_FLIGHT_DURATION_MS: Millis = 900.0;
pub const COIN_RISE_DISTANCE: f64 = 40.0;

const GRAIN_TARGET_JITTER_X: f64 = 6.0;
const GRAIN_TARGET_JITTER_Y: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    /// Crop → harvester.
    Crop,
    /// Harvester → grain pile.
    Grain,
    /// Grain pile → market.
    MarketGrain,
    /// Market → coin purse.
    Coin,
}

impl ProjectileKind {
    pub fn flight_duration_ms(&self) -> Millis {
        match self {
            Self::Crop        => CROP_FLIGHT_DURATION_MS,
            Self::Grain       => GRAIN_THROW_DURATION_MS,
            Self::MarketGrain => MARKET_GRAIN_FLIGHT_DURATION_MS,
            Self::Coin        => COIN_FLIGHT_DURATION_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id:          ProjectileId,
    pub kind:        ProjectileKind,
    pub start:       Point,
    pub end:         Point,
    pub launched_ms: Millis,
    pub duration_ms: Millis,
}

impl Projectile {
    pub fn has_arrived(&self, now: Millis) -> bool {
        now - self.launched_ms >= self.duration_ms
    }
}

enum Delivery {
    Landed(Option<SimEvent>),
    /// Destination missing; stays in flight and retries next frame.
    Held,
}

/// Land every arrived projectile of `kind`. Projectiles launched by a
/// delivery are appended to the state and are not resolved in the same call.
pub fn resolve_arrivals(
    state: &mut GameState,
    kind: ProjectileKind,
    now: Millis,
    rng: &mut SubsystemRng,
) -> Vec<SimEvent> {
    let (arrived, in_flight): (Vec<Projectile>, Vec<Projectile>) =
        std::mem::take(&mut state.projectiles)
            .into_iter()
            .partition(|p| p.kind == kind && p.has_arrived(now));
    state.projectiles = in_flight;

    let mut events = Vec::new();
    let mut held = Vec::new();
    for projectile in arrived {
        match deliver(state, &projectile, now, rng) {
            Delivery::Landed(event) => events.extend(event),
            Delivery::Held => held.push(projectile),
        }
    }
    state.projectiles.extend(held);
    events
}

fn deliver(
    state: &mut GameState,
    projectile: &Projectile,
    now: Millis,
    rng: &mut SubsystemRng,
) -> Delivery {
    match projectile.kind {
        ProjectileKind::Crop => {
            let (Some(harvester), Some(pile)) = (&state.harvester, &state.grain_pile) else {
                return Delivery::Held;
            };
            let from = harvester.position;
            let to = pile.position.offset(
                rng.range(-GRAIN_TARGET_JITTER_X, GRAIN_TARGET_JITTER_X),
                rng.range(-GRAIN_TARGET_JITTER_Y, GRAIN_TARGET_JITTER_Y),
            );
            let projectile_id = state.launch(ProjectileKind::Grain, from, to, now);
            Delivery::Landed(Some(SimEvent::GrainThrown { projectile_id }))
        }
        ProjectileKind::Grain => {
            let capacity = state.economy.grain_pile_capacity;
            // A grain landing where no pile exists is lost.
            let Some(pile) = state.grain_pile.as_mut() else {
                return Delivery::Landed(None);
            };
            pile.grains = capacity.min(pile.grains.saturating_add(1));
            Delivery::Landed(Some(SimEvent::GrainDeposited { grains: pile.grains }))
        }
        ProjectileKind::MarketGrain => {
            let Some(market) = &state.market else {
                return Delivery::Held;
            };
            let from = market.position;
            let to = from.offset(0.0, -COIN_RISE_DISTANCE);
            let projectile_id = state.launch(ProjectileKind::Coin, from, to, now);
            Delivery::Landed(Some(SimEvent::CoinMinted { projectile_id }))
        }
        ProjectileKind::Coin => {
            state.coins = state.economy.coin_capacity.min(state.coins.saturating_add(1));
            Delivery::Landed(Some(SimEvent::CoinDeposited { coins: state.coins }))
        }
    }
}
