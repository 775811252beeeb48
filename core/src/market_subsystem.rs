//! GrainPile → Market → coins stage.
//!
//! Same pattern as the harvester: land arrivals first, then at most one
//! sale per MARKET_SALE_INTERVAL_MS when the pile holds grain and the
//! purse has room for it after every coin already in flight.

use crate::{
    error::SimResult,
    event::SimEvent,
    projectile::{resolve_arrivals, ProjectileKind},
    rng::SubsystemRng,
    state::GameState,
    subsystem::SimSubsystem,
    types::Millis,
};

pub const MARKET_SALE_INTERVAL_MS: Millis = 1_500.0;

pub struct MarketSubsystem;

impl MarketSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MarketSubsystem {
    fn default() -> Self { Self::new() }
}

impl SimSubsystem for MarketSubsystem {
    fn name(&self) -> &'static str { "market" }

    fn update(
        &mut self,
        state: &mut GameState,
        now: Millis,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = resolve_arrivals(state, ProjectileKind::Coin, now, rng);
        if state.market.is_none() {
            return Ok(events);
        }

        events.extend(resolve_arrivals(state, ProjectileKind::MarketGrain, now, rng));
        events.extend(sell_one(state, now));
        Ok(events)
    }
}

fn sell_one(state: &mut GameState, now: Millis) -> Option<SimEvent> {
    let market = state.market.as_ref()?;
    let pile = state.grain_pile.as_ref()?;
    if pile.grains == 0
        || state.coin_capacity_remaining() == 0
        || now - market.last_sale_ms < MARKET_SALE_INTERVAL_MS
    {
        return None;
    }

    let (from, to) = (pile.position, market.position);
    if let Some(pile) = state.grain_pile.as_mut() {
        pile.grains -= 1;
    }
    if let Some(market) = state.market.as_mut() {
        market.last_sale_ms = now;
    }
    let projectile_id = state.launch(ProjectileKind::MarketGrain, from, to, now);
    Some(SimEvent::GrainSold { projectile_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        state::{GrainPile, Market},
        types::Point,
    };

    fn market_state(grains: u64) -> GameState {
        let mut state = GameState::default();
        state.grain_pile = Some(GrainPile { position: Point::new(300.0, 300.0), grains, created_ms: 0.0 });
        state.market = Some(Market { position: Point::new(400.0, 400.0), built_ms: 0.0, last_sale_ms: -5_000.0 });
        state
    }

    #[test]
    fn sale_moves_one_grain_into_flight() {
        let mut state = market_state(3);
        let event = sell_one(&mut state, 0.0);
        assert!(matches!(event, Some(SimEvent::GrainSold { projectile_id: 0 })));
        assert_eq!(state.grains(), 2);
        assert_eq!(state.coins_in_flight(), 1);

        // Interval not yet elapsed.
        assert!(sell_one(&mut state, 100.0).is_none());
    }

    #[test]
    fn full_purse_blocks_sales() {
        let mut state = market_state(3);
        state.economy.coin_capacity = 1;
        state.coins = 1;
        assert!(sell_one(&mut state, 0.0).is_none());
        assert_eq!(state.grains(), 3);
    }
}
