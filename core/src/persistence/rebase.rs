//! Timestamp rebasing.
//!
//! Saves store absolute times from the saving device's clock. On load every
//! timestamp is shifted so the latest moment recorded in the save lines up
//! with the loading device's "now". Elapsed durations (ages, timers,
//! flight progress) are preserved exactly.
//!
//! RULE: timestamps that are not finite (a house that never spawned) are
//! never shifted.

use crate::{state::GameState, types::Millis};

/// Shifts smaller than this are treated as clock noise.
pub const REBASE_EPSILON_MS: Millis = 0.001;

/// Visit every stored timestamp mutably. Durations (lifespans, flight
/// durations) are not timestamps and are left alone.
pub fn visit_timestamps_mut(state: &mut GameState, mut visit: impl FnMut(&mut Millis)) {
    for settler in &mut state.settlers {
        visit(&mut settler.move_start_ms);
        visit(&mut settler.last_direction_change_ms);
        visit(&mut settler.birth_ms);
        if let crate::state::SettlerPhase::Fading { started_ms } = &mut settler.phase {
            visit(started_ms);
        }
    }
    for house in &mut state.houses {
        visit(&mut house.built_ms);
        visit(&mut house.last_spawn_ms);
    }
    for farm in &mut state.farms {
        visit(&mut farm.built_ms);
        visit(&mut farm.last_produced_ms);
    }
    for crop in &mut state.crops {
        visit(&mut crop.created_ms);
    }
    if let Some(harvester) = &mut state.harvester {
        visit(&mut harvester.built_ms);
        visit(&mut harvester.last_harvest_ms);
        visit(&mut harvester.last_spin_update_ms);
    }
    if let Some(pile) = &mut state.grain_pile {
        visit(&mut pile.created_ms);
    }
    if let Some(market) = &mut state.market {
        visit(&mut market.built_ms);
        visit(&mut market.last_sale_ms);
    }
    if let Some(researcher) = &mut state.researcher {
        visit(&mut researcher.built_ms);
    }
    for projectile in &mut state.projectiles {
        visit(&mut projectile.launched_ms);
    }
}

pub fn collect_timestamps(state: &GameState) -> Vec<Millis> {
    // Visiting a scratch copy keeps the field list in one place.
    let mut scratch = state.clone();
    let mut out = Vec::new();
    visit_timestamps_mut(&mut scratch, |t| out.push(*t));
    out
}

/// Latest finite timestamp in the state, if any.
pub fn latest_timestamp(state: &GameState) -> Option<Millis> {
    collect_timestamps(state)
        .into_iter()
        .filter(|t| t.is_finite())
        .reduce(f64::max)
}

/// Add `delta` to every finite timestamp.
pub fn shift_timestamps(state: &mut GameState, delta: Millis) {
    if !delta.is_finite() {
        return;
    }
    visit_timestamps_mut(state, |t| {
        if t.is_finite() {
            *t += delta;
        }
    });
}

/// Re-anchor a freshly loaded state onto `device_now`. The baseline is the
/// later of the save's reference time and its latest timestamp. Returns the
/// applied shift (0 when none was needed).
pub fn rebase(state: &mut GameState, reference_ms: Option<Millis>, device_now: Millis) -> Millis {
    let baseline = [reference_ms, latest_timestamp(state)]
        .into_iter()
        .flatten()
        .filter(|t| t.is_finite())
        .reduce(f64::max);

    let Some(baseline) = baseline else {
        return 0.0;
    };
    let delta = device_now - baseline;
    if !delta.is_finite() || delta.abs() <= REBASE_EPSILON_MS {
        return 0.0;
    }

    shift_timestamps(state, delta);
    log::debug!("Rebased save timestamps by {delta:.3}ms");
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        state::{Crop, Farm, House, Market, Settler},
        types::Point,
    };

    fn populated() -> GameState {
        let mut state = GameState::default();
        state.settlers.push(Settler::new(0, Point::default(), 1_000.0, 5_000.0));
        state.houses.push(House::new(0, Point::default(), 500.0));
        state.farms.push(Farm {
            id: 0,
            position: Point::default(),
            built_ms: 600.0,
            last_produced_ms: 900.0,
        });
        state.crops.push(Crop { id: 0, farm_id: 0, position: Point::default(), created_ms: 950.0 });
        state.market = Some(Market { position: Point::default(), built_ms: 700.0, last_sale_ms: 800.0 });
        state
    }

    #[test]
    fn shift_preserves_elapsed_time_and_skips_infinities() {
        let mut state = populated();
        let delta = rebase(&mut state, Some(1_000.0), 61_000.0);

        assert_eq!(delta, 60_000.0);
        assert_eq!(state.settlers[0].birth_ms, 61_000.0);
        assert_eq!(state.houses[0].built_ms, 60_500.0);
        assert_eq!(state.houses[0].last_spawn_ms, f64::NEG_INFINITY);
        assert_eq!(state.crops[0].created_ms - state.farms[0].last_produced_ms, 50.0);
    }

    #[test]
    fn baseline_is_latest_of_reference_and_contents() {
        let mut state = populated();
        // Reference predates the settler's birth at 1000.
        let delta = rebase(&mut state, Some(200.0), 2_000.0);
        assert_eq!(delta, 1_000.0);

        let mut empty = GameState::default();
        assert_eq!(rebase(&mut empty, None, 5_000.0), 0.0);
    }

    #[test]
    fn tiny_shift_is_ignored() {
        let mut state = populated();
        assert_eq!(rebase(&mut state, Some(1_000.0), 1_000.0005), 0.0);
        assert_eq!(state.settlers[0].birth_ms, 1_000.0);
    }

    #[test]
    fn visitor_sees_every_timestamp() {
        let state = populated();
        // 3 settler + 2 house + 2 farm + 1 crop + 2 market
        assert_eq!(collect_timestamps(&state).len(), 10);
        assert_eq!(latest_timestamp(&state), Some(1_000.0));
    }
}
