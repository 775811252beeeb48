//! Crop → Harvester → GrainPile stage.
//!
//! Execution, every frame:
//!   1. Land arrived grain in the pile (runs even without a harvester).
//!   2. Create the grain pile once there is crop work for it.
//!   3. Every HARVESTER_PROCESS_INTERVAL_MS, launch one random crop at the
//!      harvester, if the pile has room for it after everything in flight.
//!   4. Turn arrived crops into grain thrown at the pile.
//!   5. Ramp the spin level and advance the rotation.
//!
//! RULE: grains + in-flight(Crop, Grain) ≤ grain_pile_capacity holds
//! before step 3 commits a harvest.

use crate::{
    error::SimResult,
    event::SimEvent,
    geometry::random_point_on_planet,
    projectile::{resolve_arrivals, ProjectileKind},
    rng::SubsystemRng,
    state::{GameState, GrainPile, Harvester},
    subsystem::SimSubsystem,
    types::Millis,
};
use std::f64::consts::{FRAC_PI_2, TAU};

pub const HARVESTER_PROCESS_INTERVAL_MS: Millis = 1_000.0;
const SPIN_RAMP_UP_MS: Millis = 420.0;
const SPIN_RAMP_DOWN_MS: Millis = 320.0;

pub struct HarvesterSubsystem;

impl HarvesterSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HarvesterSubsystem {
    fn default() -> Self { Self::new() }
}

impl SimSubsystem for HarvesterSubsystem {
    fn name(&self) -> &'static str { "harvester" }

    fn update(
        &mut self,
        state: &mut GameState,
        now: Millis,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = resolve_arrivals(state, ProjectileKind::Grain, now, rng);

        if state.harvester.is_none() {
            return Ok(events);
        }

        if state.grain_pile.is_none()
            && (!state.crops.is_empty() || state.in_flight(ProjectileKind::Crop) > 0)
        {
            let position = random_point_on_planet(rng);
            state.grain_pile = Some(GrainPile { position, grains: 0, created_ms: now });
            log::info!("Grain pile created at ({:.1}, {:.1})", position.x, position.y);
            events.push(SimEvent::GrainPileCreated { x: position.x, y: position.y });
        }

        events.extend(harvest_one(state, now, rng));
        events.extend(resolve_arrivals(state, ProjectileKind::Crop, now, rng));

        let target = spin_target(state);
        if let Some(harvester) = state.harvester.as_mut() {
            update_spin(harvester, target, now);
        }

        Ok(events)
    }
}

fn harvest_one(state: &mut GameState, now: Millis, rng: &mut SubsystemRng) -> Option<SimEvent> {
    let harvester = state.harvester.as_ref()?;
    if state.grain_pile.is_none()
        || state.crops.is_empty()
        || state.grain_capacity_remaining() == 0
        || now - harvester.last_harvest_ms < HARVESTER_PROCESS_INTERVAL_MS
    {
        return None;
    }

    let to = harvester.position;
    let crop = state.crops.remove(rng.index(state.crops.len()));
    let projectile_id = state.launch(ProjectileKind::Crop, crop.position, to, now);
    if let Some(harvester) = state.harvester.as_mut() {
        harvester.last_harvest_ms = now;
    }
    Some(SimEvent::CropHarvested { crop_id: crop.id, projectile_id })
}

/// 1 while there is work the pile can absorb, or deliveries still in the air.
fn spin_target(state: &GameState) -> f64 {
    let has_capacity = state.grain_capacity_remaining() > 0;
    let has_pending = state.grains_in_flight() > 0;
    let has_idle_crops = !state.crops.is_empty();

    if (has_capacity && (has_idle_crops || has_pending)) || has_pending {
        1.0
    } else {
        0.0
    }
}

fn update_spin(harvester: &mut Harvester, target: f64, now: Millis) {
    let delta = (now - harvester.last_spin_update_ms).max(0.0);
    harvester.last_spin_update_ms = now;

    if target > harvester.spin_level {
        harvester.spin_level = target.min(harvester.spin_level + delta / SPIN_RAMP_UP_MS);
    } else if target < harvester.spin_level {
        harvester.spin_level = target.max(harvester.spin_level - delta / SPIN_RAMP_DOWN_MS);
    }

    let speed = FRAC_PI_2 / HARVESTER_PROCESS_INTERVAL_MS;
    let angle = harvester.rotation_angle + speed * delta * harvester.spin_level;
    harvester.rotation_angle = if angle.is_finite() { angle.rem_euclid(TAU) } else { 0.0 };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    #[test]
    fn spin_ramps_and_wraps() {
        let mut harvester = Harvester::new(Point::default(), 0.0);
        update_spin(&mut harvester, 1.0, 210.0);
        assert!((harvester.spin_level - 0.5).abs() < 1e-9);

        update_spin(&mut harvester, 1.0, 10_000.0);
        assert_eq!(harvester.spin_level, 1.0);
        assert!((0.0..TAU).contains(&harvester.rotation_angle));

        update_spin(&mut harvester, 0.0, 10_160.0);
        assert!((harvester.spin_level - 0.5).abs() < 1e-9);
    }

    #[test]
    fn nan_rotation_resets() {
        let mut harvester = Harvester::new(Point::default(), 0.0);
        harvester.rotation_angle = f64::NAN;
        update_spin(&mut harvester, 0.0, 10.0);
        assert_eq!(harvester.rotation_angle, 0.0);
    }
}
