//! Farm → Crop stage.
//!
//! Each farm grows one crop per farm_crop_spawn_interval_ms while it holds
//! fewer than farm_crop_capacity crops (0 = unlimited). Crops stay put
//! until the harvester picks them.

use crate::{
    error::SimResult,
    event::SimEvent,
    geometry::random_crop_position_near_farm,
    rng::SubsystemRng,
    state::{Crop, GameState},
    subsystem::SimSubsystem,
    types::{Millis, Point},
};

pub struct FarmSubsystem;

impl FarmSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FarmSubsystem {
    fn default() -> Self { Self::new() }
}

impl SimSubsystem for FarmSubsystem {
    fn name(&self) -> &'static str { "farm" }

    fn update(
        &mut self,
        state: &mut GameState,
        now: Millis,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let limit = match state.economy.farm_crop_capacity {
            0 => None,
            n => Some(n as usize),
        };
        let interval = state.economy.farm_crop_spawn_interval_ms;
        let mut events = Vec::new();

        for index in 0..state.farms.len() {
            let (farm_id, farm_position, last_produced) = {
                let farm = &state.farms[index];
                (farm.id, farm.position, farm.last_produced_ms)
            };

            let existing: Vec<Point> = state.crops_of_farm(farm_id).map(|c| c.position).collect();
            if limit.is_some_and(|limit| existing.len() >= limit) {
                continue;
            }
            if now - last_produced < interval {
                continue;
            }

            let position = random_crop_position_near_farm(farm_position, &existing, rng);
            let crop_id = state.ids.next_crop();
            state.crops.push(Crop { id: crop_id, farm_id, position, created_ms: now });
            state.farms[index].last_produced_ms = now;
            events.push(SimEvent::CropGrown { farm_id, crop_id });
        }

        if !events.is_empty() {
            log::debug!("{} crop(s) grown, {} standing", events.len(), state.crops.len());
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geometry::PLANET_CENTER, state::Farm};

    #[test]
    fn full_farm_skips_its_turn_without_resetting_timer() {
        let mut state = GameState::default();
        state.economy.farm_crop_capacity = 1;
        state.farms.push(Farm { id: 0, position: PLANET_CENTER, built_ms: 0.0, last_produced_ms: -10_000.0 });

        let mut farm = FarmSubsystem::new();
        let mut rng = SubsystemRng::new(1, 1, 0);
        assert_eq!(farm.update(&mut state, 0.0, &mut rng).unwrap().len(), 1);
        assert_eq!(farm.update(&mut state, 50_000.0, &mut rng).unwrap().len(), 0);
        assert_eq!(state.farms[0].last_produced_ms, 0.0);
        assert_eq!(state.crops.len(), 1);
    }
}
