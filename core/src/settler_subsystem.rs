//! Settler lifecycle and house spawning.
//!
//! Per settler, every frame:
//!   Alive  → Fading   when lifespan_ms > 0 and now − birth_ms ≥ lifespan_ms
//!   Fading → removed  when now − started_ms ≥ FADING_DURATION_MS
//!   Alive settlers pick a new wander target every MOVE_INTERVAL_MS.
//!
//! Houses then spawn in stable order, each limited by the remaining
//! population capacity. A house only resets its timer if it spawned.
//!
//! Depends on: state.rs (population capacity), geometry.rs.

use crate::{
    error::SimResult,
    event::SimEvent,
    geometry::random_target_near,
    rng::SubsystemRng,
    state::{GameState, Settler, SettlerPhase},
    subsystem::SimSubsystem,
    types::{Millis, Point, SettlerId},
};

pub const MOVE_INTERVAL_MS: Millis = 2_000.0;
pub const FADING_DURATION_MS: Millis = 1_200.0;

pub struct SettlerSubsystem;

impl SettlerSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SettlerSubsystem {
    fn default() -> Self { Self::new() }
}

impl SimSubsystem for SettlerSubsystem {
    fn name(&self) -> &'static str { "settler" }

    fn update(
        &mut self,
        state: &mut GameState,
        now: Millis,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = advance_lifecycles(state, now, rng);
        events.extend(spawn_from_houses(state, now, rng));
        Ok(events)
    }
}

fn advance_lifecycles(state: &mut GameState, now: Millis, rng: &mut SubsystemRng) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let settlers = std::mem::take(&mut state.settlers);
    let mut survivors = Vec::with_capacity(settlers.len());

    for mut settler in settlers {
        let position = settler.position_at(now);

        if settler.is_alive() && !settler.is_immortal() && now - settler.birth_ms >= settler.lifespan_ms {
            settler.anchor = position;
            settler.target = position;
            settler.move_start_ms = now;
            settler.phase = SettlerPhase::Fading { started_ms: now };
            events.push(SimEvent::SettlerFading { settler_id: settler.id });
        }

        match settler.phase {
            SettlerPhase::Alive => {
                if now - settler.last_direction_change_ms >= MOVE_INTERVAL_MS {
                    settler.anchor = position;
                    settler.target = random_target_near(position, rng);
                    settler.move_start_ms = now;
                    settler.last_direction_change_ms = now;
                }
                survivors.push(settler);
            }
            SettlerPhase::Fading { started_ms } => {
                if now - started_ms >= FADING_DURATION_MS {
                    events.push(SimEvent::SettlerRemoved { settler_id: settler.id });
                } else {
                    survivors.push(settler);
                }
            }
        }
    }

    state.settlers = survivors;
    events
}

fn spawn_from_houses(state: &mut GameState, now: Millis, rng: &mut SubsystemRng) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let capacity = state.population_capacity();
    let interval = state.economy.house_spawn_interval_ms;
    let amount = state.economy.house_spawn_amount;
    let mut alive = state.alive_count();

    for index in 0..state.houses.len() {
        if capacity.is_some_and(|limit| alive >= limit) {
            break;
        }

        let house = &state.houses[index];
        if now - house.last_spawn_ms < interval {
            continue;
        }

        let remaining = capacity.map_or(u64::MAX, |limit| limit.saturating_sub(alive));
        let count = amount.min(remaining);
        if count == 0 {
            continue;
        }

        let (house_id, at) = (house.id, house.position);
        for _ in 0..count {
            let settler_id = spawn_settler_at(state, at, now, rng);
            events.push(SimEvent::SettlerSpawned { settler_id, house_id: Some(house_id) });
            alive += 1;
        }
        state.houses[index].last_spawn_ms = now;
    }

    if !events.is_empty() {
        log::debug!("Houses spawned {} settler(s), {} alive", events.len(), alive);
    }
    events
}

/// Create one settler at `at`, with a life span drawn from the current
/// bounds. Capacity is the caller's concern.
pub fn spawn_settler_at(
    state: &mut GameState,
    at: Point,
    now: Millis,
    rng: &mut SubsystemRng,
) -> SettlerId {
    let id = state.ids.next_settler();
    let lifespan = rng.range(
        state.economy.settler_min_lifespan_ms,
        state.economy.settler_max_lifespan_ms,
    );
    state.settlers.push(Settler::new(id, at, now, lifespan));
    id
}
