//! Settler life cycle and population capacity tests.

use colony_core::{
    building::BuildingKind,
    engine::SimEngine,
    error::ActionError,
    geometry::PLANET_CENTER,
    settler_subsystem::FADING_DURATION_MS,
    state::SettlerPhase,
};

const STEP_MS: f64 = 50.0;

fn engine(name: &str) -> SimEngine {
    SimEngine::build_test(name.into(), 11).unwrap()
}

#[test]
fn eleventh_click_is_refused_at_base_capacity() {
    let mut engine = engine("click-cap");
    engine.state_mut().economy.settlers_base_capacity = 10;
    engine.state_mut().economy.settlers_per_house = 10;

    for i in 0..10 {
        let spawned = engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y);
        assert!(spawned.is_ok(), "click {i} refused: {spawned:?}");
    }
    let eleventh = engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y);

    assert_eq!(
        eleventh,
        Err(ActionError::CapacityExceeded { what: "settler", current: 10, limit: 10 })
    );
    assert_eq!(engine.state().alive_count(), 10);
    assert_eq!(engine.state().ids.settler, 10, "refused click must not consume an id");
}

#[test]
fn click_outside_planet_is_refused() {
    let mut engine = engine("click-bounds");
    assert!(matches!(engine.spawn_settler(0.0, 0.0), Err(ActionError::OutOfBounds { .. })));
    assert!(engine.state().settlers.is_empty());
}

#[test]
fn fading_starts_on_time_and_removal_waits_for_fade() {
    let mut engine = engine("fade-timing");
    engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y).unwrap();
    let (birth, lifespan) = {
        let s = &engine.state().settlers[0];
        (s.birth_ms, s.lifespan_ms)
    };
    assert!(lifespan > 0.0);

    let mut fade_started: Option<f64> = None;
    let mut previous_now = engine.now();
    for _ in 0..1_000 {
        engine.advance_time(STEP_MS);
        engine.tick().unwrap();
        let now = engine.now();

        match engine.state().settlers.first() {
            Some(settler) => {
                if let SettlerPhase::Fading { started_ms } = settler.phase {
                    assert!(now >= birth + lifespan, "faded at {now}, before {birth} + {lifespan}");
                    assert!(previous_now < birth + lifespan || fade_started.is_some());
                    fade_started.get_or_insert(started_ms);
                }
            }
            None => {
                let started = fade_started.expect("removed without fading first");
                assert!(now - started >= FADING_DURATION_MS, "removed after {}ms", now - started);
                assert!(previous_now - started < FADING_DURATION_MS, "removal was late");
                return;
            }
        }
        previous_now = now;
    }
    panic!("settler never removed");
}

#[test]
fn immortal_settlers_never_fade() {
    let mut engine = engine("immortal");
    engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y).unwrap();
    engine.state_mut().settlers[0].lifespan_ms = 0.0;

    engine.run_ticks(600, 100.0).unwrap();

    let settler = &engine.state().settlers[0];
    assert!(settler.is_alive());
    assert_eq!(settler.lifespan_ms, 0.0, "immortal life span must be preserved exactly");
}

#[test]
fn house_spawns_never_exceed_capacity() {
    let mut engine = engine("house-cap");
    engine.state_mut().economy.house_spawn_amount = 4;
    engine.state_mut().economy.house_spawn_interval_ms = 500.0;
    engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y).unwrap();
    engine.build_at(BuildingKind::House, PLANET_CENTER.x, PLANET_CENTER.y).unwrap();

    for _ in 0..2_000 {
        engine.advance_time(100.0);
        engine.tick().unwrap();
        let state = engine.state();
        let capacity = state.population_capacity().unwrap();
        assert!(
            state.alive_count() <= capacity,
            "{} alive with capacity {capacity}",
            state.alive_count()
        );
    }
    assert!(engine.state().alive_count() > 10, "house never spawned");
}
