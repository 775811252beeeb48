//! Farm → harvester → grain pile → market → coins.

use colony_core::{
    building::{BuildingKind, BuiltEntity},
    engine::SimEngine,
    error::ActionError,
    event::SimEvent,
    geometry::PLANET_CENTER,
    projectile::ProjectileKind,
    state::{Crop, Farm, Harvester, Market},
    types::Point,
};

fn engine(name: &str) -> SimEngine {
    SimEngine::build_test(name.into(), 21).unwrap()
}

fn add_farm(engine: &mut SimEngine, id: u64, at: Point) {
    let state = engine.state_mut();
    state.farms.push(Farm { id, position: at, built_ms: 0.0, last_produced_ms: -10_000.0 });
    state.ids.farm = state.ids.farm.max(id + 1);
}

#[test]
fn full_farm_grows_no_sixth_crop() {
    let mut engine = engine("farm-cap");
    engine.state_mut().economy.farm_crop_capacity = 5;
    let farm_at = Point::new(400.0, 420.0);
    add_farm(&mut engine, 0, farm_at);
    for id in 0..5 {
        engine.state_mut().crops.push(Crop {
            id,
            farm_id: 0,
            position: farm_at.offset(id as f64 * 25.0, 0.0),
            created_ms: 0.0,
        });
    }
    engine.state_mut().ids.crop = 5;

    for _ in 0..200 {
        engine.advance_time(100.0);
        let events = engine.tick().unwrap();
        assert!(
            !events.iter().any(|e| matches!(e, SimEvent::CropGrown { .. })),
            "a full farm grew a crop"
        );
    }
    assert_eq!(engine.state().crops.len(), 5);
}

#[test]
fn pile_and_purse_capacity_hold_every_frame() {
    let mut engine = engine("chain-invariants");
    {
        let state = engine.state_mut();
        state.economy.grain_pile_capacity = 10;
        state.economy.coin_capacity = 5;
        state.harvester = Some(Harvester::new(Point::new(380.0, 380.0), 0.0));
        state.market = Some(Market { position: Point::new(430.0, 380.0), built_ms: 0.0, last_sale_ms: 0.0 });
    }
    add_farm(&mut engine, 0, Point::new(400.0, 460.0));
    add_farm(&mut engine, 1, Point::new(320.0, 420.0));

    for frame in 0..2_000 {
        engine.advance_time(100.0);
        engine.tick().unwrap();
        let state = engine.state();
        assert!(
            state.grains() + state.grains_in_flight() <= state.economy.grain_pile_capacity,
            "frame {frame}: {} grains + {} in flight over capacity",
            state.grains(),
            state.grains_in_flight()
        );
        assert!(
            state.coins + state.coins_in_flight() <= state.economy.coin_capacity,
            "frame {frame}: {} coins + {} in flight over capacity",
            state.coins,
            state.coins_in_flight()
        );
    }

    let state = engine.state();
    assert!(state.grain_pile.is_some(), "harvester never created the pile");
    assert_eq!(state.coins, 5, "market should fill the purse");
    assert_eq!(state.in_flight(ProjectileKind::MarketGrain), 0);
}

#[test]
fn building_a_farm_extends_lifespans_and_crops_immediately() {
    let mut engine = engine("farm-build");
    for _ in 0..10 {
        engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y).unwrap();
    }
    let before: Vec<f64> = engine.state().settlers.iter().map(|s| s.lifespan_ms).collect();
    let (min_before, max_before) = {
        let e = &engine.state().economy;
        (e.settler_min_lifespan_ms, e.settler_max_lifespan_ms)
    };

    let built = engine.build_at(BuildingKind::Farm, 400.0, 430.0).unwrap();
    assert_eq!(built, BuiltEntity::Farm { id: 0 });

    let bonus = engine.state().economy.farm_lifespan_bonus_per_farm_ms;
    assert_eq!(engine.state().economy.settler_min_lifespan_ms, min_before + bonus);
    assert_eq!(engine.state().economy.settler_max_lifespan_ms, max_before + bonus);
    for (settler, old) in engine.state().settlers.iter().zip(before) {
        assert_eq!(settler.lifespan_ms, old + bonus);
    }

    let events = engine.tick().unwrap();
    assert!(events.iter().any(|e| matches!(e, SimEvent::CropGrown { farm_id: 0, .. })));
}

#[test]
fn build_refusals_leave_state_untouched() {
    let mut engine = engine("build-refusals");

    assert!(matches!(
        engine.build_at(BuildingKind::House, PLANET_CENTER.x, PLANET_CENTER.y),
        Err(ActionError::BuildPreconditionUnmet { building: BuildingKind::House, .. })
    ));
    engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y).unwrap();
    assert!(matches!(
        engine.build_at(BuildingKind::House, 5.0, 5.0),
        Err(ActionError::OutOfBounds { .. })
    ));
    assert!(matches!(
        engine.build_at(BuildingKind::Harvester, PLANET_CENTER.x, PLANET_CENTER.y),
        Err(ActionError::BuildPreconditionUnmet { building: BuildingKind::Harvester, .. })
    ));
    assert!(matches!(
        engine.build_at(BuildingKind::Market, PLANET_CENTER.x, PLANET_CENTER.y),
        Err(ActionError::BuildPreconditionUnmet { building: BuildingKind::Market, .. })
    ));

    assert!(engine.state().houses.is_empty());
    assert!(engine.state().harvester.is_none());
    assert!(engine.state().market.is_none());
}

#[test]
fn harvester_is_a_singleton() {
    let mut engine = engine("harvester-once");
    add_farm(&mut engine, 0, Point::new(400.0, 460.0));
    for id in 0..5 {
        engine.state_mut().crops.push(Crop {
            id,
            farm_id: 0,
            position: Point::new(380.0 + id as f64 * 10.0, 470.0),
            created_ms: 0.0,
        });
    }

    assert_eq!(engine.build_at(BuildingKind::Harvester, 380.0, 380.0), Ok(BuiltEntity::Harvester));
    assert!(matches!(
        engine.build_at(BuildingKind::Harvester, 420.0, 380.0),
        Err(ActionError::BuildPreconditionUnmet { .. })
    ));
}
