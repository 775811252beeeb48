//! Save format, migration and rebasing tests.

use colony_core::{
    config::BASE_COIN_CAPACITY,
    engine::SimEngine,
    error::{PersistenceError, SimError},
    geometry::PLANET_CENTER,
    building::BuildingKind,
    persistence::{
        deserialize, rebase::{collect_timestamps, shift_timestamps}, serialize, Lz4Codec, PlainCodec,
        CURRENT_SAVE_VERSION,
    },
    state::{Crop, Farm, GameState, GrainPile, Harvester, House, Market, Settler, SettlerPhase},
    types::Point,
};

/// Projectiles come back grouped by kind.
fn normalized(mut state: GameState) -> GameState {
    state.projectiles.sort_by_key(|p| (p.kind as u8, p.id));
    state
}

/// A colony that has been running for a while: settlers in every phase,
/// farms, crops, a pile, projectiles in flight.
fn running_colony() -> SimEngine {
    let mut engine = SimEngine::build_test("persist-colony".into(), 77).unwrap();
    for _ in 0..10 {
        engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y).unwrap();
    }
    engine.build_at(BuildingKind::Farm, 400.0, 460.0).unwrap();
    engine.build_at(BuildingKind::House, 360.0, 360.0).unwrap();
    {
        let state = engine.state_mut();
        state.harvester = Some(Harvester::new(Point::new(380.0, 380.0), 0.0));
        state.market = Some(Market { position: Point::new(430.0, 380.0), built_ms: 0.0, last_sale_ms: 0.0 });
    }
    engine.run_ticks(137, 100.0).unwrap();
    engine
}

#[test]
fn round_trip_restores_graph_with_consistent_shift() {
    let engine = running_colony();
    let original = engine.state().clone();
    let now = engine.now();
    assert!(!original.projectiles.is_empty() || !original.crops.is_empty());

    let bytes = serialize(&original, now, &Lz4Codec).unwrap();
    let restored = deserialize(&bytes, now + 5_000.0, &Lz4Codec).unwrap();

    let mut expected = original;
    shift_timestamps(&mut expected, 5_000.0);
    assert_eq!(normalized(restored), normalized(expected));
}

#[test]
fn version_one_save_walks_the_chain() {
    let v1 = br#"{
        "version": 1,
        "planetName": "Old Rock",
        "settlers": [],
        "houses": [],
        "farms": [],
        "crops": [],
        "coins": 12
    }"#;

    let state = deserialize(v1, 0.0, &PlainCodec).unwrap();
    assert_eq!(state.version, CURRENT_SAVE_VERSION);
    assert!(state.info_entry_ids.is_empty());
    assert!(state.researcher.is_none());
    assert_eq!(state.economy.coin_capacity, BASE_COIN_CAPACITY);
    assert!(state.completed_research_node_ids.is_empty());
    assert_eq!(state.planet_name, "Old Rock");
    assert_eq!(state.coins, 12);
}

#[test]
fn sixty_second_gap_shifts_every_timestamp() {
    const T0: f64 = 1_700_000_000_000.0;
    let mut state = GameState::default();
    state.settlers.push(Settler::new(0, PLANET_CENTER, T0 - 4_000.0, 9_000.0));
    let mut fading = Settler::new(1, PLANET_CENTER, T0 - 9_000.0, 8_000.0);
    fading.phase = SettlerPhase::Fading { started_ms: T0 - 500.0 };
    state.settlers.push(fading);
    state.houses.push(House::new(0, Point::new(380.0, 400.0), T0 - 30_000.0));
    state.farms.push(Farm {
        id: 0,
        position: Point::new(420.0, 400.0),
        built_ms: T0 - 20_000.0,
        last_produced_ms: T0 - 1_000.0,
    });
    state.crops.push(Crop { id: 0, farm_id: 0, position: Point::new(430.0, 420.0), created_ms: T0 - 1_000.0 });
    state.grain_pile = Some(GrainPile { position: Point::new(350.0, 420.0), grains: 3, created_ms: T0 - 15_000.0 });
    state.ids.settler = 2;
    state.ids.house = 1;
    state.ids.farm = 1;
    state.ids.crop = 1;

    let bytes = serialize(&state, T0, &PlainCodec).unwrap();
    let restored = deserialize(&bytes, T0 + 60_000.0, &PlainCodec).unwrap();

    let before = collect_timestamps(&state);
    let after = collect_timestamps(&restored);
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        if b.is_finite() {
            assert_eq!(a - b, 60_000.0);
        } else {
            assert_eq!(a, b, "never-spawned house timer must stay -inf");
        }
    }
}

#[test]
fn oversized_capacities_load_and_run() {
    let mut engine = SimEngine::build_test("persist-oversized".into(), 5).unwrap();
    engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y).unwrap();
    engine.build_at(BuildingKind::House, 360.0, 360.0).unwrap();
    let bytes = serialize(engine.state(), engine.now(), &PlainCodec).unwrap();

    let mut payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    payload["settlers_per_house"] = serde_json::json!(1e30);
    payload["grain_pile_capacity"] = serde_json::json!(1e30);
    payload["coin_capacity"] = serde_json::json!(1e30);
    let bytes = serde_json::to_vec(&payload).unwrap();

    let state = deserialize(&bytes, engine.now(), &PlainCodec).unwrap();
    assert_eq!(state.population_capacity(), Some(u64::MAX));

    engine.load_bytes(&bytes, "plain").unwrap();
    engine.run_ticks(50, 100.0).unwrap();
    assert!(engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y).is_ok());
}

#[test]
fn bad_payloads_are_typed_failures() {
    let unsupported = deserialize(br#"{"version": 42}"#, 0.0, &PlainCodec).unwrap_err();
    assert_eq!(unsupported, PersistenceError::UnsupportedSaveVersion { found: Some(42) });

    let missing = deserialize(br#"{"settlers": []}"#, 0.0, &PlainCodec).unwrap_err();
    assert_eq!(missing, PersistenceError::UnsupportedSaveVersion { found: None });

    let garbage = deserialize(b"{\"version\": 5, \"settlers\": [{\"id\": \"x\"}]}", 0.0, &PlainCodec).unwrap_err();
    assert!(matches!(garbage, PersistenceError::MalformedSave(_)), "{garbage:?}");

    let truncated = deserialize(&[0x40, 0, 0, 0, 1, 2], 0.0, &Lz4Codec).unwrap_err();
    assert!(matches!(truncated, PersistenceError::CompressionFailure(_)), "{truncated:?}");
}

#[test]
fn failed_import_keeps_running_state() {
    let mut engine = running_colony();
    let before = engine.state().clone();

    let err = engine.load_bytes(br#"{"version": 0}"#, "plain").unwrap_err();
    assert!(matches!(err, SimError::Persistence(PersistenceError::UnsupportedSaveVersion { .. })));
    assert_eq!(engine.state(), &before);
}

#[test]
fn restore_from_store_round_trips_and_falls_back() {
    let mut source = running_colony();
    source.save_to_store().unwrap();
    let saved = source.store.read_slot("test").unwrap().unwrap();

    let mut target = SimEngine::build_test("persist-target".into(), 1).unwrap();
    target.store.write_slot("test", &saved.payload, &saved.codec).unwrap();
    assert!(target.restore_from_store().unwrap());
    assert_eq!(target.state().settlers.len(), source.state().settlers.len());
    assert_eq!(target.state().ids, source.state().ids);

    let mut broken = SimEngine::build_test("persist-broken".into(), 1).unwrap();
    broken.store.write_slot("test", b"{ not json", "plain").unwrap();
    assert!(!broken.restore_from_store().unwrap());
    assert!(broken.state().settlers.is_empty());

    // The fallback state replaced the unreadable save.
    let rewritten = broken.store.read_slot("test").unwrap().unwrap();
    assert!(deserialize(&rewritten.payload, 0.0, &PlainCodec).is_ok());
}
