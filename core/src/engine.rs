//! The simulation engine.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Settler subsystem     (aging, fading, wandering, house spawns)
//!   2. Farm subsystem        (crop growth)
//!   3. Harvester subsystem   (grain arrivals, pile, harvest, crop arrivals)
//!   4. Market subsystem      (coin arrivals, market grain arrivals, sales)
//!   5. Info entries          (engine internal)
//!
//! RULES:
//!   - Subsystems execute in registration order, every frame.
//!   - A paused frame runs no subsystem; time is frozen.
//!   - All randomness flows through the RngBank.
//!   - Player actions are applied immediately; their events are logged at
//!     the start of the next frame.
//!   - The in-memory state is only replaced by a fully loaded save.

use crate::{
    building::{self, BuildingKind, BuiltEntity},
    clock::{ManualTime, SimClock},
    command::{CommandOutcome, PlayerCommand},
    config::{SimConfig, DEFAULT_PLANET_NAME},
    error::{ActionError, PersistenceError, SimResult},
    event::{EventLogEntry, SimEvent},
    farm_subsystem::FarmSubsystem,
    geometry::point_within_planet,
    harvester_subsystem::HarvesterSubsystem,
    info_entry,
    market_subsystem::MarketSubsystem,
    persistence::{self, rebase::shift_timestamps, Lz4Codec, PayloadCodec, PlainCodec},
    research::{self, ResearchOutcome},
    rng::{RngBank, SubsystemRng, SubsystemSlot},
    settler_subsystem::{spawn_settler_at, SettlerSubsystem},
    snapshot::SimulationSnapshot,
    state::GameState,
    store::SaveStore,
    subsystem::SimSubsystem,
    types::{Millis, Point, RunId, SettlerId, Tick},
};

pub struct SimEngine {
    pub run_id:       RunId,
    pub clock:        SimClock,
    pub rng_bank:     RngBank,
    pub store:        SaveStore,
    seed:             u64,
    subsystems:       Vec<(SubsystemSlot, Box<dyn SimSubsystem>)>,
    config:           SimConfig,
    codec:            Box<dyn PayloadCodec>,
    state:            GameState,
    /// Player actions draw from one continuous stream so that several
    /// actions within a frame still get distinct draws.
    player_rng:       SubsystemRng,
    /// Present when time is driven by hand (tests, headless runs).
    manual_time:      Option<ManualTime>,
    pending:          Vec<(&'static str, SimEvent)>,
    last_autosave_ms: Option<Millis>,
}

impl SimEngine {
    pub fn new(run_id: RunId, seed: u64, store: SaveStore, clock: SimClock, config: SimConfig) -> Self {
        let rng_bank = RngBank::new(seed);
        let codec: Box<dyn PayloadCodec> = if config.compress_saves {
            Box::new(Lz4Codec)
        } else {
            Box::new(PlainCodec)
        };
        Self {
            clock,
            player_rng: rng_bank.for_slot(SubsystemSlot::Player, 0),
            rng_bank,
            store,
            seed,
            subsystems: Vec::new(),
            codec,
            state: fresh_state(&config),
            config,
            manual_time: None,
            pending: Vec::new(),
            last_autosave_ms: None,
            run_id,
        }
    }

    /// Build a fully wired engine with all subsystems registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(
        run_id: RunId,
        seed: u64,
        store: SaveStore,
        clock: SimClock,
        config: SimConfig,
    ) -> SimResult<Self> {
        store.migrate()?;
        store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"))?;

        let mut engine = SimEngine::new(run_id, seed, store, clock, config);

        // EXECUTION ORDER: fixed, never reordered.
        engine.register(SubsystemSlot::Settler, Box::new(SettlerSubsystem::new()));
        engine.register(SubsystemSlot::Farm, Box::new(FarmSubsystem::new()));
        engine.register(SubsystemSlot::Harvester, Box::new(HarvesterSubsystem::new()));
        engine.register(SubsystemSlot::Market, Box::new(MarketSubsystem::new()));
        Ok(engine)
    }

    /// Build a fully wired engine driven by hand from `now`.
    pub fn build_manual(
        run_id: RunId,
        seed: u64,
        store: SaveStore,
        config: SimConfig,
        now: Millis,
    ) -> SimResult<Self> {
        let time = ManualTime::starting_at(now);
        let mut engine = Self::build(run_id, seed, store, SimClock::manual(time.clone()), config)?;
        engine.manual_time = Some(time);
        Ok(engine)
    }

    /// In-memory store, test config, manual time starting at 0.
    pub fn build_test(run_id: RunId, seed: u64) -> SimResult<Self> {
        Self::build_manual(run_id, seed, SaveStore::in_memory()?, SimConfig::default_test(), 0.0)
    }

    /// Register a subsystem. Call in the documented execution order.
    pub fn register(&mut self, slot: SubsystemSlot, subsystem: Box<dyn SimSubsystem>) {
        self.subsystems.push((slot, subsystem));
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn now(&self) -> Millis {
        self.clock.now()
    }

    /// Move manual time forward. No-op on a wall clock.
    pub fn advance_time(&mut self, delta: Millis) -> Millis {
        if let Some(time) = &self.manual_time {
            time.advance(delta);
        }
        self.clock.now()
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            tick:   self.clock.current_tick,
            paused: self.clock.is_paused(),
            ..SimulationSnapshot::capture(&self.state, self.clock.now())
        }
    }

    // ── Frames ─────────────────────────────────────────────────

    /// Advance one frame at the clock's current time.
    pub fn tick(&mut self) -> SimResult<Vec<SimEvent>> {
        let now = self.clock.now();
        self.tick_at(now)
    }

    /// Advance one frame at an explicit time.
    pub fn tick_at(&mut self, now: Millis) -> SimResult<Vec<SimEvent>> {
        // Emit RunInitialized at tick 0 so seed differences are observable.
        if self.clock.current_tick == 0 {
            let init_event = SimEvent::RunInitialized { run_id: self.run_id.clone(), seed: self.seed };
            append_events(&self.store, &self.run_id, 0, "engine", std::slice::from_ref(&init_event))?;
        }

        let current_tick = self.clock.advance();
        let mut tick_events = vec![SimEvent::TickStarted { tick: current_tick, now_ms: now }];

        for (source, event) in std::mem::take(&mut self.pending) {
            append_events(&self.store, &self.run_id, current_tick, source, std::slice::from_ref(&event))?;
            tick_events.push(event);
        }

        if !self.clock.is_paused() {
            for (slot, subsystem) in &mut self.subsystems {
                let mut rng = self.rng_bank.for_slot(*slot, current_tick);
                let new_events = subsystem.update(&mut self.state, now, &mut rng)?;
                append_events(&self.store, &self.run_id, current_tick, subsystem.name(), &new_events)?;
                tick_events.extend(new_events);
            }

            if let Some(id) = info_entry::unlock_active(&mut self.state) {
                let event = SimEvent::InfoEntryUnlocked { entry_id: id.as_str().to_string() };
                append_events(&self.store, &self.run_id, current_tick, "engine", std::slice::from_ref(&event))?;
                tick_events.push(event);
            }

            self.maybe_autosave(now);
        }

        tick_events.push(SimEvent::TickCompleted { tick: current_tick });
        Ok(tick_events)
    }

    /// Run n frames, advancing manual time by `step_ms` before each.
    pub fn run_ticks(&mut self, n: u64, step_ms: Millis) -> SimResult<()> {
        for _ in 0..n {
            self.advance_time(step_ms);
            self.tick()?;
        }
        Ok(())
    }

    // ── Player actions ─────────────────────────────────────────

    /// A click on the planet. Refused whole when the population is full.
    pub fn spawn_settler(&mut self, x: f64, y: f64) -> Result<SettlerId, ActionError> {
        self.ensure_running()?;
        let at = Point::new(x, y);
        if !point_within_planet(at) {
            return Err(ActionError::OutOfBounds { x, y });
        }
        let alive = self.state.alive_count();
        if let Some(limit) = self.state.population_capacity() {
            if alive >= limit {
                return Err(ActionError::CapacityExceeded { what: "settler", current: alive, limit });
            }
        }

        let now = self.clock.now();
        let settler_id = spawn_settler_at(&mut self.state, at, now, &mut self.player_rng);
        self.pending.push(("player", SimEvent::SettlerSpawned { settler_id, house_id: None }));
        Ok(settler_id)
    }

    /// Place a building. The state is saved right after a successful build.
    pub fn build_at(&mut self, kind: BuildingKind, x: f64, y: f64) -> Result<BuiltEntity, ActionError> {
        self.ensure_running()?;
        let built = building::build(&mut self.state, kind, Point::new(x, y), self.clock.now())?;
        self.pending.push((
            "player",
            SimEvent::BuildingBuilt { building: kind, entity_id: built.entity_id(), x, y },
        ));
        self.persist_quietly();
        Ok(built)
    }

    /// One click on a research node. Ignored while paused.
    pub fn click_research(&mut self, node_id: &str) -> ResearchOutcome {
        if self.clock.is_paused() {
            return ResearchOutcome::Ignored;
        }
        let outcome = research::click_node(&mut self.state, node_id);
        let node_id = node_id.to_string();
        match outcome {
            ResearchOutcome::Ignored => {}
            ResearchOutcome::Progressed { clicks } => {
                self.pending.push(("player", SimEvent::ResearchProgressed { node_id, clicks }));
            }
            ResearchOutcome::Completed { coins_spent } => {
                self.pending.push(("player", SimEvent::ResearchCompleted { node_id, coins_spent }));
                self.persist_quietly();
            }
        }
        outcome
    }

    pub fn pause(&mut self) {
        if self.clock.is_paused() {
            return;
        }
        self.clock.pause();
        let at_ms = self.clock.now();
        self.pending.push(("engine", SimEvent::SimulationPaused { at_ms }));
        log::info!("Simulation paused at {at_ms:.0}ms");
    }

    /// Unfreeze time. Every stored timestamp moves forward by the frozen
    /// duration, so no timer observes the pause.
    pub fn resume(&mut self) {
        if !self.clock.is_paused() {
            return;
        }
        let paused_for_ms = self.clock.resume();
        if paused_for_ms > 0.0 {
            shift_timestamps(&mut self.state, paused_for_ms);
        }
        self.pending.push(("engine", SimEvent::SimulationResumed { paused_for_ms }));
        log::info!("Simulation resumed after {paused_for_ms:.0}ms");
    }

    pub fn rename_planet(&mut self, name: &str) {
        let name = name.trim();
        self.state.planet_name =
            if name.is_empty() { DEFAULT_PLANET_NAME.to_string() } else { name.to_string() };
        self.pending.push(("player", SimEvent::PlanetRenamed { name: self.state.planet_name.clone() }));
        self.persist_quietly();
    }

    /// Throw the colony away and start from the configured initial state.
    /// Clears any pause; the discarded state is not shifted.
    pub fn restart(&mut self) {
        self.clock.resume();
        self.state = fresh_state(&self.config);
        self.pending.push(("player", SimEvent::StateReset));
        log::info!("Colony restarted");
        self.persist_quietly();
    }

    pub fn apply(&mut self, command: PlayerCommand) -> SimResult<CommandOutcome> {
        let outcome = match command {
            PlayerCommand::Pause => {
                self.pause();
                CommandOutcome::Done
            }
            PlayerCommand::Resume => {
                self.resume();
                CommandOutcome::Done
            }
            PlayerCommand::SpawnSettler { x, y } => {
                CommandOutcome::Spawned { settler_id: self.spawn_settler(x, y)? }
            }
            PlayerCommand::Build { building, x, y } => {
                CommandOutcome::Built { entity: self.build_at(building, x, y)? }
            }
            PlayerCommand::ResearchNode { node_id } => {
                CommandOutcome::Research { outcome: self.click_research(&node_id) }
            }
            PlayerCommand::RenamePlanet { name } => {
                self.rename_planet(&name);
                CommandOutcome::Done
            }
            PlayerCommand::Restart => {
                self.restart();
                CommandOutcome::Done
            }
        };
        Ok(outcome)
    }

    fn ensure_running(&self) -> Result<(), ActionError> {
        if self.clock.is_paused() {
            Err(ActionError::Paused)
        } else {
            Ok(())
        }
    }

    // ── Saves ──────────────────────────────────────────────────

    /// Encoded save of the current state, referenced to `now()`.
    pub fn export_bytes(&self) -> SimResult<Vec<u8>> {
        Ok(persistence::serialize(&self.state, self.clock.now(), self.codec.as_ref())?)
    }

    pub fn codec_name(&self) -> &'static str {
        self.codec.name()
    }

    /// Write the current state to the configured slot.
    pub fn save_to_store(&mut self) -> SimResult<String> {
        let bytes = self.export_bytes()?;
        let save_id = self.store.write_slot(&self.config.save_slot, &bytes, self.codec.name())?;
        self.last_autosave_ms = Some(self.clock.now());
        log::debug!("Saved {} bytes to slot '{}'", bytes.len(), self.config.save_slot);
        Ok(save_id)
    }

    /// Startup restore. A missing or unreadable save leaves a fresh state;
    /// either way the resulting state is written back. Returns whether a
    /// save was loaded.
    pub fn restore_from_store(&mut self) -> SimResult<bool> {
        let slot = self.config.save_slot.clone();
        let restored = match self.store.read_slot(&slot)? {
            None => {
                log::info!("No save in slot '{slot}', starting fresh");
                false
            }
            Some(saved) => match self.load_bytes(&saved.payload, &saved.codec) {
                Ok(shifted_by_ms) => {
                    self.pending.push(("engine", SimEvent::StateRestored { slot: slot.clone(), shifted_by_ms }));
                    true
                }
                Err(e) => {
                    log::warn!("Discarding unreadable save in slot '{slot}': {e}");
                    self.state = fresh_state(&self.config);
                    false
                }
            },
        };
        self.save_to_store()?;
        Ok(restored)
    }

    /// Replace the state with a decoded save. On error the current state
    /// is untouched. Returns the applied timestamp shift.
    pub fn load_bytes(&mut self, bytes: &[u8], codec_name: &str) -> SimResult<Millis> {
        let codec = persistence::codec_by_name(codec_name).map_err(PersistenceError::from)?;
        let loaded = persistence::load(bytes, self.clock.live_now(), codec.as_ref())?;
        log::info!(
            "Loaded save v{} → v{} ({} step(s)), shifted by {:.0}ms",
            loaded.migration.original_version,
            loaded.migration.final_version,
            loaded.migration.step_descriptions.len(),
            loaded.shifted_by
        );
        // The loaded colony starts running; the replaced state is not shifted.
        self.clock.resume();
        self.state = loaded.state;
        self.last_autosave_ms = Some(self.clock.now());
        Ok(loaded.shifted_by)
    }

    /// Save when the autosave interval has elapsed. Storage failures are
    /// logged, never fatal. Returns whether a save was written.
    pub fn maybe_autosave(&mut self, now: Millis) -> bool {
        let due = match self.last_autosave_ms {
            None => true,
            Some(last) => now - last >= self.config.autosave_interval_ms,
        };
        if !due {
            return false;
        }
        match self.save_to_store() {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Autosave failed: {e}");
                // Retry on the next interval rather than every frame.
                self.last_autosave_ms = Some(now);
                false
            }
        }
    }

    fn persist_quietly(&mut self) {
        if let Err(e) = self.save_to_store() {
            log::warn!("Saving after player action failed: {e}");
        }
    }

    // ── Event log ──────────────────────────────────────────────

    /// Query events for a specific tick from the store.
    /// Used by the determinism test and replay tooling.
    pub fn store_events_for_tick(&self, run_id: &str, tick: Tick) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_tick(run_id, tick)
    }
}

fn fresh_state(config: &SimConfig) -> GameState {
    let mut state = GameState::new(config.economy.clone());
    state.planet_name = config.planet_name.clone();
    state
}

fn append_events(
    store: &SaveStore,
    run_id: &str,
    tick: Tick,
    source: &str,
    events: &[SimEvent],
) -> SimResult<()> {
    for event in events {
        let entry = EventLogEntry {
            id:         None,
            run_id:     run_id.to_string(),
            tick,
            source:     source.to_string(),
            event_type: event_type_name(event).to_string(),
            payload:    serde_json::to_string(event)?,
        };
        store.append_event(&entry)?;
    }
    Ok(())
}

/// Extract a stable string name from a SimEvent variant.
/// Used for the event_type column in event_log.
pub fn event_type_name(event: &SimEvent) -> &'static str {
    match event {
        SimEvent::TickStarted { .. }        => "tick_started",
        SimEvent::TickCompleted { .. }      => "tick_completed",
        SimEvent::RunInitialized { .. }     => "run_initialized",
        SimEvent::SimulationPaused { .. }   => "simulation_paused",
        SimEvent::SimulationResumed { .. }  => "simulation_resumed",
        SimEvent::StateRestored { .. }      => "state_restored",
        SimEvent::StateReset                => "state_reset",
        SimEvent::PlanetRenamed { .. }      => "planet_renamed",
        SimEvent::SettlerSpawned { .. }     => "settler_spawned",
        SimEvent::SettlerFading { .. }      => "settler_fading",
        SimEvent::SettlerRemoved { .. }     => "settler_removed",
        SimEvent::CropGrown { .. }          => "crop_grown",
        SimEvent::GrainPileCreated { .. }   => "grain_pile_created",
        SimEvent::CropHarvested { .. }      => "crop_harvested",
        SimEvent::GrainThrown { .. }        => "grain_thrown",
        SimEvent::GrainDeposited { .. }     => "grain_deposited",
        SimEvent::GrainSold { .. }          => "grain_sold",
        SimEvent::CoinMinted { .. }         => "coin_minted",
        SimEvent::CoinDeposited { .. }      => "coin_deposited",
        SimEvent::BuildingBuilt { .. }      => "building_built",
        SimEvent::ResearchProgressed { .. } => "research_progressed",
        SimEvent::ResearchCompleted { .. }  => "research_completed",
        SimEvent::InfoEntryUnlocked { .. }  => "info_entry_unlocked",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PLANET_CENTER;

    fn engine() -> SimEngine {
        SimEngine::build_test("engine-unit".into(), 7).unwrap()
    }

    #[test]
    fn paused_frame_runs_no_stage() {
        let mut engine = engine();
        engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y).unwrap();
        engine.pause();
        engine.advance_time(60_000.0);

        let events = engine.tick().unwrap();
        assert!(events.iter().all(|e| !matches!(e, SimEvent::SettlerFading { .. })));
        assert_eq!(engine.state().alive_count(), 1);
        assert_eq!(
            engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y),
            Err(ActionError::Paused)
        );
    }

    #[test]
    fn resume_shifts_timers_by_paused_duration() {
        let mut engine = engine();
        engine.advance_time(1_000.0);
        engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y).unwrap();
        let birth = engine.state().settlers[0].birth_ms;

        engine.pause();
        engine.advance_time(30_000.0);
        engine.resume();

        assert_eq!(engine.state().settlers[0].birth_ms, birth + 30_000.0);
    }

    #[test]
    fn restart_clears_pause() {
        let mut engine = engine();
        engine.pause();
        engine.advance_time(10_000.0);
        engine.restart();

        assert!(!engine.clock.is_paused());
        assert_eq!(engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y), Ok(0));
    }

    #[test]
    fn import_clears_pause_and_failed_import_keeps_it() {
        let mut engine = engine();
        engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y).unwrap();
        let bytes = persistence::serialize(engine.state(), engine.now(), &PlainCodec).unwrap();

        engine.pause();
        assert!(engine.load_bytes(br#"{"version": 0}"#, "plain").is_err());
        assert!(engine.clock.is_paused());

        engine.advance_time(4_000.0);
        let shifted = engine.load_bytes(&bytes, "plain").unwrap();
        assert_eq!(shifted, 4_000.0);
        assert!(!engine.clock.is_paused());
        assert!(engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y).is_ok());
    }

    #[test]
    fn player_events_are_logged_next_frame() {
        let mut engine = engine();
        engine.spawn_settler(PLANET_CENTER.x, PLANET_CENTER.y).unwrap();
        let events = engine.tick().unwrap();
        assert!(matches!(events[1], SimEvent::SettlerSpawned { settler_id: 0, house_id: None }));

        let logged = engine.store_events_for_tick("engine-unit", 1).unwrap();
        assert_eq!(logged[0].event_type, "settler_spawned");
        assert_eq!(logged[0].source, "player");
    }

    #[test]
    fn rename_falls_back_on_blank() {
        let mut engine = engine();
        engine.rename_planet("  Kepler  ");
        assert_eq!(engine.state().planet_name, "Kepler");
        engine.rename_planet("   ");
        assert_eq!(engine.state().planet_name, DEFAULT_PLANET_NAME);
    }
}
