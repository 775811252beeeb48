//! The event stream: everything observable that a frame or a player
//! action changed.
//!
//! RULE: Events are facts about the state after the fact. Nothing in the
//! simulation reads events back to decide what to do next.

use crate::{
    building::BuildingKind,
    types::{CropId, FarmId, HouseId, Millis, ProjectileId, RunId, SettlerId, Tick},
};
use serde::{Deserialize, Serialize};

/// Variants are only ever appended; payloads land in the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    TickStarted {
        tick:   Tick,
        now_ms: Millis,
    },
    TickCompleted {
        tick: Tick,
    },
    RunInitialized {
        run_id: RunId,
        seed:   u64,
    },
    SimulationPaused {
        at_ms: Millis,
    },
    SimulationResumed {
        paused_for_ms: Millis,
    },
    StateRestored {
        slot:           String,
        shifted_by_ms:  Millis,
    },
    StateReset,
    PlanetRenamed {
        name: String,
    },

    // ── Settler events ─────────────────────────────
    SettlerSpawned {
        settler_id: SettlerId,
        /// None for click spawns.
        house_id:   Option<HouseId>,
    },
    SettlerFading {
        settler_id: SettlerId,
    },
    SettlerRemoved {
        settler_id: SettlerId,
    },

    // ── Production chain events ────────────────────
    CropGrown {
        farm_id: FarmId,
        crop_id: CropId,
    },
    GrainPileCreated {
        x: f64,
        y: f64,
    },
    CropHarvested {
        crop_id:       CropId,
        projectile_id: ProjectileId,
    },
    GrainThrown {
        projectile_id: ProjectileId,
    },
    GrainDeposited {
        grains: u64,
    },
    GrainSold {
        projectile_id: ProjectileId,
    },
    CoinMinted {
        projectile_id: ProjectileId,
    },
    CoinDeposited {
        coins: u64,
    },

    // ── Player progress events ─────────────────────
    BuildingBuilt {
        building:  BuildingKind,
        entity_id: Option<u64>,
        x:         f64,
        y:         f64,
    },
    ResearchProgressed {
        node_id: String,
        clicks:  u32,
    },
    ResearchCompleted {
        node_id:     String,
        coins_spent: u64,
    },
    InfoEntryUnlocked {
        entry_id: String,
    },
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub run_id:     RunId,
    pub tick:       Tick,
    pub source:     String,
    pub event_type: String,
    pub payload:    String, // JSON-serialized SimEvent
}
