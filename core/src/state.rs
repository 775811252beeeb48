//! The aggregate root. `GameState` owns every entity collection; nothing
//! else holds entities. Operations take `&mut GameState` explicitly.

use crate::{
    config::{EconomyConfig, DEFAULT_PLANET_NAME},
    geometry::ease_out_quad,
    persistence::CURRENT_SAVE_VERSION,
    projectile::{Projectile, ProjectileKind},
    settler_subsystem::MOVE_INTERVAL_MS,
    types::{CropId, FarmId, HouseId, Millis, Point, ProjectileId, SettlerId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Settlers ───────────────────────────────────────────────────────

/// Life-cycle phase. The fade timer only exists once fading has begun.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SettlerPhase {
    Alive,
    Fading { started_ms: Millis },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settler {
    pub id:                       SettlerId,
    pub anchor:                   Point,
    pub target:                   Point,
    pub move_start_ms:            Millis,
    pub last_direction_change_ms: Millis,
    pub birth_ms:                 Millis,
    pub lifespan_ms:              Millis,
    pub phase:                    SettlerPhase,
}

impl Settler {
    /// A newborn standing still at `at`. The direction timer is pre-expired
    /// so the settler picks a wander target on its first frame.
    pub fn new(id: SettlerId, at: Point, now: Millis, lifespan_ms: Millis) -> Self {
        Self {
            id,
            anchor: at,
            target: at,
            move_start_ms: now,
            last_direction_change_ms: now - MOVE_INTERVAL_MS,
            birth_ms: now,
            lifespan_ms,
            phase: SettlerPhase::Alive,
        }
    }

    /// Eased position between anchor and target.
    pub fn position_at(&self, now: Millis) -> Point {
        let elapsed = (now - self.move_start_ms).max(0.0);
        let progress = (elapsed / MOVE_INTERVAL_MS).clamp(0.0, 1.0);
        self.anchor.lerp(self.target, ease_out_quad(progress))
    }

    pub fn is_alive(&self) -> bool {
        matches!(self.phase, SettlerPhase::Alive)
    }

    /// Non-positive (or NaN) life spans never expire.
    pub fn is_immortal(&self) -> bool {
        !(self.lifespan_ms > 0.0)
    }
}

// ── Buildings and resources ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct House {
    pub id:            HouseId,
    pub position:      Point,
    pub built_ms:      Millis,
    /// −∞ until the first spawn, so a new house spawns immediately.
    pub last_spawn_ms: Millis,
}

impl House {
    pub fn new(id: HouseId, position: Point, built_ms: Millis) -> Self {
        Self { id, position, built_ms, last_spawn_ms: f64::NEG_INFINITY }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Farm {
    pub id:               FarmId,
    pub position:         Point,
    pub built_ms:         Millis,
    pub last_produced_ms: Millis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Crop {
    pub id:         CropId,
    pub farm_id:    FarmId,
    pub position:   Point,
    pub created_ms: Millis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrainPile {
    pub position:   Point,
    pub grains:     u64,
    pub created_ms: Millis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Harvester {
    pub position:            Point,
    pub built_ms:            Millis,
    pub last_harvest_ms:     Millis,
    pub last_spin_update_ms: Millis,
    pub spin_level:          f64,
    pub rotation_angle:      f64,
}

impl Harvester {
    pub fn new(position: Point, built_ms: Millis) -> Self {
        Self {
            position,
            built_ms,
            last_harvest_ms: built_ms,
            last_spin_update_ms: built_ms,
            spin_level: 0.0,
            rotation_angle: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Market {
    pub position:     Point,
    pub built_ms:     Millis,
    pub last_sale_ms: Millis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Researcher {
    pub position: Point,
    pub built_ms: Millis,
}

/// Next free id per entity family. Grain and market-grain projectiles share
/// the grain counter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdCounters {
    pub settler:          SettlerId,
    pub house:            HouseId,
    pub farm:             FarmId,
    pub crop:             CropId,
    pub crop_projectile:  ProjectileId,
    pub grain_projectile: ProjectileId,
    pub coin_projectile:  ProjectileId,
}

impl IdCounters {
    fn take(counter: &mut u64) -> u64 {
        let id = *counter;
        *counter += 1;
        id
    }

    pub fn next_settler(&mut self) -> SettlerId { Self::take(&mut self.settler) }
    pub fn next_house(&mut self) -> HouseId { Self::take(&mut self.house) }
    pub fn next_farm(&mut self) -> FarmId { Self::take(&mut self.farm) }
    pub fn next_crop(&mut self) -> CropId { Self::take(&mut self.crop) }

    pub fn next_projectile(&mut self, kind: ProjectileKind) -> ProjectileId {
        Self::take(self.projectile_counter_mut(kind))
    }

    pub fn projectile_counter_mut(&mut self, kind: ProjectileKind) -> &mut ProjectileId {
        match kind {
            ProjectileKind::Crop => &mut self.crop_projectile,
            ProjectileKind::Grain | ProjectileKind::MarketGrain => &mut self.grain_projectile,
            ProjectileKind::Coin => &mut self.coin_projectile,
        }
    }
}

// ── Aggregate root ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub version:                     u32,
    pub planet_name:                 String,
    pub settlers:                    Vec<Settler>,
    pub houses:                      Vec<House>,
    pub farms:                       Vec<Farm>,
    pub crops:                       Vec<Crop>,
    pub harvester:                   Option<Harvester>,
    pub grain_pile:                  Option<GrainPile>,
    pub market:                      Option<Market>,
    pub researcher:                  Option<Researcher>,
    pub projectiles:                 Vec<Projectile>,
    pub coins:                       u64,
    pub economy:                     EconomyConfig,
    pub ids:                         IdCounters,
    pub info_entry_ids:              Vec<String>,
    pub completed_research_node_ids: Vec<String>,
    /// Accumulated clicks per research node id.
    pub research_progress:           BTreeMap<String, u32>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(EconomyConfig::default())
    }
}

impl GameState {
    pub fn new(economy: EconomyConfig) -> Self {
        Self {
            version: CURRENT_SAVE_VERSION,
            planet_name: DEFAULT_PLANET_NAME.into(),
            settlers: Vec::new(),
            houses: Vec::new(),
            farms: Vec::new(),
            crops: Vec::new(),
            harvester: None,
            grain_pile: None,
            market: None,
            researcher: None,
            projectiles: Vec::new(),
            coins: 0,
            economy,
            ids: IdCounters::default(),
            info_entry_ids: Vec::new(),
            completed_research_node_ids: Vec::new(),
            research_progress: BTreeMap::new(),
        }
    }

    pub fn alive_count(&self) -> u64 {
        self.settlers.iter().filter(|s| s.is_alive()).count() as u64
    }

    pub fn population_capacity(&self) -> Option<u64> {
        self.economy.population_capacity(self.houses.len())
    }

    pub fn crops_of_farm(&self, farm_id: FarmId) -> impl Iterator<Item = &Crop> {
        self.crops.iter().filter(move |c| c.farm_id == farm_id)
    }

    pub fn in_flight(&self, kind: ProjectileKind) -> u64 {
        self.projectiles.iter().filter(|p| p.kind == kind).count() as u64
    }

    pub fn grains(&self) -> u64 {
        self.grain_pile.as_ref().map_or(0, |p| p.grains)
    }

    /// Projectiles that will land in the grain pile.
    pub fn grains_in_flight(&self) -> u64 {
        self.in_flight(ProjectileKind::Crop) + self.in_flight(ProjectileKind::Grain)
    }

    /// Pile capacity minus resting grain minus everything already headed there.
    pub fn grain_capacity_remaining(&self) -> u64 {
        self.economy
            .grain_pile_capacity
            .saturating_sub(self.grains())
            .saturating_sub(self.grains_in_flight())
    }

    /// Projectiles that will end up as coins.
    pub fn coins_in_flight(&self) -> u64 {
        self.in_flight(ProjectileKind::MarketGrain) + self.in_flight(ProjectileKind::Coin)
    }

    pub fn coin_capacity_remaining(&self) -> u64 {
        self.economy
            .coin_capacity
            .saturating_sub(self.coins)
            .saturating_sub(self.coins_in_flight())
    }

    pub fn is_research_completed(&self, node_id: &str) -> bool {
        self.completed_research_node_ids.iter().any(|id| id == node_id)
    }

    /// Launch a projectile, drawing its id from the matching counter.
    pub fn launch(
        &mut self,
        kind: ProjectileKind,
        start: Point,
        end: Point,
        now: Millis,
    ) -> ProjectileId {
        let id = self.ids.next_projectile(kind);
        self.projectiles.push(Projectile {
            id,
            kind,
            start,
            end,
            launched_ms: now,
            duration_ms: kind.flight_duration_ms(),
        });
        id
    }
}
