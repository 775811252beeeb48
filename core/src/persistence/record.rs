//! The persisted shape of a game state.
//!
//! Keys are snake_case and stable; every field also accepts its legacy
//! camelCase key. Timestamps are written as `null` when non-finite (a house
//! that never spawned) and fall back to documented defaults when absent.

use crate::{
    config::{EconomyConfig, DEFAULT_PLANET_NAME},
    projectile::{Projectile, ProjectileKind},
    state::{
        Crop, Farm, GameState, GrainPile, Harvester, House, IdCounters, Market, Researcher,
        Settler, SettlerPhase,
    },
    types::{Millis, Point},
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::CURRENT_SAVE_VERSION;

// ── Entities ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlerRecord {
    pub id: u64,
    #[serde(default, alias = "anchorX")]
    pub anchor_x: f64,
    #[serde(default, alias = "anchorY")]
    pub anchor_y: f64,
    #[serde(default, alias = "targetX")]
    pub target_x: f64,
    #[serde(default, alias = "targetY")]
    pub target_y: f64,
    #[serde(default, alias = "moveStartMs")]
    pub move_start_ms: Option<Millis>,
    #[serde(default, alias = "lastDirectionChangeMs")]
    pub last_direction_change_ms: Option<Millis>,
    #[serde(default, alias = "birthMs")]
    pub birth_ms: Option<Millis>,
    #[serde(default)]
    pub phase: Value,
    #[serde(default, alias = "lifespanMs")]
    pub lifespan_ms: Option<Millis>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseRecord {
    pub id: u64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, alias = "builtMs")]
    pub built_ms: Option<Millis>,
    #[serde(default, alias = "lastSpawnMs")]
    pub last_spawn_ms: Option<Millis>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmRecord {
    pub id: u64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, alias = "builtMs")]
    pub built_ms: Option<Millis>,
    #[serde(default, alias = "lastProducedMs")]
    pub last_produced_ms: Option<Millis>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropRecord {
    pub id: u64,
    #[serde(default, alias = "farmId")]
    pub farm_id: u64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, alias = "createdMs")]
    pub created_ms: Option<Millis>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvesterRecord {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, alias = "builtMs")]
    pub built_ms: Option<Millis>,
    #[serde(default, alias = "lastHarvestMs")]
    pub last_harvest_ms: Option<Millis>,
    #[serde(default, alias = "lastSpinUpdateMs")]
    pub last_spin_update_ms: Option<Millis>,
    #[serde(default, alias = "spinLevel")]
    pub spin_level: Option<f64>,
    #[serde(default, alias = "rotationAngle")]
    pub rotation_angle: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrainPileRecord {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub grains: Option<f64>,
    #[serde(default, alias = "createdMs")]
    pub created_ms: Option<Millis>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRecord {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, alias = "builtMs")]
    pub built_ms: Option<Millis>,
    #[serde(default, alias = "lastSaleMs")]
    pub last_sale_ms: Option<Millis>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearcherRecord {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, alias = "builtMs")]
    pub built_ms: Option<Millis>,
}

/// Crop, grain and market-grain flights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileRecord {
    pub id: u64,
    #[serde(default, alias = "startX")]
    pub start_x: f64,
    #[serde(default, alias = "startY")]
    pub start_y: f64,
    #[serde(default, alias = "endX")]
    pub end_x: f64,
    #[serde(default, alias = "endY")]
    pub end_y: f64,
    #[serde(default, alias = "launchedMs")]
    pub launched_ms: Option<Millis>,
    #[serde(default, alias = "durationMs")]
    pub duration_ms: Option<Millis>,
}

/// Coins only rise vertically above the market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinProjectileRecord {
    pub id: u64,
    #[serde(default)]
    pub x: f64,
    #[serde(default, alias = "startY")]
    pub start_y: f64,
    #[serde(default, alias = "endY")]
    pub end_y: f64,
    #[serde(default, alias = "launchedMs")]
    pub launched_ms: Option<Millis>,
    #[serde(default, alias = "durationMs")]
    pub duration_ms: Option<Millis>,
}

// ── Root ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRecord {
    pub version: u32,
    #[serde(default, alias = "planetName")]
    pub planet_name: Option<String>,

    #[serde(default, deserialize_with = "lenient_list")]
    pub settlers: Vec<SettlerRecord>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub houses: Vec<HouseRecord>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub farms: Vec<FarmRecord>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub crops: Vec<CropRecord>,
    #[serde(default)]
    pub harvester: Option<HarvesterRecord>,
    #[serde(default, alias = "grainPile")]
    pub grain_pile: Option<GrainPileRecord>,
    #[serde(default)]
    pub market: Option<MarketRecord>,
    #[serde(default)]
    pub researcher: Option<ResearcherRecord>,

    #[serde(default, alias = "cropProjectiles", deserialize_with = "lenient_list")]
    pub crop_projectiles: Vec<ProjectileRecord>,
    #[serde(default, alias = "grainProjectiles", deserialize_with = "lenient_list")]
    pub grain_projectiles: Vec<ProjectileRecord>,
    #[serde(default, alias = "marketGrainProjectiles", deserialize_with = "lenient_list")]
    pub market_grain_projectiles: Vec<ProjectileRecord>,
    #[serde(default, alias = "coinProjectiles", deserialize_with = "lenient_list")]
    pub coin_projectiles: Vec<CoinProjectileRecord>,

    #[serde(default, alias = "nextSettlerId")]
    pub next_settler_id: u64,
    #[serde(default, alias = "nextHouseId")]
    pub next_house_id: u64,
    #[serde(default, alias = "nextFarmId")]
    pub next_farm_id: u64,
    #[serde(default, alias = "nextCropId")]
    pub next_crop_id: u64,
    #[serde(default, alias = "nextCropProjectileId")]
    pub next_crop_projectile_id: u64,
    #[serde(default, alias = "nextGrainProjectileId")]
    pub next_grain_projectile_id: u64,
    #[serde(default, alias = "nextCoinProjectileId")]
    pub next_coin_projectile_id: u64,

    #[serde(flatten)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub coins: Option<f64>,

    #[serde(default, alias = "infoEntryIds", deserialize_with = "string_list")]
    pub info_entry_ids: Vec<String>,
    #[serde(default, alias = "completedResearchNodeIds", deserialize_with = "string_list")]
    pub completed_research_node_ids: Vec<String>,
    #[serde(default, alias = "researchProgress", skip_serializing_if = "BTreeMap::is_empty")]
    pub research_progress: BTreeMap<String, u32>,

    #[serde(default, alias = "timeReferenceMs")]
    pub time_reference_ms: Option<Millis>,
}

/// Arrays of strings; anything else in the list (or a non-list) is dropped.
fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// A missing or non-array collection reads as empty.
fn lenient_list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    match Option::<Value>::deserialize(d)? {
        Some(items @ Value::Array(_)) => {
            serde_json::from_value(items).map_err(serde::de::Error::custom)
        }
        _ => Ok(Vec::new()),
    }
}

fn finite(value: Millis) -> Option<Millis> {
    value.is_finite().then_some(value)
}

// ── Settler phase ──────────────────────────────────────────────────

fn phase_to_value(phase: SettlerPhase) -> Value {
    match phase {
        SettlerPhase::Alive => json!({ "Alive": {} }),
        SettlerPhase::Fading { started_ms } => json!({ "Fading": { "started_ms": finite(started_ms) } }),
    }
}

/// Accepts `{"Alive":{}}`, `{"Fading":{"started_ms":n}}`, the in-memory
/// `{"kind":"Fading","startedMs":n}` form and a bare `"Alive"`. Anything
/// unrecognised is Alive.
fn phase_from_value(value: &Value) -> SettlerPhase {
    let started = |v: &Value| {
        v.get("started_ms")
            .or_else(|| v.get("startedMs"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    };

    if let Some(kind) = value.get("kind").and_then(Value::as_str) {
        return match kind {
            "Fading" => SettlerPhase::Fading { started_ms: started(value) },
            _ => SettlerPhase::Alive,
        };
    }
    if let Some(fading) = value.get("Fading") {
        return SettlerPhase::Fading { started_ms: started(fading) };
    }
    SettlerPhase::Alive
}

// ── Conversions ────────────────────────────────────────────────────

fn projectile_record(p: &Projectile) -> ProjectileRecord {
    ProjectileRecord {
        id:          p.id,
        start_x:     p.start.x,
        start_y:     p.start.y,
        end_x:       p.end.x,
        end_y:       p.end.y,
        launched_ms: finite(p.launched_ms),
        duration_ms: finite(p.duration_ms),
    }
}

fn projectile_from(record: ProjectileRecord, kind: ProjectileKind) -> Projectile {
    Projectile {
        id:          record.id,
        kind,
        start:       Point::new(record.start_x, record.start_y),
        end:         Point::new(record.end_x, record.end_y),
        launched_ms: record.launched_ms.unwrap_or(0.0),
        duration_ms: record.duration_ms.unwrap_or_else(|| kind.flight_duration_ms()),
    }
}

impl SaveRecord {
    pub fn from_state(state: &GameState, reference_ms: Millis) -> Self {
        let of_kind = |kind: ProjectileKind| {
            state.projectiles.iter().filter(move |p| p.kind == kind)
        };

        Self {
            version: state.version,
            planet_name: Some(state.planet_name.clone()),
            settlers: state
                .settlers
                .iter()
                .map(|s| SettlerRecord {
                    id:                       s.id,
                    anchor_x:                 s.anchor.x,
                    anchor_y:                 s.anchor.y,
                    target_x:                 s.target.x,
                    target_y:                 s.target.y,
                    move_start_ms:            finite(s.move_start_ms),
                    last_direction_change_ms: finite(s.last_direction_change_ms),
                    birth_ms:                 finite(s.birth_ms),
                    phase:                    phase_to_value(s.phase),
                    lifespan_ms:              finite(s.lifespan_ms),
                })
                .collect(),
            houses: state
                .houses
                .iter()
                .map(|h| HouseRecord {
                    id:            h.id,
                    x:             h.position.x,
                    y:             h.position.y,
                    built_ms:      finite(h.built_ms),
                    last_spawn_ms: finite(h.last_spawn_ms),
                })
                .collect(),
            farms: state
                .farms
                .iter()
                .map(|f| FarmRecord {
                    id:               f.id,
                    x:                f.position.x,
                    y:                f.position.y,
                    built_ms:         finite(f.built_ms),
                    last_produced_ms: finite(f.last_produced_ms),
                })
                .collect(),
            crops: state
                .crops
                .iter()
                .map(|c| CropRecord {
                    id:         c.id,
                    farm_id:    c.farm_id,
                    x:          c.position.x,
                    y:          c.position.y,
                    created_ms: finite(c.created_ms),
                })
                .collect(),
            harvester: state.harvester.as_ref().map(|h| HarvesterRecord {
                x:                   h.position.x,
                y:                   h.position.y,
                built_ms:            finite(h.built_ms),
                last_harvest_ms:     finite(h.last_harvest_ms),
                last_spin_update_ms: finite(h.last_spin_update_ms),
                spin_level:          finite(h.spin_level),
                rotation_angle:      finite(h.rotation_angle),
            }),
            grain_pile: state.grain_pile.as_ref().map(|p| GrainPileRecord {
                x:          p.position.x,
                y:          p.position.y,
                grains:     Some(p.grains as f64),
                created_ms: finite(p.created_ms),
            }),
            market: state.market.as_ref().map(|m| MarketRecord {
                x:            m.position.x,
                y:            m.position.y,
                built_ms:     finite(m.built_ms),
                last_sale_ms: finite(m.last_sale_ms),
            }),
            researcher: state.researcher.as_ref().map(|r| ResearcherRecord {
                x:        r.position.x,
                y:        r.position.y,
                built_ms: finite(r.built_ms),
            }),
            crop_projectiles: of_kind(ProjectileKind::Crop).map(projectile_record).collect(),
            grain_projectiles: of_kind(ProjectileKind::Grain).map(projectile_record).collect(),
            market_grain_projectiles: of_kind(ProjectileKind::MarketGrain)
                .map(projectile_record)
                .collect(),
            coin_projectiles: of_kind(ProjectileKind::Coin)
                .map(|p| CoinProjectileRecord {
                    id:          p.id,
                    x:           p.start.x,
                    start_y:     p.start.y,
                    end_y:       p.end.y,
                    launched_ms: finite(p.launched_ms),
                    duration_ms: finite(p.duration_ms),
                })
                .collect(),
            next_settler_id:          state.ids.settler,
            next_house_id:            state.ids.house,
            next_farm_id:             state.ids.farm,
            next_crop_id:             state.ids.crop,
            next_crop_projectile_id:  state.ids.crop_projectile,
            next_grain_projectile_id: state.ids.grain_projectile,
            next_coin_projectile_id:  state.ids.coin_projectile,
            economy: state.economy.clone(),
            coins: Some(state.coins as f64),
            info_entry_ids: state.info_entry_ids.clone(),
            completed_research_node_ids: state.completed_research_node_ids.clone(),
            research_progress: state.research_progress.clone(),
            time_reference_ms: finite(reference_ms),
        }
    }

    /// Build the in-memory state. Timestamps are still on the saving
    /// device's axis; rebasing happens afterwards.
    pub fn into_state(self) -> GameState {
        let mut projectiles = Vec::new();
        for (records, kind) in [
            (self.crop_projectiles, ProjectileKind::Crop),
            (self.grain_projectiles, ProjectileKind::Grain),
            (self.market_grain_projectiles, ProjectileKind::MarketGrain),
        ] {
            projectiles.extend(records.into_iter().map(|r| projectile_from(r, kind)));
        }
        projectiles.extend(self.coin_projectiles.into_iter().map(|r| Projectile {
            id:          r.id,
            kind:        ProjectileKind::Coin,
            start:       Point::new(r.x, r.start_y),
            end:         Point::new(r.x, r.end_y),
            launched_ms: r.launched_ms.unwrap_or(0.0),
            duration_ms: r.duration_ms.unwrap_or_else(|| ProjectileKind::Coin.flight_duration_ms()),
        }));

        let coins = self
            .coins
            .filter(|c| c.is_finite())
            .map_or(0, |c| c.max(0.0).floor() as u64);

        GameState {
            version: CURRENT_SAVE_VERSION,
            planet_name: self.planet_name.unwrap_or_else(|| DEFAULT_PLANET_NAME.into()),
            settlers: self
                .settlers
                .into_iter()
                .map(|r| Settler {
                    id:                       r.id,
                    anchor:                   Point::new(r.anchor_x, r.anchor_y),
                    target:                   Point::new(r.target_x, r.target_y),
                    move_start_ms:            r.move_start_ms.unwrap_or(0.0),
                    last_direction_change_ms: r.last_direction_change_ms.unwrap_or(0.0),
                    birth_ms:                 r.birth_ms.unwrap_or(0.0),
                    lifespan_ms:              r.lifespan_ms.unwrap_or(0.0),
                    phase:                    phase_from_value(&r.phase),
                })
                .collect(),
            houses: self
                .houses
                .into_iter()
                .map(|r| House {
                    id:            r.id,
                    position:      Point::new(r.x, r.y),
                    built_ms:      r.built_ms.unwrap_or(0.0),
                    last_spawn_ms: r.last_spawn_ms.unwrap_or(f64::NEG_INFINITY),
                })
                .collect(),
            farms: self
                .farms
                .into_iter()
                .map(|r| {
                    let built_ms = r.built_ms.unwrap_or(0.0);
                    Farm {
                        id: r.id,
                        position: Point::new(r.x, r.y),
                        built_ms,
                        last_produced_ms: r.last_produced_ms.unwrap_or(built_ms),
                    }
                })
                .collect(),
            crops: self
                .crops
                .into_iter()
                .map(|r| Crop {
                    id:         r.id,
                    farm_id:    r.farm_id,
                    position:   Point::new(r.x, r.y),
                    created_ms: r.created_ms.unwrap_or(0.0),
                })
                .collect(),
            harvester: self.harvester.map(|r| {
                let built_ms = r.built_ms.unwrap_or(0.0);
                let last_harvest_ms = r.last_harvest_ms.unwrap_or(built_ms);
                Harvester {
                    position: Point::new(r.x, r.y),
                    built_ms,
                    last_harvest_ms,
                    last_spin_update_ms: r.last_spin_update_ms.unwrap_or(last_harvest_ms),
                    spin_level: r.spin_level.unwrap_or(0.0),
                    rotation_angle: r.rotation_angle.unwrap_or(0.0),
                }
            }),
            grain_pile: self.grain_pile.map(|r| GrainPile {
                position:   Point::new(r.x, r.y),
                grains:     r.grains.filter(|g| g.is_finite()).map_or(0, |g| g.max(0.0).floor() as u64),
                created_ms: r.created_ms.unwrap_or(0.0),
            }),
            market: self.market.map(|r| {
                let built_ms = r.built_ms.unwrap_or(0.0);
                Market {
                    position: Point::new(r.x, r.y),
                    built_ms,
                    last_sale_ms: r.last_sale_ms.unwrap_or(built_ms),
                }
            }),
            researcher: self.researcher.map(|r| Researcher {
                position: Point::new(r.x, r.y),
                built_ms: r.built_ms.unwrap_or(0.0),
            }),
            projectiles,
            coins,
            economy: self.economy,
            ids: IdCounters {
                settler:          self.next_settler_id,
                house:            self.next_house_id,
                farm:             self.next_farm_id,
                crop:             self.next_crop_id,
                crop_projectile:  self.next_crop_projectile_id,
                grain_projectile: self.next_grain_projectile_id,
                coin_projectile:  self.next_coin_projectile_id,
            },
            info_entry_ids: self.info_entry_ids,
            completed_research_node_ids: self.completed_research_node_ids,
            research_progress: self.research_progress,
        }
    }
}
