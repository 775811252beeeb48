use crate::types::Millis;
use serde::{Deserialize, Deserializer, Serialize};

pub const BASE_SETTLER_MIN_LIFESPAN_MS: Millis = 5_000.0;
pub const BASE_SETTLER_MAX_LIFESPAN_MS: Millis = 10_000.0;
pub const GRAIN_PILE_CAPACITY: u64 = 100;
pub const BASE_COIN_CAPACITY: u64 = 200;
pub const DEFAULT_PLANET_NAME: &str = "Your Planet";

/// Tunable economy constants. Live inside the game state (research mutates
/// them, saves persist them); `SimConfig` only supplies the starting values.
///
/// Counts read from JSON are floored and clamped at zero. Legacy camelCase
/// keys are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    #[serde(alias = "settlersBaseCapacity", deserialize_with = "count")]
    pub settlers_base_capacity:          u64,
    #[serde(alias = "housesBaseCapacity", deserialize_with = "count")]
    pub houses_base_capacity:            u64,
    #[serde(alias = "farmsBaseCapacity", deserialize_with = "count")]
    pub farms_base_capacity:             u64,
    #[serde(alias = "settlersPerHouse", deserialize_with = "count")]
    pub settlers_per_house:              u64,
    #[serde(alias = "farmLifespanBonusPerFarmMs")]
    pub farm_lifespan_bonus_per_farm_ms: Millis,
    #[serde(alias = "farmCropCapacity", deserialize_with = "count")]
    pub farm_crop_capacity:              u64,
    #[serde(alias = "farmCropSpawnIntervalMs")]
    pub farm_crop_spawn_interval_ms:     Millis,
    #[serde(alias = "houseSpawnIntervalMs")]
    pub house_spawn_interval_ms:         Millis,
    #[serde(alias = "houseSpawnAmount", deserialize_with = "count")]
    pub house_spawn_amount:              u64,
    #[serde(alias = "settlerMinLifespanMs")]
    pub settler_min_lifespan_ms:         Millis,
    #[serde(alias = "settlerMaxLifespanMs")]
    pub settler_max_lifespan_ms:         Millis,
    #[serde(alias = "grainPileCapacity", deserialize_with = "count")]
    pub grain_pile_capacity:             u64,
    #[serde(alias = "coinCapacity", deserialize_with = "coin_capacity")]
    pub coin_capacity:                   u64,
}

fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let raw = f64::deserialize(d)?;
    Ok(if raw.is_finite() { raw.max(0.0).floor() as u64 } else { 0 })
}

/// `null` (how non-finite numbers are written) falls back to the base capacity.
fn coin_capacity<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(match Option::<f64>::deserialize(d)? {
        Some(raw) if raw.is_finite() => raw.max(0.0).floor() as u64,
        _ => BASE_COIN_CAPACITY,
    })
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            settlers_base_capacity:          10,
            houses_base_capacity:            5,
            farms_base_capacity:             5,
            settlers_per_house:              10,
            farm_lifespan_bonus_per_farm_ms: 1_000.0,
            farm_crop_capacity:              5,
            farm_crop_spawn_interval_ms:     4_500.0,
            house_spawn_interval_ms:         5_000.0,
            house_spawn_amount:              1,
            settler_min_lifespan_ms:         BASE_SETTLER_MIN_LIFESPAN_MS,
            settler_max_lifespan_ms:         BASE_SETTLER_MAX_LIFESPAN_MS,
            grain_pile_capacity:             GRAIN_PILE_CAPACITY,
            coin_capacity:                   BASE_COIN_CAPACITY,
        }
    }
}

impl EconomyConfig {
    /// Settler ceiling for the given number of houses. `None` = unlimited.
    pub fn population_capacity(&self, houses: usize) -> Option<u64> {
        let limit = self
            .settlers_base_capacity
            .saturating_add((houses as u64).saturating_mul(self.settlers_per_house));
        (limit > 0).then_some(limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub planet_name:          String,
    pub economy:              EconomyConfig,
    /// How often the runner persists the state to its save slot.
    pub autosave_interval_ms: Millis,
    pub save_slot:            String,
    pub compress_saves:       bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            planet_name:          DEFAULT_PLANET_NAME.into(),
            economy:              EconomyConfig::default(),
            autosave_interval_ms: 1_000.0,
            save_slot:            "autosave".into(),
            compress_saves:       true,
        }
    }
}

impl SimConfig {
    /// Load from a JSON file. Missing keys keep their defaults.
    /// In tests, use SimConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SimConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in unit tests.
    /// Plain saves keep payloads human-readable in assertions.
    pub fn default_test() -> Self {
        Self {
            compress_saves: false,
            save_slot: "test".into(),
            ..Self::default()
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        let e = &self.economy;
        if e.settler_min_lifespan_ms > e.settler_max_lifespan_ms {
            anyhow::bail!(
                "settler_min_lifespan_ms ({}) exceeds settler_max_lifespan_ms ({})",
                e.settler_min_lifespan_ms,
                e.settler_max_lifespan_ms
            );
        }
        if !(self.autosave_interval_ms > 0.0) {
            anyhow::bail!("autosave_interval_ms must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{ "economy": { "house_spawn_amount": 3 } }"#).unwrap();
        assert_eq!(config.economy.house_spawn_amount, 3);
        assert_eq!(config.economy.settlers_per_house, 10);
        assert_eq!(config.save_slot, "autosave");
    }

    #[test]
    fn zero_population_capacity_means_unlimited() {
        let economy = EconomyConfig {
            settlers_base_capacity: 0,
            settlers_per_house: 0,
            ..EconomyConfig::default()
        };
        assert_eq!(economy.population_capacity(3), None);
        assert_eq!(EconomyConfig::default().population_capacity(2), Some(30));
    }

    #[test]
    fn oversized_per_house_capacity_saturates() {
        let economy: EconomyConfig =
            serde_json::from_str(r#"{ "settlers_per_house": 1e30, "settlersBaseCapacity": 10 }"#).unwrap();
        assert_eq!(economy.settlers_per_house, u64::MAX);
        assert_eq!(economy.population_capacity(3), Some(u64::MAX));
        assert_eq!(economy.population_capacity(0), Some(10));
    }

    #[test]
    fn counts_are_clamped_and_coin_capacity_falls_back() {
        let economy: EconomyConfig = serde_json::from_str(
            r#"{ "farmCropCapacity": -4, "house_spawn_amount": 2.7, "coin_capacity": null }"#,
        )
        .unwrap();
        assert_eq!(economy.farm_crop_capacity, 0);
        assert_eq!(economy.house_spawn_amount, 2);
        assert_eq!(economy.coin_capacity, BASE_COIN_CAPACITY);
    }
}
