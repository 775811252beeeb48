// ---------------------------------------------------------------------------
// Save migration chain
// ---------------------------------------------------------------------------
//
// Each step upgrades the raw JSON record in place from `from_version` to
// `to_version`, filling new fields with defaults. Steps run until the record
// reaches CURRENT_SAVE_VERSION. A version with no step, or a version seen
// twice, aborts the load.

use super::CURRENT_SAVE_VERSION;
use crate::{config::BASE_COIN_CAPACITY, error::PersistenceError};
use serde_json::{Map, Value};
use std::collections::HashSet;

pub type RawRecord = Map<String, Value>;

pub struct MigrationStep {
    pub from_version: u32,
    pub to_version:   u32,
    pub description:  &'static str,
    pub migrate_fn:   fn(&mut RawRecord),
}

/// What the chain did to one record.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationReport {
    pub original_version:  u32,
    pub final_version:     u32,
    pub step_descriptions: Vec<&'static str>,
}

pub struct MigrationRegistry {
    steps:          Vec<MigrationStep>,
    target_version: u32,
}

impl MigrationRegistry {
    pub fn new(steps: Vec<MigrationStep>, target_version: u32) -> Self {
        Self { steps, target_version }
    }

    /// The shipped chain, v1 → CURRENT_SAVE_VERSION.
    pub fn standard() -> Self {
        Self::new(
            vec![
                MigrationStep {
                    from_version: 1,
                    to_version:   2,
                    description:  "add info_entry_ids",
                    migrate_fn:   |raw| {
                        raw.insert("info_entry_ids".into(), Value::Array(Vec::new()));
                    },
                },
                MigrationStep {
                    from_version: 2,
                    to_version:   3,
                    description:  "add researcher",
                    migrate_fn:   |raw| {
                        raw.entry("researcher").or_insert(Value::Null);
                    },
                },
                MigrationStep {
                    from_version: 3,
                    to_version:   4,
                    description:  "reset coin_capacity to base",
                    migrate_fn:   |raw| {
                        raw.insert("coin_capacity".into(), Value::from(BASE_COIN_CAPACITY));
                    },
                },
                MigrationStep {
                    from_version: 4,
                    to_version:   5,
                    description:  "add completed_research_node_ids",
                    migrate_fn:   |raw| {
                        raw.insert("completed_research_node_ids".into(), Value::Array(Vec::new()));
                    },
                },
            ],
            CURRENT_SAVE_VERSION,
        )
    }

    fn step_for(&self, version: u32) -> Option<&MigrationStep> {
        self.steps.iter().find(|step| step.from_version == version)
    }

    /// Bring `raw` up to the target version.
    pub fn migrate(&self, raw: &mut RawRecord) -> Result<MigrationReport, PersistenceError> {
        let original_version = read_version(raw)?;
        let mut version = original_version;
        let mut visited = HashSet::new();
        let mut step_descriptions = Vec::new();

        while version != self.target_version {
            if !visited.insert(version) {
                return Err(PersistenceError::MigrationCycle { version });
            }
            let step = self.step_for(version).ok_or(PersistenceError::UnsupportedSaveVersion {
                found: Some(i64::from(version)),
            })?;

            log::info!("Migrating save v{} → v{}: {}", step.from_version, step.to_version, step.description);
            (step.migrate_fn)(raw);
            version = step.to_version;
            raw.insert("version".into(), Value::from(version));
            step_descriptions.push(step.description);
        }

        Ok(MigrationReport { original_version, final_version: version, step_descriptions })
    }
}

/// Versions must be integers ≥ 1. There is no default version.
fn read_version(raw: &RawRecord) -> Result<u32, PersistenceError> {
    let unsupported = |found: Option<i64>| PersistenceError::UnsupportedSaveVersion { found };
    let value = raw.get("version").ok_or(unsupported(None))?;

    let integral = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.is_finite()).map(|f| f as i64)),
        _ => None,
    };
    let version = integral.ok_or(unsupported(None))?;
    if version < 1 {
        return Err(unsupported(Some(version)));
    }
    u32::try_from(version).map_err(|_| unsupported(Some(version)))
}
