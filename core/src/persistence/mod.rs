//! Save payloads.
//!
//! serialize:   GameState → SaveRecord → JSON → codec bytes
//! deserialize: codec bytes → JSON object → migration chain → SaveRecord
//!              → GameState → rebase onto device time → repair → research
//!              effects re-applied
//!
//! RULE: a failed load never yields a partial state. Either the whole
//! pipeline succeeds or the caller gets a PersistenceError and keeps its
//! current state.

pub mod codec;
pub mod migrate;
pub mod rebase;
pub mod record;
pub mod repair;

pub use codec::{codec_by_name, Lz4Codec, PayloadCodec, PlainCodec};
pub use migrate::{MigrationRegistry, MigrationReport};
pub use record::SaveRecord;
pub use repair::RepairReport;

use crate::{error::PersistenceError, research::apply_completed_effects, state::GameState, types::Millis};
use serde_json::Value;

pub const CURRENT_SAVE_VERSION: u32 = 5;

/// A decoded save plus what it took to load it.
#[derive(Debug, Clone)]
pub struct LoadedSave {
    pub state:      GameState,
    pub migration:  MigrationReport,
    pub shifted_by: Millis,
    pub repair:     RepairReport,
}

pub fn serialize(
    state: &GameState,
    reference_ms: Millis,
    codec: &dyn PayloadCodec,
) -> Result<Vec<u8>, PersistenceError> {
    let record = SaveRecord::from_state(state, reference_ms);
    let json = serde_json::to_vec(&record)?;
    Ok(codec.encode(&json)?)
}

pub fn deserialize(
    bytes: &[u8],
    device_now: Millis,
    codec: &dyn PayloadCodec,
) -> Result<GameState, PersistenceError> {
    load(bytes, device_now, codec).map(|loaded| loaded.state)
}

/// Full load pipeline, keeping the intermediate reports.
pub fn load(
    bytes: &[u8],
    device_now: Millis,
    codec: &dyn PayloadCodec,
) -> Result<LoadedSave, PersistenceError> {
    let json = codec.decode(bytes)?;
    let mut raw = match serde_json::from_slice::<Value>(&json)? {
        Value::Object(map) => map,
        other => {
            return Err(PersistenceError::MalformedSave(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            )))
        }
    };

    let migration = MigrationRegistry::standard().migrate(&mut raw)?;
    let record: SaveRecord = serde_json::from_value(Value::Object(raw))?;
    let reference_ms = record.time_reference_ms;

    let mut state = record.into_state();
    let shifted_by = rebase::rebase(&mut state, reference_ms, device_now);
    let repair = repair::repair(&mut state);
    apply_completed_effects(&mut state);

    log::debug!(
        "Loaded save v{} ({} settlers, {} coins)",
        migration.original_version,
        state.settlers.len(),
        state.coins
    );
    Ok(LoadedSave { state, migration, shifted_by, repair })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null      => "null",
        Value::Bool(_)   => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_)  => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{state::House, types::Point};

    #[test]
    fn non_object_payload_is_malformed() {
        for payload in [&b"[1,2]"[..], b"42", b"not json"] {
            let err = deserialize(payload, 0.0, &PlainCodec).unwrap_err();
            assert!(matches!(err, PersistenceError::MalformedSave(_)), "{err:?}");
        }
    }

    #[test]
    fn lz4_payload_loads() {
        let mut state = GameState::default();
        state.houses.push(House::new(0, Point::new(400.0, 400.0), 10.0));
        state.ids.house = 1;

        let bytes = serialize(&state, 10.0, &Lz4Codec).unwrap();
        let loaded = deserialize(&bytes, 10.0, &Lz4Codec).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn load_reports_migration_and_shift() {
        let raw = br#"{ "version": 3, "houses": [{ "id": 0, "x": 400, "y": 400, "built_ms": 100 }], "time_reference_ms": 100 }"#;
        let loaded = load(raw, 1_100.0, &PlainCodec).unwrap();

        assert_eq!(loaded.migration.original_version, 3);
        assert_eq!(loaded.shifted_by, 1_000.0);
        assert_eq!(loaded.state.houses[0].built_ms, 1_100.0);
        assert_eq!(loaded.state.ids.house, 1);
        assert_eq!(loaded.repair.counters_raised, 1);
    }
}
