use crate::{
    building::{BuildingKind, BuiltEntity},
    research::ResearchOutcome,
    types::SettlerId,
};
use serde::{Deserialize, Serialize};

/// All player-issued commands.
/// Variants are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Clock control ─────────────────────────────
    Pause,
    Resume,

    // ── Planet interaction ────────────────────────
    SpawnSettler { x: f64, y: f64 },
    Build {
        building: BuildingKind,
        x:        f64,
        y:        f64,
    },
    ResearchNode { node_id: String },

    // ── Meta ──────────────────────────────────────
    RenamePlanet { name: String },
    Restart,
}

/// What an accepted command produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandOutcome {
    Done,
    Spawned { settler_id: SettlerId },
    Built { entity: BuiltEntity },
    Research { outcome: ResearchOutcome },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_from_tagged_json() {
        let cmd: PlayerCommand =
            serde_json::from_str(r#"{"cmd":"build","building":"farm","x":400,"y":380}"#).unwrap();
        assert_eq!(cmd, PlayerCommand::Build { building: BuildingKind::Farm, x: 400.0, y: 380.0 });

        let cmd: PlayerCommand = serde_json::from_str(r#"{"cmd":"pause"}"#).unwrap();
        assert_eq!(cmd, PlayerCommand::Pause);
    }
}
