//! Colony economy engine: settlers, production chain, research and
//! versioned saves, driven one frame at a time.

pub mod building;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod farm_subsystem;
pub mod geometry;
pub mod harvester_subsystem;
pub mod info_entry;
pub mod market_subsystem;
pub mod persistence;
pub mod projectile;
pub mod research;
pub mod rng;
pub mod settler_subsystem;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod subsystem;
pub mod types;
