//! Post-load registry repair. A save edited by hand, written by an older
//! build, or truncated mid-write can carry counters that would reissue ids
//! already in use. Repair never removes entities.

use crate::{
    projectile::{Projectile, ProjectileKind},
    state::GameState,
};
use std::f64::consts::TAU;

/// Everything the repair pass changed, for logging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairReport {
    pub counters_raised:    u32,
    pub duplicates_dropped: u32,
    pub values_clamped:     u32,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

fn raise(counter: &mut u64, ids: impl Iterator<Item = u64>, report: &mut RepairReport) {
    if let Some(next) = ids.max().map(|max| max.saturating_add(1)) {
        if *counter < next {
            *counter = next;
            report.counters_raised += 1;
        }
    }
}

fn flight_ids<'a>(
    flights: &'a [Projectile],
    kinds: &'a [ProjectileKind],
) -> impl Iterator<Item = u64> + 'a {
    flights.iter().filter(move |p| kinds.contains(&p.kind)).map(|p| p.id)
}

fn dedupe(list: &mut Vec<String>, report: &mut RepairReport) {
    let mut seen = Vec::with_capacity(list.len());
    list.retain(|id| {
        if seen.contains(id) {
            report.duplicates_dropped += 1;
            false
        } else {
            seen.push(id.clone());
            true
        }
    });
}

pub fn repair(state: &mut GameState) -> RepairReport {
    let mut report = RepairReport::default();

    // ── Id counters ──
    let ids = &mut state.ids;
    raise(&mut ids.settler, state.settlers.iter().map(|s| s.id), &mut report);
    raise(&mut ids.house, state.houses.iter().map(|h| h.id), &mut report);
    raise(&mut ids.farm, state.farms.iter().map(|f| f.id), &mut report);
    raise(&mut ids.crop, state.crops.iter().map(|c| c.id), &mut report);
    let flights = &state.projectiles;
    raise(&mut ids.crop_projectile, flight_ids(flights, &[ProjectileKind::Crop]), &mut report);
    raise(
        &mut ids.grain_projectile,
        flight_ids(flights, &[ProjectileKind::Grain, ProjectileKind::MarketGrain]),
        &mut report,
    );
    raise(&mut ids.coin_projectile, flight_ids(flights, &[ProjectileKind::Coin]), &mut report);

    // ── Harvester animation ──
    if let Some(harvester) = &mut state.harvester {
        let spin = if harvester.spin_level.is_finite() { harvester.spin_level.clamp(0.0, 1.0) } else { 0.0 };
        let angle = if harvester.rotation_angle.is_finite() { harvester.rotation_angle.rem_euclid(TAU) } else { 0.0 };
        if spin != harvester.spin_level || angle != harvester.rotation_angle {
            report.values_clamped += 1;
        }
        harvester.spin_level = spin;
        harvester.rotation_angle = angle;
    }

    // ── Resources ──
    let capacity = state.economy.grain_pile_capacity;
    if let Some(pile) = &mut state.grain_pile {
        if pile.grains > capacity {
            pile.grains = capacity;
            report.values_clamped += 1;
        }
    }
    for farm in &mut state.farms {
        if !farm.last_produced_ms.is_finite() {
            farm.last_produced_ms = farm.built_ms;
            report.values_clamped += 1;
        }
    }

    dedupe(&mut state.info_entry_ids, &mut report);
    dedupe(&mut state.completed_research_node_ids, &mut report);

    if !report.is_clean() {
        log::warn!("Repaired loaded save: {report:?}");
    }
    report
}
