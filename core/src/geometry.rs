//! Planet geometry: the circular play-field and the random placement rules
//! used by settlers, crops and the grain pile.

use crate::{rng::SubsystemRng, types::Point};

pub const PLANET_CENTER: Point = Point::new(400.0, 400.0);
pub const PLANET_RADIUS: f64 = 360.0;
pub const SETTLER_RADIUS: f64 = 6.0;

pub const MOVE_DISTANCE_MIN: f64 = 20.0;
pub const MOVE_DISTANCE_MAX: f64 = 60.0;
const MOVE_TARGET_ATTEMPTS: usize = 8;

pub const CROP_COLLISION_DISTANCE: f64 = 22.0;
pub const FARM_CROP_DISTANCE_MIN: f64 = 28.0;
pub const FARM_CROP_DISTANCE_MAX: f64 = 78.0;
pub const FARM_CROP_VERTICAL_SQUASH: f64 = 0.7;
const CROP_PLACEMENT_ATTEMPTS: usize = 12;

/// True when a settler-sized body centred at `p` fits inside the planet.
pub fn point_within_planet(p: Point) -> bool {
    p.distance_to(PLANET_CENTER) <= PLANET_RADIUS - SETTLER_RADIUS
}

pub fn ease_out_quad(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// A reachable wander target near `from`; the planet centre when eight
/// attempts all land outside the planet.
pub fn random_target_near(from: Point, rng: &mut SubsystemRng) -> Point {
    for _ in 0..MOVE_TARGET_ATTEMPTS {
        let angle = rng.angle();
        let distance = rng.range(MOVE_DISTANCE_MIN, MOVE_DISTANCE_MAX);
        let candidate = from.offset(distance * angle.cos(), distance * angle.sin());
        if point_within_planet(candidate) {
            return candidate;
        }
    }
    PLANET_CENTER
}

/// Uniform angle, radius kept two settler radii away from the rim.
pub fn random_point_on_planet(rng: &mut SubsystemRng) -> Point {
    let radius = rng.range(SETTLER_RADIUS * 2.0, PLANET_RADIUS - SETTLER_RADIUS * 2.0);
    let angle = rng.angle();
    PLANET_CENTER.offset(angle.cos() * radius, angle.sin() * radius)
}

/// Rejection-sample a crop spot around `farm`, avoiding the planet rim and
/// the farm's existing crops. Falls back to a jittered spot next to the farm.
pub fn random_crop_position_near_farm(
    farm: Point,
    existing: &[Point],
    rng: &mut SubsystemRng,
) -> Point {
    for _ in 0..CROP_PLACEMENT_ATTEMPTS {
        let angle = rng.angle();
        let distance = rng.range(FARM_CROP_DISTANCE_MIN, FARM_CROP_DISTANCE_MAX);
        let candidate = farm.offset(
            angle.cos() * distance,
            angle.sin() * distance * FARM_CROP_VERTICAL_SQUASH,
        );

        if !point_within_planet(candidate) {
            continue;
        }

        let collides = existing
            .iter()
            .any(|crop| crop.distance_to(candidate) < CROP_COLLISION_DISTANCE);
        if !collides {
            return candidate;
        }
    }

    let dy = FARM_CROP_DISTANCE_MIN * FARM_CROP_VERTICAL_SQUASH;
    farm.offset(
        rng.range(-FARM_CROP_DISTANCE_MIN, FARM_CROP_DISTANCE_MIN),
        rng.range(-dy, dy),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planet_bounds() {
        assert!(point_within_planet(PLANET_CENTER));
        assert!(!point_within_planet(PLANET_CENTER.offset(PLANET_RADIUS, 0.0)));
        assert!(point_within_planet(
            PLANET_CENTER.offset(PLANET_RADIUS - SETTLER_RADIUS, 0.0)
        ));
    }

    #[test]
    fn easing_is_clamped() {
        assert_eq!(ease_out_quad(-1.0), 0.0);
        assert_eq!(ease_out_quad(0.5), 0.75);
        assert_eq!(ease_out_quad(3.0), 1.0);
    }

    #[test]
    fn wander_targets_stay_on_planet() {
        let mut rng = SubsystemRng::new(5, 0, 0);
        let rim = PLANET_CENTER.offset(PLANET_RADIUS - SETTLER_RADIUS - 1.0, 0.0);
        for _ in 0..200 {
            assert!(point_within_planet(random_target_near(rim, &mut rng)));
        }
    }

    #[test]
    fn crops_avoid_each_other_when_there_is_room() {
        let mut rng = SubsystemRng::new(11, 0, 0);
        let farm = PLANET_CENTER;
        let mut placed: Vec<Point> = Vec::new();
        for _ in 0..3 {
            let p = random_crop_position_near_farm(farm, &placed, &mut rng);
            placed.push(p);
        }
        for (i, a) in placed.iter().enumerate() {
            for b in placed.iter().skip(i + 1) {
                assert!(a.distance_to(*b) >= CROP_COLLISION_DISTANCE);
            }
        }
    }
}
