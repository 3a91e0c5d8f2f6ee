use rand::Rng;
use std::f32::consts::TAU;

use crate::game::constants::aim::*;
use crate::game::view::WorldView;
use crate::util::bounds::BoundingBox;
use crate::util::vec2::Vec2;

/// Where to aim so a projectile at `projectile_speed` meets a target moving at `target_velocity`
///
/// Single-step estimate: travel time over the current distance, target extrapolated by it.
pub fn lead_target(shooter: Vec2, target: Vec2, target_velocity: Vec2, projectile_speed: f32) -> Vec2 {
    if projectile_speed <= 0.0 {
        return target;
    }
    let travel_time = shooter.distance_to(target) / projectile_speed;
    target + target_velocity * travel_time
}

/// Jitter radius for a tier scale (0 = perfect aim, 1 = most lenient) at a given distance
pub fn jitter_radius(tier_scale: f32, distance: f32) -> f32 {
    tier_scale * MAX_AIM_JITTER * (distance / JITTER_FULL_DISTANCE).min(1.0)
}

/// Offset `aim` by a random point within `radius`
pub fn apply_jitter<R: Rng>(aim: Vec2, radius: f32, rng: &mut R) -> Vec2 {
    if radius <= 0.0 {
        return aim;
    }
    let angle = rng.gen_range(0.0..TAU);
    let magnitude = rng.gen_range(0.0..=radius);
    aim + Vec2::from_angle(angle) * magnitude
}

/// Stepped raycast: false if any sample along `from -> to` lies inside an obstacle
pub fn has_line_of_sight(view: &WorldView, from: Vec2, to: Vec2) -> bool {
    let corridor = BoundingBox::spanning(from, to);
    let blockers: Vec<BoundingBox> = view.obstacles_in(&corridor).map(|o| o.bounds).collect();
    if blockers.is_empty() {
        return true;
    }

    let distance = from.distance_to(to);
    let steps = (distance / LOS_STEP).ceil().max(1.0) as u32;
    (0..=steps).all(|i| {
        let point = from.lerp(to, i as f32 / steps as f32);
        !blockers.iter().any(|b| b.contains_point(point))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::navigation::NavigationGrid;
    use crate::game::spatial::SpatialHash;
    use crate::game::state::{Obstacle, WorldSnapshot};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_lead_stationary_target() {
        let aim = lead_target(Vec2::ZERO, Vec2::new(300.0, 0.0), Vec2::ZERO, 600.0);
        assert_eq!(aim, Vec2::new(300.0, 0.0));
    }

    #[test]
    fn test_lead_moving_target() {
        // 0.5s of travel at 600 u/s; target moving down at 100 u/s
        let aim = lead_target(Vec2::ZERO, Vec2::new(300.0, 0.0), Vec2::new(0.0, 100.0), 600.0);
        assert!(aim.approx_eq(Vec2::new(300.0, 50.0), 1e-3));
    }

    #[test]
    fn test_jitter_radius_by_tier_and_distance() {
        assert_eq!(jitter_radius(0.0, 600.0), 0.0);
        assert_eq!(jitter_radius(1.0, 400.0), MAX_AIM_JITTER);
        assert_eq!(jitter_radius(1.0, 1000.0), MAX_AIM_JITTER);
        assert!((jitter_radius(1.0, 200.0) - MAX_AIM_JITTER * 0.5).abs() < 1e-4);
        assert!(jitter_radius(0.3, 400.0) < jitter_radius(0.6, 400.0));
    }

    #[test]
    fn test_jitter_stays_within_radius() {
        let mut rng = StdRng::seed_from_u64(5);
        let aim = Vec2::new(100.0, 100.0);
        for _ in 0..200 {
            let jittered = apply_jitter(aim, 30.0, &mut rng);
            assert!(jittered.distance_to(aim) <= 30.0 + 1e-3);
        }
        assert_eq!(apply_jitter(aim, 0.0, &mut rng), aim);
    }

    #[test]
    fn test_line_of_sight() {
        let mut world = WorldSnapshot::new(1000.0, 1000.0);
        world
            .obstacles
            .push(Obstacle::new(1, BoundingBox::new(450.0, 0.0, 20.0, 400.0)));
        let mut index = SpatialHash::new(100.0);
        index.rebuild(&world);
        let nav = NavigationGrid::new(1000.0, 1000.0, 40.0);
        let view = WorldView::new(&world, &index, &nav);

        assert!(!has_line_of_sight(&view, Vec2::new(100.0, 200.0), Vec2::new(900.0, 200.0)));
        assert!(has_line_of_sight(&view, Vec2::new(100.0, 600.0), Vec2::new(900.0, 600.0)));
        assert!(has_line_of_sight(&view, Vec2::new(100.0, 200.0), Vec2::new(300.0, 200.0)));
    }
}
