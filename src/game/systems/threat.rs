use crate::game::constants::threat::*;
use crate::game::state::{AgentBody, EntityId, Projectile};
use crate::game::view::WorldView;
use crate::util::vec2::Vec2;

/// One projectile on a collision course with an agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreatRecord {
    pub projectile: EntityId,
    /// Projectile position when assessed
    pub position: Vec2,
    /// Unit travel direction
    pub direction: Vec2,
    pub speed: f32,
    pub distance: f32,
    /// Seconds until the projectile reaches its closest approach
    pub time_to_impact: f32,
    /// Perpendicular distance between the agent and the travel line
    pub miss_distance: f32,
    /// Lower is more dangerous
    pub score: f32,
}

/// Scans hostile projectiles for ones heading at an agent
#[derive(Debug, Clone, Copy)]
pub struct ThreatDetector {
    radius: f32,
}

impl Default for ThreatDetector {
    fn default() -> Self {
        Self::new(DETECTION_RADIUS)
    }
}

impl ThreatDetector {
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Threats against `agent`, most dangerous first
    pub fn detect(&self, view: &WorldView, agent: &AgentBody) -> Vec<ThreatRecord> {
        let mut threats: Vec<ThreatRecord> = view
            .projectiles_near(agent.position, self.radius)
            .filter(|p| p.is_hostile_to(agent.team))
            .filter_map(|p| self.assess(p, agent.position))
            .collect();

        threats.sort_by(|a, b| a.score.total_cmp(&b.score));
        threats
    }

    /// Rate a single projectile against a target point
    pub fn assess(&self, projectile: &Projectile, target: Vec2) -> Option<ThreatRecord> {
        let to_target = target - projectile.position;
        let distance = to_target.length();
        if distance > self.radius {
            return None;
        }

        let (direction, speed) = projectile.velocity.normalize_with_length();
        if speed < MIN_SPEED {
            return None;
        }
        let toward = to_target.try_normalize()?;
        if direction.dot(toward) < ALIGNMENT_THRESHOLD {
            return None;
        }

        let projection = to_target.dot(direction);
        if projection <= 0.0 {
            return None;
        }
        let closest = projectile.position + direction * projection;
        let miss_distance = closest.distance_to(target);
        if miss_distance >= DANGER_RADIUS {
            return None;
        }

        let time_to_impact = projection / speed;
        let score = time_to_impact
            + DISTANCE_WEIGHT * distance / self.radius
            + MISS_WEIGHT * miss_distance / DANGER_RADIUS;

        Some(ThreatRecord {
            projectile: projectile.id,
            position: projectile.position,
            direction,
            speed,
            distance,
            time_to_impact,
            miss_distance,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::navigation::NavigationGrid;
    use crate::game::spatial::SpatialHash;
    use crate::game::state::{ProjectileKind, Team, WorldSnapshot};
    use uuid::Uuid;

    fn bullet(id: EntityId, team: Team, position: Vec2, velocity: Vec2) -> Projectile {
        Projectile {
            id,
            owner: Uuid::new_v4(),
            team,
            kind: ProjectileKind::Bullet,
            position,
            velocity,
            damage: 10.0,
            lifetime: 1.0,
        }
    }

    #[test]
    fn test_direct_hit_course() {
        let detector = ThreatDetector::default();
        let p = bullet(1, Team::Blue, Vec2::new(400.0, 500.0), Vec2::new(600.0, 0.0));
        let threat = detector.assess(&p, Vec2::new(500.0, 500.0)).unwrap();

        assert!((threat.time_to_impact - 100.0 / 600.0).abs() < 1e-4);
        assert!(threat.miss_distance < 1e-3);
        assert!((threat.distance - 100.0).abs() < 1e-3);
        assert_eq!(threat.direction, Vec2::RIGHT);
    }

    #[test]
    fn test_rejects_receding_and_tangential() {
        let detector = ThreatDetector::default();
        let target = Vec2::new(500.0, 500.0);

        let receding = bullet(1, Team::Blue, Vec2::new(400.0, 500.0), Vec2::new(-600.0, 0.0));
        assert!(detector.assess(&receding, target).is_none());

        let tangential = bullet(2, Team::Blue, Vec2::new(400.0, 500.0), Vec2::new(0.0, 600.0));
        assert!(detector.assess(&tangential, target).is_none());
    }

    #[test]
    fn test_rejects_wide_miss_and_far_or_still() {
        let detector = ThreatDetector::default();
        let target = Vec2::new(500.0, 500.0);

        let wide = bullet(1, Team::Blue, Vec2::new(300.0, 440.0), Vec2::new(600.0, 0.0));
        assert!(detector.assess(&wide, target).is_none());

        let far = bullet(2, Team::Blue, Vec2::new(0.0, 500.0), Vec2::new(600.0, 0.0));
        assert!(detector.assess(&far, target).is_none());

        let still = bullet(3, Team::Blue, Vec2::new(450.0, 500.0), Vec2::ZERO);
        assert!(detector.assess(&still, target).is_none());

        // Sitting exactly on the target has no usable direction
        let on_top = bullet(4, Team::Blue, target, Vec2::new(600.0, 0.0));
        assert!(detector.assess(&on_top, target).is_none());
    }

    #[test]
    fn test_detect_filters_friendly_and_sorts() {
        let mut world = WorldSnapshot::new(1000.0, 1000.0);
        let agent = AgentBody::new(Uuid::new_v4(), 0, Team::Red, Vec2::new(500.0, 500.0));
        world.agents.push(agent.clone());
        // Far but dead-on
        world
            .projectiles
            .push(bullet(1, Team::Blue, Vec2::new(200.0, 500.0), Vec2::new(600.0, 0.0)));
        // Close
        world
            .projectiles
            .push(bullet(2, Team::Blue, Vec2::new(500.0, 420.0), Vec2::new(0.0, 600.0)));
        // Friendly fire never counts
        world
            .projectiles
            .push(bullet(3, Team::Red, Vec2::new(450.0, 500.0), Vec2::new(600.0, 0.0)));

        let mut index = SpatialHash::new(100.0);
        index.rebuild(&world);
        let nav = NavigationGrid::new(1000.0, 1000.0, 40.0);
        let view = WorldView::new(&world, &index, &nav);

        let threats = ThreatDetector::default().detect(&view, &agent);
        assert_eq!(threats.len(), 2);
        assert_eq!(threats[0].projectile, 2);
        assert_eq!(threats[1].projectile, 1);
        assert!(threats[0].score <= threats[1].score);
    }

    #[test]
    fn test_breach_shots_ignored() {
        let mut world = WorldSnapshot::new(1000.0, 1000.0);
        let agent = AgentBody::new(Uuid::new_v4(), 0, Team::Red, Vec2::new(500.0, 500.0));
        let mut breach = bullet(1, Team::Blue, Vec2::new(400.0, 500.0), Vec2::new(600.0, 0.0));
        breach.kind = ProjectileKind::Breach;
        world.projectiles.push(breach);

        let mut index = SpatialHash::new(100.0);
        index.rebuild(&world);
        let nav = NavigationGrid::new(1000.0, 1000.0, 40.0);
        let view = WorldView::new(&world, &index, &nav);

        assert!(ThreatDetector::default().detect(&view, &agent).is_empty());
    }
}
