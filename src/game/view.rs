//! Read-only view over one tick's world state and its two indices
//!
//! Agent logic only ever sees the world through this type. The spatial hash holds
//! start-of-tick boxes, so every query narrows candidates through the hash and
//! then checks the snapshot's current values.

use smallvec::SmallVec;

use crate::game::navigation::NavigationGrid;
use crate::game::spatial::{SpatialEntityId, SpatialHash};
use crate::game::state::{AgentBody, Obstacle, Pickup, Projectile, WorldSnapshot};
use crate::util::bounds::BoundingBox;
use crate::util::vec2::Vec2;

#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    pub world: &'a WorldSnapshot,
    pub index: &'a SpatialHash,
    pub nav: &'a NavigationGrid,
}

impl<'a> WorldView<'a> {
    pub fn new(world: &'a WorldSnapshot, index: &'a SpatialHash, nav: &'a NavigationGrid) -> Self {
        Self { world, index, nav }
    }

    /// Hash query in a stable order, so seeded runs stay reproducible
    fn query_sorted(&self, region: &BoundingBox) -> SmallVec<[SpatialEntityId; 16]> {
        let mut found: SmallVec<[SpatialEntityId; 16]> = self.index.query_region(region).into_iter().collect();
        found.sort_unstable();
        found
    }

    pub fn obstacles_in(&self, region: &BoundingBox) -> impl Iterator<Item = &'a Obstacle> + '_ {
        let obstacles = &self.world.obstacles;
        self.query_sorted(region).into_iter().filter_map(move |id| match id {
            SpatialEntityId::Obstacle(i) => obstacles.get(i),
            _ => None,
        })
    }

    /// True when `bounds` overlaps any obstacle
    pub fn overlaps_obstacle(&self, bounds: &BoundingBox) -> bool {
        self.obstacles_in(bounds).any(|o| o.bounds.intersects(bounds))
    }

    /// Obstacle containing `point`, if any
    pub fn obstacle_at(&self, point: Vec2) -> Option<&'a Obstacle> {
        self.obstacles_in(&BoundingBox::around(point, 0.0))
            .find(|o| o.bounds.contains_point(point))
    }

    /// Projectiles whose position lies within `radius` of `center`
    pub fn projectiles_near(&self, center: Vec2, radius: f32) -> impl Iterator<Item = &'a Projectile> + '_ {
        let projectiles = &self.world.projectiles;
        let radius_sq = radius * radius;
        self.query_sorted(&BoundingBox::around(center, radius))
            .into_iter()
            .filter_map(move |id| match id {
                SpatialEntityId::Projectile(i) => projectiles.get(i),
                _ => None,
            })
            .filter(move |p| p.position.distance_sq_to(center) <= radius_sq)
    }

    /// Live agents within `radius` of `center`
    pub fn agents_near(&self, center: Vec2, radius: f32) -> impl Iterator<Item = &'a AgentBody> + '_ {
        let agents = &self.world.agents;
        let radius_sq = radius * radius;
        self.query_sorted(&BoundingBox::around(center, radius))
            .into_iter()
            .filter_map(move |id| match id {
                SpatialEntityId::Agent(i) => agents.get(i),
                _ => None,
            })
            .filter(move |a| a.alive && a.position.distance_sq_to(center) <= radius_sq)
    }

    /// Pickups within `radius` of `center`
    pub fn pickups_near(&self, center: Vec2, radius: f32) -> impl Iterator<Item = &'a Pickup> + '_ {
        let pickups = &self.world.pickups;
        let radius_sq = radius * radius;
        self.query_sorted(&BoundingBox::around(center, radius))
            .into_iter()
            .filter_map(move |id| match id {
                SpatialEntityId::Pickup(i) => pickups.get(i),
                _ => None,
            })
            .filter(move |p| p.position.distance_sq_to(center) <= radius_sq)
    }
}
