//! Coarse navigation grid and A* path planning
//!
//! The grid is a walkability bitmap derived from the obstacle set. It is rebuilt
//! in full whenever an obstacle is destroyed or respawns; there is no incremental
//! patching. Paths are planned over cell centers with 8-directional moves and
//! never cut across the corner of a blocked cell.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bitvec::prelude::*;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::game::constants::nav::{
    ARRIVAL_RADIUS, DIAGONAL_COST, DRIFT_THRESHOLD, RECOMPUTE_INTERVAL, STRAIGHT_COST,
};
use crate::util::bounds::BoundingBox;
use crate::util::vec2::Vec2;

/// Grid cell coordinates (column, row)
pub type GridCell = (i32, i32);

/// N, NE, E, SE, S, SW, W, NW
const DIRECTIONS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Walkability bitmap over the world
#[derive(Debug, Clone)]
pub struct NavigationGrid {
    cell_size: f32,
    width: usize,
    height: usize,
    /// Row-major, set = blocked
    blocked: BitVec,
}

impl NavigationGrid {
    /// Fully open grid covering a `world_width` x `world_height` world
    pub fn new(world_width: f32, world_height: f32, cell_size: f32) -> Self {
        let width = (world_width / cell_size).floor().max(1.0) as usize;
        let height = (world_height / cell_size).floor().max(1.0) as usize;
        Self {
            cell_size,
            width,
            height,
            blocked: bitvec![0; width * height],
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.count_ones()
    }

    #[inline]
    fn index(&self, (x, y): GridCell) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            None
        } else {
            Some(y as usize * self.width + x as usize)
        }
    }

    /// Mark every cell overlapping an obstacle as blocked; all others walkable
    pub fn build<'a>(&mut self, obstacles: impl IntoIterator<Item = &'a BoundingBox>) {
        self.blocked.fill(false);
        let max_x = self.width as i32 - 1;
        let max_y = self.height as i32 - 1;

        for bounds in obstacles {
            if !bounds.is_valid() {
                continue;
            }
            let x0 = (bounds.left() / self.cell_size).floor() as i32;
            let y0 = (bounds.top() / self.cell_size).floor() as i32;
            // A box ending exactly on a cell boundary does not block the next cell
            let x1 = ((bounds.right() / self.cell_size).ceil() as i32 - 1).max(x0);
            let y1 = ((bounds.bottom() / self.cell_size).ceil() as i32 - 1).max(y0);

            for y in y0.max(0)..=y1.min(max_y) {
                for x in x0.max(0)..=x1.min(max_x) {
                    let idx = y as usize * self.width + x as usize;
                    self.blocked.set(idx, true);
                }
            }
        }
    }

    /// World position to the containing cell, clamped to the grid
    pub fn world_to_grid(&self, position: Vec2) -> GridCell {
        let x = (position.x / self.cell_size).floor() as i32;
        let y = (position.y / self.cell_size).floor() as i32;
        (
            x.clamp(0, self.width as i32 - 1),
            y.clamp(0, self.height as i32 - 1),
        )
    }

    /// Center of a cell in world space
    pub fn grid_to_world(&self, (x, y): GridCell) -> Vec2 {
        Vec2::new(
            (x as f32 + 0.5) * self.cell_size,
            (y as f32 + 0.5) * self.cell_size,
        )
    }

    /// Out-of-grid cells are never walkable
    pub fn is_walkable(&self, cell: GridCell) -> bool {
        match self.index(cell) {
            Some(idx) => !self.blocked[idx],
            None => false,
        }
    }

    /// Walkable neighbors in 8 directions, without diagonal corner cutting
    pub fn neighbors(&self, (x, y): GridCell) -> SmallVec<[GridCell; 8]> {
        let mut out = SmallVec::new();
        for (dx, dy) in DIRECTIONS {
            let next = (x + dx, y + dy);
            if !self.is_walkable(next) {
                continue;
            }
            if dx != 0 && dy != 0 && (!self.is_walkable((x + dx, y)) || !self.is_walkable((x, y + dy))) {
                continue;
            }
            out.push(next);
        }
        out
    }

    /// Waypoints (cell centers) from `start` to `goal`, excluding the start cell
    ///
    /// Empty when either endpoint is blocked, when both fall in the same cell, or
    /// when no route exists. Callers fall back to straight-line movement.
    pub fn find_path(&self, start: Vec2, goal: Vec2) -> Vec<Vec2> {
        let start = self.world_to_grid(start);
        let goal = self.world_to_grid(goal);

        if !self.is_walkable(start) || !self.is_walkable(goal) || start == goal {
            return Vec::new();
        }

        let mut open = BinaryHeap::new();
        let mut came_from: FxHashMap<GridCell, GridCell> = FxHashMap::default();
        let mut g_score: FxHashMap<GridCell, f32> = FxHashMap::default();

        g_score.insert(start, 0.0);
        open.push(OpenNode {
            f: manhattan(start, goal),
            g: 0.0,
            cell: start,
        });

        while let Some(OpenNode { g, cell, .. }) = open.pop() {
            if cell == goal {
                return self.reconstruct(&came_from, goal);
            }
            // Stale heap entry; a cheaper route to this cell was found later
            if g > g_score.get(&cell).copied().unwrap_or(f32::INFINITY) {
                continue;
            }

            for next in self.neighbors(cell) {
                let step = if next.0 != cell.0 && next.1 != cell.1 {
                    DIAGONAL_COST
                } else {
                    STRAIGHT_COST
                };
                let tentative = g + step;
                if tentative < g_score.get(&next).copied().unwrap_or(f32::INFINITY) {
                    came_from.insert(next, cell);
                    g_score.insert(next, tentative);
                    open.push(OpenNode {
                        f: tentative + manhattan(next, goal),
                        g: tentative,
                        cell: next,
                    });
                }
            }
        }

        Vec::new()
    }

    fn reconstruct(&self, came_from: &FxHashMap<GridCell, GridCell>, goal: GridCell) -> Vec<Vec2> {
        let mut path = Vec::new();
        let mut current = goal;
        while let Some(&previous) = came_from.get(&current) {
            path.push(self.grid_to_world(current));
            current = previous;
        }
        path.reverse();
        path
    }
}

fn manhattan(a: GridCell, b: GridCell) -> f32 {
    ((a.0 - b.0).abs() + (a.1 - b.1).abs()) as f32
}

/// Open-set entry ordered so the lowest f-score pops first
#[derive(Debug, Clone, Copy)]
struct OpenNode {
    f: f32,
    g: f32,
    cell: GridCell,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| self.cell.cmp(&other.cell))
    }
}

/// Waypoint list owned by one agent, consumed front to back
#[derive(Debug, Clone, Default)]
pub struct Path {
    waypoints: Vec<Vec2>,
    next: usize,
    /// Target position the path was planned toward
    planned_for: Vec2,
    /// Simulation time of planning
    planned_at: f32,
}

impl Path {
    pub fn new(waypoints: Vec<Vec2>, planned_for: Vec2, planned_at: f32) -> Self {
        Self {
            waypoints,
            next: 0,
            planned_for,
            planned_at,
        }
    }

    /// Placeholder that is always stale
    pub fn none() -> Self {
        Self {
            planned_at: f32::NEG_INFINITY,
            ..Default::default()
        }
    }

    pub fn waypoints(&self) -> &[Vec2] {
        &self.waypoints
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.next >= self.waypoints.len()
    }

    /// Next unreached waypoint, skipping any within the arrival radius of `position`
    pub fn next_waypoint(&mut self, position: Vec2) -> Option<Vec2> {
        while let Some(&waypoint) = self.waypoints.get(self.next) {
            if waypoint.distance_sq_to(position) > ARRIVAL_RADIUS * ARRIVAL_RADIUS {
                return Some(waypoint);
            }
            self.next += 1;
        }
        None
    }

    /// Whether the target drifted too far or the path is too old
    pub fn is_stale(&self, target: Vec2, now: f32) -> bool {
        self.planned_for.distance_sq_to(target) > DRIFT_THRESHOLD * DRIFT_THRESHOLD
            || now - self.planned_at >= RECOMPUTE_INTERVAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid() -> NavigationGrid {
        NavigationGrid::new(2000.0, 2000.0, 100.0)
    }

    fn path_length(start: Vec2, path: &[Vec2]) -> f32 {
        let mut total = 0.0;
        let mut previous = start;
        for &waypoint in path {
            total += previous.distance_to(waypoint);
            previous = waypoint;
        }
        total
    }

    #[test]
    fn test_dimensions() {
        let grid = NavigationGrid::new(3200.0, 1800.0, 40.0);
        assert_eq!(grid.width(), 80);
        assert_eq!(grid.height(), 45);
        assert_eq!(grid.blocked_count(), 0);
    }

    #[test]
    fn test_world_grid_conversion() {
        let grid = open_grid();
        assert_eq!(grid.world_to_grid(Vec2::new(150.0, 250.0)), (1, 2));
        assert_eq!(grid.grid_to_world((1, 2)), Vec2::new(150.0, 250.0));
        // Clamped into the grid
        assert_eq!(grid.world_to_grid(Vec2::new(-50.0, 5000.0)), (0, 19));
    }

    #[test]
    fn test_build_blocks_overlapping_cells() {
        let mut grid = open_grid();
        let block = BoundingBox::new(800.0, 800.0, 400.0, 400.0);
        grid.build([&block]);

        assert_eq!(grid.blocked_count(), 16);
        assert!(!grid.is_walkable((8, 8)));
        assert!(!grid.is_walkable((11, 11)));
        assert!(grid.is_walkable((12, 11)));
        assert!(grid.is_walkable((7, 8)));
    }

    #[test]
    fn test_build_is_full_rebuild() {
        let mut grid = open_grid();
        let block = BoundingBox::new(0.0, 0.0, 150.0, 150.0);
        grid.build([&block]);
        assert_eq!(grid.blocked_count(), 4);

        grid.build(std::iter::empty::<&BoundingBox>());
        assert_eq!(grid.blocked_count(), 0);
    }

    #[test]
    fn test_out_of_bounds_not_walkable() {
        let grid = open_grid();
        assert!(!grid.is_walkable((-1, 0)));
        assert!(!grid.is_walkable((0, 20)));
    }

    #[test]
    fn test_neighbors_open() {
        let grid = open_grid();
        assert_eq!(grid.neighbors((5, 5)).len(), 8);
        assert_eq!(grid.neighbors((0, 0)).len(), 3);
    }

    #[test]
    fn test_neighbors_no_corner_cutting() {
        let mut grid = open_grid();
        // Block the cell east of (5, 5)
        let wall = BoundingBox::new(600.0, 500.0, 100.0, 100.0);
        grid.build([&wall]);

        let neighbors = grid.neighbors((5, 5));
        assert!(!neighbors.contains(&(6, 5)));
        assert!(!neighbors.contains(&(6, 4)));
        assert!(!neighbors.contains(&(6, 6)));
        assert_eq!(neighbors.len(), 5);
    }

    #[test]
    fn test_same_cell_returns_empty() {
        let grid = open_grid();
        assert!(grid
            .find_path(Vec2::new(110.0, 110.0), Vec2::new(190.0, 190.0))
            .is_empty());
        let p = Vec2::new(555.0, 555.0);
        assert!(grid.find_path(p, p).is_empty());
    }

    #[test]
    fn test_blocked_endpoint_returns_empty() {
        let mut grid = open_grid();
        let block = BoundingBox::new(800.0, 800.0, 400.0, 400.0);
        grid.build([&block]);

        assert!(grid
            .find_path(Vec2::new(100.0, 100.0), Vec2::new(1000.0, 1000.0))
            .is_empty());
        assert!(grid
            .find_path(Vec2::new(1000.0, 1000.0), Vec2::new(100.0, 100.0))
            .is_empty());
    }

    #[test]
    fn test_open_grid_path_near_straight_line() {
        let grid = open_grid();
        let start = Vec2::new(150.0, 150.0);
        let goal = Vec2::new(1750.0, 950.0);
        let path = grid.find_path(start, goal);

        assert!(!path.is_empty());
        assert_eq!(*path.last().unwrap(), grid.grid_to_world(grid.world_to_grid(goal)));
        let straight = start.distance_to(goal);
        assert!(path_length(start, &path) <= straight * 1.5);
    }

    #[test]
    fn test_path_excludes_start_cell() {
        let grid = open_grid();
        let start = Vec2::new(150.0, 150.0);
        let path = grid.find_path(start, Vec2::new(450.0, 150.0));
        assert_eq!(
            path,
            vec![Vec2::new(250.0, 150.0), Vec2::new(350.0, 150.0), Vec2::new(450.0, 150.0)]
        );
    }

    #[test]
    fn test_routes_around_central_block() {
        let mut grid = open_grid();
        let block = BoundingBox::new(800.0, 800.0, 400.0, 400.0);
        grid.build([&block]);

        let path = grid.find_path(Vec2::new(100.0, 100.0), Vec2::new(1900.0, 1900.0));
        assert!(!path.is_empty());
        for waypoint in &path {
            assert!(
                !block.contains_point(*waypoint),
                "waypoint {:?} inside blocked region",
                waypoint
            );
        }
    }

    #[test]
    fn test_unreachable_goal_returns_empty() {
        let mut grid = open_grid();
        // Wall off the left column band completely
        let wall = BoundingBox::new(300.0, 0.0, 100.0, 2000.0);
        grid.build([&wall]);

        assert!(grid
            .find_path(Vec2::new(50.0, 50.0), Vec2::new(1500.0, 1500.0))
            .is_empty());
    }

    #[test]
    fn test_path_follow_and_staleness() {
        let waypoints = vec![Vec2::new(100.0, 0.0), Vec2::new(200.0, 0.0)];
        let mut path = Path::new(waypoints, Vec2::new(200.0, 0.0), 10.0);

        assert_eq!(path.next_waypoint(Vec2::ZERO), Some(Vec2::new(100.0, 0.0)));
        assert_eq!(path.next_waypoint(Vec2::new(95.0, 0.0)), Some(Vec2::new(200.0, 0.0)));
        assert_eq!(path.next_waypoint(Vec2::new(199.0, 0.0)), None);
        assert!(path.is_complete());

        assert!(!path.is_stale(Vec2::new(250.0, 0.0), 10.5));
        assert!(path.is_stale(Vec2::new(350.0, 0.0), 10.5));
        assert!(path.is_stale(Vec2::new(200.0, 0.0), 11.0));
        assert!(Path::none().is_stale(Vec2::ZERO, 0.0));
    }
}
