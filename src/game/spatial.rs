//! Spatial hash over axis-aligned boxes
//!
//! Divides the world into square cells and records which entities overlap each
//! cell. An entity whose box straddles a cell boundary is stored in every cell it
//! touches, and the list of touched cells is kept per entity so removal only
//! visits those cells.
//!
//! The scheduler rebuilds the whole index once per tick, so entity references
//! are indices into that tick's [`WorldSnapshot`](crate::game::state::WorldSnapshot).

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::game::constants::spatial::{CELL_SIZE, INITIAL_CELL_CAPACITY};
use crate::game::state::WorldSnapshot;
use crate::util::bounds::BoundingBox;

/// Grid cell key - (x, y) cell coordinates
pub type CellKey = (i32, i32);

/// Cells touched by one entity; most boxes span at most four
type CellList = SmallVec<[CellKey; 4]>;

/// Transient reference to an entity in the current snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpatialEntityId {
    Obstacle(usize),
    Agent(usize),
    Projectile(usize),
    Pickup(usize),
}

/// Uniform-grid broadphase index
#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: f32,
    /// Inverse cell size for fast position-to-cell conversion
    inv_cell_size: f32,
    cells: HashMap<CellKey, HashSet<SpatialEntityId>>,
    /// Cells each entity was last inserted into
    membership: HashMap<SpatialEntityId, CellList>,
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::with_capacity(INITIAL_CELL_CAPACITY),
            membership: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Drop every entity and cell
    pub fn clear(&mut self) {
        self.cells.clear();
        self.membership.clear();
    }

    #[inline]
    fn coord_to_cell(&self, value: f32) -> i32 {
        (value * self.inv_cell_size).floor() as i32
    }

    /// Inclusive cell range covered by a box, partial overlap included
    fn cells_for(&self, bounds: &BoundingBox) -> impl Iterator<Item = CellKey> {
        let (x0, x1) = (self.coord_to_cell(bounds.left()), self.coord_to_cell(bounds.right()));
        let (y0, y1) = (self.coord_to_cell(bounds.top()), self.coord_to_cell(bounds.bottom()));
        (x0..=x1).flat_map(move |x| (y0..=y1).map(move |y| (x, y)))
    }

    /// Insert an entity under the given box
    ///
    /// Re-inserting an entity first clears its previous membership, so the
    /// recorded cells always match the last box. Invalid boxes are skipped.
    pub fn insert(&mut self, id: SpatialEntityId, bounds: &BoundingBox) {
        if !bounds.is_valid() {
            tracing::trace!("Skipping {:?}: invalid bounds {:?}", id, bounds);
            return;
        }
        self.remove(id);

        let touched: CellList = self.cells_for(bounds).collect();
        for &cell in &touched {
            self.cells.entry(cell).or_default().insert(id);
        }
        self.membership.insert(id, touched);
    }

    /// Remove an entity from every cell it was recorded in
    /// Returns false if the entity had no recorded membership
    pub fn remove(&mut self, id: SpatialEntityId) -> bool {
        let Some(touched) = self.membership.remove(&id) else {
            return false;
        };
        for cell in touched {
            if let Some(members) = self.cells.get_mut(&cell) {
                members.remove(&id);
                if members.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
        true
    }

    /// Move an entity to a new box
    #[inline]
    pub fn update(&mut self, id: SpatialEntityId, bounds: &BoundingBox) {
        self.remove(id);
        self.insert(id, bounds);
    }

    /// All entities sharing at least one cell with the query box
    pub fn query_region(&self, bounds: &BoundingBox) -> HashSet<SpatialEntityId> {
        let mut found = HashSet::new();
        if !bounds.is_valid() {
            return found;
        }
        for cell in self.cells_for(bounds) {
            if let Some(members) = self.cells.get(&cell) {
                found.extend(members.iter().copied());
            }
        }
        found
    }

    pub fn contains(&self, id: SpatialEntityId) -> bool {
        self.membership.contains_key(&id)
    }

    /// Number of distinct entities indexed
    pub fn len(&self) -> usize {
        self.membership.len()
    }

    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }

    /// Total (cell, entity) entries; an entity spanning k cells counts k times
    pub fn total_entries(&self) -> usize {
        self.cells.values().map(|c| c.len()).sum()
    }

    /// Rebuild from every entity in the snapshot
    pub fn rebuild(&mut self, world: &WorldSnapshot) {
        self.clear();
        for (i, obstacle) in world.obstacles.iter().enumerate() {
            self.insert(SpatialEntityId::Obstacle(i), &obstacle.bounds);
        }
        for (i, body) in world.agents.iter().enumerate().filter(|(_, a)| a.alive) {
            self.insert(SpatialEntityId::Agent(i), &body.bounds());
        }
        for (i, projectile) in world.projectiles.iter().enumerate() {
            self.insert(SpatialEntityId::Projectile(i), &projectile.bounds());
        }
        for (i, pickup) in world.pickups.iter().enumerate() {
            self.insert(SpatialEntityId::Pickup(i), &pickup.bounds());
        }
    }

    /// Get statistics about the grid
    pub fn stats(&self) -> SpatialHashStats {
        SpatialHashStats {
            non_empty_cells: self.cells.len(),
            total_entities: self.len(),
            total_entries: self.total_entries(),
            max_per_cell: self.cells.values().map(|c| c.len()).max().unwrap_or(0),
        }
    }
}

impl Default for SpatialHash {
    fn default() -> Self {
        Self::new(CELL_SIZE)
    }
}

/// Statistics about the spatial hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialHashStats {
    pub non_empty_cells: usize,
    pub total_entities: usize,
    pub total_entries: usize,
    pub max_per_cell: usize,
}
