//! World snapshot consumed by the AI core
//!
//! Obstacles, agent bodies, live projectiles and pickups as the simulation layer
//! sees them at the start of a tick. Behaviors never own any of these; they read
//! the snapshot and return commands.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::constants::{agent, arena, weapons};
use crate::util::bounds::BoundingBox;
use crate::util::vec2::Vec2;

/// Unique agent identifier (stable across respawns of the same slot)
pub type AgentId = Uuid;

/// Identifier for non-agent entities (obstacles, projectiles, pickups)
pub type EntityId = u64;

/// Side an agent fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }
}

/// Weapon identity; stats come from the constant table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponKind {
    Pistol,
    Shotgun,
    #[serde(rename = "machinegun")]
    MachineGun,
    Grenade,
    Rifle,
}

impl WeaponKind {
    pub const ALL: [WeaponKind; 5] = [
        WeaponKind::Pistol,
        WeaponKind::Shotgun,
        WeaponKind::MachineGun,
        WeaponKind::Grenade,
        WeaponKind::Rifle,
    ];

    pub fn stats(self) -> &'static weapons::WeaponStats {
        match self {
            WeaponKind::Pistol => &weapons::PISTOL,
            WeaponKind::Shotgun => &weapons::SHOTGUN,
            WeaponKind::MachineGun => &weapons::MACHINE_GUN,
            WeaponKind::Grenade => &weapons::GRENADE,
            WeaponKind::Rifle => &weapons::RIFLE,
        }
    }
}

/// Physical state of an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentBody {
    /// Center position in world space
    pub position: Vec2,
    pub velocity: Vec2,
    pub health: f32,
    pub alive: bool,
    pub half_size: f32,
    pub team: Team,
    pub weapon: WeaponKind,
    /// Respawn slot this agent occupies
    pub slot: usize,
    pub id: AgentId,
}

impl AgentBody {
    pub fn new(id: AgentId, slot: usize, team: Team, position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            health: agent::MAX_HEALTH,
            alive: true,
            half_size: agent::HALF_SIZE,
            team,
            weapon: WeaponKind::Pistol,
            slot,
            id,
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_center(self.position, self.half_size, self.half_size)
    }

    pub fn bounds_at(&self, position: Vec2) -> BoundingBox {
        BoundingBox::from_center(position, self.half_size, self.half_size)
    }
}

/// What a projectile does on contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Damages agents; absorbed by cover
    Bullet,
    /// Damages cover; fired during stuck recovery
    Breach,
    /// Flies over cover
    Grenade,
}

/// Live projectile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: EntityId,
    pub owner: AgentId,
    pub team: Team,
    pub kind: ProjectileKind,
    /// Center position
    pub position: Vec2,
    pub velocity: Vec2,
    pub damage: f32,
    /// Remaining lifetime (seconds)
    pub lifetime: f32,
}

impl Projectile {
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::around(self.position, arena::PROJECTILE_SIZE * 0.5)
    }

    pub fn is_hostile_to(&self, team: Team) -> bool {
        self.team != team && self.kind != ProjectileKind::Breach
    }
}

/// Destructible cover
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: EntityId,
    pub bounds: BoundingBox,
    pub hp: f32,
}

impl Obstacle {
    pub fn new(id: EntityId, bounds: BoundingBox) -> Self {
        Self {
            id,
            bounds,
            hp: arena::OBSTACLE_HP,
        }
    }
}

/// Upgrade carried by a pickup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    FireRate,
    Health,
}

/// Collectible upgrade lying in the world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub id: EntityId,
    /// Center position
    pub position: Vec2,
    pub kind: UpgradeKind,
    /// Simulation time the pickup appeared
    pub spawned_at: f32,
}

impl Pickup {
    pub fn is_expired(&self, now: f32) -> bool {
        now - self.spawned_at > arena::PICKUP_LIFETIME
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::around(self.position, arena::PICKUP_SIZE * 0.5)
    }
}

/// Everything the core reads in one tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub bounds: BoundingBox,
    /// Simulation time in seconds
    pub time: f32,
    pub obstacles: Vec<Obstacle>,
    pub agents: Vec<AgentBody>,
    pub projectiles: Vec<Projectile>,
    pub pickups: Vec<Pickup>,
}

impl WorldSnapshot {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            bounds: BoundingBox::new(0.0, 0.0, width, height),
            time: 0.0,
            obstacles: Vec::new(),
            agents: Vec::new(),
            projectiles: Vec::new(),
            pickups: Vec::new(),
        }
    }

    pub fn agent_index(&self, id: AgentId) -> Option<usize> {
        self.agents.iter().position(|a| a.id == id)
    }

    pub fn agent(&self, id: AgentId) -> Option<&AgentBody> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn pickup(&self, id: EntityId) -> Option<&Pickup> {
        self.pickups.iter().find(|p| p.id == id)
    }

    pub fn live_agents(&self) -> impl Iterator<Item = &AgentBody> {
        self.agents.iter().filter(|a| a.alive)
    }
}
