//! Single-threaded tick scheduler
//!
//! Owns the world, both indices and every agent's behavior. Each tick rebuilds
//! the spatial hash, rebuilds the navigation grid if cover changed, then runs
//! agents one at a time in insertion order. Each agent's move is applied before
//! the next agent decides, so later agents see earlier agents' new positions
//! while the spatial hash still holds start-of-tick boxes.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{AiConfig, ConfigError};
use crate::game::constants::{agent, arena};
use crate::game::navigation::NavigationGrid;
use crate::game::respawn::{RespawnRoster, SlotRecord};
use crate::game::spatial::{SpatialEntityId, SpatialHash};
use crate::game::state::{
    AgentBody, AgentId, EntityId, Obstacle, Pickup, Projectile, ProjectileKind, Team, UpgradeKind,
    WeaponKind, WorldSnapshot,
};
use crate::game::systems::ai::{AgentBehavior, AgentProfile, AiManager, FireCommand};
use crate::game::view::WorldView;
use crate::util::bounds::BoundingBox;
use crate::util::vec2::Vec2;

/// What happened during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    /// Simulation time at the start of the tick
    pub time: f32,
    pub shots_fired: u32,
    pub breach_shots: u32,
    pub hits: u32,
    pub kills: u32,
    pub obstacles_destroyed: u32,
    pub obstacles_respawned: u32,
    pub pickups_spawned: u32,
    pub pickups_collected: u32,
    pub respawns: u32,
    pub nav_rebuilt: bool,
    pub live_agents: usize,
}

/// Where and as what a slot's agent (re)spawns
#[derive(Debug, Clone)]
struct SpawnSlot {
    id: AgentId,
    position: Vec2,
    profile: AgentProfile,
}

#[derive(Debug, Clone)]
struct DestroyedObstacle {
    obstacle: Obstacle,
    respawn_at: f32,
}

pub struct Simulation {
    config: AiConfig,
    world: WorldSnapshot,
    index: SpatialHash,
    nav: NavigationGrid,
    nav_dirty: bool,
    ai: AiManager,
    roster: RespawnRoster,
    slots: Vec<SpawnSlot>,
    destroyed: Vec<DestroyedObstacle>,
    rng: StdRng,
    next_entity_id: EntityId,
    tick: u64,
    last_pickup_spawn: f32,
    kills: HashMap<Team, u32>,
}

impl Simulation {
    /// Empty world sized by `config`
    pub fn new(config: AiConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            world: WorldSnapshot::new(config.world_width, config.world_height),
            index: SpatialHash::new(config.spatial_cell_size),
            nav: NavigationGrid::new(config.world_width, config.world_height, config.nav_cell_size),
            nav_dirty: true,
            ai: AiManager::new(),
            roster: RespawnRoster::default(),
            slots: Vec::new(),
            destroyed: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            next_entity_id: 1,
            tick: 0,
            last_pickup_spawn: 0.0,
            kills: HashMap::new(),
            config,
        })
    }

    /// Fixed 5v5 map: Red behind U-shaped cover top-left, Blue mirrored bottom-right
    pub fn team_skirmish(config: AiConfig, seed: u64) -> Result<Self, ConfigError> {
        let mut sim = Self::new(config, seed)?;
        let (w, h) = (sim.world.bounds.width, sim.world.bounds.height);

        let red_base = Vec2::new(100.0, 100.0);
        let blue_base = Vec2::new(w - 200.0, h - 200.0);

        // Blue cover, open toward the right edge
        sim.add_obstacle(BoundingBox::new(blue_base.x - 300.0, blue_base.y - 200.0, 400.0, 50.0));
        sim.add_obstacle(BoundingBox::new(blue_base.x - 300.0, blue_base.y - 200.0, 50.0, 400.0));
        sim.add_obstacle(BoundingBox::new(blue_base.x - 300.0, blue_base.y + 150.0, 400.0, 50.0));

        // Midfield
        sim.add_obstacle(BoundingBox::new(w / 2.0 - 100.0, h / 2.0 - 100.0, 200.0, 200.0));
        sim.add_obstacle(BoundingBox::new(w / 2.0 - 400.0, h / 2.0 + 200.0, 100.0, 100.0));
        sim.add_obstacle(BoundingBox::new(w / 2.0 + 300.0, h / 2.0 - 300.0, 100.0, 100.0));

        // Red cover, open toward the left edge
        sim.add_obstacle(BoundingBox::new(red_base.x + 100.0, red_base.y + 300.0, 400.0, 50.0));
        sim.add_obstacle(BoundingBox::new(red_base.x + 450.0, red_base.y + 100.0, 50.0, 400.0));
        sim.add_obstacle(BoundingBox::new(red_base.x + 100.0, red_base.y - 100.0, 400.0, 50.0));

        for i in 0..5 {
            let weapon = WeaponKind::ALL[i % WeaponKind::ALL.len()];
            let row = i as f32 * 55.0;
            sim.add_agent(
                AgentProfile::squad(Team::Red, blue_base),
                Vec2::new(red_base.x + 50.0, red_base.y + 20.0 + row),
                weapon,
            );
            sim.add_agent(
                AgentProfile::squad(Team::Blue, red_base),
                Vec2::new(blue_base.x + 50.0, blue_base.y - 120.0 + row),
                weapon,
            );
        }

        info!(
            agents = sim.world.agents.len(),
            obstacles = sim.world.obstacles.len(),
            "team skirmish ready"
        );
        Ok(sim)
    }

    /// Scattered cover, a duelist in the middle and `roamers` hostile roamers around it
    pub fn survival(config: AiConfig, seed: u64, roamers: usize) -> Result<Self, ConfigError> {
        let mut sim = Self::new(config, seed)?;
        let (w, h) = (sim.world.bounds.width, sim.world.bounds.height);
        let center = Vec2::new(w / 2.0, h / 2.0);

        for _ in 0..20 {
            let size = Vec2::new(sim.rng.gen_range(50.0..=200.0), sim.rng.gen_range(50.0..=200.0));
            let x = sim.rng.gen_range(0.0..=(w - size.x).max(0.0));
            let y = sim.rng.gen_range(0.0..=(h - size.y).max(0.0));
            let bounds = BoundingBox::new(x, y, size.x, size.y);
            // Keep the middle clear for the duelist
            if bounds.inflate(300.0).contains_point(center) {
                continue;
            }
            sim.add_obstacle(bounds);
        }

        sim.add_agent(AgentProfile::duelist(Team::Red), center, WeaponKind::Rifle);

        for i in 0..roamers {
            let position = sim
                .random_open_position(agent::HALF_SIZE, |p| p.distance_to(center) > 600.0)
                .unwrap_or(Vec2::new(agent::HALF_SIZE, agent::HALF_SIZE));
            let weapon = WeaponKind::ALL[i % WeaponKind::ALL.len()];
            sim.add_agent(AgentProfile::roamer(Team::Blue), position, weapon);
        }

        info!(
            agents = sim.world.agents.len(),
            obstacles = sim.world.obstacles.len(),
            "survival arena ready"
        );
        Ok(sim)
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    pub fn world(&self) -> &WorldSnapshot {
        &self.world
    }

    pub fn ai(&self) -> &AiManager {
        &self.ai
    }

    pub fn roster(&self) -> &RespawnRoster {
        &self.roster
    }

    pub fn navigation(&self) -> &NavigationGrid {
        &self.nav
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn kills(&self, team: Team) -> u32 {
        self.kills.get(&team).copied().unwrap_or(0)
    }

    fn next_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    pub fn add_obstacle(&mut self, bounds: BoundingBox) -> EntityId {
        let id = self.next_id();
        self.world.obstacles.push(Obstacle::new(id, bounds));
        self.nav_dirty = true;
        id
    }

    pub fn add_pickup(&mut self, position: Vec2, kind: UpgradeKind) -> EntityId {
        let id = self.next_id();
        self.world.pickups.push(Pickup {
            id,
            position,
            kind,
            spawned_at: self.world.time,
        });
        id
    }

    /// Add an agent in a new respawn slot
    pub fn add_agent(&mut self, profile: AgentProfile, position: Vec2, weapon: WeaponKind) -> AgentId {
        // Seeded ids keep runs reproducible
        let id = uuid::Builder::from_random_bytes(self.rng.gen()).into_uuid();
        let slot = self.slots.len();

        let mut body = AgentBody::new(id, slot, profile.team, position);
        body.half_size = profile.half_size;
        body.weapon = weapon;
        self.world.agents.push(body);

        self.roster.store(slot, SlotRecord::default());
        let behavior = AgentBehavior::spawn(
            id,
            profile.clone(),
            self.roster.record(slot),
            self.world.time,
            &mut self.rng,
        );
        self.ai.register(behavior);
        self.slots.push(SpawnSlot {
            id,
            position,
            profile,
        });
        id
    }

    /// Advance one tick
    pub fn step(&mut self) -> TickReport {
        let dt = self.config.tick_dt();
        let now = self.world.time;
        let mut report = TickReport {
            tick: self.tick,
            time: now,
            ..Default::default()
        };

        self.index.rebuild(&self.world);
        if self.nav_dirty {
            self.nav.build(self.world.obstacles.iter().map(|o| &o.bounds));
            self.nav_dirty = false;
            report.nav_rebuilt = true;
            debug!(
                blocked = self.nav.blocked_count(),
                obstacles = self.world.obstacles.len(),
                "navigation grid rebuilt"
            );
        }

        let mut shots: Vec<(usize, FireCommand)> = Vec::new();
        for i in 0..self.world.agents.len() {
            if !self.world.agents[i].alive {
                continue;
            }
            let body = self.world.agents[i].clone();
            let view = WorldView::new(&self.world, &self.index, &self.nav);
            let Some(command) = self.ai.decide(&body, &view, &self.config, &mut self.rng, dt) else {
                continue;
            };
            let position = resolve_movement(&view, &body, command.velocity * dt);

            let agent = &mut self.world.agents[i];
            agent.position = position;
            agent.velocity = command.velocity;
            if let Some(fire) = command.fire {
                shots.push((i, fire));
            }
        }

        for (shooter, fire) in shots {
            self.spawn_shot(shooter, fire, &mut report);
        }

        let killed = self.advance_projectiles(dt, &mut report);
        self.collapse_destroyed_obstacles(now, &mut report);

        for (victim, killer_team) in killed {
            let (id, slot) = {
                let body = &self.world.agents[victim];
                (body.id, body.slot)
            };
            if let Some(record) = self.ai.unregister(id) {
                self.roster.store(slot, record);
            }
            self.roster.schedule(slot, now + arena::AGENT_RESPAWN_DELAY);
            *self.kills.entry(killer_team).or_default() += 1;
            report.kills += 1;
            debug!(agent = %id, slot, "agent down");
        }

        self.update_pickups(now, &mut report);

        for slot in self.roster.take_due(now) {
            if self.respawn(slot, now) {
                report.respawns += 1;
            }
        }
        self.restore_obstacles(now, &mut report);

        self.world.time = now + dt;
        self.tick += 1;
        report.live_agents = self.world.live_agents().count();
        report
    }

    fn spawn_shot(&mut self, shooter: usize, fire: FireCommand, report: &mut TickReport) {
        let (origin, team, owner) = {
            let body = &self.world.agents[shooter];
            (body.position, body.team, body.id)
        };
        let Some(direction) = (fire.aim - origin).try_normalize() else {
            return;
        };

        let stats = fire.weapon.stats();
        let (pellets, spread) = match fire.kind {
            ProjectileKind::Breach => (1, 0.0),
            _ => (stats.pellets, stats.spread),
        };

        for _ in 0..pellets {
            let heading = if spread > 0.0 {
                direction.rotate(self.rng.gen_range(-spread..=spread).to_radians())
            } else {
                direction
            };
            let id = self.next_id();
            self.world.projectiles.push(Projectile {
                id,
                owner,
                team,
                kind: fire.kind,
                position: origin,
                velocity: heading * stats.speed,
                damage: stats.damage,
                lifetime: stats.lifetime,
            });
        }

        report.shots_fired += 1;
        if fire.kind == ProjectileKind::Breach {
            report.breach_shots += 1;
        }
    }

    /// Move projectiles and resolve hits; returns (victim index, killer team) per kill
    fn advance_projectiles(&mut self, dt: f32, report: &mut TickReport) -> Vec<(usize, Team)> {
        let mut killed = Vec::new();
        let bounds = self.world.bounds;
        let index = &self.index;
        let world = &mut self.world;
        let obstacles = &mut world.obstacles;
        let agents = &mut world.agents;

        world.projectiles.retain_mut(|p| {
            p.position += p.velocity * dt;
            p.lifetime -= dt;
            if p.lifetime <= 0.0 || !bounds.contains_point(p.position) {
                return false;
            }
            let hitbox = p.bounds();

            // Grenades fly over cover
            if p.kind != ProjectileKind::Grenade {
                let struck = index
                    .query_region(&hitbox)
                    .into_iter()
                    .filter_map(|id| match id {
                        SpatialEntityId::Obstacle(i) => Some(i),
                        _ => None,
                    })
                    .filter(|&i| {
                        obstacles
                            .get(i)
                            .is_some_and(|o| o.hp > 0.0 && o.bounds.intersects(&hitbox))
                    })
                    .min();
                if let Some(i) = struck {
                    if p.kind == ProjectileKind::Breach {
                        obstacles[i].hp -= p.damage;
                    }
                    return false;
                }
            }

            if p.kind == ProjectileKind::Breach {
                return true;
            }

            let victim = agents
                .iter_mut()
                .enumerate()
                .find(|(_, a)| a.alive && a.team != p.team && a.bounds().intersects(&hitbox));
            if let Some((i, victim)) = victim {
                victim.health -= p.damage;
                report.hits += 1;
                if victim.health <= 0.0 {
                    victim.alive = false;
                    victim.velocity = Vec2::ZERO;
                    killed.push((i, p.team));
                }
                return false;
            }
            true
        });

        killed
    }

    fn collapse_destroyed_obstacles(&mut self, now: f32, report: &mut TickReport) {
        if self.world.obstacles.iter().all(|o| o.hp > 0.0) {
            return;
        }
        let (standing, fallen): (Vec<Obstacle>, Vec<Obstacle>) =
            std::mem::take(&mut self.world.obstacles)
                .into_iter()
                .partition(|o| o.hp > 0.0);
        self.world.obstacles = standing;

        for obstacle in fallen {
            debug!(obstacle = obstacle.id, "obstacle destroyed");
            self.destroyed.push(DestroyedObstacle {
                obstacle,
                respawn_at: now + arena::OBSTACLE_RESPAWN_DELAY,
            });
            report.obstacles_destroyed += 1;
        }
        self.nav_dirty = true;
    }

    /// Cover comes back once its timer runs out and nobody is standing in it
    fn restore_obstacles(&mut self, now: f32, report: &mut TickReport) {
        let agents = &self.world.agents;
        let mut restored = Vec::new();
        self.destroyed.retain(|d| {
            if d.respawn_at > now
                || agents
                    .iter()
                    .any(|a| a.alive && a.bounds().intersects(&d.obstacle.bounds))
            {
                return true;
            }
            restored.push(d.obstacle.clone());
            false
        });

        for mut obstacle in restored {
            debug!(obstacle = obstacle.id, "obstacle restored");
            obstacle.hp = arena::OBSTACLE_HP;
            self.world.obstacles.push(obstacle);
            self.nav_dirty = true;
            report.obstacles_respawned += 1;
        }
    }

    fn update_pickups(&mut self, now: f32, report: &mut TickReport) {
        let agents = &self.world.agents;
        let mut collected: Vec<(usize, UpgradeKind)> = Vec::new();
        self.world.pickups.retain(|p| {
            if p.is_expired(now) {
                return false;
            }
            let bounds = p.bounds();
            match agents
                .iter()
                .position(|a| a.alive && a.bounds().intersects(&bounds))
            {
                Some(i) => {
                    collected.push((i, p.kind));
                    false
                }
                None => true,
            }
        });

        for (i, kind) in collected {
            let agent = &mut self.world.agents[i];
            if kind == UpgradeKind::Health {
                agent.health = SlotRecord::restored_health(agent.health);
            }
            self.ai.apply_upgrade(agent.id, kind);
            report.pickups_collected += 1;
        }

        let pickups = &self.world.pickups;
        self.ai
            .release_missing_claims(|id| pickups.iter().any(|p| p.id == id));

        if now - self.last_pickup_spawn >= arena::PICKUP_SPAWN_INTERVAL {
            self.last_pickup_spawn = now;
            let half = arena::PICKUP_SIZE * 0.5;
            if let Some(position) = self.random_open_position(half, |_| true) {
                let kind = if self.rng.gen_bool(0.5) {
                    UpgradeKind::FireRate
                } else {
                    UpgradeKind::Health
                };
                self.add_pickup(position, kind);
                report.pickups_spawned += 1;
            }
        }
    }

    /// Random point whose `half`-sized box is inside the world and clear of cover
    fn random_open_position(&mut self, half: f32, accept: impl Fn(Vec2) -> bool) -> Option<Vec2> {
        let (w, h) = (self.world.bounds.width, self.world.bounds.height);
        if w <= half * 2.0 || h <= half * 2.0 {
            return None;
        }
        for _ in 0..arena::PICKUP_PLACEMENT_ATTEMPTS {
            let position = Vec2::new(
                self.rng.gen_range(half..w - half),
                self.rng.gen_range(half..h - half),
            );
            let footprint = BoundingBox::from_center(position, half, half);
            if accept(position) && !self.world.obstacles.iter().any(|o| o.bounds.intersects(&footprint)) {
                return Some(position);
            }
        }
        None
    }

    fn respawn(&mut self, slot: usize, now: f32) -> bool {
        let Some(spawn) = self.slots.get(slot) else {
            return false;
        };
        let Some(body) = self.world.agents.iter_mut().find(|a| a.slot == slot) else {
            return false;
        };

        body.position = spawn.position;
        body.velocity = Vec2::ZERO;
        body.health = agent::MAX_HEALTH;
        body.alive = true;

        let behavior = AgentBehavior::spawn(
            spawn.id,
            spawn.profile.clone(),
            self.roster.record(slot),
            now,
            &mut self.rng,
        );
        self.ai.register(behavior);
        debug!(agent = %spawn.id, slot, "agent respawned");
        true
    }
}

/// Integrate `delta` one axis at a time, stopping flush against cover and inside the world
fn resolve_movement(view: &WorldView, body: &AgentBody, delta: Vec2) -> Vec2 {
    let start = body.position;
    let half = body.half_size;
    if delta.is_zero(f32::EPSILON) {
        return view.world.bounds.clamp_center(start, half, half);
    }

    let reach = body.bounds().inflate(delta.length());
    let blockers: Vec<BoundingBox> = view.obstacles_in(&reach).map(|o| o.bounds).collect();

    let mut position = start;

    position.x += delta.x;
    let footprint = body.bounds_at(position);
    for b in blockers.iter().filter(|b| b.intersects(&footprint)) {
        if delta.x > 0.0 {
            position.x = position.x.min(b.left() - half);
        } else if delta.x < 0.0 {
            position.x = position.x.max(b.right() + half);
        }
    }

    position.y += delta.y;
    let footprint = body.bounds_at(position);
    for b in blockers.iter().filter(|b| b.intersects(&footprint)) {
        if delta.y > 0.0 {
            position.y = position.y.min(b.top() - half);
        } else if delta.y < 0.0 {
            position.y = position.y.max(b.bottom() + half);
        }
    }

    view.world.bounds.clamp_center(position, half, half)
}
