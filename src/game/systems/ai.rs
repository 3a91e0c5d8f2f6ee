use std::collections::HashMap;

use rand::Rng;
use tracing::{debug, trace};

use crate::config::AiConfig;
use crate::game::constants::agent::*;
use crate::game::constants::aim::{FIRE_RANGE, MIN_FIRE_INTERVAL};
use crate::game::constants::evasion::DODGE_DURATION;
use crate::game::constants::nav::ARRIVAL_RADIUS;
use crate::game::navigation::Path;
use crate::game::respawn::SlotRecord;
use crate::game::state::{AgentBody, AgentId, EntityId, ProjectileKind, Team, UpgradeKind, WeaponKind};
use crate::game::systems::evasion::{choose_dodge_direction, dodge_speed_multiplier};
use crate::game::systems::targeting::{apply_jitter, has_line_of_sight, jitter_radius, lead_target};
use crate::game::systems::threat::ThreatDetector;
use crate::game::view::WorldView;
use crate::util::vec2::Vec2;

/// AI behavior mode (dodging is an overlay, not a mode)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    /// Post-spawn dispersal toward a random point around the objective
    Flank,
    /// Heading for an unclaimed pickup
    SeekPickup,
    /// Isolated; moving toward the nearest ally
    Regroup,
    /// Default: nearest hostile, else the objective
    Engage,
    /// Blocked for too long; breaching toward the target
    StuckRecovery,
}

/// Opening flank phase parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlankPolicy {
    pub min_duration: f32,
    pub max_duration: f32,
    /// Distance range of the flank point from the objective
    pub min_radius: f32,
    pub max_radius: f32,
}

impl Default for FlankPolicy {
    fn default() -> Self {
        Self {
            min_duration: FLANK_MIN_DURATION,
            max_duration: FLANK_MAX_DURATION,
            min_radius: FLANK_MIN_RADIUS,
            max_radius: FLANK_MAX_RADIUS,
        }
    }
}

/// Capabilities of one kind of agent
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    pub team: Team,
    pub speed: f32,
    pub half_size: f32,
    /// Opening flank phase, if this kind disperses after spawning
    pub flank: Option<FlankPolicy>,
    /// Moves toward allies when isolated
    pub regroup: bool,
    pub seeks_pickups: bool,
    /// Point to advance on when no hostile is alive
    pub objective: Option<Vec2>,
}

impl AgentProfile {
    /// Lone survival-wave enemy
    pub fn roamer(team: Team) -> Self {
        Self {
            team,
            speed: SPEED,
            half_size: HALF_SIZE,
            flank: None,
            regroup: false,
            seeks_pickups: true,
            objective: None,
        }
    }

    /// Team-mode unit that flanks the objective and sticks with its squad
    pub fn squad(team: Team, objective: Vec2) -> Self {
        Self {
            team,
            speed: SPEED,
            half_size: HALF_SIZE,
            flank: Some(FlankPolicy::default()),
            regroup: true,
            seeks_pickups: true,
            objective: Some(objective),
        }
    }

    /// Stand-in opponent that only fights
    pub fn duelist(team: Team) -> Self {
        Self {
            team,
            speed: SPEED,
            half_size: HALF_SIZE,
            flank: None,
            regroup: false,
            seeks_pickups: false,
            objective: None,
        }
    }
}

/// Live dodge overriding movement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DodgeState {
    pub direction: Vec2,
    pub started_at: f32,
    pub duration: f32,
    pub speed_multiplier: f32,
}

impl DodgeState {
    pub fn is_active(&self, now: f32) -> bool {
        now - self.started_at < self.duration
    }
}

/// Shot requested this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireCommand {
    pub aim: Vec2,
    pub weapon: WeaponKind,
    pub kind: ProjectileKind,
}

/// Per-tick output of one agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentCommand {
    pub velocity: Vec2,
    pub fire: Option<FireCommand>,
}

impl AgentCommand {
    pub fn idle() -> Self {
        Self {
            velocity: Vec2::ZERO,
            fire: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FlankPhase {
    point: Vec2,
    until: f32,
}

#[derive(Debug, Clone, Copy)]
struct Repulsion {
    origin: Vec2,
    until: f32,
}

/// Decision state of one agent
#[derive(Debug, Clone)]
pub struct AgentBehavior {
    id: AgentId,
    profile: AgentProfile,
    record: SlotRecord,
    mode: AgentMode,
    path: Path,
    dodge: Option<DodgeState>,
    flank: Option<FlankPhase>,
    /// Current movement target
    target: Option<Vec2>,
    claimed_pickup: Option<EntityId>,
    /// Whether the last tick asked to move (an idle agent is never stuck)
    moving: bool,
    last_checked_position: Option<Vec2>,
    last_progress_at: f32,
    repulsion: Option<Repulsion>,
    breach_shots: u32,
    next_fire_at: f32,
    /// Last seen position of the tracked hostile, for lead estimation
    tracked: Option<(AgentId, Vec2)>,
}

impl AgentBehavior {
    pub fn spawn<R: Rng>(
        id: AgentId,
        profile: AgentProfile,
        record: SlotRecord,
        now: f32,
        rng: &mut R,
    ) -> Self {
        let flank = match (profile.flank, profile.objective) {
            (Some(policy), Some(objective)) => {
                let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                let radius = rng.gen_range(policy.min_radius..=policy.max_radius);
                let duration = rng.gen_range(policy.min_duration..=policy.max_duration);
                Some(FlankPhase {
                    point: objective + Vec2::from_angle(angle) * radius,
                    until: now + duration,
                })
            }
            _ => None,
        };

        Self {
            id,
            mode: if flank.is_some() {
                AgentMode::Flank
            } else {
                AgentMode::Engage
            },
            profile,
            record,
            path: Path::none(),
            dodge: None,
            flank,
            target: None,
            claimed_pickup: None,
            moving: false,
            last_checked_position: None,
            last_progress_at: now,
            repulsion: None,
            breach_shots: 0,
            next_fire_at: now,
            tracked: None,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn mode(&self) -> AgentMode {
        self.mode
    }

    pub fn record(&self) -> SlotRecord {
        self.record
    }

    pub fn dodge(&self) -> Option<&DodgeState> {
        self.dodge.as_ref()
    }

    pub fn target(&self) -> Option<Vec2> {
        self.target
    }

    pub fn claimed_pickup(&self) -> Option<EntityId> {
        self.claimed_pickup
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn apply_upgrade(&mut self, kind: UpgradeKind) {
        self.record.apply(kind);
    }

    /// Effective cooldown after the slot's fire-rate bonus
    pub fn fire_interval(&self, config: &AiConfig, weapon: WeaponKind) -> f32 {
        (config.fire_interval(weapon) - self.record.fire_rate_bonus).max(MIN_FIRE_INTERVAL)
    }

    /// Decide this tick's velocity and shot
    ///
    /// `claims` maps pickups to the agent that claimed them; pickups claimed by
    /// another agent are ignored.
    pub fn decide<R: Rng>(
        &mut self,
        body: &AgentBody,
        view: &WorldView,
        config: &AiConfig,
        claims: &HashMap<EntityId, AgentId>,
        rng: &mut R,
        dt: f32,
    ) -> AgentCommand {
        let now = view.world.time;
        self.update_progress(body, now);

        let active_dodge = self.dodge.filter(|d| d.is_active(now));
        if active_dodge.is_none() {
            self.dodge = None;
        }

        let velocity = match active_dodge {
            Some(dodge) => dodge.direction * self.profile.speed * dodge.speed_multiplier,
            None => match self.try_dodge(body, view, config, rng, now) {
                Some(velocity) => velocity,
                None => self.steer(body, view, config, claims, now) * self.profile.speed,
            },
        };

        let fire = self.fire(body, view, config, rng, now, dt);

        AgentCommand { velocity, fire }
    }

    fn set_mode(&mut self, mode: AgentMode) {
        let mode = if self.breach_shots > 0 {
            AgentMode::StuckRecovery
        } else {
            mode
        };
        if mode != self.mode {
            trace!(agent = %self.id, from = ?self.mode, to = ?mode, "mode change");
            self.mode = mode;
        }
    }

    /// Stuck detection: no meaningful movement for too long triggers recovery
    fn update_progress(&mut self, body: &AgentBody, now: f32) {
        if self.repulsion.is_some_and(|r| now >= r.until) {
            self.repulsion = None;
        }

        let advanced = match self.last_checked_position {
            Some(last) => body.position.distance_to(last) >= STUCK_MOVE_THRESHOLD,
            None => true,
        };
        if advanced || !self.moving {
            self.last_checked_position = Some(body.position);
            self.last_progress_at = now;
            return;
        }

        if now - self.last_progress_at >= STUCK_TIMEOUT {
            debug!(agent = %self.id, x = body.position.x, y = body.position.y, "stuck, breaching toward target");
            self.breach_shots = BREACH_BURST;
            self.repulsion = Some(Repulsion {
                origin: body.position,
                until: now + REPULSION_WINDOW,
            });
            self.last_progress_at = now;
            self.set_mode(AgentMode::StuckRecovery);
        }
    }

    fn try_dodge<R: Rng>(
        &mut self,
        body: &AgentBody,
        view: &WorldView,
        config: &AiConfig,
        rng: &mut R,
        now: f32,
    ) -> Option<Vec2> {
        let threats = ThreatDetector::new(config.threat_detection_radius).detect(view, body);
        let primary = threats.first()?;
        if !rng.gen_bool(config.dodge_difficulty.dodge_chance()) {
            return None;
        }

        let focus = self.profile.objective.or(self.target);
        let direction = choose_dodge_direction(view, body, focus, &threats, rng)?;
        let speed_multiplier = dodge_speed_multiplier(primary.time_to_impact);
        trace!(
            agent = %self.id,
            projectile = primary.projectile,
            tti = primary.time_to_impact,
            "dodge"
        );
        self.dodge = Some(DodgeState {
            direction,
            started_at: now,
            duration: DODGE_DURATION,
            speed_multiplier,
        });
        Some(direction * self.profile.speed * speed_multiplier)
    }

    /// Unit heading toward the resolved target, or zero when already there
    fn steer(
        &mut self,
        body: &AgentBody,
        view: &WorldView,
        config: &AiConfig,
        claims: &HashMap<EntityId, AgentId>,
        now: f32,
    ) -> Vec2 {
        let target = self.resolve_target(body, view, config, claims, now);
        self.target = Some(target);

        let to_target = target - body.position;
        if to_target.length_sq() <= ARRIVAL_RADIUS * ARRIVAL_RADIUS {
            self.moving = false;
            return Vec2::ZERO;
        }
        self.moving = true;

        if self.path.is_stale(target, now) {
            self.path = Path::new(view.nav.find_path(body.position, target), target, now);
        }

        // Empty or exhausted path: straight line
        let heading = match self.path.next_waypoint(body.position) {
            Some(waypoint) => (waypoint - body.position).normalize(),
            None => to_target.normalize(),
        };

        self.repel(heading, body.position)
    }

    /// Target priority: pickup, then regroup, then flank point, then hostile or objective
    fn resolve_target(
        &mut self,
        body: &AgentBody,
        view: &WorldView,
        config: &AiConfig,
        claims: &HashMap<EntityId, AgentId>,
        now: f32,
    ) -> Vec2 {
        let position = body.position;

        if self.profile.seeks_pickups {
            let pickup = view
                .pickups_near(position, config.pickup_detection_radius)
                .filter(|p| claims.get(&p.id).map_or(true, |&owner| owner == self.id))
                .min_by(|a, b| {
                    a.position
                        .distance_sq_to(position)
                        .total_cmp(&b.position.distance_sq_to(position))
                });
            if let Some(pickup) = pickup {
                if self.claimed_pickup != Some(pickup.id) {
                    trace!(agent = %self.id, pickup = pickup.id, "claiming pickup");
                }
                self.claimed_pickup = Some(pickup.id);
                self.set_mode(AgentMode::SeekPickup);
                return pickup.position;
            }
        }
        self.claimed_pickup = None;

        if self.profile.regroup {
            let team = self.profile.team;
            let isolated = !view
                .agents_near(position, config.regroup_radius)
                .any(|a| a.team == team && a.id != self.id);
            if isolated {
                let ally = nearest_to(
                    position,
                    view.world
                        .live_agents()
                        .filter(|a| a.team == team && a.id != self.id),
                );
                if let Some(ally) = ally {
                    if self.mode != AgentMode::Regroup {
                        debug!(agent = %self.id, "isolated, regrouping");
                    }
                    self.set_mode(AgentMode::Regroup);
                    return ally.position;
                }
            }
        }

        if let Some(flank) = self.flank {
            if now < flank.until {
                self.set_mode(AgentMode::Flank);
                let half = self.profile.half_size;
                return view.world.bounds.clamp_center(flank.point, half, half);
            }
            debug!(agent = %self.id, "flank phase over");
            self.flank = None;
        }

        self.set_mode(AgentMode::Engage);
        match nearest_hostile(view, body, f32::INFINITY) {
            Some(enemy) => enemy.position,
            None => self.profile.objective.unwrap_or(position),
        }
    }

    /// Push away from the last stuck position while the repulsion window is open
    fn repel(&self, heading: Vec2, position: Vec2) -> Vec2 {
        let Some(repulsion) = self.repulsion else {
            return heading;
        };
        let away = position - repulsion.origin;
        let distance = away.length();
        if distance >= REPULSION_RADIUS {
            return heading;
        }

        // Still on the stuck spot: slide sideways
        let push = away.try_normalize().unwrap_or_else(|| heading.perpendicular());
        let strength = REPULSION_WEIGHT * (1.0 - distance / REPULSION_RADIUS);
        (heading + push * strength).try_normalize().unwrap_or(heading)
    }

    fn fire<R: Rng>(
        &mut self,
        body: &AgentBody,
        view: &WorldView,
        config: &AiConfig,
        rng: &mut R,
        now: f32,
        dt: f32,
    ) -> Option<FireCommand> {
        // Tracking runs every tick so the lead always spans exactly one tick
        let enemy = nearest_hostile(view, body, FIRE_RANGE);
        let enemy_velocity = match (enemy, self.tracked) {
            (Some(enemy), Some((id, last))) if id == enemy.id && dt > 0.0 => {
                (enemy.position - last) * (1.0 / dt)
            }
            _ => Vec2::ZERO,
        };
        self.tracked = enemy.map(|e| (e.id, e.position));

        // Breach burst ignores cooldown and line of sight
        if self.breach_shots > 0 {
            match self.target {
                Some(target) => {
                    self.breach_shots -= 1;
                    return Some(FireCommand {
                        aim: target,
                        weapon: body.weapon,
                        kind: ProjectileKind::Breach,
                    });
                }
                None => self.breach_shots = 0,
            }
        }

        let enemy = enemy?;

        if now < self.next_fire_at {
            return None;
        }

        let stats = body.weapon.stats();
        let lead = lead_target(body.position, enemy.position, enemy_velocity, stats.speed);
        let distance = body.position.distance_to(enemy.position);
        let spread = jitter_radius(config.aim_difficulty.aim_jitter_scale(), distance);
        let aim = apply_jitter(lead, spread, rng);

        if !stats.passes_cover && !has_line_of_sight(view, body.position, aim) {
            return None;
        }

        self.next_fire_at = now + self.fire_interval(config, body.weapon);
        Some(FireCommand {
            aim,
            weapon: body.weapon,
            kind: if body.weapon == WeaponKind::Grenade {
                ProjectileKind::Grenade
            } else {
                ProjectileKind::Bullet
            },
        })
    }
}

/// Nearest live agent of another team within `range`
fn nearest_hostile<'a>(view: &WorldView<'a>, body: &AgentBody, range: f32) -> Option<&'a AgentBody> {
    let team = body.team;
    if range.is_finite() {
        nearest_to(body.position, view.agents_near(body.position, range).filter(|a| a.team != team))
    } else {
        nearest_to(body.position, view.world.live_agents().filter(|a| a.team != team))
    }
}

fn nearest_to<'a>(position: Vec2, agents: impl Iterator<Item = &'a AgentBody>) -> Option<&'a AgentBody> {
    agents.min_by(|a, b| {
        a.position
            .distance_sq_to(position)
            .total_cmp(&b.position.distance_sq_to(position))
    })
}

/// AI manager for all agents
pub struct AiManager {
    behaviors: HashMap<AgentId, AgentBehavior>,
    /// Pickup id -> claiming agent
    claims: HashMap<EntityId, AgentId>,
}

impl AiManager {
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            claims: HashMap::new(),
        }
    }

    pub fn register(&mut self, behavior: AgentBehavior) {
        self.behaviors.insert(behavior.id(), behavior);
    }

    /// Remove an agent, releasing its claims and returning its slot record
    pub fn unregister(&mut self, id: AgentId) -> Option<SlotRecord> {
        self.claims.retain(|_, owner| *owner != id);
        self.behaviors.remove(&id).map(|b| b.record())
    }

    pub fn get(&self, id: AgentId) -> Option<&AgentBehavior> {
        self.behaviors.get(&id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut AgentBehavior> {
        self.behaviors.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    pub fn claim_of(&self, pickup: EntityId) -> Option<AgentId> {
        self.claims.get(&pickup).copied()
    }

    /// Drop claims on pickups that no longer exist
    pub fn release_missing_claims(&mut self, pickup_exists: impl Fn(EntityId) -> bool) {
        self.claims.retain(|&pickup, _| pickup_exists(pickup));
    }

    pub fn apply_upgrade(&mut self, id: AgentId, kind: UpgradeKind) {
        if let Some(behavior) = self.behaviors.get_mut(&id) {
            behavior.apply_upgrade(kind);
        }
    }

    /// Run one agent's decision and update pickup claims
    pub fn decide<R: Rng>(
        &mut self,
        body: &AgentBody,
        view: &WorldView,
        config: &AiConfig,
        rng: &mut R,
        dt: f32,
    ) -> Option<AgentCommand> {
        let behavior = self.behaviors.get_mut(&body.id)?;
        let command = behavior.decide(body, view, config, &self.claims, rng, dt);
        let claimed = behavior.claimed_pickup();

        self.claims.retain(|_, owner| *owner != body.id);
        if let Some(pickup) = claimed {
            self.claims.insert(pickup, body.id);
        }
        Some(command)
    }
}

impl Default for AiManager {
    fn default() -> Self {
        Self::new()
    }
}
