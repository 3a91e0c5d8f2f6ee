/// Simulation timing
pub mod sim {
    /// Default tick rate in Hz
    pub const TICK_RATE: u32 = 60;
}

/// World/arena defaults (original map size)
pub mod arena {
    pub const WORLD_WIDTH: f32 = 3200.0;
    pub const WORLD_HEIGHT: f32 = 1800.0;
    /// Obstacle hit points
    pub const OBSTACLE_HP: f32 = 10.0;
    /// Delay before a destroyed obstacle reappears (seconds)
    pub const OBSTACLE_RESPAWN_DELAY: f32 = 10.0;
    /// Delay before a dead agent respawns (seconds)
    pub const AGENT_RESPAWN_DELAY: f32 = 5.0;
    /// Pickup size (square side)
    pub const PICKUP_SIZE: f32 = 30.0;
    /// Projectile size (square side)
    pub const PROJECTILE_SIZE: f32 = 10.0;
    /// A new pickup appears this often (seconds)
    pub const PICKUP_SPAWN_INTERVAL: f32 = 5.0;
    /// Uncollected pickups vanish after this long (seconds)
    pub const PICKUP_LIFETIME: f32 = 15.0;
    /// Random placement attempts before a pickup spawn is skipped
    pub const PICKUP_PLACEMENT_ATTEMPTS: u32 = 100;
}

/// Broadphase index
pub mod spatial {
    /// Default spatial hash cell size (world units)
    pub const CELL_SIZE: f32 = 100.0;
    /// Initial capacity for the cell map (number of expected non-empty cells)
    pub const INITIAL_CELL_CAPACITY: usize = 512;
}

/// Navigation grid and path following
pub mod nav {
    /// Default navigation cell size (coarser than agents, finer than the spatial hash)
    pub const CELL_SIZE: f32 = 40.0;
    /// Orthogonal step cost
    pub const STRAIGHT_COST: f32 = 1.0;
    /// Diagonal step cost (sqrt(2) approximation)
    pub const DIAGONAL_COST: f32 = 1.4;
    /// Recompute the path once the target drifts this far from where it was planned
    pub const DRIFT_THRESHOLD: f32 = 100.0;
    /// Recompute the path at least this often (seconds)
    pub const RECOMPUTE_INTERVAL: f32 = 1.0;
    /// Waypoint counts as reached inside this radius
    pub const ARRIVAL_RADIUS: f32 = 20.0;
}

/// Incoming-projectile detection
pub mod threat {
    /// Default scan radius around the agent
    pub const DETECTION_RADIUS: f32 = 400.0;
    /// Minimum cosine between projectile heading and projectile->agent direction
    pub const ALIGNMENT_THRESHOLD: f32 = 0.5;
    /// Maximum perpendicular miss distance that still counts as a hit course
    pub const DANGER_RADIUS: f32 = 45.0;
    /// Score weight of distance (normalized by detection radius)
    pub const DISTANCE_WEIGHT: f32 = 0.5;
    /// Score weight of miss distance (normalized by danger radius)
    pub const MISS_WEIGHT: f32 = 0.25;
    /// Projectiles slower than this are treated as stationary
    pub const MIN_SPEED: f32 = 1.0;
}

/// Dodge direction selection
pub mod evasion {
    /// Time-to-impact below which a threat is urgent (seconds)
    pub const URGENT_TIME: f32 = 0.3;
    /// Candidate evaluation distance for urgent threats
    pub const URGENT_DODGE_DISTANCE: f32 = 120.0;
    /// Candidate evaluation distance otherwise
    pub const DODGE_DISTANCE: f32 = 80.0;
    /// Starting score for every surviving candidate
    pub const BASE_SCORE: f32 = 100.0;
    /// Best candidate must reach this score to be used
    pub const MIN_ACCEPTABLE_SCORE: f32 = 40.0;
    /// Bonus for the two pure perpendiculars
    pub const PERPENDICULAR_BONUS: f32 = 15.0;
    /// Maximum penalty for landing on a threat's path center
    pub const PATH_PENALTY: f32 = 60.0;
    /// Landing closer than this to a projectile's current position is penalized
    pub const PROJECTILE_CLEARANCE: f32 = 100.0;
    /// Penalty per unit inside the projectile clearance
    pub const PROJECTILE_PENALTY_PER_UNIT: f32 = 0.3;
    /// Focus point counts as close when within this distance of the agent
    pub const FOCUS_NEAR_DISTANCE: f32 = 200.0;
    /// Landing within this distance of a close focus point is penalized
    pub const FOCUS_CLEARANCE: f32 = 90.0;
    pub const FOCUS_PENALTY: f32 = 25.0;
    /// Dodge duration (seconds)
    pub const DODGE_DURATION: f32 = 0.25;
    /// Speed multipliers by urgency
    pub const MULTIPLIER_URGENT: f32 = 1.9;
    pub const MULTIPLIER_SOON: f32 = 1.5;
    pub const MULTIPLIER_DEFAULT: f32 = 1.2;
    /// Time-to-impact separating "soon" from default (seconds)
    pub const SOON_TIME: f32 = 0.6;
}

/// Agent decision layer
pub mod agent {
    /// Default movement speed (world units / second)
    pub const SPEED: f32 = 150.0;
    /// Half side of the agent's collision square (original 40x40 sprites)
    pub const HALF_SIZE: f32 = 20.0;
    /// Starting and maximum health
    pub const MAX_HEALTH: f32 = 50.0;
    /// Default pickup detection radius
    pub const PICKUP_RADIUS: f32 = 300.0;
    /// Default isolation radius for regrouping
    pub const REGROUP_RADIUS: f32 = 350.0;
    /// Movement below this distance does not reset the stuck timer
    pub const STUCK_MOVE_THRESHOLD: f32 = 8.0;
    /// Time without meaningful movement before stuck recovery (seconds)
    pub const STUCK_TIMEOUT: f32 = 1.5;
    /// Wall-breaching shots fired per stuck recovery
    pub const BREACH_BURST: u32 = 3;
    /// Repulsion from the last stuck position lasts this long (seconds)
    pub const REPULSION_WINDOW: f32 = 2.0;
    /// Blend weight of the repulsion term
    pub const REPULSION_WEIGHT: f32 = 0.6;
    /// Repulsion fades to zero at this distance from the stuck position
    pub const REPULSION_RADIUS: f32 = 150.0;
    /// Flank phase duration range (seconds)
    pub const FLANK_MIN_DURATION: f32 = 1.5;
    pub const FLANK_MAX_DURATION: f32 = 3.0;
    /// Flank point distance range around the objective
    pub const FLANK_MIN_RADIUS: f32 = 150.0;
    pub const FLANK_MAX_RADIUS: f32 = 300.0;
}

/// Firing and aim
pub mod aim {
    /// Hostiles farther than this are not shot at
    pub const FIRE_RANGE: f32 = 650.0;
    /// Line-of-sight sampling step (world units)
    pub const LOS_STEP: f32 = 10.0;
    /// Jitter radius at the most lenient tier
    pub const MAX_AIM_JITTER: f32 = 80.0;
    /// Jitter reaches full magnitude at this distance
    pub const JITTER_FULL_DISTANCE: f32 = 400.0;
    /// Cooldown never drops below this (seconds)
    pub const MIN_FIRE_INTERVAL: f32 = 0.1;
}

/// Weapon table (original values; times in seconds)
pub mod weapons {
    pub struct WeaponStats {
        pub speed: f32,
        pub lifetime: f32,
        pub fire_interval: f32,
        pub damage: f32,
        pub pellets: u32,
        /// Spread half-angle in degrees
        pub spread: f32,
        /// Projectile ignores obstacles
        pub passes_cover: bool,
    }

    pub const PISTOL: WeaponStats = WeaponStats {
        speed: 600.0,
        lifetime: 1.0,
        fire_interval: 0.4,
        damage: 10.0,
        pellets: 1,
        spread: 0.0,
        passes_cover: false,
    };

    pub const SHOTGUN: WeaponStats = WeaponStats {
        speed: 500.0,
        lifetime: 1.0,
        fire_interval: 0.9,
        damage: 5.0,
        pellets: 10,
        spread: 15.0,
        passes_cover: false,
    };

    pub const MACHINE_GUN: WeaponStats = WeaponStats {
        speed: 800.0,
        lifetime: 1.2,
        fire_interval: 0.1,
        damage: 4.0,
        pellets: 1,
        spread: 5.0,
        passes_cover: false,
    };

    pub const GRENADE: WeaponStats = WeaponStats {
        speed: 800.0,
        lifetime: 2.0,
        fire_interval: 0.6,
        damage: 10.0,
        pellets: 1,
        spread: 0.0,
        passes_cover: true,
    };

    pub const RIFLE: WeaponStats = WeaponStats {
        speed: 700.0,
        lifetime: 1.5,
        fire_interval: 0.6,
        damage: 25.0,
        pellets: 1,
        spread: 2.0,
        passes_cover: false,
    };
}

/// Upgrade pickups
pub mod upgrades {
    /// Fire cooldown reduction per fire-rate pickup (seconds)
    pub const FIRE_RATE_STEP: f32 = 0.1;
    /// Health restored per health pickup
    pub const HEALTH_RESTORE: f32 = 20.0;
}
