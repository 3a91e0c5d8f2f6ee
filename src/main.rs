use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use skirmish_ai::config::AiConfig;
use skirmish_ai::game::simulation::{Simulation, TickReport};
use skirmish_ai::game::state::Team;

/// Counters accumulated over the whole run
#[derive(Debug, Default, Serialize)]
struct RunTotals {
    ticks: u64,
    shots_fired: u64,
    breach_shots: u64,
    hits: u64,
    kills: u64,
    obstacles_destroyed: u64,
    obstacles_respawned: u64,
    pickups_spawned: u64,
    pickups_collected: u64,
    respawns: u64,
    nav_rebuilds: u64,
}

impl RunTotals {
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.shots_fired += u64::from(report.shots_fired);
        self.breach_shots += u64::from(report.breach_shots);
        self.hits += u64::from(report.hits);
        self.kills += u64::from(report.kills);
        self.obstacles_destroyed += u64::from(report.obstacles_destroyed);
        self.obstacles_respawned += u64::from(report.obstacles_respawned);
        self.pickups_spawned += u64::from(report.pickups_spawned);
        self.pickups_collected += u64::from(report.pickups_collected);
        self.respawns += u64::from(report.respawns);
        if report.nav_rebuilt {
            self.nav_rebuilds += 1;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Skirmish AI v{}", env!("CARGO_PKG_VERSION"));

    let config = AiConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: world={}x{}, tick_rate={}, aim={}, dodge={}",
        config.world_width, config.world_height, config.tick_rate, config.aim_difficulty, config.dodge_difficulty
    );

    let seconds: f32 = std::env::var("SIM_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|s: &f32| *s > 0.0)
        .unwrap_or(30.0);
    let seed: u64 = std::env::var("SIM_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(rand::random);

    let tick_rate = config.tick_rate;
    let max_ticks = (seconds * tick_rate as f32).ceil() as u64;
    let mut sim = Simulation::team_skirmish(config, seed)?;
    info!(
        "Skirmish ready: {} agents, {} obstacles, seed={}, running {:.1}s",
        sim.world().agents.len(),
        sim.world().obstacles.len(),
        seed,
        seconds
    );

    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(tick_rate)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut totals = RunTotals::default();
    while totals.ticks < max_ticks {
        tokio::select! {
            _ = interval.tick() => {
                let report = sim.step();
                totals.record(&report);

                if report.nav_rebuilt {
                    debug!("Tick {}: navigation grid rebuilt", report.tick);
                }
                if report.tick % u64::from(tick_rate) == 0 {
                    info!(
                        "t={:.0}s live={} kills red={} blue={} shots={} pickups={}",
                        report.time,
                        report.live_agents,
                        sim.kills(Team::Red),
                        sim.kills(Team::Blue),
                        totals.shots_fired,
                        sim.world().pickups.len()
                    );
                }
            }
            result = &mut shutdown => {
                result.expect("Failed to install Ctrl+C handler");
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!(
        "Final tally after {} ticks: red {} - blue {}",
        totals.ticks,
        sim.kills(Team::Red),
        sim.kills(Team::Blue)
    );
    info!("Totals: {}", serde_json::to_string(&totals)?);

    Ok(())
}
