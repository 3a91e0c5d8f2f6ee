//! Skirmish AI core
//!
//! Real-time spatial and decision layer for arena shooter agents: a uniform
//! spatial hash for broadphase queries, an A* navigation grid around destructible
//! cover, and per-agent behaviors that detect incoming fire, dodge, flank, regroup
//! and aim with lead. A single-threaded [`game::simulation::Simulation`] drives it
//! headless.

pub mod config;
pub mod game;
pub mod util;
