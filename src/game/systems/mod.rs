pub mod ai;
pub mod evasion;
pub mod targeting;
pub mod threat;
