pub mod constants;
pub mod navigation;
pub mod respawn;
pub mod simulation;
pub mod spatial;
pub mod state;
pub mod systems;
pub mod view;
