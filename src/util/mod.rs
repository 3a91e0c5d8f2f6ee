pub mod bounds;
pub mod vec2;
