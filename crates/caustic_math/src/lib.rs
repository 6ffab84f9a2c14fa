// Re-export glam for convenience
pub use glam::*;

// Caustic math types
mod aabb;
mod frame;
pub use aabb::Aabb;
pub use frame::{reflect, Frame};
