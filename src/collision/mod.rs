//! Collision checking between polygons, segments and swept volumes.

pub mod aabb;
pub mod scene;
pub mod swept;

pub use aabb::AabbIndex;
pub use scene::CollisionScene;
pub use swept::{
    CollisionCache, CollisionData, Motion, check_swept_collisions, swept_hull, swept_step_collision,
};
