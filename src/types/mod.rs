pub mod constants;
pub mod error;
pub mod geometry;
pub mod info;

pub use constants::*;
pub use error::NamoError;
pub use geometry::{Bounds, DiscretePose, Pose2, Uid, angle_distance, normalize_angle, rotate_point};
pub use info::MapInfo;
