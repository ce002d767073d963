use super::Uid;

/// Uid reserved for "no entity" and "no component".
pub const NO_UID: Uid = 0;

pub const SQRT_2: f32 = std::f32::consts::SQRT_2;

/// Relative tolerance for approximate pose equality.
pub const POSE_RTOL: f32 = 1e-5;
/// Absolute tolerance for approximate pose equality.
pub const POSE_ATOL: f32 = 1e-4;

/// Social cost marking a cell where obstacles must never be placed.
pub const FORBIDDEN_COST: f32 = -1.0;

/// Extra distance, in cells, that the robot backs off after releasing an obstacle.
pub const RELEASE_MARGIN_CELLS: f32 = 1.5;

pub const DEFAULT_SOCIAL_WEIGHT: f32 = 15.0;
pub const DEFAULT_OBSTACLE_DISTANCE_WEIGHT: f32 = 10.0;
pub const DEFAULT_GOAL_DISTANCE_WEIGHT: f32 = 2.0;

/// map_server defaults for map images.
pub const DEFAULT_OCCUPIED_THRESH: f32 = 0.65;
pub const DEFAULT_FREE_THRESH: f32 = 0.196;
