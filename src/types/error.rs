use glam::UVec2;
use thiserror::Error;

use super::Uid;

#[derive(Debug, Error)]
pub enum NamoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
    #[error("out of bounds: {0}")]
    OutOfBounds(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("unknown entity {0}")]
    UnknownEntity(Uid),
    #[error("start cell ({}, {}) must be outside of every inflated obstacle", cell.x, cell.y)]
    StartCellOccupied { cell: UVec2 },
    #[error("goal cell ({}, {}) lies inside a static obstacle", cell.x, cell.y)]
    GoalCellInStaticObstacle { cell: UVec2 },
    #[error("goal cell ({}, {}) lies inside more than one obstacle", cell.x, cell.y)]
    GoalCellInMultipleObstacles { cell: UVec2 },
    #[error("reachability search reached the goal without traversing any obstacle")]
    NoObstacleTraversed,
    #[error("rotation primitives requested while rotations are forbidden")]
    RotationsForbidden,
}
