pub mod components;
pub mod grid2d;
pub mod neighborhood;
pub mod occupancy;
pub mod traits;

pub use components::{Component, ComponentUid, ConnectedComponents};
pub use grid2d::Grid2d;
pub use neighborhood::{Neighbor, Neighborhood};
pub use occupancy::{CellOccupant, OccupancyGrid};
pub use traits::Traversable;
