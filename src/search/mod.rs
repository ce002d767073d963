//! Planning searches: the generic A* engine and the planners built on it.

pub mod astar;
pub mod cost;
pub mod grid;
pub mod manip;
pub mod rch;
pub mod select_connect;

pub use astar::{AStarConfig, SearchNode, SearchOutcome, SearchState, search};
pub use cost::CostModel;
pub use grid::{dijkstra, dijkstra_from, grid_search, real_path_from_cells, step_length};
pub use manip::{ManipContext, ManipRequest, focused_manip_search};
pub use rch::{AvoidList, RchConfiguration, RchInput, rch, rch_path};
pub use select_connect::Planner;
