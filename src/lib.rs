pub mod action;
pub mod behavior;
pub mod collision;
pub mod geometry;
pub mod grid;
pub mod inflation;
pub mod iterators;
pub mod loaders;
pub mod plan;
pub mod search;
pub mod sim;
pub mod types;
pub mod visualization;
pub mod world;

pub use action::{Action, ActionResult};
pub use behavior::{Agent, PlannerConfig, SocialCostmap};
pub use geometry::Polygon;
pub use grid::{ConnectedComponents, OccupancyGrid};
pub use loaders::{Scenario, load_scenario};
pub use plan::{Plan, PlanComponent, TransferPath, TransitPath};
pub use search::Planner;
pub use sim::Simulator;
pub use types::{MapInfo, NamoError, Pose2, Uid};
pub use world::{Entity, EntityKind, World};
