pub mod ros2;
pub mod scenario;

pub use ros2::{RosMap, load_ros_map};
pub use scenario::{Scenario, load_scenario};
