use std::path::Path;

use serde::Deserialize;

use crate::grid::Neighborhood;
use crate::search::AStarConfig;
use crate::search::CostModel;
use crate::types::NamoError;

/// Tuning of the planner and of the per-tick driver.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub translation_unit_cost: f32,
    pub rotation_unit_cost: f32,
    /// Penalty multiplier on transfer steps; always above 1.
    #[serde(deserialize_with = "deserialize_transfer_coefficient")]
    pub transfer_coefficient: f32,
    /// Length in meters of one manipulation translation step.
    pub translation_unit_length: f32,
    /// Angle in degrees of one manipulation rotation step; divides 360.
    #[serde(deserialize_with = "deserialize_rotation_unit_angle")]
    pub rotation_unit_angle: f32,
    pub forbid_rotations: bool,
    /// Share of the best ranked obstacle placements accepted as search exits.
    #[serde(deserialize_with = "deserialize_percentage")]
    pub solution_interval_bound_percentage: f32,
    pub check_new_local_opening_before_global: bool,
    /// Steps of the current plan re-checked every tick.
    pub check_horizon: usize,
    pub min_wait_steps: u32,
    pub max_wait_steps: u32,
    #[serde(deserialize_with = "deserialize_heuristic_weight")]
    pub heuristic_weight: f32,
    pub max_manip_expansions: usize,
    /// Depth of nested manipulations a single plan may chain.
    pub max_manipulations: usize,
    pub neighborhood: Neighborhood,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            translation_unit_cost: 1.0,
            rotation_unit_cost: 1.0,
            transfer_coefficient: default_transfer_coefficient(),
            translation_unit_length: 0.1,
            rotation_unit_angle: default_rotation_unit_angle(),
            forbid_rotations: false,
            solution_interval_bound_percentage: 0.1,
            check_new_local_opening_before_global: false,
            check_horizon: 10,
            min_wait_steps: 10,
            max_wait_steps: 100,
            heuristic_weight: 1.0,
            max_manip_expansions: 20_000,
            max_manipulations: 8,
            neighborhood: Neighborhood::Chessboard,
        }
    }
}

fn default_transfer_coefficient() -> f32 {
    2.0
}

fn default_rotation_unit_angle() -> f32 {
    15.0
}

fn deserialize_transfer_coefficient<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = f32::deserialize(deserializer)?;
    if value > 1.0 {
        Ok(value)
    } else {
        Err(serde::de::Error::custom(
            "transfer_coefficient must be greater than 1.0",
        ))
    }
}

fn deserialize_rotation_unit_angle<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = f32::deserialize(deserializer)?;
    let steps = 360.0 / value;
    if value > 0.0 && (steps - steps.round()).abs() < 1e-4 {
        Ok(value)
    } else {
        Err(serde::de::Error::custom(
            "rotation_unit_angle must be a positive divisor of 360",
        ))
    }
}

fn deserialize_percentage<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = f32::deserialize(deserializer)?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(serde::de::Error::custom(
            "percentages must be in the range [0.0, 1.0]",
        ))
    }
}

fn deserialize_heuristic_weight<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = f32::deserialize(deserializer)?;
    if value >= 1.0 {
        Ok(value)
    } else {
        Err(serde::de::Error::custom(
            "heuristic_weight must be at least 1.0",
        ))
    }
}

impl PlannerConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, NamoError> {
        let config: PlannerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, NamoError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Cross-field checks the field deserializers cannot make.
    pub fn validate(&self) -> Result<(), NamoError> {
        if self.min_wait_steps > self.max_wait_steps {
            return Err(NamoError::InvalidConfig(
                "min_wait_steps must not exceed max_wait_steps".to_string(),
            ));
        }
        if self.translation_unit_length <= 0.0 {
            return Err(NamoError::InvalidConfig(
                "translation_unit_length must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel::new(
            self.translation_unit_cost,
            self.translation_unit_length,
            self.rotation_unit_cost,
            self.rotation_unit_angle,
            self.transfer_coefficient,
        )
    }

    pub fn astar(&self) -> AStarConfig {
        AStarConfig {
            heuristic_weight: self.heuristic_weight,
            max_expansions: None,
        }
    }

    pub fn manip_astar(&self) -> AStarConfig {
        AStarConfig {
            heuristic_weight: self.heuristic_weight,
            max_expansions: Some(self.max_manip_expansions),
        }
    }
}
