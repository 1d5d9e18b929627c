//! Configuration types for the simulation.

use crate::error::{ConfigViolation, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// World configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Width of the world grid
    pub width: i32,
    /// Height of the world grid
    pub height: i32,
    /// Chance that an empty cell sprouts grass on a given tick (0.0 to 1.0)
    pub grass_spawn_probability: f64,
    /// Energy a rabbit gains from eating one grass patch
    pub grass_energy_gain: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            grass_spawn_probability: 0.01,
            grass_energy_gain: 10,
        }
    }
}

/// Energy economy of the rabbits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Starting energy for new rabbits, seeded or newborn
    pub initial_energy: i32,
    /// A rabbit reproduces when its energy is strictly above this
    pub reproduce_threshold: i32,
    /// Energy a parent spends on one reproduction
    pub reproduce_cost: i32,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            initial_energy: 100,
            reproduce_threshold: 100,
            reproduce_cost: 12,
        }
    }
}

/// Full simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of ticks a driver runs by default
    pub num_ticks: u64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Rabbits placed at random when the simulation starts
    pub initial_population: i32,
    /// How often (in ticks) progress is logged
    pub report_interval: u64,
    /// World configuration
    pub world_config: WorldConfig,
    /// Energy configuration
    pub energy_config: EnergyConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_ticks: 1_000,
            seed: 0,
            initial_population: 20,
            report_interval: 100,
            world_config: WorldConfig::default(),
            energy_config: EnergyConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Tunable model parameters, in the order a parameter form shows them.
    pub const PARAMETER_NAMES: [&'static str; 8] = [
        "world_width",
        "world_height",
        "initial_rabbit_energy",
        "initial_rabbit_population",
        "grass_energy_gain",
        "grass_spawn_probability",
        "reproduce_energy_threshold",
        "reproduce_energy_loss",
    ];

    /// Check every parameter constraint and report all violations together.
    pub fn violations(&self) -> Vec<ConfigViolation> {
        let world = &self.world_config;
        let energy = &self.energy_config;
        let mut violations = Vec::new();

        // NaN fails this range check too
        if !(0.0..=1.0).contains(&world.grass_spawn_probability) {
            violations.push(ConfigViolation::GrassSpawnProbability(
                world.grass_spawn_probability,
            ));
        }
        if world.grass_energy_gain < 1 {
            violations.push(ConfigViolation::GrassEnergyGain(world.grass_energy_gain));
        }
        if energy.initial_energy < 1 {
            violations.push(ConfigViolation::InitialEnergy(energy.initial_energy));
        }
        if self.initial_population < 1 {
            violations.push(ConfigViolation::InitialPopulation(self.initial_population));
        }
        if energy.reproduce_cost < 1 {
            violations.push(ConfigViolation::ReproduceCost(energy.reproduce_cost));
        }
        if world.width < 1 || world.height < 1 {
            violations.push(ConfigViolation::WorldDimensions {
                width: world.width,
                height: world.height,
            });
        }
        if energy.initial_energy > energy.reproduce_threshold {
            violations.push(ConfigViolation::ReproduceThreshold {
                threshold: energy.reproduce_threshold,
                initial_energy: energy.initial_energy,
            });
        }

        violations
    }

    /// Validate the configuration, refusing it if any constraint is broken.
    pub fn validate(&self) -> Result<()> {
        let violations = self.violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfig(violations))
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json(&contents)?;
        debug!(path = %path.display(), "Loaded simulation config");
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let config = SimulationConfig::default();
        assert_eq!(config.world_config.width, 20);
        assert_eq!(config.world_config.height, 20);
        assert_eq!(config.world_config.grass_energy_gain, 10);
        assert_eq!(config.energy_config.initial_energy, 100);
        assert_eq!(config.energy_config.reproduce_threshold, 100);
        assert_eq!(config.energy_config.reproduce_cost, 12);
        assert_eq!(config.initial_population, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_all_violations_are_collected() {
        let config = SimulationConfig {
            initial_population: 0,
            world_config: WorldConfig {
                width: 0,
                height: 5,
                grass_spawn_probability: 1.5,
                grass_energy_gain: -1,
            },
            energy_config: EnergyConfig {
                initial_energy: 0,
                reproduce_threshold: 10,
                reproduce_cost: 0,
            },
            ..Default::default()
        };

        let violations = config.violations();
        assert_eq!(violations.len(), 6);
        assert!(violations.contains(&ConfigViolation::GrassSpawnProbability(1.5)));
        assert!(violations.contains(&ConfigViolation::GrassEnergyGain(-1)));
        assert!(violations.contains(&ConfigViolation::InitialEnergy(0)));
        assert!(violations.contains(&ConfigViolation::InitialPopulation(0)));
        assert!(violations.contains(&ConfigViolation::ReproduceCost(0)));
        assert!(violations.contains(&ConfigViolation::WorldDimensions { width: 0, height: 5 }));

        match config.validate() {
            Err(Error::InvalidConfig(reported)) => assert_eq!(reported, violations),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_threshold_below_initial_energy() {
        let mut config = SimulationConfig::default();
        config.energy_config.reproduce_threshold = 99;
        assert_eq!(
            config.violations(),
            vec![ConfigViolation::ReproduceThreshold {
                threshold: 99,
                initial_energy: 100
            }]
        );

        // Equal is allowed
        config.energy_config.reproduce_threshold = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_spawn_probability_bounds_are_inclusive() {
        let mut config = SimulationConfig::default();
        config.world_config.grass_spawn_probability = 0.0;
        assert!(config.validate().is_ok());
        config.world_config.grass_spawn_probability = 1.0;
        assert!(config.validate().is_ok());
        config.world_config.grass_spawn_probability = -0.01;
        assert!(config.validate().is_err());
        config.world_config.grass_spawn_probability = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SimulationConfig::from_json(
            r#"{ "seed": 7, "world_config": { "width": 50 } }"#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.world_config.width, 50);
        assert_eq!(config.world_config.height, 20);
        assert_eq!(config.energy_config, EnergyConfig::default());
    }

    #[test]
    fn test_config_serialization() {
        let config = SimulationConfig::default();
        let json = config.to_json_pretty().unwrap();
        let deserialized = SimulationConfig::from_json(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_parameter_names() {
        assert_eq!(SimulationConfig::PARAMETER_NAMES.len(), 8);
        assert_eq!(SimulationConfig::PARAMETER_NAMES[0], "world_width");
    }
}
