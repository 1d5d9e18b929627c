//! Error types for the simulation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {}", format_violations(.0))]
    InvalidConfig(Vec<ConfigViolation>),

    #[error("Invalid grid dimensions {width}x{height}: both must be positive")]
    InvalidGrid { width: i32, height: i32 },

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// A single broken parameter constraint.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigViolation {
    #[error("grass spawn probability must be between 0 and 1 (inclusive), got {0}")]
    GrassSpawnProbability(f64),

    #[error("grass energy gain must be positive, got {0}")]
    GrassEnergyGain(i32),

    #[error("initial rabbit energy must be positive, got {0}")]
    InitialEnergy(i32),

    #[error("initial rabbit population must be positive, got {0}")]
    InitialPopulation(i32),

    #[error("reproduce energy loss must be positive, got {0}")]
    ReproduceCost(i32),

    #[error("world dimensions must be positive integers, got {width}x{height}")]
    WorldDimensions { width: i32, height: i32 },

    #[error("reproduce energy threshold ({threshold}) must be greater than or equal to initial rabbit energy ({initial_energy})")]
    ReproduceThreshold { threshold: i32, initial_energy: i32 },
}

fn format_violations(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
