//! Core types and utilities for the Warren rabbits-and-grass simulation.

pub mod types;
pub mod config;
pub mod error;
pub mod stats;

pub use error::{ConfigViolation, Error, Result};
pub use types::*;
pub use config::*;
pub use stats::*;
