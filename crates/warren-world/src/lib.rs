//! World simulation engine.
//!
//! This module implements the toroidal grid world where rabbits move, eat
//! grass, reproduce and starve.

pub mod grid;
pub mod world;
pub mod rabbit;
pub mod simulation;

pub use grid::ToroidalGrid;
pub use world::{GrassPatch, World};
pub use rabbit::{Feeding, MoveOutcome, Rabbit, Reproduction, MOVE_COST};
pub use simulation::SimulationEngine;
