//! The shared space rabbits and grass live in.

use crate::grid::ToroidalGrid;
use crate::rabbit::Rabbit;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::trace;
use warren_core::{
    EnergyConfig, Error, Position, RabbitId, Result, SimulationConfig, WorldConfig,
};

/// A patch of grass. It has no energy of its own and is eaten whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrassPatch {
    pub position: Position,
}

/// Two occupancy layers over the same torus plus the live-grass registry.
///
/// The rabbit layer only records which rabbit stands where; the rabbits
/// themselves are owned by the simulation engine.
#[derive(Debug, Clone)]
pub struct World {
    rabbits: ToroidalGrid<RabbitId>,
    grass: ToroidalGrid<GrassPatch>,
    grass_registry: Vec<GrassPatch>,
    world_config: WorldConfig,
    energy_config: EnergyConfig,
    next_rabbit_id: u64,
}

impl World {
    /// Build an empty world. Only the grid dimensions are checked here;
    /// the remaining parameters are validated with the rest of the config.
    pub fn new(world_config: WorldConfig, energy_config: EnergyConfig) -> Result<Self> {
        Ok(Self {
            rabbits: ToroidalGrid::new(world_config.width, world_config.height)?,
            grass: ToroidalGrid::new(world_config.width, world_config.height)?,
            grass_registry: Vec::new(),
            world_config,
            energy_config,
            next_rabbit_id: 0,
        })
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        Self::new(config.world_config.clone(), config.energy_config.clone())
    }

    pub fn width(&self) -> i32 {
        self.rabbits.width()
    }

    pub fn height(&self) -> i32 {
        self.rabbits.height()
    }

    pub fn world_config(&self) -> &WorldConfig {
        &self.world_config
    }

    pub fn energy_config(&self) -> &EnergyConfig {
        &self.energy_config
    }

    /// Every cell of the world, row by row
    pub fn grid_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.rabbits.positions()
    }

    pub fn normalize(&self, pos: Position) -> Position {
        self.rabbits.normalize(pos.x, pos.y)
    }

    // --- rabbit layer ---

    /// Create a rabbit with the initial energy at a free cell.
    pub fn place_rabbit(&mut self, position: Position) -> Rabbit {
        let position = self.normalize(position);
        debug_assert!(
            !self.rabbits.is_occupied(position),
            "placing a rabbit on occupied cell {}",
            position
        );

        let id = RabbitId(self.next_rabbit_id);
        self.next_rabbit_id += 1;
        self.rabbits.set(position, Some(id));

        Rabbit::new(id, position, self.energy_config.initial_energy)
    }

    /// Place a rabbit at a uniformly chosen free cell, if there is one.
    pub fn place_random_rabbit<R: Rng>(&mut self, rng: &mut R) -> Option<Rabbit> {
        let position = self.random_open_position(rng)?;
        Some(self.place_rabbit(position))
    }

    pub fn rabbit_at(&self, position: Position) -> Option<RabbitId> {
        self.rabbits.get(position).copied()
    }

    pub fn move_rabbit(&mut self, from: Position, to: Position) {
        let occupant = self.rabbits.take(from);
        debug_assert!(occupant.is_some(), "moving a rabbit from empty cell {}", from);
        let displaced = self.rabbits.set(to, occupant);
        debug_assert!(displaced.is_none(), "rabbit moved onto occupied cell {}", to);
    }

    pub fn remove_rabbit(&mut self, position: Position) {
        self.rabbits.set(position, None);
    }

    /// Cells currently holding a rabbit, row by row
    pub fn occupied_rabbit_cells(&self) -> impl Iterator<Item = (Position, RabbitId)> + '_ {
        self.rabbits.occupied().map(|(pos, id)| (pos, *id))
    }

    pub fn rabbit_cell_count(&self) -> usize {
        self.rabbits.occupied_count()
    }

    /// Draw cells uniformly without replacement until a free one turns up.
    pub fn random_open_position<R: Rng>(&self, rng: &mut R) -> Option<Position> {
        if self.rabbits.occupied_count() == self.rabbits.cell_count() {
            return None;
        }

        let mut pool: Vec<usize> = (0..self.rabbits.cell_count()).collect();
        while !pool.is_empty() {
            let pick = rng.gen_range(0..pool.len());
            let position = self.rabbits.index_to_pos(pool.swap_remove(pick));
            if !self.rabbits.is_occupied(position) {
                return Some(position);
            }
        }

        None
    }

    // --- grass layer ---

    pub fn grass_at(&self, position: Position) -> bool {
        self.grass.is_occupied(position)
    }

    /// Grow grass at a cell. Returns false if grass was already there.
    pub fn put_grass_at(&mut self, position: Position) -> bool {
        let position = self.normalize(position);
        if self.grass.is_occupied(position) {
            return false;
        }

        let patch = GrassPatch { position };
        self.grass.set(position, Some(patch));
        self.grass_registry.push(patch);
        true
    }

    /// One stochastic regrowth pass over every cell, row by row.
    ///
    /// Each cell gets its own uniform draw whether or not it already has
    /// grass. Returns the number of new patches.
    pub fn spawn_grass_tick<R: Rng>(&mut self, rng: &mut R) -> usize {
        let probability = self.world_config.grass_spawn_probability;
        let mut spawned = 0;

        for index in 0..self.grass.cell_count() {
            if rng.gen::<f64>() < probability {
                let position = self.grass.index_to_pos(index);
                if self.put_grass_at(position) {
                    spawned += 1;
                }
            }
        }

        trace!(spawned, total = self.grass_registry.len(), "Grass spawn pass");
        spawned
    }

    /// Remove grass at a cell and return its energy, or 0 if there was none.
    pub fn eat_grass_at(&mut self, position: Position) -> i32 {
        let Some(patch) = self.grass.take(position) else {
            return 0;
        };

        match self
            .grass_registry
            .iter()
            .position(|g| g.position == patch.position)
        {
            Some(index) => {
                self.grass_registry.remove(index);
            }
            None => debug_assert!(false, "grass at {} missing from registry", patch.position),
        }

        self.world_config.grass_energy_gain
    }

    /// Live grass, oldest first
    pub fn grass_patches(&self) -> &[GrassPatch] {
        &self.grass_registry
    }

    pub fn grass_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.grass_registry.iter().map(|g| g.position)
    }

    pub fn grass_count(&self) -> usize {
        self.grass_registry.len()
    }

    /// Check that the grass registry and the grass layer describe the same cells.
    pub fn check_consistency(&self) -> Result<()> {
        let registered: HashSet<Position> = self.grass_positions().collect();
        if registered.len() != self.grass_registry.len() {
            return Err(Error::InvariantViolation(
                "grass registry holds duplicate positions".to_string(),
            ));
        }

        let on_grid: HashSet<Position> = self.grass.occupied().map(|(pos, _)| pos).collect();
        if registered != on_grid {
            return Err(Error::InvariantViolation(format!(
                "grass registry ({} patches) disagrees with grass layer ({} cells)",
                registered.len(),
                on_grid.len()
            )));
        }

        for (pos, patch) in self.grass.occupied() {
            if patch.position != pos {
                return Err(Error::InvariantViolation(format!(
                    "grass patch recorded at {} is stored in cell {}",
                    patch.position, pos
                )));
            }
        }

        Ok(())
    }
}
