//! Rabbit state and its per-tick state transitions.

use crate::world::World;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;
use warren_core::{Direction, Position, RabbitId};

/// Energy spent on every successful step
pub const MOVE_COST: i32 = 1;

/// A rabbit in the simulation.
///
/// The world's rabbit layer holds this rabbit's id at `position`; the two are
/// kept in sync by only changing `position` through [`Rabbit::move_step`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rabbit {
    pub id: RabbitId,
    pub position: Position,
    pub energy: i32,
    pub age: u64,
    pub offspring: u32,
}

/// Result of a movement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { from: Position, to: Position },
    /// All four neighbours were taken, so the rabbit stayed put for free
    Blocked,
}

/// Result of a reproduction attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Reproduction {
    /// Energy not above the threshold
    NotReady,
    Born(Rabbit),
    /// The parent paid the cost but the grid had no free cell
    NoSpace,
}

/// Result of the eat-then-reproduce transition
#[derive(Debug, Clone, PartialEq)]
pub struct Feeding {
    pub energy_gained: i32,
    pub reproduction: Reproduction,
}

impl Feeding {
    pub fn ate(&self) -> bool {
        self.energy_gained > 0
    }

    pub fn into_newborn(self) -> Option<Rabbit> {
        match self.reproduction {
            Reproduction::Born(newborn) => Some(newborn),
            _ => None,
        }
    }
}

impl Rabbit {
    pub fn new(id: RabbitId, position: Position, energy: i32) -> Self {
        Self {
            id,
            position,
            energy,
            age: 0,
            offspring: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.energy >= 1
    }

    pub fn tick(&mut self) {
        self.age += 1;
    }

    /// Try the four neighbouring cells in random order and step onto the
    /// first one with no rabbit in it.
    pub fn move_step<R: Rng>(&mut self, world: &mut World, rng: &mut R) -> MoveOutcome {
        let mut candidates = Direction::all();
        let mut remaining = candidates.len();

        while remaining > 0 {
            let pick = rng.gen_range(0..remaining);
            let direction = candidates[pick];
            remaining -= 1;
            candidates.swap(pick, remaining);

            let target = world.normalize(self.position.step(direction));
            if world.rabbit_at(target).is_none() {
                let from = self.position;
                world.move_rabbit(from, target);
                self.position = target;
                self.energy -= MOVE_COST;
                return MoveOutcome::Moved { from, to: target };
            }
        }

        trace!(rabbit_id = %self.id, position = %self.position, "Rabbit boxed in, not moving");
        MoveOutcome::Blocked
    }

    /// Eat any grass underfoot, then reproduce once if energy is strictly
    /// above the threshold.
    pub fn eat_and_reproduce<R: Rng>(&mut self, world: &mut World, rng: &mut R) -> Feeding {
        let energy_gained = world.eat_grass_at(self.position);
        self.energy += energy_gained;

        let threshold = world.energy_config().reproduce_threshold;
        if self.energy <= threshold {
            return Feeding {
                energy_gained,
                reproduction: Reproduction::NotReady,
            };
        }

        self.energy -= world.energy_config().reproduce_cost;
        let reproduction = match world.place_random_rabbit(rng) {
            Some(newborn) => {
                self.offspring += 1;
                Reproduction::Born(newborn)
            }
            None => {
                trace!(rabbit_id = %self.id, energy = self.energy, "Reproduction failed: no free cell");
                Reproduction::NoSpace
            }
        };

        Feeding {
            energy_gained,
            reproduction,
        }
    }
}
