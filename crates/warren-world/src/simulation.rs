//! Simulation engine: owns the rabbit population and steps the world.

use crate::rabbit::{MoveOutcome, Rabbit, Reproduction};
use crate::world::World;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use tracing::{debug, event, info, instrument, Level};
use warren_core::{
    Error, EventTotals, PopulationHistory, PopulationSample, Position, Result, RunSummary,
    SimulationConfig, TickReport,
};

pub struct SimulationEngine {
    world: World,
    rabbits: Vec<Rabbit>,
    config: SimulationConfig,
    rng: ChaCha8Rng,
    tick: u64,
    history: PopulationHistory,
    totals: EventTotals,
}

impl SimulationEngine {
    /// Validate the configuration, build the world and seed the initial
    /// population at random free cells.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let mut sim = Self::empty(config)?;

        let requested = sim.config.initial_population as usize;
        for _ in 0..requested {
            match sim.world.place_random_rabbit(&mut sim.rng) {
                Some(rabbit) => sim.rabbits.push(rabbit),
                None => break,
            }
        }
        if sim.rabbits.len() < requested {
            debug!(
                requested,
                placed = sim.rabbits.len(),
                "Grid full, initial population truncated"
            );
        }

        sim.history = PopulationHistory::new();
        sim.record_sample();

        info!(
            event = "simulation_ready",
            seed = sim.config.seed,
            width = sim.world.width(),
            height = sim.world.height(),
            rabbits = sim.rabbits.len(),
            "Simulation initialized"
        );

        Ok(sim)
    }

    /// A validated engine with no rabbits yet.
    pub fn empty(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let world = World::from_config(&config)?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self::assemble(world, config, rng))
    }

    /// Drive an existing world without validating its parameters.
    pub fn with_world(world: World, seed: u64) -> Self {
        let config = SimulationConfig {
            seed,
            world_config: world.world_config().clone(),
            energy_config: world.energy_config().clone(),
            ..Default::default()
        };
        Self::assemble(world, config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn assemble(world: World, config: SimulationConfig, rng: ChaCha8Rng) -> Self {
        let mut sim = Self {
            world,
            rabbits: Vec::new(),
            config,
            rng,
            tick: 0,
            history: PopulationHistory::new(),
            totals: EventTotals::default(),
        };
        sim.record_sample();
        sim
    }

    /// Place a rabbit with the initial energy at a chosen cell.
    /// Returns `None` if another rabbit already stands there.
    pub fn add_rabbit_at(&mut self, position: Position) -> Option<&mut Rabbit> {
        if self.world.rabbit_at(position).is_some() {
            return None;
        }
        let rabbit = self.world.place_rabbit(position);
        self.rabbits.push(rabbit);
        self.rabbits.last_mut()
    }

    /// Mutable access to the world, e.g. to lay out grass for a scenario.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Run the simulation for the given number of ticks
    #[instrument(skip(self), fields(seed = self.config.seed))]
    pub fn run(&mut self, num_ticks: u64) -> RunSummary {
        info!("Starting simulation for {} ticks", num_ticks);
        let report_interval = self.config.report_interval.max(1);

        for _ in 0..num_ticks {
            self.step();

            if self.tick % report_interval == 0 {
                self.emit_population_metrics();
            }
        }

        let summary = self.summary(num_ticks);
        info!(
            event = "run_summary",
            ticks_run = summary.ticks_run,
            final_rabbits = summary.final_rabbits,
            final_grass = summary.final_grass,
            peak_rabbits = summary.peak_rabbits,
            births = summary.totals.births,
            deaths = summary.totals.deaths,
            extinct_at = ?summary.extinct_at,
            "🏁 Run complete"
        );
        summary
    }

    /// Execute one tick: move, grow grass, eat and reproduce, cull.
    pub fn step(&mut self) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..Default::default()
        };

        // Rabbits born during this tick sit past this index and do not act.
        let acting = self.rabbits.len();

        self.move_phase(acting, &mut report);
        report.grass_spawned = self.world.spawn_grass_tick(&mut self.rng) as u32;
        self.eat_phase(acting, &mut report);
        self.cull_phase(&mut report);

        if cfg!(debug_assertions) {
            if let Err(e) = self.verify_invariants() {
                panic!("tick {}: {}", self.tick, e);
            }
        }

        self.totals += &report;
        self.record_sample();
        report
    }

    fn move_phase(&mut self, acting: usize, report: &mut TickReport) {
        for rabbit in &mut self.rabbits[..acting] {
            rabbit.tick();
            match rabbit.move_step(&mut self.world, &mut self.rng) {
                MoveOutcome::Moved { .. } => report.moves += 1,
                MoveOutcome::Blocked => report.blocked_moves += 1,
            }
        }
    }

    fn eat_phase(&mut self, acting: usize, report: &mut TickReport) {
        for index in 0..acting {
            let feeding = self.rabbits[index].eat_and_reproduce(&mut self.world, &mut self.rng);
            if feeding.ate() {
                report.grass_eaten += 1;
            }

            match feeding.reproduction {
                Reproduction::Born(newborn) => {
                    debug!(
                        event = "birth",
                        parent_id = %self.rabbits[index].id,
                        offspring_id = %newborn.id,
                        parent_energy = self.rabbits[index].energy,
                        position = %newborn.position,
                        tick = self.tick,
                        "Rabbit born"
                    );
                    report.births += 1;
                    self.rabbits.push(newborn);
                }
                Reproduction::NoSpace => report.failed_births += 1,
                Reproduction::NotReady => {}
            }
        }
    }

    /// Remove every rabbit with energy below 1, newborns included.
    fn cull_phase(&mut self, report: &mut TickReport) {
        let world = &mut self.world;
        let tick = self.tick;
        let mut deaths = 0;

        self.rabbits.retain(|rabbit| {
            if rabbit.is_alive() {
                return true;
            }
            world.remove_rabbit(rabbit.position);
            deaths += 1;
            debug!(
                event = "death",
                rabbit_id = %rabbit.id,
                age = rabbit.age,
                offspring = rabbit.offspring,
                final_energy = rabbit.energy,
                tick,
                "Rabbit died"
            );
            false
        });

        report.deaths = deaths;
    }

    /// Check that population and rabbit layer agree one-to-one and that the
    /// grass registry matches the grass layer.
    pub fn verify_invariants(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.rabbits.len());
        for rabbit in &self.rabbits {
            if !seen.insert(rabbit.position) {
                return Err(Error::InvariantViolation(format!(
                    "two rabbits share cell {}",
                    rabbit.position
                )));
            }
            if self.world.rabbit_at(rabbit.position) != Some(rabbit.id) {
                return Err(Error::InvariantViolation(format!(
                    "{} at {} is not recorded on the rabbit layer",
                    rabbit.id, rabbit.position
                )));
            }
        }

        let occupied = self.world.rabbit_cell_count();
        if occupied != self.rabbits.len() {
            return Err(Error::InvariantViolation(format!(
                "{} rabbits alive but {} cells occupied",
                self.rabbits.len(),
                occupied
            )));
        }

        self.world.check_consistency()
    }

    fn record_sample(&mut self) {
        self.history.record(PopulationSample {
            tick: self.tick,
            rabbits: self.rabbits.len(),
            grass: self.world.grass_count(),
        });
    }

    fn emit_population_metrics(&self) {
        let total = self.rabbits.len();
        let (min_energy, max_energy, avg_energy) = if total > 0 {
            let sum: i64 = self.rabbits.iter().map(|r| r.energy as i64).sum();
            (
                self.rabbits.iter().map(|r| r.energy).min().unwrap_or(0),
                self.rabbits.iter().map(|r| r.energy).max().unwrap_or(0),
                sum / total as i64,
            )
        } else {
            (0, 0, 0)
        };
        let max_age = self.rabbits.iter().map(|r| r.age).max().unwrap_or(0);

        info!(
            event = "population_metrics",
            tick = self.tick,
            rabbits = total,
            grass = self.world.grass_count(),
            avg_energy,
            min_energy,
            max_energy,
            max_age,
            births_total = self.totals.births,
            deaths_total = self.totals.deaths,
            "Population metrics snapshot"
        );

        event!(
            Level::INFO,
            gauge_name = "rabbit_population",
            gauge_value = total,
            tick = self.tick,
            "Rabbit population gauge"
        );

        event!(
            Level::INFO,
            gauge_name = "grass_population",
            gauge_value = self.world.grass_count(),
            tick = self.tick,
            "Grass population gauge"
        );
    }

    pub fn summary(&self, ticks_run: u64) -> RunSummary {
        RunSummary {
            ticks_run,
            final_tick: self.tick,
            final_rabbits: self.rabbits.len(),
            final_grass: self.world.grass_count(),
            peak_rabbits: self.history.peak_rabbits(),
            peak_grass: self.history.peak_grass(),
            mean_rabbits: self.history.mean_rabbits(),
            extinct_at: self.history.extinct_at(),
            totals: self.totals,
        }
    }

    // --- read-only views for display and reporting ---

    pub fn rabbits(&self) -> &[Rabbit] {
        &self.rabbits
    }

    pub fn rabbit_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.rabbits.iter().map(|r| r.position)
    }

    pub fn grass_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.world.grass_positions()
    }

    pub fn rabbit_count(&self) -> usize {
        self.rabbits.len()
    }

    pub fn grass_count(&self) -> usize {
        self.world.grass_count()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn history(&self) -> &PopulationHistory {
        &self.history
    }

    pub fn totals(&self) -> &EventTotals {
        &self.totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use warren_core::{ConfigViolation, EnergyConfig, WorldConfig};

    /// 3x3 world: gain 10, threshold 8, loss 3, no grass regrowth.
    fn scenario_config(initial_energy: i32) -> SimulationConfig {
        SimulationConfig {
            seed: 11,
            initial_population: 1,
            world_config: WorldConfig {
                width: 3,
                height: 3,
                grass_spawn_probability: 0.0,
                grass_energy_gain: 10,
            },
            energy_config: EnergyConfig {
                initial_energy,
                reproduce_threshold: 8,
                reproduce_cost: 3,
            },
            ..Default::default()
        }
    }

    fn busy_config(seed: u64) -> SimulationConfig {
        SimulationConfig {
            seed,
            initial_population: 30,
            world_config: WorldConfig {
                width: 12,
                height: 9,
                grass_spawn_probability: 0.05,
                grass_energy_gain: 6,
            },
            energy_config: EnergyConfig {
                initial_energy: 10,
                reproduce_threshold: 14,
                reproduce_cost: 5,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_simulation_creation() {
        let sim = SimulationEngine::new(SimulationConfig::default()).unwrap();
        assert_eq!(sim.rabbit_count(), 20);
        assert_eq!(sim.tick(), 0);
        assert!(sim.rabbits().iter().all(|r| r.energy == 100));
        assert!(sim.verify_invariants().is_ok());
        assert_eq!(sim.history().len(), 1);
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let mut config = SimulationConfig::default();
        config.initial_population = 0;
        config.world_config.grass_energy_gain = 0;

        match SimulationEngine::new(config) {
            Err(Error::InvalidConfig(violations)) => {
                assert_eq!(
                    violations,
                    vec![
                        ConfigViolation::GrassEnergyGain(0),
                        ConfigViolation::InitialPopulation(0),
                    ]
                );
            }
            other => panic!("expected InvalidConfig, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_seeding_stops_when_grid_is_full() {
        let mut config = scenario_config(5);
        config.initial_population = 50;
        let sim = SimulationEngine::new(config).unwrap();
        assert_eq!(sim.rabbit_count(), 9);
        assert!(sim.verify_invariants().is_ok());
    }

    #[test]
    fn test_add_rabbit_at_rejects_occupied_cell() {
        let mut sim = SimulationEngine::empty(scenario_config(5)).unwrap();
        assert!(sim.add_rabbit_at(Position::new(1, 1)).is_some());
        assert!(sim.add_rabbit_at(Position::new(4, 1)).is_none());
        assert_eq!(sim.rabbit_count(), 1);
    }

    #[test]
    fn test_lone_rabbit_moves_without_reproducing() {
        let mut sim = SimulationEngine::empty(scenario_config(5)).unwrap();
        sim.add_rabbit_at(Position::new(1, 1));

        let report = sim.step();

        let neighbours = [
            Position::new(1, 0),
            Position::new(2, 1),
            Position::new(1, 2),
            Position::new(0, 1),
        ];
        assert_eq!(sim.rabbit_count(), 1);
        let rabbit = &sim.rabbits()[0];
        assert!(neighbours.contains(&rabbit.position));
        assert_eq!(rabbit.energy, 4);
        assert_eq!(report.moves, 1);
        assert_eq!(report.births, 0);
        assert_eq!(sim.grass_count(), 0);
    }

    #[test]
    fn test_eating_and_reproduction_scenario() {
        // Initial energy 5 so the newborn is distinguishable from the parent.
        let mut sim = SimulationEngine::empty(scenario_config(5)).unwrap();
        sim.add_rabbit_at(Position::new(1, 1)).unwrap().energy = 9;
        sim.world_mut().put_grass_at(Position::new(1, 1));

        let parent_id = sim.rabbits()[0].id;
        let feeding = {
            let SimulationEngine {
                rabbits, world, rng, ..
            } = &mut sim;
            rabbits[0].eat_and_reproduce(world, rng)
        };

        assert_eq!(feeding.energy_gained, 10);
        let newborn = feeding.into_newborn().expect("19 > 8 should reproduce");
        assert_eq!(sim.rabbits()[0].id, parent_id);
        assert_eq!(sim.rabbits()[0].energy, 16);
        assert_eq!(newborn.energy, 5);
        assert_ne!(newborn.position, Position::new(1, 1));
        assert!(!sim.world().grass_at(Position::new(1, 1)));
        assert_eq!(sim.grass_count(), 0);
        assert_eq!(sim.world().rabbit_cell_count(), 2);
    }

    #[test]
    fn test_full_tick_with_grass_grows_population() {
        let mut sim = SimulationEngine::empty(scenario_config(5)).unwrap();
        sim.add_rabbit_at(Position::new(1, 1)).unwrap().energy = 9;
        // Grass on every cell so the rabbit eats wherever it lands.
        for pos in sim.world().grid_positions().collect::<Vec<_>>() {
            sim.world_mut().put_grass_at(pos);
        }

        let report = sim.step();

        // 9 - 1 (move) + 10 (grass) - 3 (reproduce) = 15
        assert_eq!(report.moves, 1);
        assert_eq!(report.grass_eaten, 1);
        assert_eq!(report.births, 1);
        assert_eq!(sim.rabbit_count(), 2);
        assert_eq!(sim.rabbits()[0].energy, 15);
        assert_eq!(sim.rabbits()[1].energy, 5);
        assert_eq!(sim.grass_count(), 8);
        assert!(sim.verify_invariants().is_ok());
    }

    #[test]
    fn test_newborns_do_not_act_in_their_birth_tick() {
        let mut sim = SimulationEngine::empty(scenario_config(5)).unwrap();
        sim.add_rabbit_at(Position::new(0, 0)).unwrap().energy = 50;

        sim.step();

        assert_eq!(sim.rabbit_count(), 2);
        let newborn = &sim.rabbits()[1];
        assert_eq!(newborn.energy, 5);
        assert_eq!(newborn.age, 0);
        assert_eq!(sim.rabbits()[0].age, 1);
    }

    #[test]
    fn test_exhausted_rabbits_are_culled() {
        let mut sim = SimulationEngine::empty(scenario_config(5)).unwrap();
        sim.add_rabbit_at(Position::new(0, 0)).unwrap().energy = 1;
        sim.add_rabbit_at(Position::new(2, 2)).unwrap().energy = 3;

        let report = sim.step();

        assert_eq!(report.deaths, 1);
        assert_eq!(sim.rabbit_count(), 1);
        assert_eq!(sim.rabbits()[0].energy, 2);
        assert_eq!(sim.world().rabbit_cell_count(), 1);
        assert!(sim.verify_invariants().is_ok());
    }

    #[test]
    fn test_blocked_rabbit_survives_without_paying() {
        let config = SimulationConfig {
            world_config: WorldConfig {
                width: 1,
                height: 1,
                ..scenario_config(5).world_config
            },
            ..scenario_config(5)
        };
        let mut sim = SimulationEngine::empty(config).unwrap();
        sim.add_rabbit_at(Position::new(0, 0)).unwrap().energy = 1;

        for _ in 0..5 {
            let report = sim.step();
            assert_eq!(report.blocked_moves, 1);
        }
        assert_eq!(sim.rabbits()[0].energy, 1);
    }

    #[test]
    fn test_cull_preserves_survivor_order() {
        let config = SimulationConfig {
            world_config: WorldConfig {
                width: 10,
                height: 10,
                ..scenario_config(5).world_config
            },
            ..scenario_config(5)
        };
        let mut sim = SimulationEngine::empty(config).unwrap();
        let energies = [4, 1, 5, 1, 1, 6];
        for (i, energy) in energies.iter().enumerate() {
            let i = i as i32;
            let position = Position::new((i % 3) * 3, (i / 3) * 4);
            sim.add_rabbit_at(position).unwrap().energy = *energy;
        }
        let ids: Vec<_> = sim.rabbits().iter().map(|r| r.id).collect();

        sim.step();

        let survivors: Vec<_> = sim.rabbits().iter().map(|r| r.id).collect();
        assert_eq!(survivors, vec![ids[0], ids[2], ids[5]]);
    }

    #[test]
    fn test_newborn_with_no_energy_is_culled_at_birth() {
        let world = World::new(
            WorldConfig {
                width: 4,
                height: 4,
                grass_spawn_probability: 0.0,
                grass_energy_gain: 10,
            },
            EnergyConfig {
                initial_energy: 0,
                reproduce_threshold: 8,
                reproduce_cost: 3,
            },
        )
        .unwrap();
        let mut sim = SimulationEngine::with_world(world, 3);
        sim.add_rabbit_at(Position::new(1, 1)).unwrap().energy = 20;

        let report = sim.step();

        assert_eq!(report.births, 1);
        assert_eq!(report.deaths, 1);
        assert_eq!(sim.rabbit_count(), 1);
        assert_eq!(sim.rabbits()[0].energy, 16);
        assert_eq!(sim.world().rabbit_cell_count(), 1);
    }

    #[test]
    fn test_population_history_tracks_each_tick() {
        let mut sim = SimulationEngine::new(busy_config(8)).unwrap();
        for _ in 0..25 {
            sim.step();
        }
        let history = sim.history();
        assert_eq!(history.len(), 26);
        let latest = history.latest().unwrap();
        assert_eq!(latest.tick, 25);
        assert_eq!(latest.rabbits, sim.rabbit_count());
        assert_eq!(latest.grass, sim.grass_count());
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = SimulationEngine::new(busy_config(21)).unwrap();
        let mut b = SimulationEngine::new(busy_config(21)).unwrap();
        let summary_a = a.run(60);
        let summary_b = b.run(60);

        assert_eq!(a.history().samples(), b.history().samples());
        assert_eq!(a.rabbits(), b.rabbits());
        assert_eq!(summary_a.totals, summary_b.totals);
    }

    #[test]
    fn test_run_summary() {
        let mut sim = SimulationEngine::new(busy_config(4)).unwrap();
        let summary = sim.run(40);

        assert_eq!(summary.ticks_run, 40);
        assert_eq!(summary.final_tick, 40);
        assert_eq!(summary.final_rabbits, sim.rabbit_count());
        assert_eq!(summary.final_grass, sim.grass_count());
        assert!(summary.peak_rabbits >= 30);
        assert_eq!(summary.totals, *sim.totals());
    }

    #[test]
    fn test_starving_population_goes_extinct() {
        let mut config = busy_config(2);
        config.world_config.grass_spawn_probability = 0.0;
        let mut sim = SimulationEngine::new(config).unwrap();

        // Nobody can move more than 10 times without food.
        let summary = sim.run(40);
        assert_eq!(summary.final_rabbits, 0);
        assert!(summary.extinct_at.is_some());
        assert_eq!(sim.world().rabbit_cell_count(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_invariants_hold_every_tick(seed in any::<u64>(), ticks in 1u64..40) {
            let mut sim = SimulationEngine::new(busy_config(seed)).unwrap();
            for _ in 0..ticks {
                sim.step();
                prop_assert!(sim.verify_invariants().is_ok());

                let distinct: HashSet<Position> = sim.rabbit_positions().collect();
                prop_assert_eq!(distinct.len(), sim.rabbit_count());
                prop_assert!(sim.rabbits().iter().all(|r| r.is_alive()));

                let grass: HashSet<Position> = sim.grass_positions().collect();
                prop_assert_eq!(grass.len(), sim.grass_count());
                prop_assert!(grass.iter().all(|p| sim.world().grass_at(*p)));
            }
        }
    }
}
