//! Population statistics gathered while the simulation runs.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Rabbit and grass counts observed after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationSample {
    pub tick: u64,
    pub rabbits: usize,
    pub grass: usize,
}

/// The rabbit and grass population series, one sample per tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationHistory {
    samples: Vec<PopulationSample>,
}

impl PopulationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sample: PopulationSample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[PopulationSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&PopulationSample> {
        self.samples.last()
    }

    pub fn peak_rabbits(&self) -> usize {
        self.samples.iter().map(|s| s.rabbits).max().unwrap_or(0)
    }

    pub fn peak_grass(&self) -> usize {
        self.samples.iter().map(|s| s.grass).max().unwrap_or(0)
    }

    pub fn mean_rabbits(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: usize = self.samples.iter().map(|s| s.rabbits).sum();
        total as f64 / self.samples.len() as f64
    }

    /// First tick at which no rabbit was left alive
    pub fn extinct_at(&self) -> Option<u64> {
        self.samples.iter().find(|s| s.rabbits == 0).map(|s| s.tick)
    }
}

/// What happened during a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub moves: u32,
    pub blocked_moves: u32,
    pub grass_spawned: u32,
    pub grass_eaten: u32,
    pub births: u32,
    /// Rabbits that paid for reproduction but found no free cell
    pub failed_births: u32,
    pub deaths: u32,
}

/// Running totals over many ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTotals {
    pub moves: u64,
    pub blocked_moves: u64,
    pub grass_spawned: u64,
    pub grass_eaten: u64,
    pub births: u64,
    pub failed_births: u64,
    pub deaths: u64,
}

impl AddAssign<&TickReport> for EventTotals {
    fn add_assign(&mut self, report: &TickReport) {
        self.moves += report.moves as u64;
        self.blocked_moves += report.blocked_moves as u64;
        self.grass_spawned += report.grass_spawned as u64;
        self.grass_eaten += report.grass_eaten as u64;
        self.births += report.births as u64;
        self.failed_births += report.failed_births as u64;
        self.deaths += report.deaths as u64;
    }
}

/// Outcome of running the simulation for a number of ticks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks_run: u64,
    pub final_tick: u64,
    pub final_rabbits: usize,
    pub final_grass: usize,
    pub peak_rabbits: usize,
    pub peak_grass: usize,
    pub mean_rabbits: f64,
    pub extinct_at: Option<u64>,
    pub totals: EventTotals,
}
