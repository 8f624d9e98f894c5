use std::collections::BTreeSet;

use serde::Serialize;

use crate::components::ResourceKind;
use crate::config::{SimConfig, MONTHS_PER_YEAR};
use crate::world::World;

/// Stock ratio (max over min) beyond 1 that wipes out the balance score.
const BALANCE_RATIO_SPAN: f64 = 10.0;
const GROWTH_STABILITY_GAIN: f64 = 5.0;
/// Trades per month that earn full trade credit.
const TARGET_TRADES_PER_MONTH: f64 = 20.0;

/// Cumulative counters the score reads besides the world itself.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs {
    pub year: i32,
    pub month: u32,
    pub total_trades: u64,
    pub total_deaths: u64,
    pub disaster_events: usize,
}

/// Each component is in `[0, 1]` before weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub resource_balance: f64,
    pub population_stability: f64,
    pub trade_efficiency: f64,
    pub disaster_recovery: f64,
    pub building_diversity: f64,
}

impl ScoreBreakdown {
    pub fn evaluate(world: &World, config: &SimConfig, inputs: &ScoreInputs) -> Self {
        Self {
            resource_balance: resource_balance(world),
            population_stability: population_stability(world, inputs.total_deaths),
            trade_efficiency: trade_efficiency(config, inputs),
            disaster_recovery: disaster_recovery(world, inputs.disaster_events),
            building_diversity: building_diversity(world, config),
        }
    }

    pub fn weighted_total(&self, config: &SimConfig) -> u32 {
        let weights = &config.score_weights;
        let score = self.resource_balance * weights.resource_balance
            + self.population_stability * weights.population_stability
            + self.trade_efficiency * weights.trade_efficiency
            + self.disaster_recovery * weights.disaster_recovery
            + self.building_diversity * weights.building_diversity;
        score.clamp(0.0, weights.total()).floor() as u32
    }
}

fn resource_balance(world: &World) -> f64 {
    let totals: Vec<f64> = ResourceKind::ALL
        .iter()
        .map(|&resource| world.living().map(|s| s.resources[resource]).sum())
        .collect();

    let mean = totals.iter().sum::<f64>() / totals.len() as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    let max = totals.iter().copied().fold(f64::MIN, f64::max);
    let min = totals.iter().copied().fold(f64::MAX, f64::min);
    let ratio = max / (min + 1.0);
    (1.0 - (ratio - 1.0) / BALANCE_RATIO_SPAN).clamp(0.0, 1.0)
}

fn population_stability(world: &World, total_deaths: u64) -> f64 {
    let alive = world.alive_count();
    if alive == 0 {
        return 0.0;
    }
    let average_growth = world.living().map(|s| s.growth_rate).sum::<f64>() / alive as f64;
    let stability = (0.5 + average_growth * GROWTH_STABILITY_GAIN).clamp(0.0, 1.0);
    let death_penalty = total_deaths as f64 / world.len() as f64;
    (stability * (1.0 - death_penalty)).clamp(0.0, 1.0)
}

fn trade_efficiency(config: &SimConfig, inputs: &ScoreInputs) -> f64 {
    if inputs.month <= 1 {
        return 0.0;
    }
    let months = (inputs.year - config.start_year) as f64 * f64::from(MONTHS_PER_YEAR)
        + f64::from(inputs.month);
    let rate = inputs.total_trades as f64 / months;
    (rate / TARGET_TRADES_PER_MONTH).clamp(0.0, 1.0)
}

fn disaster_recovery(world: &World, disaster_events: usize) -> f64 {
    if disaster_events == 0 {
        return 0.5;
    }
    world.alive_count() as f64 / world.len() as f64
}

fn building_diversity(world: &World, config: &SimConfig) -> f64 {
    let kinds: BTreeSet<_> = world
        .living()
        .flat_map(|s| s.buildings.iter().copied())
        .collect();
    if kinds.is_empty() || config.buildings.is_empty() {
        return 0.0;
    }
    (kinds.len() as f64 / config.buildings.len() as f64).clamp(0.0, 1.0)
}
