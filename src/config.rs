use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{BuildingKind, DisasterKind, ResourceKind};
use crate::error::{Result, SimError};

/// Every tunable constant of the simulation, fixed for the lifetime of an engine.
///
/// Missing keys in a scenario file fall back to the values of the built-in
/// Windsor kingdom, so a scenario only needs to list what it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub start_year: i32,
    pub end_year: i32,
    /// Wall-clock seconds the whole timeline takes to play out.
    pub real_time_duration_secs: f64,

    pub initial_population: u64,
    pub initial_resources: f64,
    pub capital_initial_population: u64,
    pub capital_initial_resources: f64,
    pub minimum_population: u64,

    pub base_production: f64,
    pub production_per_capita: f64,
    pub gold_base_production: f64,
    pub gold_per_capita: f64,
    pub consumption_per_capita: f64,
    pub capital_tax_rate: f64,
    pub building_bonus: f64,

    pub survival_base: f64,
    pub survival_per_capita: f64,
    pub growth_threshold_base: f64,
    pub growth_threshold_per_capita: f64,
    pub max_growth_rate: f64,
    pub max_decline_rate: f64,

    pub trade_efficiency: f64,
    pub minimum_trade_amount: f64,
    pub route_connections: usize,
    pub capital_route_connections: usize,

    pub event_base_chance: f64,
    pub max_disaster_targets: usize,
    pub pirate_loss_factor: f64,
    pub granary_drought_factor: f64,
    pub plague_death_rate: f64,
    pub wall_plague_factor: f64,

    pub score_weights: SustainabilityWeights,
    pub buildings: BTreeMap<BuildingKind, BuildingSpec>,
    pub disasters: BTreeMap<DisasterKind, DisasterSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingSpec {
    pub name: String,
    pub cost: BTreeMap<ResourceKind, f64>,
    pub effect: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisasterSpec {
    pub name: String,
    pub duration_months: u32,
    pub effect: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SustainabilityWeights {
    pub resource_balance: f64,
    pub population_stability: f64,
    pub trade_efficiency: f64,
    pub disaster_recovery: f64,
    pub building_diversity: f64,
}

impl SustainabilityWeights {
    pub fn total(&self) -> f64 {
        self.resource_balance
            + self.population_stability
            + self.trade_efficiency
            + self.disaster_recovery
            + self.building_diversity
    }
}

impl Default for SustainabilityWeights {
    fn default() -> Self {
        Self {
            resource_balance: 300.0,
            population_stability: 250.0,
            trade_efficiency: 200.0,
            disaster_recovery: 150.0,
            building_diversity: 100.0,
        }
    }
}

pub const MONTHS_PER_YEAR: u32 = 12;

impl SimConfig {
    pub fn seconds_per_year(&self) -> f64 {
        self.real_time_duration_secs / f64::from(self.end_year - self.start_year)
    }

    /// Wall-clock length of one simulated month; also the travel time of every cart.
    pub fn seconds_per_month(&self) -> f64 {
        self.seconds_per_year() / f64::from(MONTHS_PER_YEAR)
    }

    pub fn total_months(&self) -> u32 {
        (self.end_year - self.start_year) as u32 * MONTHS_PER_YEAR
    }

    pub fn building(&self, kind: BuildingKind) -> Option<&BuildingSpec> {
        self.buildings.get(&kind)
    }

    pub fn disaster(&self, kind: DisasterKind) -> Option<&DisasterSpec> {
        self.disasters.get(&kind)
    }

    pub fn validate(&self) -> Result<()> {
        if self.end_year <= self.start_year {
            return Err(SimError::InvalidConfig(format!(
                "end year {} must come after start year {}",
                self.end_year, self.start_year
            )));
        }
        if !(self.real_time_duration_secs > 0.0) {
            return Err(SimError::InvalidConfig(
                "real time duration must be positive".into(),
            ));
        }
        if self.growth_threshold_base <= self.survival_base
            || self.growth_threshold_per_capita < self.survival_per_capita
        {
            return Err(SimError::InvalidConfig(
                "growth threshold must exceed the survival threshold".into(),
            ));
        }
        if self.max_decline_rate > 0.0 || self.max_growth_rate < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "growth bounds [{}, {}] must straddle zero",
                self.max_decline_rate, self.max_growth_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.event_base_chance) {
            return Err(SimError::InvalidConfig(format!(
                "event chance {} is not a probability",
                self.event_base_chance
            )));
        }
        if self.max_disaster_targets == 0 {
            return Err(SimError::InvalidConfig(
                "disasters must be able to hit at least one settlement".into(),
            ));
        }
        if (self.score_weights.total() - 1000.0).abs() > 1e-6 {
            return Err(SimError::InvalidConfig(format!(
                "sustainability weights sum to {}, expected 1000",
                self.score_weights.total()
            )));
        }
        if let Some(kind) = BuildingKind::ALL
            .iter()
            .find(|kind| !self.buildings.contains_key(kind))
        {
            return Err(SimError::InvalidConfig(format!(
                "building catalog is missing {kind:?}"
            )));
        }
        if let Some(kind) = DisasterKind::ALL
            .iter()
            .find(|kind| !self.disasters.contains_key(kind))
        {
            return Err(SimError::InvalidConfig(format!(
                "disaster catalog is missing {kind:?}"
            )));
        }
        if self.disasters.values().any(|spec| spec.duration_months == 0) {
            return Err(SimError::InvalidConfig(
                "disaster durations must be at least one month".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start_year: 1450,
            end_year: 1470,
            real_time_duration_secs: 600.0,
            initial_population: 1000,
            initial_resources: 250.0,
            capital_initial_population: 5000,
            capital_initial_resources: 1250.0,
            minimum_population: 100,
            base_production: 20.0,
            production_per_capita: 0.22,
            gold_base_production: 10.0,
            gold_per_capita: 0.05,
            consumption_per_capita: 0.04,
            capital_tax_rate: 0.005,
            building_bonus: 1.05,
            survival_base: 10.0,
            survival_per_capita: 0.004,
            growth_threshold_base: 150.0,
            growth_threshold_per_capita: 0.020,
            max_growth_rate: 0.03,
            max_decline_rate: -0.03,
            trade_efficiency: 0.98,
            minimum_trade_amount: 5.0,
            route_connections: 3,
            capital_route_connections: 4,
            event_base_chance: 0.20,
            max_disaster_targets: 3,
            pirate_loss_factor: 0.5,
            granary_drought_factor: 0.5,
            plague_death_rate: 0.10,
            wall_plague_factor: 0.70,
            score_weights: SustainabilityWeights::default(),
            buildings: default_buildings(),
            disasters: default_disasters(),
        }
    }
}

fn building(name: &str, cost: &[(ResourceKind, f64)], effect: &str) -> BuildingSpec {
    BuildingSpec {
        name: name.to_string(),
        cost: cost.iter().copied().collect(),
        effect: effect.to_string(),
    }
}

fn default_buildings() -> BTreeMap<BuildingKind, BuildingSpec> {
    use ResourceKind::*;
    BTreeMap::from([
        (
            BuildingKind::Wall,
            building(
                "City Wall",
                &[(Iron, 150.0), (Wood, 80.0), (Gold, 300.0)],
                "Reduces plague effects by 30%",
            ),
        ),
        (
            BuildingKind::Camp,
            building(
                "Refugee Camp",
                &[(Wood, 100.0), (Livestock, 75.0), (Grain, 75.0), (Gold, 200.0)],
                "Increases production by 5%",
            ),
        ),
        (
            BuildingKind::Monument,
            building(
                "King's Monument",
                &[(Gold, 500.0), (Iron, 100.0)],
                "Does nothing (prestige)",
            ),
        ),
        (
            BuildingKind::Granary,
            building(
                "Granary Complex",
                &[(Gold, 300.0), (Wood, 150.0), (Grain, 100.0)],
                "50% grain production during drought",
            ),
        ),
        (
            BuildingKind::Hotel,
            building(
                "Royal Hotel",
                &[(Gold, 400.0), (Iron, 80.0)],
                "Increases gold production by 5%",
            ),
        ),
    ])
}

fn disaster(name: &str, duration_months: u32, effect: &str) -> DisasterSpec {
    DisasterSpec {
        name: name.to_string(),
        duration_months,
        effect: effect.to_string(),
    }
}

fn default_disasters() -> BTreeMap<DisasterKind, DisasterSpec> {
    BTreeMap::from([
        (
            DisasterKind::Drought,
            disaster("Drought", 3, "No livestock or grain production"),
        ),
        (
            DisasterKind::PirateRaid,
            disaster("Pirate Raid", 1, "Steals 50% of resources"),
        ),
        (
            DisasterKind::LightningStorm,
            disaster("Lightning Storm", 2, "Blocks trade routes"),
        ),
        (
            DisasterKind::Plague,
            disaster("Plague", 4, "Cuts trade, kills 10% population/month"),
        ),
        (
            DisasterKind::LaborStrike,
            disaster("Labor Strike", 3, "No wood or iron production"),
        ),
    ])
}
