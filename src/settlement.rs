use serde::{Deserialize, Serialize};

use crate::components::{
    ActiveDisaster, BuildingKind, DisasterKind, Position, ResourceKind, Stockpile,
};
use crate::config::SimConfig;

/// Growth rate reported by a settlement that is (or has just become) dead.
pub const COLLAPSE_RATE: f64 = -1.0;

/// Static description of a settlement, as listed in a scenario roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementSpec {
    pub name: String,
    #[serde(default)]
    pub produces: Option<ResourceKind>,
    pub position: Position,
    #[serde(default)]
    pub is_capital: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Any stock below this kills the settlement.
    pub survival: f64,
    /// Stock above this is surplus; below it is a deficit.
    pub growth: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    pub name: String,
    pub produces: Option<ResourceKind>,
    pub position: Position,
    pub is_capital: bool,

    pub population: u64,
    pub growth_rate: f64,
    pub resources: Stockpile,
    pub buildings: Vec<BuildingKind>,
    pub active_events: Vec<ActiveDisaster>,
    pub population_history: Vec<u64>,
    pub growth_history: Vec<f64>,
    pub event_log: Vec<String>,
    pub connected_routes: Vec<String>,
    pub is_alive: bool,
}

impl Settlement {
    pub fn new(spec: &SettlementSpec, config: &SimConfig) -> Self {
        let (population, initial) = if spec.is_capital {
            (
                config.capital_initial_population,
                config.capital_initial_resources,
            )
        } else {
            (config.initial_population, config.initial_resources)
        };
        Self {
            name: spec.name.clone(),
            produces: spec.produces,
            position: spec.position,
            is_capital: spec.is_capital,
            population,
            growth_rate: 0.0,
            resources: Stockpile::uniform(initial),
            buildings: Vec::new(),
            active_events: Vec::new(),
            population_history: Vec::new(),
            growth_history: Vec::new(),
            event_log: Vec::new(),
            connected_routes: Vec::new(),
            is_alive: true,
        }
    }

    pub fn calculate_thresholds(&self, config: &SimConfig) -> Thresholds {
        let population = self.population as f64;
        Thresholds {
            survival: config.survival_base + population * config.survival_per_capita,
            growth: config.growth_threshold_base + population * config.growth_threshold_per_capita,
        }
    }

    pub fn calculate_production(&self, config: &SimConfig) -> Stockpile {
        let population = self.population as f64;
        let mut production = Stockpile::default();

        if let Some(resource) = self.produces.filter(|_| !self.is_capital) {
            let bonus = self.bonus_for(BuildingKind::Camp, config);
            let mut amount =
                (config.base_production + population * config.production_per_capita) * bonus;

            if self.has_event_type(DisasterKind::Drought)
                && DisasterKind::Drought.halts_production_of(resource)
            {
                if resource == ResourceKind::Grain && self.has_building(BuildingKind::Granary) {
                    amount *= config.granary_drought_factor;
                } else {
                    amount = 0.0;
                }
            }
            if self.has_event_type(DisasterKind::LaborStrike)
                && DisasterKind::LaborStrike.halts_production_of(resource)
            {
                amount = 0.0;
            }

            production[resource] = amount;
        }

        production.gold = (config.gold_base_production + population * config.gold_per_capita)
            * self.bonus_for(BuildingKind::Hotel, config);
        production
    }

    pub fn calculate_consumption(&self, config: &SimConfig) -> Stockpile {
        Stockpile::uniform(self.population as f64 * config.consumption_per_capita)
    }

    /// Evaluates this month's growth, killing the settlement if any stock has
    /// dropped below the survival threshold.
    pub fn calculate_growth_rate(&mut self, config: &SimConfig) -> f64 {
        if !self.is_alive {
            return COLLAPSE_RATE;
        }

        let thresholds = self.calculate_thresholds(config);
        if let Some((resource, amount)) = self
            .resources
            .iter()
            .find(|(_, amount)| *amount < thresholds.survival)
        {
            tracing::info!(
                settlement = %self.name,
                %resource,
                stock = amount,
                threshold = thresholds.survival,
                "settlement collapsed"
            );
            self.is_alive = false;
            return COLLAPSE_RATE;
        }

        let (surplus, deficit) = self.resources.iter().fold(
            (0.0, 0.0),
            |(surplus, deficit), (_, amount)| {
                if amount >= thresholds.growth {
                    (surplus + amount - thresholds.growth, deficit)
                } else {
                    (surplus, deficit + thresholds.growth - amount)
                }
            },
        );

        let capacity = thresholds.growth * ResourceKind::COUNT as f64;
        if deficit > 0.0 {
            (-deficit / capacity).max(config.max_decline_rate)
        } else {
            (surplus / capacity).min(config.max_growth_rate)
        }
    }

    pub fn update_month(
        &mut self,
        production: &Stockpile,
        consumption: &Stockpile,
        tax: f64,
        config: &SimConfig,
    ) {
        if !self.is_alive {
            self.record_history();
            return;
        }

        for resource in ResourceKind::ALL {
            self.resources[resource] += production[resource];
        }
        for resource in ResourceKind::ALL {
            self.resources[resource] -= consumption[resource];
        }
        if !self.is_capital && tax > 0.0 {
            self.resources.gold -= tax;
        }

        self.growth_rate = self.calculate_growth_rate(config);
        if self.is_alive {
            let grown = (self.population as f64 * (1.0 + self.growth_rate)).floor() as u64;
            self.population = grown.max(config.minimum_population);
        }

        self.active_events.retain_mut(|event| {
            if event.remaining_months > 1 {
                event.remaining_months -= 1;
                true
            } else {
                false
            }
        });

        if self.is_alive {
            let plagues = self
                .active_events
                .iter()
                .filter(|event| event.kind == DisasterKind::Plague)
                .count();
            for _ in 0..plagues {
                let mut death_rate = config.plague_death_rate;
                if self.has_building(BuildingKind::Wall) {
                    death_rate *= config.wall_plague_factor;
                }
                // Plague deaths may take a settlement under the growth floor.
                self.population = (self.population as f64 * (1.0 - death_rate)).floor() as u64;
            }
        }

        self.record_history();
    }

    pub fn add_event(&mut self, kind: DisasterKind, config: &SimConfig) {
        let (name, duration) = match config.disaster(kind) {
            Some(spec) => (spec.name.clone(), spec.duration_months),
            None => (format!("{kind:?}"), 1),
        };
        self.active_events.push(ActiveDisaster {
            kind,
            remaining_months: duration,
        });
        self.event_log.push(name);

        if kind == DisasterKind::PirateRaid {
            self.resources.scale(config.pirate_loss_factor);
        }
    }

    pub fn has_event_type(&self, kind: DisasterKind) -> bool {
        self.active_events.iter().any(|event| event.kind == kind)
    }

    pub fn has_building(&self, kind: BuildingKind) -> bool {
        self.buildings.contains(&kind)
    }

    /// Plague and lightning stop a settlement both sending and receiving goods.
    pub fn is_trade_blocked(&self) -> bool {
        self.active_events.iter().any(|event| event.kind.blocks_trade())
    }

    pub fn can_afford_building(&self, kind: BuildingKind, config: &SimConfig) -> bool {
        if self.has_building(kind) {
            return false;
        }
        let Some(spec) = config.building(kind) else {
            return false;
        };
        spec.cost
            .iter()
            .all(|(&resource, &amount)| self.resources[resource] >= amount)
    }

    pub fn build_structure(&mut self, kind: BuildingKind, config: &SimConfig) -> bool {
        if !self.can_afford_building(kind, config) {
            return false;
        }
        let Some(spec) = config.building(kind) else {
            return false;
        };
        for (&resource, &amount) in &spec.cost {
            self.resources[resource] -= amount;
        }
        self.buildings.push(kind);
        self.event_log.push(format!("Built {}", spec.name));
        true
    }

    fn bonus_for(&self, kind: BuildingKind, config: &SimConfig) -> f64 {
        if self.has_building(kind) {
            config.building_bonus
        } else {
            1.0
        }
    }

    fn record_history(&mut self) {
        self.population_history.push(self.population);
        self.growth_history.push(self.growth_rate);
    }
}
