use std::time::Instant;

use serde::Serialize;

use crate::components::BuildingKind;
use crate::config::{SimConfig, MONTHS_PER_YEAR};
use crate::error::Result;
use crate::rng::{RngManager, SystemRng};
use crate::scenario::Scenario;
use crate::score::{ScoreBreakdown, ScoreInputs};
use crate::settlement::{Settlement, SettlementSpec};
use crate::snapshot::{CartSnapshot, RunReport, SettlementSnapshot, WorldSnapshot};
use crate::systems::{Cart, DisasterRecord, DisasterSystem, EconomySystem, TradeSystem};
use crate::world::World;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Score shown before the first month has been evaluated.
const INITIAL_SCORE: u32 = 500;

pub struct SystemContext<'a> {
    pub year: i32,
    pub month: u32,
    pub config: &'a SimConfig,
}

/// A stage of the monthly tick. Each system draws from its own named RNG stream.
pub trait System {
    fn name(&self) -> &str;
    fn run(&mut self, ctx: &SystemContext<'_>, world: &mut World, rng: &mut SystemRng<'_>);
}

#[derive(Clone, Debug, Serialize)]
pub struct SystemRunReport {
    pub name: String,
    pub duration_ms: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    pub disaster: Option<DisasterRecord>,
    pub tax_collected: f64,
    pub trades: usize,
    pub alive: usize,
    pub score: u32,
    pub breakdown: ScoreBreakdown,
    pub system_reports: Vec<SystemRunReport>,
}

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
}

/// Drives the kingdom through simulated time.
///
/// The caller feeds real-time deltas to [`Engine::update`]; every time a
/// month's worth of unpaused time has accumulated the engine runs, in order,
/// disasters, the economy (production, consumption, tax), trade, and scoring.
pub struct Engine {
    settings: EngineSettings,
    config: SimConfig,
    world: World,
    rng: RngManager,
    disasters: DisasterSystem,
    economy: EconomySystem,
    trade: TradeSystem,

    current_year: i32,
    current_month: u32,
    elapsed_time: f64,
    month_timer: f64,
    paused: bool,
    complete: bool,

    sustainability_score: u32,
    sustainability_history: Vec<u32>,
    last_breakdown: ScoreBreakdown,
    total_trades: u64,
    total_deaths: u64,
}

impl Engine {
    pub fn new(
        settings: EngineSettings,
        config: SimConfig,
        roster: &[SettlementSpec],
    ) -> Result<Self> {
        config.validate()?;
        let world = World::from_roster(roster, &config)?;
        tracing::info!(
            scenario = %settings.scenario_name,
            seed = settings.seed,
            settlements = world.len(),
            "engine ready"
        );

        Ok(Self {
            rng: RngManager::new(settings.seed),
            current_year: config.start_year,
            current_month: 1,
            settings,
            config,
            world,
            disasters: DisasterSystem::new(),
            economy: EconomySystem::new(),
            trade: TradeSystem::new(),
            elapsed_time: 0.0,
            month_timer: 0.0,
            paused: false,
            complete: false,
            sustainability_score: INITIAL_SCORE,
            sustainability_history: Vec::new(),
            last_breakdown: ScoreBreakdown::default(),
            total_trades: 0,
            total_deaths: 0,
        })
    }

    pub fn from_scenario(scenario: &Scenario) -> Result<Self> {
        Self::new(
            EngineSettings {
                scenario_name: scenario.name.clone(),
                seed: scenario.seed,
            },
            scenario.config.clone(),
            &scenario.settlements,
        )
    }

    /// Advances the clock by `dt` real seconds. Returns the summary of the
    /// month that closed during this step, if any.
    ///
    /// Carts keep moving while paused or after completion.
    pub fn update(&mut self, dt: f64) -> Option<MonthSummary> {
        let mut summary = None;

        if !self.paused && !self.complete {
            self.elapsed_time += dt;
            self.month_timer += dt;

            let month_length = self.config.seconds_per_month();
            if self.month_timer >= month_length {
                self.month_timer -= month_length;
                summary = Some(self.advance_month());
            }

            if self.current_year >= self.config.end_year {
                self.complete = true;
                tracing::info!(
                    year = self.current_year,
                    score = self.sustainability_score,
                    survivors = self.world.alive_count(),
                    "simulation complete"
                );
            }
        }

        self.trade.update(dt, &mut self.world);
        summary
    }

    /// Steps with a fixed `dt` until the end year is reached, handing every
    /// closed month to `on_month`.
    pub fn run_to_completion<F>(&mut self, dt: f64, mut on_month: F)
    where
        F: FnMut(&Engine, &MonthSummary),
    {
        if !(dt > 0.0) {
            return;
        }
        self.paused = false;
        while !self.complete {
            if let Some(summary) = self.update(dt) {
                on_month(self, &summary);
            }
        }
    }

    fn advance_month(&mut self) -> MonthSummary {
        self.current_month += 1;
        if self.current_month > MONTHS_PER_YEAR {
            self.current_month = 1;
            self.current_year += 1;
        }

        let ctx = SystemContext {
            year: self.current_year,
            month: self.current_month,
            config: &self.config,
        };
        let events_before = self.disasters.total_events();
        let system_reports = vec![
            run_system(&mut self.disasters, &ctx, &mut self.world, &mut self.rng),
            run_system(&mut self.economy, &ctx, &mut self.world, &mut self.rng),
            run_system(&mut self.trade, &ctx, &mut self.world, &mut self.rng),
        ];
        let disaster = if self.disasters.total_events() > events_before {
            self.disasters.history().last().cloned()
        } else {
            None
        };

        let trades = self.trade.last_transfer_count();
        self.total_trades += trades as u64;

        self.update_sustainability_score();

        // Re-adds every dead settlement each month, so this is a cumulative
        // tally of dead settlement-months rather than a count of collapses.
        self.total_deaths += self.world.dead_count() as u64;

        tracing::debug!(
            year = self.current_year,
            month = self.current_month,
            trades,
            score = self.sustainability_score,
            "month closed"
        );

        MonthSummary {
            year: self.current_year,
            month: self.current_month,
            disaster,
            tax_collected: self.economy.last_tax_collected(),
            trades,
            alive: self.world.alive_count(),
            score: self.sustainability_score,
            breakdown: self.last_breakdown,
            system_reports,
        }
    }

    fn update_sustainability_score(&mut self) {
        let inputs = ScoreInputs {
            year: self.current_year,
            month: self.current_month,
            total_trades: self.total_trades,
            total_deaths: self.total_deaths,
            disaster_events: self.disasters.total_events(),
        };
        self.last_breakdown = ScoreBreakdown::evaluate(&self.world, &self.config, &inputs);
        self.sustainability_score = self.last_breakdown.weighted_total(&self.config);
        self.sustainability_history.push(self.sustainability_score);
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Orders construction in the named settlement. Returns false, changing
    /// nothing, when the settlement is unknown or dead, the building already
    /// stands, or the settlement cannot pay for it.
    pub fn build(&mut self, settlement: &str, building: BuildingKind) -> bool {
        let Some(id) = self.world.find_by_name(settlement) else {
            return false;
        };
        let target = &mut self.world[id];
        if !target.is_alive {
            return false;
        }
        let built = target.build_structure(building, &self.config);
        if built {
            tracing::info!(settlement, ?building, "construction finished");
        }
        built
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn scenario_name(&self) -> &str {
        &self.settings.scenario_name
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn settlements(&self) -> &[Settlement] {
        self.world.settlements()
    }

    pub fn settlement(&self, name: &str) -> Option<&Settlement> {
        self.world.find_by_name(name).map(|id| &self.world[id])
    }

    pub fn capital(&self) -> Option<&Settlement> {
        self.world.capital().map(|id| &self.world[id])
    }

    pub fn active_carts(&self) -> &[Cart] {
        self.trade.active_carts()
    }

    pub fn disaster_history(&self) -> &[DisasterRecord] {
        self.disasters.history()
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn current_month(&self) -> u32 {
        self.current_month
    }

    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn sustainability_score(&self) -> u32 {
        self.sustainability_score
    }

    pub fn sustainability_history(&self) -> &[u32] {
        &self.sustainability_history
    }

    pub fn score_breakdown(&self) -> ScoreBreakdown {
        self.last_breakdown
    }

    pub fn total_trades(&self) -> u64 {
        self.total_trades
    }

    pub fn total_deaths(&self) -> u64 {
        self.total_deaths
    }

    pub fn total_events(&self) -> usize {
        self.disasters.total_events()
    }

    /// Share of the timeline covered so far; month 1 of the start year counts as elapsed.
    pub fn progress(&self) -> f64 {
        let current = (self.current_year - self.config.start_year) as f64
            * f64::from(MONTHS_PER_YEAR)
            + f64::from(self.current_month);
        current / f64::from(self.config.total_months())
    }

    /// e.g. "Mar 1452".
    pub fn time_label(&self) -> String {
        let index = (self.current_month.clamp(1, MONTHS_PER_YEAR) - 1) as usize;
        format!("{} {}", MONTH_NAMES[index], self.current_year)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            scenario: self.settings.scenario_name.clone(),
            year: self.current_year,
            month: self.current_month,
            time_label: self.time_label(),
            progress: self.progress(),
            paused: self.paused,
            complete: self.complete,
            sustainability_score: self.sustainability_score,
            total_trades: self.total_trades,
            total_deaths: self.total_deaths,
            total_events: self.total_events(),
            settlements: self
                .world
                .settlements()
                .iter()
                .map(SettlementSnapshot::from)
                .collect(),
            carts: self.trade.active_carts().iter().map(CartSnapshot::from).collect(),
        }
    }

    pub fn report(&self) -> RunReport {
        let (survivors, collapsed): (Vec<&Settlement>, Vec<&Settlement>) = self
            .world
            .settlements()
            .iter()
            .partition(|settlement| settlement.is_alive);
        RunReport {
            scenario: self.settings.scenario_name.clone(),
            seed: self.settings.seed,
            final_time: self.time_label(),
            final_score: self.sustainability_score,
            breakdown: self.last_breakdown,
            score_history: self.sustainability_history.clone(),
            total_trades: self.total_trades,
            total_deaths: self.total_deaths,
            total_population: self.world.total_population(),
            survivors: survivors.iter().map(|s| s.name.clone()).collect(),
            collapsed: collapsed.iter().map(|s| s.name.clone()).collect(),
            disasters: self.disasters.history().to_vec(),
        }
    }
}

fn run_system(
    system: &mut dyn System,
    ctx: &SystemContext<'_>,
    world: &mut World,
    rng: &mut RngManager,
) -> SystemRunReport {
    let start = Instant::now();
    let mut stream = rng.stream(system.name());
    system.run(ctx, world, &mut stream);
    SystemRunReport {
        name: system.name().to_string(),
        duration_ms: start.elapsed().as_secs_f64() * 1_000.0,
    }
}
