use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::components::{ActiveDisaster, BuildingKind, Position, ResourceKind, Stockpile};
use crate::score::ScoreBreakdown;
use crate::settlement::Settlement;
use crate::systems::{Cart, DisasterRecord};

/// Read-only view of the kingdom handed to presentation code.
#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub year: i32,
    pub month: u32,
    pub time_label: String,
    pub progress: f64,
    pub paused: bool,
    pub complete: bool,
    pub sustainability_score: u32,
    pub total_trades: u64,
    pub total_deaths: u64,
    pub total_events: usize,
    pub settlements: Vec<SettlementSnapshot>,
    pub carts: Vec<CartSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SettlementSnapshot {
    pub name: String,
    pub produces: Option<ResourceKind>,
    pub position: Position,
    pub is_capital: bool,
    pub is_alive: bool,
    pub population: u64,
    pub growth_rate: f64,
    pub resources: Stockpile,
    pub buildings: Vec<BuildingKind>,
    pub active_disasters: Vec<ActiveDisaster>,
    pub connected_routes: Vec<String>,
}

impl From<&Settlement> for SettlementSnapshot {
    fn from(settlement: &Settlement) -> Self {
        Self {
            name: settlement.name.clone(),
            produces: settlement.produces,
            position: settlement.position,
            is_capital: settlement.is_capital,
            is_alive: settlement.is_alive,
            population: settlement.population,
            growth_rate: settlement.growth_rate,
            resources: settlement.resources,
            buildings: settlement.buildings.clone(),
            active_disasters: settlement.active_events.clone(),
            connected_routes: settlement.connected_routes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartSnapshot {
    pub from: String,
    pub to: String,
    pub position: Position,
    pub progress: f64,
    pub cargo: BTreeMap<ResourceKind, f64>,
}

impl From<&Cart> for CartSnapshot {
    fn from(cart: &Cart) -> Self {
        Self {
            from: cart.from.clone(),
            to: cart.to.clone(),
            position: cart.position,
            progress: cart.progress,
            cargo: cart.cargo.clone(),
        }
    }
}

/// End-of-run summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scenario: String,
    pub seed: u64,
    pub final_time: String,
    pub final_score: u32,
    pub breakdown: ScoreBreakdown,
    pub score_history: Vec<u32>,
    pub total_trades: u64,
    pub total_deaths: u64,
    pub total_population: u64,
    pub survivors: Vec<String>,
    pub collapsed: Vec<String>,
    pub disasters: Vec<DisasterRecord>,
}

impl RunReport {
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Dumps a snapshot every `interval_months` simulated months. Output only;
/// runs are never resumed from these files.
pub struct SnapshotWriter {
    output_dir: PathBuf,
    interval_months: u64,
}

impl SnapshotWriter {
    pub fn new(output_dir: impl AsRef<Path>, interval_months: u64) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            interval_months,
        }
    }

    pub fn maybe_write(&self, month_index: u64, snapshot: &WorldSnapshot) -> Result<Option<PathBuf>> {
        if self.interval_months == 0 || month_index == 0 || month_index % self.interval_months != 0 {
            return Ok(None);
        }

        let dir = self.output_dir.join(&snapshot.scenario);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create snapshot dir {}", dir.display()))?;
        let file_path = dir.join(format!("month_{month_index:04}.json"));
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&file_path, json)
            .with_context(|| format!("failed to write snapshot {}", file_path.display()))?;
        tracing::debug!(path = %file_path.display(), "snapshot written");
        Ok(Some(file_path))
    }
}
