use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::components::{Position, ResourceKind};
use crate::config::SimConfig;
use crate::settlement::SettlementSpec;

fn default_seed() -> u64 {
    1450
}

/// A named kingdom: its settlement roster plus the constants it runs under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub config: SimConfig,
    #[serde(default = "windsor_roster")]
    pub settlements: Vec<SettlementSpec>,
}

impl Scenario {
    /// The kingdom of Windsor: ten provinces around one capital.
    pub fn windsor() -> Self {
        Self {
            name: "windsor".to_string(),
            description: Some("Ten provinces trading around the capital, 1450-1470".to_string()),
            seed: default_seed(),
            config: SimConfig::default(),
            settlements: windsor_roster(),
        }
    }
}

fn province(name: &str, produces: ResourceKind, x: f64, y: f64) -> SettlementSpec {
    SettlementSpec {
        name: name.to_string(),
        produces: Some(produces),
        position: Position::new(x, y),
        is_capital: false,
    }
}

fn windsor_roster() -> Vec<SettlementSpec> {
    use ResourceKind::*;
    vec![
        province("Goblin Stadium", Wood, 150.0, 400.0),
        province("Bone Pit", Iron, 125.0, 280.0),
        province("Barbarian Bowl", Livestock, 450.0, 310.0),
        province("Pekkas Playhouse", Grain, 335.0, 205.0),
        province("Spell Valley", Wood, 300.0, 350.0),
        province("Builders Workshop", Iron, 400.0, 450.0),
        province("Royal Arena", Livestock, 700.0, 505.0),
        province("Frozen Peak", Grain, 450.0, 165.0),
        province("Jungle Arena", Wood, 685.0, 215.0),
        province("Hog Mountain", Iron, 600.0, 50.0),
        SettlementSpec {
            name: "Windsor (Capital)".to_string(),
            produces: None,
            position: Position::new(225.0, 80.0),
            is_capital: true,
        },
    ]
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario
            .config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(scenario)
    }
}
