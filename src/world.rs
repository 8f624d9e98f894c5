use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::components::ResourceKind;
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::settlement::{Settlement, SettlementSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SettlementId(usize);

impl SettlementId {
    pub fn raw(self) -> usize {
        self.0
    }
}

/// The settlement roster. Settlements are never removed, so ids stay valid
/// for the whole run; dead settlements simply stop taking part.
#[derive(Debug, Clone)]
pub struct World {
    settlements: Vec<Settlement>,
}

impl World {
    pub fn from_roster(roster: &[SettlementSpec], config: &SimConfig) -> Result<Self> {
        validate_roster(roster)?;
        let settlements = roster
            .iter()
            .map(|spec| Settlement::new(spec, config))
            .collect();
        let mut world = Self { settlements };
        world.setup_trade_routes(config);
        Ok(world)
    }

    /// Links every settlement to its nearest neighbours for route drawing.
    /// Matching ignores these routes entirely.
    fn setup_trade_routes(&mut self, config: &SimConfig) {
        let routes: Vec<Vec<String>> = self
            .settlements
            .iter()
            .enumerate()
            .map(|(i, settlement)| {
                let mut distances: Vec<(&str, f64)> = self
                    .settlements
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, other)| {
                        (
                            other.name.as_str(),
                            settlement.position.distance_to(&other.position),
                        )
                    })
                    .collect();
                distances.sort_by(|a, b| a.1.total_cmp(&b.1));
                let connections = if settlement.is_capital {
                    config.capital_route_connections
                } else {
                    config.route_connections
                };
                distances
                    .into_iter()
                    .take(connections)
                    .map(|(name, _)| name.to_string())
                    .collect()
            })
            .collect();

        for (settlement, connected) in self.settlements.iter_mut().zip(routes) {
            settlement.connected_routes = connected;
        }
    }

    pub fn len(&self) -> usize {
        self.settlements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settlements.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = SettlementId> {
        (0..self.settlements.len()).map(SettlementId)
    }

    pub fn living_ids(&self) -> Vec<SettlementId> {
        self.ids().filter(|&id| self[id].is_alive).collect()
    }

    pub fn settlements(&self) -> &[Settlement] {
        &self.settlements
    }

    pub fn settlements_mut(&mut self) -> impl Iterator<Item = (SettlementId, &mut Settlement)> {
        self.settlements
            .iter_mut()
            .enumerate()
            .map(|(i, settlement)| (SettlementId(i), settlement))
    }

    pub fn living(&self) -> impl Iterator<Item = &Settlement> {
        self.settlements.iter().filter(|settlement| settlement.is_alive)
    }

    pub fn find_by_name(&self, name: &str) -> Option<SettlementId> {
        self.settlements
            .iter()
            .position(|settlement| settlement.name == name)
            .map(SettlementId)
    }

    pub fn capital(&self) -> Option<SettlementId> {
        self.settlements
            .iter()
            .position(|settlement| settlement.is_capital)
            .map(SettlementId)
    }

    pub fn alive_count(&self) -> usize {
        self.living().count()
    }

    pub fn dead_count(&self) -> usize {
        self.len() - self.alive_count()
    }

    pub fn total_population(&self) -> u64 {
        self.living().map(|settlement| settlement.population).sum()
    }
}

impl std::ops::Index<SettlementId> for World {
    type Output = Settlement;

    fn index(&self, id: SettlementId) -> &Settlement {
        &self.settlements[id.0]
    }
}

impl std::ops::IndexMut<SettlementId> for World {
    fn index_mut(&mut self, id: SettlementId) -> &mut Settlement {
        &mut self.settlements[id.0]
    }
}

fn validate_roster(roster: &[SettlementSpec]) -> Result<()> {
    if roster.is_empty() {
        return Err(SimError::EmptyRoster);
    }

    let capitals = roster.iter().filter(|spec| spec.is_capital).count();
    if capitals != 1 {
        return Err(SimError::CapitalCount(capitals));
    }

    let mut names = HashSet::new();
    for spec in roster {
        if !names.insert(spec.name.as_str()) {
            return Err(SimError::DuplicateSettlement(spec.name.clone()));
        }
        if spec.produces == Some(ResourceKind::Gold) {
            return Err(SimError::InvalidProduction {
                name: spec.name.clone(),
                resource: ResourceKind::Gold.to_string(),
            });
        }
    }
    Ok(())
}
