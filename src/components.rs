use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Wood,
    Iron,
    Livestock,
    Grain,
    Gold,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Wood,
        ResourceKind::Iron,
        ResourceKind::Livestock,
        ResourceKind::Grain,
        ResourceKind::Gold,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Wood => "wood",
            ResourceKind::Iron => "iron",
            ResourceKind::Livestock => "livestock",
            ResourceKind::Grain => "grain",
            ResourceKind::Gold => "gold",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Amount of every resource kind held (or produced, or consumed) by a settlement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stockpile {
    pub wood: f64,
    pub iron: f64,
    pub livestock: f64,
    pub grain: f64,
    pub gold: f64,
}

impl Stockpile {
    pub fn uniform(amount: f64) -> Self {
        Self {
            wood: amount,
            iron: amount,
            livestock: amount,
            grain: amount,
            gold: amount,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, f64)> + '_ {
        ResourceKind::ALL.into_iter().map(move |kind| (kind, self[kind]))
    }

    pub fn scale(&mut self, factor: f64) {
        for kind in ResourceKind::ALL {
            self[kind] *= factor;
        }
    }

    pub fn total(&self) -> f64 {
        self.iter().map(|(_, amount)| amount).sum()
    }
}

impl Index<ResourceKind> for Stockpile {
    type Output = f64;

    fn index(&self, kind: ResourceKind) -> &f64 {
        match kind {
            ResourceKind::Wood => &self.wood,
            ResourceKind::Iron => &self.iron,
            ResourceKind::Livestock => &self.livestock,
            ResourceKind::Grain => &self.grain,
            ResourceKind::Gold => &self.gold,
        }
    }
}

impl IndexMut<ResourceKind> for Stockpile {
    fn index_mut(&mut self, kind: ResourceKind) -> &mut f64 {
        match kind {
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Iron => &mut self.iron,
            ResourceKind::Livestock => &mut self.livestock,
            ResourceKind::Grain => &mut self.grain,
            ResourceKind::Gold => &mut self.gold,
        }
    }
}

/// Map coordinates of a settlement or a cart in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point `fraction` of the way from `self` to `target`.
    pub fn lerp(&self, target: &Position, fraction: f64) -> Position {
        Position {
            x: self.x + (target.x - self.x) * fraction,
            y: self.y + (target.y - self.y) * fraction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    Wall,
    Camp,
    Monument,
    Granary,
    Hotel,
}

impl BuildingKind {
    pub const ALL: [BuildingKind; 5] = [
        BuildingKind::Wall,
        BuildingKind::Camp,
        BuildingKind::Monument,
        BuildingKind::Granary,
        BuildingKind::Hotel,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterKind {
    Drought,
    PirateRaid,
    LightningStorm,
    Plague,
    LaborStrike,
}

impl DisasterKind {
    pub const ALL: [DisasterKind; 5] = [
        DisasterKind::Drought,
        DisasterKind::PirateRaid,
        DisasterKind::LightningStorm,
        DisasterKind::Plague,
        DisasterKind::LaborStrike,
    ];

    /// Plague and lightning cut a settlement off from the trade network in both directions.
    pub fn blocks_trade(self) -> bool {
        matches!(self, DisasterKind::LightningStorm | DisasterKind::Plague)
    }

    /// Whether this disaster halts local production of `resource`.
    pub fn halts_production_of(self, resource: ResourceKind) -> bool {
        match self {
            DisasterKind::Drought => {
                matches!(resource, ResourceKind::Livestock | ResourceKind::Grain)
            }
            DisasterKind::LaborStrike => matches!(resource, ResourceKind::Wood | ResourceKind::Iron),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveDisaster {
    pub kind: DisasterKind,
    pub remaining_months: u32,
}
