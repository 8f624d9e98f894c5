use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    components::{Position, ResourceKind},
    config::SimConfig,
    engine::{System, SystemContext},
    rng::SystemRng,
    world::{SettlementId, World},
};

/// A matched shipment of one resource, before any transit loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transfer {
    pub from: SettlementId,
    pub to: SettlementId,
    pub resource: ResourceKind,
    pub amount: f64,
}

/// Goods on the road between two settlements.
///
/// Endpoints are copies taken when the cart leaves; the cart never looks at
/// its source again and finds its destination by name on arrival.
#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    pub from: String,
    pub to: String,
    pub cargo: BTreeMap<ResourceKind, f64>,
    pub start: Position,
    pub end: Position,
    pub position: Position,
    pub progress: f64,
    pub elapsed: f64,
    pub duration: f64,
}

impl Cart {
    /// Moves the cart along its route; returns true once it has arrived.
    pub fn advance(&mut self, dt: f64) -> bool {
        self.elapsed += dt;
        self.progress = if self.duration > 0.0 {
            (self.elapsed / self.duration).min(1.0)
        } else {
            1.0
        };
        self.position = self.start.lerp(&self.end, self.progress);
        self.has_arrived()
    }

    pub fn has_arrived(&self) -> bool {
        self.progress >= 1.0
    }
}

struct Deficit {
    id: SettlementId,
    amount: f64,
    urgency: f64,
}

#[derive(Default)]
pub struct TradeSystem {
    active_carts: Vec<Cart>,
    last_transfer_count: usize,
}

impl TradeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_carts(&self) -> &[Cart] {
        &self.active_carts
    }

    pub fn last_transfer_count(&self) -> usize {
        self.last_transfer_count
    }

    /// Matches surplus settlements to deficit settlements, resource by resource.
    ///
    /// The most urgent deficit is served first, drawing on the nearest
    /// unblocked surplus. Shipments of `minimum_trade_amount` or less are
    /// skipped. Stocks are not touched here; see [`TradeSystem::execute_trades`].
    pub fn calculate_trades(&self, world: &World, config: &SimConfig) -> Vec<Transfer> {
        let living = world.living_ids();
        let mut transfers = Vec::new();

        for resource in ResourceKind::ALL {
            let mut surpluses: Vec<(SettlementId, f64)> = Vec::new();
            let mut deficits: Vec<Deficit> = Vec::new();

            for &id in &living {
                let settlement = &world[id];
                let growth = settlement.calculate_thresholds(config).growth;
                let current = settlement.resources[resource];

                if current > growth {
                    surpluses.push((id, current - growth));
                } else if current < growth && !settlement.is_trade_blocked() {
                    deficits.push(Deficit {
                        id,
                        amount: 2.0 * growth - current,
                        urgency: 1000.0 / (growth / (growth - current)),
                    });
                }
            }

            deficits.sort_by(|a, b| b.urgency.total_cmp(&a.urgency));

            for deficit in &deficits {
                let mut needed = deficit.amount;
                let target = world[deficit.id].position;

                let mut candidates: Vec<(usize, f64)> = surpluses
                    .iter()
                    .enumerate()
                    .filter(|(_, (id, available))| {
                        *available > 0.0 && !world[*id].is_trade_blocked()
                    })
                    .map(|(slot, (id, _))| (slot, world[*id].position.distance_to(&target)))
                    .collect();
                candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

                for (slot, _) in candidates {
                    if needed <= 0.0 {
                        break;
                    }
                    let (source, available) = surpluses[slot];
                    let amount = needed.min(available);
                    if amount > config.minimum_trade_amount {
                        transfers.push(Transfer {
                            from: source,
                            to: deficit.id,
                            resource,
                            amount,
                        });
                        surpluses[slot].1 -= amount;
                        needed -= amount;
                    }
                }
            }
        }

        transfers
    }

    /// Debits each source in full and puts the efficiency-discounted goods on the road.
    pub fn execute_trades(&mut self, transfers: &[Transfer], world: &mut World, config: &SimConfig) {
        for transfer in transfers {
            let end = world[transfer.to].position;
            let to = world[transfer.to].name.clone();

            let source = &mut world[transfer.from];
            source.resources[transfer.resource] -= transfer.amount;

            tracing::debug!(
                from = %source.name,
                %to,
                resource = %transfer.resource,
                amount = transfer.amount,
                "cart dispatched"
            );

            self.active_carts.push(Cart {
                from: source.name.clone(),
                to,
                cargo: BTreeMap::from([(
                    transfer.resource,
                    transfer.amount * config.trade_efficiency,
                )]),
                start: source.position,
                end,
                position: source.position,
                progress: 0.0,
                elapsed: 0.0,
                duration: config.seconds_per_month(),
            });
        }
    }

    /// Animates carts and unloads the ones that arrived. Returns the number delivered.
    pub fn update(&mut self, dt: f64, world: &mut World) -> usize {
        for cart in &mut self.active_carts {
            cart.advance(dt);
        }

        let (arrived, in_transit): (Vec<Cart>, Vec<Cart>) = std::mem::take(&mut self.active_carts)
            .into_iter()
            .partition(Cart::has_arrived);
        self.active_carts = in_transit;

        let mut delivered = 0;
        for cart in arrived {
            match world.find_by_name(&cart.to) {
                Some(id) if world[id].is_alive => {
                    let destination = &mut world[id];
                    for (&resource, &amount) in &cart.cargo {
                        destination.resources[resource] += amount;
                    }
                    delivered += 1;
                }
                // Dead settlements keep their stocks frozen, so the cargo is lost.
                Some(_) => {
                    tracing::warn!(to = %cart.to, "cart arrived at a dead settlement, cargo lost");
                }
                None => {
                    tracing::warn!(to = %cart.to, "cart destination not found, cargo lost");
                }
            }
        }
        delivered
    }
}

impl System for TradeSystem {
    fn name(&self) -> &str {
        "trade"
    }

    fn run(&mut self, ctx: &SystemContext<'_>, world: &mut World, _rng: &mut SystemRng<'_>) {
        let transfers = self.calculate_trades(world, ctx.config);
        self.execute_trades(&transfers, world, ctx.config);
        self.last_transfer_count = transfers.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{DisasterKind, Stockpile};
    use crate::settlement::SettlementSpec;

    fn roster() -> Vec<SettlementSpec> {
        let spec = |name: &str, x: f64, is_capital: bool| SettlementSpec {
            name: name.into(),
            produces: None,
            position: Position::new(x, 0.0),
            is_capital,
        };
        vec![
            spec("Capital", 1000.0, true),
            spec("Needy", 0.0, false),
            spec("Near", 10.0, false),
            spec("Far", 100.0, false),
        ]
    }

    /// Every stock sits exactly on its growth threshold, so nothing trades
    /// until a test moves something.
    fn balanced_world(config: &SimConfig) -> World {
        let mut world = World::from_roster(&roster(), config).unwrap();
        for (_, settlement) in world.settlements_mut() {
            let growth = settlement.calculate_thresholds(config).growth;
            settlement.resources = Stockpile::uniform(growth);
        }
        world
    }

    fn id(world: &World, name: &str) -> SettlementId {
        world.find_by_name(name).unwrap()
    }

    #[test]
    fn balanced_network_does_not_trade() {
        let config = SimConfig::default();
        let world = balanced_world(&config);
        assert!(TradeSystem::new().calculate_trades(&world, &config).is_empty());
    }

    #[test]
    fn nearest_surplus_is_drained_first() {
        let config = SimConfig::default();
        let mut world = balanced_world(&config);
        let (needy, near, far) = (id(&world, "Needy"), id(&world, "Near"), id(&world, "Far"));
        world[needy].resources.wood = 120.0;
        world[near].resources.wood = 170.0 + 100.0;
        world[far].resources.wood = 170.0 + 500.0;

        let transfers = TradeSystem::new().calculate_trades(&world, &config);
        // Needs 2 * 170 - 120 = 220: all 100 from Near, the other 120 from Far.
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].from, near);
        assert!((transfers[0].amount - 100.0).abs() < 1e-9);
        assert_eq!(transfers[1].from, far);
        assert!((transfers[1].amount - 120.0).abs() < 1e-9);
        assert!(transfers.iter().all(|t| t.to == needy && t.resource == ResourceKind::Wood));
    }

    #[test]
    fn tiny_surpluses_are_skipped() {
        let config = SimConfig::default();
        let mut world = balanced_world(&config);
        let (needy, near, far) = (id(&world, "Needy"), id(&world, "Near"), id(&world, "Far"));
        world[needy].resources.iron = 160.0;
        world[near].resources.iron = 174.0;
        world[far].resources.iron = 300.0;

        let transfers = TradeSystem::new().calculate_trades(&world, &config);
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].from, far);
        assert!((transfers[0].amount - 130.0).abs() < 1e-9);
    }

    #[test]
    fn most_urgent_deficit_is_served_first() {
        let config = SimConfig::default();
        let mut world = balanced_world(&config);
        let (needy, near, far) = (id(&world, "Needy"), id(&world, "Near"), id(&world, "Far"));
        world[near].resources.grain = 100.0;
        world[needy].resources.grain = 40.0;
        world[far].resources.grain = 170.0 + 250.0;

        let transfers = TradeSystem::new().calculate_trades(&world, &config);
        // Needy is further below threshold, wants 300 and drains all 250.
        // Nothing is left for Near.
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].to, needy);
        assert!((transfers[0].amount - 250.0).abs() < 1e-9);
    }

    #[test]
    fn blocked_settlements_neither_send_nor_receive() {
        let config = SimConfig::default();
        let mut world = balanced_world(&config);
        let (needy, near, far) = (id(&world, "Needy"), id(&world, "Near"), id(&world, "Far"));
        world[needy].resources.livestock = 100.0;
        world[near].resources.livestock = 400.0;
        world[near].add_event(DisasterKind::LightningStorm, &config);
        world[far].resources.livestock = 400.0;

        let transfers = TradeSystem::new().calculate_trades(&world, &config);
        assert!(transfers.iter().all(|t| t.from != near));
        assert!(transfers.iter().any(|t| t.from == far && t.to == needy));

        world[needy].add_event(DisasterKind::Plague, &config);
        let transfers = TradeSystem::new().calculate_trades(&world, &config);
        assert!(transfers.iter().all(|t| t.to != needy));
    }

    #[test]
    fn settlement_on_threshold_is_not_a_deficit() {
        let config = SimConfig::default();
        let mut world = balanced_world(&config);
        let far = id(&world, "Far");
        world[far].resources.gold = 1000.0;
        assert!(TradeSystem::new().calculate_trades(&world, &config).is_empty());
    }

    #[test]
    fn stocks_just_below_threshold_are_served_by_urgency() {
        let config = SimConfig::default();
        let mut world = balanced_world(&config);
        let (needy, near, far) = (id(&world, "Needy"), id(&world, "Near"), id(&world, "Far"));
        let growth = world[needy].calculate_thresholds(&config).growth;
        world[needy].resources.wood = growth - 1.0;
        world[near].resources.wood = growth - 2.0;
        world[far].resources.wood = growth + 400.0;

        let transfers = TradeSystem::new().calculate_trades(&world, &config);
        // Two units short is more urgent than one, so Near is served first.
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].to, near);
        assert!((transfers[0].amount - (growth + 2.0)).abs() < 1e-9);
        assert_eq!(transfers[1].to, needy);
        assert!((transfers[1].amount - (growth + 1.0)).abs() < 1e-9);
        assert!(transfers.iter().all(|t| t.from == far));
    }

    #[test]
    fn carts_deliver_discounted_goods_after_one_month() {
        let config = SimConfig::default();
        let mut world = balanced_world(&config);
        let (needy, far) = (id(&world, "Needy"), id(&world, "Far"));
        world[needy].resources.wood = 100.0;
        world[far].resources.wood = 1000.0;

        let mut trade = TradeSystem::new();
        let transfers = trade.calculate_trades(&world, &config);
        let shipped: f64 = transfers.iter().map(|t| t.amount).sum();
        assert!((shipped - 240.0).abs() < 1e-9);

        trade.execute_trades(&transfers, &mut world, &config);
        assert!((world[far].resources.wood - (1000.0 - 240.0)).abs() < 1e-9);
        assert_eq!(world[needy].resources.wood, 100.0);
        assert_eq!(trade.active_carts().len(), 1);

        let half = config.seconds_per_month() / 2.0;
        assert_eq!(trade.update(half, &mut world), 0);
        let cart = &trade.active_carts()[0];
        assert_eq!(cart.position, Position::new(50.0, 0.0));
        assert_eq!(world[needy].resources.wood, 100.0);

        assert_eq!(trade.update(half, &mut world), 1);
        assert!(trade.active_carts().is_empty());
        assert!((world[needy].resources.wood - (100.0 + 240.0 * 0.98)).abs() < 1e-9);
    }

    #[test]
    fn cargo_for_a_dead_settlement_is_dropped() {
        let config = SimConfig::default();
        let mut world = balanced_world(&config);
        let (needy, far) = (id(&world, "Needy"), id(&world, "Far"));
        world[needy].resources.wood = 100.0;
        world[far].resources.wood = 1000.0;

        let mut trade = TradeSystem::new();
        let transfers = trade.calculate_trades(&world, &config);
        trade.execute_trades(&transfers, &mut world, &config);
        world[needy].is_alive = false;

        assert_eq!(trade.update(config.seconds_per_month(), &mut world), 0);
        assert!(trade.active_carts().is_empty());
        assert_eq!(world[needy].resources.wood, 100.0);
    }
}
