use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// Monthly production, consumption and capital taxation for every living settlement.
#[derive(Default)]
pub struct EconomySystem {
    last_tax_collected: f64,
}

impl EconomySystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tax pooled from the provinces during the most recent month.
    pub fn last_tax_collected(&self) -> f64 {
        self.last_tax_collected
    }

    pub fn apply_month(&mut self, ctx: &SystemContext<'_>, world: &mut World) {
        let config = ctx.config;
        let mut capital = None;
        let mut total_tax = 0.0;

        for (id, settlement) in world.settlements_mut() {
            if !settlement.is_alive {
                continue;
            }

            let production = settlement.calculate_production(config);
            let consumption = settlement.calculate_consumption(config);

            let tax = if settlement.is_capital {
                capital = Some(id);
                0.0
            } else {
                let tax = production.gold * config.capital_tax_rate;
                total_tax += tax;
                tax
            };

            settlement.update_month(&production, &consumption, tax, config);
        }

        if let Some(id) = capital {
            let capital = &mut world[id];
            if capital.is_alive {
                capital.resources.gold += total_tax;
            }
        }

        tracing::debug!(
            year = ctx.year,
            month = ctx.month,
            tax = total_tax,
            "economy settled"
        );
        self.last_tax_collected = total_tax;
    }
}

impl System for EconomySystem {
    fn name(&self) -> &str {
        "economy"
    }

    fn run(&mut self, ctx: &SystemContext<'_>, world: &mut World, _rng: &mut SystemRng<'_>) {
        self.apply_month(ctx, world);
    }
}
