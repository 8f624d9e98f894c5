use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    components::DisasterKind,
    engine::{System, SystemContext},
    rng::SystemRng,
    world::{SettlementId, World},
};

/// One spawned disaster, kept for scoring and the end-of-run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterRecord {
    pub year: i32,
    pub month: u32,
    pub kind: DisasterKind,
    pub affected: Vec<String>,
}

#[derive(Default)]
pub struct DisasterSystem {
    history: Vec<DisasterRecord>,
}

impl DisasterSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[DisasterRecord] {
        &self.history
    }

    pub fn total_events(&self) -> usize {
        self.history.len()
    }

    /// Rolls this month's disaster chance and spawns one if it hits.
    pub fn check_and_spawn<R: Rng>(
        &mut self,
        ctx: &SystemContext<'_>,
        world: &mut World,
        rng: &mut R,
    ) -> Option<&DisasterRecord> {
        if rng.gen::<f64>() < ctx.config.event_base_chance {
            self.spawn_random_event(ctx, world, rng)
        } else {
            None
        }
    }

    /// Picks a kind and up to `max_disaster_targets` living non-capital
    /// settlements. The capital is never hit.
    pub fn spawn_random_event<R: Rng>(
        &mut self,
        ctx: &SystemContext<'_>,
        world: &mut World,
        rng: &mut R,
    ) -> Option<&DisasterRecord> {
        let kind = *DisasterKind::ALL.choose(rng)?;

        let eligible: Vec<SettlementId> = world
            .living_ids()
            .into_iter()
            .filter(|&id| !world[id].is_capital)
            .collect();
        if eligible.is_empty() {
            return None;
        }

        let count = rng.gen_range(1..=eligible.len().min(ctx.config.max_disaster_targets));
        let affected: Vec<SettlementId> = eligible.choose_multiple(rng, count).copied().collect();

        let mut names = Vec::with_capacity(affected.len());
        for id in affected {
            let settlement = &mut world[id];
            settlement.add_event(kind, ctx.config);
            names.push(settlement.name.clone());
        }

        tracing::info!(
            year = ctx.year,
            month = ctx.month,
            ?kind,
            affected = ?names,
            "disaster struck"
        );
        self.history.push(DisasterRecord {
            year: ctx.year,
            month: ctx.month,
            kind,
            affected: names,
        });
        self.history.last()
    }
}

impl System for DisasterSystem {
    fn name(&self) -> &str {
        "disasters"
    }

    fn run(&mut self, ctx: &SystemContext<'_>, world: &mut World, rng: &mut SystemRng<'_>) {
        self.check_and_spawn(ctx, world, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::scenario::Scenario;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ctx(config: &SimConfig) -> SystemContext<'_> {
        SystemContext {
            year: 1450,
            month: 2,
            config,
        }
    }

    #[test]
    fn capital_is_never_a_target() {
        let scenario = Scenario::windsor();
        let config = scenario.config.clone();
        let mut world = World::from_roster(&scenario.settlements, &config).unwrap();
        let mut system = DisasterSystem::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for _ in 0..200 {
            let record = system
                .spawn_random_event(&ctx(&config), &mut world, &mut rng)
                .expect("eligible settlements remain")
                .clone();
            assert!((1..=3).contains(&record.affected.len()));
            assert!(!record.affected.iter().any(|name| name == "Windsor (Capital)"));
            let mut unique = record.affected.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), record.affected.len());
        }

        let capital = &world[world.capital().unwrap()];
        assert!(capital.active_events.is_empty());
        assert_eq!(system.total_events(), 200);
    }

    #[test]
    fn nothing_happens_without_eligible_settlements() {
        let scenario = Scenario::windsor();
        let config = scenario.config.clone();
        let mut world = World::from_roster(&scenario.settlements, &config).unwrap();
        for (_, settlement) in world.settlements_mut() {
            if !settlement.is_capital {
                settlement.is_alive = false;
            }
        }
        let mut system = DisasterSystem::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(system
            .spawn_random_event(&ctx(&config), &mut world, &mut rng)
            .is_none());
        assert!(system.history().is_empty());
    }

    #[test]
    fn zero_chance_never_spawns() {
        let scenario = Scenario::windsor();
        let config = SimConfig {
            event_base_chance: 0.0,
            ..scenario.config.clone()
        };
        let mut world = World::from_roster(&scenario.settlements, &config).unwrap();
        let mut system = DisasterSystem::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..100 {
            assert!(system.check_and_spawn(&ctx(&config), &mut world, &mut rng).is_none());
        }
    }

    #[test]
    fn affected_settlements_carry_the_disaster() {
        let scenario = Scenario::windsor();
        let config = scenario.config.clone();
        let mut world = World::from_roster(&scenario.settlements, &config).unwrap();
        let mut system = DisasterSystem::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let record = system
            .spawn_random_event(&ctx(&config), &mut world, &mut rng)
            .unwrap()
            .clone();
        for name in &record.affected {
            let settlement = &world[world.find_by_name(name).unwrap()];
            assert!(settlement.has_event_type(record.kind));
        }
    }
}
