use std::collections::HashSet;

use kingdom_sim::{
    components::{DisasterKind, ResourceKind, Stockpile},
    systems::TradeSystem,
    world::World,
    Engine, Scenario, ScenarioLoader,
};

fn scenario_loader() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn engine_runs_deterministically() {
    let scenario = Scenario::windsor();

    let mut engine_a = Engine::from_scenario(&scenario).unwrap();
    engine_a.run_to_completion(0.5, |_, _| {});
    let mut engine_b = Engine::from_scenario(&scenario).unwrap();
    engine_b.run_to_completion(0.5, |_, _| {});

    let (a, b) = (engine_a.report(), engine_b.report());
    assert_eq!(a.score_history, b.score_history);
    assert_eq!(a.disasters, b.disasters);
    assert_eq!(a.total_trades, b.total_trades);
    assert_eq!(a.total_population, b.total_population);
}

#[test]
fn settlement_invariants_hold_every_month() {
    let mut scenario = Scenario::windsor();
    scenario.seed = 77;
    scenario.config.event_base_chance = 0.6;
    let config = scenario.config.clone();
    let mut engine = Engine::from_scenario(&scenario).unwrap();
    let mut dead: HashSet<String> = HashSet::new();
    let mut months = 0usize;

    engine.run_to_completion(0.25, |engine, summary| {
        months += 1;
        assert!(summary.score <= 1000);
        for settlement in engine.settlements() {
            if dead.contains(&settlement.name) {
                assert!(!settlement.is_alive, "{} came back to life", settlement.name);
                continue;
            }
            assert_eq!(settlement.population_history.len(), months);
            assert_eq!(settlement.growth_history.len(), months);
            if settlement.is_alive {
                if !settlement.has_event_type(DisasterKind::Plague) {
                    assert!(settlement.population >= config.minimum_population);
                }
                assert!(settlement.growth_rate >= config.max_decline_rate);
                assert!(settlement.growth_rate <= config.max_growth_rate);
            } else {
                dead.insert(settlement.name.clone());
            }
        }
        let capital = engine.capital().unwrap();
        assert!(capital.active_events.is_empty(), "capital hit by a disaster");
    });

    let report = engine.report();
    assert_eq!(report.collapsed.len(), dead.len());
    assert_eq!(report.score_history.len(), months);
}

#[test]
fn trade_debits_nominal_and_delivers_discounted() {
    let scenario = Scenario::windsor();
    let config = scenario.config.clone();
    let mut world = World::from_roster(&scenario.settlements, &config).unwrap();

    // Starve half the provinces of a resource the other half have in bulk.
    for (id, settlement) in world.settlements_mut() {
        if settlement.is_capital {
            continue;
        }
        if id.raw() % 2 == 0 {
            settlement.resources.livestock = 60.0;
            settlement.resources.wood = 90.0;
        } else {
            settlement.resources.livestock = 900.0;
            settlement.resources.wood = 700.0;
        }
    }
    let before: Vec<Stockpile> = world.settlements().iter().map(|s| s.resources).collect();

    let mut trade = TradeSystem::new();
    let transfers = trade.calculate_trades(&world, &config);
    assert!(!transfers.is_empty());
    trade.execute_trades(&transfers, &mut world, &config);

    for resource in ResourceKind::ALL {
        let nominal: f64 = transfers
            .iter()
            .filter(|t| t.resource == resource)
            .map(|t| t.amount)
            .sum();
        let debited: f64 = transfers
            .iter()
            .filter(|t| t.resource == resource)
            .map(|t| t.from)
            .collect::<HashSet<_>>()
            .into_iter()
            .map(|id| before[id.raw()][resource] - world[id].resources[resource])
            .sum();
        assert!((nominal - debited).abs() < 1e-6, "{resource}: {nominal} vs {debited}");
    }

    let in_flight: f64 = trade
        .active_carts()
        .iter()
        .flat_map(|cart| cart.cargo.values())
        .sum();
    let nominal_total: f64 = transfers.iter().map(|t| t.amount).sum();
    assert!((in_flight - nominal_total * config.trade_efficiency).abs() < 1e-6);

    let stock_before_delivery: f64 = world.settlements().iter().map(|s| s.resources.total()).sum();
    let delivered = trade.update(config.seconds_per_month(), &mut world);
    assert_eq!(delivered, transfers.len());
    let stock_after_delivery: f64 = world.settlements().iter().map(|s| s.resources.total()).sum();
    assert!((stock_after_delivery - stock_before_delivery - in_flight).abs() < 1e-6);
}

#[test]
fn fixture_scenario_runs_two_years() {
    let scenario = scenario_loader()
        .load("scenarios/short_reign.yaml")
        .expect("scenario parses");
    assert_eq!(scenario.name, "short_reign");
    assert_eq!(scenario.settlements.len(), 4);

    let mut engine = Engine::from_scenario(&scenario).unwrap();
    let mut months = 0;
    engine.run_to_completion(0.1, |_, _| months += 1);
    assert_eq!(months, 24);
    assert_eq!(engine.time_label(), "Jan 1452");
    assert!((engine.progress() - 25.0 / 24.0).abs() < 1e-9);

    let routes = &engine.settlement("Highkeep").unwrap().connected_routes;
    assert_eq!(routes.len(), 3);
}

#[test]
fn report_is_written_as_json() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("reports").join("windsor.json");

    let mut engine = Engine::from_scenario(&Scenario::windsor()).unwrap();
    engine.run_to_completion(1.0, |_, _| {});
    engine.report().write_json(&path).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["scenario"], "windsor");
    assert_eq!(value["final_time"], "Jan 1470");
    assert_eq!(value["score_history"].as_array().unwrap().len(), 240);
}
