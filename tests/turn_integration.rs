//! Integration tests for the turn driver and rule engine
//!
//! Covers phase control (upgrade interruption, queued turns), storage
//! discovery policies and the bundled scenario end to end.

use lifeon_sim::city::catalog::ArchetypeCatalog;
use lifeon_sim::core::config::{SimulationConfig, StoragePolicy};
use lifeon_sim::core::error::SimError;
use lifeon_sim::core::types::{AuraCategory, ResourceAmount, ResourceKind, Turn, TurnPhase, Vec2};
use lifeon_sim::simulation::{City, PhaseSubscriber, Scenario, Simulation, TurnControl, TurnDriver};

const SHRINE: &str = r#"
[[archetypes]]
id = "shrine"
name = "Shrine"
size = 1

[[archetypes.levels]]
exp_to_next = 5

[[archetypes.levels.rules]]
label = "ascend"
trigger = "pre_turn"
on_success = [{ kind = "upgrade_to_next_level" }]

[[archetypes.levels.rules]]
label = "offering"
trigger = "pre_turn"
on_success = [{ kind = "add_experience", amount = 3 }]

[[archetypes.levels]]
exp_to_next = 50

[[archetypes.levels.rules]]
label = "blessing"
trigger = "pre_turn"
on_success = [{ kind = "add_experience", amount = 100 }]

[[archetypes.levels]]
exp_to_next = -1
"#;

fn shrine_after_one_phase(upgrade_interrupts_phase: bool) -> (usize, u32, usize) {
    let config = SimulationConfig { upgrade_interrupts_phase, ..Default::default() };
    let mut city = City::new(ArchetypeCatalog::parse_toml(SHRINE).unwrap(), config);
    let shrine = city.construct_at("shrine", Vec2::new(0.0, 0.0)).unwrap();

    let report = city.run_phase(1, TurnPhase::PreTurn);
    let b = city.building(shrine).unwrap();
    (b.level(), b.experience(), report.level_ups.len())
}

// ============================================================================
// Phase Control
// ============================================================================

/// Integration test: an upgrade ends the building's phase by default
///
/// The new level's rules never run in the phase that produced it.
#[test]
fn test_upgrade_interrupts_phase() {
    assert_eq!(shrine_after_one_phase(true), (1, 0, 1));
}

/// Integration test: with interruption off the old level's remaining rules
/// still run after the upgrade
#[test]
fn test_upgrade_without_interruption_runs_remaining_rules() {
    assert_eq!(shrine_after_one_phase(false), (1, 3, 1));
}

#[test]
fn test_level_ladder_stops_at_terminal_level() {
    let catalog = ArchetypeCatalog::parse_toml(SHRINE).unwrap();
    let mut city = City::new(catalog, SimulationConfig::default());
    let shrine = city.construct_at("shrine", Vec2::new(0.0, 0.0)).unwrap();
    let mut sim = Simulation::new(city);

    // Level 1 gains 100 exp per pre-turn and crosses its threshold of 50
    for _ in 0..4 {
        sim.advance_turn();
    }
    let b = sim.city().building(shrine).unwrap();
    assert_eq!(b.level(), 2);
    assert!(b.level_def().is_terminal());
}

/// Subscriber that asks for one extra turn the first time it sees PostTurn
struct Requester {
    phases: Vec<(Turn, TurnPhase)>,
    asked: bool,
}

impl PhaseSubscriber for Requester {
    fn on_phase(&mut self, turn: Turn, phase: TurnPhase, control: &mut TurnControl) {
        self.phases.push((turn, phase));
        if phase == TurnPhase::PostTurn && !self.asked {
            self.asked = true;
            control.queue_turn();
        }
    }
}

/// Integration test: a queued turn runs after the current one and every
/// subscriber sees both
#[test]
fn test_queued_turn_runs_for_all_subscribers() {
    let mut city = City::new(ArchetypeCatalog::builtin().unwrap(), SimulationConfig::default());
    city.construct_at("garden", Vec2::new(0.0, 0.0)).unwrap();
    let mut requester = Requester { phases: Vec::new(), asked: false };
    let mut driver = TurnDriver::new(4);

    let ran = driver.advance(&mut [&mut city, &mut requester]);
    assert_eq!(ran, 2);
    assert_eq!(driver.current_turn(), 2);
    assert_eq!(requester.phases.len(), 10);
    assert_eq!(requester.phases[5], (2, TurnPhase::PreTurn));

    let reports = city.take_reports();
    assert_eq!(reports.len(), 10);
    assert!(reports.windows(2).all(|w| w[0].turn <= w[1].turn));
}

// ============================================================================
// Storage Discovery
// ============================================================================

fn fed_residence_population(policy: StoragePolicy, warehouse_at: Vec2) -> (u32, u32) {
    let config = SimulationConfig { storage_policy: policy, ..Default::default() };
    let mut city = City::new(ArchetypeCatalog::builtin().unwrap(), config);
    let warehouse = city.construct_at("warehouse", warehouse_at).unwrap();
    city.assign_workers(warehouse, 4).unwrap();
    city.seed_stock(warehouse, &[ResourceAmount::new(ResourceKind::Food, 20)]).unwrap();
    let residence = city.construct_at("residence", Vec2::new(4.0, 0.0)).unwrap();

    let mut sim = Simulation::new(city);
    for _ in 0..3 {
        sim.advance_turn();
    }
    let population = sim.city().building(residence).unwrap().population();
    let stock = sim.city().inventory_of(warehouse).unwrap().amount(ResourceKind::Food);
    (population, stock)
}

#[test]
fn test_unassigned_residence_starves_under_assigned_policy() {
    let result = fed_residence_population(StoragePolicy::AssignedOrSelf, Vec2::new(0.0, 0.0));
    assert_eq!(result, (0, 20));
}

#[test]
fn test_nearby_policy_discovers_storage_in_radius() {
    let policy = StoragePolicy::AssignedOrNearby { fetch_radius: 8.0 };
    assert_eq!(fed_residence_population(policy, Vec2::new(0.0, 0.0)), (3, 19));
    assert_eq!(fed_residence_population(policy, Vec2::new(30.0, 0.0)), (0, 20));

    let unlimited = StoragePolicy::AssignedOrNearby { fetch_radius: 0.0 };
    assert_eq!(fed_residence_population(unlimited, Vec2::new(30.0, 0.0)), (3, 19));
}

// ============================================================================
// Bundled Scenario
// ============================================================================

fn bundled_scenario() -> Scenario {
    Scenario::parse_toml(include_str!("../data/scenario.toml")).unwrap()
}

/// Integration test: starter town runs for several turns
///
/// Verifies residences settle in, the farm feeds the warehouse and the
/// police station and garden project their auras.
#[test]
fn test_bundled_scenario_runs() {
    let scenario = bundled_scenario();
    assert_eq!(scenario.placements.len(), 6);

    let mut sim = scenario
        .build(ArchetypeCatalog::builtin().unwrap(), SimulationConfig::default())
        .unwrap();
    assert!(sim.city().tech().has_node("masonry"));

    let mut level_ups = 0;
    for _ in 0..6 {
        let report = sim.advance_turn();
        assert_eq!(report.turns_run, 1);
        assert_eq!(report.phases.len(), 5);
        level_ups += report.level_up_count();
    }
    assert_eq!(sim.current_turn(), 6);
    assert!(level_ups >= 2);

    let city = sim.city();
    let residences: Vec<_> = city.buildings().filter(|b| b.archetype().id == "residence").collect();
    assert_eq!(residences.len(), 2);
    assert!(residences.iter().all(|r| r.level() >= 1 && r.population() > 0));

    assert!(city.environment().covered_cells(AuraCategory::Security) > 0);
    assert!(city.environment().covered_cells(AuraCategory::Beauty) > 0);

    for view in city.views() {
        assert!(view.population <= view.max_population);
        assert!(view.workers <= view.max_jobs);
        if let Some(storage) = &view.storage {
            assert!(storage.total <= storage.capacity);
        }
    }
}

#[test]
fn test_scenario_rejects_self_assignment() {
    let mut scenario = bundled_scenario();
    scenario.placements[1].assign_to = Some(1);
    let result = scenario.build(ArchetypeCatalog::builtin().unwrap(), SimulationConfig::default());
    assert!(matches!(result, Err(SimError::InvalidScenario(_))));
}

#[test]
fn test_scenario_rejects_unknown_archetype() {
    let mut scenario = bundled_scenario();
    scenario.placements[0].archetype = "castle".into();
    let result = scenario.build(ArchetypeCatalog::builtin().unwrap(), SimulationConfig::default());
    assert!(matches!(result, Err(SimError::UnknownArchetype(_))));
}
