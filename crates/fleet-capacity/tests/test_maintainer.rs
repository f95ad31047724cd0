use std::cell::RefCell;
use std::rc::Rc;

use sugars::{rc, refcell};

use fleet_capacity::common::Move;
use fleet_capacity::config::MaintainerConfig;
use fleet_capacity::deployment::{Deployer, MoveOutcome};
use fleet_capacity::error::CapacityError;
use fleet_capacity::fleet::{FleetSnapshot, SnapshotProvider};
use fleet_capacity::maintainer::SpareCapacityMaintainer;
use fleet_capacity::metrics::MetricSink;
use fleet_capacity::resources::Resources;

///////////////////////////////////////////////////////////////////////////////

struct StaticProvider {
    snapshot: FleetSnapshot,
}

impl SnapshotProvider for StaticProvider {
    fn snapshot(&self) -> Result<FleetSnapshot, CapacityError> {
        Ok(self.snapshot.clone())
    }
}

struct FailingProvider;

impl SnapshotProvider for FailingProvider {
    fn snapshot(&self) -> Result<FleetSnapshot, CapacityError> {
        Err(CapacityError::SnapshotUnavailable("node repository is down".to_string()))
    }
}

struct RecordingDeployer {
    outcome: MoveOutcome,
    moves: Rc<RefCell<Vec<(Move, String)>>>,
}

impl Deployer for RecordingDeployer {
    fn execute_move(&mut self, mv: &Move, reason: &str) -> MoveOutcome {
        self.moves.borrow_mut().push((*mv, reason.to_string()));
        self.outcome
    }
}

struct RecordingSink {
    values: Rc<RefCell<Vec<(String, i64)>>>,
}

impl MetricSink for RecordingSink {
    fn set(&mut self, name: &str, value: i64) {
        self.values.borrow_mut().push((name.to_string(), value));
    }
}

struct Harness {
    maintainer: SpareCapacityMaintainer,
    moves: Rc<RefCell<Vec<(Move, String)>>>,
    values: Rc<RefCell<Vec<(String, i64)>>>,
}

fn harness(snapshot: FleetSnapshot, outcome: MoveOutcome, config: MaintainerConfig) -> Harness {
    let moves = rc!(refcell!(Vec::new()));
    let values = rc!(refcell!(Vec::new()));
    let maintainer = SpareCapacityMaintainer::new(
        Box::new(StaticProvider { snapshot }),
        Box::new(RecordingDeployer {
            outcome,
            moves: moves.clone(),
        }),
        Box::new(RecordingSink {
            values: values.clone(),
        }),
        config,
    );
    Harness {
        maintainer,
        moves,
        values,
    }
}

///////////////////////////////////////////////////////////////////////////////

// Four half-empty hosts: two losses are absorbable, so no mitigation is
// needed and the slack gauge reads two.
fn safe_fleet() -> FleetSnapshot {
    FleetSnapshot::builder()
        .host("h1", Resources::new(8., 16., 100., 10.))
        .host("h2", Resources::new(8., 16., 100., 10.))
        .host("h3", Resources::new(8., 16., 100., 10.))
        .host("h4", Resources::new(8., 16., 100., 10.))
        .tenant("t1", Resources::new(4., 8., 50., 5.), "h1")
        .tenant("t2", Resources::new(4., 8., 50., 5.), "h2")
        .tenant("t3", Resources::new(4., 8., 50., 5.), "h3")
        .tenant("t4", Resources::new(4., 8., 50., 5.), "h4")
        .build()
        .unwrap()
}

// Losing ha strands its 8/16 tenant, but moving hb's small tenant onto hd
// clears enough room on the emptiest host. One move mitigates.
fn tight_fleet(retire_small_tenant: bool) -> FleetSnapshot {
    let builder = FleetSnapshot::builder()
        .host("ha", Resources::new(10., 20., 100., 10.))
        .host("hb", Resources::new(10., 20., 100., 10.))
        .host("hc", Resources::new(10., 20., 100., 10.))
        .host("hd", Resources::new(10., 20., 100., 10.))
        .tenant("t_big", Resources::new(8., 16., 80., 8.), "ha")
        .tenant("t_c", Resources::new(6., 12., 60., 6.), "hc")
        .tenant("t_d", Resources::new(6., 12., 60., 6.), "hd");
    let builder = if retire_small_tenant {
        builder.retired_tenant("t_b", Resources::new(4., 8., 40., 4.), "hb")
    } else {
        builder.tenant("t_b", Resources::new(4., 8., 40., 4.), "hb")
    };
    builder.build().unwrap()
}

// Three hosts where the large tenant has nowhere to go and no relocation
// can change that.
fn unsolvable_fleet() -> FleetSnapshot {
    FleetSnapshot::builder()
        .host("h1", Resources::new(8., 16., 100., 10.))
        .host("h2", Resources::new(8., 16., 100., 10.))
        .host("h3", Resources::new(8., 16., 100., 10.))
        .tenant("t1", Resources::new(6., 12., 60., 6.), "h1")
        .tenant("t2", Resources::new(4., 8., 50., 5.), "h2")
        .tenant("t3", Resources::new(4., 8., 50., 5.), "h3")
        .build()
        .unwrap()
}

///////////////////////////////////////////////////////////////////////////////

#[test]
fn test_safe_fleet_emits_slack_without_moving() {
    let mut h = harness(safe_fleet(), MoveOutcome::Done, MaintainerConfig::new());
    assert_eq!(h.maintainer.tick_interval(), 600.);
    h.maintainer.tick().unwrap();

    assert_eq!(
        *h.values.borrow(),
        vec![
            ("overcommittedHosts".to_string(), 0),
            ("spareHostCapacity".to_string(), 2),
        ]
    );
    assert!(h.moves.borrow().is_empty());
}

#[test]
fn test_zero_slack_dispatches_first_move_of_mitigation() {
    let snapshot = tight_fleet(false);
    let expected = Move::new(
        snapshot.find_tenant("t_b").unwrap(),
        snapshot.find_host("hb").unwrap(),
        snapshot.find_host("hd").unwrap(),
    );
    let mut h = harness(snapshot, MoveOutcome::Done, MaintainerConfig::new());
    h.maintainer.tick().unwrap();

    assert_eq!(
        *h.values.borrow(),
        vec![
            ("overcommittedHosts".to_string(), 0),
            ("spareHostCapacity".to_string(), 1),
        ]
    );
    assert_eq!(
        *h.moves.borrow(),
        vec![(expected, "spareCapacityMaintainer".to_string())]
    );
}

#[test]
// A retired tenant means the relocation is already under way: report the
// optimistic slack without asking the deployer again.
fn test_retired_tenant_counts_as_move_in_progress() {
    let mut h = harness(tight_fleet(true), MoveOutcome::Done, MaintainerConfig::new());
    h.maintainer.tick().unwrap();

    assert_eq!(
        *h.values.borrow(),
        vec![
            ("overcommittedHosts".to_string(), 0),
            ("spareHostCapacity".to_string(), 1),
        ]
    );
    assert!(h.moves.borrow().is_empty());
}

#[test]
// A refused dispatch leaves the slack gauge at zero.
fn test_refused_move_keeps_slack_at_zero() {
    let mut h = harness(tight_fleet(false), MoveOutcome::Refused, MaintainerConfig::new());
    h.maintainer.tick().unwrap();

    assert_eq!(
        *h.values.borrow(),
        vec![
            ("overcommittedHosts".to_string(), 0),
            ("spareHostCapacity".to_string(), 0),
        ]
    );
    assert_eq!(h.moves.borrow().len(), 1);
}

#[test]
// When no relocation chain exists the gauge reports zero and nothing moves.
fn test_unsolvable_fleet_reports_zero_slack() {
    let mut h = harness(unsolvable_fleet(), MoveOutcome::Done, MaintainerConfig::new());
    h.maintainer.tick().unwrap();

    assert_eq!(
        *h.values.borrow(),
        vec![
            ("overcommittedHosts".to_string(), 0),
            ("spareHostCapacity".to_string(), 0),
        ]
    );
    assert!(h.moves.borrow().is_empty());
}

#[test]
fn test_overcommitted_hosts_are_counted() {
    let snapshot = FleetSnapshot::builder()
        .host("h1", Resources::new(8., 16., 100., 10.))
        .host("h2", Resources::new(8., 16., 100., 10.))
        .tenant("t1", Resources::new(6., 12., 60., 6.), "h1")
        .tenant("t2", Resources::new(4., 8., 50., 5.), "h1")
        .build()
        .unwrap();
    let mut h = harness(snapshot, MoveOutcome::Done, MaintainerConfig::new());
    h.maintainer.tick().unwrap();

    assert_eq!(
        *h.values.borrow(),
        vec![
            ("overcommittedHosts".to_string(), 1),
            ("spareHostCapacity".to_string(), 0),
        ]
    );
    assert!(h.moves.borrow().is_empty());
}

#[test]
// Without shared hosting there is nothing to maintain: no metrics, no moves.
fn test_disallowed_host_sharing_skips_the_tick() {
    let mut config = MaintainerConfig::new();
    config.allow_host_sharing = false;
    let mut h = harness(tight_fleet(false), MoveOutcome::Done, config);
    h.maintainer.tick().unwrap();

    assert!(h.values.borrow().is_empty());
    assert!(h.moves.borrow().is_empty());
}

#[test]
// A failed snapshot fetch aborts the tick before any analysis.
fn test_snapshot_failure_aborts_tick() {
    let values = rc!(refcell!(Vec::new()));
    let moves = rc!(refcell!(Vec::new()));
    let mut maintainer = SpareCapacityMaintainer::new(
        Box::new(FailingProvider),
        Box::new(RecordingDeployer {
            outcome: MoveOutcome::Done,
            moves: moves.clone(),
        }),
        Box::new(RecordingSink {
            values: values.clone(),
        }),
        MaintainerConfig::new(),
    );

    let result = maintainer.tick();
    assert!(matches!(result, Err(CapacityError::SnapshotUnavailable(_))));
    assert!(values.borrow().is_empty());
    assert!(moves.borrow().is_empty());
}

#[test]
// Two maintainers over the same snapshot report and recommend identically.
fn test_ticks_are_deterministic() {
    let mut first = harness(tight_fleet(false), MoveOutcome::Done, MaintainerConfig::new());
    let mut second = harness(tight_fleet(false), MoveOutcome::Done, MaintainerConfig::new());
    first.maintainer.tick().unwrap();
    second.maintainer.tick().unwrap();

    assert_eq!(*first.values.borrow(), *second.values.borrow());
    assert_eq!(*first.moves.borrow(), *second.moves.borrow());
}

///////////////////////////////////////////////////////////////////////////////

#[test]
fn test_config_defaults() {
    let config = MaintainerConfig::new();
    assert_eq!(config.max_iterations, 10_000);
    assert_eq!(config.max_eviction_subset_size, 5);
    assert_eq!(config.max_considered_nodes, 31);
    assert!(config.allow_host_sharing);
}

#[test]
// Values present in the file override defaults; absent ones fall back.
fn test_config_from_file() {
    let config = MaintainerConfig::from_file("test-configs/maintainer.yaml").unwrap();
    assert_eq!(config.tick_interval, 30.);
    assert_eq!(config.max_iterations, 2000);
    assert_eq!(config.max_eviction_subset_size, 5);
    assert_eq!(config.max_considered_nodes, 31);
    assert!(config.allow_host_sharing);
}
