//! Behavioural tests for public-token quota accounting over SQLite.

use std::cell::RefCell;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use tollroute_core::test_support::{
    FixtureGeocoder, FixtureReverseGeocoder, StubRoutingEngine,
};
use tollroute_core::{
    PlanError, PlannerConfig, PlannerPorts, RoutePlanner, RouteStore, SqliteRouteStore,
    TwoTierCache,
};

struct QuotaWorld {
    _temp_dir: TempDir,
    runtime: Runtime,
    store: Arc<SqliteRouteStore>,
    planner: RoutePlanner,
    outcomes: RefCell<Vec<Result<(), PlanError>>>,
}

impl QuotaWorld {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = Arc::new(
            SqliteRouteStore::open(temp_dir.path().join("routes.db")).expect("open store"),
        );
        let planner = RoutePlanner::new(
            PlannerPorts {
                store: Arc::clone(&store) as Arc<dyn RouteStore>,
                geocoder: Arc::new(FixtureGeocoder::default()),
                reverse: Arc::new(FixtureReverseGeocoder::default()),
                routing: Arc::new(StubRoutingEngine::straight_line()),
                cache: Arc::new(TwoTierCache::local_only()),
            },
            PlannerConfig::default(),
        );
        Self {
            _temp_dir: temp_dir,
            runtime: tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("build runtime"),
            store,
            planner,
            outcomes: RefCell::new(Vec::new()),
        }
    }
}

#[fixture]
fn world() -> QuotaWorld {
    QuotaWorld::new()
}

#[given("a planner backed by a fresh SQLite database")]
fn given_fresh_database(world: &QuotaWorld) {
    assert!(world.store.get_public_quota(12).expect("quota lookup").is_none());
}

#[given("public token {token} used {used} requests in a window that ended yesterday")]
fn given_expired_window(world: &QuotaWorld, token: i64, used: u32) {
    let long_ago = Utc::now() - Duration::days(2);
    for _ in 0..used {
        world
            .store
            .bump_public_quota(token, used, long_ago)
            .expect("seed quota");
    }
}

#[when("public token {token} is charged {times} times")]
fn when_charged(world: &QuotaWorld, token: i64, times: usize) {
    for _ in 0..times {
        let outcome = world
            .runtime
            .block_on(world.planner.check_public_quota(token));
        world.outcomes.borrow_mut().push(outcome);
    }
}

#[then("the charges were {verdicts}")]
fn then_verdicts(world: &QuotaWorld, verdicts: String) {
    let seen: Vec<&str> = world
        .outcomes
        .borrow()
        .iter()
        .map(|outcome| match outcome {
            Ok(()) => "granted",
            Err(PlanError::QuotaExceeded { .. }) => "refused",
            Err(PlanError::BadRequest(_)) => "rejected",
            Err(other) => panic!("unexpected failure: {other}"),
        })
        .collect();
    let expected: Vec<&str> = verdicts.split(',').collect();
    assert_eq!(seen, expected);
}

#[then("token {token} has used {used} requests")]
fn then_used(world: &QuotaWorld, token: i64, used: i64) {
    let quota = world
        .store
        .get_public_quota(token)
        .expect("quota lookup")
        .expect("quota row");
    assert_eq!(quota.number_request, used);
    assert!(quota.expired_at > Utc::now());
}

#[scenario(path = "tests/features/public_quota.feature", index = 0)]
fn third_request_refused(world: QuotaWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/public_quota.feature", index = 1)]
fn expired_window_restarts(world: QuotaWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/public_quota.feature", index = 2)]
fn non_positive_token(world: QuotaWorld) {
    let _ = world;
}
