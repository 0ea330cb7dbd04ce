//! Behavioural tests for `RoutePlanner` using rstest-bdd.

use std::cell::{Ref, RefCell};
use std::sync::Arc;

use chrono::{Duration, Utc};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::Runtime;
use tollroute_core::cache::{ROUTE_TTL, route_key};
use tollroute_core::geometry::Direction;
use tollroute_core::poi::Toll;
use tollroute_core::request::{
    FuelProfile, RouteOptions, Scope, TripProfile, TypeRoute, VehicleType,
};
use tollroute_core::store::{PoiSeed, PublicQuota};
use tollroute_core::test_support::{
    FixtureGeocoder, FixtureReverseGeocoder, MemoryRouteStore, StubRoutingEngine,
    straight_alternative,
};
use tollroute_core::{
    Caller, FinalOutput, LatLng, PlanError, PlannerConfig, PlannerPorts, Profile, RouteRequest,
    RoutePlanner, RouteStore, RoutingEngine, RoutingError, TwoTierCache,
};

const CUIABA: LatLng = LatLng::new(-15.6014, -56.0979);
const SAO_PAULO: LatLng = LatLng::new(-23.5505, -46.6333);
const ORIGIN: &str = "Cuiabá, Mato Grosso";
const DESTINATION: &str = "São Paulo, São Paulo";
const UNKNOWN: &str = "xyznonsense";

/// Shared state for planning scenarios; the planner is built on first use so
/// `given` steps can still reconfigure the routing stub.
struct PlanningWorld {
    runtime: Runtime,
    store: Arc<MemoryRouteStore>,
    cache: Arc<TwoTierCache>,
    routing: RefCell<StubRoutingEngine>,
    planner: RefCell<Option<RoutePlanner>>,
    outcome: RefCell<Option<Result<FinalOutput, PlanError>>>,
}

impl PlanningWorld {
    fn new() -> Self {
        Self {
            runtime: tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("build runtime"),
            store: Arc::new(MemoryRouteStore::with_seed(PoiSeed {
                tolls: vec![plaza()],
                ..PoiSeed::default()
            })),
            cache: Arc::new(TwoTierCache::local_only()),
            routing: RefCell::new(StubRoutingEngine::straight_line()),
            planner: RefCell::new(None),
            outcome: RefCell::new(None),
        }
    }

    fn planner(&self) -> Ref<'_, RoutePlanner> {
        if self.planner.borrow().is_none() {
            let routing = std::mem::take(&mut *self.routing.borrow_mut());
            let geocoder = FixtureGeocoder::default()
                .with_place(
                    "cuiabá, mato grosso",
                    "Cuiabá - MT, Brasil",
                    "place-cuiaba",
                    CUIABA,
                )
                .with_place(
                    "Praça da Sé, São Paulo",
                    "Praça da Sé - Sé, São Paulo - SP, Brasil",
                    "place-se",
                    SAO_PAULO,
                );
            let planner = RoutePlanner::new(
                PlannerPorts {
                    store: Arc::clone(&self.store) as Arc<dyn RouteStore>,
                    geocoder: Arc::new(geocoder),
                    reverse: Arc::new(FixtureReverseGeocoder::default()),
                    routing: Arc::new(routing) as Arc<dyn RoutingEngine>,
                    cache: Arc::clone(&self.cache),
                },
                PlannerConfig::default(),
            );
            *self.planner.borrow_mut() = Some(planner);
        }
        Ref::map(self.planner.borrow(), |planner| {
            planner.as_ref().expect("planner was just built")
        })
    }

    fn plan(&self, origin: &str, type_route: TypeRoute, scope: Scope, caller: Caller) {
        let request = RouteRequest {
            origin: origin.to_owned(),
            destination: DESTINATION.to_owned(),
            waypoints: Vec::new(),
            trip: trip(type_route, scope),
        };
        let planner = self.planner();
        let outcome = self.runtime.block_on(planner.plan(request, caller));
        *self.outcome.borrow_mut() = Some(outcome);
    }

    fn output(&self) -> Ref<'_, FinalOutput> {
        Ref::map(self.outcome.borrow(), |outcome| {
            match outcome.as_ref().expect("a plan was attempted") {
                Ok(output) => output,
                Err(err) => panic!("plan failed: {err}"),
            }
        })
    }

    fn error(&self) -> Ref<'_, PlanError> {
        Ref::map(self.outcome.borrow(), |outcome| {
            match outcome.as_ref().expect("a plan was attempted") {
                Ok(_) => panic!("plan unexpectedly succeeded"),
                Err(err) => err,
            }
        })
    }
}

fn trip(type_route: TypeRoute, scope: Scope) -> TripProfile {
    TripProfile {
        axles: 5,
        vehicle: VehicleType::Truck,
        fuel: FuelProfile {
            price: 6.0,
            consumption_city: 6.0,
            consumption_hwy: 8.0,
        },
        type_route,
        scope,
        favorite: false,
        options: RouteOptions::default(),
    }
}

fn plaza() -> Toll {
    Toll {
        id: 41,
        // Midpoint of the straight Cuiabá to São Paulo line.
        location: LatLng::new(-19.57595, -51.3656),
        name: "Praça Rondonópolis".to_owned(),
        concession: "Rota do Oeste".to_owned(),
        road: "BR-364".to_owned(),
        uf: "MT".to_owned(),
        direction: Direction::Both,
        tariff: 12.4,
        free_flow: false,
        pay_free_flow: String::new(),
    }
}

#[fixture]
fn world() -> PlanningWorld {
    PlanningWorld::new()
}

#[given("a planner over the Cuiabá to São Paulo corridor")]
fn given_corridor(world: &PlanningWorld) {
    let tolls = world.store.get_tolls().expect("seeded tolls");
    assert_eq!(tolls, vec![plaza()]);
}

#[given("the toll-avoiding profile detours around the plaza")]
fn given_detour(world: &PlanningWorld) {
    let detour = straight_alternative(&[CUIABA, LatLng::new(-19.0, -48.0), SAO_PAULO]);
    let routing = std::mem::take(&mut *world.routing.borrow_mut());
    *world.routing.borrow_mut() = routing.with_alternatives(Profile::Cheapest, vec![detour]);
}

#[given("the motorway-avoiding profile is rejected by the engine")]
fn given_rejected_profile(world: &PlanningWorld) {
    let routing = std::mem::take(&mut *world.routing.borrow_mut());
    *world.routing.borrow_mut() = routing.failing(
        Profile::Efficient,
        RoutingError::Rejected {
            code: "NoRoute".to_owned(),
            message: "Impossible route between points".to_owned(),
        },
    );
}

#[given("public token {token} has made {used} requests today")]
fn given_used_token(world: &PlanningWorld, token: i64, used: i64) {
    world.store.set_quota(PublicQuota {
        id: token,
        ip: "203.0.113.7".to_owned(),
        number_request: used,
        expired_at: Utc::now() + Duration::hours(6),
    });
}

#[when("user {user} plans a private {kind} trip")]
fn when_private_plan(world: &PlanningWorld, user: i64, kind: String) {
    world.plan(ORIGIN, TypeRoute::parse(&kind), Scope::Private, Caller::user(user));
}

#[when("token {token} plans a public {kind} trip")]
fn when_public_plan(world: &PlanningWorld, token: i64, kind: String) {
    world.plan(ORIGIN, TypeRoute::parse(&kind), Scope::Public, Caller::public(token));
}

#[when("user {user} plans a trip from an unknown origin")]
fn when_unknown_origin(world: &PlanningWorld, user: i64) {
    world.plan(UNKNOWN, TypeRoute::Any, Scope::Private, Caller::user(user));
}

#[then("one route labelled {label} is returned")]
fn then_one_route(world: &PlanningWorld, label: String) {
    let output = world.output();
    assert_eq!(output.routes.len(), 1);
    let route = output.routes.first().expect("one route");
    assert_eq!(route.summary.route_type, label);
}

#[then("the highway fuel cost follows the route distance")]
#[expect(clippy::float_arithmetic, reason = "fuel cost is fractional")]
fn then_fuel_cost(world: &PlanningWorld) {
    let output = world.output();
    let route = output.routes.first().expect("one route");
    let costs = route.costs.as_ref().expect("costs section");
    let distance_km = route.summary.distance.value / 1000.0;
    assert!((costs.fuel_in_the_hwy - (6.0 / 8.0 * distance_km).round()).abs() <= 1.0);
    assert!(route.summary.has_tolls);
}

#[then("the first instruction starts the journey")]
fn then_first_instruction(world: &PlanningWorld) {
    let output = world.output();
    let route = output.routes.first().expect("one route");
    let first = route
        .instructions
        .as_ref()
        .and_then(|steps| steps.first())
        .expect("instructions section");
    assert!(first.text.starts_with("Inicie sua viagem"));
}

#[then("the route lists no tolls")]
fn then_no_tolls(world: &PlanningWorld) {
    let output = world.output();
    let route = output.routes.first().expect("one route");
    assert!(route.tolls.as_ref().is_some_and(Vec::is_empty));
    assert!(!route.summary.has_tolls);
}

#[then("the request fails with the daily limit message")]
fn then_quota_message(world: &PlanningWorld) {
    let err = world.error();
    assert!(matches!(*err, PlanError::QuotaExceeded { .. }));
    assert!(err.to_string().contains("limite de requisições"));
}

#[then("token {token} still shows {used} requests")]
fn then_quota_unchanged(world: &PlanningWorld, token: i64, used: i64) {
    let quota = world
        .store
        .get_public_quota(token)
        .expect("quota lookup")
        .expect("quota row");
    assert_eq!(quota.number_request, used);
}

#[then("the request fails naming the unknown origin")]
fn then_address_not_found(world: &PlanningWorld) {
    let err = world.error();
    assert!(matches!(*err, PlanError::AddressNotFound { which: "origem", .. }));
    assert!(
        err.to_string()
            .starts_with("Endereço não encontrado para: xyznonsense")
    );
}

#[then("the request fails because routing is unavailable")]
fn then_routing_unavailable(world: &PlanningWorld) {
    let err = world.error();
    assert!(matches!(
        *err,
        PlanError::RoutingUnavailable {
            profile: Profile::Efficient,
            ..
        }
    ));
}

#[then("nothing is cached or recorded")]
fn then_nothing_cached(world: &PlanningWorld) {
    let key = route_key(ORIGIN, DESTINATION, &[], 5, VehicleType::Truck);
    let cached = world.runtime.block_on(world.cache.get(&key, ROUTE_TTL));
    assert!(cached.is_none());
    assert!(world.store.history().is_empty());
}

#[then("the history row for user {user} counts {count} requests")]
fn then_history_count(world: &PlanningWorld, user: i64, count: i64) {
    let history = world.store.history();
    let row = history
        .iter()
        .find(|row| row.key.user_id == user)
        .expect("history row");
    assert_eq!(row.number_request, count);
    assert!(!row.key.is_public);
    assert_eq!(row.key.waypoints_key, "");
}

#[then("exactly one saved route exists")]
fn then_one_saved_route(world: &PlanningWorld) {
    assert_eq!(world.store.saved_routes().len(), 1);
}

#[scenario(path = "tests/features/route_planning.feature", index = 0)]
fn private_fastest_request(world: PlanningWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/route_planning.feature", index = 1)]
fn cheapest_keeps_toll_free_alternative(world: PlanningWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/route_planning.feature", index = 2)]
fn exhausted_public_token(world: PlanningWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/route_planning.feature", index = 3)]
fn unknown_origin(world: PlanningWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/route_planning.feature", index = 4)]
fn rejected_routing_profile(world: PlanningWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/route_planning.feature", index = 5)]
fn repeated_request(world: PlanningWorld) {
    let _ = world;
}
