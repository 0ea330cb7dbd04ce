//! Unit tests for the route planner.

use super::*;
use crate::geometry::Direction;
use crate::poi::Toll;
use crate::request::{FuelProfile, RouteOptions, TypeRoute, VehicleType};
use crate::store::{PoiSeed, PublicQuota};
use crate::test_support::{
    FixtureGeocoder, FixtureReverseGeocoder, MemoryRouteStore, StubRoutingEngine,
};
use chrono::Duration as ChronoDuration;
use rstest::{fixture, rstest};

const ORIGIN: LatLng = LatLng::new(-10.0, -50.0);
const DESTINATION: LatLng = LatLng::new(-12.0, -50.0);

struct Harness {
    planner: RoutePlanner,
    store: Arc<MemoryRouteStore>,
    routing: Arc<StubRoutingEngine>,
    cache: Arc<TwoTierCache>,
}

fn toll() -> Toll {
    Toll {
        id: 7,
        location: LatLng::new(-11.0, -50.0),
        name: "Praça Rio Verde".to_owned(),
        concession: "Rota do Oeste".to_owned(),
        road: "BR-163".to_owned(),
        uf: "MT".to_owned(),
        direction: Direction::Both,
        tariff: 10.0,
        free_flow: false,
        pay_free_flow: String::new(),
    }
}

fn geocoder() -> FixtureGeocoder {
    FixtureGeocoder::default()
        .with_place("cuiabá, mt", "Cuiabá - MT, Brasil", "place-cuiaba", ORIGIN)
        .with_place("campinas, sp", "Campinas - SP, Brasil", "place-campinas", DESTINATION)
}

fn harness_with(routing: StubRoutingEngine, provider: FixtureGeocoder) -> Harness {
    let store = Arc::new(MemoryRouteStore::with_seed(PoiSeed {
        tolls: vec![toll()],
        ..PoiSeed::default()
    }));
    let routing = Arc::new(routing);
    let cache = Arc::new(TwoTierCache::local_only());
    let reverse = FixtureReverseGeocoder::default()
        .with_name(ORIGIN, "Cuiabá, MT")
        .with_name(DESTINATION, "Campinas, SP");
    let planner = RoutePlanner::new(
        PlannerPorts {
            store: Arc::clone(&store) as Arc<dyn RouteStore>,
            geocoder: Arc::new(provider),
            reverse: Arc::new(reverse),
            routing: Arc::clone(&routing) as Arc<dyn RoutingEngine>,
            cache: Arc::clone(&cache),
        },
        PlannerConfig::default(),
    );
    Harness {
        planner,
        store,
        routing,
        cache,
    }
}

#[fixture]
fn harness() -> Harness {
    harness_with(StubRoutingEngine::straight_line(), geocoder())
}

fn trip(type_route: TypeRoute, scope: Scope, options: RouteOptions) -> TripProfile {
    TripProfile {
        axles: 2,
        vehicle: VehicleType::Auto,
        fuel: FuelProfile {
            price: 6.0,
            consumption_city: 10.0,
            consumption_hwy: 12.0,
        },
        type_route,
        scope,
        favorite: false,
        options,
    }
}

fn request(trip: TripProfile) -> RouteRequest {
    RouteRequest {
        origin: "Cuiabá, MT".to_owned(),
        destination: "Campinas, SP".to_owned(),
        waypoints: Vec::new(),
        trip,
    }
}

#[rstest]
#[tokio::test]
async fn returns_one_route_per_profile(harness: Harness) {
    let output = harness
        .planner
        .plan(
            request(trip(TypeRoute::Any, Scope::Private, RouteOptions::default())),
            Caller::user(3),
        )
        .await
        .expect("plan succeeds");

    assert_eq!(output.routes.len(), 3);
    let first = output.routes.first().expect("fastest route");
    assert!(first.summary.has_tolls);
    let tolls = first.tolls.as_ref().expect("tolls section");
    assert_eq!(tolls.iter().map(|toll| toll.id).collect::<Vec<_>>(), vec![7]);
    assert_eq!(output.summary.location_origin.address, "Cuiabá - MT, Brasil");
    assert!(output.summary.route_hist_id > 0);
    assert_eq!(harness.store.history().len(), 1);
    assert_eq!(harness.store.saved_routes().len(), 1);
}

#[rstest]
#[tokio::test]
async fn specific_type_route_keeps_one_route(harness: Harness) {
    let output = harness
        .planner
        .plan(
            request(trip(TypeRoute::Cheapest, Scope::Private, RouteOptions::default())),
            Caller::user(3),
        )
        .await
        .expect("plan succeeds");

    assert_eq!(output.routes.len(), 1);
    let only = output.routes.first().expect("one route");
    assert_eq!(only.summary.route_type, Profile::Cheapest.label());
}

#[rstest]
#[tokio::test]
async fn minimal_options_return_summary_only(harness: Harness) {
    let output = harness
        .planner
        .plan(
            request(trip(TypeRoute::Any, Scope::Private, RouteOptions::none())),
            Caller::user(3),
        )
        .await
        .expect("plan succeeds");

    assert_eq!(output.routes.len(), 1);
    let only = output.routes.first().expect("one route");
    assert_eq!(only.summary.route_type, Profile::Efficient.label());
    assert!(!only.summary.has_tolls);
    assert!(only.tolls.is_none());
    assert!(only.polyline.is_none());
}

#[rstest]
#[case(Scope::Private, Caller::public(4))]
#[case(Scope::Public, Caller::user(4))]
#[case(Scope::Private, Caller::user(0))]
#[tokio::test]
async fn rejects_missing_caller_id(harness: Harness, #[case] scope: Scope, #[case] caller: Caller) {
    let err = harness
        .planner
        .plan(request(trip(TypeRoute::Any, scope, RouteOptions::default())), caller)
        .await
        .expect_err("caller id is required");
    assert!(matches!(err, PlanError::BadRequest(ref message) if message == "ID inválido"));
    assert!(harness.routing.requests().is_empty());
}

#[rstest]
#[tokio::test]
async fn exhausted_token_is_rejected_without_increment(harness: Harness) {
    let now = Utc::now();
    harness.store.set_quota(PublicQuota {
        id: 9,
        ip: "10.0.0.1".to_owned(),
        number_request: 2,
        expired_at: now + ChronoDuration::hours(3),
    });

    let err = harness
        .planner
        .plan(
            request(trip(TypeRoute::Any, Scope::Public, RouteOptions::default())),
            Caller::public(9),
        )
        .await
        .expect_err("quota is exhausted");

    assert!(matches!(err, PlanError::QuotaExceeded { max: 2 }));
    assert!(err.to_string().contains("limite de requisições"));
    let quota = harness
        .store
        .get_public_quota(9)
        .expect("quota lookup")
        .expect("quota row");
    assert_eq!(quota.number_request, 2);
}

#[rstest]
#[tokio::test]
async fn unknown_address_names_the_input(harness: Harness) {
    let mut unknown = request(trip(TypeRoute::Any, Scope::Private, RouteOptions::default()));
    unknown.origin = "xyznonsense".to_owned();

    let err = harness
        .planner
        .plan(unknown, Caller::user(3))
        .await
        .expect_err("origin cannot be geocoded");

    assert!(matches!(err, PlanError::AddressNotFound { which: "origem", .. }));
    assert!(err.to_string().starts_with("Endereço não encontrado para: xyznonsense"));
}

#[rstest]
#[tokio::test]
async fn routing_failure_writes_no_cache_entry() {
    let harness = harness_with(
        StubRoutingEngine::straight_line().failing(
            Profile::Efficient,
            RoutingError::Rejected {
                code: "NoRoute".to_owned(),
                message: String::new(),
            },
        ),
        geocoder(),
    );

    let err = harness
        .planner
        .plan(
            request(trip(TypeRoute::Any, Scope::Private, RouteOptions::default())),
            Caller::user(3),
        )
        .await
        .expect_err("efficient profile fails");

    assert!(matches!(
        err,
        PlanError::RoutingUnavailable {
            profile: Profile::Efficient,
            ..
        }
    ));
    let key = route_key("Cuiabá, MT", "Campinas, SP", &[], 2, VehicleType::Auto);
    assert!(harness.cache.get(&key, ROUTE_TTL).await.is_none());
    assert!(harness.store.history().is_empty());
}

#[rstest]
#[tokio::test]
async fn cache_hit_skips_routing_but_counts_history(harness: Harness) {
    let first = harness
        .planner
        .plan(
            request(trip(TypeRoute::Any, Scope::Private, RouteOptions::default())),
            Caller::user(3),
        )
        .await
        .expect("first plan");
    let calls = harness.routing.requests().len();

    let second = harness
        .planner
        .plan(
            request(trip(TypeRoute::Any, Scope::Private, RouteOptions::default())),
            Caller::user(3),
        )
        .await
        .expect("second plan");

    assert_eq!(harness.routing.requests().len(), calls);
    assert_eq!(first.routes, second.routes);
    let history = harness.store.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history.first().map(|row| row.number_request), Some(2));
    assert_eq!(harness.store.saved_routes().len(), 1);
}

#[rstest]
#[tokio::test]
async fn cached_route_with_other_options_is_recomputed(harness: Harness) {
    harness
        .planner
        .plan(
            request(trip(TypeRoute::Any, Scope::Private, RouteOptions::default())),
            Caller::user(3),
        )
        .await
        .expect("first plan");
    let calls = harness.routing.requests().len();

    let options = RouteOptions {
        include_polyline: false,
        ..RouteOptions::default()
    };
    let second = harness
        .planner
        .plan(request(trip(TypeRoute::Any, Scope::Private, options)), Caller::user(3))
        .await
        .expect("second plan");

    assert!(harness.routing.requests().len() > calls);
    assert!(second.routes.iter().all(|route| route.polyline.is_none()));
}

#[rstest]
#[tokio::test]
async fn favourite_requests_are_listed_for_their_owner(harness: Harness) {
    let mut wanted = trip(TypeRoute::Fastest, Scope::Private, RouteOptions::default());
    wanted.favorite = true;
    harness
        .planner
        .plan(request(wanted), Caller::user(5))
        .await
        .expect("plan succeeds");

    let favourites = harness.planner.favorites(5).await.expect("list favourites");
    assert_eq!(favourites.len(), 1);
    let id = favourites.first().map(|row| row.id).expect("favourite id");
    assert!(harness.planner.favorites(6).await.expect("other user").is_empty());
    assert!(!harness.planner.remove_favorite(6, id).await.expect("foreign removal"));
    assert!(harness.planner.remove_favorite(5, id).await.expect("owner removal"));
}

#[rstest]
#[tokio::test]
async fn coordinate_plan_keeps_supplied_positions(harness: Harness) {
    let output = harness
        .planner
        .plan_coordinates(
            CoordinateRouteRequest {
                origin: ORIGIN,
                destination: DESTINATION,
                waypoints: Vec::new(),
                trip: trip(TypeRoute::Fastest, Scope::Private, RouteOptions::default()),
            },
            Caller::user(3),
        )
        .await
        .expect("coordinate plan");

    assert_eq!(output.summary.location_origin.location, ORIGIN);
    assert_eq!(output.summary.location_origin.address, "Cuiabá - MT, Brasil");
    let (_, path) = harness.routing.requests().into_iter().next().expect("routing call");
    assert_eq!(path, vec![ORIGIN, DESTINATION]);
}

#[rstest]
#[tokio::test]
async fn coordinate_plan_survives_geocoder_outage() {
    let harness = harness_with(StubRoutingEngine::straight_line(), FixtureGeocoder::failing());
    let output = harness
        .planner
        .plan_coordinates(
            CoordinateRouteRequest {
                origin: ORIGIN,
                destination: DESTINATION,
                waypoints: Vec::new(),
                trip: trip(TypeRoute::Fastest, Scope::Private, RouteOptions::default()),
            },
            Caller::user(3),
        )
        .await
        .expect("coordinate plan");

    assert_eq!(output.summary.location_origin.address, "Cuiabá, MT");
    let route = output.routes.first().expect("one route");
    assert!(route.summary.url_waze.is_empty());
}

#[rstest]
#[tokio::test]
async fn simple_route_reports_figures_and_labels(harness: Harness) {
    let output = harness
        .planner
        .simple_route(&SimpleRouteRequest {
            origin_lat: ORIGIN.lat,
            origin_lng: ORIGIN.lng,
            destination_lat: DESTINATION.lat,
            destination_lng: DESTINATION.lng,
        })
        .await
        .expect("simple route");

    assert_eq!(output.summary.location_origin.address, "Cuiabá, MT");
    assert_eq!(output.summary.location_destination.address, "Campinas, SP");
    assert!(output.summary.routes.distance.value > 0.0);
    assert!(harness.store.history().is_empty());
}

#[rstest]
#[tokio::test]
async fn simple_route_failure_is_routing_unavailable() {
    let harness = harness_with(
        StubRoutingEngine::straight_line().failing_simple(RoutingError::Timeout),
        geocoder(),
    );
    let err = harness
        .planner
        .simple_route(&SimpleRouteRequest {
            origin_lat: ORIGIN.lat,
            origin_lng: ORIGIN.lng,
            destination_lat: DESTINATION.lat,
            destination_lng: DESTINATION.lng,
        })
        .await
        .expect_err("engine times out");
    assert!(matches!(
        err,
        PlanError::RoutingUnavailable {
            profile: Profile::Fastest,
            source: RoutingError::Timeout,
        }
    ));
}

#[rstest]
#[tokio::test]
async fn simple_route_rejects_invalid_coordinates(harness: Harness) {
    let err = harness
        .planner
        .simple_route(&SimpleRouteRequest {
            origin_lat: 120.0,
            origin_lng: 0.0,
            destination_lat: 0.0,
            destination_lng: 0.0,
        })
        .await
        .expect_err("latitude out of range");
    assert!(matches!(err, PlanError::BadRequest(_)));
}
