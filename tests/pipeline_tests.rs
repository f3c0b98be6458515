//! End-to-end pipeline tests over the public API, with in-process stand-ins
//! for every network service.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use travelmap::geocoding::{
    GeocodeCandidate, GeocodeStage, MapSdkGeocoder, SdkStage, StaticCityTable, select_best,
};
use travelmap::models::{Coordinates, PlanDocument, RouteClass, RouteKind};
use travelmap::render::{self, MapScene, PlanRenderer, Progress};
use travelmap::routing::{RouteBuilder, RouteProvider};
use travelmap::{DrivingRoute, GeocodeResolver, Result, TravelMapError};

const PLAN: &str = include_str!("fixtures/beijing_plan.json");

const EIFFEL_CANDIDATES: &str = r#"[
    {"lat": "48.8588897", "lon": "2.3200410", "display_name": "Paris, Île-de-France, France métropolitaine, France",
     "class": "boundary", "type": "administrative", "osm_type": "relation", "importance": 0.88,
     "address": {"city": "Paris", "state": "Île-de-France", "country": "France"}},
    {"lat": "48.8582599", "lon": "2.2945006", "display_name": "Eiffel Tower Paris, Avenue Anatole France, Paris, France",
     "class": "tourism", "type": "attraction", "osm_type": "way", "importance": 0.62,
     "address": {"tourism": "Tour Eiffel", "city": "Paris", "country": "France"}}
]"#;

struct CountingStage {
    name: &'static str,
    result: Option<Coordinates>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl GeocodeStage for CountingStage {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn geocode(&self, _address: &str) -> Result<Coordinates> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .ok_or_else(|| TravelMapError::stage(self.name, "no match"))
    }
}

/// Public geocoder stand-in answering from canned search results
struct CannedSearch(&'static str);

#[async_trait]
impl GeocodeStage for CannedSearch {
    fn name(&self) -> &'static str {
        "public-geocoder"
    }

    async fn geocode(&self, address: &str) -> Result<Coordinates> {
        let candidates: Vec<GeocodeCandidate> = serde_json::from_str(self.0)?;
        select_best(&candidates, address)
            .map(GeocodeCandidate::coordinates)
            .ok_or_else(|| TravelMapError::stage("public-geocoder", "no candidates"))
    }
}

/// Map provider that answers long after any sensible timeout
struct StalledProvider {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl MapSdkGeocoder for StalledProvider {
    async fn get_location(&self, _address: &str) -> Result<Coordinates> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(Coordinates::new(0.0, 0.0))
    }
}

fn stalled_sdk(timeout_ms: u64) -> (Box<dyn GeocodeStage>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = StalledProvider {
        calls: calls.clone(),
    };
    (Box::new(SdkStage::new(Some(Box::new(provider)), timeout_ms)), calls)
}

struct Gazetteer(HashMap<&'static str, Coordinates>);

#[async_trait]
impl GeocodeStage for Gazetteer {
    fn name(&self) -> &'static str {
        "gazetteer"
    }

    async fn geocode(&self, address: &str) -> Result<Coordinates> {
        self.0
            .get(address)
            .copied()
            .ok_or_else(|| TravelMapError::stage("gazetteer", "unknown"))
    }
}

/// Routes in straight lines, refusing any trip that ends at `refuse`
struct Backend {
    refuse: Coordinates,
    requests: Arc<Mutex<Vec<(Coordinates, Coordinates)>>>,
}

#[async_trait]
impl RouteProvider for Backend {
    async fn driving_route(&self, origin: Coordinates, destination: Coordinates) -> Result<DrivingRoute> {
        self.requests.lock().unwrap().push((origin, destination));
        if destination == self.refuse {
            return Err(TravelMapError::api("Backend error 400 Bad Request: 路径规划失败"));
        }
        let mid = Coordinates::new(
            (origin.lng + destination.lng) / 2.0,
            (origin.lat + destination.lat) / 2.0,
        );
        Ok(DrivingRoute {
            polyline: format!("{origin};{mid};{destination}"),
            distance: 2000.0,
            duration: 420.0,
            steps: Vec::new(),
        })
    }
}

fn counting(name: &'static str, result: Option<Coordinates>) -> (Box<dyn GeocodeStage>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let stage = CountingStage {
        name,
        result,
        calls: calls.clone(),
    };
    (Box::new(stage), calls)
}

#[tokio::test]
async fn test_beijing_comes_from_city_table() {
    let (proxy, proxy_calls) = counting("backend-proxy", Some(Coordinates::new(0.0, 0.0)));
    let (public, public_calls) = counting("public-geocoder", Some(Coordinates::new(0.0, 0.0)));
    let resolver = GeocodeResolver::new(vec![
        Box::new(SdkStage::new(None, 3000)),
        Box::new(StaticCityTable),
        proxy,
        public,
    ]);

    let beijing = resolver.resolve("北京").await.unwrap();
    assert!((beijing.lng - 116.407526).abs() < 1e-6);
    assert!((beijing.lat - 39.90403).abs() < 1e-6);
    assert_eq!(proxy_calls.load(Ordering::SeqCst), 0);
    assert_eq!(public_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_timed_out_map_provider_falls_back_to_city_table() {
    let (sdk, sdk_calls) = stalled_sdk(50);
    let (proxy, proxy_calls) = counting("backend-proxy", Some(Coordinates::new(0.0, 0.0)));
    let (public, public_calls) = counting("public-geocoder", Some(Coordinates::new(0.0, 0.0)));
    let resolver = GeocodeResolver::new(vec![sdk, Box::new(StaticCityTable), proxy, public]);

    let started = Instant::now();
    let place = resolver.locate("北京").await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(sdk_calls.load(Ordering::SeqCst), 1);
    assert_eq!(place.stage, "static-table");
    assert!((place.coordinates.lng - 116.407526).abs() < 1e-6);
    assert!((place.coordinates.lat - 39.90403).abs() < 1e-6);
    assert_eq!(proxy_calls.load(Ordering::SeqCst), 0);
    assert_eq!(public_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_timed_out_map_provider_reaches_backend_proxy() {
    let (sdk, _) = stalled_sdk(50);
    let (proxy, proxy_calls) = counting("backend-proxy", Some(Coordinates::new(121.4998, 31.2397)));
    let (public, public_calls) = counting("public-geocoder", None);
    let resolver = GeocodeResolver::new(vec![sdk, Box::new(StaticCityTable), proxy, public]);

    let place = resolver.locate("东方明珠").await.unwrap();
    assert_eq!(place.stage, "backend-proxy");
    assert_eq!(proxy_calls.load(Ordering::SeqCst), 1);
    assert_eq!(public_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_eiffel_tower_falls_through_to_ranked_public_geocoder() {
    let (proxy, proxy_calls) = counting("backend-proxy", None);
    let resolver = GeocodeResolver::new(vec![
        Box::new(SdkStage::new(None, 3000)),
        Box::new(StaticCityTable),
        proxy,
        Box::new(CannedSearch(EIFFEL_CANDIDATES)),
    ]);

    let tower = resolver.resolve("Eiffel Tower Paris").await.unwrap();
    // the attraction outranks the city boundary, and comes back longitude first
    assert_eq!(tower, Coordinates::new(2.2945006, 48.8582599));
    assert_eq!(proxy_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unresolvable_when_every_stage_fails() {
    let resolver = GeocodeResolver::new(vec![
        Box::new(SdkStage::new(None, 3000)),
        Box::new(StaticCityTable),
        Box::new(CannedSearch("[]")),
    ]);
    let err = resolver.resolve("南京大学").await.unwrap_err();
    assert!(matches!(err, TravelMapError::Unresolvable { .. }));
    assert!(err.user_message().contains("南京大学"));
}

#[tokio::test]
async fn test_plan_on_map_with_degraded_route() {
    let plan: PlanDocument = serde_json::from_str(PLAN).unwrap();

    let temple = Coordinates::new(116.4074, 39.8822);
    let gazetteer = Gazetteer(HashMap::from([
        ("北京 故宫", Coordinates::new(116.3972, 39.9163)),
        ("北京 景山公园", Coordinates::new(116.3966, 39.9254)),
        ("北京 四季民福", Coordinates::new(116.4036, 39.9139)),
        ("北京 王府井酒店", Coordinates::new(116.4107, 39.9145)),
        ("北京 天坛", temple),
    ]));
    let resolver = GeocodeResolver::new(vec![Box::new(StaticCityTable), Box::new(gazetteer)]);

    let requests = Arc::new(Mutex::new(Vec::new()));
    let routes = RouteBuilder::new(Box::new(Backend {
        refuse: temple,
        requests: requests.clone(),
    }));
    let renderer = PlanRenderer::new(resolver, routes);

    let mut scene = MapScene::default();
    let mut progress = Vec::new();
    let summary = renderer
        .show_plan_on_map(&plan, &mut scene, |p: &Progress| progress.push(p.clone()))
        .await
        .unwrap();

    // 故宫 and 王府井酒店 appear twice in the plan but are resolved once
    assert_eq!(progress.len(), 6);
    assert!(progress.iter().all(|p| p.total == 6));
    assert_eq!(summary.located, 5);
    assert_eq!(summary.unresolved, vec!["护国寺小吃"]);

    let names: Vec<&str> = scene.markers.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["故宫", "景山公园", "四季民福", "王府井酒店", "天坛"]);

    assert_eq!(requests.lock().unwrap().len(), 4);
    assert_eq!(scene.routes.len(), 4);
    assert_eq!(summary.degraded_routes, 1);

    let fallback = &scene.routes[3];
    assert_eq!(fallback.kind, RouteKind::Approximate);
    assert_eq!(fallback.class, RouteClass::Hotel);
    assert_eq!(fallback.stroke_style(), "dashed");
    assert_eq!(fallback.duration_seconds, 0.0);
    assert_eq!(fallback.path.len(), 2);
    assert!(fallback.distance_meters > 3000.0);

    assert!(scene.routes[..3].iter().all(|r| r.path.len() == 3));
    assert_eq!(summary.total_distance_km, 6.0);
    assert_eq!(summary.total_duration_min, 21);
    assert!(summary.notice.is_some());

    let json = serde_json::to_value(&scene).unwrap();
    assert_eq!(json["title"], "北京 旅行路线");
    assert_eq!(json["markers"][0]["coordinates"]["lng"], 116.3972);
}

#[test]
fn test_plan_stats_and_text_from_fixture() {
    let plan: PlanDocument = serde_json::from_str(PLAN).unwrap();
    let stats = render::plan_stats(&plan);
    assert_eq!(stats.activities, 4);
    assert_eq!(stats.restaurants, 2);
    assert_eq!(stats.estimated_cost, Some(4820.0));
    assert_eq!(stats.feature_tags, vec!["历史文化", "美食", "亲子"]);

    let text = render::render_plan_text(&plan);
    assert!(text.contains("🎯 活动2：故宫"));
    assert!(text.contains("合计：¥3,447"));
}

#[tokio::test]
async fn test_loose_plan_still_reaches_the_map() {
    // shapes a language-model planner produces: string counts, null text, null lists
    let plan: PlanDocument = serde_json::from_str(
        r#"{"destination": "北京", "days": "1", "travelers": null, "preferences": null,
            "itinerary": {"days": [{"day": "1",
                "activities": [{"name": "故宫", "description": null, "estimated_cost": "60"},
                               {"name": "天坛", "description": null}],
                "meals": null,
                "accommodation": {"name": null}}],
              "tips": null}}"#,
    )
    .unwrap();

    let gazetteer = Gazetteer(HashMap::from([
        ("北京 故宫", Coordinates::new(116.3972, 39.9163)),
        ("北京 天坛", Coordinates::new(116.4074, 39.8822)),
    ]));
    let resolver = GeocodeResolver::new(vec![Box::new(gazetteer)]);
    let routes = RouteBuilder::new(Box::new(Backend {
        refuse: Coordinates::new(0.0, 0.0),
        requests: Arc::new(Mutex::new(Vec::new())),
    }));
    let renderer = PlanRenderer::new(resolver, routes);

    let mut scene = MapScene::default();
    let summary = renderer
        .show_plan_on_map(&plan, &mut scene, |_: &Progress| {})
        .await
        .unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.located, 2);
    assert_eq!(scene.markers[0].description, "暂无描述");
    assert_eq!(scene.markers[0].estimated_cost, 60.0);
    assert_eq!(scene.routes.len(), 1);
}

#[test]
fn test_provider_route_with_unnamed_road_is_drawn() {
    let route: DrivingRoute = serde_json::from_str(
        r#"{"polyline": "116.3972,39.9163;116.4010,39.9000;116.4074,39.8822", "distance": 4100, "duration": 900,
            "steps": [{"instruction": "向南行驶", "road": [], "distance": "4100", "duration": "900"}]}"#,
    )
    .unwrap();
    let points = travelmap::routing::polyline::decode_polyline(&route.polyline);
    assert_eq!(points.len(), 3);
    assert_eq!(route.distance, 4100.0);
}

