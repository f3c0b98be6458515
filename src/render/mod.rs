//! Putting a plan on the map.
//!
//! The renderer flattens a plan into locations, geocodes them one by one,
//! draws a marker per resolved location and a route between every
//! consecutive pair. Locations that cannot be resolved are left out; the
//! pass only fails when nothing at all can be shown.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::backend::BackendClient;
use crate::config::TravelMapConfig;
use crate::geocoding::{GeocodeResolver, Place};
use crate::models::{Coordinates, PlanDocument, ResolvedLocation, Route};
use crate::routing::{RouteBuilder, RouteReport};
use crate::{Result, TravelMapError};

pub mod text;

pub use text::{PlanStats, plan_stats, render_plan_html, render_plan_text};

/// Drawing surface for markers and routes
pub trait MapCanvas {
    /// Remove every marker and route
    fn clear(&mut self);
    fn set_title(&mut self, title: &str, subtitle: &str);
    /// `index` is 1-based
    fn add_marker(&mut self, index: usize, location: &ResolvedLocation);
    fn add_route(&mut self, route: &Route);
    /// Labelled pin outside the plan's numbered markers
    fn add_pin(&mut self, label: &str, coordinates: Coordinates);
    fn set_center(&mut self, center: Coordinates, zoom: u8);
}

/// Zoom used when centering on a single destination
pub const DESTINATION_ZOOM: u8 = 12;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Marker {
    pub index: usize,
    pub name: String,
    pub icon: String,
    /// Kind shown in the info popup
    pub label: String,
    pub description: String,
    pub estimated_cost: f64,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Pin {
    pub label: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct View {
    pub center: Coordinates,
    pub zoom: u8,
}

/// In-memory canvas; serializes to the JSON a web map can draw from
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MapScene {
    pub title: String,
    pub subtitle: String,
    pub markers: Vec<Marker>,
    pub routes: Vec<Route>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pins: Vec<Pin>,
    /// Unset means fit the view to the markers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<View>,
}

impl MapCanvas for MapScene {
    fn clear(&mut self) {
        self.markers.clear();
        self.routes.clear();
        self.pins.clear();
        self.view = None;
    }

    fn set_title(&mut self, title: &str, subtitle: &str) {
        self.title = title.to_string();
        self.subtitle = subtitle.to_string();
    }

    fn add_marker(&mut self, index: usize, location: &ResolvedLocation) {
        let description = if location.location.description.is_empty() {
            "暂无描述".to_string()
        } else {
            location.location.description.clone()
        };
        self.markers.push(Marker {
            index,
            name: location.name().to_string(),
            icon: location.kind().icon().to_string(),
            label: location.kind().label().to_string(),
            description,
            estimated_cost: location.location.estimated_cost,
            coordinates: location.coordinates,
        });
    }

    fn add_route(&mut self, route: &Route) {
        self.routes.push(route.clone());
    }

    fn add_pin(&mut self, label: &str, coordinates: Coordinates) {
        self.pins.push(Pin {
            label: label.to_string(),
            coordinates,
        });
    }

    fn set_center(&mut self, center: Coordinates, zoom: u8) {
        self.view = Some(View { center, zoom });
    }
}

/// Geocoding progress, reported after each attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// 1-based
    pub current: usize,
    pub total: usize,
    pub name: String,
    pub resolved: bool,
}

impl Progress {
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.current * 100) / self.total).min(100) as u8
    }

    #[must_use]
    pub fn message(&self) -> String {
        format!("正在定位地点 {}/{}: {}", self.current, self.total, self.name)
    }
}

/// Result of one map pass
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MapSummary {
    pub title: String,
    /// Locations placed on the map
    pub located: usize,
    /// Unique locations in the plan
    pub total: usize,
    pub unresolved: Vec<String>,
    pub routes: usize,
    pub degraded_routes: usize,
    pub skipped_pairs: usize,
    pub total_distance_km: f64,
    pub total_duration_min: u64,
    /// Fewer than two locations resolved
    pub routing_skipped: bool,
    pub notice: Option<String>,
}

impl MapSummary {
    /// One-line route overview, e.g. `3段 · 12.4km · 35分钟`
    #[must_use]
    pub fn route_overview(&self) -> String {
        format!(
            "{}段 · {:.1}km · {}分钟",
            self.routes, self.total_distance_km, self.total_duration_min
        )
    }
}

pub struct PlanRenderer {
    resolver: GeocodeResolver,
    routes: RouteBuilder,
}

impl PlanRenderer {
    pub fn new(resolver: GeocodeResolver, routes: RouteBuilder) -> Self {
        Self { resolver, routes }
    }

    /// Standard resolver chain with routes from the backend
    pub fn from_config(config: &TravelMapConfig, backend: BackendClient) -> Result<Self> {
        let resolver = GeocodeResolver::from_config(config, backend.clone())?;
        let routes = RouteBuilder::new(Box::new(backend))
            .with_min_distance(config.routing.min_route_distance_m);
        Ok(Self::new(resolver, routes))
    }

    #[must_use]
    pub fn resolver(&self) -> &GeocodeResolver {
        &self.resolver
    }

    /// Center the map on a destination, titled with the best name the
    /// geocoder knows for it.
    #[instrument(skip(self, canvas))]
    pub async fn locate_destination<C>(&self, destination: &str, canvas: &mut C) -> Result<Place>
    where
        C: MapCanvas + ?Sized,
    {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(TravelMapError::validation("destination must not be empty"));
        }

        let place = self.resolver.locate(destination).await?;
        let title = place.name.as_deref().unwrap_or(destination);
        let subtitle = place.formatted_address.as_deref().unwrap_or("目的地位置");

        canvas.clear();
        canvas.add_pin(&format!("📍 {title}"), place.coordinates);
        canvas.set_center(place.coordinates, DESTINATION_ZOOM);
        canvas.set_title(title, subtitle);

        info!("Centered map on {} via {}", title, place.stage);
        Ok(place)
    }

    /// Geocode the plan's unique locations in order. The returned list keeps
    /// plan order and only holds the locations that resolved; the names of
    /// the others come back separately.
    pub async fn resolve_locations<P>(
        &self,
        plan: &PlanDocument,
        mut progress: P,
    ) -> (Vec<ResolvedLocation>, Vec<String>)
    where
        P: FnMut(&Progress),
    {
        let locations = plan.unique_locations();
        let total = locations.len();
        let mut resolved = Vec::with_capacity(total);
        let mut unresolved = Vec::new();

        for (i, location) in locations.into_iter().enumerate() {
            let name = location.name.clone();
            let ok = match self.resolver.resolve(&location.address).await {
                Ok(coordinates) => {
                    resolved.push(location.resolved(coordinates));
                    true
                }
                Err(e) => {
                    warn!("Unable to locate {}: {}", name, e);
                    unresolved.push(name.clone());
                    false
                }
            };

            progress(&Progress {
                current: i + 1,
                total,
                name,
                resolved: ok,
            });
        }

        (resolved, unresolved)
    }

    /// Resolve, mark and route every location of `plan` onto `canvas`
    #[instrument(skip_all, fields(destination = %plan.destination))]
    pub async fn show_plan_on_map<C, P>(
        &self,
        plan: &PlanDocument,
        canvas: &mut C,
        progress: P,
    ) -> Result<MapSummary>
    where
        C: MapCanvas + ?Sized,
        P: FnMut(&Progress),
    {
        let total = plan.unique_locations().len();
        if total == 0 {
            return Err(TravelMapError::nothing_to_display(
                "该旅行计划中没有可显示的地点",
            ));
        }
        info!("Placing {} locations on the map", total);

        let (resolved, unresolved) = self.resolve_locations(plan, progress).await;
        if resolved.is_empty() {
            return Err(TravelMapError::nothing_to_display(
                "没有任何地点成功定位，无法显示地图",
            ));
        }

        let title = format!("{} 旅行路线", plan.destination);
        canvas.clear();
        canvas.set_title(&title, &format!("共 {} 个地点", resolved.len()));
        for (i, location) in resolved.iter().enumerate() {
            canvas.add_marker(i + 1, location);
        }

        let mut summary = MapSummary {
            title,
            located: resolved.len(),
            total,
            unresolved,
            ..Default::default()
        };

        if resolved.len() < 2 {
            summary.routing_skipped = true;
            summary.notice = Some("至少需要2个地点才能规划路线".to_string());
            info!("Only one location resolved, skipping routes");
            return Ok(summary);
        }

        let report = self.routes.build(&resolved).await;
        for route in &report.routes {
            canvas.add_route(route);
        }
        apply_report(&mut summary, &report);

        info!(
            "Map ready: {}/{} locations, {}",
            summary.located,
            summary.total,
            summary.route_overview()
        );
        Ok(summary)
    }
}

fn apply_report(summary: &mut MapSummary, report: &RouteReport) {
    summary.routes = report.routes.len();
    summary.degraded_routes = report.degraded;
    summary.skipped_pairs = report.skipped;
    summary.total_distance_km = report.total_distance_km();
    summary.total_duration_min = report.total_duration_minutes();
    if report.degraded > 0 {
        summary.notice = Some(format!(
            "{} 段路线使用直线距离估算",
            report.degraded
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DrivingRoute;
    use crate::geocoding::{GeocodeStage, StaticCityTable};
    use crate::models::RouteKind;
    use crate::routing::RouteProvider;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Geocoder backed by a fixed address table
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
                .ok_or_else(|| TravelMapError::stage("gazetteer", "unknown address"))
        }
    }

    /// Backend proxy stand-in that knows the point-of-interest name
    struct NamedProxy;

    #[async_trait]
    impl GeocodeStage for NamedProxy {
        fn name(&self) -> &'static str {
            "backend-proxy"
        }

        async fn geocode(&self, address: &str) -> Result<Coordinates> {
            self.locate(address).await.map(|place| place.coordinates)
        }

        async fn locate(&self, _address: &str) -> Result<Place> {
            Ok(Place {
                coordinates: Coordinates::new(120.1551, 30.2741),
                name: Some("西湖风景名胜区".to_string()),
                formatted_address: Some("浙江省杭州市西湖区".to_string()),
                stage: "backend-proxy",
            })
        }
    }

    /// Drives in a straight line, one request at a time
    struct LineProvider {
        calls: Arc<Mutex<Vec<(Coordinates, Coordinates)>>>,
    }

    #[async_trait]
    impl RouteProvider for LineProvider {
        async fn driving_route(&self, o: Coordinates, d: Coordinates) -> Result<DrivingRoute> {
            self.calls.lock().unwrap().push((o, d));
            Ok(DrivingRoute {
                polyline: format!("{o};{d}"),
                distance: 1500.0,
                duration: 300.0,
                steps: Vec::new(),
            })
        }
    }

    fn plan() -> PlanDocument {
        serde_json::from_value(serde_json::json!({
            "destination": "北京",
            "days": 1,
            "budget": 3000,
            "travelers": 1,
            "preferences": "",
            "itinerary": {"days": [{
                "day": 1,
                "activities": [
                    {"name": "故宫", "description": "紫禁城", "estimated_cost": 60},
                    {"name": "失落之城", "description": "", "estimated_cost": 0},
                    {"name": "天坛", "description": "祈年殿", "estimated_cost": 35}
                ],
                "meals": [{"type": "午餐", "restaurant": "四季民福", "cuisine": "烤鸭", "estimated_cost": 150}],
                "accommodation": {"name": "故宫", "estimated_cost": 600}
            }]}
        }))
        .unwrap()
    }

    fn renderer() -> (PlanRenderer, Arc<Mutex<Vec<(Coordinates, Coordinates)>>>) {
        let gazetteer = Gazetteer(HashMap::from([
            ("北京 故宫", Coordinates::new(116.397, 39.917)),
            ("北京 天坛", Coordinates::new(116.407, 39.882)),
            ("北京 四季民福", Coordinates::new(116.41, 39.899)),
        ]));
        let resolver = GeocodeResolver::new(vec![Box::new(StaticCityTable), Box::new(gazetteer)]);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let routes = RouteBuilder::new(Box::new(LineProvider {
            calls: calls.clone(),
        }));
        (PlanRenderer::new(resolver, routes), calls)
    }

    #[tokio::test]
    async fn test_show_plan_on_map() {
        let (renderer, calls) = renderer();
        let mut scene = MapScene::default();
        let mut seen = Vec::new();

        let summary = renderer
            .show_plan_on_map(&plan(), &mut scene, |p: &Progress| seen.push(p.clone()))
            .await
            .unwrap();

        // dedupe drops the hotel named like the first activity
        assert_eq!(summary.total, 4);
        assert_eq!(summary.located, 3);
        assert_eq!(summary.unresolved, vec!["失落之城"]);

        // progress fires for failures too, in order
        let names: Vec<&str> = seen.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["故宫", "失落之城", "天坛", "四季民福"]);
        assert!(!seen[1].resolved);
        assert_eq!(seen[3].percent(), 100);
        assert_eq!(seen[0].message(), "正在定位地点 1/4: 故宫");

        assert_eq!(scene.title, "北京 旅行路线");
        assert_eq!(scene.subtitle, "共 3 个地点");
        let markers: Vec<(usize, &str)> =
            scene.markers.iter().map(|m| (m.index, m.name.as_str())).collect();
        assert_eq!(markers, vec![(1, "故宫"), (2, "天坛"), (3, "四季民福")]);
        assert_eq!(scene.markers[2].icon, "🍽️");

        assert_eq!(scene.routes.len(), 2);
        assert_eq!(calls.lock().unwrap().len(), 2);
        assert_eq!(scene.routes[1].from_name, "天坛");
        assert!(scene.routes.iter().all(|r| r.kind == RouteKind::Driving));
        assert_eq!(summary.total_distance_km, 3.0);
        assert_eq!(summary.total_duration_min, 10);
        assert_eq!(summary.route_overview(), "2段 · 3.0km · 10分钟");
        assert!(!summary.routing_skipped);
    }

    #[tokio::test]
    async fn test_canvas_is_rebuilt_on_every_pass() {
        let (renderer, _) = renderer();
        let mut scene = MapScene::default();
        let plan = plan();
        renderer.show_plan_on_map(&plan, &mut scene, |_: &Progress| {}).await.unwrap();
        renderer.show_plan_on_map(&plan, &mut scene, |_: &Progress| {}).await.unwrap();
        assert_eq!(scene.markers.len(), 3);
        assert_eq!(scene.routes.len(), 2);
    }

    #[tokio::test]
    async fn test_single_location_skips_routing() {
        let (renderer, calls) = renderer();
        let plan: PlanDocument = serde_json::from_value(serde_json::json!({
            "destination": "北京",
            "itinerary": {"days": [{"day": 1, "activities": [
                {"name": "故宫"}, {"name": "失落之城"}
            ]}]}
        }))
        .unwrap();

        let mut scene = MapScene::default();
        let summary = renderer
            .show_plan_on_map(&plan, &mut scene, |_: &Progress| {})
            .await
            .unwrap();
        assert_eq!(summary.located, 1);
        assert!(summary.routing_skipped);
        assert!(summary.notice.is_some());
        assert!(scene.routes.is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_to_display() {
        let (renderer, _) = renderer();
        let mut scene = MapScene::default();

        let empty = PlanDocument {
            destination: "北京".to_string(),
            ..Default::default()
        };
        let err = renderer
            .show_plan_on_map(&empty, &mut scene, |_: &Progress| {})
            .await
            .unwrap_err();
        assert!(matches!(err, TravelMapError::NothingToDisplay { .. }));

        let lost: PlanDocument = serde_json::from_value(serde_json::json!({
            "destination": "北京",
            "itinerary": {"days": [{"day": 1, "activities": [{"name": "失落之城"}]}]}
        }))
        .unwrap();
        let err = renderer
            .show_plan_on_map(&lost, &mut scene, |_: &Progress| {})
            .await
            .unwrap_err();
        assert!(matches!(err, TravelMapError::NothingToDisplay { .. }));
        assert!(scene.markers.is_empty());
    }

    #[test]
    fn test_marker_without_description() {
        let mut scene = MapScene::default();
        let location = crate::models::Location::new("A", "北京 A", crate::models::LocationKind::Hotel)
            .resolved(Coordinates::new(116.0, 39.0));
        scene.add_marker(1, &location);
        assert_eq!(scene.markers[0].description, "暂无描述");
        assert_eq!(scene.markers[0].label, "住宿");
    }

    #[tokio::test]
    async fn test_locate_destination_uses_proxy_naming() {
        let resolver = GeocodeResolver::new(vec![Box::new(StaticCityTable), Box::new(NamedProxy)]);
        let renderer = PlanRenderer::new(resolver, RouteBuilder::new(Box::new(LineProvider {
            calls: Arc::new(Mutex::new(Vec::new())),
        })));

        let mut scene = MapScene::default();
        scene.add_pin("old", Coordinates::new(0.0, 0.0));
        let place = renderer.locate_destination("西湖", &mut scene).await.unwrap();

        assert_eq!(place.stage, "backend-proxy");
        assert_eq!(scene.title, "西湖风景名胜区");
        assert_eq!(scene.subtitle, "浙江省杭州市西湖区");
        assert_eq!(scene.pins.len(), 1);
        assert_eq!(scene.pins[0].label, "📍 西湖风景名胜区");
        assert_eq!(
            scene.view,
            Some(View {
                center: Coordinates::new(120.1551, 30.2741),
                zoom: DESTINATION_ZOOM
            })
        );
    }

    #[tokio::test]
    async fn test_locate_destination_falls_back_to_typed_name() {
        let (renderer, _) = renderer();
        let mut scene = MapScene::default();
        let place = renderer.locate_destination(" 北京 ", &mut scene).await.unwrap();
        assert_eq!(place.stage, "static-table");
        assert_eq!(scene.title, "北京");
        assert_eq!(scene.subtitle, "目的地位置");

        assert!(renderer.locate_destination("", &mut scene).await.is_err());
    }
}
