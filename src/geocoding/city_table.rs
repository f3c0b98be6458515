//! Built-in coordinates for well-known cities.
//!
//! Lookups are exact-match only: "南京大学" must not resolve to 南京 itself.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::GeocodeStage;
use crate::Result;
use crate::TravelMapError;
use crate::models::Coordinates;

const CITIES: &[(&str, f64, f64)] = &[
    // domestic
    ("北京", 116.407526, 39.90403),
    ("上海", 121.473701, 31.230416),
    ("广州", 113.264385, 23.129112),
    ("深圳", 114.057868, 22.543099),
    ("杭州", 120.153576, 30.287459),
    ("成都", 104.065735, 30.659462),
    ("重庆", 106.504962, 29.533155),
    ("武汉", 114.305393, 30.593099),
    ("西安", 108.948024, 34.263161),
    ("南京", 118.767413, 32.041544),
    ("天津", 117.190182, 39.125596),
    ("苏州", 120.585315, 31.298886),
    ("长沙", 112.982279, 28.19409),
    ("郑州", 113.665412, 34.757975),
    ("济南", 117.000923, 36.675807),
    ("青岛", 120.369557, 36.094406),
    ("大连", 121.618622, 38.91459),
    ("厦门", 118.11022, 24.490474),
    ("昆明", 102.712251, 25.040609),
    ("哈尔滨", 126.642464, 45.756967),
    ("沈阳", 123.429096, 41.796767),
    ("长春", 125.3245, 43.886841),
    ("石家庄", 114.502461, 38.045474),
    ("太原", 112.549248, 37.857014),
    ("合肥", 117.283042, 31.86119),
    ("南昌", 115.892151, 28.676493),
    ("福州", 119.306239, 26.075302),
    ("海口", 110.33119, 20.031971),
    ("三亚", 109.508268, 18.247872),
    ("拉萨", 91.132212, 29.660361),
    ("乌鲁木齐", 87.617733, 43.792818),
    ("银川", 106.278179, 38.46637),
    ("呼和浩特", 111.670801, 40.818311),
    ("兰州", 103.823557, 36.058039),
    ("西宁", 101.778916, 36.623178),
    ("贵阳", 106.713478, 26.578343),
    ("南宁", 108.320004, 22.82402),
    // asia
    ("东京", 139.691706, 35.689487),
    ("大阪", 135.502165, 34.693738),
    ("京都", 135.768029, 35.011636),
    ("首尔", 126.977969, 37.566535),
    ("釜山", 129.075642, 35.179554),
    ("曼谷", 100.501765, 13.756331),
    ("新加坡", 103.819836, 1.352083),
    ("吉隆坡", 101.686855, 3.139003),
    ("河内", 105.804817, 21.028511),
    ("胡志明市", 106.629664, 10.776889),
    ("马尼拉", 120.984219, 14.599512),
    ("雅加达", 106.845599, -6.208763),
    ("德里", 77.209023, 28.613939),
    ("孟买", 72.877656, 19.075984),
    ("迪拜", 55.296249, 25.276987),
    // europe
    ("巴黎", 2.352222, 48.856614),
    ("伦敦", -0.127758, 51.507351),
    ("罗马", 12.496366, 41.902782),
    ("威尼斯", 12.315515, 45.440847),
    ("巴塞罗那", 2.173403, 41.385064),
    ("马德里", -3.70379, 40.416775),
    ("阿姆斯特丹", 4.904139, 52.370216),
    ("柏林", 13.404954, 52.520007),
    ("慕尼黑", 11.581981, 48.135125),
    ("维也纳", 16.373819, 48.208174),
    ("布拉格", 14.41854, 50.075538),
    ("雅典", 23.727539, 37.98381),
    ("莫斯科", 37.618423, 55.755826),
    // americas
    ("纽约", -74.005941, 40.712784),
    ("洛杉矶", -118.243685, 34.052234),
    ("旧金山", -122.419416, 37.774929),
    ("芝加哥", -87.629798, 41.878114),
    ("拉斯维加斯", -115.13983, 36.169941),
    ("迈阿密", -80.193659, 25.76168),
    ("多伦多", -79.383184, 43.653226),
    ("温哥华", -123.120738, 49.282729),
    ("墨西哥城", -99.133208, 19.432608),
    ("里约热内卢", -43.172896, -22.906847),
    // oceania
    ("悉尼", 151.209296, -33.86882),
    ("墨尔本", 144.963058, -37.813628),
    ("奥克兰", 174.763332, -36.848461),
];

static TABLE: LazyLock<HashMap<&'static str, Coordinates>> = LazyLock::new(|| {
    CITIES
        .iter()
        .map(|&(name, lng, lat)| (name, Coordinates::new(lng, lat)))
        .collect()
});

/// Exact-match city lookup, usable directly or as a resolver stage
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticCityTable;

impl StaticCityTable {
    #[must_use]
    pub fn lookup(name: &str) -> Option<Coordinates> {
        TABLE.get(name).copied()
    }

    #[must_use]
    pub fn len() -> usize {
        TABLE.len()
    }
}

#[async_trait]
impl GeocodeStage for StaticCityTable {
    fn name(&self) -> &'static str {
        "static-table"
    }

    async fn geocode(&self, address: &str) -> Result<Coordinates> {
        Self::lookup(address)
            .ok_or_else(|| TravelMapError::stage(self.name(), "no exact match in city table"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_table_is_complete() {
        assert_eq!(StaticCityTable::len(), CITIES.len());
        assert!(StaticCityTable::len() >= 80);
        assert!(TABLE.values().all(Coordinates::is_valid));
    }

    #[test]
    fn test_exact_lookup() {
        let beijing = StaticCityTable::lookup("北京").unwrap();
        assert_eq!(beijing, Coordinates::new(116.407526, 39.90403));

        let sydney = StaticCityTable::lookup("悉尼").unwrap();
        assert!(sydney.lat < 0.0);
    }

    #[rstest]
    #[case("南京大学")]
    #[case("北京 故宫")]
    #[case("北京市")]
    #[case(" 上海")]
    #[case("")]
    fn test_no_fuzzy_matching(#[case] name: &str) {
        assert!(StaticCityTable::lookup(name).is_none());
    }

    #[tokio::test]
    async fn test_stage_failure_is_stage_local() {
        let err = StaticCityTable.geocode("南京大学").await.unwrap_err();
        assert!(matches!(
            err,
            TravelMapError::StageFailed {
                stage: "static-table",
                ..
            }
        ));
    }
}
