//! Route polyline wire format: `lng,lat;lng,lat;...`

use tracing::warn;

use crate::models::Coordinates;

/// Parse one `lng,lat` pair
#[must_use]
pub fn parse_pair(segment: &str) -> Option<Coordinates> {
    let (lng, lat) = segment.trim().split_once(',')?;
    if lat.contains(',') {
        return None;
    }
    let lng = lng.trim().parse::<f64>().ok()?;
    let lat = lat.trim().parse::<f64>().ok()?;
    if !lng.is_finite() || !lat.is_finite() {
        return None;
    }
    Some(Coordinates::new(lng, lat))
}

/// Decode a polyline. Empty and malformed segments are skipped, never fatal.
#[must_use]
pub fn decode_polyline(polyline: &str) -> Vec<Coordinates> {
    let mut path = Vec::new();

    for (index, segment) in polyline.split(';').enumerate() {
        if segment.trim().is_empty() {
            continue;
        }
        match parse_pair(segment) {
            Some(point) => path.push(point),
            None => warn!("Skipping malformed polyline segment {}: {:?}", index, segment),
        }
    }

    path
}

/// Encode points back into the wire format, six decimals per component
#[must_use]
pub fn encode_polyline(points: &[Coordinates]) -> String {
    points
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_decode_simple() {
        let path = decode_polyline("116.397,39.917;116.403,39.915;116.41,39.899");
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], Coordinates::new(116.397, 39.917));
        assert_eq!(path[2], Coordinates::new(116.41, 39.899));
    }

    #[test]
    fn test_trailing_separator_yields_single_point() {
        let path = decode_polyline("116.40,39.90;");
        assert_eq!(path, vec![Coordinates::new(116.40, 39.90)]);
    }

    #[rstest]
    #[case("", 0)]
    #[case(";;", 0)]
    #[case(" 116.1 , 39.1 ; 116.2,39.2 ", 2)]
    #[case("116.1,39.1;abc,39.2;116.3,39.3", 2)]
    #[case("116.1,39.1;116.2;116.3,39.3", 2)]
    #[case("116.1,39.1,5;116.3,39.3", 1)]
    #[case("NaN,39.1;116.3,39.3", 1)]
    fn test_malformed_segments_are_skipped(#[case] polyline: &str, #[case] expected: usize) {
        assert_eq!(decode_polyline(polyline).len(), expected);
    }

    #[test]
    fn test_round_trip() {
        let points = vec![
            Coordinates::new(116.407526, 39.90403),
            Coordinates::new(-0.127758, 51.507351),
            Coordinates::new(151.209296, -33.86882),
        ];
        let decoded = decode_polyline(&encode_polyline(&points));
        assert_eq!(decoded.len(), points.len());
        for (a, b) in decoded.iter().zip(&points) {
            assert!((a.lng - b.lng).abs() < 1e-6);
            assert!((a.lat - b.lat).abs() < 1e-6);
        }
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("2.29,48.85"), Some(Coordinates::new(2.29, 48.85)));
        assert_eq!(parse_pair("2.29"), None);
        assert_eq!(parse_pair(""), None);
    }
}
