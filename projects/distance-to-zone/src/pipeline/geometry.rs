use crate::pipeline::types::{DistanceMode, Zone};
use geo::{Contains, EuclideanDistance};
use geo_types::{coord, Point as GeoPoint, Rect};

/// Convert a zone to a geo_types rectangle
fn zone_rect(zone: &Zone) -> Rect<f64> {
    Rect::new(
        coord! { x: zone.left_x as f64, y: zone.top_y as f64 },
        coord! { x: zone.right_x as f64, y: zone.bottom_y as f64 },
    )
}

/// Robust point-in-zone test using the geo crate
pub fn zone_contains(zone: &Zone, x: f32, y: f32) -> bool {
    let rect = zone_rect(zone);
    rect.contains(&GeoPoint::new(x as f64, y as f64))
}

/// Distance from a point to the zone rectangle under the configured sign
/// convention. Outside: Euclidean distance to the nearest edge. Inside:
/// zero (unsigned) or the negated clearance to the nearest edge (signed).
pub fn distance_to_zone(zone: &Zone, x: f32, y: f32, mode: DistanceMode) -> f32 {
    if zone_contains(zone, x, y) {
        return match mode {
            DistanceMode::Unsigned => 0.0,
            DistanceMode::Signed => -edge_clearance(zone, x, y),
        };
    }

    let rect = zone_rect(zone);
    let point = GeoPoint::new(x as f64, y as f64);
    rect.to_polygon().euclidean_distance(&point) as f32
}

/// Minimum distance from an interior point to any zone edge.
fn edge_clearance(zone: &Zone, x: f32, y: f32) -> f32 {
    (x - zone.left_x)
        .min(zone.right_x - x)
        .min(y - zone.top_y)
        .min(zone.bottom_y - y)
}
