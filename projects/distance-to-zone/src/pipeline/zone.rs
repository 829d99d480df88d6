use crate::pipeline::types::{Track, Zone, ZoneConfig};

/// Derives a strike-zone rectangle from the catcher track near the crossing
/// frame.
///
/// The catcher bounding box anchors the zone: its height scaled by
/// `height_frac` gives the vertical span (shifted by `vertical_offset` box
/// heights for stance variance), and its width fixes the pixel scale that
/// maps the real plate width to the horizontal span. No usable anchor within
/// the tolerance window means no zone; callers surface that, never a
/// zero-size default.
pub struct ZoneEstimator {
    config: ZoneConfig,
}

impl ZoneEstimator {
    pub fn new(config: ZoneConfig) -> Self {
        Self { config }
    }

    pub fn estimate(&self, catcher: &Track, crossing_frame: f32) -> Option<Zone> {
        let anchor_frame = crossing_frame.round().max(0.0) as usize;
        let anchor = catcher.nearest_resolved(anchor_frame, self.config.anchor_tolerance)?;
        let bbox = anchor.state.bbox()?;
        if !bbox.is_valid() {
            return None;
        }

        let (cx, cy) = bbox.center();
        let height = bbox.height();

        let center_y = cy + self.config.vertical_offset * height;
        let half_span = self.config.height_frac * height / 2.0;

        let pixels_per_inch = bbox.width() / self.config.catcher_width_in;
        let half_width = self.config.plate_width_in / 2.0 * pixels_per_inch;

        let zone = Zone {
            top_y: center_y - half_span,
            bottom_y: center_y + half_span,
            left_x: cx - half_width,
            right_x: cx + half_width,
            pixels_per_inch,
        };

        if zone.is_degenerate() {
            return None;
        }
        Some(zone)
    }
}
