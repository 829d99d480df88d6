use crate::pipeline::types::{BBox, Detection, ObjectClass, PointState, Track, TrackPoint};

/// Confidences closer than this are treated as tied and broken spatially.
const CONFIDENCE_TIE_EPS: f32 = 1e-6;

/// Per-class tracker configuration.
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    /// Detections below this confidence are discarded.
    pub confidence_threshold: f32,
    /// Longest interior run of absent frames bridged by interpolation.
    pub max_gap: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            max_gap: 4,
        }
    }
}

/// Converts a raw per-frame detection stream for one object class into a
/// single best-estimate track.
///
/// Per frame: the highest-confidence detection above the threshold wins;
/// confidence ties are broken by proximity to the most recent resolved
/// position, or stay with the highest confidence when no position has been
/// resolved yet. Interior dropouts no longer than `max_gap` frames are
/// bridged by linear interpolation; longer dropouts and leading/trailing runs
/// stay absent.
pub struct ObjectTracker {
    class: ObjectClass,
    config: TrackerConfig,
}

impl ObjectTracker {
    pub fn new(class: ObjectClass, config: TrackerConfig) -> Self {
        Self { class, config }
    }

    /// Resolve one track from per-frame detection sets. `frames[i]` holds the
    /// detections of frame `i`; the output covers exactly `frames.len()`
    /// frames. An input with no usable detection on any frame yields a blank
    /// track, not an error.
    pub fn resolve(&self, frames: &[Vec<Detection>]) -> Track {
        let mut points: Vec<TrackPoint> = Vec::with_capacity(frames.len());
        let mut last_position: Option<(f32, f32)> = None;

        for (frame, detections) in frames.iter().enumerate() {
            let state = match self.select(detections, last_position) {
                Some(d) => {
                    last_position = Some(d.bbox.center());
                    PointState::Detected {
                        bbox: d.bbox,
                        confidence: d.confidence,
                    }
                }
                None => PointState::Absent {
                    gap_exceeded: false,
                },
            };
            points.push(TrackPoint { frame, state });
        }

        self.fill_gaps(&mut points);
        Track::new(self.class, points)
    }

    /// Per-frame selection policy.
    fn select<'a>(
        &self,
        detections: &'a [Detection],
        last_position: Option<(f32, f32)>,
    ) -> Option<&'a Detection> {
        let mut candidates: Vec<&Detection> = detections
            .iter()
            .filter(|d| {
                d.class == self.class
                    && d.confidence >= self.config.confidence_threshold
                    && d.bbox.is_valid()
            })
            .collect();

        if candidates.is_empty() {
            return None;
        }

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let top = candidates[0].confidence;
        let tied: Vec<&Detection> = candidates
            .iter()
            .copied()
            .take_while(|d| (top - d.confidence).abs() <= CONFIDENCE_TIE_EPS)
            .collect();

        if tied.len() > 1 {
            if let Some((px, py)) = last_position {
                return tied.into_iter().min_by(|a, b| {
                    let da = squared_distance(a.bbox.center(), (px, py));
                    let db = squared_distance(b.bbox.center(), (px, py));
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                });
            }
        }

        Some(candidates[0])
    }

    /// Bridge interior absent runs of length <= max_gap by linear
    /// interpolation between the bracketing detections. Longer runs are marked
    /// gap-exceeded and left absent; leading/trailing runs have no bracket and
    /// stay absent unmarked.
    fn fill_gaps(&self, points: &mut [TrackPoint]) {
        let detected: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.state.is_detected())
            .map(|(i, _)| i)
            .collect();

        for pair in detected.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let gap = end - start - 1;
            if gap == 0 {
                continue;
            }

            if gap > self.config.max_gap {
                for p in &mut points[start + 1..end] {
                    p.state = PointState::Absent { gap_exceeded: true };
                }
                continue;
            }

            let from = points[start].state.bbox().expect("detected point has bbox");
            let to = points[end].state.bbox().expect("detected point has bbox");
            let span = (end - start) as f32;
            for i in start + 1..end {
                let t = (i - start) as f32 / span;
                points[i].state = PointState::Interpolated {
                    bbox: lerp_bbox(&from, &to, t),
                };
            }
        }
    }
}

fn squared_distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}

fn lerp_bbox(a: &BBox, b: &BBox, t: f32) -> BBox {
    BBox::new(
        a.x1 + (b.x1 - a.x1) * t,
        a.y1 + (b.y1 - a.y1) * t,
        a.x2 + (b.x2 - a.x2) * t,
        a.y2 + (b.y2 - a.y2) * t,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(frame: usize, cx: f32, cy: f32, confidence: f32) -> Detection {
        Detection {
            frame,
            class: ObjectClass::Ball,
            bbox: BBox::new(cx - 5.0, cy - 5.0, cx + 5.0, cy + 5.0),
            confidence,
        }
    }

    fn tracker(max_gap: usize) -> ObjectTracker {
        ObjectTracker::new(
            ObjectClass::Ball,
            TrackerConfig {
                confidence_threshold: 0.5,
                max_gap,
            },
        )
    }

    #[test]
    fn test_track_covers_full_range_in_order() {
        let frames = vec![
            vec![det(0, 10.0, 10.0, 0.9)],
            vec![],
            vec![det(2, 30.0, 30.0, 0.9)],
        ];
        let track = tracker(2).resolve(&frames);
        assert_eq!(track.len(), 3);
        for (i, p) in track.points().iter().enumerate() {
            assert_eq!(p.frame, i);
        }
    }

    #[test]
    fn test_single_detection_below_threshold_is_absent() {
        let frames = vec![vec![det(0, 10.0, 10.0, 0.2)]];
        let track = tracker(2).resolve(&frames);
        assert!(track.is_blank());
    }

    #[test]
    fn test_highest_confidence_wins() {
        let frames = vec![vec![det(0, 10.0, 10.0, 0.6), det(0, 90.0, 90.0, 0.9)]];
        let track = tracker(2).resolve(&frames);
        assert_eq!(track.points()[0].position().unwrap(), (90.0, 90.0));
    }

    #[test]
    fn test_confidence_tie_broken_by_continuity() {
        let frames = vec![
            vec![det(0, 10.0, 10.0, 0.9)],
            // Two equally confident candidates; the one nearer frame 0 wins.
            vec![det(1, 12.0, 12.0, 0.8), det(1, 80.0, 80.0, 0.8)],
        ];
        let track = tracker(2).resolve(&frames);
        assert_eq!(track.points()[1].position().unwrap(), (12.0, 12.0));
    }

    #[test]
    fn test_confidence_tie_without_prior_takes_highest() {
        // No prior position: first of the tied pair (highest confidence after
        // the sort) is kept.
        let frames = vec![vec![det(0, 10.0, 10.0, 0.8), det(0, 80.0, 80.0, 0.8)]];
        let track = tracker(2).resolve(&frames);
        assert!(track.points()[0].position().is_some());
    }

    #[test]
    fn test_interpolation_is_exactly_linear() {
        let frames = vec![
            vec![det(0, 10.0, 20.0, 0.9)],
            vec![],
            vec![],
            vec![det(3, 40.0, 50.0, 0.9)],
        ];
        let track = tracker(3).resolve(&frames);

        let p1 = track.points()[1];
        assert!(matches!(p1.state, PointState::Interpolated { .. }));
        assert_eq!(p1.position().unwrap(), (20.0, 30.0));

        let p2 = track.points()[2];
        assert_eq!(p2.position().unwrap(), (30.0, 40.0));

        // The whole box interpolates linearly, not just the center.
        let b1 = p1.state.bbox().unwrap();
        assert_eq!(b1.x1, 15.0);
        assert_eq!(b1.y1, 25.0);
        assert_eq!(b1.x2, 25.0);
        assert_eq!(b1.y2, 35.0);
    }

    #[test]
    fn test_gap_longer_than_max_stays_absent() {
        let frames = vec![
            vec![det(0, 10.0, 10.0, 0.9)],
            vec![],
            vec![],
            vec![],
            vec![det(4, 50.0, 50.0, 0.9)],
        ];
        let track = tracker(2).resolve(&frames);

        for p in &track.points()[1..4] {
            assert!(matches!(p.state, PointState::Absent { gap_exceeded: true }));
        }
        assert!(track.has_exceeded_gap());
    }

    #[test]
    fn test_leading_and_trailing_absent_never_interpolated() {
        let frames = vec![
            vec![],
            vec![det(1, 10.0, 10.0, 0.9)],
            vec![det(2, 20.0, 20.0, 0.9)],
            vec![],
        ];
        let track = tracker(4).resolve(&frames);

        assert!(matches!(
            track.points()[0].state,
            PointState::Absent {
                gap_exceeded: false
            }
        ));
        assert!(matches!(
            track.points()[3].state,
            PointState::Absent {
                gap_exceeded: false
            }
        ));
        assert!(!track.has_exceeded_gap());
    }

    #[test]
    fn test_all_absent_yields_blank_track() {
        let frames = vec![vec![], vec![], vec![]];
        let track = tracker(2).resolve(&frames);
        assert!(track.is_blank());
        assert_eq!(track.len(), 3);
    }

    #[test]
    fn test_other_class_detections_are_ignored() {
        let stray = Detection {
            frame: 0,
            class: ObjectClass::Catcher,
            bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            confidence: 0.99,
        };
        let frames = vec![vec![stray]];
        let track = tracker(2).resolve(&frames);
        assert!(track.is_blank());
    }
}
