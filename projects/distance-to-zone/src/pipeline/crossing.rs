use crate::pipeline::types::{
    Approach, CrossingConfig, CrossingEvent, CrossingPolicy, Track, TrackPoint,
};

/// Finds the instant the ball trajectory passes the plate reference plane.
///
/// The detector scans adjacent resolved frames for the vertical coordinate
/// crossing `plane_y` in the configured approach direction and interpolates
/// the bracketing pair linearly, yielding a fractional crossing frame. With
/// several candidates the configured `CrossingPolicy` picks the winner; this
/// is deliberately configuration, not a fixed rule.
pub struct CrossingDetector {
    config: CrossingConfig,
}

impl CrossingDetector {
    pub fn new(config: CrossingConfig) -> Self {
        Self { config }
    }

    /// Returns the crossing event, or `None` when the track never plausibly
    /// crosses the plane. Pairs separated by an uninterpolated gap are never
    /// bridged.
    pub fn detect(&self, track: &Track) -> Option<CrossingEvent> {
        let resolved: Vec<_> = track.resolved().collect();
        if resolved.len() < 2 {
            return None;
        }

        let mut candidates: Vec<CrossingEvent> = Vec::new();

        for pair in resolved.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            // Adjacent frames only: a resolved pair spanning an exceeded gap
            // would hide an arbitrarily long unobserved flight.
            if b.frame != a.frame + 1 {
                continue;
            }

            let (ax, ay) = a.position().expect("resolved point");
            let (bx, by) = b.position().expect("resolved point");

            if !self.crosses(ay, by) {
                continue;
            }

            let t = (self.config.plane_y - ay) / (by - ay);
            let frame = a.frame as f32 + t;
            let x = ax + (bx - ax) * t;
            let confidence = if a.state.is_detected() && b.state.is_detected() {
                1.0
            } else {
                0.5
            };

            candidates.push(CrossingEvent {
                frame,
                x,
                y: self.config.plane_y,
                confidence,
            });
        }

        self.pick(candidates, &resolved)
    }

    fn crosses(&self, from_y: f32, to_y: f32) -> bool {
        let plane = self.config.plane_y;
        match self.config.approach {
            Approach::Down => from_y < plane && to_y >= plane,
            Approach::Up => from_y > plane && to_y <= plane,
        }
    }

    /// Frame at which the trajectory durably reverses: where the approach
    /// coordinate attains its extreme (the catch, or the track end while
    /// still approaching). Crossings after this point are bounce-back noise.
    fn reversal_frame(&self, resolved: &[&TrackPoint]) -> f32 {
        let mut best_frame = 0.0_f32;
        let mut best_y = match self.config.approach {
            Approach::Down => f32::MIN,
            Approach::Up => f32::MAX,
        };
        for p in resolved {
            let (_, y) = p.position().expect("resolved point");
            let better = match self.config.approach {
                Approach::Down => y > best_y,
                Approach::Up => y < best_y,
            };
            if better {
                best_y = y;
                best_frame = p.frame as f32;
            }
        }
        best_frame
    }

    fn pick(&self, candidates: Vec<CrossingEvent>, resolved: &[&TrackPoint]) -> Option<CrossingEvent> {
        if candidates.is_empty() {
            return None;
        }

        let chosen = match self.config.policy {
            CrossingPolicy::Earliest => candidates[0],
            CrossingPolicy::LastBeforeReversal => {
                let reversal = self.reversal_frame(resolved);
                candidates
                    .iter()
                    .rev()
                    .find(|c| c.frame <= reversal)
                    .copied()
                    // Every crossing sits after the reversal: fall back to the
                    // conservative earliest candidate.
                    .unwrap_or(candidates[0])
            }
        };

        Some(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{BBox, ObjectClass, PointState, TrackPoint};

    fn track_from_ys(ys: &[Option<f32>]) -> Track {
        let points = ys
            .iter()
            .enumerate()
            .map(|(frame, y)| TrackPoint {
                frame,
                state: match y {
                    Some(y) => PointState::Detected {
                        bbox: BBox::new(10.0, y - 5.0, 20.0, y + 5.0),
                        confidence: 0.9,
                    },
                    None => PointState::Absent {
                        gap_exceeded: false,
                    },
                },
            })
            .collect();
        Track::new(ObjectClass::Ball, points)
    }

    fn detector(plane_y: f32, policy: CrossingPolicy) -> CrossingDetector {
        CrossingDetector::new(CrossingConfig {
            plane_y,
            approach: Approach::Down,
            policy,
        })
    }

    #[test]
    fn test_fractional_crossing_is_midpoint() {
        // y=99 at frame 10, y=101 at frame 11, plane 100: crossing at 10.5.
        let mut ys: Vec<Option<f32>> = (0..=11).map(|i| Some(81.0 + i as f32)).collect();
        ys[10] = Some(99.0);
        ys[11] = Some(101.0);

        let event = detector(100.0, CrossingPolicy::Earliest)
            .detect(&track_from_ys(&ys))
            .unwrap();
        assert!((event.frame - 10.5).abs() < 1e-6);
        assert_eq!(event.y, 100.0);
        // Both bracketing points sit at x=15, so does the crossing.
        assert!((event.x - 15.0).abs() < 1e-6);
        assert_eq!(event.confidence, 1.0);
    }

    #[test]
    fn test_no_crossing_when_plane_never_reached() {
        let ys: Vec<Option<f32>> = (0..10).map(|i| Some(10.0 + i as f32)).collect();
        assert!(detector(500.0, CrossingPolicy::Earliest)
            .detect(&track_from_ys(&ys))
            .is_none());
    }

    #[test]
    fn test_fewer_than_two_points_is_no_crossing() {
        let ys = vec![None, Some(99.0), None];
        assert!(detector(100.0, CrossingPolicy::Earliest)
            .detect(&track_from_ys(&ys))
            .is_none());
    }

    #[test]
    fn test_policy_earliest_vs_last_before_reversal() {
        // Noisy trajectory: crosses at 1.5, jitters back above the plane,
        // crosses again at 5.5, reaches its deepest point at frame 7, then
        // pulls back (the catch).
        let ys = vec![
            Some(90.0),
            Some(95.0),
            Some(105.0),
            Some(95.0),
            Some(90.0),
            Some(95.0),
            Some(105.0),
            Some(110.0),
            Some(100.0),
        ];

        let earliest = detector(100.0, CrossingPolicy::Earliest)
            .detect(&track_from_ys(&ys))
            .unwrap();
        assert!((earliest.frame - 1.5).abs() < 1e-6);

        let last = detector(100.0, CrossingPolicy::LastBeforeReversal)
            .detect(&track_from_ys(&ys))
            .unwrap();
        assert!((last.frame - 5.5).abs() < 1e-6);
    }

    #[test]
    fn test_crossing_after_apex_is_discarded() {
        // Deepest point at frame 1; a re-descent crossing after the apex is
        // bounce-back noise and loses to the crossing into the apex.
        let ys = vec![
            Some(95.0),
            Some(120.0), // apex
            Some(90.0),
            Some(105.0), // second descent crosses again at 2.67
        ];
        let last = detector(100.0, CrossingPolicy::LastBeforeReversal)
            .detect(&track_from_ys(&ys))
            .unwrap();
        assert!(last.frame < 1.0);
    }

    #[test]
    fn test_all_crossings_after_reversal_fall_back_to_earliest() {
        // Apex at frame 0: every crossing happens on later re-descents, so
        // the policy falls back to the earliest candidate.
        let ys = vec![
            Some(130.0), // apex
            Some(90.0),
            Some(105.0), // crossing at 1.67
            Some(95.0),
            Some(105.0), // crossing at 3.5
        ];
        let event = detector(100.0, CrossingPolicy::LastBeforeReversal)
            .detect(&track_from_ys(&ys))
            .unwrap();
        assert!((event.frame - (1.0 + 10.0 / 15.0)).abs() < 1e-5);
    }

    #[test]
    fn test_last_policy_with_monotone_track_takes_final_crossing() {
        // Monotone descent, single crossing; deepest point is the track end.
        let ys = vec![Some(90.0), Some(98.0), Some(102.0), Some(108.0)];
        let event = detector(100.0, CrossingPolicy::LastBeforeReversal)
            .detect(&track_from_ys(&ys))
            .unwrap();
        assert!((event.frame - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_crossing_not_bridged_across_unfilled_gap() {
        // Resolved at frames 0 and 4 only; the plane sits between them but the
        // gap was left absent, so no crossing may be synthesized.
        let ys = vec![Some(90.0), None, None, None, Some(110.0)];
        assert!(detector(100.0, CrossingPolicy::Earliest)
            .detect(&track_from_ys(&ys))
            .is_none());
    }

    #[test]
    fn test_interpolated_bracket_halves_confidence() {
        let points = vec![
            TrackPoint {
                frame: 0,
                state: PointState::Detected {
                    bbox: BBox::new(10.0, 85.0, 20.0, 95.0),
                    confidence: 0.9,
                },
            },
            TrackPoint {
                frame: 1,
                state: PointState::Interpolated {
                    bbox: BBox::new(10.0, 100.0, 20.0, 110.0),
                },
            },
        ];
        let track = Track::new(ObjectClass::Ball, points);

        let event = detector(100.0, CrossingPolicy::Earliest)
            .detect(&track)
            .unwrap();
        assert_eq!(event.confidence, 0.5);
    }
}
