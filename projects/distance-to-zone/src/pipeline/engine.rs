// Per-play orchestration: fans frames out to one detection worker per object
// class, resolves the three tracks, then derives crossing, zone, and distance.

use crate::pipeline::crossing::CrossingDetector;
use crate::pipeline::geometry::{distance_to_zone, zone_contains};
use crate::pipeline::tracker::{ObjectTracker, TrackerConfig};
use crate::pipeline::types::{
    AnalysisFlag, Detection, EngineConfig, ObjectClass, PlayMetadata, PlayResult, Track,
};
use crate::pipeline::zone::ZoneEstimator;
use crate::source::{DetectionProvider, DetectorSet, Frame, FrameSource};
use anyhow::{anyhow, Context, Result};
use crossbeam::channel::{self, Receiver};
use std::sync::Arc;

/// Frames buffered per class channel. Keeps a slow detector from forcing the
/// whole clip into memory.
const FRAME_QUEUE_DEPTH: usize = 8;

/// Runs the full distance-to-zone computation for single plays.
///
/// The engine owns no cross-play state: tracks, zone, and crossing live only
/// for the duration of one `analyze_play` call.
pub struct DistanceEngine {
    config: EngineConfig,
}

impl DistanceEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze one play. Always returns a `PlayResult`; source or detector
    /// faults are caught here and flagged, so one bad play never disturbs a
    /// batch.
    pub fn analyze_play(
        &self,
        play_id: &str,
        metadata: PlayMetadata,
        source: &mut dyn FrameSource,
        detectors: &mut DetectorSet,
    ) -> PlayResult {
        let (catcher, glove, ball) = match self.resolve_tracks(source, detectors) {
            Ok(tracks) => tracks,
            Err(e) => {
                tracing::warn!("Play {}: source read failure: {:#}", play_id, e);
                return PlayResult::incomplete(play_id, metadata, AnalysisFlag::SourceReadFailure);
            }
        };

        let mut flags = Vec::new();
        for track in [&catcher, &glove, &ball] {
            if track.is_blank() {
                flags.push(AnalysisFlag::MissingDetection(track.class()));
            } else if track.has_exceeded_gap() {
                flags.push(AnalysisFlag::InterpolationGapExceeded(track.class()));
            }
        }

        let crossing = CrossingDetector::new(self.config.crossing).detect(&ball);
        if crossing.is_none() && !ball.is_blank() {
            flags.push(AnalysisFlag::NoCrossingFound);
        }

        let zone = crossing.and_then(|c| {
            let zone = ZoneEstimator::new(self.config.zone).estimate(&catcher, c.frame);
            if zone.is_none() {
                flags.push(AnalysisFlag::DegenerateZone);
            }
            zone
        });

        let (distance_px, distance_in, in_zone) = match (crossing, zone) {
            (Some(c), Some(z)) => {
                let d = distance_to_zone(&z, c.x, c.y, self.config.distance_mode);
                (
                    Some(d),
                    Some(d / z.pixels_per_inch),
                    Some(zone_contains(&z, c.x, c.y)),
                )
            }
            _ => (None, None, None),
        };

        let glove_target = crossing.and_then(|c| {
            let anchor = c.frame.round().max(0.0) as usize;
            glove
                .nearest_resolved(anchor, self.config.zone.anchor_tolerance)
                .and_then(|p| p.position())
        });
        let miss_to_glove_px = match (crossing, glove_target) {
            (Some(c), Some((gx, gy))) => Some(((c.x - gx).powi(2) + (c.y - gy).powi(2)).sqrt()),
            _ => None,
        };

        tracing::debug!(
            "Play {}: distance_px={:?} in_zone={:?} flags={:?}",
            play_id,
            distance_px,
            in_zone,
            flags
        );

        PlayResult {
            play_id: play_id.to_string(),
            metadata,
            crossing,
            zone,
            distance_px,
            distance_in,
            in_zone,
            glove_target,
            miss_to_glove_px,
            flags,
        }
    }

    /// Read each frame once and fan it out to one worker per object class.
    /// The three workers detect and track independently; nothing holds a lock
    /// across a `detect()` call.
    fn resolve_tracks(
        &self,
        source: &mut dyn FrameSource,
        detectors: &mut DetectorSet,
    ) -> Result<(Track, Track, Track)> {
        let frame_count = source.frame_count().context("Failed to query frame count")?;

        let DetectorSet {
            catcher,
            glove,
            ball,
        } = detectors;

        let catcher_tracker = self.tracker_for(ObjectClass::Catcher);
        let glove_tracker = self.tracker_for(ObjectClass::Glove);
        let ball_tracker = self.tracker_for(ObjectClass::Ball);

        std::thread::scope(|scope| {
            let (tx_c, rx_c) = channel::bounded::<Arc<Frame>>(FRAME_QUEUE_DEPTH);
            let (tx_g, rx_g) = channel::bounded::<Arc<Frame>>(FRAME_QUEUE_DEPTH);
            let (tx_b, rx_b) = channel::bounded::<Arc<Frame>>(FRAME_QUEUE_DEPTH);

            let h_catcher = scope.spawn(move || {
                class_worker(
                    rx_c,
                    catcher.as_mut(),
                    ObjectClass::Catcher,
                    catcher_tracker,
                    frame_count,
                )
            });
            let h_glove = scope.spawn(move || {
                class_worker(
                    rx_g,
                    glove.as_mut(),
                    ObjectClass::Glove,
                    glove_tracker,
                    frame_count,
                )
            });
            let h_ball = scope.spawn(move || {
                class_worker(
                    rx_b,
                    ball.as_mut(),
                    ObjectClass::Ball,
                    ball_tracker,
                    frame_count,
                )
            });

            let mut read_err: Option<anyhow::Error> = None;
            for index in 0..frame_count {
                match source.frame(index) {
                    Ok(frame) => {
                        let frame = Arc::new(frame);
                        if tx_c.send(frame.clone()).is_err()
                            || tx_g.send(frame.clone()).is_err()
                            || tx_b.send(frame).is_err()
                        {
                            // A worker hung up early; its join result explains why.
                            break;
                        }
                    }
                    Err(e) => {
                        read_err = Some(e.context(format!("Failed to read frame {index}")));
                        break;
                    }
                }
            }
            drop((tx_c, tx_g, tx_b));

            let catcher_track = join_worker(h_catcher);
            let glove_track = join_worker(h_glove);
            let ball_track = join_worker(h_ball);

            if let Some(e) = read_err {
                return Err(e);
            }
            Ok((catcher_track?, glove_track?, ball_track?))
        })
    }

    fn tracker_for(&self, class: ObjectClass) -> ObjectTracker {
        ObjectTracker::new(
            class,
            TrackerConfig {
                confidence_threshold: self.config.confidence.for_class(class),
                max_gap: self.config.max_gap,
            },
        )
    }
}

fn class_worker(
    rx: Receiver<Arc<Frame>>,
    provider: &mut dyn DetectionProvider,
    class: ObjectClass,
    tracker: ObjectTracker,
    frame_count: usize,
) -> Result<Track> {
    let mut per_frame: Vec<Vec<Detection>> = vec![Vec::new(); frame_count];
    for frame in rx {
        let detections = provider
            .detect(&frame, class)
            .with_context(|| format!("Detector failed for {} at frame {}", class, frame.index))?;
        if frame.index < frame_count {
            per_frame[frame.index] = detections;
        }
    }
    Ok(tracker.resolve(&per_frame))
}

fn join_worker(handle: std::thread::ScopedJoinHandle<'_, Result<Track>>) -> Result<Track> {
    handle
        .join()
        .map_err(|_| anyhow!("Detection worker panicked"))?
}
