// Saved-detections adapter: replays detector output recorded to JSON, letting
// the full pipeline run offline and deterministically.

use crate::pipeline::types::{BBox, Detection, ObjectClass, PlayMetadata};
use crate::source::{DetectionProvider, DetectorSet, Frame, FrameSource};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// One recorded detection. The bbox is `[x1, y1, x2, y2]` in pixel space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedDetection {
    pub frame: usize,
    pub class: ObjectClass,
    pub bbox: [f32; 4],
    pub confidence: f32,
}

/// On-disk play file: identity, context, and the full detection record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedPlayFile {
    pub play_id: String,
    #[serde(default)]
    pub metadata: PlayMetadata,
    pub frame_count: usize,
    pub detections: Vec<SavedDetection>,
}

struct Inner {
    play_id: String,
    metadata: PlayMetadata,
    frame_count: usize,
    /// Detections bucketed by frame index.
    per_frame: Vec<Vec<Detection>>,
}

/// A play loaded from a saved-detections file. Cheap to clone; the record is
/// shared.
#[derive(Clone)]
pub struct SavedPlay {
    inner: Arc<Inner>,
}

impl SavedPlay {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read play file: {}", path.display()))?;
        let file: SavedPlayFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse play file: {}", path.display()))?;
        Self::from_file(file)
    }

    pub fn from_file(file: SavedPlayFile) -> Result<Self> {
        let mut per_frame: Vec<Vec<Detection>> = vec![Vec::new(); file.frame_count];
        for d in &file.detections {
            if d.frame >= file.frame_count {
                bail!(
                    "Play {}: detection at frame {} outside frame range 0..{}",
                    file.play_id,
                    d.frame,
                    file.frame_count
                );
            }
            per_frame[d.frame].push(Detection {
                frame: d.frame,
                class: d.class,
                bbox: BBox::new(d.bbox[0], d.bbox[1], d.bbox[2], d.bbox[3]),
                confidence: d.confidence,
            });
        }

        Ok(Self {
            inner: Arc::new(Inner {
                play_id: file.play_id,
                metadata: file.metadata,
                frame_count: file.frame_count,
                per_frame,
            }),
        })
    }

    pub fn play_id(&self) -> &str {
        &self.inner.play_id
    }

    pub fn metadata(&self) -> &PlayMetadata {
        &self.inner.metadata
    }

    pub fn frame_source(&self) -> SavedFrames {
        SavedFrames {
            inner: self.inner.clone(),
        }
    }

    /// One provider per class, all replaying the same record.
    pub fn detector_set(&self) -> DetectorSet {
        DetectorSet::new(
            Box::new(SavedProvider {
                inner: self.inner.clone(),
            }),
            Box::new(SavedProvider {
                inner: self.inner.clone(),
            }),
            Box::new(SavedProvider {
                inner: self.inner.clone(),
            }),
        )
    }
}

/// Pixel-less frame source backed by a saved play record.
pub struct SavedFrames {
    inner: Arc<Inner>,
}

impl FrameSource for SavedFrames {
    fn frame_count(&self) -> Result<usize> {
        Ok(self.inner.frame_count)
    }

    fn frame(&mut self, index: usize) -> Result<Frame> {
        if index >= self.inner.frame_count {
            bail!(
                "Frame index {} out of range 0..{}",
                index,
                self.inner.frame_count
            );
        }
        Ok(Frame::pixelless(index))
    }
}

/// Provider that replays recorded detections, filtered to the requested class.
pub struct SavedProvider {
    inner: Arc<Inner>,
}

impl DetectionProvider for SavedProvider {
    fn detect(&mut self, frame: &Frame, class: ObjectClass) -> Result<Vec<Detection>> {
        if frame.index >= self.inner.frame_count {
            bail!(
                "Detect called for frame {} outside range 0..{}",
                frame.index,
                self.inner.frame_count
            );
        }
        Ok(self.inner.per_frame[frame.index]
            .iter()
            .filter(|d| d.class == class)
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "play_id": "abc-123",
            "metadata": { "game_pk": 745123, "pitch_type": "FF", "player": "Doe, Jane" },
            "frame_count": 3,
            "detections": [
                { "frame": 0, "class": "ball", "bbox": [10.0, 10.0, 20.0, 20.0], "confidence": 0.8 },
                { "frame": 0, "class": "catcher", "bbox": [100.0, 100.0, 200.0, 300.0], "confidence": 0.9 },
                { "frame": 2, "class": "ball", "bbox": [12.0, 30.0, 22.0, 40.0], "confidence": 0.7 }
            ]
        }"#
    }

    #[test]
    fn test_load_and_replay() {
        let file: SavedPlayFile = serde_json::from_str(sample_json()).unwrap();
        let play = SavedPlay::from_file(file).unwrap();
        assert_eq!(play.play_id(), "abc-123");
        assert_eq!(play.metadata().game_pk, Some(745123));

        let mut source = play.frame_source();
        assert_eq!(source.frame_count().unwrap(), 3);

        let mut set = play.detector_set();
        let frame = source.frame(0).unwrap();
        let balls = set.ball.detect(&frame, ObjectClass::Ball).unwrap();
        assert_eq!(balls.len(), 1);
        assert_eq!(balls[0].confidence, 0.8);

        let catchers = set.catcher.detect(&frame, ObjectClass::Catcher).unwrap();
        assert_eq!(catchers.len(), 1);

        let gloves = set.glove.detect(&frame, ObjectClass::Glove).unwrap();
        assert!(gloves.is_empty());
    }

    #[test]
    fn test_out_of_range_frame_is_error() {
        let file: SavedPlayFile = serde_json::from_str(sample_json()).unwrap();
        let play = SavedPlay::from_file(file).unwrap();
        let mut source = play.frame_source();
        assert!(source.frame(3).is_err());
    }

    #[test]
    fn test_saved_play_drives_full_analysis() {
        use crate::pipeline::engine::DistanceEngine;
        use crate::pipeline::types::{CrossingConfig, EngineConfig, ZoneConfig};

        // Catcher parked at 40..60 x 80..120; ball descends 10 px per frame,
        // crossing plane_y=100 at frame 5.
        let mut detections = Vec::new();
        for frame in 0..11 {
            detections.push(SavedDetection {
                frame,
                class: ObjectClass::Catcher,
                bbox: [40.0, 80.0, 60.0, 120.0],
                confidence: 0.9,
            });
            let y = 50.0 + 10.0 * frame as f32;
            detections.push(SavedDetection {
                frame,
                class: ObjectClass::Ball,
                bbox: [48.0, y - 2.0, 52.0, y + 2.0],
                confidence: 0.9,
            });
        }
        let play = SavedPlay::from_file(SavedPlayFile {
            play_id: "offline".into(),
            metadata: PlayMetadata::default(),
            frame_count: 11,
            detections,
        })
        .unwrap();

        let engine = DistanceEngine::new(EngineConfig {
            zone: ZoneConfig {
                catcher_width_in: 17.0,
                ..ZoneConfig::default()
            },
            crossing: CrossingConfig {
                plane_y: 100.0,
                ..CrossingConfig::default()
            },
            ..EngineConfig::default()
        });

        let mut source = play.frame_source();
        let mut detectors = play.detector_set();
        let result = engine.analyze_play(
            play.play_id(),
            play.metadata().clone(),
            &mut source,
            &mut detectors,
        );

        assert!(result.is_complete());
        assert_eq!(result.in_zone, Some(true));
        assert_eq!(result.distance_px, Some(0.0));
    }

    #[test]
    fn test_detection_outside_range_rejected_at_load() {
        let file = SavedPlayFile {
            play_id: "p".into(),
            metadata: PlayMetadata::default(),
            frame_count: 1,
            detections: vec![SavedDetection {
                frame: 5,
                class: ObjectClass::Ball,
                bbox: [0.0, 0.0, 1.0, 1.0],
                confidence: 0.9,
            }],
        };
        assert!(SavedPlay::from_file(file).is_err());
    }
}
