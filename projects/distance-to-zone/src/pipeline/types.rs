use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

/// The three object classes the pipeline tracks independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectClass {
    Catcher,
    Glove,
    Ball,
}

impl ObjectClass {
    pub const ALL: [ObjectClass; 3] = [ObjectClass::Catcher, ObjectClass::Glove, ObjectClass::Ball];

    pub fn label(&self) -> &'static str {
        match self {
            ObjectClass::Catcher => "catcher",
            ObjectClass::Glove => "glove",
            ObjectClass::Ball => "ball",
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Axis-aligned bounding box in pixel space, corner form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// A usable box has strictly positive extent on both axes.
    pub fn is_valid(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }
}

/// One detector output for one frame. Immutable once produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Detection {
    pub frame: usize,
    pub class: ObjectClass,
    pub bbox: BBox,
    pub confidence: f32,
}

/// Resolution state of a single track frame.
#[derive(Debug, Clone, Copy)]
pub enum PointState {
    /// Accepted directly from a detector.
    Detected { bbox: BBox, confidence: f32 },
    /// Filled by linear interpolation across a short detector dropout.
    Interpolated { bbox: BBox },
    /// No usable detection. `gap_exceeded` marks interior runs that were too
    /// long to bridge.
    Absent { gap_exceeded: bool },
}

impl PointState {
    pub fn bbox(&self) -> Option<BBox> {
        match self {
            PointState::Detected { bbox, .. } | PointState::Interpolated { bbox } => Some(*bbox),
            PointState::Absent { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, PointState::Absent { .. })
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, PointState::Detected { .. })
    }
}

/// One entry of a track: the object's resolution state at one frame.
#[derive(Debug, Clone, Copy)]
pub struct TrackPoint {
    pub frame: usize,
    pub state: PointState,
}

impl TrackPoint {
    /// Bbox center, when resolved.
    pub fn position(&self) -> Option<(f32, f32)> {
        self.state.bbox().map(|b| b.center())
    }
}

/// Resolved trajectory of one object class across a play. Holds exactly one
/// point per frame, frames strictly increasing from zero.
#[derive(Debug, Clone)]
pub struct Track {
    class: ObjectClass,
    points: Vec<TrackPoint>,
}

impl Track {
    pub fn new(class: ObjectClass, points: Vec<TrackPoint>) -> Self {
        debug_assert!(points.iter().enumerate().all(|(i, p)| p.frame == i));
        Self { class, points }
    }

    pub fn class(&self) -> ObjectClass {
        self.class
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when no frame resolved to a position: the object was not found in
    /// this play. Downstream treats this as data, not as an error.
    pub fn is_blank(&self) -> bool {
        !self.points.iter().any(|p| p.state.is_resolved())
    }

    /// True when at least one interior dropout was too long to interpolate.
    pub fn has_exceeded_gap(&self) -> bool {
        self.points
            .iter()
            .any(|p| matches!(p.state, PointState::Absent { gap_exceeded: true }))
    }

    pub fn resolved(&self) -> impl Iterator<Item = &TrackPoint> {
        self.points.iter().filter(|p| p.state.is_resolved())
    }

    /// Nearest resolved point within `tolerance` frames of `frame`, preferring
    /// the smaller frame distance and the earlier frame on ties.
    pub fn nearest_resolved(&self, frame: usize, tolerance: usize) -> Option<&TrackPoint> {
        self.resolved()
            .filter(|p| p.frame.abs_diff(frame) <= tolerance)
            .min_by_key(|p| (p.frame.abs_diff(frame), p.frame))
    }
}

/// Estimated strike-zone rectangle, valid for the frame it was derived from.
/// `pixels_per_inch` records the scale implied by the catcher box width so
/// distances can also be reported in inches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Zone {
    pub top_y: f32,
    pub bottom_y: f32,
    pub left_x: f32,
    pub right_x: f32,
    pub pixels_per_inch: f32,
}

impl Zone {
    pub fn center(&self) -> (f32, f32) {
        (
            (self.left_x + self.right_x) / 2.0,
            (self.top_y + self.bottom_y) / 2.0,
        )
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.top_y < self.bottom_y && self.left_x < self.right_x && self.pixels_per_inch > 0.0)
    }
}

/// The instant the ball trajectory passes the plate reference plane. The frame
/// is fractional: the bracketing frames are linearly interpolated for
/// sub-frame precision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CrossingEvent {
    pub frame: f32,
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

/// Non-fatal analysis conditions surfaced on the play result. These are data,
/// never errors: a flagged play still yields a `PlayResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisFlag {
    /// A class had zero usable detections for the whole play.
    MissingDetection(ObjectClass),
    /// A class had an interior dropout too long to interpolate across.
    InterpolationGapExceeded(ObjectClass),
    /// No plausible catcher anchor near the crossing frame.
    DegenerateZone,
    /// The ball never crossed the reference plane.
    NoCrossingFound,
    /// Frame source or detector raised an I/O fault; fatal for this play only.
    SourceReadFailure,
}

impl fmt::Display for AnalysisFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisFlag::MissingDetection(c) => write!(f, "missing_detection:{c}"),
            AnalysisFlag::InterpolationGapExceeded(c) => {
                write!(f, "interpolation_gap_exceeded:{c}")
            }
            AnalysisFlag::DegenerateZone => f.write_str("degenerate_zone"),
            AnalysisFlag::NoCrossingFound => f.write_str("no_crossing_found"),
            AnalysisFlag::SourceReadFailure => f.write_str("source_read_failure"),
        }
    }
}

/// Play-level context carried through from the source records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayMetadata {
    #[serde(default)]
    pub game_pk: Option<u64>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub pitch_type: Option<String>,
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Final record for one play. Every analytical field is independently optional;
/// `flags` explains what is absent and why. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayResult {
    pub play_id: String,
    pub metadata: PlayMetadata,
    pub crossing: Option<CrossingEvent>,
    pub zone: Option<Zone>,
    pub distance_px: Option<f32>,
    pub distance_in: Option<f32>,
    pub in_zone: Option<bool>,
    /// Glove center near the crossing frame: where the pitch was called for.
    pub glove_target: Option<(f32, f32)>,
    /// Miss distance from the crossing position to the glove target.
    pub miss_to_glove_px: Option<f32>,
    pub flags: Vec<AnalysisFlag>,
}

impl PlayResult {
    /// A result with no analytical fields, carrying a single reason flag.
    pub fn incomplete(
        play_id: impl Into<String>,
        metadata: PlayMetadata,
        flag: AnalysisFlag,
    ) -> Self {
        Self {
            play_id: play_id.into(),
            metadata,
            crossing: None,
            zone: None,
            distance_px: None,
            distance_in: None,
            in_zone: None,
            glove_target: None,
            miss_to_glove_px: None,
            flags: vec![flag],
        }
    }

    /// A play is complete when a distance was computed. A distance of zero
    /// always means "in zone", never "unknown".
    pub fn is_complete(&self) -> bool {
        self.distance_px.is_some()
    }
}

/// Direction the ball approaches the reference plane from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Approach {
    /// Vertical coordinate increases toward the plate (broadcast view).
    Down,
    Up,
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Approach::Down => f.write_str("down"),
            Approach::Up => f.write_str("up"),
        }
    }
}

/// Tie-break policy when a noisy trajectory yields multiple plane crossings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CrossingPolicy {
    /// First qualifying transition wins.
    Earliest,
    /// Last crossing before the trajectory reverses or the track ends, modeling
    /// the ball continuing past the plate. Falls back to the earliest crossing
    /// when every candidate sits after the reversal.
    LastBeforeReversal,
}

impl fmt::Display for CrossingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossingPolicy::Earliest => f.write_str("earliest"),
            CrossingPolicy::LastBeforeReversal => f.write_str("last-before-reversal"),
        }
    }
}

/// Distance sign convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMode {
    /// Zero inside the zone, edge distance outside.
    Unsigned,
    /// Negative edge clearance inside the zone, edge distance outside.
    Signed,
}

/// Per-class confidence floors for accepting detections.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    pub catcher: f32,
    pub glove: f32,
    pub ball: f32,
}

impl ConfidenceThresholds {
    pub fn for_class(&self, class: ObjectClass) -> f32 {
        match class {
            ObjectClass::Catcher => self.catcher,
            ObjectClass::Glove => self.glove,
            ObjectClass::Ball => self.ball,
        }
    }
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            catcher: 0.5,
            glove: 0.5,
            ball: 0.3,
        }
    }
}

/// Strike-zone reconstruction parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Zone height as a fraction of the catcher box height.
    pub height_frac: f32,
    /// Vertical shift of the zone center, as a fraction of the catcher box
    /// height, compensating for stance variance.
    pub vertical_offset: f32,
    /// Assumed real-world width of the catcher box, in inches. Together with
    /// the observed box width this fixes the pixel scale.
    pub catcher_width_in: f32,
    /// Home plate width, in inches.
    pub plate_width_in: f32,
    /// How far (in frames) the catcher anchor may sit from the crossing frame.
    pub anchor_tolerance: usize,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            height_frac: 0.5,
            vertical_offset: 0.0,
            catcher_width_in: 34.0,
            plate_width_in: 17.0,
            anchor_tolerance: 5,
        }
    }
}

/// Plate-crossing detection parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CrossingConfig {
    /// Pixel row acting as the home-plate proxy plane.
    pub plane_y: f32,
    pub approach: Approach,
    pub policy: CrossingPolicy,
}

impl Default for CrossingConfig {
    fn default() -> Self {
        Self {
            plane_y: 600.0,
            approach: Approach::Down,
            policy: CrossingPolicy::LastBeforeReversal,
        }
    }
}

/// Full configuration surface consumed by the engine. Values only; parsing
/// them belongs to the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub confidence: ConfidenceThresholds,
    /// Longest interior detector dropout (in frames) bridged by interpolation.
    pub max_gap: usize,
    pub zone: ZoneConfig,
    pub crossing: CrossingConfig,
    pub distance_mode: DistanceMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence: ConfidenceThresholds::default(),
            max_gap: 4,
            zone: ZoneConfig::default(),
            crossing: CrossingConfig::default(),
            distance_mode: DistanceMode::Unsigned,
        }
    }
}

/// Batch progress shared between worker threads and the CLI progress monitor.
#[derive(Debug)]
pub struct BatchProgress {
    pub total_plays: usize,
    pub completed: AtomicUsize,
    pub failed: AtomicUsize,
    pub is_active: AtomicBool,
    pub active_workers: AtomicUsize,
    pub start_time: Instant,
}

impl BatchProgress {
    pub fn new(total_plays: usize) -> Self {
        Self {
            total_plays,
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            is_active: AtomicBool::new(true),
            active_workers: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, result: &PlayResult) {
        if result.is_complete() {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn processed(&self) -> usize {
        self.completed.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed)
    }

    /// Plays per second since the batch started.
    pub fn rate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.processed() as f64 / elapsed
        } else {
            0.0
        }
    }
}
