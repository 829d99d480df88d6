//! Distance-to-zone: fuses per-frame detections of catcher, glove, and ball
//! into a temporally consistent estimate of where a pitch crossed the plate
//! relative to the strike zone.

pub mod cli;
pub mod export;
pub mod pipeline;
pub mod run_context;
pub mod source;

pub use pipeline::engine::DistanceEngine;
pub use pipeline::types::{
    AnalysisFlag, BBox, CrossingEvent, Detection, EngineConfig, ObjectClass, PlayMetadata,
    PlayResult, Track, Zone,
};
pub use source::{DetectionProvider, DetectorSet, Frame, FrameSource};
