pub mod saved;

use crate::pipeline::types::{Detection, ObjectClass};
use anyhow::Result;
use image::RgbImage;

/// One frame of a play clip. Detection-only sources carry no pixel data.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub image: Option<RgbImage>,
}

impl Frame {
    /// A frame without pixels, for providers that key on the index alone.
    pub fn pixelless(index: usize) -> Self {
        Self { index, image: None }
    }
}

/// Ordered, seekable frame access for one play. Out-of-range indices are an
/// error, never a silent empty frame.
pub trait FrameSource: Send {
    fn frame_count(&self) -> Result<usize>;
    fn frame(&mut self, index: usize) -> Result<Frame>;
}

/// Uniform per-frame detection capability wrapping one detector model.
///
/// Implementations must be deterministic for a fixed frame and configuration
/// so tracking stays reproducible. A call may block (model inference); the
/// pipeline never holds a lock across it.
pub trait DetectionProvider: Send {
    fn detect(&mut self, frame: &Frame, class: ObjectClass) -> Result<Vec<Detection>>;
}

/// The per-class providers one play analysis consumes. Model caching across
/// plays belongs to the provider implementations, not the pipeline.
pub struct DetectorSet {
    pub catcher: Box<dyn DetectionProvider>,
    pub glove: Box<dyn DetectionProvider>,
    pub ball: Box<dyn DetectionProvider>,
}

impl DetectorSet {
    pub fn new(
        catcher: Box<dyn DetectionProvider>,
        glove: Box<dyn DetectionProvider>,
        ball: Box<dyn DetectionProvider>,
    ) -> Self {
        Self {
            catcher,
            glove,
            ball,
        }
    }
}
