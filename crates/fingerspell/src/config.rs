//! Pipeline constants and configuration.

/// Side length of the square canvas the hand crop is letterboxed onto.
pub const CANVAS_SIZE: u32 = 400;

/// Side length of the classifier's square input image.
pub const MODEL_INPUT_SIZE: u32 = 128;

/// Margin added around the keypoint bounding box before cropping, in pixels.
pub const PADDING: u32 = 60;

/// Number of recent top-1 letters the stabilized label is computed from.
pub const WINDOW: usize = 5;

/// Number of letters reported per frame.
pub const TOP_K: usize = 3;

/// Minimum hand presence score for a landmark estimate to count as a detection.
pub const PRESENCE_THRESHOLD: f32 = 0.5;

/// Relative margin added to each side of the landmarks' bounding box to get the region the hand
/// is searched in on the next frame.
pub const ROI_PADDING: f32 = 0.3;

/// Side length of the preview thumbnail attached to predictions.
pub const THUMBNAIL_SIZE: u32 = 64;

/// JPEG quality of the preview thumbnail.
pub const THUMBNAIL_QUALITY: u8 = 10;

/// Selects which image the hand region is cropped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanvasSource {
    /// Draw the detected hand skeleton onto a black image of the frame's size and crop that.
    ///
    /// The classifier models shipped for this pipeline were trained on skeleton drawings.
    #[default]
    Skeleton,
    /// Crop the camera frame itself.
    Frame,
}

/// Configuration of a [`FramePipeline`][crate::pipeline::FramePipeline].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    canvas_size: u32,
    padding: u32,
    window: usize,
    top_k: usize,
    source: CanvasSource,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            canvas_size: CANVAS_SIZE,
            padding: PADDING,
            window: WINDOW,
            top_k: TOP_K,
            source: CanvasSource::default(),
        }
    }
}

impl PipelineConfig {
    /// Sets the side length of the normalized canvas.
    ///
    /// # Panics
    ///
    /// Panics if `size` is 0.
    pub fn with_canvas_size(self, size: u32) -> Self {
        assert!(size > 0, "canvas size must be non-zero");
        Self {
            canvas_size: size,
            ..self
        }
    }

    /// Sets the margin around the hand's bounding box, in pixels.
    pub fn with_padding(self, padding: u32) -> Self {
        Self { padding, ..self }
    }

    /// Sets the number of frames the label is smoothed over.
    ///
    /// # Panics
    ///
    /// Panics if `window` is 0.
    pub fn with_window(self, window: usize) -> Self {
        assert!(window > 0, "smoothing window must hold at least one letter");
        Self { window, ..self }
    }

    /// Sets how many letters are reported per frame.
    ///
    /// # Panics
    ///
    /// Panics if `k` is 0.
    pub fn with_top_k(self, k: usize) -> Self {
        assert!(k > 0, "top-k must be at least 1");
        Self { top_k: k, ..self }
    }

    pub fn with_source(self, source: CanvasSource) -> Self {
        Self { source, ..self }
    }

    #[inline]
    pub fn canvas_size(&self) -> u32 {
        self.canvas_size
    }

    #[inline]
    pub fn padding(&self) -> u32 {
        self.padding
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    #[inline]
    pub fn source(&self) -> CanvasSource {
        self.source
    }
}
