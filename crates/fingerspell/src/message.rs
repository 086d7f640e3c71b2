//! Serializable per-frame predictions for clients.

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

use crate::{
    config::{THUMBNAIL_QUALITY, THUMBNAIL_SIZE},
    image::{Image, ResizeFilter, Resolution},
    pipeline::FrameResult,
};

/// Class reported for frames without a usable hand.
pub const NO_HAND: &str = "No Hand Detected";

/// The prediction sent back to a client for every frame it submits.
///
/// Serializes as `{"class": "A", "confidence": 0.93, "image": "<base64 JPEG>"}`. `image` is
/// omitted when no thumbnail was requested or no hand was found.
#[serde_with::skip_serializing_none]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// The stabilized letter, or [`NO_HAND`].
    pub class: String,
    /// Probability of the frame's own top-1 letter.
    pub confidence: f32,
    /// Grayscale JPEG thumbnail of the classified canvas.
    #[serde_as(as = "Option<Base64>")]
    pub image: Option<Vec<u8>>,
}

impl Prediction {
    pub fn no_hand() -> Self {
        Self {
            class: NO_HAND.to_string(),
            confidence: 0.0,
            image: None,
        }
    }

    /// Builds the prediction for a processed frame, optionally attaching a canvas thumbnail.
    pub fn from_result(result: &FrameResult, with_thumbnail: bool) -> anyhow::Result<Self> {
        let detection = match result {
            FrameResult::NoDetection => return Ok(Self::no_hand()),
            FrameResult::Detection(detection) => detection,
        };

        let image = if with_thumbnail {
            Some(thumbnail(&detection.canvas)?)
        } else {
            None
        };
        Ok(Self {
            class: detection.label.to_string(),
            confidence: detection.confidence,
            image,
        })
    }

    #[inline]
    pub fn is_hand(&self) -> bool {
        self.class != NO_HAND
    }
}

/// Encodes a small, mirrored grayscale JPEG preview of `canvas`.
pub fn thumbnail(canvas: &Image) -> anyhow::Result<Vec<u8>> {
    canvas
        .resize(Resolution::square(THUMBNAIL_SIZE), ResizeFilter::Lanczos3)
        .flip_horizontal()
        .encode_luma_jpeg(THUMBNAIL_QUALITY)
}
