//! Palm detection.
//!
//! The hand landmark network only works well when the hand fills most of its input. On full camera
//! frames, the hand is therefore first found with the MediaPipe palm detector, an SSD network that
//! outputs one candidate box (plus 7 palm keypoints) per anchor. Candidates below the confidence
//! threshold are discarded, duplicates are merged by [`nms::NonMaxSuppression`], and the region
//! around the most confident palm is handed to the landmark network (see
//! [`Detection::hand_region`]).

pub mod nms;
pub mod ssd;

use std::path::Path;

use crate::{
    image::{AspectRatio, Image, Rect, Resolution},
    nn::{Cnn, CnnInputShape, ColorMapper, NeuralNetwork, Outputs},
    normalize::{letterbox, Letterbox},
};

use nms::NonMaxSuppression;
use ssd::{Anchor, Anchors, LayerInfo};

/// Values per anchor in the box output: center, size and 7 keypoints.
const BOX_PARAMS: usize = 18;

/// Size of the hand region relative to the longer side of the palm box.
const HAND_SCALE: f32 = 2.6;

/// Offset of the hand region's center from the palm's center, towards the fingers, relative to
/// the palm box height.
const HAND_SHIFT: f32 = 0.5;

/// A keypoint of a palm [`Detection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PalmKeypoint {
    Wrist = 0,
    IndexFingerMcp = 1,
    MiddleFingerMcp = 2,
    RingFingerMcp = 3,
    PinkyMcp = 4,
    ThumbCmc = 5,
    ThumbMcp = 6,
}

/// Axis-aligned bounding rectangle of a detected object.
///
/// This primarily differs from [`Rect`] in that it uses float coordinates instead of integers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingRect {
    xc: f32,
    yc: f32,
    w: f32,
    h: f32,
}

impl BoundingRect {
    /// Creates a bounding rectangle centered at `(xc,yc)`.
    pub fn from_center(xc: f32, yc: f32, w: f32, h: f32) -> Self {
        Self { xc, yc, w, h }
    }

    pub fn x_center(&self) -> f32 {
        self.xc
    }

    pub fn y_center(&self) -> f32 {
        self.yc
    }

    pub fn width(&self) -> f32 {
        self.w
    }

    pub fn height(&self) -> f32 {
        self.h
    }

    /// Uniformly scales the size of `self` by `scale`, keeping its center.
    pub fn scale(&self, scale: f32) -> Self {
        Self {
            w: self.w * scale,
            h: self.h * scale,
            ..*self
        }
    }

    /// Returns the amount of area covered by `self`.
    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    fn intersection_area(&self, other: &Self) -> f32 {
        let overlap = |c1: f32, s1: f32, c2: f32, s2: f32| {
            let start = (c1 - s1 / 2.0).max(c2 - s2 / 2.0);
            let end = (c1 + s1 / 2.0).min(c2 + s2 / 2.0);
            (end - start).max(0.0)
        };
        overlap(self.xc, self.w, other.xc, other.w) * overlap(self.yc, self.h, other.yc, other.h)
    }

    /// Computes the Intersection over Union (IOU) of `self` and `other`.
    ///
    /// Rectangles without area have an IOU of 0 with everything.
    pub fn iou(&self, other: &Self) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }

    /// Returns the smallest integer rectangle containing `self`.
    ///
    /// Returns `None` if `self` has no area or a coordinate that is infinite or NaN.
    pub fn to_rect(&self) -> Option<Rect> {
        let finite = [self.xc, self.yc, self.w, self.h]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.w <= 0.0 || self.h <= 0.0 {
            return None;
        }

        // `as` saturates, which keeps `min <= end`.
        let x_min = (self.xc - self.w / 2.0).floor() as i32;
        let y_min = (self.yc - self.h / 2.0).floor() as i32;
        let x_end = (self.xc + self.w / 2.0).ceil() as i32;
        let y_end = (self.yc + self.h / 2.0).ceil() as i32;
        Some(Rect::from_bounds(x_min, y_min, x_end, y_end))
    }
}

/// A palm found by the [`PalmDetector`].
///
/// Coordinates are in pixels of the image passed to [`PalmDetector::detect`].
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    confidence: f32,
    angle: f32,
    rect: BoundingRect,
    keypoints: Vec<[f32; 2]>,
}

impl Detection {
    /// Creates a detection, computing its angle from the wrist and middle finger keypoints if
    /// present.
    pub fn new(confidence: f32, rect: BoundingRect, keypoints: Vec<[f32; 2]>) -> Self {
        let mut det = Self {
            confidence,
            angle: 0.0,
            rect,
            keypoints,
        };
        if let (Some(wrist), Some(finger)) = (
            det.keypoint(PalmKeypoint::Wrist),
            det.keypoint(PalmKeypoint::MiddleFingerMcp),
        ) {
            det.angle = palm_angle(wrist, finger);
        }
        det
    }

    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Returns the clockwise rotation of the palm in radians.
    ///
    /// A hand with its fingers pointing straight up has an angle of 0.
    #[inline]
    pub fn angle(&self) -> f32 {
        self.angle
    }

    #[inline]
    pub fn bounding_rect(&self) -> BoundingRect {
        self.rect
    }

    pub fn keypoint(&self, kp: PalmKeypoint) -> Option<[f32; 2]> {
        self.keypoints.get(kp as usize).copied()
    }

    /// Returns the square region that is expected to contain the whole hand.
    ///
    /// The palm box is moved towards the fingers and enlarged so that the fingers fit in.
    pub fn hand_region(&self) -> BoundingRect {
        let (sin, cos) = self.angle.sin_cos();
        let shift = HAND_SHIFT * self.rect.h;
        let side = self.rect.w.max(self.rect.h);
        BoundingRect::from_center(
            self.rect.xc + sin * shift,
            self.rect.yc - cos * shift,
            side,
            side,
        )
        .scale(HAND_SCALE)
    }

    /// Maps the detection from letterboxed canvas pixels back to the source image.
    fn to_source(&self, boxed: &Letterbox) -> Self {
        let [xc, yc] = boxed.to_source(self.rect.xc, self.rect.yc);
        let [sx, sy] = boxed.source_scale();
        Self {
            confidence: self.confidence,
            angle: self.angle,
            rect: BoundingRect::from_center(xc, yc, self.rect.w * sx, self.rect.h * sy),
            keypoints: self
                .keypoints
                .iter()
                .map(|&[x, y]| boxed.to_source(x, y))
                .collect(),
        }
    }
}

/// Angle between the upwards direction and the direction from the wrist to the fingers.
fn palm_angle(wrist: [f32; 2], finger: [f32; 2]) -> f32 {
    let (dx, dy) = (wrist[0] - finger[0], wrist[1] - finger[1]);
    (-dx).atan2(dy)
}

/// Applies the standard sigmoid/logistic function to the input.
fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

/// Finds palms with the MediaPipe palm detection network.
#[derive(Debug, Clone)]
pub struct PalmDetector {
    cnn: Cnn,
    anchors: Anchors,
    threshold: f32,
    nms: NonMaxSuppression,
}

impl PalmDetector {
    /// Default minimum confidence of a palm detection.
    pub const DEFAULT_THRESHOLD: f32 = 0.5;

    /// Loads the palm detection network from an ONNX file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let nn = NeuralNetwork::from_path(path)?.load()?;
        log::debug!("loaded palm detection network from '{}'", path.display());
        Self::new(nn)
    }

    /// Creates a detector from a loaded network.
    ///
    /// The network's first output must hold the `[1, anchors, 18]` box parameters and its second
    /// output the `[1, anchors, 1]` raw confidence scores. Anchors are laid out on feature maps
    /// of 1/8 and 1/16 of the square input resolution.
    pub fn new(nn: NeuralNetwork) -> anyhow::Result<Self> {
        if nn.num_outputs() < 2 {
            anyhow::bail!(
                "palm detection network must have at least 2 outputs, this one has {}",
                nn.num_outputs()
            );
        }

        let cnn = Cnn::new(nn, CnnInputShape::NCHW, ColorMapper::linear(0.0..=1.0))?;
        let res = cnn.input_resolution();
        if res.aspect_ratio() != Some(AspectRatio::SQUARE) || res.width() % 16 != 0 {
            anyhow::bail!(
                "palm detection network input must be square and a multiple of 16, got {}",
                res
            );
        }

        Ok(Self {
            anchors: palm_anchors(res),
            cnn,
            threshold: Self::DEFAULT_THRESHOLD,
            nms: NonMaxSuppression::default(),
        })
    }

    /// Sets the minimum confidence for a palm to be reported.
    pub fn with_threshold(self, threshold: f32) -> Self {
        Self { threshold, ..self }
    }

    /// Finds palms in `image`, most confident first.
    pub fn detect(&self, image: &Image) -> anyhow::Result<Vec<Detection>> {
        let input_res = self.cnn.input_resolution();
        let boxed = letterbox(image, input_res.width());
        let outputs = self.cnn.estimate(boxed.canvas())?;

        let candidates = extract_palms(&outputs, &self.anchors, input_res, self.threshold)?;
        let num_candidates = candidates.len();
        let detections = self
            .nms
            .process(candidates)
            .iter()
            .map(|det| det.to_source(&boxed))
            .collect::<Vec<_>>();
        log::trace!(
            "{} palm candidates, {} after suppression",
            num_candidates,
            detections.len()
        );
        Ok(detections)
    }
}

fn palm_anchors(input_res: Resolution) -> Anchors {
    let (w, h) = (input_res.width(), input_res.height());
    Anchors::calculate(&[
        LayerInfo::new(2, w / 8, h / 8),
        LayerInfo::new(6, w / 16, h / 16),
    ])
}

/// Decodes the palm detection network's outputs into detections in network input pixels.
///
/// Candidates with a confidence below `threshold` are skipped.
fn extract_palms(
    outputs: &Outputs,
    anchors: &Anchors,
    input_res: Resolution,
    threshold: f32,
) -> anyhow::Result<Vec<Detection>> {
    let num_anchors = anchors.anchor_count();
    if outputs.len() < 2 {
        anyhow::bail!("expected 2 palm detection outputs, got {}", outputs.len());
    }
    let boxes = &outputs[0];
    let confidences = &outputs[1];
    if boxes.shape() != [1, num_anchors, BOX_PARAMS] || confidences.shape() != [1, num_anchors, 1]
    {
        anyhow::bail!(
            "unexpected palm detection output shapes {:?} and {:?} for {} anchors",
            boxes.shape(),
            confidences.shape(),
            num_anchors
        );
    }

    let mut detections = Vec::new();
    for (index, raw) in confidences.index([0]).to_vec().into_iter().enumerate() {
        let confidence = sigmoid(raw);
        if confidence.is_nan() || confidence < threshold {
            continue;
        }

        let params = boxes.index([0, index]).to_vec();
        detections.push(extract_detection(
            &anchors[index],
            input_res,
            &params,
            confidence,
        ));
    }
    Ok(detections)
}

fn extract_detection(
    anchor: &Anchor,
    input_res: Resolution,
    box_params: &[f32],
    confidence: f32,
) -> Detection {
    assert_eq!(box_params.len(), BOX_PARAMS);

    let x_offset = anchor.x_center() * input_res.width() as f32;
    let y_offset = anchor.y_center() * input_res.height() as f32;

    let xc = box_params[0] + x_offset;
    let yc = box_params[1] + y_offset;
    let w = box_params[2];
    let h = box_params[3];
    let keypoints = box_params[4..]
        .chunks_exact(2)
        .map(|xy| [xy[0] + x_offset, xy[1] + y_offset])
        .collect();

    Detection::new(confidence, BoundingRect::from_center(xc, yc, w, h), keypoints)
}
