//! Non-Maximum Suppression and Averaging.
//!
//! The palm detector produces many overlapping detections for a single hand, one per anchor that
//! fires. Non-Maximum Suppression (NMS) reduces them to one detection per hand.
//!
//! Two variants are implemented, selected with [`SuppressionMode`]: classic suppression, which
//! drops every detection overlapping a more confident one ([`SuppressionMode::Remove`]), and
//! Non-Maximum Averaging ([`SuppressionMode::Average`]), which replaces a group of overlapping
//! detections by their confidence-weighted average. Averaging reduces jitter between frames and is
//! the default.

use itertools::Itertools;

use super::{BoundingRect, Detection};

/// A non-maximum suppression algorithm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonMaxSuppression {
    iou_thresh: f32,
    mode: SuppressionMode,
}

impl NonMaxSuppression {
    /// The default intersection-over-union threshold used to determine if two detections overlap.
    pub const DEFAULT_IOU_THRESH: f32 = 0.3;

    /// Creates a suppressor that considers detections with an IoU of at least `iou_thresh` as
    /// duplicates.
    pub fn new(iou_thresh: f32, mode: SuppressionMode) -> Self {
        Self { iou_thresh, mode }
    }

    /// Performs non-maximum suppression on `detections`.
    ///
    /// The surviving detections are returned in order of descending confidence.
    pub fn process(&self, mut detections: Vec<Detection>) -> Vec<Detection> {
        let mut out = Vec::new();

        // Ascending confidence, so the most confident detection is popped first.
        detections.sort_unstable_by(|a, b| a.confidence.total_cmp(&b.confidence));

        while let Some(seed) = detections.pop() {
            let (overlapping, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut detections)
                .into_iter()
                .partition(|other| seed.rect.iou(&other.rect) >= self.iou_thresh);
            detections = rest;

            match self.mode {
                SuppressionMode::Remove => out.push(seed),
                SuppressionMode::Average => out.push(average(seed, &overlapping)),
            }
        }

        out
    }
}

impl Default for NonMaxSuppression {
    fn default() -> Self {
        Self::new(Self::DEFAULT_IOU_THRESH, SuppressionMode::Average)
    }
}

/// Describes how [`NonMaxSuppression`] should deal with overlapping detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SuppressionMode {
    /// Remove overlapping detections, only retain the detection with highest confidence score.
    Remove,

    /// Compute a confidence-weighted average of overlapping detections.
    Average,
}

/// Averages `seed` with the detections it suppresses, keeping the seed's confidence.
fn average(seed: Detection, others: &[Detection]) -> Detection {
    let divisor: f32 = seed.confidence + others.iter().map(|d| d.confidence).sum::<f32>();
    if others.is_empty() || divisor <= 0.0 {
        return seed;
    }

    let (mut x, mut y, mut w, mut h, mut angle) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let mut keypoints = vec![[0.0f32; 2]; seed.keypoints.len()];
    for det in std::iter::once(&seed).chain(others) {
        let factor = det.confidence;
        x += det.rect.x_center() * factor;
        y += det.rect.y_center() * factor;
        w += det.rect.width() * factor;
        h += det.rect.height() * factor;
        angle += det.angle * factor;
        for (acc, kp) in keypoints.iter_mut().zip_eq(&det.keypoints) {
            acc[0] += kp[0] * factor;
            acc[1] += kp[1] * factor;
        }
    }

    for kp in &mut keypoints {
        kp[0] /= divisor;
        kp[1] /= divisor;
    }

    Detection {
        confidence: seed.confidence,
        angle: angle / divisor,
        rect: BoundingRect::from_center(x / divisor, y / divisor, w / divisor, h / divisor),
        keypoints,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nms_suppresses_non_maximum() {
        let nms = NonMaxSuppression::new(
            NonMaxSuppression::DEFAULT_IOU_THRESH,
            SuppressionMode::Remove,
        );

        let rect = BoundingRect::from_center(0.0, 0.0, 1.0, 1.0);
        let a = Detection::new(0.6, rect, Vec::new());
        let b = Detection::new(0.55, rect.scale(1.5), Vec::new());
        let detections = nms.process(vec![b, a]);
        assert_eq!(detections.len(), 1);

        let d = &detections[0];
        let rect = d.bounding_rect();
        assert_eq!(d.confidence(), 0.6);
        assert_eq!(rect.x_center(), 0.0);
        assert_eq!(rect.y_center(), 0.0);
        assert_eq!(rect.width(), 1.0);
        assert_eq!(rect.height(), 1.0);
    }

    #[test]
    fn nms_ignores_nonoverlapping() {
        let nms = NonMaxSuppression::default();

        let rect = BoundingRect::from_center(0.0, 0.0, 1.0, 1.0);
        let a = Detection::new(0.7, rect, Vec::new());
        let b = Detection::new(0.9, BoundingRect::from_center(5.0, 0.0, 1.0, 1.0), Vec::new());

        let detections = nms.process(vec![a.clone(), b.clone()]);
        assert_eq!(detections, [b, a]);
    }

    #[test]
    fn nma_averages_detections() {
        let nms = NonMaxSuppression::new(0.0, SuppressionMode::Average);

        let rect = BoundingRect::from_center(-1.0, 3.0, 1.0, 1.0);
        let a = Detection::new(1.0, rect, vec![[0.0, 0.0]]);
        let b = Detection::new(0.5, rect.scale(4.0), vec![[3.0, -3.0]]);
        let detections = nms.process(vec![a, b]);
        assert_eq!(detections.len(), 1);

        let d = &detections[0];
        let rect = d.bounding_rect();
        assert_eq!(d.confidence(), 1.0);
        assert_eq!(rect.x_center(), -1.0);
        assert_eq!(rect.y_center(), 3.0);
        assert_eq!(rect.width(), 2.0);
        assert_eq!(rect.height(), 2.0);
        assert_eq!(d.keypoints, [[1.0, -1.0]]);
    }

    #[test]
    fn empty_input() {
        assert!(NonMaxSuppression::default().process(Vec::new()).is_empty());
    }
}
