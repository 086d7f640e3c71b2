//! Hand localization.
//!
//! A [`HandLocator`] finds at most one hand in a frame and returns its keypoints. Not finding a
//! hand is a normal outcome and is reported as `Ok(None)`; errors are reserved for failures of the
//! detector itself.

use std::path::Path;

use anyhow::Context;

use crate::{
    config::{PRESENCE_THRESHOLD, ROI_PADDING},
    detection::{BoundingRect, PalmDetector},
    image::{AspectRatio, Color, Image, Rect, Resolution},
    keypoints::{Keypoints, NUM_KEYPOINTS},
    nn::{Cnn, CnnInputShape, ColorMapper, NeuralNetwork, Outputs},
    normalize::{letterbox, Letterbox},
};

/// Regions larger than this multiple of the frame's longer side are not searched.
const MAX_ROI_SCALE: u32 = 4;

/// Hand region carried over between consecutive frames of one stream.
///
/// Locators that follow a hand from frame to frame keep their state here instead of in
/// themselves, so that one locator can serve any number of streams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tracking {
    roi: Option<Rect>,
}

impl Tracking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the region the hand is expected in on the next frame, if it is being tracked.
    #[inline]
    pub fn roi(&self) -> Option<Rect> {
        self.roi
    }

    pub fn set_roi(&mut self, roi: Rect) {
        self.roi = Some(roi);
    }

    /// Forgets the tracked region. The next frame is searched from scratch.
    pub fn lose(&mut self) {
        self.roi = None;
    }
}

/// Finds a single hand in an image.
pub trait HandLocator: Send + Sync {
    /// Returns the keypoints of the hand in `image`, or `None` if there is no hand.
    ///
    /// `tracking` belongs to the stream `image` is a frame of.
    fn locate(&self, image: &Image, tracking: &mut Tracking)
        -> anyhow::Result<Option<Keypoints>>;
}

impl<L: HandLocator + ?Sized> HandLocator for Box<L> {
    fn locate(
        &self,
        image: &Image,
        tracking: &mut Tracking,
    ) -> anyhow::Result<Option<Keypoints>> {
        (**self).locate(image, tracking)
    }
}

/// Locates hands with the MediaPipe palm detection and hand landmark networks.
///
/// When no hand is tracked, the palm detector searches the whole frame and the region around the
/// most confident palm is cut out for the landmark network. On the following frames, the region is
/// derived from the previous frame's landmarks instead, and palm detection is skipped until the
/// landmark network's presence score drops below the threshold.
#[derive(Debug, Clone)]
pub struct LandmarkLocator {
    palm: PalmDetector,
    cnn: Cnn,
    presence_threshold: f32,
}

impl LandmarkLocator {
    /// Loads the hand landmark network from an ONNX file.
    pub fn load<P: AsRef<Path>>(palm: PalmDetector, landmark_model: P) -> anyhow::Result<Self> {
        let path = landmark_model.as_ref();
        // Only the screen landmarks and the hand presence flag are needed.
        let nn = NeuralNetwork::from_path(path)?
            .with_output_selection([0, 1])
            .load()?;
        log::debug!("loaded hand landmark network from '{}'", path.display());
        Self::new(palm, nn)
    }

    /// Creates a locator from a palm detector and a loaded landmark network.
    ///
    /// The network's first output must be the `[1, 63]` screen landmark tensor and its second
    /// output the `[1, 1]` hand presence score.
    pub fn new(palm: PalmDetector, nn: NeuralNetwork) -> anyhow::Result<Self> {
        if nn.num_outputs() < 2 {
            anyhow::bail!(
                "hand landmark network must have at least 2 outputs, this one has {}",
                nn.num_outputs()
            );
        }

        let cnn = Cnn::new(nn, CnnInputShape::NCHW, ColorMapper::linear(0.0..=1.0))?;
        if cnn.input_resolution().aspect_ratio() != Some(AspectRatio::SQUARE) {
            anyhow::bail!(
                "hand landmark network input must be square, got {}",
                cnn.input_resolution()
            );
        }

        Ok(Self {
            palm,
            cnn,
            presence_threshold: PRESENCE_THRESHOLD,
        })
    }

    /// Sets the minimum presence score for an estimate to count as a detected hand.
    ///
    /// Tracking is lost on frames whose score is below this threshold.
    pub fn with_presence_threshold(self, threshold: f32) -> Self {
        Self {
            presence_threshold: threshold,
            ..self
        }
    }

    /// Returns the region around the most confident palm in `image`.
    fn find_hand(&self, image: &Image) -> anyhow::Result<Option<Rect>> {
        let palms = self.palm.detect(image)?;
        let Some(palm) = palms.first() else {
            return Ok(None);
        };
        log::trace!(
            "palm at {:?}, {:.2} rad (confidence {:.2})",
            palm.bounding_rect(),
            palm.angle(),
            palm.confidence()
        );
        Ok(palm.hand_region().to_rect())
    }
}

impl HandLocator for LandmarkLocator {
    fn locate(
        &self,
        image: &Image,
        tracking: &mut Tracking,
    ) -> anyhow::Result<Option<Keypoints>> {
        track_hand(
            image,
            tracking,
            self.cnn.input_resolution().width(),
            self.presence_threshold,
            |image| self.find_hand(image),
            |canvas| self.cnn.estimate(canvas),
        )
    }
}

/// Runs one frame of the detect-or-track loop.
///
/// `find_hand` is only called when `tracking` has no region. `estimate` runs the landmark network
/// on a canvas of side `input_size`.
fn track_hand<D, E>(
    image: &Image,
    tracking: &mut Tracking,
    input_size: u32,
    presence_threshold: f32,
    find_hand: D,
    estimate: E,
) -> anyhow::Result<Option<Keypoints>>
where
    D: FnOnce(&Image) -> anyhow::Result<Option<Rect>>,
    E: FnOnce(&Image) -> anyhow::Result<Outputs>,
{
    let frame = image.resolution();
    let roi = match tracking.roi() {
        Some(roi) => roi,
        None => match find_hand(image)? {
            Some(roi) => roi,
            None => {
                log::trace!("no palm found");
                return Ok(None);
            }
        },
    };
    if !is_searchable(roi, frame) {
        log::trace!("hand region {:?} is unusable in {} frame", roi, frame);
        tracking.lose();
        return Ok(None);
    }

    let view = View::new(image, roi, input_size);
    let keypoints = estimate(view.canvas())
        .and_then(|outputs| extract_landmarks(&outputs, &view, frame, presence_threshold));
    let keypoints = match keypoints {
        Ok(keypoints) => keypoints,
        Err(e) => {
            tracking.lose();
            return Err(e);
        }
    };

    match keypoints.as_ref().and_then(|kp| tracking_region(kp, frame)) {
        Some(next) => tracking.set_roi(next),
        None => tracking.lose(),
    }
    Ok(keypoints)
}

fn is_searchable(roi: Rect, frame: Resolution) -> bool {
    let max = u64::from(frame.width().max(frame.height())) * u64::from(MAX_ROI_SCALE);
    roi.intersection(&frame.rect()).is_some()
        && u64::from(roi.width()) <= max
        && u64::from(roi.height()) <= max
}

/// A region of a frame, letterboxed to the landmark network's input.
///
/// Parts of the region outside of the frame are black.
struct View {
    roi: Rect,
    boxed: Letterbox,
}

impl View {
    fn new(image: &Image, roi: Rect, size: u32) -> Self {
        let region = if image.rect().contains_rect(&roi) {
            image.crop(roi)
        } else {
            let mut region =
                Image::filled(Resolution::new(roi.width(), roi.height()), Color::BLACK);
            region.paste(image, -i64::from(roi.x()), -i64::from(roi.y()));
            region
        };
        Self {
            roi,
            boxed: letterbox(&region, size),
        }
    }

    fn canvas(&self) -> &Image {
        self.boxed.canvas()
    }

    /// Maps network input pixel coordinates to frame pixel coordinates.
    fn to_frame(&self, x: f32, y: f32) -> [f32; 2] {
        let [x, y] = self.boxed.to_source(x, y);
        [x + self.roi.x() as f32, y + self.roi.y() as f32]
    }
}

/// Reads the hand keypoints out of the landmark network's outputs for `view`.
///
/// Returns `None` if the presence score is below `presence_threshold`, and an error if the outputs
/// are malformed or the landmarks are not finite.
fn extract_landmarks(
    outputs: &Outputs,
    view: &View,
    frame: Resolution,
    presence_threshold: f32,
) -> anyhow::Result<Option<Keypoints>> {
    if outputs.len() < 2 {
        anyhow::bail!("expected 2 hand landmark outputs, got {}", outputs.len());
    }
    let screen_landmarks = &outputs[0];
    let presence_flag = &outputs[1];
    if screen_landmarks.shape() != [1, NUM_KEYPOINTS * 3] || presence_flag.shape() != [1, 1] {
        anyhow::bail!(
            "unexpected hand landmark output shapes {:?} and {:?}",
            screen_landmarks.shape(),
            presence_flag.shape()
        );
    }

    let presence = presence_flag.index([0, 0]).as_singular();
    if presence.is_nan() || presence < presence_threshold {
        log::trace!("no hand (presence={:.2})", presence);
        return Ok(None);
    }

    // Landmarks are in network input pixels; Z is ignored.
    let (w, h) = (frame.width() as f32, frame.height() as f32);
    let points = screen_landmarks
        .index([0])
        .to_vec()
        .chunks_exact(3)
        .map(|xyz| {
            let [x, y] = view.to_frame(xyz[0], xyz[1]);
            [x / w, y / h]
        })
        .collect();
    let keypoints =
        Keypoints::try_new(points).context("hand landmark network produced invalid landmarks")?;
    Ok(Some(keypoints))
}

/// Computes the region to search for the hand on the next frame: the square around the
/// keypoints' bounding box, grown by [`ROI_PADDING`] on every side.
fn tracking_region(keypoints: &Keypoints, frame: Resolution) -> Option<Rect> {
    let (w, h) = (frame.width() as f32, frame.height() as f32);
    let (mut x_min, mut y_min) = (f32::INFINITY, f32::INFINITY);
    let (mut x_max, mut y_max) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for &[x, y] in keypoints.points() {
        x_min = x_min.min(x * w);
        x_max = x_max.max(x * w);
        y_min = y_min.min(y * h);
        y_max = y_max.max(y * h);
    }

    let side = (x_max - x_min).max(y_max - y_min);
    BoundingRect::from_center((x_min + x_max) / 2.0, (y_min + y_max) / 2.0, side, side)
        .scale(1.0 + 2.0 * ROI_PADDING)
        .to_rect()
}

/// A [`HandLocator`] that reports the same result for every frame.
///
/// Useful for replaying recorded keypoints and for testing.
#[derive(Debug, Clone, Default)]
pub struct FixedLocator {
    keypoints: Option<Keypoints>,
}

impl FixedLocator {
    /// Creates a locator that always finds a hand at `keypoints`.
    pub fn new(keypoints: Keypoints) -> Self {
        Self {
            keypoints: Some(keypoints),
        }
    }

    /// Creates a locator that never finds a hand.
    pub fn none() -> Self {
        Self { keypoints: None }
    }
}

impl HandLocator for FixedLocator {
    fn locate(
        &self,
        _image: &Image,
        _tracking: &mut Tracking,
    ) -> anyhow::Result<Option<Keypoints>> {
        Ok(self.keypoints.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use approx::assert_abs_diff_eq;

    use crate::nn::tensor::Tensor;

    use super::*;

    /// Side of the fake landmark network's input.
    const INPUT: u32 = 10;

    /// Landmark network outputs with the wrist at `wrist`, every other landmark at `rest`, both in
    /// network input pixels.
    fn outputs(wrist: [f32; 2], rest: [f32; 2], presence: f32) -> Outputs {
        let landmarks = (0..NUM_KEYPOINTS).flat_map(|i| {
            let [x, y] = if i == 0 { wrist } else { rest };
            [x, y, 0.0]
        });
        [
            Tensor::from_iter(&[1, NUM_KEYPOINTS * 3], landmarks),
            Tensor::from_iter(&[1, 1], [presence]),
        ]
        .into_iter()
        .collect()
    }

    /// A 200x100 frame with a 100x100 hand region in its center, 10x smaller on the network input.
    fn view() -> (Image, View) {
        let image = Image::new(200, 100);
        let view = View::new(&image, Rect::from_top_left(50, 0, 100, 100), INPUT);
        (image, view)
    }

    #[test]
    fn fixed_locator() {
        let image = Image::new(8, 8);
        let mut tracking = Tracking::new();
        assert_eq!(FixedLocator::none().locate(&image, &mut tracking).unwrap(), None);

        let kp = Keypoints::new(vec![[0.25, 0.75]]);
        let locator: Box<dyn HandLocator> = Box::new(FixedLocator::new(kp.clone()));
        assert_eq!(locator.locate(&image, &mut tracking).unwrap(), Some(kp));
        assert_eq!(tracking, Tracking::new());
    }

    #[test]
    fn landmarks_map_to_frame_fractions() {
        let (image, view) = view();
        let out = outputs([5.0, 5.0], [0.0, 0.0], 0.9);
        let kp = extract_landmarks(&out, &view, image.resolution(), 0.5)
            .unwrap()
            .unwrap();
        assert_eq!(kp.len(), NUM_KEYPOINTS);
        assert_abs_diff_eq!(kp.points()[0][0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(kp.points()[0][1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(kp.points()[1][0], 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(kp.points()[1][1], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn low_presence_is_no_hand() {
        let (image, view) = view();
        let res = image.resolution();
        let out = outputs([5.0, 5.0], [0.0, 0.0], 0.49);
        assert_eq!(extract_landmarks(&out, &view, res, 0.5).unwrap(), None);

        let out = outputs([5.0, 5.0], [0.0, 0.0], f32::NAN);
        assert_eq!(extract_landmarks(&out, &view, res, 0.5).unwrap(), None);

        // The threshold itself counts as present.
        let out = outputs([5.0, 5.0], [0.0, 0.0], 0.5);
        assert!(extract_landmarks(&out, &view, res, 0.5).unwrap().is_some());
    }

    #[test]
    fn malformed_outputs_are_errors() {
        let (image, view) = view();
        let res = image.resolution();
        let presence = Tensor::from_iter(&[1, 1], [1.0]);

        let missing: Outputs = [presence.clone()].into_iter().collect();
        assert!(extract_landmarks(&missing, &view, res, 0.5).is_err());

        let short = Tensor::from_iter(&[1, 60], [0.0; 60]);
        let out: Outputs = [short, presence.clone()].into_iter().collect();
        assert!(extract_landmarks(&out, &view, res, 0.5).is_err());

        let world = Tensor::from_iter(&[1, 21, 3], [0.0; 63]);
        let out: Outputs = [world, presence].into_iter().collect();
        assert!(extract_landmarks(&out, &view, res, 0.5).is_err());

        let out = outputs([f32::INFINITY, 5.0], [0.0, 0.0], 0.9);
        let err = extract_landmarks(&out, &view, res, 0.5).unwrap_err();
        assert!(format!("{:#}", err).contains("non-finite"), "{:#}", err);
    }

    #[test]
    fn view_pads_outside_of_frame() {
        let image = Image::filled(Resolution::new(40, 40), Color::WHITE);
        // The left half of the region lies outside of the frame.
        let view = View::new(&image, Rect::from_top_left(-20, 0, 40, 40), INPUT);
        assert_eq!(view.canvas().resolution(), Resolution::square(INPUT));
        assert_eq!(view.canvas().get(1, 5), Color::BLACK);
        assert_eq!(view.canvas().get(8, 5), Color::WHITE);

        let [x, y] = view.to_frame(5.0, 5.0);
        assert_abs_diff_eq!(x, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(y, 20.0, epsilon = 1e-4);
    }

    #[test]
    fn tracking_region_surrounds_keypoints() {
        let res = Resolution::new(200, 100);
        let kp = Keypoints::from_pixels(res, [[70.0, 20.0], [130.0, 60.0], [100.0, 40.0]]);
        let roi = tracking_region(&kp, res).unwrap();
        // A 60x60 square around (100, 40), grown to 96x96.
        assert!(roi.contains_rect(&Rect::from_bounds(53, -7, 147, 87)), "{:?}", roi);
        assert!(Rect::from_bounds(51, -9, 149, 89).contains_rect(&roi), "{:?}", roi);
    }

    #[test]
    fn unsearchable_regions() {
        let res = Resolution::new(200, 100);
        assert!(is_searchable(Rect::from_top_left(-50, -50, 100, 100), res));
        assert!(!is_searchable(Rect::from_top_left(200, 0, 50, 50), res));
        assert!(!is_searchable(Rect::from_top_left(-400, -400, 1000, 1000), res));
    }

    #[test]
    fn detection_seeds_tracking() {
        let image = Image::new(200, 100);
        let mut tracking = Tracking::new();
        let searches = Cell::new(0);
        let find_hand = |_: &Image| {
            searches.set(searches.get() + 1);
            Ok(Some(Rect::from_top_left(50, 0, 100, 100)))
        };

        // Landmarks at (70, 20) and (130, 60) in frame pixels.
        let hand = |_: &Image| Ok(outputs([2.0, 2.0], [8.0, 6.0], 0.9));
        let kp = track_hand(&image, &mut tracking, INPUT, 0.5, find_hand, hand)
            .unwrap()
            .unwrap();
        assert_eq!(searches.get(), 1);
        assert_abs_diff_eq!(kp.points()[0][0], 0.35, epsilon = 1e-6);
        assert_abs_diff_eq!(kp.points()[1][1], 0.6, epsilon = 1e-6);
        let roi = tracking.roi().unwrap();
        assert_eq!(Some(roi), tracking_region(&kp, image.resolution()));

        // The next frame reuses the region instead of searching.
        let seen = Cell::new(None);
        let hand = |canvas: &Image| {
            seen.set(Some(canvas.resolution()));
            Ok(outputs([2.0, 2.0], [8.0, 6.0], 0.9))
        };
        track_hand(&image, &mut tracking, INPUT, 0.5, find_hand, hand)
            .unwrap()
            .unwrap();
        assert_eq!(searches.get(), 1);
        assert_eq!(seen.get(), Some(Resolution::square(INPUT)));
        assert!(tracking.roi().is_some());

        // Losing the hand clears the region, so the frame after that searches again.
        let gone = |_: &Image| Ok(outputs([2.0, 2.0], [8.0, 6.0], 0.1));
        let none = track_hand(&image, &mut tracking, INPUT, 0.5, find_hand, gone).unwrap();
        assert_eq!(none, None);
        assert_eq!(searches.get(), 1);
        assert_eq!(tracking.roi(), None);

        track_hand(&image, &mut tracking, INPUT, 0.5, find_hand, hand).unwrap();
        assert_eq!(searches.get(), 2);
    }

    #[test]
    fn no_palm_means_no_hand() {
        let image = Image::new(64, 64);
        let mut tracking = Tracking::new();
        let result = track_hand(
            &image,
            &mut tracking,
            INPUT,
            0.5,
            |_| Ok(None),
            |_| -> anyhow::Result<Outputs> { panic!("landmarks estimated without a palm") },
        );
        assert_eq!(result.unwrap(), None);
        assert_eq!(tracking.roi(), None);
    }

    #[test]
    fn errors_lose_tracking() {
        let image = Image::new(64, 64);
        let mut tracking = Tracking::new();
        tracking.set_roi(Rect::from_top_left(0, 0, 32, 32));
        let result = track_hand(
            &image,
            &mut tracking,
            INPUT,
            0.5,
            |_| Ok(None),
            |_| anyhow::bail!("inference failed"),
        );
        assert!(result.is_err());
        assert_eq!(tracking.roi(), None);
    }
}
