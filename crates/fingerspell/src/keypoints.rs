//! Hand keypoints.

use thiserror::Error;

use crate::image::Resolution;

/// Number of keypoints produced by the MediaPipe hand landmark model.
pub const NUM_KEYPOINTS: usize = 21;

/// An ordered set of 2D hand keypoints belonging to a single hand.
///
/// Coordinates are stored as fractions of the image size: `(0.0, 0.0)` is the top left corner of
/// the image and `(1.0, 1.0)` the bottom right corner. Detectors may place keypoints slightly
/// outside of this range when part of the hand is out of view.
#[derive(Debug, Clone, PartialEq)]
pub struct Keypoints {
    points: Vec<[f32; 2]>,
}

impl Keypoints {
    /// Creates a keypoint set from a list of `[x, y]` image fractions.
    ///
    /// # Panics
    ///
    /// Panics if `points` is empty or contains a coordinate that is infinite or NaN.
    pub fn new(points: Vec<[f32; 2]>) -> Self {
        match Self::try_new(points) {
            Ok(kp) => kp,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates a keypoint set from a list of `[x, y]` image fractions, rejecting empty lists and
    /// non-finite coordinates.
    pub fn try_new(points: Vec<[f32; 2]>) -> Result<Self, InvalidKeypoints> {
        if points.is_empty() {
            return Err(InvalidKeypoints::Empty);
        }
        if let Some(index) = points.iter().position(|p| !p.iter().all(|c| c.is_finite())) {
            return Err(InvalidKeypoints::NonFinite {
                index,
                point: points[index],
            });
        }
        Ok(Self { points })
    }

    /// Creates a keypoint set from pixel coordinates in an image of resolution `res`.
    pub fn from_pixels<I: IntoIterator<Item = [f32; 2]>>(res: Resolution, pixels: I) -> Self {
        let (w, h) = (res.width() as f32, res.height() as f32);
        Self::new(pixels.into_iter().map(|[x, y]| [x / w, y / h]).collect())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns the keypoints as `[x, y]` image fractions.
    #[inline]
    pub fn points(&self) -> &[[f32; 2]] {
        &self.points
    }

    /// Returns the keypoint identified by `idx`, if this set contains it.
    #[inline]
    pub fn get(&self, idx: KeypointIdx) -> Option<[f32; 2]> {
        self.points.get(idx as usize).copied()
    }

    /// Converts the keypoints to integer pixel coordinates in an image of resolution `res`.
    ///
    /// Coordinates are scaled by the image size and truncated towards zero.
    pub fn to_pixels(&self, res: Resolution) -> impl Iterator<Item = (i32, i32)> + '_ {
        let (w, h) = (f64::from(res.width()), f64::from(res.height()));
        self.points
            .iter()
            .map(move |&[x, y]| ((f64::from(x) * w) as i32, (f64::from(y) * h) as i32))
    }
}

/// Error returned by [`Keypoints::try_new`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidKeypoints {
    #[error("keypoint set must not be empty")]
    Empty,
    #[error("keypoint {index} has non-finite coordinates {point:?}")]
    NonFinite { index: usize, point: [f32; 2] },
}

/// Names for the hand keypoints.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This keypoint is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypointIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// The bones of the hand skeleton, as pairs of connected keypoints.
pub const CONNECTIVITY: &[(KeypointIdx, KeypointIdx)] = {
    use KeypointIdx::*;
    &[
        // Palm:
        (Wrist, ThumbCmc),
        (Wrist, IndexFingerMcp),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, PinkyMcp),
        (Wrist, PinkyMcp),
        // Thumb:
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        // Index:
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        // Middle:
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        // Ring:
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        // Pinky:
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ]
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_pixels_truncates() {
        let kp = Keypoints::new(vec![[0.5, 0.25], [0.999, 0.0], [-0.001, 1.0]]);
        let px = kp.to_pixels(Resolution::new(200, 100)).collect::<Vec<_>>();
        assert_eq!(px, [(100, 25), (199, 0), (0, 100)]);
    }

    #[test]
    fn from_pixels() {
        let res = Resolution::new(200, 100);
        let kp = Keypoints::from_pixels(res, [[50.5, 20.5]]);
        assert_eq!(kp.to_pixels(res).collect::<Vec<_>>(), [(50, 20)]);
    }

    #[test]
    fn connectivity_is_in_range() {
        assert_eq!(CONNECTIVITY.len(), 21);
        for (a, b) in CONNECTIVITY {
            assert!((*a as usize) < NUM_KEYPOINTS);
            assert!((*b as usize) < NUM_KEYPOINTS);
        }
    }

    #[test]
    #[should_panic]
    fn empty() {
        Keypoints::new(Vec::new());
    }

    #[test]
    fn non_finite_is_rejected() {
        assert_eq!(Keypoints::try_new(Vec::new()), Err(InvalidKeypoints::Empty));
        for bad in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
            let err = Keypoints::try_new(vec![[0.5, 0.5], [0.2, bad]]).unwrap_err();
            assert!(
                matches!(err, InvalidKeypoints::NonFinite { index: 1, .. }),
                "{:?}",
                err
            );
        }
        assert!(Keypoints::try_new(vec![[-3.0, 1e30]]).is_ok());
    }

    #[test]
    #[should_panic]
    fn new_panics_on_infinity() {
        Keypoints::new(vec![[f32::INFINITY, 0.5]]);
    }
}
