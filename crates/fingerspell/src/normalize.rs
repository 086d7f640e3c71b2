//! Cropping and letterboxing of hand regions.
//!
//! The classifier expects a square image in which the hand fills as much space as possible without
//! being distorted. [`normalize`] produces that image from a frame and the hand's keypoints:
//!
//! 1. The keypoints' bounding box is computed in pixel space ([`keypoint_bounds`]).
//! 2. The box is enlarged by a margin and clamped to the image ([`crop_box`]).
//! 3. The box is cropped out, scaled so that its longer side matches the canvas, and pasted into
//!    the center of a black square canvas ([`resize_and_pad`]).

use thiserror::Error;

use crate::{
    image::{Color, Image, Rect, ResizeFilter, Resolution},
    keypoints::Keypoints,
};

/// Error returned when the padded hand region does not cover any pixel of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("hand region is empty after clamping to the {image} image")]
pub struct DegenerateRegion {
    image: Resolution,
}

/// Computes the pixel-space bounding box of `keypoints` in an image of resolution `res`.
///
/// The returned rectangle is the smallest one containing every keypoint pixel, so its
/// [`Rect::x_end`] and [`Rect::y_end`] are one past the largest keypoint coordinates. It is not
/// clamped to the image.
pub fn keypoint_bounds(res: Resolution, keypoints: &Keypoints) -> Rect {
    match Rect::bounding(keypoints.to_pixels(res)) {
        Some(rect) => rect,
        None => unreachable!("keypoint sets are never empty"),
    }
}

/// Computes the region to crop for a hand.
///
/// The keypoint bounding box is extended by `padding` pixels to the left and top of the smallest
/// keypoint coordinates and to the right and bottom of the largest ones, then clamped to the image.
/// The region spans `x_min..x_max + padding` (exclusive end), matching how the classifier's
/// training crops were produced.
///
/// Returns `None` if the region does not contain any pixel of the image.
pub fn crop_box(res: Resolution, keypoints: &Keypoints, padding: u32) -> Option<Rect> {
    let bounds = keypoint_bounds(res, keypoints);
    let pad = i64::from(padding);
    let clamp = |v: i64| v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;

    let (x_max, y_max) = (bounds.x_end() - 1, bounds.y_end() - 1);
    let padded = Rect::from_bounds(
        clamp(i64::from(bounds.x()) - pad),
        clamp(i64::from(bounds.y()) - pad),
        clamp(x_max + pad),
        clamp(y_max + pad),
    );
    padded.intersection(&res.rect())
}

/// Scales `image` so that its longer side is `target_size` pixels, and centers it on a black
/// `target_size x target_size` canvas.
///
/// The aspect ratio of the content is preserved (up to rounding of the shorter side). An image
/// that already has the target size is returned unchanged.
///
/// # Panics
///
/// Panics if `image` has a width or height of 0.
pub fn resize_and_pad(image: &Image, target_size: u32) -> Image {
    letterbox(image, target_size).into_canvas()
}

/// A letterboxed image: content scaled to fit and centered on a square canvas.
#[derive(Debug, Clone)]
pub struct Letterbox {
    canvas: Image,
    content: Rect,
    source: Resolution,
}

impl Letterbox {
    #[inline]
    pub fn canvas(&self) -> &Image {
        &self.canvas
    }

    #[inline]
    pub fn into_canvas(self) -> Image {
        self.canvas
    }

    /// Returns the area of the canvas covered by the scaled content.
    #[inline]
    pub fn content(&self) -> Rect {
        self.content
    }

    /// Returns the factors that scale canvas distances to source image distances.
    pub fn source_scale(&self) -> [f32; 2] {
        [
            self.source.width() as f32 / self.content.width() as f32,
            self.source.height() as f32 / self.content.height() as f32,
        ]
    }

    /// Maps a canvas pixel position back to a pixel position in the source image.
    ///
    /// Positions on the black bars map to positions outside of the source image.
    pub fn to_source(&self, x: f32, y: f32) -> [f32; 2] {
        let [sx, sy] = self.source_scale();
        [
            (x - self.content.x() as f32) * sx,
            (y - self.content.y() as f32) * sy,
        ]
    }
}

/// Scales `image` to fit into a black square canvas of side `target_size` and centers it.
///
/// # Panics
///
/// Panics if `image` has a width or height of 0.
pub fn letterbox(image: &Image, target_size: u32) -> Letterbox {
    let Some(scaled) = image.resolution().scale_longer_side_to(target_size) else {
        panic!("cannot letterbox empty {:?}", image);
    };
    let resized = image.resize(scaled, ResizeFilter::Smooth);

    let x = (target_size - scaled.width()) / 2;
    let y = (target_size - scaled.height()) / 2;

    let mut canvas = Image::filled(Resolution::square(target_size), Color::BLACK);
    canvas.paste(&resized, i64::from(x), i64::from(y));
    Letterbox {
        canvas,
        content: Rect::from_top_left(x as i32, y as i32, scaled.width(), scaled.height()),
        source: image.resolution(),
    }
}

/// Crops the hand described by `keypoints` out of `image` and letterboxes it onto a square canvas
/// of side `target_size`.
///
/// Returns [`DegenerateRegion`] if the padded hand region is empty after clamping it to the image.
pub fn normalize(
    image: &Image,
    keypoints: &Keypoints,
    padding: u32,
    target_size: u32,
) -> Result<Image, DegenerateRegion> {
    let res = image.resolution();
    let rect = crop_box(res, keypoints, padding).ok_or(DegenerateRegion { image: res })?;
    log::trace!("hand crop: {:?}", rect);

    Ok(resize_and_pad(&image.crop(rect), target_size))
}
