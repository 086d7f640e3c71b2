//! Hand skeleton rendering.
//!
//! The letter classifier is trained on drawings of the hand skeleton rather than on camera images,
//! so the pipeline renders the detected keypoints onto a black canvas before cropping.

use crate::{
    image::{draw, Color, Image, Resolution},
    keypoints::{Keypoints, CONNECTIVITY},
};

const BONE_COLOR: Color = Color::WHITE;
const BONE_THICKNESS: u32 = 2;
const JOINT_COLOR: Color = Color::RED;
const JOINT_RADIUS: u32 = 2;
const JOINT_THICKNESS: u32 = 2;

/// Renders `keypoints` as a hand skeleton on a black image of resolution `res`.
///
/// Bones are drawn as white lines. Joints are drawn as red circles with a white outline, on top of
/// the bones. Keypoints outside of the image are not drawn, and neither are the bones connected to
/// them.
pub fn render(res: Resolution, keypoints: &Keypoints) -> Image {
    let mut image = Image::filled(res, Color::BLACK);

    let pixel = |idx| keypoints.get(idx).and_then(|p| to_pixel(p, res));

    for &(a, b) in CONNECTIVITY {
        let (Some(a), Some(b)) = (pixel(a), pixel(b)) else {
            continue;
        };
        draw::line(&mut image, a, b)
            .color(BONE_COLOR)
            .stroke_width(BONE_THICKNESS);
    }

    let outline_radius = (JOINT_RADIUS + 1).max(JOINT_RADIUS * 6 / 5);
    for (x, y) in keypoints.points().iter().filter_map(|&p| to_pixel(p, res)) {
        draw::circle(&mut image, x, y, outline_radius)
            .color(Color::WHITE)
            .stroke_width(JOINT_THICKNESS);
        draw::circle(&mut image, x, y, JOINT_RADIUS)
            .color(JOINT_COLOR)
            .stroke_width(JOINT_THICKNESS);
    }

    image
}

/// Maps an image fraction to the pixel containing it, or `None` if it lies outside the image.
fn to_pixel([x, y]: [f32; 2], res: Resolution) -> Option<(i32, i32)> {
    if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
        return None;
    }
    let px = ((x * res.width() as f32).floor() as i32).min(res.width() as i32 - 1);
    let py = ((y * res.height() as f32).floor() as i32).min(res.height() as i32 - 1);
    Some((px, py))
}
