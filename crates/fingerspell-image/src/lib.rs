//! Image handling for the fingerspell recognizer.
//!
//! # Overview
//!
//! ## Images
//!
//! [`Image`] is an owned, 8-bit RGB image. Frames coming in from a camera or transport are decoded
//! into an [`Image`], and every stage of the recognition pipeline (skeleton rendering, cropping,
//! letterboxing, thumbnail encoding) produces a new [`Image`] rather than mutating its input.
//!
//! ## Geometry
//!
//! [`Rect`] is an integer-valued, axis-aligned rectangle in pixel space. It is used to describe
//! hand bounding boxes and the placement of resized content on a canvas. [`Resolution`] and
//! [`AspectRatio`] describe image sizes.
//!
//! ## Drawing
//!
//! A few primitive drawing operations are available in the [`draw`] module. They are used to
//! render hand skeletons and are not meant to be exhaustive.

pub mod draw;
pub mod rect;

mod color;
mod image;
mod resolution;

#[cfg(test)]
mod tests;

pub use color::Color;
pub use self::image::*;
pub use rect::Rect;
pub use resolution::{AspectRatio, Resolution};
