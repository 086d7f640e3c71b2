//! Fingerspelling recognition.
//!
//! This crate recognizes a single hand sign of the fingerspelling alphabet (`A` to `Z`) per video
//! frame. Every frame goes through the same [`pipeline::FramePipeline`]:
//!
//! 1. A [`locate::HandLocator`] finds at most one hand and returns its [`keypoints::Keypoints`].
//!    The hand is searched for with a palm detector ([`detection`]) and then tracked from one
//!    frame to the next using the previous frame's landmarks.
//! 2. The keypoints are rendered as a skeleton on a black canvas ([`skeleton`]).
//! 3. The region around the hand is cropped, resized and letterboxed onto a square canvas
//!    ([`normalize`]).
//! 4. A [`classify::ClassModel`] scores the canvas, and the top 3 letters are extracted.
//! 5. The top letter is smoothed over the last few frames of the stream ([`filter::mode`]).
//!
//! The state carried between frames (smoothing window and tracked hand region) lives in a
//! [`pipeline::Stream`]. Streams of frames from one client are processed by a
//! [`session::Session`], which owns its stream and keeps frames in submission order.
//!
//! # Environment Variables
//!
//! * `RUST_LOG`: overrides the log filter installed by [`init_logger!`].
//! * `FINGERSPELL_MODEL`, `FINGERSPELL_PALM_MODEL`, `FINGERSPELL_LANDMARK_MODEL`: default model
//!   paths used by the `fingerspell` binary.

use log::LevelFilter;

pub mod alphabet;
pub mod classify;
pub mod config;
pub mod detection;
pub mod filter;
pub mod keypoints;
pub mod locate;
pub mod message;
pub mod nn;
pub mod normalize;
pub mod pipeline;
pub mod session;
pub mod skeleton;
pub mod timer;

pub use fingerspell_image as image;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .filter(Some("tract_core"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and `fingerspell` log at *debug* level, `tract` only logs warnings. The
/// filter can be overridden with the `RUST_LOG` environment variable.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
