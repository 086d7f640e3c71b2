//! The per-frame recognition pipeline.

use std::{borrow::Cow, sync::Arc};

use anyhow::Context;

use crate::{
    alphabet::Letter,
    classify::{classify, ClassModel, TopK},
    config::{CanvasSource, PipelineConfig},
    filter::{Filter, ModeFilter},
    image::Image,
    locate::{HandLocator, Tracking},
    normalize::normalize,
    skeleton,
    timer::Timer,
};

/// The outcome of processing one frame.
#[derive(Debug, Clone)]
pub enum FrameResult {
    /// No usable hand was found in the frame.
    NoDetection,
    Detection(Detection),
}

impl FrameResult {
    pub fn detection(&self) -> Option<&Detection> {
        match self {
            FrameResult::NoDetection => None,
            FrameResult::Detection(d) => Some(d),
        }
    }
}

/// A recognized hand sign.
#[derive(Debug, Clone)]
pub struct Detection {
    /// The stabilized letter: the most frequent top-1 letter of the recent frames.
    pub label: Letter,
    /// Confidence of this frame's top-1 letter (which may differ from `label`).
    pub confidence: f32,
    /// This frame's most probable letters.
    pub top_k: TopK,
    /// The normalized canvas that was classified.
    pub canvas: Image,
}

/// The temporal state of one frame stream.
///
/// Holds the stream's smoothing window and the hand region tracked from frame to frame. Created by
/// [`FramePipeline::stream`] and owned by whoever feeds the pipeline.
#[derive(Debug, Clone)]
pub struct Stream {
    smoother: ModeFilter<Letter>,
    tracking: Tracking,
}

impl Stream {
    /// Returns the window of recent top-1 letters.
    #[inline]
    pub fn smoother(&self) -> &ModeFilter<Letter> {
        &self.smoother
    }

    #[inline]
    pub fn tracking(&self) -> &Tracking {
        &self.tracking
    }

    /// Forgets the smoothing history and the tracked hand, as if the stream was restarted.
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.tracking.lose();
    }
}

/// Locates, normalizes and classifies hands in video frames.
///
/// The pipeline only holds read-only handles to its models and can be shared between threads. The
/// temporal state of a frame stream lives in a separate [`Stream`] owned by whoever feeds the
/// pipeline. Cloning a pipeline is cheap and yields a pipeline with fresh timers.
#[derive(Clone)]
pub struct FramePipeline {
    locator: Arc<dyn HandLocator>,
    model: Arc<dyn ClassModel>,
    config: PipelineConfig,
    t_locate: Timer,
    t_render: Timer,
    t_normalize: Timer,
    t_classify: Timer,
}

impl FramePipeline {
    pub fn new<L, M>(locator: L, model: M, config: PipelineConfig) -> Self
    where
        L: HandLocator + 'static,
        M: ClassModel + 'static,
    {
        Self {
            locator: Arc::new(locator),
            model: Arc::new(model),
            config,
            t_locate: Timer::new("locate"),
            t_render: Timer::new("render"),
            t_normalize: Timer::new("normalize"),
            t_classify: Timer::new("classify"),
        }
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Creates the state of a new stream, with an empty smoother sized according to the pipeline
    /// configuration.
    pub fn stream(&self) -> Stream {
        Stream {
            smoother: ModeFilter::new(self.config.window()),
            tracking: Tracking::new(),
        }
    }

    /// Returns profiling timers for the pipeline stages.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [
            &self.t_locate,
            &self.t_render,
            &self.t_normalize,
            &self.t_classify,
        ]
        .into_iter()
    }

    /// Processes a single frame of a stream.
    ///
    /// Frames without a hand, or whose hand region is empty after clamping it to the frame, yield
    /// [`FrameResult::NoDetection`] and leave the stream's smoother untouched. Otherwise the top-1
    /// letter is pushed into the smoother, and the returned [`Detection`] carries the smoothed
    /// label.
    ///
    /// Errors from the locator or the classifier are returned as-is.
    pub fn process(&self, image: &Image, stream: &mut Stream) -> anyhow::Result<FrameResult> {
        let keypoints = self
            .t_locate
            .time(|| self.locator.locate(image, &mut stream.tracking))
            .context("hand locator failed")?;
        let Some(keypoints) = keypoints else {
            log::debug!("no hand detected");
            return Ok(FrameResult::NoDetection);
        };

        let source = match self.config.source() {
            CanvasSource::Skeleton => Cow::Owned(
                self.t_render
                    .time(|| skeleton::render(image.resolution(), &keypoints)),
            ),
            CanvasSource::Frame => Cow::Borrowed(image),
        };

        let canvas = match self.t_normalize.time(|| {
            normalize(
                &source,
                &keypoints,
                self.config.padding(),
                self.config.canvas_size(),
            )
        }) {
            Ok(canvas) => canvas,
            Err(e) => {
                log::debug!("dropping frame: {}", e);
                return Ok(FrameResult::NoDetection);
            }
        };

        let top_k = self
            .t_classify
            .time(|| classify(&canvas, &*self.model, self.config.top_k()))
            .context("letter classification failed")?;
        let top = top_k.top();
        let label = stream.smoother.push(top.letter);
        log::trace!("{} -> {} ({:.2})", top.letter, label, top.confidence);

        Ok(FrameResult::Detection(Detection {
            label,
            confidence: top.confidence,
            top_k,
            canvas,
        }))
    }
}
