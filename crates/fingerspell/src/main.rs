use std::{
    collections::VecDeque,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use fingerspell::{
    classify::LetterClassifier,
    config::{CanvasSource, PipelineConfig, PADDING, PRESENCE_THRESHOLD, WINDOW},
    detection::PalmDetector,
    image::Image,
    locate::LandmarkLocator,
    message::Prediction,
    pipeline::{FramePipeline, FrameResult},
    session::{PromiseHandle, Session},
};

/// Frames kept in flight between reading and printing.
const QUEUE: usize = 2;

/// Recognizes fingerspelled letters in a sequence of image files.
///
/// The images are treated as consecutive frames of one video stream. One JSON prediction is
/// printed per image.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Letter classifier (ONNX).
    #[arg(long, env = "FINGERSPELL_MODEL")]
    model: PathBuf,

    /// MediaPipe palm detection network (ONNX).
    #[arg(long, env = "FINGERSPELL_PALM_MODEL")]
    palm_model: PathBuf,

    /// MediaPipe hand landmark network (ONNX).
    #[arg(long, env = "FINGERSPELL_LANDMARK_MODEL")]
    landmark_model: PathBuf,

    /// Margin around the hand, in pixels.
    #[arg(long, default_value_t = PADDING)]
    padding: u32,

    /// Number of frames the predicted letter is smoothed over.
    #[arg(long, default_value_t = WINDOW)]
    window: usize,

    /// Minimum palm detection confidence.
    #[arg(long, default_value_t = PalmDetector::DEFAULT_THRESHOLD)]
    palm_threshold: f32,

    /// Minimum hand presence score. Below it, the hand is searched from scratch.
    #[arg(long, default_value_t = PRESENCE_THRESHOLD)]
    presence_threshold: f32,

    /// What to classify.
    #[arg(long, value_enum, default_value_t = Source::Skeleton)]
    source: Source,

    /// Attach a JPEG thumbnail of the classified canvas to every prediction.
    #[arg(long)]
    thumbnail: bool,

    /// Image files, in frame order.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    /// The rendered hand skeleton.
    Skeleton,
    /// The camera frame itself.
    Frame,
}

impl From<Source> for CanvasSource {
    fn from(source: Source) -> Self {
        match source {
            Source::Skeleton => CanvasSource::Skeleton,
            Source::Frame => CanvasSource::Frame,
        }
    }
}

fn main() -> anyhow::Result<()> {
    fingerspell::init_logger!();

    let args = Args::parse();
    if args.window == 0 {
        bail!("`--window` must be at least 1");
    }

    let model = LetterClassifier::load(&args.model)
        .with_context(|| format!("failed to load '{}'", args.model.display()))?;
    let palm = PalmDetector::load(&args.palm_model)
        .with_context(|| format!("failed to load '{}'", args.palm_model.display()))?
        .with_threshold(args.palm_threshold);
    let locator = LandmarkLocator::load(palm, &args.landmark_model)
        .with_context(|| format!("failed to load '{}'", args.landmark_model.display()))?
        .with_presence_threshold(args.presence_threshold);

    let config = PipelineConfig::default()
        .with_padding(args.padding)
        .with_window(args.window)
        .with_source(args.source.into());
    let pipeline = FramePipeline::new(locator, model, config);
    let mut session = Session::spawn("session", pipeline, QUEUE)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut pending = VecDeque::with_capacity(QUEUE + 1);
    for path in &args.images {
        let image = Image::load(path)?;
        pending.push_back(session.submit(image));
        if pending.len() > QUEUE {
            if let Some(handle) = pending.pop_front() {
                print(&mut out, handle, args.thumbnail)?;
            }
        }
    }
    for handle in pending {
        print(&mut out, handle, args.thumbnail)?;
    }

    Ok(())
}

fn print<W: Write>(
    out: &mut W,
    handle: PromiseHandle<anyhow::Result<FrameResult>>,
    thumbnail: bool,
) -> anyhow::Result<()> {
    let result = handle.block()??;
    let prediction = Prediction::from_result(&result, thumbnail)?;
    serde_json::to_writer(&mut *out, &prediction)?;
    writeln!(out)?;
    Ok(())
}
