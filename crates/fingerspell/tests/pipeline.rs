use approx::assert_relative_eq;
use fingerspell::{
    alphabet::Letter,
    classify::ClassModel,
    config::{CanvasSource, PipelineConfig},
    image::{Color, Image, Rect, Resolution},
    keypoints::Keypoints,
    locate::{FixedLocator, HandLocator, Tracking},
    message::Prediction,
    normalize::crop_box,
    pipeline::{FramePipeline, FrameResult},
    session::Session,
};

/// Finds a hand in the middle of every frame that is not black.
struct ColorLocator;

impl HandLocator for ColorLocator {
    fn locate(&self, image: &Image, _: &mut Tracking) -> anyhow::Result<Option<Keypoints>> {
        if center(image) == Color::BLACK {
            return Ok(None);
        }
        Ok(Some(Keypoints::new(vec![[0.4, 0.4], [0.6, 0.45], [0.5, 0.6]])))
    }
}

/// Recognizes red canvases as `A`, blue ones as `B` and everything else as `C`.
struct ColorModel;

const PEAK: f32 = 3.0;

impl ClassModel for ColorModel {
    fn predict(&self, canvas: &Image) -> anyhow::Result<Vec<f32>> {
        let letter = match center(canvas) {
            Color::RED => Letter::A,
            Color::BLUE => Letter::B,
            _ => Letter::C,
        };
        let mut logits = vec![0.0; Letter::COUNT];
        logits[letter.index()] = PEAK;
        Ok(logits)
    }
}

fn center(image: &Image) -> Color {
    image.get(image.width() / 2, image.height() / 2)
}

fn frame(color: Color) -> Image {
    Image::filled(Resolution::new(200, 200), color)
}

fn frame_pipeline() -> FramePipeline {
    FramePipeline::new(
        ColorLocator,
        ColorModel,
        PipelineConfig::default().with_source(CanvasSource::Frame),
    )
}

fn peak_probability() -> f32 {
    let e = PEAK.exp();
    e / (e + (Letter::COUNT - 1) as f32)
}

/// A 10x10 pixel hand with its top left corner at `(x, y)`.
fn small_hand(res: Resolution, x: u32, y: u32) -> Keypoints {
    Keypoints::from_pixels(
        res,
        [
            [x as f32 + 0.5, y as f32 + 0.5],
            [x as f32 + 10.5, y as f32 + 4.5],
            [x as f32 + 3.5, y as f32 + 10.5],
        ],
    )
}

#[test]
fn crop_is_clamped_near_corner() {
    let res = Resolution::new(200, 200);
    let rect = crop_box(res, &small_hand(res, 5, 8), 60).unwrap();
    assert_eq!(rect, Rect::from_bounds(0, 0, 75, 78));
}

#[test]
fn crop_is_clamped_near_edge() {
    let res = Resolution::new(200, 200);
    let rect = crop_box(res, &small_hand(res, 185, 100), 60).unwrap();
    assert_eq!(rect, Rect::from_bounds(125, 40, 200, 170));

    for _ in 0..100 {
        let (x, y) = (fastrand::u32(0..190), fastrand::u32(0..190));
        let rect = crop_box(res, &small_hand(res, x, y), 60).unwrap();
        assert!(res.rect().contains_rect(&rect), "{:?}", rect);
        assert_eq!(rect.x(), x.saturating_sub(60) as i32);
        assert_eq!(rect.x_end(), i64::from((x + 70).min(200)));
    }
}

#[test]
fn edge_crop_is_letterboxed() {
    let res = Resolution::new(200, 200);
    let hand = small_hand(res, 185, 100);
    let pipeline = FramePipeline::new(
        FixedLocator::new(hand),
        ColorModel,
        PipelineConfig::default().with_source(CanvasSource::Frame),
    );

    let result = pipeline
        .process(&frame(Color::RED), &mut pipeline.stream())
        .unwrap();
    let canvas = &result.detection().unwrap().canvas;
    assert_eq!(canvas.resolution(), Resolution::square(400));
    // A 75x130 crop is scaled to 231x400 and centered horizontally.
    assert_eq!(canvas.get(10, 200), Color::BLACK);
    assert_eq!(canvas.get(390, 200), Color::BLACK);
    assert_eq!(canvas.get(200, 10), Color::RED);
    assert_eq!(canvas.get(200, 390), Color::RED);
}

#[test]
fn misses_do_not_touch_history() {
    let pipeline = frame_pipeline();
    let mut stream = pipeline.stream();

    let colors = [
        Color::RED,
        Color::RED,
        Color::BLACK,
        Color::BLACK,
        Color::BLACK,
        Color::BLUE,
        Color::BLUE,
        Color::BLUE,
    ];
    let labels = colors
        .into_iter()
        .map(|c| {
            let result = pipeline.process(&frame(c), &mut stream).unwrap();
            result.detection().map(|d| d.label)
        })
        .collect::<Vec<_>>();

    use Letter::*;
    assert_eq!(
        labels,
        [
            Some(A),
            Some(A),
            None,
            None,
            None,
            Some(A),
            Some(A),
            Some(B)
        ]
    );
    assert_eq!(stream.smoother().len(), 5);
}

#[test]
fn label_is_smoothed_confidence_is_not() {
    let pipeline = frame_pipeline();
    let mut stream = pipeline.stream();
    pipeline.process(&frame(Color::RED), &mut stream).unwrap();
    pipeline.process(&frame(Color::RED), &mut stream).unwrap();

    let result = pipeline.process(&frame(Color::BLUE), &mut stream).unwrap();
    let detection = result.detection().unwrap();
    assert_eq!(detection.label, Letter::A);
    assert_eq!(detection.top_k.top().letter, Letter::B);
    assert_relative_eq!(detection.confidence, peak_probability(), epsilon = 1e-6);

    let prediction = Prediction::from_result(&result, false).unwrap();
    assert_eq!(prediction.class, "A");
    assert_relative_eq!(prediction.confidence, peak_probability(), epsilon = 1e-6);
}

#[test]
fn degenerate_region_is_a_miss() {
    let res = Resolution::new(200, 200);
    // Entirely to the right of the frame, further than the padding reaches.
    let outside = Keypoints::new(vec![[1.5, 0.5], [1.6, 0.6]]);
    assert_eq!(crop_box(res, &outside, 60), None);

    for source in [CanvasSource::Skeleton, CanvasSource::Frame] {
        let pipeline = FramePipeline::new(
            FixedLocator::new(outside.clone()),
            ColorModel,
            PipelineConfig::default().with_source(source),
        );
        let mut stream = pipeline.stream();
        let result = pipeline.process(&frame(Color::RED), &mut stream).unwrap();
        assert!(matches!(result, FrameResult::NoDetection));
        assert!(stream.smoother().is_empty());

        let json = serde_json::to_string(&Prediction::from_result(&result, true).unwrap()).unwrap();
        assert_eq!(json, r#"{"class":"No Hand Detected","confidence":0.0}"#);
    }
}

#[test]
fn sessions_share_models_not_history() {
    let pipeline = frame_pipeline();
    let mut red = Session::spawn("red", pipeline.clone(), 1).unwrap();
    let mut blue = Session::spawn("blue", pipeline, 1).unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        handles.push((Letter::A, red.submit(frame(Color::RED))));
        handles.push((Letter::B, blue.submit(frame(Color::BLUE))));
    }
    for (expected, handle) in handles {
        let result = handle.block().unwrap().unwrap();
        assert_eq!(result.detection().unwrap().label, expected);
    }
}

#[test]
fn skeleton_source_classifies_rendering() {
    let pipeline = FramePipeline::new(ColorLocator, ColorModel, PipelineConfig::default());
    let result = pipeline
        .process(&frame(Color::RED), &mut pipeline.stream())
        .unwrap();
    // The skeleton is drawn on black, so the camera frame's color never reaches the model.
    assert_ne!(result.detection().unwrap().top_k.top().letter, Letter::A);
}
