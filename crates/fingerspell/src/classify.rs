//! Letter classification.

use std::{fmt, path::Path};

use itertools::Itertools;

use crate::{
    alphabet::Letter,
    config::MODEL_INPUT_SIZE,
    image::{Image, Resolution},
    nn::{Cnn, CnnInputShape, ColorMapper, NeuralNetwork},
};

/// A model that scores a normalized hand canvas.
///
/// Implementations must be usable from several threads at once; [`ClassModel::predict`] takes
/// `&self` and may not rely on per-call mutable state.
pub trait ClassModel: Send + Sync {
    /// Computes one raw (unnormalized) score per [`Letter`], in [`Letter::ALL`] order.
    fn predict(&self, canvas: &Image) -> anyhow::Result<Vec<f32>>;
}

impl<M: ClassModel + ?Sized> ClassModel for std::sync::Arc<M> {
    fn predict(&self, canvas: &Image) -> anyhow::Result<Vec<f32>> {
        (**self).predict(canvas)
    }
}

impl<M: ClassModel + ?Sized> ClassModel for Box<M> {
    fn predict(&self, canvas: &Image) -> anyhow::Result<Vec<f32>> {
        (**self).predict(canvas)
    }
}

/// The letter classifier CNN, running on `tract`.
///
/// The network takes a `[1, 3, 128, 128]` RGB input with intensities in `-1.0..=1.0` and produces
/// 26 raw scores.
#[derive(Debug, Clone)]
pub struct LetterClassifier {
    cnn: Cnn,
}

impl LetterClassifier {
    /// Loads the classifier from an ONNX file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let nn = NeuralNetwork::from_path(path)?.load()?;
        log::debug!("loaded letter classifier from '{}'", path.display());
        Self::new(nn)
    }

    pub fn new(nn: NeuralNetwork) -> anyhow::Result<Self> {
        if nn.num_outputs() == 0 {
            anyhow::bail!("letter classifier has no outputs");
        }

        let cnn = Cnn::new(nn, CnnInputShape::NCHW, ColorMapper::linear(-1.0..=1.0))?;
        let expected = Resolution::square(MODEL_INPUT_SIZE);
        if cnn.input_resolution() != expected {
            log::warn!(
                "letter classifier takes {} inputs, expected {}; canvases will be resampled",
                cnn.input_resolution(),
                expected,
            );
        }
        Ok(Self { cnn })
    }
}

impl ClassModel for LetterClassifier {
    fn predict(&self, canvas: &Image) -> anyhow::Result<Vec<f32>> {
        let outputs = self.cnn.estimate(canvas)?;
        Ok(outputs[0].view().to_vec())
    }
}

/// A letter and the probability the classifier assigned to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub letter: Letter,
    pub confidence: f32,
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.2}", self.letter, self.confidence)
    }
}

/// The highest-scoring letters of a frame, in descending order of confidence.
///
/// Confidences come from a probability distribution over the whole alphabet, so they usually do
/// not sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct TopK {
    scores: Vec<Score>,
}

impl TopK {
    /// Returns the highest-scoring letter.
    #[inline]
    pub fn top(&self) -> Score {
        self.scores[0]
    }

    #[inline]
    pub fn scores(&self) -> &[Score] {
        &self.scores
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.scores.len()
    }
}

/// Converts raw scores into probabilities.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp = logits.iter().map(|&l| (l - max).exp()).collect::<Vec<_>>();
    let sum: f32 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

/// Selects the `k` most probable letters.
///
/// Letters with equal probability are ordered by their position in the alphabet. If `k` exceeds
/// the number of letters, every letter is returned.
///
/// # Panics
///
/// Panics if `k` is 0 or if `probabilities` does not contain exactly [`Letter::COUNT`] values.
pub fn top_k(probabilities: &[f32], k: usize) -> TopK {
    assert!(k > 0, "top-k must be at least 1");
    assert_eq!(probabilities.len(), Letter::COUNT);

    let scores = probabilities
        .iter()
        .enumerate()
        .filter_map(|(i, &confidence)| {
            Letter::from_index(i).map(|letter| Score { letter, confidence })
        })
        .sorted_by(|a, b| b.confidence.total_cmp(&a.confidence))
        .take(k)
        .collect();
    TopK { scores }
}

/// Scores `canvas` with `model` and returns the `k` most probable letters.
///
/// Returns an error if the model fails or does not produce exactly one finite score per letter.
pub fn classify(canvas: &Image, model: &dyn ClassModel, k: usize) -> anyhow::Result<TopK> {
    let logits = model.predict(canvas)?;
    if logits.len() != Letter::COUNT {
        anyhow::bail!(
            "classifier produced {} scores, expected {}",
            logits.len(),
            Letter::COUNT
        );
    }
    if let Some(bad) = logits.iter().find(|l| !l.is_finite()) {
        anyhow::bail!("classifier produced non-finite score {}", bad);
    }

    let top = top_k(&softmax(&logits), k);
    log::trace!("top-{}: {}", k, top.scores().iter().join(", "));
    Ok(top)
}
