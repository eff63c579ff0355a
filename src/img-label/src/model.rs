use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One candidate label for an image
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Human readable class name
    #[serde(rename = "className")]
    pub label: String,

    /// Probability in [0, 1]
    pub probability: f32,
}

impl Prediction {
    pub fn new(label: &str, probability: f32) -> Self {
        Prediction {
            label: label.to_owned(),
            probability,
        }
    }
}

/// A loaded, ready-to-use classification model.
///
/// `classify` may block for the duration of inference; callers on an async
/// runtime run it on a blocking thread.
pub trait Model: Send + Sync {
    /// Candidate labels for `image`, most probable first.
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>>;
}

/// Produces the model handle. Called at most once per page.
pub trait ModelLoader: Send + 'static {
    fn load(self: Box<Self>) -> Result<Arc<dyn Model>>;
}

impl<F> ModelLoader for F
where
    F: FnOnce() -> Result<Arc<dyn Model>> + Send + 'static,
{
    fn load(self: Box<Self>) -> Result<Arc<dyn Model>> {
        (*self)()
    }
}

/// Sorts by descending probability, NaN last.
pub fn sort_predictions(predictions: &mut [Prediction]) {
    predictions.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or_else(|| a.probability.is_nan().cmp(&b.probability.is_nan()))
    });
}

/// The most probable entry, independent of the order the model returned.
/// On a tie the earliest entry wins.
pub fn top_prediction(predictions: &[Prediction]) -> Option<&Prediction> {
    predictions
        .iter()
        .filter(|p| !p.probability.is_nan())
        .fold(None, |best: Option<&Prediction>, p| match best {
            Some(b) if p.probability <= b.probability => Some(b),
            _ => Some(p),
        })
}
