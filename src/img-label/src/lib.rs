//! A single image-classification page: load a pretrained model once, pick
//! an image from an uploaded file or a URL, and show the model's top label.

mod config;
mod error;
mod input;
mod locale;
mod model;
mod page;
mod prompt;
mod readiness;
mod source;
mod status;
mod timer;

#[cfg(feature = "tensorflow")]
mod tf_model;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};
pub use input::{image_to_input, read_labels, scores_to_predictions, INPUT_SIZE};
pub use locale::{Language, Message};
pub use model::{sort_predictions, top_prediction, Model, ModelLoader, Prediction};
pub use page::{Page, Snapshot};
pub use prompt::{LinePrompt, Prompt};
pub use readiness::{LoadGuard, ModelHandle, Readiness};
pub use source::{ImageRef, ImageView, ObjectStore, ObjectUrl};
pub use status::{format_label, Status};
pub use timer::Timer;

#[cfg(feature = "tensorflow")]
pub use tf_model::TfModel;
