use serde::Serialize;

use crate::error::Error;
use crate::locale::{Language, Message};
use crate::model::Prediction;

/// Contents of the page's status region.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Status {
    Idle,
    Loading,
    Loaded,
    Label { prediction: Prediction, millis: i64 },
    Error { message: Message, detail: String },
}

impl Status {
    /// Status for a failure, picking the message from the error kind.
    pub fn failure(err: &Error) -> Self {
        let message = match err {
            Error::ModelLoad(_) | Error::BackendUnavailable => Message::ModelFailed,
            Error::NotLoaded => Message::ModelNotLoaded,
            Error::NoImage => Message::NoImage,
            Error::ImageDecode(_) | Error::ImageFetch(_) | Error::ObjectRevoked(_) => {
                Message::ImageFailed
            }
            _ => Message::ClassifyFailed,
        };

        Status::Error {
            message,
            detail: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error { .. })
    }

    pub fn render(&self, language: Language) -> String {
        match self {
            Status::Idle => language.text(Message::Idle).to_owned(),
            Status::Loading => language.text(Message::LoadingModel).to_owned(),
            Status::Loaded => language.text(Message::ModelLoaded).to_owned(),
            Status::Label { prediction, .. } => format_label(prediction),
            Status::Error { message, detail } => {
                format!("{}: {}", language.text(*message), detail)
            }
        }
    }
}

/// `"<label>: <probability x 100, two decimals>%"`
pub fn format_label(prediction: &Prediction) -> String {
    format!(
        "{}: {:.2}%",
        prediction.label,
        f64::from(prediction.probability) * 100.0
    )
}
