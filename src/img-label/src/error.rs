use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("model failed to load: {0}")]
    ModelLoad(String),

    #[error("model load was never started")]
    NotLoaded,

    #[error("no model backend compiled in (enable the `tensorflow` feature)")]
    BackendUnavailable,

    #[error("could not read labels file: {0}")]
    Labels(#[source] std::io::Error),

    #[error("classification failed: {0}")]
    Classification(String),

    #[error("could not decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("could not fetch image: {0}")]
    ImageFetch(#[from] reqwest::Error),

    #[error("object reference {0} was already released")]
    ObjectRevoked(String),

    #[error("no image to classify")]
    NoImage,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

#[cfg(feature = "tensorflow")]
impl From<tensorflow::Status> for Error {
    fn from(status: tensorflow::Status) -> Self {
        Error::Classification(status.to_string())
    }
}
