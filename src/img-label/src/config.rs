use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::locale::Language;
use crate::model::{Model, ModelLoader};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Export directory of the TensorFlow SavedModel
    pub model_dir: PathBuf,

    /// One label per line, in model output order
    pub labels_path: PathBuf,

    /// Language of the status text
    pub language: Language,

    /// Label shown when the model returns no candidates
    pub fallback_label: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            model_dir: PathBuf::from("/opt/mobilenet"),
            labels_path: PathBuf::from("/opt/mobilenet/ImageNetLabels.txt"),
            language: Language::default(),
            fallback_label: "unknown".to_owned(),
        }
    }
}

impl Config {
    /// Reads a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Defaults, or the contents of `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Config::from_file(path),
            None => Ok(Config::default()),
        }
    }

    /// Loader for the model this config points at.
    pub fn model_loader(&self) -> Box<dyn ModelLoader> {
        #[cfg(feature = "tensorflow")]
        {
            let model_dir = self.model_dir.clone();
            let labels_path = self.labels_path.clone();
            Box::new(move || -> Result<Arc<dyn Model>> {
                Ok(Arc::new(crate::tf_model::TfModel::new(&model_dir, &labels_path)?))
            })
        }

        #[cfg(not(feature = "tensorflow"))]
        {
            Box::new(|| -> Result<Arc<dyn Model>> { Err(Error::BackendUnavailable) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"language": "en", "fallback_label": "???"}"#).unwrap();
        assert_eq!(config.language, Language::En);
        assert_eq!(config.fallback_label, "???");
        assert_eq!(config.model_dir, Config::default().model_dir);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{"modeldir": "/x"}"#).is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Config::load(Some(Path::new("/nonexistent/img-label.json"))).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }
}
