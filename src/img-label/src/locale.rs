use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language of the status text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ru,
    En,
}

impl Default for Language {
    fn default() -> Self {
        Language::Ru
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ru" => Ok(Language::Ru),
            "en" => Ok(Language::En),
            other => Err(format!("unsupported language '{}', expected ru or en", other)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Ru => f.write_str("ru"),
            Language::En => f.write_str("en"),
        }
    }
}

/// Fixed pieces of status text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Message {
    Idle,
    LoadingModel,
    ModelLoaded,
    ModelFailed,
    ModelNotLoaded,
    NoImage,
    ImageFailed,
    ClassifyFailed,
    EnterUrl,
}

impl Language {
    pub fn text(self, message: Message) -> &'static str {
        use Message::*;

        match (self, message) {
            (Language::Ru, Idle) => "",
            (Language::Ru, LoadingModel) => "Загрузка модели...",
            (Language::Ru, ModelLoaded) => "Модель загружена.",
            (Language::Ru, ModelFailed) => "Не удалось загрузить модель",
            (Language::Ru, ModelNotLoaded) => "Модель не загружена",
            (Language::Ru, NoImage) => "Изображение не выбрано",
            (Language::Ru, ImageFailed) => "Не удалось загрузить изображение",
            (Language::Ru, ClassifyFailed) => "Не удалось распознать изображение",
            (Language::Ru, EnterUrl) => "Введите URL изображения",

            (Language::En, Idle) => "",
            (Language::En, LoadingModel) => "Loading model...",
            (Language::En, ModelLoaded) => "Model loaded.",
            (Language::En, ModelFailed) => "Failed to load model",
            (Language::En, ModelNotLoaded) => "Model is not loaded",
            (Language::En, NoImage) => "No image selected",
            (Language::En, ImageFailed) => "Failed to load image",
            (Language::En, ClassifyFailed) => "Failed to classify image",
            (Language::En, EnterUrl) => "Enter image URL",
        }
    }
}
