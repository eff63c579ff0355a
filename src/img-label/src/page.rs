use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::locale::{Language, Message};
use crate::model::{top_prediction, ModelLoader, Prediction};
use crate::prompt::Prompt;
use crate::readiness::{LoadGuard, ModelHandle, Readiness};
use crate::source::{ImageRef, ImageView, ObjectUrl};
use crate::status::Status;
use crate::timer::Timer;

/// One classification page: a model, the displayed image and the status
/// line underneath it.
pub struct Page {
    language: Language,
    fallback_label: String,
    model: ModelHandle,
    view: ImageView,
    status: Arc<watch::Sender<Status>>,
}

/// Point-in-time view of a page, as reported to clients.
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub readiness: Readiness,
    pub status: String,
    pub source: Option<ImageRef>,
    /// Inference time of the label currently shown
    pub classify_millis: Option<i64>,
}

impl Page {
    pub fn new(config: &Config) -> Self {
        Page::with_view(config, ImageView::default())
    }

    pub fn with_view(config: &Config, view: ImageView) -> Self {
        let (status, _rx) = watch::channel(Status::Idle);

        Page {
            language: config.language,
            fallback_label: config.fallback_label.clone(),
            model: ModelHandle::new(),
            view,
            status: Arc::new(status),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn readiness(&self) -> Readiness {
        self.model.readiness()
    }

    pub fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    /// The status region as shown to the user
    pub fn status_text(&self) -> String {
        self.status.borrow().render(self.language)
    }

    pub fn source(&self) -> Option<&ImageRef> {
        self.view.source()
    }

    pub fn view(&self) -> &ImageView {
        &self.view
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            readiness: self.readiness(),
            status: self.status_text(),
            source: self.source().cloned(),
            classify_millis: match &*self.status.borrow() {
                Status::Label { millis, .. } => Some(*millis),
                _ => None,
            },
        }
    }

    /// Starts loading the model in the background; the status line follows
    /// the load. A page that already started loading is left as it is.
    pub fn start(&self, loader: Box<dyn ModelLoader>) -> JoinHandle<Readiness> {
        match self.model.claim() {
            Some(guard) => {
                let status = self.status.clone();
                status.send_replace(Status::Loading);
                tokio::spawn(async move { load_and_report(guard, status, loader).await })
            }
            None => {
                let readiness = self.readiness();
                tokio::spawn(async move { readiness })
            }
        }
    }

    /// Loads the model and waits for the outcome.
    pub async fn load(&self, loader: Box<dyn ModelLoader>) -> Readiness {
        match self.model.claim() {
            Some(guard) => {
                self.status.send_replace(Status::Loading);
                load_and_report(guard, self.status.clone(), loader).await
            }
            None => self.readiness(),
        }
    }

    /// Shows the bytes of a user-selected file.
    pub async fn upload(&mut self, bytes: Vec<u8>) -> Result<ObjectUrl> {
        let res = self.view.upload(bytes).await;
        self.report(res)
    }

    /// Asks for a URL and shows it. A cancelled prompt changes nothing.
    pub async fn enter_url(&mut self, prompt: &mut dyn Prompt) -> Result<bool> {
        let url = prompt.prompt(self.language.text(Message::EnterUrl));
        self.set_url(url).await
    }

    pub async fn set_url(&mut self, url: Option<String>) -> Result<bool> {
        if url.is_none() {
            debug!("URL entry cancelled");
        }

        let res = self.view.set_url(url).await;
        self.report(res)
    }

    /// Classifies the displayed image and puts its top label in the status
    /// line. Waits if the model is still loading.
    pub async fn classify(&self) -> Result<Prediction> {
        let res = self.classify_displayed().await;
        let res = self.report(res);

        res.map(|(prediction, millis)| {
            info!("Classified {:?} as {:?}", self.source(), prediction);
            self.status.send_replace(Status::Label {
                prediction: prediction.clone(),
                millis,
            });
            prediction
        })
    }

    async fn classify_displayed(&self) -> Result<(Prediction, i64)> {
        let image = self.view.image().ok_or(Error::NoImage)?;
        let model = self.model.ready().await?;

        let mut t = Timer::new_start("Classifying image");
        let predictions = tokio::task::spawn_blocking(move || model.classify(&image))
            .await
            .map_err(|err| Error::Classification(err.to_string()))??;
        let millis = t.stop().map_or(0, |d| d.num_milliseconds());

        debug!("Model returned {} candidates", predictions.len());

        let top = match top_prediction(&predictions) {
            Some(top) => top.clone(),
            None => Prediction::new(&self.fallback_label, 0.0),
        };
        Ok((top, millis))
    }

    fn report<T>(&self, res: Result<T>) -> Result<T> {
        if let Err(err) = &res {
            self.status.send_replace(Status::failure(err));
        }
        res
    }
}

async fn load_and_report(
    guard: LoadGuard,
    status: Arc<watch::Sender<Status>>,
    loader: Box<dyn ModelLoader>,
) -> Readiness {
    let readiness = guard.run(loader).await;

    match &readiness {
        Readiness::Ready => {
            status.send_replace(Status::Loaded);
        }
        Readiness::Failed(reason) => {
            status.send_replace(Status::failure(&Error::ModelLoad(reason.clone())));
        }
        _ => {}
    }

    readiness
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::testing::{failing_loader, gated_loader, png_bytes, StubModel};
    use std::sync::atomic::Ordering;

    fn page(language: Language) -> Page {
        Page::new(&Config {
            language,
            ..Config::default()
        })
    }

    fn cats() -> Vec<Prediction> {
        vec![
            Prediction::new("Persian cat", 0.8734),
            Prediction::new("tabby", 0.05),
        ]
    }

    #[tokio::test]
    async fn classifies_uploaded_image() {
        let mut page = page(Language::Ru);
        assert_eq!(page.load(StubModel::loader(cats())).await, Readiness::Ready);
        assert_eq!(page.status_text(), "Модель загружена.");

        page.upload(png_bytes(8, 8)).await.unwrap();
        let top = page.classify().await.unwrap();

        assert_eq!(top.label, "Persian cat");
        assert_eq!(page.status_text(), "Persian cat: 87.34%");
    }

    #[tokio::test]
    async fn tie_keeps_the_models_first_choice() {
        let mut page = page(Language::En);
        let tie = vec![Prediction::new("Persian cat", 0.5), Prediction::new("tabby", 0.5)];
        page.load(StubModel::loader(tie)).await;
        page.upload(png_bytes(1, 1)).await.unwrap();

        page.classify().await.unwrap();
        assert_eq!(page.status_text(), "Persian cat: 50.00%");
        assert!(page.snapshot().classify_millis.is_some());
    }

    #[tokio::test]
    async fn reloading_a_ready_page_keeps_the_label() {
        let mut page = page(Language::En);
        page.load(StubModel::loader(cats())).await;
        page.upload(png_bytes(1, 1)).await.unwrap();
        page.classify().await.unwrap();

        assert_eq!(page.load(StubModel::loader(vec![])).await, Readiness::Ready);
        assert_eq!(page.start(StubModel::loader(vec![])).await.unwrap(), Readiness::Ready);
        assert_eq!(page.status_text(), "Persian cat: 87.34%");
    }

    #[tokio::test]
    async fn picks_max_probability_regardless_of_order() {
        let mut page = page(Language::En);
        let mut reversed = cats();
        reversed.reverse();
        page.load(StubModel::loader(reversed)).await;
        page.upload(png_bytes(1, 1)).await.unwrap();

        page.classify().await.unwrap();
        assert_eq!(page.status_text(), "Persian cat: 87.34%");
    }

    #[tokio::test]
    async fn empty_result_uses_fallback_label() {
        let mut page = page(Language::En);
        page.load(StubModel::loader(vec![])).await;
        page.upload(png_bytes(1, 1)).await.unwrap();

        let top = page.classify().await.unwrap();
        assert_eq!(top, Prediction::new("unknown", 0.0));
        assert_eq!(page.status_text(), "unknown: 0.00%");
    }

    #[tokio::test]
    async fn classify_without_image_is_visible_error() {
        let page = page(Language::En);
        page.load(StubModel::loader(cats())).await;

        assert!(matches!(page.classify().await, Err(Error::NoImage)));
        assert_eq!(page.status_text(), "No image selected: no image to classify");
    }

    #[tokio::test]
    async fn classify_before_load_is_rejected() {
        let mut page = page(Language::En);
        page.upload(png_bytes(1, 1)).await.unwrap();

        assert!(matches!(page.classify().await, Err(Error::NotLoaded)));
        assert!(page.status().is_error());
    }

    #[tokio::test]
    async fn failed_load_shows_error_and_blocks_classify() {
        let mut page = page(Language::En);
        page.upload(png_bytes(1, 1)).await.unwrap();

        let readiness = page.start(failing_loader("no saved model")).await.unwrap();
        assert!(matches!(readiness, Readiness::Failed(_)));
        assert!(page.status_text().starts_with("Failed to load model"));

        assert!(matches!(page.classify().await, Err(Error::ModelLoad(_))));
    }

    #[tokio::test]
    async fn classify_waits_for_background_load() {
        let mut page = page(Language::En);
        page.upload(png_bytes(1, 1)).await.unwrap();

        let (loader, release) = gated_loader(StubModel::new(cats()));
        let load = page.start(loader);
        assert_eq!(page.status(), Status::Loading);

        while page.readiness() != Readiness::Loading {
            tokio::task::yield_now().await;
        }
        release.send(()).unwrap();

        let top = page.classify().await.unwrap();
        assert_eq!(top.label, "Persian cat");
        assert_eq!(load.await.unwrap(), Readiness::Ready);
    }

    #[tokio::test]
    async fn cancelled_url_entry_changes_nothing() {
        let mut page = page(Language::Ru);
        let object = page.upload(png_bytes(1, 1)).await.unwrap();

        let mut asked = None;
        let mut cancel = |message: &str| -> Option<String> {
            asked = Some(message.to_owned());
            None
        };
        assert!(!page.enter_url(&mut cancel).await.unwrap());

        assert_eq!(asked.as_deref(), Some("Введите URL изображения"));
        assert_eq!(page.source(), Some(&ImageRef::Object(object)));
        assert_eq!(page.status(), Status::Idle);
    }

    #[tokio::test]
    async fn entered_url_is_used_verbatim() {
        let mut page = page(Language::En);
        let mut enter = |_: &str| Some("::bad url::".to_owned());

        assert!(page.enter_url(&mut enter).await.is_err());
        assert_eq!(page.source(), Some(&ImageRef::Url("::bad url::".to_owned())));
        assert!(page.status_text().starts_with("Failed to load image"));
        assert!(page.view().image().is_none());
    }

    #[tokio::test]
    async fn model_is_called_once_per_classify() {
        let model = Arc::new(StubModel::new(cats()));
        let loader = {
            let model: Arc<dyn Model> = model.clone();
            move || -> Result<Arc<dyn Model>> { Ok(model) }
        };

        let mut page = page(Language::En);
        page.load(Box::new(loader)).await;
        page.upload(png_bytes(1, 1)).await.unwrap();
        page.classify().await.unwrap();
        page.classify().await.unwrap();

        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }
}
