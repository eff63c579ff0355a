//! Stand-ins for the model library used by the unit tests.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

use image::{DynamicImage, ImageOutputFormat};

use crate::error::{Error, Result};
use crate::model::{Model, ModelLoader, Prediction};

pub struct StubModel {
    predictions: Vec<Prediction>,
    pub calls: AtomicUsize,
}

impl StubModel {
    pub fn new(predictions: Vec<Prediction>) -> Self {
        StubModel {
            predictions,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn loader(predictions: Vec<Prediction>) -> Box<dyn ModelLoader> {
        Box::new(move || -> Result<Arc<dyn Model>> { Ok(Arc::new(StubModel::new(predictions))) })
    }
}

impl Model for StubModel {
    fn classify(&self, _image: &DynamicImage) -> Result<Vec<Prediction>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.predictions.clone())
    }
}

pub fn failing_loader(reason: &'static str) -> Box<dyn ModelLoader> {
    Box::new(move || -> Result<Arc<dyn Model>> { Err(Error::ModelLoad(reason.to_owned())) })
}

/// A loader that blocks until the returned sender fires.
pub fn gated_loader(model: StubModel) -> (Box<dyn ModelLoader>, mpsc::Sender<()>) {
    let (tx, rx) = mpsc::channel();
    let loader = move || -> Result<Arc<dyn Model>> {
        let _ = rx.recv();
        Ok(Arc::new(model))
    };
    (Box::new(loader), tx)
}

/// A small encoded PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .unwrap();
    buf
}
