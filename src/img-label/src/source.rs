use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use image::DynamicImage;
use log::{debug, warn};
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::timer::Timer;

const OBJECT_SCHEME: &str = "blob:img-label/";

/// Temporary reference to uploaded bytes held in an [`ObjectStore`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectUrl(u64);

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", OBJECT_SCHEME, self.0)
    }
}

/// Uploaded image bytes addressed by one-shot object references.
#[derive(Default)]
pub struct ObjectStore {
    next: u64,
    objects: HashMap<u64, Vec<u8>>,
}

impl ObjectStore {
    /// Stores `bytes` under a reference never handed out before.
    pub fn create(&mut self, bytes: Vec<u8>) -> ObjectUrl {
        let id = self.next;
        self.next += 1;
        self.objects.insert(id, bytes);
        ObjectUrl(id)
    }

    pub fn get(&self, url: &ObjectUrl) -> Result<&[u8]> {
        self.objects
            .get(&url.0)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::ObjectRevoked(url.to_string()))
    }

    /// Frees the bytes behind `url`. Returns false if already released.
    pub fn revoke(&mut self, url: &ObjectUrl) -> bool {
        self.objects.remove(&url.0).is_some()
    }

    pub fn is_live(&self, url: &ObjectUrl) -> bool {
        self.objects.contains_key(&url.0)
    }

    /// Number of references not yet released
    pub fn live(&self) -> usize {
        self.objects.len()
    }
}

/// What the displayed image was set from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageRef {
    Url(String),
    Object(ObjectUrl),
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRef::Url(url) => f.write_str(url),
            ImageRef::Object(object) => object.fmt(f),
        }
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The image region of the page: its current source and, once loaded,
/// the decoded image.
pub struct ImageView {
    source: Option<ImageRef>,
    image: Option<Arc<DynamicImage>>,
    objects: ObjectStore,
    client: reqwest::Client,
}

impl Default for ImageView {
    fn default() -> Self {
        ImageView::new(reqwest::Client::new())
    }
}

impl ImageView {
    pub fn new(client: reqwest::Client) -> Self {
        ImageView {
            source: None,
            image: None,
            objects: ObjectStore::default(),
            client,
        }
    }

    pub fn source(&self) -> Option<&ImageRef> {
        self.source.as_ref()
    }

    /// The decoded image, `None` before any load or after a failed one.
    pub fn image(&self) -> Option<Arc<DynamicImage>> {
        self.image.clone()
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    /// Shows an uploaded file. The object reference is released as soon as
    /// the load finishes, whether or not the bytes decoded.
    pub async fn upload(&mut self, bytes: Vec<u8>) -> Result<ObjectUrl> {
        let object = self.objects.create(bytes);
        debug!("Created {} for uploaded file", object);

        self.source = Some(ImageRef::Object(object.clone()));
        let loaded = self.load().await;

        if self.objects.revoke(&object) {
            debug!("Released {}", object);
        }

        loaded.map(|_| object)
    }

    /// Shows the image at `url`. `None` (cancelled entry) leaves the view
    /// untouched and returns `Ok(false)`.
    pub async fn set_url(&mut self, url: Option<String>) -> Result<bool> {
        let url = match url {
            Some(url) => url,
            None => return Ok(false),
        };

        self.source = Some(ImageRef::Url(url));
        self.load().await.map(|_| true)
    }

    async fn load(&mut self) -> Result<()> {
        self.image = None;

        let decoded = match &self.source {
            None => return Err(Error::NoImage),
            Some(ImageRef::Object(object)) => decode(self.objects.get(object)?),
            Some(ImageRef::Url(url)) => {
                let bytes = fetch(&self.client, url).await?;
                decode(&bytes)
            }
        };

        match decoded {
            Ok(image) => {
                self.image = Some(Arc::new(image));
                Ok(())
            }
            Err(err) => {
                if let Some(source) = &self.source {
                    warn!("Broken image {}: {}", source, err);
                }
                Err(err)
            }
        }
    }
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let mut t = Timer::new_start(&format!("Fetching image from {}", url));

    let resp = client.get(url).send().await?.error_for_status()?;
    let bytes = resp.bytes().await?;

    t.stop();

    Ok(bytes.to_vec())
}

fn decode(data: &[u8]) -> Result<DynamicImage> {
    let mut t = Timer::new_start("Load image from memory");
    let image = image::load_from_memory(data)?;
    t.stop();

    Ok(image)
}
