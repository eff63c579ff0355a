use std::fmt;
use std::sync::Arc;

use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::model::{Model, ModelLoader};
use crate::timer::Timer;

/// Observable lifecycle of the model handle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "reason")]
pub enum Readiness {
    Unloaded,
    Loading,
    Ready,
    Failed(String),
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Unloaded => write!(f, "unloaded"),
            Readiness::Loading => write!(f, "loading"),
            Readiness::Ready => write!(f, "ready"),
            Readiness::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Clone)]
enum State {
    Unloaded,
    Loading,
    Ready(Arc<dyn Model>),
    Failed(String),
}

impl State {
    fn readiness(&self) -> Readiness {
        match self {
            State::Unloaded => Readiness::Unloaded,
            State::Loading => Readiness::Loading,
            State::Ready(_) => Readiness::Ready,
            State::Failed(reason) => Readiness::Failed(reason.clone()),
        }
    }
}

/// Single-assignment slot for the model, with waiters.
///
/// Transitions are `Unloaded -> Loading -> Ready | Failed`; nothing moves
/// a handle out of `Ready` or `Failed`.
#[derive(Clone)]
pub struct ModelHandle {
    tx: Arc<watch::Sender<State>>,
}

impl Default for ModelHandle {
    fn default() -> Self {
        ModelHandle::new()
    }
}

impl ModelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(State::Unloaded);
        ModelHandle { tx: Arc::new(tx) }
    }

    pub fn readiness(&self) -> Readiness {
        self.tx.borrow().readiness()
    }

    /// Moves `Unloaded` to `Loading` and hands back the guard that must
    /// finish the load. `None` if some load already claimed the handle.
    pub fn claim(&self) -> Option<LoadGuard> {
        let claimed = self.tx.send_if_modified(|state| match state {
            State::Unloaded => {
                *state = State::Loading;
                true
            }
            _ => false,
        });

        if claimed {
            Some(LoadGuard {
                tx: self.tx.clone(),
                finished: false,
            })
        } else {
            None
        }
    }

    /// Loads the model on a blocking thread and waits for it.
    ///
    /// Only the first call does any work; later calls return the
    /// readiness of the existing handle.
    pub async fn load(&self, loader: Box<dyn ModelLoader>) -> Readiness {
        match self.claim() {
            Some(guard) => guard.run(loader).await,
            None => self.readiness(),
        }
    }

    /// Starts `load` in the background.
    pub fn spawn_load(&self, loader: Box<dyn ModelLoader>) -> tokio::task::JoinHandle<Readiness> {
        let handle = self.clone();
        tokio::spawn(async move { handle.load(loader).await })
    }

    /// The model, waiting out an in-flight load.
    pub async fn ready(&self) -> Result<Arc<dyn Model>> {
        let mut rx = self.tx.subscribe();
        loop {
            let state = rx.borrow_and_update().clone();
            match state {
                State::Ready(model) => return Ok(model),
                State::Failed(reason) => return Err(Error::ModelLoad(reason)),
                State::Unloaded => return Err(Error::NotLoaded),
                State::Loading => {}
            }
            // The sender lives in `self`, so the channel cannot close here.
            if rx.changed().await.is_err() {
                return Err(Error::NotLoaded);
            }
        }
    }
}

/// Exclusive right to resolve a `Loading` handle.
///
/// Dropping it before `run` completes marks the handle `Failed`, so waiters
/// in `ModelHandle::ready` never hang on an abandoned load.
pub struct LoadGuard {
    tx: Arc<watch::Sender<State>>,
    finished: bool,
}

impl LoadGuard {
    pub async fn run(mut self, loader: Box<dyn ModelLoader>) -> Readiness {
        info!("Loading model");
        let mut t = Timer::new_start("Loading model");

        let next = match tokio::task::spawn_blocking(move || loader.load()).await {
            Ok(Ok(model)) => State::Ready(model),
            Ok(Err(err)) => State::Failed(err.to_string()),
            Err(err) => State::Failed(format!("loader panicked: {}", err)),
        };

        t.stop();

        match &next {
            State::Ready(_) => info!("Successfully loaded model"),
            State::Failed(reason) => error!("Model load failed: {}", reason),
            _ => {}
        }

        self.finished = true;
        self.tx.send_replace(next);
        let readiness = self.tx.borrow().readiness();
        readiness
    }
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Model load abandoned");
            self.tx.send_replace(State::Failed("load cancelled".to_owned()));
        }
    }
}
