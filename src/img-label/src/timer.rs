use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

/// Measures one named step of the page and logs how long it took.
pub struct Timer {
    step: String,
    started: Option<DateTime<Utc>>,
}

impl Timer {
    pub fn new(step: &str) -> Self {
        Timer {
            step: step.to_owned(),
            started: None,
        }
    }

    pub fn new_start(step: &str) -> Self {
        let mut t = Timer::new(step);
        t.start();
        t
    }

    pub fn start(&mut self) {
        debug!("{}: starting", self.step);
        self.started = Some(Utc::now());
    }

    /// Ends the step, logging and returning its duration. `None` if the
    /// timer was not running.
    pub fn stop(&mut self) -> Option<Duration> {
        let elapsed = Utc::now() - self.started.take()?;
        info!("{} duration: {} msec", self.step, elapsed.num_milliseconds());
        Some(elapsed)
    }
}
