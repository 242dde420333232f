use std::time::Duration;
use std::thread;
use rand::Rng;
use log::info;

/// Random pause between consecutive detail-page items. Zero-width range disables it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolitenessDelay {
    min_ms: u64,
    max_ms: u64,
}

impl PolitenessDelay {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        PolitenessDelay { min_ms, max_ms: max_ms.max(min_ms) }
    }

    pub fn is_disabled(&self) -> bool {
        self.max_ms == 0
    }

    pub fn pick(&self) -> Duration {
        if self.is_disabled() {
            return Duration::ZERO;
        }
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms))
    }

    pub fn wait(&self) {
        let delay = self.pick();
        if delay.is_zero() {
            return;
        }
        info!("Waiting for {} ms (Page Delay)...", delay.as_millis());
        thread::sleep(delay);
    }
}
