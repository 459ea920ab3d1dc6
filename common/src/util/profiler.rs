use std::time::{Duration, Instant};

/// Logs the lifetime of a scope at `debug` level, or hands the elapsed time
/// back to the caller through [`ScopedTimer::finish`].
pub struct ScopedTimer {
    name: &'static str,
    start: Instant,
    finished: bool,
}

impl ScopedTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
            finished: false,
        }
    }

    pub fn finish(mut self) -> Duration {
        self.finished = true;
        let elapsed = self.start.elapsed();
        log::info!("{} took {:?}", self.name, elapsed);
        elapsed
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        if !self.finished {
            log::debug!("{} took {:?}", self.name, self.start.elapsed());
        }
    }
}
