use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Time-based ids: the current epoch milliseconds, bumped past the last
/// issued value so ids stay strictly increasing within a process.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return candidate.to_string(),
                Err(actual) => last = actual,
            }
        }
    }

    /// Next id not rejected by `taken`
    pub fn next_unique(&self, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = self.next();
            if !taken(&id) {
                return id;
            }
        }
    }
}
