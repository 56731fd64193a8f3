//! Cancellable delayed tasks.
//!
//! A `TaskScope` owns a cancellation token. Work scheduled with
//! `spawn_after` runs once the delay elapses unless the scope, or any
//! parent scope, is cancelled first. Dropping a scope cancels it, so a
//! screen that owns a scope cannot receive callbacks after it goes away.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug)]
pub struct TaskScope {
    name: String,
    token: CancellationToken,
}

impl TaskScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: CancellationToken::new(),
        }
    }

    /// A scope cancelled together with this one (but not the other way round)
    pub fn child(&self, name: impl Into<String>) -> TaskScope {
        TaskScope {
            name: name.into(),
            token: self.token.child_token(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!(scope = %self.name, "Cancelling task scope");
        }
        self.token.cancel();
    }

    /// Run `task` after `delay`. Returns `true` from the handle if it ran,
    /// `false` if the scope was cancelled before the delay elapsed.
    pub fn spawn_after<F>(&self, delay: Duration, task: F) -> JoinHandle<bool>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        let scope = self.name.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(scope = %scope, "Delayed task cancelled");
                    false
                }
                _ = tokio::time::sleep(delay) => {
                    // Cancellation may race the timer; re-check before running
                    if token.is_cancelled() {
                        return false;
                    }
                    task.await;
                    true
                }
            }
        })
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
