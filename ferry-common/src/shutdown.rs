//! Process-wide shutdown coordination.
//!
//! A single [`ShutdownCoordinator`] owns the flag; any number of
//! [`ShutdownSignal`]s observe it. Triggering is idempotent and the flag never
//! resets, so a worker that checks late still sees it.

use tokio::sync::watch;

#[derive(Debug)]
pub struct ShutdownCoordinator {
    sender: watch::Sender<bool>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// A new observer of this coordinator.
    #[must_use]
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }

    /// Request shutdown. Calling this more than once has no further effect.
    pub fn trigger(&self) {
        self.sender.send_if_modified(|triggered| {
            if *triggered {
                false
            } else {
                *triggered = true;
                true
            }
        });
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Cheap, cloneable view of the shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once shutdown has been requested.
    ///
    /// A dropped coordinator counts as a shutdown request: nobody is left to
    /// keep the process running.
    pub async fn wait(&self) {
        let mut receiver = self.receiver.clone();
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }

    /// Sleep for `duration`, waking early on shutdown.
    ///
    /// Returns `true` if the sleep was cut short by shutdown.
    pub async fn sleep(&self, duration: std::time::Duration) -> bool {
        tokio::select! {
            () = self.wait() => true,
            () = tokio::time::sleep(duration) => self.is_triggered(),
        }
    }
}
