//! Exclusive use of a shared browser session.

use crate::driver::{RemoteDriver, TrackedDriver};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// A remote browser shared between callers that must not capture at the same time.
///
/// A capture scrolls, resizes and screenshots the one page the session has, so every
/// capture runs under [`CaptureSession::acquire`].
pub struct CaptureSession {
    driver: Arc<dyn RemoteDriver>,
    lock: Mutex<()>,
}

impl CaptureSession {
    pub fn new(driver: Arc<dyn RemoteDriver>) -> Self {
        Self {
            driver,
            lock: Mutex::new(()),
        }
    }

    /// Waits for any running capture to finish, then hands out a fresh [`TrackedDriver`].
    pub async fn acquire(&self) -> SessionGuard<'_> {
        let lock = self.lock.lock().await;
        log::debug!("Acquired capture session");
        SessionGuard {
            _lock: lock,
            driver: TrackedDriver::new(self.driver.clone()),
        }
    }
}

/// Exclusive access to a [`CaptureSession`] until dropped.
pub struct SessionGuard<'a> {
    _lock: MutexGuard<'a, ()>,
    driver: TrackedDriver,
}

impl Deref for SessionGuard<'_> {
    type Target = TrackedDriver;

    fn deref(&self) -> &TrackedDriver {
        &self.driver
    }
}

impl DerefMut for SessionGuard<'_> {
    fn deref_mut(&mut self) -> &mut TrackedDriver {
        &mut self.driver
    }
}
