// Background rebuilds: build a complete generation off the request path,
// then swap it in. A cancelled or failed build never touches the live one.

use crate::{Engine, Error, Item, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Shared cancellation flag checked by the build between phases and items
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(Error::Cancelled)` once cancelled
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A rebuild of an engine from a full corpus
pub struct RebuildJob {
    engine: Arc<Engine>,
    items: Vec<Item>,
    cancel: CancelToken,
}

impl RebuildJob {
    pub fn new(engine: Arc<Engine>, items: Vec<Item>) -> Self {
        Self {
            engine,
            items,
            cancel: CancelToken::new(),
        }
    }

    /// Run on the current thread. Returns the number of the installed generation.
    pub fn run(self) -> Result<u64> {
        self.engine.rebuild_with(&self.items, &self.cancel)
    }

    /// Run on a dedicated thread
    pub fn spawn(self) -> Result<RebuildHandle> {
        let cancel = self.cancel.clone();
        let handle = thread::Builder::new()
            .name("simrec-rebuild".to_string())
            .spawn(move || self.run())?;
        Ok(RebuildHandle {
            cancel,
            handle: Some(handle),
        })
    }
}

/// Handle to a background rebuild.
///
/// Dropping the handle without joining abandons the build: it is cancelled
/// and the live generation stays in place.
pub struct RebuildHandle {
    cancel: CancelToken,
    handle: Option<JoinHandle<Result<u64>>>,
}

impl RebuildHandle {
    /// Request cancellation; takes effect at the next checkpoint
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the build and return the installed generation number
    pub fn join(mut self) -> Result<u64> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::BuildFailed("rebuild thread panicked".to_string()))?,
            None => Err(Error::BuildFailed("rebuild already joined".to_string())),
        }
    }
}

impl Drop for RebuildHandle {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel.cancel();
        }
    }
}
