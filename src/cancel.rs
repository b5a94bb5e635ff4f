//! Cancellation Module
//!
//! Cooperative cancellation for cache operations, built on a tokio watch channel.

use std::future::Future;

use tokio::sync::watch;

use crate::error::{CacheError, Result};

// == Cancel Signal ==
/// Receiving side of a cancellation. Cheap to clone.
///
/// [`CancelSignal::never`] is a signal that can never fire.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

/// Sending side of a cancellation.
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl CancelSignal {
    /// Creates a connected canceller and signal.
    pub fn pair() -> (Canceller, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (Canceller { tx }, CancelSignal { rx: Some(rx) })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self::default()
    }

    /// True once the paired canceller has fired.
    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    // == Cancelled ==
    /// Resolves when the signal fires. Pending forever if it never can.
    pub async fn cancelled(&self) {
        let Some(rx) = self.rx.as_ref() else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Canceller dropped without firing.
            std::future::pending::<()>().await;
        }
    }

    // == Guard ==
    /// Runs `op` unless the signal fires first.
    ///
    /// The signal is checked before `op` is polled, so an already cancelled
    /// signal never lets the operation start.
    pub async fn guard<F, T>(&self, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(CacheError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(CacheError::Cancelled),
            result = op => result,
        }
    }
}

impl Canceller {
    /// Fires the signal. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns another signal connected to this canceller.
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: Some(self.tx.subscribe()),
        }
    }
}
