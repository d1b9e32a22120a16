//! # Admission controller for status probes.
//!
//! A counting gate that caps how many probes run at once. Each probe worker
//! holds one [`AdmissionToken`] for the duration of its prober call.
//!
//! ## Rules
//! - At most `capacity` tokens are held at any time.
//! - A token is released when dropped, so it is released on every exit path of
//!   the worker, including prober failures and panics.
//! - Acquisition never waits forever: it fails with [`AdmissionError::Closed`]
//!   once the controller is closed, or [`AdmissionError::Cancelled`] once the
//!   caller's token is cancelled.

use std::sync::Arc;

use tokio::select;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::AdmissionError;

/// Opaque permit held while one probe runs.
#[derive(Debug)]
pub struct AdmissionToken {
    _permit: OwnedSemaphorePermit,
}

/// Weighted counting gate shared by all probe workers.
///
/// Cheap to clone: clones share the same pool.
#[derive(Clone, Debug)]
pub struct AdmissionController {
    sem: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionController {
    /// Creates a controller admitting `capacity` holders (min 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            sem: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a free slot.
    ///
    /// ### Cancellation
    /// Returns immediately with `Cancelled` if `cancel` is already cancelled,
    /// and aborts the wait as soon as it is.
    pub async fn acquire(
        &self,
        cancel: &CancellationToken,
    ) -> Result<AdmissionToken, AdmissionError> {
        if cancel.is_cancelled() {
            return Err(AdmissionError::Cancelled);
        }
        let permit_future = Arc::clone(&self.sem).acquire_owned();
        tokio::pin!(permit_future);

        select! {
            res = &mut permit_future => match res {
                Ok(permit) => Ok(AdmissionToken { _permit: permit }),
                Err(_closed) => Err(AdmissionError::Closed),
            },
            _ = cancel.cancelled() => Err(AdmissionError::Cancelled),
        }
    }

    /// Returns `token` to the pool.
    pub fn release(&self, token: AdmissionToken) {
        drop(token);
    }

    /// Closes the gate: pending and future acquisitions fail with `Closed`.
    pub fn close(&self) {
        self.sem.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of tokens currently held.
    pub fn in_use(&self) -> usize {
        self.capacity.saturating_sub(self.sem.available_permits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_more_than_capacity_holders() {
        let gate = AdmissionController::new(4);
        let cancel = CancellationToken::new();
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..24 {
            let gate = gate.clone();
            let cancel = cancel.clone();
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let token = gate.acquire(&cancel).await.unwrap();
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                gate.release(token);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let peak = peak.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= 4, "peak holders = {peak}");
        assert_eq!(gate.in_use(), 0);
    }

    #[tokio::test]
    async fn test_two_probes_are_admitted_immediately() {
        let gate = AdmissionController::new(4);
        let cancel = CancellationToken::new();

        let a = gate.acquire(&cancel).await.unwrap();
        let b = gate.acquire(&cancel).await.unwrap();
        assert_eq!(gate.in_use(), 2);

        drop(a);
        gate.release(b);
        assert_eq!(gate.in_use(), 0);
    }

    #[tokio::test]
    async fn test_cancel_aborts_a_blocked_acquire() {
        let gate = AdmissionController::new(1);
        let cancel = CancellationToken::new();
        let _held = gate.acquire(&cancel).await.unwrap();

        let waiter = {
            let gate = gate.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { gate.acquire(&cancel).await.map(|_| ()) })
        };
        tokio::task::yield_now().await;
        cancel.cancel();

        assert_eq!(waiter.await.unwrap(), Err(AdmissionError::Cancelled));
    }

    #[tokio::test]
    async fn test_close_fails_pending_and_future_acquires() {
        let gate = AdmissionController::new(1);
        let cancel = CancellationToken::new();
        let _held = gate.acquire(&cancel).await.unwrap();

        let waiter = {
            let gate = gate.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { gate.acquire(&cancel).await.map(|_| ()) })
        };
        tokio::task::yield_now().await;
        gate.close();

        assert_eq!(waiter.await.unwrap(), Err(AdmissionError::Closed));
        assert_eq!(
            gate.acquire(&cancel).await.map(|_| ()),
            Err(AdmissionError::Closed)
        );
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        assert_eq!(AdmissionController::new(0).capacity(), 1);
    }
}
