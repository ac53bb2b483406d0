use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::document_store::StoreError;

// ============================================================================
// Operation Context
// ============================================================================
//
// Caller-owned bound on a store operation: an optional deadline plus an
// optional cancellation signal. Every document store call made by the
// record layer runs through `OpContext::run`, so a cancelled or expired
// context aborts the in-flight call.
//
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancelled: Option<watch::Receiver<bool>>,
}

/// Cancels every context cloned from the one it was created with
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl OpContext {
    /// No deadline, never cancelled
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancelled: None,
        }
    }

    /// Attach a cancellation signal, keeping any deadline
    #[allow(dead_code)]
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancelled = Some(rx);
        (self, CancelHandle { tx })
    }

    #[allow(dead_code)]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Drive a store call, aborting it on cancellation or deadline
    pub async fn run<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let deadline = self.deadline;
        let cancelled = self.cancelled.clone();

        tokio::select! {
            biased;
            _ = wait_cancelled(cancelled) => Err(StoreError::Cancelled),
            _ = wait_deadline(deadline) => Err(StoreError::DeadlineExceeded),
            result = operation => result,
        }
    }
}

async fn wait_cancelled(rx: Option<watch::Receiver<bool>>) {
    match rx {
        Some(mut rx) => {
            // Sender dropped without cancelling: never fires
            if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending().await,
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_context_runs_operation() {
        let ctx = OpContext::background();
        let result = ctx.run(async { Ok::<_, StoreError>(7) }).await.unwrap();
        assert_eq!(result, 7);
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_context_aborts_pending_call() {
        let (ctx, handle) = OpContext::background().cancellable();
        handle.cancel();
        assert!(ctx.is_cancelled());

        let result = ctx
            .run(async {
                std::future::pending::<()>().await;
                Ok::<_, StoreError>(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_reaches_clones() {
        let (ctx, handle) = OpContext::background().cancellable();
        let clone = ctx.clone();

        let task = tokio::spawn(async move {
            clone
                .run(async {
                    std::future::pending::<()>().await;
                    Ok::<_, StoreError>(())
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(StoreError::Cancelled)));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = OpContext::with_timeout(Duration::from_millis(10));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, StoreError>(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_dropped_handle_does_not_cancel() {
        let (ctx, handle) = OpContext::background().cancellable();
        drop(handle);

        let result = ctx.run(async { Ok::<_, StoreError>("done") }).await.unwrap();
        assert_eq!(result, "done");
    }
}
