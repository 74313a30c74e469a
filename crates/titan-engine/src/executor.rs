use std::sync::Arc;

use tokio::sync::Semaphore;

use titan_core::TitanError;

/// Bounded-concurrency bridge between the async surface and CPU-bound
/// signing work.
///
/// A semaphore of `slots` permits caps how many requests may be queued into
/// the blocking pool at once; everything beyond that waits cooperatively on
/// the event loop. The permit is an RAII guard held across the await, so it
/// is returned on every exit path — success, signing failure, caller timeout
/// and task cancellation included. A task already running on a worker thread
/// may still finish; its slot is only reusable once the guard drops.
pub struct SigningExecutor {
    semaphore: Arc<Semaphore>,
    slots: usize,
}

impl SigningExecutor {
    pub fn new(slots: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(slots)),
            slots,
        }
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Permits currently free. Equals `slots()` whenever the system is idle.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Acquire a slot, run `task` on the blocking pool, release the slot.
    pub async fn run_with_slot<F, T>(&self, task: F) -> Result<T, TitanError>
    where
        F: FnOnce() -> Result<T, TitanError> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TitanError::Internal("signing executor is shut down".to_string()))?;
        tokio::task::spawn_blocking(task)
            .await
            .map_err(|e| TitanError::Internal(format!("signing task aborted: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn permits_return_after_success_and_failure() {
        let executor = SigningExecutor::new(4);
        assert_eq!(executor.available_permits(), 4);

        let ok = executor.run_with_slot(|| Ok(7)).await.unwrap();
        assert_eq!(ok, 7);
        assert_eq!(executor.available_permits(), 4);

        let err = executor
            .run_with_slot::<_, ()>(|| Err(TitanError::Signing("boom".to_string())))
            .await
            .unwrap_err();
        assert!(matches!(err, TitanError::Signing(_)));
        assert_eq!(executor.available_permits(), 4);
    }

    #[tokio::test]
    async fn permit_returns_after_caller_timeout() {
        let executor = Arc::new(SigningExecutor::new(1));

        let slow = Arc::clone(&executor);
        let timed_out = tokio::time::timeout(
            Duration::from_millis(20),
            slow.run_with_slot(|| {
                std::thread::sleep(Duration::from_millis(150));
                Ok(())
            }),
        )
        .await;
        assert!(timed_out.is_err());

        // The worker may still be running; once it finishes, the dropped
        // future must have surrendered its permit.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(executor.available_permits(), 1);
    }

    #[tokio::test]
    async fn saturation_queues_instead_of_failing() {
        let executor = Arc::new(SigningExecutor::new(2));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let executor = Arc::clone(&executor);
                tokio::spawn(async move {
                    executor
                        .run_with_slot(move || {
                            std::thread::sleep(Duration::from_millis(10));
                            Ok(i)
                        })
                        .await
                })
            })
            .collect();

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap().unwrap());
        }
        results.sort_unstable();
        assert_eq!(results, (0..8).collect::<Vec<_>>());
        assert_eq!(executor.available_permits(), 2);
    }
}
