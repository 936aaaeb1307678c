//! Single-flight collapse of same-key computations
//!
//! Concurrent requests for the same cache key must not issue duplicate
//! provider calls or duplicate cache writes: the first caller runs the
//! computation, every concurrent caller for that key receives the same
//! result. Requests for different keys proceed independently.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::{broadcast, Mutex};

/// Per-key in-flight computation registry.
///
/// Result and error types must be `Clone` so one outcome can be fanned out
/// to every waiter.
pub struct SingleFlight<T, E> {
    inflight: Mutex<HashMap<String, broadcast::Sender<Result<T, E>>>>,
}

impl<T, E> SingleFlight<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `work` for `key`, or wait for the in-flight run of the same key.
    ///
    /// The registry entry is removed before the result is broadcast, so a
    /// caller arriving after completion starts a fresh run (by then the
    /// result is in the cache and the fresh run is normally a cache hit in
    /// the caller's own lookup path).
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut work = Some(work);

        loop {
            let mut rx = {
                let mut inflight = self.inflight.lock().await;
                match inflight.get(key) {
                    Some(tx) => {
                        tracing::debug!(key, "joining in-flight computation");
                        tx.subscribe()
                    }
                    None => {
                        let (tx, _) = broadcast::channel(1);
                        inflight.insert(key.to_string(), tx.clone());
                        drop(inflight);

                        let work = work.take().expect("leader branch returns after running work");
                        let result = work().await;

                        self.inflight.lock().await.remove(key);
                        let _ = tx.send(result.clone());
                        return result;
                    }
                }
            };

            match rx.recv().await {
                Ok(result) => return result,
                // The leader was dropped without broadcasting; its registry
                // entry is gone, so the next pass takes over as leader.
                Err(broadcast::error::RecvError::Closed)
                | Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    }
}

impl<T, E> Default for SingleFlight<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
