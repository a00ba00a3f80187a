//! Bounded polling for page state.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Poll `probe` every `interval` until it yields a value or `timeout`
/// elapses. The probe always runs at least once.
pub async fn wait_until<T, F, Fut>(mut probe: F, timeout: Duration, interval: Duration) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}
