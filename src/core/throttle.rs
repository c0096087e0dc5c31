use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding-window admission gate: at most `limit` acquisitions within any
/// window of length `period`.
///
/// The throttle bounds the rate at which calls are *issued*, not how many are
/// in flight. Share one instance (behind an `Arc`) across every task issuing
/// the same kind of call.
#[derive(Debug)]
pub struct Throttle {
    limit: usize,
    period: Duration,
    issued: Mutex<VecDeque<Instant>>,
}

impl Throttle {
    pub fn new(limit: usize, period: Duration) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            period,
            issued: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }

    /// Wait until a slot is free in the current window, then claim it.
    ///
    /// Waiters queue on the (fair) mutex, so admission is first-come
    /// first-served.
    pub async fn acquire(&self) {
        let mut issued = self.issued.lock().await;
        loop {
            let now = Instant::now();
            while let Some(&oldest) = issued.front() {
                if now.duration_since(oldest) >= self.period {
                    issued.pop_front();
                } else {
                    break;
                }
            }

            if issued.len() < self.limit {
                issued.push_back(now);
                return;
            }

            // 視窗已滿，等到最舊的一筆過期
            if let Some(&oldest) = issued.front() {
                tracing::trace!("Throttle full, waiting {:?}", (oldest + self.period) - now);
                tokio::time::sleep_until(oldest + self.period).await;
            }
        }
    }
}
