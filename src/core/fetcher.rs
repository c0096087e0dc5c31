use crate::core::throttle::Throttle;
use crate::utils::error::Result;
use futures::stream::{self, StreamExt};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

/// Per-key result of a batch fetch. Failures are values, never panics or
/// missing entries.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<K, V> {
    Fetched { key: K, value: V },
    Failed { key: K, reason: String },
}

impl<K, V> Outcome<K, V> {
    pub fn key(&self) -> &K {
        match self {
            Outcome::Fetched { key, .. } | Outcome::Failed { key, .. } => key,
        }
    }

    pub fn into_fetched(self) -> Option<(K, V)> {
        match self {
            Outcome::Fetched { key, value } => Some((key, value)),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self, Outcome::Fetched { .. })
    }
}

/// Runs one remote call per key under a shared [`Throttle`].
///
/// At most `max_in_flight` calls are pending at once; outcomes come back in
/// input-key order regardless of completion order.
#[derive(Debug, Clone)]
pub struct RateLimitedFetcher {
    name: &'static str,
    throttle: Arc<Throttle>,
    max_in_flight: usize,
}

impl RateLimitedFetcher {
    pub fn new(name: &'static str, throttle: Arc<Throttle>, max_in_flight: usize) -> Self {
        Self {
            name,
            throttle,
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub async fn fetch_all<K, V, F, Fut>(&self, keys: Vec<K>, call: F) -> Vec<Outcome<K, V>>
    where
        K: Display + Clone,
        F: Fn(K) -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let total = keys.len();
        let call = &call;
        let throttle = &self.throttle;
        let name = self.name;

        let outcomes: Vec<Outcome<K, V>> = stream::iter(keys)
            .map(|key| async move {
                throttle.acquire().await;
                match call(key.clone()).await {
                    Ok(value) => Outcome::Fetched { key, value },
                    Err(e) => {
                        tracing::warn!("{} error -- Ex Libris API Error on {}: {}", name, key, e);
                        Outcome::Failed {
                            key,
                            reason: e.to_string(),
                        }
                    }
                }
            })
            .buffered(self.max_in_flight)
            .collect()
            .await;

        let failed = outcomes.iter().filter(|o| !o.is_fetched()).count();
        tracing::debug!("{}: {} of {} calls succeeded", name, total - failed, total);
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::EtlError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    fn fetcher(limit: usize, max_in_flight: usize) -> RateLimitedFetcher {
        RateLimitedFetcher::new(
            "TestFetch",
            Arc::new(Throttle::new(limit, Duration::from_secs(1))),
            max_in_flight,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcomes_follow_input_order() {
        let keys: Vec<u64> = vec![5, 1, 4, 2, 3];

        // 越小的 key 越晚完成
        let outcomes = fetcher(25, 10)
            .fetch_all(keys.clone(), |k| async move {
                tokio::time::sleep(Duration::from_millis(100 / k)).await;
                Ok(k * 10)
            })
            .await;

        let returned: Vec<u64> = outcomes.iter().map(|o| *o.key()).collect();
        assert_eq!(returned, keys);
        assert_eq!(outcomes[0], Outcome::Fetched { key: 5, value: 50 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_isolated() {
        let keys: Vec<String> = ["991", "992", "993", "994"].iter().map(|s| s.to_string()).collect();

        let outcomes = fetcher(25, 10)
            .fetch_all(keys, |k| async move {
                if k == "992" || k == "994" {
                    Err(EtlError::ApiStatus {
                        status: 400,
                        message: format!("Input parameters mmsId {} is not valid.", k),
                    })
                } else {
                    Ok(k.len())
                }
            })
            .await;

        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[0].is_fetched());
        assert!(matches!(&outcomes[1], Outcome::Failed { key, reason } if key == "992" && reason.contains("400")));
        assert!(outcomes[2].is_fetched());
        assert!(!outcomes[3].is_fetched());

        let fetched: Vec<(String, usize)> = outcomes.into_iter().filter_map(Outcome::into_fetched).collect();
        assert_eq!(fetched, vec![("991".to_string(), 3), ("993".to_string(), 3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_issue_rate_respects_throttle() {
        let issued = Arc::new(std::sync::Mutex::new(Vec::new()));
        let keys: Vec<usize> = (0..60).collect();

        let recorder = issued.clone();
        let outcomes = fetcher(25, 1000)
            .fetch_all(keys, move |k| {
                let recorder = recorder.clone();
                async move {
                    recorder.lock().unwrap().push(Instant::now());
                    tokio::time::sleep(Duration::from_millis(1500)).await;
                    Ok(k)
                }
            })
            .await;
        assert_eq!(outcomes.len(), 60);

        let mut issued = issued.lock().unwrap().clone();
        issued.sort();
        for (i, start) in issued.iter().enumerate() {
            let in_window = issued[i..]
                .iter()
                .take_while(|t| t.duration_since(*start) < Duration::from_secs(1))
                .count();
            assert!(in_window <= 25);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_in_flight_bounds_pending_calls() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let keys: Vec<usize> = (0..20).collect();

        let (counter, high_water) = (in_flight.clone(), peak.clone());
        let outcomes = fetcher(1000, 4)
            .fetch_all(keys, move |k| {
                let counter = counter.clone();
                let high_water = high_water.clone();
                async move {
                    let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    high_water.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    counter.fetch_sub(1, Ordering::SeqCst);
                    Ok(k)
                }
            })
            .await;

        assert_eq!(outcomes.len(), 20);
        assert!(outcomes.iter().all(Outcome::is_fetched));
        assert_eq!(peak.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let outcomes: Vec<Outcome<String, ()>> = fetcher(25, 10).fetch_all(Vec::new(), |_| async { Ok(()) }).await;
        assert!(outcomes.is_empty());
    }
}
