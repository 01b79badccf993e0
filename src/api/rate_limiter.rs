use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, Semaphore};
use tokio::time;
use tracing::warn;

use crate::core::error::{Result, ServiceError};

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub max_requests: usize,
    pub window_duration: Duration,
    pub max_in_flight: usize,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 300,
            window_duration: Duration::from_secs(60),
            max_in_flight: 16,
        }
    }
}

/// Upstream budget: a semaphore caps in-flight calls, a sliding window
/// caps calls per window. Every analysis takes `support_calls + 2` permits.
pub struct RateLimiter {
    config: RateLimiterConfig,
    semaphore: Arc<Semaphore>,
    request_times: Arc<RwLock<VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            request_times: Arc::new(RwLock::new(VecDeque::new())),
            config,
        }
    }

    pub async fn acquire(&self) -> Result<RateLimitPermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ServiceError::Internal(format!("rate limiter closed: {}", e)))?;

        loop {
            let mut times = self.request_times.write().await;
            let now = Instant::now();
            let window_start = now.checked_sub(self.config.window_duration);

            while let Some(&front) = times.front() {
                match window_start {
                    Some(start) if front < start => {
                        times.pop_front();
                    }
                    _ => break,
                }
            }

            if times.len() < self.config.max_requests.max(1) {
                times.push_back(now);
                return Ok(RateLimitPermit {
                    _permit: permit,
                    start_time: now,
                });
            }

            let Some(&oldest) = times.front() else {
                continue;
            };
            let wait_duration = (oldest + self.config.window_duration).saturating_duration_since(now);
            warn!("⏳ Upstream budget exhausted, waiting {:?}", wait_duration);
            drop(times);
            time::sleep(wait_duration).await;
        }
    }
}

pub struct RateLimitPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
    start_time: Instant,
}

impl RateLimitPermit {
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_acquire() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_requests: 10,
            window_duration: Duration::from_secs(60),
            max_in_flight: 5,
        });

        let permit = limiter.acquire().await;
        assert!(permit.is_ok());
        assert_eq!(limiter.request_times.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_in_flight_cap() {
        let limiter = Arc::new(RateLimiter::new(RateLimiterConfig {
            max_requests: 100,
            window_duration: Duration::from_secs(60),
            max_in_flight: 1,
        }));

        let first = limiter.acquire().await.unwrap();
        let second = tokio::time::timeout(Duration::from_millis(50), limiter.acquire()).await;
        assert!(second.is_err(), "second permit must wait while the first is held");

        drop(first);
        let third = tokio::time::timeout(Duration::from_millis(50), limiter.acquire()).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_window_waits_for_oldest_entry() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_requests: 2,
            window_duration: Duration::from_millis(100),
            max_in_flight: 4,
        });

        let start = Instant::now();
        for _ in 0..3 {
            let _permit = limiter.acquire().await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(90));
    }
}
