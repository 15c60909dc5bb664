// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Global sliding-window rate limiter.
//!
//! Capacity `N` over a trailing window (one second in production): a permit
//! is granted only while fewer than `N` grants happened inside the window.
//! Grant timestamps are kept in a deque of at most `N` entries, and grant
//! decisions are serialized by a mutex.

use std::collections::VecDeque;
use std::time::Duration;

use herald_core::HeraldError;
use tokio::sync::Mutex;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(1);

pub struct RateLimiter {
    capacity: usize,
    window: Duration,
    grants: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// A limiter allowing `permits_per_second` grants per second.
    pub fn new(permits_per_second: u32) -> Result<Self, HeraldError> {
        Self::with_window(permits_per_second, WINDOW)
    }

    pub fn with_window(permits: u32, window: Duration) -> Result<Self, HeraldError> {
        if permits == 0 {
            return Err(HeraldError::Config(
                "rate limiter needs at least one permit per window".into(),
            ));
        }
        if window.is_zero() {
            return Err(HeraldError::Config(
                "rate limiter window must be non-zero".into(),
            ));
        }
        let capacity = permits as usize;
        Ok(Self {
            capacity,
            window,
            grants: Mutex::new(VecDeque::with_capacity(capacity)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait for a permit. Returns exactly once, at the moment of the grant.
    pub async fn acquire(&self) {
        loop {
            let retry_at = {
                let mut grants = self.grants.lock().await;
                let now = Instant::now();
                while grants
                    .front()
                    .is_some_and(|&oldest| now.duration_since(oldest) >= self.window)
                {
                    grants.pop_front();
                }

                if grants.len() < self.capacity {
                    grants.push_back(now);
                    return;
                }
                // Full: the oldest grant is the next to leave the window.
                grants.front().map(|&oldest| oldest + self.window)
            };

            if let Some(deadline) = retry_at {
                tokio::time::sleep_until(deadline).await;
            }
        }
    }

    /// Grants currently inside the window.
    #[cfg(test)]
    async fn in_window(&self) -> usize {
        let grants = self.grants.lock().await;
        let now = Instant::now();
        grants
            .iter()
            .filter(|&&at| now.duration_since(at) < self.window)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn zero_permits_is_rejected() {
        assert!(RateLimiter::new(0).is_err());
        assert!(RateLimiter::with_window(3, Duration::ZERO).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn burst_up_to_capacity_is_immediate() {
        let limiter = RateLimiter::new(5).unwrap();
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.in_window().await, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn saturated_limiter_waits_for_oldest_grant() {
        let limiter = RateLimiter::new(2).unwrap();
        let start = Instant::now();
        limiter.acquire().await;
        tokio::time::advance(Duration::from_millis(300)).await;
        limiter.acquire().await;

        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));

        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_millis(1300));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_grants_never_exceed_capacity_per_window() {
        let limiter = Arc::new(RateLimiter::new(4).unwrap());
        let stamps = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let limiter = Arc::clone(&limiter);
            let stamps = Arc::clone(&stamps);
            handles.push(tokio::spawn(async move {
                for _ in 0..5 {
                    limiter.acquire().await;
                    stamps.lock().await.push(Instant::now());
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut stamps = stamps.lock().await.clone();
        stamps.sort();
        assert_eq!(stamps.len(), 30);
        for pair in stamps.windows(5) {
            assert!(
                pair[4].duration_since(pair[0]) >= Duration::from_secs(1),
                "five grants inside one second"
            );
        }
    }
}
