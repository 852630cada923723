use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Deadline used when a budget is too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Fixed-interval polling bounded by a wall-clock budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub budget: Duration,
    /// Wait one interval before the first attempt.
    pub delay_first: bool,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult<T> {
    Ready { value: T, attempts: u32 },
    Expired { attempts: u32, elapsed: Duration },
}

impl PollPolicy {
    pub fn new(interval: Duration, budget: Duration) -> Self {
        Self {
            interval,
            budget,
            delay_first: false,
            max_attempts: None,
        }
    }

    pub fn delay_first(mut self, delay_first: bool) -> Self {
        self.delay_first = delay_first;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Call `fetch` until `check` accepts its value, the budget runs out or
    /// `max_attempts` is reached. A failed fetch is logged and counts as an
    /// attempt; it never ends the loop by itself. Sleeps are clipped to the
    /// deadline so the loop cannot overshoot the budget by a whole interval.
    pub async fn run<V, T, E, F, Fut, C>(&self, label: &str, mut fetch: F, mut check: C) -> PollResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Display,
        C: FnMut(V) -> Option<T>,
    {
        let started = Instant::now();
        let deadline = started
            .checked_add(self.budget)
            .unwrap_or_else(|| started + FAR_FUTURE);
        let mut attempts = 0u32;

        log::debug!("[poll] start: label={} interval={}s budget={}s delay_first={}",
            label, self.interval.as_secs(), self.budget.as_secs(), self.delay_first);

        loop {
            if self.max_attempts.is_some_and(|max| attempts >= max) {
                break;
            }

            if attempts > 0 || self.delay_first {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                sleep(self.interval.min(remaining)).await;
            }

            attempts += 1;
            match fetch().await {
                Ok(value) => {
                    if let Some(ready) = check(value) {
                        log::debug!("[poll] ready: label={} attempts={} elapsed={}ms",
                            label, attempts, started.elapsed().as_millis());
                        return PollResult::Ready { value: ready, attempts };
                    }
                }
                Err(e) => {
                    log::warn!("[poll] attempt_failed: label={} attempt={} error={}", label, attempts, e);
                }
            }

            if Instant::now() >= deadline {
                break;
            }
        }

        let elapsed = started.elapsed();
        log::debug!("[poll] expired: label={} attempts={} elapsed={}ms", label, attempts, elapsed.as_millis());
        PollResult::Expired { attempts, elapsed }
    }
}

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryError<E> {
    pub error: E,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op` until it succeeds, fails with an error `is_retriable`
    /// rejects, or `max_attempts` is used up.
    pub async fn run<T, E, F, Fut, R>(&self, label: &str, is_retriable: R, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        R: Fn(&E) -> bool,
    {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if attempts < self.max_attempts && is_retriable(&error) => {
                    log::warn!("[poll] retrying: label={} attempt={}/{} delay={}s error={}",
                        label, attempts, self.max_attempts, self.delay.as_secs(), error);
                    sleep(self.delay).await;
                }
                Err(error) => return Err(RetryError { error, attempts }),
            }
        }
    }
}
