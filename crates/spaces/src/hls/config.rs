use std::time::Duration;

/// Fixed limits of a polling session. Passed to the downloader at
/// construction so each session can be tuned (and tested) independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Consecutive failed playlist fetches tolerated before giving up.
    pub max_retries: u32,
    /// Delay before retrying a failed playlist fetch.
    pub retry_delay: Duration,
    /// Delay between two successful playlist polls.
    pub poll_interval: Duration,
    /// How many nested playlist pointers are followed for one fetch.
    pub max_nested_depth: u8,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            retry_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(3),
            max_nested_depth: 4,
        }
    }
}

impl PollingConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_nested_depth(mut self, depth: u8) -> Self {
        self.max_nested_depth = depth;
        self
    }
}
