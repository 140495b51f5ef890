use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub poll_interval_min: Duration,
    pub poll_interval_max: Duration,
    pub stale_after: Duration,
    pub disconnected_after: Duration,
    pub poll_timeout: Duration,
    pub error_threshold: u32,
    pub auto_tune: bool,
    /// How many recent feed entries to request per poll.
    pub fetch_results: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            poll_interval_min: Duration::from_secs(10),
            poll_interval_max: Duration::from_secs(120),
            stale_after: Duration::from_secs(90),
            disconnected_after: Duration::from_secs(300),
            poll_timeout: Duration::from_secs(10),
            error_threshold: 3,
            auto_tune: true,
            fetch_results: 50,
        }
    }
}
