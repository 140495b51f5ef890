pub mod alerts;
pub mod cache;
pub mod config;
pub mod connectivity;
pub mod correlation;
pub mod feed;
pub mod forecast;
pub mod issues;
pub mod monitor;
pub mod sample;
pub mod stats;
pub mod transport;

pub use alerts::{AlertRecord, Severity, ThresholdConfig, ThresholdLimit};
pub use cache::{CacheEntry, CacheStore, CacheStoreError, JsonFileCacheStore, OfflineCache};
pub use config::MonitorConfig;
pub use connectivity::{ConnectionStatus, FallbackConfig, FallbackManager};
pub use correlation::{correlation_matrix, CorrelationMatrix};
pub use feed::{FeedConfig, FeedError, HttpFeed, TelemetryFeed};
pub use forecast::{ForecastEngine, ForecastError, ForecastPoint, PredictedFields};
pub use monitor::{FeedMonitor, Observation};
pub use sample::{Channel, Sample, SampleWindow, MIN_FORECAST_SAMPLES};
pub use transport::{
    HttpTransportLink, TelemetryPayload, TransportError, TransportKind, TransportLink,
};

#[cfg(test)]
mod stats_tests;

#[cfg(test)]
mod forecast_tests;


#[cfg(test)]
mod issues_tests;


#[cfg(test)]
mod connectivity_tests;
