// Adapters layer: concrete implementations of the domain ports.

pub mod cache;
pub mod metrics;
pub mod notifier;
pub mod origins;
pub mod subscriptions;

pub use cache::InMemoryCache;
pub use metrics::{InMemoryMetrics, MetricsSnapshot};
pub use notifier::{LogNotifier, WeatherReport};
pub use subscriptions::InMemorySubscriptionSource;
