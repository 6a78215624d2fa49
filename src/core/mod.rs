pub mod broadcast;
pub mod dispatcher;
pub mod memo;
pub mod resolver;

pub use crate::domain::model::{CityOutcome, Frequency, Subscription, Weather};
pub use crate::domain::ports::{
    Cache, ConfigProvider, MetricsRecorder, Notifier, SubscriptionSource, WeatherOrigin,
    WeatherResolver, WeatherStage,
};
pub use crate::utils::error::Result;
