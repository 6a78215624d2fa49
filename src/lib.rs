pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::TomlConfig;

pub use crate::core::{
    broadcast::{BroadcastCoordinator, BroadcastOptions, BroadcastSummary},
    dispatcher::BoundedDispatcher,
    resolver::CityWeatherResolver,
};
pub use crate::domain::model::{Frequency, Subscription, Weather};
pub use crate::utils::error::{BroadcastError, ResolutionError, Result};
