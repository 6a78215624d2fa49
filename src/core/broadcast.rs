//! Broadcast fan-out.
//!
//! One run scans every confirmed subscription of a frequency page by page,
//! resolves each distinct city at most once, and hands one notification task
//! per subscriber to a [`BoundedDispatcher`]. The run always waits for every
//! dispatched task before it returns.

use crate::core::dispatcher::BoundedDispatcher;
use crate::core::memo::CityWeatherMemo;
use crate::domain::model::{CityOutcome, Frequency, Subscription};
use crate::domain::ports::{ConfigProvider, Notifier, SubscriptionSource, WeatherResolver};
use crate::utils::error::{BroadcastError, Result};
use crate::utils::validation::validate_positive_number;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_DISPATCHER_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastOptions {
    pub page_size: usize,
    pub dispatcher_capacity: usize,
}

impl Default for BroadcastOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            dispatcher_capacity: DEFAULT_DISPATCHER_CAPACITY,
        }
    }
}

impl BroadcastOptions {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            page_size: config.page_size(),
            dispatcher_capacity: config.dispatcher_capacity(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_positive_number("broadcast.page_size", self.page_size, 1)?;
        validate_positive_number(
            "broadcast.dispatcher_capacity",
            self.dispatcher_capacity,
            1,
        )?;
        Ok(())
    }
}

/// 單次廣播的執行摘要
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastSummary {
    pub frequency: Frequency,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages_fetched: usize,
    pub subscriptions_seen: usize,
    pub cities_resolved: usize,
    pub cities_unavailable: usize,
    pub notifications_dispatched: usize,
    pub peak_concurrency: usize,
    pub aborted: bool,
}

impl BroadcastSummary {
    fn begin(frequency: Frequency) -> Self {
        let now = Utc::now();
        Self {
            frequency,
            started_at: now,
            finished_at: now,
            pages_fetched: 0,
            subscriptions_seen: 0,
            cities_resolved: 0,
            cities_unavailable: 0,
            notifications_dispatched: 0,
            peak_concurrency: 0,
            aborted: false,
        }
    }
}

pub struct BroadcastCoordinator {
    source: Arc<dyn SubscriptionSource>,
    resolver: Arc<dyn WeatherResolver>,
    notifier: Arc<dyn Notifier>,
    options: BroadcastOptions,
}

impl BroadcastCoordinator {
    pub fn new(
        source: Arc<dyn SubscriptionSource>,
        resolver: Arc<dyn WeatherResolver>,
        notifier: Arc<dyn Notifier>,
        options: BroadcastOptions,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            source,
            resolver,
            notifier,
            options,
        })
    }

    pub fn options(&self) -> BroadcastOptions {
        self.options
    }

    /// 對指定頻率的所有已確認訂閱者發送天氣通知
    ///
    /// Never fails: a subscriber listing error stops pagination, and every
    /// task submitted before it is still awaited.
    pub async fn broadcast(&self, frequency: Frequency) -> BroadcastSummary {
        let mut summary = BroadcastSummary::begin(frequency);
        tracing::info!("📣 Starting {} weather broadcast", frequency);

        let mut dispatcher = match BoundedDispatcher::new(self.options.dispatcher_capacity) {
            Ok(dispatcher) => dispatcher,
            Err(e) => {
                tracing::error!("❌ Could not create dispatcher: {}", e);
                summary.aborted = true;
                summary.finished_at = Utc::now();
                return summary;
            }
        };
        let mut memo = CityWeatherMemo::new();
        let mut cursor: u64 = 0;

        loop {
            let page = match self
                .source
                .list_confirmed(frequency, cursor, self.options.page_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    let err = BroadcastError::PageFetch {
                        cursor,
                        message: e.to_string(),
                    };
                    tracing::error!("❌ {}; stopping {} broadcast", err, frequency);
                    summary.aborted = true;
                    break;
                }
            };

            if page.is_empty() {
                break;
            }

            summary.pages_fetched += 1;
            tracing::debug!(
                "📄 Page {} with {} subscriptions after cursor {}",
                summary.pages_fetched,
                page.len(),
                cursor
            );

            let mut highest_id = cursor;
            for subscription in &page {
                // 只接受嚴格遞增的 id，重複或倒退的資料一律略過
                if subscription.id <= highest_id {
                    tracing::warn!(
                        "⚠️ Subscription {} is not above last seen id {}, skipping",
                        subscription.id,
                        highest_id
                    );
                    continue;
                }
                highest_id = subscription.id;

                if !subscription.is_eligible(frequency) {
                    tracing::debug!(
                        "Skipping subscription {} (confirmed: {}, frequency: {})",
                        subscription.id,
                        subscription.confirmed,
                        subscription.frequency
                    );
                    continue;
                }
                summary.subscriptions_seen += 1;

                let outcome = self.city_outcome(&mut memo, &subscription.city).await;
                let task = notification_task(self.notifier.clone(), subscription, outcome);
                match dispatcher.submit(task).await {
                    Ok(()) => summary.notifications_dispatched += 1,
                    Err(e) => tracing::error!(
                        "❌ Could not dispatch notification for subscription {}: {}",
                        subscription.id,
                        e
                    ),
                }
            }

            // 游標必須遞增，否則來源會讓迴圈停不下來
            if highest_id <= cursor {
                tracing::error!(
                    "❌ Subscription source returned no id above cursor {}; stopping {} broadcast",
                    cursor,
                    frequency
                );
                summary.aborted = true;
                break;
            }
            cursor = highest_id;
        }

        dispatcher.wait_all().await;

        summary.cities_unavailable = memo.unavailable_count();
        summary.cities_resolved = memo.len() - summary.cities_unavailable;
        summary.peak_concurrency = dispatcher.peak_in_flight();
        summary.finished_at = Utc::now();

        tracing::info!(
            "✅ {} broadcast finished: {} subscribers, {} cities ({} unavailable), {} notifications{}",
            frequency,
            summary.subscriptions_seen,
            memo.len(),
            summary.cities_unavailable,
            summary.notifications_dispatched,
            if summary.aborted { " (aborted early)" } else { "" }
        );

        summary
    }

    // 同一城市在一次廣播中只解析一次，失敗也會被記住
    async fn city_outcome(&self, memo: &mut CityWeatherMemo, city: &str) -> CityOutcome {
        if let Some(outcome) = memo.get(city) {
            return outcome.clone();
        }

        let outcome = match self.resolver.resolve(city).await {
            Ok(weather) => CityOutcome::Available(weather),
            Err(e) => {
                tracing::warn!("⚠️ Weather for {} unavailable in this run: {}", city, e);
                CityOutcome::Unavailable
            }
        };

        memo.record(city, outcome).clone()
    }
}

fn notification_task(
    notifier: Arc<dyn Notifier>,
    subscription: &Subscription,
    outcome: CityOutcome,
) -> impl Future<Output = ()> + Send + 'static {
    let id = subscription.id;
    let email = subscription.email.clone();
    let city = subscription.city.clone();

    async move {
        let result = match &outcome {
            CityOutcome::Available(weather) => notifier.send_success(&email, &city, weather).await,
            CityOutcome::Unavailable => notifier.send_failure(&email, &city).await,
        };

        if let Err(e) = result {
            tracing::warn!("⚠️ Notification for subscription {} failed: {}", id, e);
        }
    }
}
