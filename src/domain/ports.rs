use crate::domain::model::{Frequency, Subscription, Weather};
use crate::utils::error::{ResolutionError, Result, StageError};
use async_trait::async_trait;
use std::time::Duration;

/// 已確認訂閱的分頁來源；依 id 遞增排序，`cursor` 為不含的下界
#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    async fn list_confirmed(
        &self,
        frequency: Frequency,
        cursor: u64,
        page_size: usize,
    ) -> Result<Vec<Subscription>>;
}

/// 單一上游天氣來源
#[async_trait]
pub trait WeatherOrigin: Send + Sync {
    fn name(&self) -> &str;

    async fn get_weather(&self, city: &str) -> std::result::Result<Weather, ResolutionError>;
}

/// 具 TTL 的鍵值快取；`Ok(None)` 代表未命中
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_success(&self, email: &str, city: &str, weather: &Weather) -> Result<()>;

    async fn send_failure(&self, email: &str, city: &str) -> Result<()>;
}

/// 解析鏈各階段的結果回報，不影響回傳值
pub trait MetricsRecorder: Send + Sync {
    fn record_cache_hit(&self);
    fn record_cache_miss(&self);
    fn record_cache_error(&self);
    fn record_origin_success(&self, origin: &str);
    fn record_origin_error(&self, origin: &str);
}

/// 解析鏈中的一個階段
#[async_trait]
pub trait WeatherStage: Send + Sync {
    fn name(&self) -> &str;

    async fn resolve(&self, city: &str) -> std::result::Result<Weather, StageError>;
}

/// 廣播協調器使用的城市天氣解析能力
#[async_trait]
pub trait WeatherResolver: Send + Sync {
    async fn resolve(&self, city: &str) -> std::result::Result<Weather, ResolutionError>;
}

pub trait ConfigProvider: Send + Sync {
    fn page_size(&self) -> usize;
    fn dispatcher_capacity(&self) -> usize;
    fn cache_ttl(&self) -> Duration;
}
