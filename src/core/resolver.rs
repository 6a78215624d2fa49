//! Cache-aside weather resolution.
//!
//! A [`CityWeatherResolver`] is an ordered list of [`WeatherStage`]s. The
//! first stage reads the shared cache; every following stage wraps one
//! [`WeatherOrigin`] and writes its result back to the cache on success.
//! Stages are tried strictly in order and the first value wins.

use crate::domain::model::Weather;
use crate::domain::ports::{Cache, MetricsRecorder, WeatherOrigin, WeatherResolver, WeatherStage};
use crate::utils::error::{ResolutionError, StageError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

const CACHE_STAGE_NAME: &str = "cache";

pub fn cache_key(city: &str) -> String {
    format!("weather:{}", city.trim().to_lowercase())
}

/// 讀取共用快取的階段
pub struct CacheReadStage {
    cache: Arc<dyn Cache>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl CacheReadStage {
    pub fn new(cache: Arc<dyn Cache>, metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self { cache, metrics }
    }
}

#[async_trait]
impl WeatherStage for CacheReadStage {
    fn name(&self) -> &str {
        CACHE_STAGE_NAME
    }

    async fn resolve(&self, city: &str) -> Result<Weather, StageError> {
        let key = cache_key(city);

        let raw = match self.cache.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.metrics.record_cache_miss();
                tracing::debug!("🗄️ Cache miss for {}", key);
                return Err(StageError::CacheMiss { key });
            }
            Err(e) => {
                self.metrics.record_cache_error();
                tracing::warn!("⚠️ Cache read failed for {}: {}", key, e);
                return Err(StageError::Cache {
                    message: e.to_string(),
                });
            }
        };

        match serde_json::from_str::<Weather>(&raw) {
            Ok(weather) => {
                self.metrics.record_cache_hit();
                tracing::debug!("🗄️ Cache hit for {}", key);
                Ok(weather)
            }
            Err(e) => {
                self.metrics.record_cache_error();
                tracing::warn!("⚠️ Cached value for {} could not be decoded: {}", key, e);
                Err(StageError::Cache {
                    message: format!("undecodable cached value: {}", e),
                })
            }
        }
    }
}

/// 上游來源成功時寫回快取的階段
pub struct CachingOriginStage {
    origin: Arc<dyn WeatherOrigin>,
    cache: Arc<dyn Cache>,
    ttl: Duration,
    metrics: Arc<dyn MetricsRecorder>,
}

impl CachingOriginStage {
    pub fn new(
        origin: Arc<dyn WeatherOrigin>,
        cache: Arc<dyn Cache>,
        ttl: Duration,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self {
            origin,
            cache,
            ttl,
            metrics,
        }
    }

    // 寫入失敗只記錄，不影響結果
    async fn store(&self, city: &str, weather: &Weather) {
        let key = cache_key(city);
        let value = match serde_json::to_string(weather) {
            Ok(value) => value,
            Err(e) => {
                self.metrics.record_cache_error();
                tracing::warn!("⚠️ Could not serialize weather for {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.cache.set(&key, value, self.ttl).await {
            self.metrics.record_cache_error();
            tracing::warn!("⚠️ Cache write failed for {}: {}", key, e);
        }
    }
}

#[async_trait]
impl WeatherStage for CachingOriginStage {
    fn name(&self) -> &str {
        self.origin.name()
    }

    async fn resolve(&self, city: &str) -> Result<Weather, StageError> {
        match self.origin.get_weather(city).await {
            Ok(weather) => {
                self.metrics.record_origin_success(self.origin.name());
                tracing::debug!("🌤️ {} resolved weather for {}", self.origin.name(), city);
                self.store(city, &weather).await;
                Ok(weather)
            }
            Err(e) => {
                self.metrics.record_origin_error(self.origin.name());
                tracing::warn!("⚠️ {} failed for {}: {}", self.origin.name(), city, e);
                Err(StageError::Origin(e))
            }
        }
    }
}

pub struct CityWeatherResolver {
    stages: Vec<Box<dyn WeatherStage>>,
}

impl CityWeatherResolver {
    pub fn new(stages: Vec<Box<dyn WeatherStage>>) -> Self {
        Self { stages }
    }

    pub fn builder(cache: Arc<dyn Cache>, metrics: Arc<dyn MetricsRecorder>) -> ResolverBuilder {
        ResolverBuilder {
            cache,
            metrics,
            ttl: DEFAULT_CACHE_TTL,
            origins: Vec::new(),
        }
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// 依序嘗試各階段，第一個成功的值即返回；全部失敗時回傳最後一個階段的錯誤
    pub async fn resolve(&self, city: &str) -> Result<Weather, ResolutionError> {
        let mut last_failure: Option<(&str, StageError)> = None;

        for stage in &self.stages {
            match stage.resolve(city).await {
                Ok(weather) => return Ok(weather),
                Err(e) => last_failure = Some((stage.name(), e)),
            }
        }

        match last_failure {
            Some((stage, e)) => Err(e.reclassify(stage)),
            None => Err(ResolutionError::transient(
                "resolver",
                "no resolution stages configured",
            )),
        }
    }
}

#[async_trait]
impl WeatherResolver for CityWeatherResolver {
    async fn resolve(&self, city: &str) -> Result<Weather, ResolutionError> {
        CityWeatherResolver::resolve(self, city).await
    }
}

/// 組裝「快取讀取 → 各上游來源」的解析鏈
pub struct ResolverBuilder {
    cache: Arc<dyn Cache>,
    metrics: Arc<dyn MetricsRecorder>,
    ttl: Duration,
    origins: Vec<Arc<dyn WeatherOrigin>>,
}

impl ResolverBuilder {
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn origin(mut self, origin: Arc<dyn WeatherOrigin>) -> Self {
        self.origins.push(origin);
        self
    }

    pub fn build(self) -> CityWeatherResolver {
        let mut stages: Vec<Box<dyn WeatherStage>> = Vec::with_capacity(self.origins.len() + 1);
        stages.push(Box::new(CacheReadStage::new(
            self.cache.clone(),
            self.metrics.clone(),
        )));

        for origin in self.origins {
            stages.push(Box::new(CachingOriginStage::new(
                origin,
                self.cache.clone(),
                self.ttl,
                self.metrics.clone(),
            )));
        }

        CityWeatherResolver::new(stages)
    }
}
