use crate::core::broadcast::{BroadcastOptions, DEFAULT_DISPATCHER_CAPACITY, DEFAULT_PAGE_SIZE};
use crate::core::resolver::DEFAULT_CACHE_TTL;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{BroadcastError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub origins: Vec<OriginConfig>,
    pub subscriptions: Option<SubscriptionsConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BroadcastConfig {
    pub page_size: Option<usize>,
    pub dispatcher_capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginKind {
    #[serde(rename = "weatherapi")]
    WeatherApi,
    #[serde(rename = "openweathermap")]
    OpenWeatherMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    pub kind: OriginKind,
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: Option<u64>,
}

impl OriginConfig {
    pub fn timeout(&self) -> Duration {
        self.timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(crate::adapters::origins::DEFAULT_TIMEOUT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionsConfig {
    pub csv_path: String,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BroadcastError::Io)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BroadcastError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${WEATHER_API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BroadcastError::ConfigValidationError {
            field: "environment".to_string(),
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        self.broadcast_options().validate()?;

        if let Some(ttl) = self.cache.ttl_seconds {
            validate_positive_number("cache.ttl_seconds", ttl as usize, 1)?;
        }

        if self.origins.is_empty() {
            return Err(BroadcastError::MissingConfigError {
                field: "origins".to_string(),
            });
        }

        for (index, origin) in self.origins.iter().enumerate() {
            validate_url(&format!("origins[{}].base_url", index), &origin.base_url)?;
            validate_non_empty_string(&format!("origins[{}].api_key", index), &origin.api_key)?;
            if origin.api_key.contains("${") {
                return Err(BroadcastError::InvalidConfigValueError {
                    field: format!("origins[{}].api_key", index),
                    value: origin.api_key.clone(),
                    reason: "Environment variable is not set".to_string(),
                });
            }
            if let Some(timeout) = origin.timeout_seconds {
                validate_positive_number(
                    &format!("origins[{}].timeout_seconds", index),
                    timeout as usize,
                    1,
                )?;
            }
        }

        if let Some(subscriptions) = &self.subscriptions {
            validate_path("subscriptions.csv_path", &subscriptions.csv_path)?;
        }

        Ok(())
    }

    pub fn broadcast_options(&self) -> BroadcastOptions {
        BroadcastOptions::from_config(self)
    }

    pub fn subscriptions_path(&self) -> Option<&str> {
        self.subscriptions.as_ref().map(|s| s.csv_path.as_str())
    }
}

impl ConfigProvider for TomlConfig {
    fn page_size(&self) -> usize {
        self.broadcast.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    fn dispatcher_capacity(&self) -> usize {
        self.broadcast
            .dispatcher_capacity
            .unwrap_or(DEFAULT_DISPATCHER_CAPACITY)
    }

    fn cache_ttl(&self) -> Duration {
        self.cache
            .ttl_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
