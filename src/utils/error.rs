use thiserror::Error;

/// 城市天氣解析失敗的分類
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("city not found: {city}")]
    NotFound { city: String },

    #[error("weather source '{source_name}' unavailable: {message}")]
    Transient {
        source_name: String,
        message: String,
    },
}

impl ResolutionError {
    pub fn transient(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// 單一解析階段的結果錯誤；`CacheMiss` 只在鏈內部出現
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("cache miss for key {key}")]
    CacheMiss { key: String },

    #[error("cache error: {message}")]
    Cache { message: String },

    #[error(transparent)]
    Origin(#[from] ResolutionError),
}

impl StageError {
    /// 鏈全部失敗時，將最後一個階段的錯誤轉為對外分類
    pub fn reclassify(self, stage: &str) -> ResolutionError {
        match self {
            StageError::Origin(err) => err,
            StageError::CacheMiss { key } => {
                ResolutionError::transient(stage, format!("no cached value for {}", key))
            }
            StageError::Cache { message } => ResolutionError::transient(stage, message),
        }
    }
}

#[derive(Error, Debug)]
pub enum BroadcastError {
    #[error("Subscriber page fetch failed after cursor {cursor}: {message}")]
    PageFetch { cursor: u64, message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Notification failed: {message}")]
    Notifier { message: String },

    #[error("Dispatcher unavailable: {message}")]
    Dispatcher { message: String },

    #[error("API request failed: {0}")]
    Api(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BroadcastError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BroadcastError::Cache { .. } | BroadcastError::Notifier { .. } => ErrorSeverity::Low,
            BroadcastError::Api(_) => ErrorSeverity::Medium,
            BroadcastError::PageFetch { .. }
            | BroadcastError::Dispatcher { .. }
            | BroadcastError::Csv(_) => ErrorSeverity::High,
            BroadcastError::Io(_)
            | BroadcastError::ConfigValidationError { .. }
            | BroadcastError::InvalidConfigValueError { .. }
            | BroadcastError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BroadcastError::ConfigValidationError { field, .. }
            | BroadcastError::InvalidConfigValueError { field, .. }
            | BroadcastError::MissingConfigError { field } => {
                format!("Configuration problem in '{}': {}", field, self)
            }
            BroadcastError::Csv(_) => format!("Could not read subscriptions: {}", self),
            BroadcastError::Io(_) => format!("File system error: {}", self),
            _ => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.severity() {
            ErrorSeverity::Low => "No action needed; the next run will try again",
            ErrorSeverity::Medium => "Check the weather provider credentials and network access",
            ErrorSeverity::High => "Check the subscription source data",
            ErrorSeverity::Critical => "Fix the configuration file and run again",
        }
    }

    /// CLI 結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, BroadcastError>;
