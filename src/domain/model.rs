use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 訂閱者選擇的寄送頻率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Hourly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Hourly => "hourly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "hourly" => Ok(Frequency::Hourly),
            other => Err(format!(
                "unknown frequency '{}', expected 'daily' or 'hourly'",
                other
            )),
        }
    }
}

/// 訂閱資料由訂閱儲存層擁有，這裡只讀
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: u64,
    pub email: String,
    pub city: String,
    pub frequency: Frequency,
    pub confirmed: bool,
}

impl Subscription {
    pub fn is_eligible(&self, frequency: Frequency) -> bool {
        self.confirmed && self.frequency == frequency
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub temperature: f64,
    pub humidity: u8,
    pub description: String,
}

impl Weather {
    pub fn new(temperature: f64, humidity: u8, description: impl Into<String>) -> Self {
        Self {
            temperature,
            humidity,
            description: description.into(),
        }
    }
}

/// 單次廣播中某城市的解析結果
#[derive(Debug, Clone, PartialEq)]
pub enum CityOutcome {
    Available(Weather),
    Unavailable,
}

impl CityOutcome {
    pub fn weather(&self) -> Option<&Weather> {
        match self {
            CityOutcome::Available(weather) => Some(weather),
            CityOutcome::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, CityOutcome::Available(_))
    }
}
