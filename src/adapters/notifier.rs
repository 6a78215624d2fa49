use crate::domain::model::Weather;
use crate::domain::ports::Notifier;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 寄給訂閱者的訊息內容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherReport {
    pub subject: String,
    pub body: String,
}

impl WeatherReport {
    pub fn success(city: &str, weather: &Weather, at: DateTime<Utc>) -> Self {
        Self {
            subject: format!("Weather update for {}", city),
            body: format!(
                "Current weather in {} ({}):\nTemperature: {:.1}°C\nHumidity: {}%\nConditions: {}",
                city,
                at.format("%Y-%m-%d %H:%M UTC"),
                weather.temperature,
                weather.humidity,
                weather.description
            ),
        }
    }

    pub fn failure(city: &str, at: DateTime<Utc>) -> Self {
        Self {
            subject: format!("Weather update for {} unavailable", city),
            body: format!(
                "We could not get the weather for {} at {}. We will try again with the next scheduled update.",
                city,
                at.format("%Y-%m-%d %H:%M UTC")
            ),
        }
    }
}

/// 只寫日誌的通知器，實際寄送交由外部傳輸層
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_success(&self, email: &str, city: &str, weather: &Weather) -> Result<()> {
        let report = WeatherReport::success(city, weather, Utc::now());
        tracing::info!("📨 To {}: {} | {}", email, report.subject, report.body.replace('\n', " | "));
        Ok(())
    }

    async fn send_failure(&self, email: &str, city: &str) -> Result<()> {
        let report = WeatherReport::failure(city, Utc::now());
        tracing::info!("📨 To {}: {} | {}", email, report.subject, report.body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_success_report_contents() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let report = WeatherReport::success("Kyiv", &Weather::new(21.5, 40, "Partly cloudy"), at);

        assert_eq!(report.subject, "Weather update for Kyiv");
        assert!(report.body.contains("2024-05-01 08:00 UTC"));
        assert!(report.body.contains("Temperature: 21.5°C"));
        assert!(report.body.contains("Humidity: 40%"));
        assert!(report.body.contains("Conditions: Partly cloudy"));
    }

    #[test]
    fn test_failure_report_contents() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let report = WeatherReport::failure("Atlantis", at);

        assert!(report.subject.contains("unavailable"));
        assert!(report.body.contains("Atlantis"));
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let notifier = LogNotifier::new();
        assert!(notifier
            .send_success("a@example.com", "Kyiv", &Weather::new(1.0, 2, "Snow"))
            .await
            .is_ok());
        tokio_test::assert_ok!(notifier.send_failure("a@example.com", "Kyiv").await);
    }
}
