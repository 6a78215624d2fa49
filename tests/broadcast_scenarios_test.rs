use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use weather_broadcast::adapters::{InMemoryCache, InMemoryMetrics, InMemorySubscriptionSource};
use weather_broadcast::domain::ports::{Notifier, SubscriptionSource, WeatherOrigin, WeatherResolver};
use weather_broadcast::{
    BroadcastCoordinator, BroadcastError, BroadcastOptions, CityWeatherResolver, Frequency,
    ResolutionError, Result, Subscription, Weather,
};

#[derive(Debug, Clone, PartialEq)]
enum Sent {
    Success { email: String, city: String },
    Failure { email: String, city: String },
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
    delay: Option<Duration>,
}

impl RecordingNotifier {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    async fn record(&self, sent: Sent) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent.lock().await.push(sent);
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_success(&self, email: &str, city: &str, _weather: &Weather) -> Result<()> {
        self.record(Sent::Success {
            email: email.to_string(),
            city: city.to_string(),
        })
        .await;
        Ok(())
    }

    async fn send_failure(&self, email: &str, city: &str) -> Result<()> {
        self.record(Sent::Failure {
            email: email.to_string(),
            city: city.to_string(),
        })
        .await;
        Ok(())
    }
}

struct CountingResolver {
    inner: CityWeatherResolver,
    calls: Mutex<HashMap<String, usize>>,
}

#[async_trait]
impl WeatherResolver for CountingResolver {
    async fn resolve(&self, city: &str) -> std::result::Result<Weather, ResolutionError> {
        *self.calls.lock().await.entry(city.to_string()).or_insert(0) += 1;
        self.inner.resolve(city).await
    }
}

struct ScriptedOrigin {
    name: &'static str,
    weather: HashMap<&'static str, Weather>,
    calls: AtomicUsize,
}

#[async_trait]
impl WeatherOrigin for ScriptedOrigin {
    fn name(&self) -> &str {
        self.name
    }

    async fn get_weather(&self, city: &str) -> std::result::Result<Weather, ResolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.weather
            .get(city)
            .cloned()
            .ok_or_else(|| ResolutionError::transient(self.name, "upstream timeout"))
    }
}

fn subscription(id: u64, city: &str, frequency: Frequency) -> Subscription {
    Subscription {
        id,
        email: format!("subscriber{}@example.com", id),
        city: city.to_string(),
        frequency,
        confirmed: true,
    }
}

fn counting_resolver(origins: Vec<Arc<dyn WeatherOrigin>>) -> Arc<CountingResolver> {
    let mut builder = CityWeatherResolver::builder(
        Arc::new(InMemoryCache::new()),
        Arc::new(InMemoryMetrics::new()),
    );
    for origin in origins {
        builder = builder.origin(origin);
    }
    Arc::new(CountingResolver {
        inner: builder.build(),
        calls: Mutex::new(HashMap::new()),
    })
}

fn kyiv_only_origin() -> Arc<ScriptedOrigin> {
    Arc::new(ScriptedOrigin {
        name: "weatherapi",
        weather: HashMap::from([("Kyiv", Weather::new(18.0, 55, "Sunny"))]),
        calls: AtomicUsize::new(0),
    })
}

#[tokio::test]
async fn test_three_daily_subscribers_two_cities() {
    let source = Arc::new(InMemorySubscriptionSource::new(vec![
        subscription(1, "Kyiv", Frequency::Daily),
        subscription(2, "Lviv", Frequency::Daily),
        subscription(3, "Kyiv", Frequency::Daily),
        subscription(4, "Kyiv", Frequency::Hourly),
    ]));
    let resolver = counting_resolver(vec![kyiv_only_origin()]);
    let notifier = Arc::new(RecordingNotifier::default());

    let coordinator = BroadcastCoordinator::new(
        source,
        resolver.clone(),
        notifier.clone(),
        BroadcastOptions {
            page_size: 3,
            dispatcher_capacity: 1,
        },
    )
    .unwrap();

    let summary = coordinator.broadcast(Frequency::Daily).await;

    let calls = resolver.calls.lock().await;
    assert_eq!(calls.values().sum::<usize>(), 2);
    assert_eq!(calls.get("Kyiv"), Some(&1));
    assert_eq!(calls.get("Lviv"), Some(&1));

    let sent = notifier.sent.lock().await;
    assert_eq!(sent.len(), 3);
    for id in 1..=3 {
        let email = format!("subscriber{}@example.com", id);
        let count = sent
            .iter()
            .filter(|s| match s {
                Sent::Success { email: e, .. } | Sent::Failure { email: e, .. } => *e == email,
            })
            .count();
        assert_eq!(count, 1, "subscriber {} notified {} times", id, count);
    }
    assert!(sent.contains(&Sent::Failure {
        email: "subscriber2@example.com".to_string(),
        city: "Lviv".to_string(),
    }));
    assert_eq!(summary.notifications_dispatched, 3);
    assert_eq!(summary.cities_unavailable, 1);
}

#[tokio::test]
async fn test_failed_city_resolved_once_and_everyone_gets_failure() {
    let source = Arc::new(InMemorySubscriptionSource::new(
        (1..=4)
            .map(|id| subscription(id, "Atlantis", Frequency::Hourly))
            .collect(),
    ));
    let first = Arc::new(ScriptedOrigin {
        name: "weatherapi",
        weather: HashMap::new(),
        calls: AtomicUsize::new(0),
    });
    let second = Arc::new(ScriptedOrigin {
        name: "openweathermap",
        weather: HashMap::new(),
        calls: AtomicUsize::new(0),
    });
    let resolver = counting_resolver(vec![first.clone(), second.clone()]);
    let notifier = Arc::new(RecordingNotifier::default());

    let coordinator = BroadcastCoordinator::new(
        source,
        resolver.clone(),
        notifier.clone(),
        BroadcastOptions {
            page_size: 2,
            dispatcher_capacity: 2,
        },
    )
    .unwrap();

    let summary = coordinator.broadcast(Frequency::Hourly).await;

    assert_eq!(resolver.calls.lock().await.get("Atlantis"), Some(&1));
    assert_eq!(first.calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.calls.load(Ordering::SeqCst), 1);

    let sent = notifier.sent.lock().await;
    assert_eq!(sent.len(), 4);
    assert!(sent.iter().all(|s| matches!(s, Sent::Failure { .. })));
    assert!(!summary.aborted);
}

struct FailingSecondPage {
    calls: AtomicUsize,
}

#[async_trait]
impl SubscriptionSource for FailingSecondPage {
    async fn list_confirmed(
        &self,
        frequency: Frequency,
        _cursor: u64,
        _page_size: usize,
    ) -> Result<Vec<Subscription>> {
        match self.calls.fetch_add(1, Ordering::SeqCst) {
            0 => Ok(vec![
                subscription(1, "Kyiv", frequency),
                subscription(2, "Kyiv", frequency),
            ]),
            _ => Err(BroadcastError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "database connection reset",
            ))),
        }
    }
}

#[tokio::test]
async fn test_page_fetch_error_stops_pagination_but_awaits_sent_tasks() {
    let source = Arc::new(FailingSecondPage {
        calls: AtomicUsize::new(0),
    });
    let notifier = Arc::new(RecordingNotifier::with_delay(Duration::from_millis(20)));

    let coordinator = BroadcastCoordinator::new(
        source.clone(),
        counting_resolver(vec![kyiv_only_origin()]),
        notifier.clone(),
        BroadcastOptions {
            page_size: 2,
            dispatcher_capacity: 2,
        },
    )
    .unwrap();

    let summary = coordinator.broadcast(Frequency::Daily).await;

    assert!(summary.aborted);
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    // 兩個通知都在 broadcast 返回前完成
    assert_eq!(notifier.sent.lock().await.len(), 2);
    assert_eq!(notifier.running.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_notifications_respect_dispatcher_capacity() {
    let source = Arc::new(InMemorySubscriptionSource::new(
        (1..=20)
            .map(|id| subscription(id, "Kyiv", Frequency::Hourly))
            .collect(),
    ));
    let notifier = Arc::new(RecordingNotifier::with_delay(Duration::from_millis(10)));

    let coordinator = BroadcastCoordinator::new(
        source,
        counting_resolver(vec![kyiv_only_origin()]),
        notifier.clone(),
        BroadcastOptions {
            page_size: 7,
            dispatcher_capacity: 3,
        },
    )
    .unwrap();

    let summary = coordinator.broadcast(Frequency::Hourly).await;

    assert_eq!(notifier.sent.lock().await.len(), 20);
    assert!(notifier.max_running.load(Ordering::SeqCst) <= 3);
    assert!(summary.peak_concurrency <= 3);
    assert_eq!(summary.pages_fetched, 3);
}

#[tokio::test]
async fn test_empty_subscriber_set_does_nothing() {
    let resolver = counting_resolver(vec![kyiv_only_origin()]);
    let notifier = Arc::new(RecordingNotifier::default());

    let coordinator = BroadcastCoordinator::new(
        Arc::new(InMemorySubscriptionSource::new(vec![subscription(
            1,
            "Kyiv",
            Frequency::Daily,
        )])),
        resolver.clone(),
        notifier.clone(),
        BroadcastOptions::default(),
    )
    .unwrap();

    let summary = coordinator.broadcast(Frequency::Hourly).await;

    assert!(resolver.calls.lock().await.is_empty());
    assert!(notifier.sent.lock().await.is_empty());
    assert_eq!(summary.pages_fetched, 0);
    assert!(!summary.aborted);
}

#[tokio::test]
async fn test_shared_cache_serves_the_next_run() {
    let origin = kyiv_only_origin();
    let resolver = counting_resolver(vec![origin.clone()]);
    let notifier = Arc::new(RecordingNotifier::default());

    let coordinator = BroadcastCoordinator::new(
        Arc::new(InMemorySubscriptionSource::new(vec![
            subscription(1, "Kyiv", Frequency::Hourly),
            subscription(2, "Kyiv", Frequency::Hourly),
        ])),
        resolver.clone(),
        notifier.clone(),
        BroadcastOptions::default(),
    )
    .unwrap();

    coordinator.broadcast(Frequency::Hourly).await;
    coordinator.broadcast(Frequency::Hourly).await;

    // 每次執行各解析一次，但第二次由快取回應
    assert_eq!(resolver.calls.lock().await.get("Kyiv"), Some(&2));
    assert_eq!(origin.calls.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.sent.lock().await.len(), 4);
}

#[derive(Default)]
struct RejectingNotifier {
    attempts: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RejectingNotifier {
    async fn send_success(&self, email: &str, _city: &str, _weather: &Weather) -> Result<()> {
        self.attempts.lock().await.push(email.to_string());
        Err(BroadcastError::Notifier {
            message: "mail relay refused the message".to_string(),
        })
    }

    async fn send_failure(&self, email: &str, _city: &str) -> Result<()> {
        self.attempts.lock().await.push(email.to_string());
        Err(BroadcastError::Notifier {
            message: "mail relay refused the message".to_string(),
        })
    }
}

#[tokio::test]
async fn test_notifier_errors_do_not_stop_other_subscribers() {
    let source = Arc::new(InMemorySubscriptionSource::new(vec![
        subscription(1, "Kyiv", Frequency::Daily),
        subscription(2, "Lviv", Frequency::Daily),
        subscription(3, "Kyiv", Frequency::Daily),
        subscription(4, "Lviv", Frequency::Daily),
        subscription(5, "Kyiv", Frequency::Daily),
    ]));
    let notifier = Arc::new(RejectingNotifier::default());

    let coordinator = BroadcastCoordinator::new(
        source,
        counting_resolver(vec![kyiv_only_origin()]),
        notifier.clone(),
        BroadcastOptions {
            page_size: 2,
            dispatcher_capacity: 1,
        },
    )
    .unwrap();

    let summary = coordinator.broadcast(Frequency::Daily).await;

    let mut attempts = notifier.attempts.lock().await.clone();
    attempts.sort();
    let expected: Vec<String> = (1..=5)
        .map(|id| format!("subscriber{}@example.com", id))
        .collect();
    assert_eq!(attempts, expected);
    assert_eq!(summary.notifications_dispatched, 5);
    assert_eq!(summary.pages_fetched, 3);
    assert!(!summary.aborted);
}
