use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use weather_broadcast::adapters::{
    origins::build_origins, InMemoryCache, InMemoryMetrics, InMemorySubscriptionSource,
    LogNotifier,
};
use weather_broadcast::config::{CliConfig, LogFormat};
use weather_broadcast::domain::ports::ConfigProvider;
use weather_broadcast::utils::{
    logger,
    validation::{validate_required_field, Validate},
};
use weather_broadcast::{BroadcastCoordinator, BroadcastError, CityWeatherResolver, TomlConfig};

fn build_coordinator(
    config: &TomlConfig,
    metrics: Arc<InMemoryMetrics>,
) -> weather_broadcast::Result<BroadcastCoordinator> {
    let subscriptions = validate_required_field("subscriptions", &config.subscriptions)?;
    let source = InMemorySubscriptionSource::from_csv_path(&subscriptions.csv_path)?;

    let mut builder = CityWeatherResolver::builder(Arc::new(InMemoryCache::new()), metrics)
        .ttl(config.cache_ttl());
    for origin in build_origins(&config.origins)? {
        builder = builder.origin(origin);
    }
    let resolver = builder.build();
    tracing::info!("🔗 Resolution chain: {}", resolver.stage_names().join(" → "));

    BroadcastCoordinator::new(
        Arc::new(source),
        Arc::new(resolver),
        Arc::new(LogNotifier::new()),
        config.broadcast_options(),
    )
}

fn exit_with(e: &BroadcastError) -> ! {
    tracing::error!("❌ {} (Severity: {:?})", e, e.severity());
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("🚀 Starting weather-broadcast ({})", cli.frequency);
    tracing::info!("📁 Loading configuration from: {}", cli.config);

    let mut config = match TomlConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    // 應用命令列覆蓋設定
    if let Some(page_size) = cli.page_size {
        config.broadcast.page_size = Some(page_size);
        tracing::info!("🔧 Page size overridden to: {}", page_size);
    }
    if let Some(capacity) = cli.capacity {
        config.broadcast.dispatcher_capacity = Some(capacity);
        tracing::info!("🔧 Dispatcher capacity overridden to: {}", capacity);
    }

    if let Err(e) = config.validate() {
        exit_with(&e);
    }

    let metrics = Arc::new(InMemoryMetrics::new());
    let coordinator = match build_coordinator(&config, metrics.clone()) {
        Ok(coordinator) => coordinator,
        Err(e) => exit_with(&e),
    };

    let summary = coordinator.broadcast(cli.frequency).await;
    metrics.log_summary();

    if cli.verbose {
        let json = serde_json::to_string_pretty(&summary).context("serializing broadcast summary")?;
        tracing::debug!("Broadcast summary: {}", json);
    }

    if summary.aborted {
        eprintln!(
            "⚠️ Broadcast stopped early after {} notifications",
            summary.notifications_dispatched
        );
        std::process::exit(1);
    }

    println!(
        "✅ Sent {} {} weather notifications",
        summary.notifications_dispatched, summary.frequency
    );
    Ok(())
}
