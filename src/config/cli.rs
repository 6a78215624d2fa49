use crate::domain::model::Frequency;
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "weather-broadcast")]
#[command(about = "Send one round of weather updates to confirmed subscribers")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "broadcast.toml")]
    pub config: String,

    /// Delivery frequency to broadcast (daily or hourly)
    #[arg(short, long)]
    pub frequency: Frequency,

    /// Override broadcast.page_size from config
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Override broadcast.dispatcher_capacity from config
    #[arg(long)]
    pub capacity: Option<usize>,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
