use std::path::PathBuf;

use chrono_tz::Tz;
use clap::Parser;
use serde::Deserialize;

use crate::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "config/spese.toml";
const ENV_PREFIX: &str = "SPESE";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub timezone: String,
    pub log_level: String,
    pub default_route: String,
    pub chart_months: usize,
    pub chart_days: usize,
    pub chart_weeks: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            timezone: "Europe/Rome".to_string(),
            log_level: "info".to_string(),
            default_route: router::DEFAULT_PATH.to_string(),
            chart_months: 6,
            chart_days: 7,
            chart_weeks: 4,
        }
    }
}

impl AppConfig {
    /// Resolves the configured IANA timezone name.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| AppError::Timezone(self.timezone.clone()))
    }
}

#[derive(Debug, Default, Parser)]
#[command(name = "spese", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override the directory holding the JSON data files.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Override timezone (IANA name).
    #[arg(long)]
    timezone: Option<String>,
    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
    /// Override the view shown for an empty fragment.
    #[arg(long)]
    default_route: Option<String>,
}

pub fn load() -> Result<AppConfig> {
    load_from(Args::parse())
}

fn load_from(args: Args) -> Result<AppConfig> {
    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(data_dir) = args.data_dir {
        settings.data_dir = data_dir;
    }
    if let Some(timezone) = args.timezone {
        settings.timezone = timezone;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if let Some(default_route) = args.default_route {
        settings.default_route = default_route;
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args {
            config: Some(dir.path().join("absent").display().to_string()),
            ..Args::default()
        };
        let settings = load_from(args).unwrap();
        assert_eq!(settings.timezone, "Europe/Rome");
        assert_eq!(settings.default_route, "dashboard");
        assert_eq!(settings.chart_months, 6);
        assert_eq!(settings.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn file_values_then_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spese.toml");
        fs::write(
            &path,
            "timezone = \"America/New_York\"\nchart_days = 14\ndefault_route = \"stats\"\n",
        )
        .unwrap();

        let args = Args {
            config: Some(path.display().to_string()),
            default_route: Some("budgets".to_string()),
            ..Args::default()
        };
        let settings = load_from(args).unwrap();
        assert_eq!(settings.timezone, "America/New_York");
        assert_eq!(settings.chart_days, 14);
        assert_eq!(settings.chart_weeks, 4);
        assert_eq!(settings.default_route, "budgets");
    }

    #[test]
    fn timezone_is_validated() {
        let mut settings = AppConfig::default();
        assert_eq!(settings.tz().unwrap(), chrono_tz::Europe::Rome);

        settings.timezone = "Mars/Olympus".to_string();
        assert!(matches!(settings.tz(), Err(AppError::Timezone(name)) if name == "Mars/Olympus"));
    }
}
