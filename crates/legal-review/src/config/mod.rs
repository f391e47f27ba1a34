use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::Weekday;

use crate::workflows::review::calendar::{CalendarError, WorkingHoursConfig};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub working_hours: WorkingHoursConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat(raw))?,
            Err(_) => LogFormat::Compact,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            working_hours: load_working_hours()?,
        })
    }
}

fn load_working_hours() -> Result<WorkingHoursConfig, ConfigError> {
    let mut config = WorkingHoursConfig::default();

    if let Ok(raw) = env::var("APP_WORK_START_HOUR") {
        config.start_hour = parse_number("APP_WORK_START_HOUR", &raw)?;
    }
    if let Ok(raw) = env::var("APP_WORK_END_HOUR") {
        config.end_hour = parse_number("APP_WORK_END_HOUR", &raw)?;
    }
    if let Ok(raw) = env::var("APP_WORK_UTC_OFFSET_MINUTES") {
        config.utc_offset_minutes = parse_number("APP_WORK_UTC_OFFSET_MINUTES", &raw)?;
    }
    if let Ok(raw) = env::var("APP_WORK_DAYS") {
        config.working_days = parse_weekdays(&raw)?;
    }

    config.validate().map_err(ConfigError::WorkingHours)?;
    Ok(config)
}

fn parse_number<T: std::str::FromStr>(variable: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidNumber {
            variable,
            value: raw.to_string(),
        })
}

/// Comma-separated weekday names (`mon,tue` or `Monday, Tuesday`).
pub fn parse_weekdays(raw: &str) -> Result<Vec<Weekday>, ConfigError> {
    let mut days = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let day = entry
            .parse::<Weekday>()
            .map_err(|_| ConfigError::InvalidWeekday(entry.to_string()))?;
        if !days.contains(&day) {
            days.push(day);
        }
    }
    Ok(days)
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat(String),
    InvalidNumber { variable: &'static str, value: String },
    InvalidWeekday(String),
    WorkingHours(CalendarError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'json' (found '{value}')")
            }
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a whole number (found '{value}')")
            }
            ConfigError::InvalidWeekday(value) => {
                write!(f, "APP_WORK_DAYS contains an unknown weekday '{value}'")
            }
            ConfigError::WorkingHours(err) => write!(f, "invalid working hours: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::WorkingHours(source) => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for variable in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "APP_WORK_START_HOUR",
            "APP_WORK_END_HOUR",
            "APP_WORK_DAYS",
            "APP_WORK_UTC_OFFSET_MINUTES",
        ] {
            env::remove_var(variable);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.format, LogFormat::Compact);
        assert_eq!(config.working_hours, WorkingHoursConfig::default());
        assert_eq!(config.working_hours.daily_hours(), 9);
    }

    #[test]
    fn working_calendar_reads_env_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_WORK_START_HOUR", "9");
        env::set_var("APP_WORK_END_HOUR", "18");
        env::set_var("APP_WORK_DAYS", "sun, mon,Tuesday,wed,thu");
        env::set_var("APP_WORK_UTC_OFFSET_MINUTES", "-300");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        let hours = config.working_hours;
        assert_eq!(hours.start_hour, 9);
        assert_eq!(hours.end_hour, 18);
        assert_eq!(hours.utc_offset_minutes, -300);
        assert_eq!(
            hours.working_days,
            vec![
                Weekday::Sun,
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu
            ]
        );
    }

    #[test]
    fn rejects_inverted_working_window() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_WORK_START_HOUR", "17");
        env::set_var("APP_WORK_END_HOUR", "8");
        let result = AppConfig::load();
        reset_env();

        match result {
            Err(ConfigError::WorkingHours(CalendarError::EmptyWindow { start: 17, end: 8 })) => {}
            other => panic!("expected empty window error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_weekday() {
        assert!(matches!(
            parse_weekdays("mon,funday"),
            Err(ConfigError::InvalidWeekday(day)) if day == "funday"
        ));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        reset_env();
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }
}
