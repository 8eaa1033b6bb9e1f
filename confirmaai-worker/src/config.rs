/// Worker configuration
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 5)
/// - `WHATSAPP_GATEWAY`: `evolution` or `mock` (default: evolution)
/// - `EVOLUTION_API_URL`: Evolution API base URL
/// - `EVOLUTION_API_KEY`: Evolution API key
/// - `EVOLUTION_INSTANCE_NAME`: WhatsApp instance to send from
/// - `EVOLUTION_TIMEOUT_SECS`: Request timeout (default: 15)
/// - `SCHEDULER_INTERVAL_SECS`: Seconds between runs (default: 1800)
/// - `SCHEDULER_RUN_ON_START`: Run once right after startup (default: true)
/// - `CLINIC_UTC_OFFSET_HOURS`: Clinic timezone offset (default: -3)
///
/// Missing Evolution settings don't stop the worker; every send then fails
/// with a configuration error.

use confirmaai_shared::clinic_time::{ClinicTime, DEFAULT_UTC_OFFSET_HOURS};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_INTERVAL_SECS: u64 = 1800;
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database: DatabaseConfig,

    pub gateway: GatewayConfig,

    pub scheduler: SchedulerConfig,

    pub clinic_utc_offset_hours: i32,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,

    pub max_connections: u32,
}

/// Which WhatsApp gateway to send through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    Evolution,
    /// Logs and records messages instead of sending them
    Mock,
}

impl FromStr for GatewayKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "evolution" => Ok(GatewayKind::Evolution),
            "mock" => Ok(GatewayKind::Mock),
            other => Err(format!("unknown gateway '{}', expected evolution or mock", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub kind: GatewayKind,

    pub evolution: Option<EvolutionConfig>,

    pub timeout_secs: u64,
}

/// Complete Evolution API settings; absent unless all three are set
#[derive(Debug, Clone)]
pub struct EvolutionConfig {
    pub base_url: String,

    pub api_key: String,

    pub instance_name: String,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval_secs: u64,

    pub run_on_start: bool,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            interval_secs: DEFAULT_INTERVAL_SECS,
            run_on_start: true,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl WorkerConfig {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing, a variable can't be
    /// parsed, the interval is zero or the clinic offset is out of range.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let evolution = match (
            non_empty("EVOLUTION_API_URL"),
            non_empty("EVOLUTION_API_KEY"),
            non_empty("EVOLUTION_INSTANCE_NAME"),
        ) {
            (Some(base_url), Some(api_key), Some(instance_name)) => Some(EvolutionConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
                instance_name,
            }),
            _ => None,
        };

        let config = WorkerConfig {
            database: DatabaseConfig {
                url: database_url,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5)?,
            },
            gateway: GatewayConfig {
                kind: env_or("WHATSAPP_GATEWAY", GatewayKind::Evolution)?,
                evolution,
                timeout_secs: env_or("EVOLUTION_TIMEOUT_SECS", DEFAULT_GATEWAY_TIMEOUT_SECS)?,
            },
            scheduler: SchedulerConfig {
                interval_secs: env_or("SCHEDULER_INTERVAL_SECS", DEFAULT_INTERVAL_SECS)?,
                run_on_start: env_or("SCHEDULER_RUN_ON_START", true)?,
            },
            clinic_utc_offset_hours: env_or("CLINIC_UTC_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS)?,
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.scheduler.interval_secs == 0 {
            anyhow::bail!("SCHEDULER_INTERVAL_SECS must be greater than 0");
        }
        if self.gateway.timeout_secs == 0 {
            anyhow::bail!("EVOLUTION_TIMEOUT_SECS must be greater than 0");
        }
        self.clinic_time()?;
        Ok(())
    }

    pub fn clinic_time(&self) -> anyhow::Result<ClinicTime> {
        ClinicTime::from_hours(self.clinic_utc_offset_hours).ok_or_else(|| {
            anyhow::anyhow!(
                "CLINIC_UTC_OFFSET_HOURS must be between -23 and 23, got {}",
                self.clinic_utc_offset_hours
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorkerConfig {
        WorkerConfig {
            database: DatabaseConfig {
                url: "postgresql://localhost/confirmaai".to_string(),
                max_connections: 5,
            },
            gateway: GatewayConfig {
                kind: GatewayKind::Mock,
                evolution: None,
                timeout_secs: DEFAULT_GATEWAY_TIMEOUT_SECS,
            },
            scheduler: SchedulerConfig::default(),
            clinic_utc_offset_hours: -3,
        }
    }

    #[test]
    fn test_gateway_kind_parsing() {
        assert_eq!("mock".parse::<GatewayKind>(), Ok(GatewayKind::Mock));
        assert_eq!(" Evolution ".parse::<GatewayKind>(), Ok(GatewayKind::Evolution));
        assert!("twilio".parse::<GatewayKind>().is_err());
    }

    #[test]
    fn test_scheduler_defaults() {
        let scheduler = SchedulerConfig::default();
        assert_eq!(scheduler.interval(), Duration::from_secs(30 * 60));
        assert!(scheduler.run_on_start);
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());

        let mut config = sample();
        config.scheduler.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = sample();
        config.clinic_utc_offset_hours = 30;
        assert!(config.validate().is_err());
    }
}
