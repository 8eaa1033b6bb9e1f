/// Configuration management for the API server
///
/// Configuration is read from environment variables (a `.env` file is
/// loaded first when present).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: *)
/// - `PRODUCTION`: Enables HSTS when `true` (default: false)
/// - `JWT_SECRET`: Secret key for JWT signing, at least 32 characters (required)
/// - `EVOLUTION_API_KEY`: Key the WhatsApp gateway sends with webhooks
/// - `CLINIC_UTC_OFFSET_HOURS`: Clinic timezone offset (default: -3)
/// - `RUST_LOG`: Log filter (default: confirmaai_api=debug,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use confirmaai_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use confirmaai_shared::clinic_time::{ClinicTime, DEFAULT_UTC_OFFSET_HOURS};
use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,

    pub database: DatabaseConfig,

    pub jwt: JwtConfig,

    pub webhook: WebhookConfig,

    pub clinic: ClinicConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// Allowed CORS origins; `*` allows any origin
    pub cors_origins: Vec<String>,

    /// Production mode (enables HSTS)
    pub production: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HS256 signing secret, at least 32 bytes
    ///
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,
}

/// Inbound WhatsApp webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Expected `apikey` / `x-api-key` header value
    ///
    /// When unset every webhook call is rejected.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicConfig {
    /// Whole-hour UTC offset used for dates shown to clinics
    pub utc_offset_hours: i32,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
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

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - A numeric or boolean variable can't be parsed
    /// - `CLINIC_UTC_OFFSET_HOURS` is outside -23..=23
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let webhook_api_key = env::var("EVOLUTION_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let config = Self {
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("API_PORT", 8080)?,
                cors_origins,
                production: env_or("PRODUCTION", false)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            jwt: JwtConfig { secret: jwt_secret },
            webhook: WebhookConfig {
                api_key: webhook_api_key,
            },
            clinic: ClinicConfig {
                utc_offset_hours: env_or("CLINIC_UTC_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS)?,
            },
        };

        config.clinic_time()?;

        Ok(config)
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Clinic timezone built from `clinic.utc_offset_hours`
    pub fn clinic_time(&self) -> anyhow::Result<ClinicTime> {
        ClinicTime::from_hours(self.clinic.utc_offset_hours).ok_or_else(|| {
            anyhow::anyhow!(
                "CLINIC_UTC_OFFSET_HOURS must be between -23 and 23, got {}",
                self.clinic.utc_offset_hours
            )
        })
    }
}
