use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::workflows::recruitment::delivery::{DeliveryStrategy, MailClientKind};
use crate::workflows::recruitment::files::{FileLimits, ImageSettings};
use crate::workflows::recruitment::validation::ValidationRules;

pub const DEFAULT_MAIL_API_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";
pub const DEFAULT_MAIL_API_PAYLOAD_CEILING: usize = 50_000;
pub const DEFAULT_POSITIONS: &str = "Lascar,Helper";

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
    pub mail: MailConfig,
    pub intake: IntakeConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "127.0.0.1");
        let port = var_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var_or("APP_LOG_LEVEL", "info");

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            mail: MailConfig::load()?,
            intake: IntakeConfig::load()?,
        })
    }
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Outbound mail settings. Identifiers stay optional here; the gateway
/// builder reports the missing ones as deployment defects.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub recipient: Option<String>,
    pub strategy: DeliveryStrategy,
    pub fallback: Option<DeliveryStrategy>,
    pub relay_endpoint: Option<String>,
    pub mail_api: MailApiConfig,
    pub timeout: Duration,
    pub mail_client: MailClientKind,
}

impl MailConfig {
    fn load() -> Result<Self, ConfigError> {
        let strategy = parse_strategy("DELIVERY_STRATEGY", &var_or("DELIVERY_STRATEGY", "relay"))?;
        let fallback = match optional_var("DELIVERY_FALLBACK") {
            Some(raw) => Some(parse_strategy("DELIVERY_FALLBACK", &raw)?),
            None => None,
        };

        let timeout_secs = parse_var("DELIVERY_TIMEOUT_SECS", 30u64)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                variable: "DELIVERY_TIMEOUT_SECS",
                value: timeout_secs.to_string(),
            });
        }
        let mail_client = match optional_var("MAIL_CLIENT") {
            Some(raw) => MailClientKind::parse(&raw).ok_or(ConfigError::InvalidValue {
                variable: "MAIL_CLIENT",
                value: raw,
            })?,
            None => MailClientKind::default(),
        };

        Ok(Self {
            recipient: optional_var("MAIL_RECIPIENT"),
            strategy,
            fallback,
            relay_endpoint: optional_var("MAIL_RELAY_ENDPOINT"),
            mail_api: MailApiConfig {
                endpoint: var_or("MAIL_API_ENDPOINT", DEFAULT_MAIL_API_ENDPOINT),
                service_id: optional_var("MAIL_API_SERVICE_ID"),
                template_id: optional_var("MAIL_API_TEMPLATE_ID"),
                public_key: optional_var("MAIL_API_PUBLIC_KEY"),
                payload_ceiling: parse_var(
                    "MAIL_API_PAYLOAD_CEILING",
                    DEFAULT_MAIL_API_PAYLOAD_CEILING,
                )?,
            },
            timeout: Duration::from_secs(timeout_secs),
            mail_client,
        })
    }
}

/// Identifiers for the hosted mail-API service.
#[derive(Debug, Clone)]
pub struct MailApiConfig {
    pub endpoint: String,
    pub service_id: Option<String>,
    pub template_id: Option<String>,
    pub public_key: Option<String>,
    pub payload_ceiling: usize,
}

/// Form-side limits: file ceilings, recompression, positions and optional fields.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub file_limits: FileLimits,
    pub image: ImageSettings,
    pub positions: Vec<String>,
    pub rules: ValidationRules,
}

impl IntakeConfig {
    fn load() -> Result<Self, ConfigError> {
        let defaults = FileLimits::default();
        let file_limits = FileLimits {
            photo_max_bytes: parse_var("FILE_PHOTO_MAX_BYTES", defaults.photo_max_bytes)?,
            document_max_bytes: parse_var("FILE_DOCUMENT_MAX_BYTES", defaults.document_max_bytes)?,
        };

        let image_defaults = ImageSettings::default();
        let quality = parse_var("IMAGE_JPEG_QUALITY", image_defaults.jpeg_quality)?;
        if !(1..=100).contains(&quality) {
            return Err(ConfigError::InvalidValue {
                variable: "IMAGE_JPEG_QUALITY",
                value: quality.to_string(),
            });
        }
        let image = ImageSettings {
            max_dimension: parse_var("IMAGE_MAX_DIMENSION", image_defaults.max_dimension)?,
            jpeg_quality: quality,
        };

        let positions = split_list(&var_or("APPLICANT_POSITIONS", DEFAULT_POSITIONS));
        if positions.is_empty() {
            return Err(ConfigError::InvalidValue {
                variable: "APPLICANT_POSITIONS",
                value: String::new(),
            });
        }

        let rules = ValidationRules {
            require_national_id: parse_flag("APPLICANT_REQUIRE_NATIONAL_ID", true)?,
            require_postal_code: parse_flag("APPLICANT_REQUIRE_POSTAL_CODE", true)?,
            require_city: parse_flag("APPLICANT_REQUIRE_CITY", true)?,
        };

        Ok(Self {
            file_limits,
            image,
            positions,
            rules,
        })
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            file_limits: FileLimits::default(),
            image: ImageSettings::default(),
            positions: split_list(DEFAULT_POSITIONS),
            rules: ValidationRules::default(),
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match optional_var(name) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
            variable: name,
            value: raw,
        }),
        None => Ok(default),
    }
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match optional_var(name) {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                variable: name,
                value: raw,
            }),
        },
        None => Ok(default),
    }
}

fn parse_strategy(name: &'static str, raw: &str) -> Result<DeliveryStrategy, ConfigError> {
    DeliveryStrategy::parse(raw).ok_or_else(|| ConfigError::InvalidValue {
        variable: name,
        value: raw.to_string(),
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { variable: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { variable, value } => {
                write!(f, "{variable} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort | ConfigError::InvalidValue { .. } => None,
        }
    }
}
