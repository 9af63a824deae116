//! Server configuration loaded from environment variables.
//!
//! Configuration is read once at start-up and passed explicitly to the
//! components that need it. Secrets have no in-code defaults.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SUMMIT_PUBLIC_BASE_URL` - Public URL embedded in QR codes (e.g., `https://summit.qaoncloud.com`)
//!
//! ## Optional
//! - `SUMMIT_DATABASE_URL` - `SQLite` connection string (fallback `DATABASE_URL`,
//!   default `sqlite://registrations.db`)
//! - `SUMMIT_HOST` - Bind address (default: 127.0.0.1)
//! - `SUMMIT_PORT` - Listen port (default: 3000)
//! - `SUMMIT_STATIC_DIR` - Static file directory (default: `crates/server/static`)
//! - `SUMMIT_QR_DIR` - Generated QR code directory (default: `<static dir>/qrcodes`)
//! - `SUMMIT_ALLOWED_EMAIL_DOMAINS` - Comma-separated allow-list (default: `qaoncloud.com`)
//!
//! ## Email delivery (first match wins)
//! - `SENDGRID_API_KEY` - `SendGrid` API key; optional `SENDGRID_API_BASE`
//! - `SMTP_HOST`, `SMTP_PORT` (default 587), `SMTP_USERNAME`, `SMTP_PASSWORD`
//! - Neither set: confirmations are only logged
//! - `MAIL_FROM_ADDRESS` - Sender address (required with `SendGrid` or SMTP)
//! - `MAIL_FROM_NAME` - Sender display name (default: `Summit Team`)
//!
//! ## Error tracking
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use summit_core::{DomainAllowList, Email};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_DATABASE_URL: &str = "sqlite://registrations.db";
const DEFAULT_STATIC_DIR: &str = "crates/server/static";
const DEFAULT_ALLOWED_DOMAINS: &str = "qaoncloud.com";
const DEFAULT_SENDGRID_API_BASE: &str = "https://api.sendgrid.com";
const DEFAULT_FROM_NAME: &str = "Summit Team";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct SummitConfig {
    /// `SQLite` database connection URL
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL used when building verification links
    pub public_base_url: Url,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Directory generated QR code images are written to
    pub qr_dir: PathBuf,
    /// Organizational email domains allowed to register
    pub allowed_email_domains: DomainAllowList,
    /// Confirmation email delivery
    pub mail: MailConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Confirmation email configuration.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Sender address (From header)
    pub from_address: Option<Email>,
    /// Sender display name
    pub from_name: String,
    /// Delivery backend
    pub transport: MailTransport,
}

/// Which backend delivers confirmation emails.
#[derive(Debug, Clone)]
pub enum MailTransport {
    /// `SendGrid` v3 HTTP API.
    SendGrid(SendGridConfig),
    /// Direct SMTP submission.
    Smtp(SmtpConfig),
    /// Log the message instead of sending it (development).
    Log,
}

/// `SendGrid` API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct SendGridConfig {
    /// `SendGrid` API key
    pub api_key: SecretString,
    /// API base URL (overridable for testing)
    pub api_base: String,
}

impl std::fmt::Debug for SendGridConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// SMTP submission configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP server hostname
    pub host: String,
    /// SMTP server port
    pub port: u16,
    /// SMTP authentication username
    pub username: String,
    /// SMTP authentication password
    pub password: SecretString,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Source of configuration values, keyed by variable name.
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

impl SummitConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source.
    fn from_lookup(env: Lookup<'_>) -> Result<Self, ConfigError> {
        let database_url = SecretString::from(
            env("SUMMIT_DATABASE_URL")
                .or_else(|| env("DATABASE_URL"))
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
        );
        let host = get_env_or_default(env, "SUMMIT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SUMMIT_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default(env, "SUMMIT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SUMMIT_PORT".to_string(), e.to_string()))?;
        let public_base_url = parse_base_url(&get_required_env(env, "SUMMIT_PUBLIC_BASE_URL")?)?;

        let static_dir = PathBuf::from(get_env_or_default(
            env,
            "SUMMIT_STATIC_DIR",
            DEFAULT_STATIC_DIR,
        ));
        let qr_dir = env("SUMMIT_QR_DIR").map_or_else(|| static_dir.join("qrcodes"), PathBuf::from);

        let allowed_email_domains = DomainAllowList::from_csv(&get_env_or_default(
            env,
            "SUMMIT_ALLOWED_EMAIL_DOMAINS",
            DEFAULT_ALLOWED_DOMAINS,
        ));
        if allowed_email_domains.is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "SUMMIT_ALLOWED_EMAIL_DOMAINS".to_string(),
                "at least one domain is required".to_string(),
            ));
        }

        let mail = MailConfig::from_lookup(env)?;

        let sentry_dsn = env("SENTRY_DSN");
        let sentry_environment = env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            public_base_url,
            static_dir,
            qr_dir,
            allowed_email_domains,
            mail,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl MailConfig {
    fn from_lookup(env: Lookup<'_>) -> Result<Self, ConfigError> {
        let transport = if env("SENDGRID_API_KEY").is_some() {
            MailTransport::SendGrid(SendGridConfig {
                api_key: get_validated_secret(env, "SENDGRID_API_KEY")?,
                api_base: get_env_or_default(env, "SENDGRID_API_BASE", DEFAULT_SENDGRID_API_BASE),
            })
        } else if env("SMTP_HOST").is_some() {
            let port = get_env_or_default(env, "SMTP_PORT", "587")
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;
            MailTransport::Smtp(SmtpConfig {
                host: get_required_env(env, "SMTP_HOST")?,
                port,
                username: get_required_env(env, "SMTP_USERNAME")?,
                // Issued by the mail provider, so only presence is checked.
                password: SecretString::from(get_required_env(env, "SMTP_PASSWORD")?),
            })
        } else {
            MailTransport::Log
        };

        let from_address = match env("MAIL_FROM_ADDRESS") {
            Some(raw) => Some(Email::parse(&raw).map_err(|e| {
                ConfigError::InvalidEnvVar("MAIL_FROM_ADDRESS".to_string(), e.to_string())
            })?),
            None if matches!(transport, MailTransport::Log) => None,
            None => return Err(ConfigError::MissingEnvVar("MAIL_FROM_ADDRESS".to_string())),
        };

        Ok(Self {
            from_address,
            from_name: get_env_or_default(env, "MAIL_FROM_NAME", DEFAULT_FROM_NAME),
            transport,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(env: Lookup<'_>, key: &str) -> Result<String, ConfigError> {
    env(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: Lookup<'_>, key: &str, default: &str) -> String {
    env(key).unwrap_or_else(|| default.to_string())
}

/// Parse the public base URL; it must be absolute http(s).
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        ConfigError::InvalidEnvVar("SUMMIT_PUBLIC_BASE_URL".to_string(), e.to_string())
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            "SUMMIT_PUBLIC_BASE_URL".to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }

    Ok(url)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret.
fn get_validated_secret(env: Lookup<'_>, key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(env, key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<SummitConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        SummitConfig::from_lookup(&|key| map.get(key).cloned())
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("SG.aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load(&[("SUMMIT_PUBLIC_BASE_URL", "https://summit.qaoncloud.com")]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.public_base_url.as_str(), "https://summit.qaoncloud.com/");
        assert_eq!(config.qr_dir, PathBuf::from("crates/server/static/qrcodes"));
        assert_eq!(
            config.allowed_email_domains.iter().collect::<Vec<_>>(),
            vec!["qaoncloud.com"]
        );
        assert!(matches!(config.mail.transport, MailTransport::Log));
        assert!(config.mail.from_address.is_none());
    }

    #[test]
    fn test_missing_base_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "SUMMIT_PUBLIC_BASE_URL"));
    }

    #[test]
    fn test_relative_base_url_rejected() {
        let err = load(&[("SUMMIT_PUBLIC_BASE_URL", "summit.local")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));

        let err = load(&[("SUMMIT_PUBLIC_BASE_URL", "ftp://summit.local")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_database_url_fallback() {
        use secrecy::ExposeSecret;

        let config = load(&[
            ("SUMMIT_PUBLIC_BASE_URL", "http://localhost:3000"),
            ("DATABASE_URL", "sqlite://hosted.db"),
        ])
        .unwrap();
        assert_eq!(config.database_url.expose_secret(), "sqlite://hosted.db");
    }

    #[test]
    fn test_empty_allow_list_rejected() {
        let err = load(&[
            ("SUMMIT_PUBLIC_BASE_URL", "http://localhost:3000"),
            ("SUMMIT_ALLOWED_EMAIL_DOMAINS", " , "),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_sendgrid_requires_from_address() {
        let err = load(&[
            ("SUMMIT_PUBLIC_BASE_URL", "http://localhost:3000"),
            ("SENDGRID_API_KEY", "SG.aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "MAIL_FROM_ADDRESS"));
    }

    #[test]
    fn test_sendgrid_transport() {
        let config = load(&[
            ("SUMMIT_PUBLIC_BASE_URL", "http://localhost:3000"),
            ("SENDGRID_API_KEY", "SG.aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6"),
            ("MAIL_FROM_ADDRESS", "Events@QAonCloud.com"),
        ])
        .unwrap();

        let MailTransport::SendGrid(sendgrid) = &config.mail.transport else {
            panic!("expected SendGrid transport");
        };
        assert_eq!(sendgrid.api_base, DEFAULT_SENDGRID_API_BASE);
        assert_eq!(
            config.mail.from_address.as_ref().unwrap().as_str(),
            "events@qaoncloud.com"
        );
        assert_eq!(config.mail.from_name, DEFAULT_FROM_NAME);
    }

    #[test]
    fn test_smtp_transport() {
        let config = load(&[
            ("SUMMIT_PUBLIC_BASE_URL", "http://localhost:3000"),
            ("SMTP_HOST", "smtp.gmail.com"),
            ("SMTP_PORT", "465"),
            ("SMTP_USERNAME", "events@qaoncloud.com"),
            ("SMTP_PASSWORD", "mK2@nL5#pQ7&rT0*uW4^"),
            ("MAIL_FROM_ADDRESS", "events@qaoncloud.com"),
        ])
        .unwrap();

        let MailTransport::Smtp(smtp) = &config.mail.transport else {
            panic!("expected SMTP transport");
        };
        assert_eq!(smtp.host, "smtp.gmail.com");
        assert_eq!(smtp.port, 465);
    }

    #[test]
    fn test_smtp_accepts_provider_app_password() {
        use secrecy::ExposeSecret;

        let config = load(&[
            ("SUMMIT_PUBLIC_BASE_URL", "http://localhost:3000"),
            ("SMTP_HOST", "smtp.gmail.com"),
            ("SMTP_USERNAME", "events@qaoncloud.com"),
            ("SMTP_PASSWORD", "qwkqzmhqwkazrtqm"),
            ("MAIL_FROM_ADDRESS", "events@qaoncloud.com"),
        ])
        .unwrap();

        let MailTransport::Smtp(smtp) = &config.mail.transport else {
            panic!("expected SMTP transport");
        };
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.password.expose_secret(), "qwkqzmhqwkazrtqm");
    }

    #[test]
    fn test_smtp_password_required() {
        let err = load(&[
            ("SUMMIT_PUBLIC_BASE_URL", "http://localhost:3000"),
            ("SMTP_HOST", "smtp.gmail.com"),
            ("SMTP_USERNAME", "events@qaoncloud.com"),
            ("SMTP_PASSWORD", "  "),
            ("MAIL_FROM_ADDRESS", "events@qaoncloud.com"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "SMTP_PASSWORD"));
    }

    #[test]
    fn test_weak_sendgrid_key_rejected() {
        let err = load(&[
            ("SUMMIT_PUBLIC_BASE_URL", "http://localhost:3000"),
            ("SENDGRID_API_KEY", "changeme"),
            ("MAIL_FROM_ADDRESS", "events@qaoncloud.com"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_mail_config_debug_redacts_secrets() {
        let sendgrid = SendGridConfig {
            api_key: SecretString::from("SG.super_secret_key_value"),
            api_base: DEFAULT_SENDGRID_API_BASE.to_string(),
        };
        let smtp = SmtpConfig {
            host: "smtp.gmail.com".to_string(),
            port: 465,
            username: "events@qaoncloud.com".to_string(),
            password: SecretString::from("super_secret_password"),
        };

        let debug_output = format!("{sendgrid:?} {smtp:?}");

        assert!(debug_output.contains("smtp.gmail.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_key_value"));
        assert!(!debug_output.contains("super_secret_password"));
    }
}
