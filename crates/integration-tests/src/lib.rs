//! Test harness for end-to-end tests of the summit registration server.
//!
//! Each [`TestContext`] runs the real router on an ephemeral local port,
//! backed by an in-memory `SQLite` database and a temporary static
//! directory, and talks to it over HTTP with `reqwest`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p summit-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use secrecy::SecretString;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use summit_core::DomainAllowList;
use summit_server::config::{MailConfig, MailTransport, SummitConfig};
use summit_server::db;
use summit_server::services::{Confirmation, Notifier, NotifyError};
use summit_server::state::AppState;

/// Public base URL the test server pretends to live at.
pub const PUBLIC_BASE_URL: &str = "https://summit.test";

/// Notifier that records every confirmation, optionally failing each send.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Confirmation>>,
    fail: bool,
}

impl RecordingNotifier {
    /// A notifier whose every delivery fails after being recorded.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    /// Confirmations handed to this notifier so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Confirmation> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_confirmation(&self, confirmation: &Confirmation) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(confirmation.clone());

        if self.fail {
            return Err(NotifyError::Api {
                status: 503,
                message: "mail service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// A running server plus handles on its state.
pub struct TestContext {
    pub client: reqwest::Client,
    pub base_url: String,
    pub pool: SqlitePool,
    pub qr_dir: PathBuf,
    _static_root: TempDir,
    server: JoinHandle<()>,
}

impl TestContext {
    /// Start a server that sends confirmations to `notifier`.
    ///
    /// # Panics
    ///
    /// Panics if the database, temp directory or listener cannot be set up.
    pub async fn start(notifier: Arc<dyn Notifier>) -> Self {
        let static_root = tempfile::tempdir().expect("Failed to create temp dir");
        let static_dir = static_root.path().join("static");
        let qr_dir = static_dir.join("qrcodes");

        let config = SummitConfig {
            database_url: SecretString::from("sqlite::memory:"),
            host: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            public_base_url: Url::parse(PUBLIC_BASE_URL).expect("valid base URL"),
            static_dir,
            qr_dir: qr_dir.clone(),
            allowed_email_domains: DomainAllowList::new(["qaoncloud.com"]),
            mail: MailConfig {
                from_address: None,
                from_name: "Summit Team".to_string(),
                transport: MailTransport::Log,
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        };

        let pool = db::create_pool(&config.database_url)
            .await
            .expect("Failed to create database pool");
        db::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let app = summit_server::app(AppState::new(config, pool.clone(), notifier));
        let (addr, server) = serve(app).await;

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: format!("http://{addr}"),
            pool,
            qr_dir,
            _static_root: static_root,
            server,
        }
    }

    /// Absolute URL for a path on the test server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a path.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// POST a path with an empty body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post(&self, path: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .send()
            .await
            .expect("POST request failed")
    }

    /// POST an urlencoded form.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> reqwest::Response {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();

        self.client
            .post(self.url(path))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Submit the registration form.
    pub async fn register(&self, form: &RegistrationFields) -> reqwest::Response {
        self.post_form("/register", &form.pairs()).await
    }

    /// Number of rows in a table.
    ///
    /// # Panics
    ///
    /// Panics if the query fails.
    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .expect("count query failed")
    }

    /// Names of the QR images written so far.
    ///
    /// # Panics
    ///
    /// Panics if the directory exists but cannot be read.
    #[must_use]
    pub fn qr_files(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.qr_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| {
                e.expect("readable dir entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Serve `app` on an ephemeral local port.
///
/// # Panics
///
/// Panics if the listener cannot be bound.
pub async fn serve(app: axum::Router) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("listener address");
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, handle)
}

/// Form values for one registration submission.
#[derive(Debug, Clone)]
pub struct RegistrationFields {
    pub full_name: String,
    pub emp_id: String,
    pub location: String,
    pub dob: String,
    pub email: String,
    pub business_unit: String,
    pub contact: String,
    pub emergency_contact: String,
    pub consent: Option<String>,
    pub medical_conditions: String,
}

impl RegistrationFields {
    /// A valid submission for `emp_id` and `email`.
    #[must_use]
    pub fn valid(emp_id: &str, email: &str) -> Self {
        Self {
            full_name: "Asha Rao".to_string(),
            emp_id: emp_id.to_string(),
            location: "Chennai".to_string(),
            dob: "1990-04-12".to_string(),
            email: email.to_string(),
            business_unit: "Quality Engineering".to_string(),
            contact: "111".to_string(),
            emergency_contact: "222".to_string(),
            consent: Some("yes".to_string()),
            medical_conditions: "None".to_string(),
        }
    }

    fn pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = vec![
            ("full_name", self.full_name.as_str()),
            ("emp_id", self.emp_id.as_str()),
            ("location", self.location.as_str()),
            ("dob", self.dob.as_str()),
            ("email", self.email.as_str()),
            ("business_unit", self.business_unit.as_str()),
            ("contact", self.contact.as_str()),
            ("emergency_contact", self.emergency_contact.as_str()),
            ("medical_conditions", self.medical_conditions.as_str()),
        ];
        if let Some(consent) = &self.consent {
            pairs.push(("consent", consent.as_str()));
        }
        pairs
    }
}
