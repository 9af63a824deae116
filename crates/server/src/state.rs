//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::SummitConfig;
use crate::services::notifier::Notifier;
use crate::services::qr::QrCodeGenerator;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SummitConfig,
    pool: SqlitePool,
    qr: QrCodeGenerator,
    notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `pool` - `SQLite` connection pool
    /// * `notifier` - Confirmation email backend
    #[must_use]
    pub fn new(config: SummitConfig, pool: SqlitePool, notifier: Arc<dyn Notifier>) -> Self {
        let qr = QrCodeGenerator::new(config.qr_dir.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                qr,
                notifier,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &SummitConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the QR code generator.
    #[must_use]
    pub fn qr(&self) -> &QrCodeGenerator {
        &self.inner.qr
    }

    /// Get a reference to the confirmation notifier.
    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        self.inner.notifier.as_ref()
    }
}
