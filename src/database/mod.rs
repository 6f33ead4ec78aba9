//! Database connectivity probe.
//!
//! # Responsibilities
//! - Verify the relay's Postgres database is reachable with the configured
//!   credentials
//! - Report which of the expected tables exist
//!
//! # Design Decisions
//! - No password configured means "not set up yet", not an error
//! - One short-lived connection per check, always closed before returning
//! - Every failure ends up as text in the status, never as an error

use serde::Serialize;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::schema::RelayConfig;
use crate::resilience::with_deadline;

/// Tables the relay expects in the `public` schema.
pub const EXPECTED_TABLES: [&str; 3] = ["discovered_coins", "coin_streams", "ref_coin_phases"];

const TABLES_QUERY: &str = "\
SELECT table_name::text
FROM information_schema.tables
WHERE table_schema = 'public'
  AND table_name IN ('discovered_coins', 'coin_streams', 'ref_coin_phases')";

/// Result of a database check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbStatus {
    /// Credentials are present.
    pub configured: bool,
    /// A connection was established and the catalog query ran.
    pub connected: bool,
    /// Presence of each expected table.
    pub tables: BTreeMap<&'static str, bool>,
    pub error: Option<String>,
}

impl DbStatus {
    fn new() -> Self {
        Self {
            configured: false,
            connected: false,
            tables: EXPECTED_TABLES.iter().map(|t| (*t, false)).collect(),
            error: None,
        }
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.get(table).copied().unwrap_or(false)
    }
}

/// Connection parameters taken from the relay configuration.
#[derive(Clone)]
pub struct DatabaseProbe {
    host: String,
    port: Option<i64>,
    database: String,
    user: String,
    password: String,
    timeout: Duration,
}

impl DatabaseProbe {
    pub fn from_config(config: &RelayConfig, timeout: Duration) -> Self {
        Self {
            host: config.get_text("DB_HOST"),
            port: config.get_i64("DB_PORT"),
            database: config.get_text("DB_NAME"),
            user: config.get_text("DB_USER"),
            password: config.get_text("DB_PASSWORD"),
            timeout,
        }
    }

    /// Check connectivity and table presence.
    pub async fn check(&self) -> DbStatus {
        let mut status = DbStatus::new();

        if self.password.is_empty() {
            status.error = Some("Database credentials not configured (DB_PASSWORD is empty)".to_string());
            return status;
        }
        status.configured = true;

        match self.query_tables().await {
            Ok(existing) => {
                status.connected = true;
                for (table, present) in status.tables.iter_mut() {
                    *present = existing.iter().any(|t| t == table);
                }
                tracing::info!(host = %self.host, database = %self.database, tables = ?existing, "Database check succeeded");
            }
            Err(e) => {
                tracing::warn!(host = %self.host, database = %self.database, error = %e, "Database check failed");
                status.error = Some(e);
            }
        }

        status
    }

    async fn query_tables(&self) -> Result<Vec<String>, String> {
        let port = self
            .port
            .and_then(|p| u16::try_from(p).ok())
            .filter(|p| *p != 0)
            .ok_or_else(|| format!("invalid DB_PORT: {:?}", self.port))?;

        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password);

        let secs = self.timeout.as_secs();
        let mut conn = with_deadline(
            self.timeout,
            async { PgConnection::connect_with(&options).await.map_err(|e| e.to_string()) },
            || format!("connection to {}:{} timed out after {}s", self.host, port, secs),
        )
        .await?;

        let result = with_deadline(
            self.timeout,
            async {
                sqlx::query_scalar::<_, String>(TABLES_QUERY)
                    .fetch_all(&mut conn)
                    .await
                    .map_err(|e| e.to_string())
            },
            || format!("table query timed out after {}s", secs),
        )
        .await;

        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "Error closing database connection");
        }

        result
    }
}

impl std::fmt::Debug for DatabaseProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseProbe")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_password_is_not_configured() {
        let probe = DatabaseProbe::from_config(&RelayConfig::defaults(), Duration::from_secs(1));
        let status = probe.check().await;

        assert!(!status.configured);
        assert!(!status.connected);
        assert!(status.error.as_ref().unwrap().contains("DB_PASSWORD"));
        assert_eq!(status.tables.len(), 3);
        assert!(!status.has_table("discovered_coins"));
    }

    #[tokio::test]
    async fn test_unreachable_database_reports_error() {
        let mut config = RelayConfig::defaults();
        config.set("DB_HOST", "127.0.0.1");
        config.set("DB_PORT", 1i64);
        config.set("DB_PASSWORD", "secret");

        let status = DatabaseProbe::from_config(&config, Duration::from_secs(2)).check().await;
        assert!(status.configured);
        assert!(!status.connected);
        assert!(status.error.is_some());
    }

    #[tokio::test]
    async fn test_invalid_port_reports_error() {
        let mut config = RelayConfig::defaults();
        config.set("DB_PORT", 70000i64);
        config.set("DB_PASSWORD", "secret");

        let status = DatabaseProbe::from_config(&config, Duration::from_secs(1)).check().await;
        assert!(status.configured);
        assert!(status.error.unwrap().contains("DB_PORT"));
    }

    #[test]
    fn test_debug_hides_password() {
        let mut config = RelayConfig::defaults();
        config.set("DB_PASSWORD", "hunter2");
        let probe = DatabaseProbe::from_config(&config, Duration::from_secs(1));
        assert!(!format!("{:?}", probe).contains("hunter2"));
    }
}
