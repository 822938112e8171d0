//! `PostgreSQL` providers.
//!
//! Every document is stored whole as JSONB, plus the handful of columns the
//! services filter on (`is_available`, `deleted`, `status`, `email`). The
//! schema lives in `labdesk/migrations` and is embedded with
//! [`sqlx::migrate!`].
//!
//! # Example
//!
//! ```no_run
//! use labdesk::config::Config;
//! use labdesk::stores::postgres::PostgresStores;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let stores = PostgresStores::connect(&config.storage).await?;
//! stores.migrate().await?;
//! let registries = stores.stock_registries();
//! # Ok(())
//! # }
//! ```

pub mod accounts;
pub mod conversations;
pub mod requests;
pub mod stock;

pub use accounts::PostgresAccounts;
pub use conversations::PostgresConversationRepository;
pub use requests::PostgresRequestRepository;
pub use stock::PostgresStockRegistry;

use crate::config::StorageConfig;
use crate::error::{LabError, Result};
use crate::stock::{Equipment, Material, Reactive, StockRegistries};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::JsonValue;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Connection pool shared by every `PostgreSQL` provider.
#[derive(Clone)]
pub struct PostgresStores {
    pool: PgPool,
}

impl PostgresStores {
    /// Open a pool sized by `config`.
    ///
    /// # Errors
    ///
    /// [`LabError::Storage`] when the database cannot be reached.
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect(&config.database_url)
            .await
            .map_err(|e| LabError::storage("connect to database", e))?;

        tracing::info!(
            max_connections = config.max_connections,
            "Database pool ready"
        );
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations.
    ///
    /// # Errors
    ///
    /// [`LabError::Storage`] when a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LabError::storage("run migrations", e))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// The three stock registries.
    #[must_use]
    pub fn stock_registries(&self) -> StockRegistries {
        StockRegistries {
            equipment: Arc::new(PostgresStockRegistry::<Equipment>::new(self.pool.clone())),
            materials: Arc::new(PostgresStockRegistry::<Material>::new(self.pool.clone())),
            reactives: Arc::new(PostgresStockRegistry::<Reactive>::new(self.pool.clone())),
        }
    }

    /// Request storage.
    #[must_use]
    pub fn requests(&self) -> PostgresRequestRepository {
        PostgresRequestRepository::new(self.pool.clone())
    }

    /// Conversation storage.
    #[must_use]
    pub fn conversations(&self) -> PostgresConversationRepository {
        PostgresConversationRepository::new(self.pool.clone())
    }

    /// Users, tokens and the registration transaction.
    #[must_use]
    pub fn accounts(&self) -> PostgresAccounts {
        PostgresAccounts::new(self.pool.clone())
    }
}

fn encode<T: Serialize>(value: &T, operation: &str) -> Result<JsonValue> {
    serde_json::to_value(value).map_err(|e| LabError::storage(operation, e))
}

fn decode<T: DeserializeOwned>(json: JsonValue, operation: &str) -> Result<T> {
    serde_json::from_value(json).map_err(|e| LabError::storage(operation, e))
}

fn decode_all<T: DeserializeOwned>(rows: Vec<(JsonValue,)>, operation: &str) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|(json,)| decode(json, operation))
        .collect()
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}
