//! Canonical donor record import pipeline.
//!
//! Ingests delimited constituent/gift/contact exports produced by arbitrary,
//! unknown-schema CRM systems and converts them into a canonical,
//! deduplicated, tenant-isolated record store. Repeated re-imports recognize
//! records already present and detect which fields actually changed.
//!
//! # Pipeline
//!
//! raw text → [`parse`] → row maps → [`mapping`] (confirmed mapping applied)
//! → canonical rows → [`matching`] / [`changes`] decide create vs. update →
//! [`import`] batches and persists through a [`store`] → result summary.
//!
//! Every operation is scoped to a single tenant; nothing matches, reads or
//! writes across tenant boundaries.

pub mod changes;
pub mod error;
pub mod import;
pub mod mapping;
pub mod matching;
pub mod models;
pub mod parse;
pub mod schema;
pub mod store;

use env_logger::Env;
use std::sync::Once;

static LOGGER: Once = Once::new();

pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    });
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use sqlx::PgPool;
    use sqlx::postgres::PgPoolOptions;
    use testcontainers_modules::postgres::Postgres;
    use testcontainers_modules::testcontainers::runners::AsyncRunner;
    use testcontainers_modules::testcontainers::{ContainerAsync, core::error::TestcontainersError};
    use thiserror::Error;

    /// Environment variable gating the PostgreSQL integration suite. Unset
    /// means the suite is skipped, so plain `cargo test` needs no Docker.
    pub const PG_INTEGRATION_ENV: &str = "PG_INTEGRATION_TESTS";

    #[derive(Debug, Error)]
    pub enum TestDatabaseError {
        #[error("PG_INTEGRATION_TESTS not set")]
        Disabled,
        #[error("database error: {0}")]
        Sqlx(#[from] sqlx::Error),
        #[error("migration error: {0}")]
        Migration(#[from] sqlx::migrate::MigrateError),
        #[error("container error: {0}")]
        Container(#[from] TestcontainersError),
    }

    /// Ephemeral database factory for integration tests: one disposable
    /// Postgres container per instance, with migrations applied.
    pub struct TestDatabase {
        pool: PgPool,
        _container: ContainerAsync<Postgres>,
    }

    impl TestDatabase {
        pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
            if std::env::var(PG_INTEGRATION_ENV).is_err() {
                return Err(TestDatabaseError::Disabled);
            }

            let container = Postgres::default().start().await?;
            let host = container.get_host().await?;
            let port = container.get_host_port_ipv4(5432).await?;
            let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&url)
                .await?;
            crate::store::postgres::MIGRATOR.run(&pool).await?;

            Ok(Self {
                pool,
                _container: container,
            })
        }

        pub fn pool(&self) -> &PgPool {
            &self.pool
        }

        pub fn pool_clone(&self) -> PgPool {
            self.pool.clone()
        }
    }
}
