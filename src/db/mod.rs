//! Shared application state.
//!
//! - `admin` - admin and role queries against Postgres

pub mod admin;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::document::persistence::{load_snapshot, persistence_channel, start_persistence_worker};
use crate::document::DocumentStore;
use crate::member::MemberCache;
use crate::storage::{build_storage, ObjectStorage};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub documents: DocumentStore,
    pub storage: Arc<dyn ObjectStorage + Send + Sync>,
    pub member_cache: MemberCache,
    pub http_client: reqwest::Client,
}

fn http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(900))
        .user_agent(concat!("gov-portal-server/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
}

impl AppState {
    /// Connects to Postgres, runs migrations, restores the document store and
    /// starts its persistence worker.
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(900))
            .max_lifetime(Duration::from_secs(1800))
            .connect(&config.database_url)
            .await
            .context("Failed to connect to the database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;

        let http_client = http_client()?;
        let storage = build_storage(&config.storage, http_client.clone());

        let snapshot = load_snapshot(storage.as_ref()).await;
        let (sender, receiver) = persistence_channel();
        let documents = DocumentStore::from_snapshot(snapshot).with_persistence(sender);
        let worker_store = documents.clone();
        let worker_storage = storage.clone();
        tokio::spawn(async move {
            start_persistence_worker(receiver, worker_store, worker_storage).await;
        });

        Ok(Self {
            pool,
            documents,
            storage,
            member_cache: MemberCache::new(),
            http_client,
        })
    }

    /// Assembles state from ready parts without touching the network.
    pub fn with_parts(
        pool: PgPool,
        storage: Arc<dyn ObjectStorage + Send + Sync>,
        documents: DocumentStore,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            pool,
            documents,
            storage,
            member_cache: MemberCache::new(),
            http_client: http_client()?,
        })
    }
}
