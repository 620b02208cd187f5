//! MongoDB client factory for SHELF.
//!
//! [`connect`] builds the one client the process shares and proves the server
//! is reachable before anything is served. [`DbModule`] ties the client to the
//! kernel lifecycle so it is closed after the HTTP server drains.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use mongodb::{bson::doc, options::ClientOptions, Client, Collection, Database};
use shelf_kernel::{settings::DatabaseSettings, InitCtx, Module};

const APP_NAME: &str = "shelf";

/// Handle on the connected database. Cheap to clone; clones share the
/// underlying connection pool.
#[derive(Clone, Debug)]
pub struct Db {
    client: Client,
    database: Database,
}

impl Db {
    /// Typed handle on one collection of the connected database.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database.collection(name)
    }

    /// Round-trip a `ping` command to the server.
    pub async fn ping(&self) -> anyhow::Result<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .with_context(|| format!("ping to database '{}' failed", self.database.name()))?;
        Ok(())
    }
}

/// Connect to the store named by `settings.uri` and verify it answers.
///
/// The driver connects lazily, so the ping is what turns an unreachable
/// server into a startup error.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Db> {
    let uri = settings.require_uri()?;

    let mut options = ClientOptions::parse(uri)
        .await
        .context("invalid MongoDB connection string")?;
    options.app_name.get_or_insert_with(|| APP_NAME.to_string());

    let client = Client::with_options(options).context("failed to build MongoDB client")?;
    let database = client
        .default_database()
        .unwrap_or_else(|| client.database(&settings.database));

    let db = Db { client, database };
    db.ping().await?;

    tracing::info!(
        target: "shelf-db",
        database = db.database.name(),
        collection = %settings.collection,
        "connected to MongoDB"
    );

    Ok(db)
}

/// Core module owning the client's lifetime.
pub struct DbModule {
    db: Db,
}

impl DbModule {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Module for DbModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            database = self.db.database.name(),
            "db module initialized"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.db.client.clone().shutdown().await;
        tracing::info!(module = self.name(), "MongoDB client shut down");
        Ok(())
    }
}

/// Create the core `db` module for the registry
pub fn create_module(db: Db) -> Arc<dyn Module> {
    Arc::new(DbModule::new(db))
}
