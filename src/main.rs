use anyhow::Context;
use shelf_app::modules;
use shelf_kernel::{InitCtx, ModuleRegistry, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load SHELF settings")?;
    shelf_telemetry::init(&settings.telemetry);

    tracing::info!(
        env = ?settings.environment,
        port = settings.server.port,
        "shelf-app bootstrap starting"
    );

    // Serving without a store would fail every request, so this is fatal.
    let db = shelf_db::connect(&settings.database)
        .await
        .context("failed to connect to the document store")?;

    let mut registry = ModuleRegistry::new();
    registry.register_core(shelf_db::create_module(db.clone()));
    modules::register_all(&mut registry, &db, &settings);

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    tracing::info!("shelf-app bootstrap complete");

    let served =
        shelf_http::start_server(&registry, &settings.server, shelf_http::shutdown_signal()).await;

    // Stop modules even when the server failed, then report the first error.
    let stopped = registry.stop_all().await;
    served?;
    stopped
}
