use async_trait::async_trait;
use axum::Router;

/// Context handed to modules while they initialize and start.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Core module trait that all SHELF modules must implement
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module, also its URL segment under `/api`
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes, if it serves any.
    /// Routes will be mounted under `/api/{module_name}`
    fn routes(&self) -> Option<Router> {
        None
    }

    /// OpenAPI fragment merged into the service-wide document
    fn openapi(&self) -> Option<utoipa::openapi::OpenApi> {
        None
    }

    /// Called once every module is initialized, before the server accepts traffic
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Release resources. Called after the server has drained
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
