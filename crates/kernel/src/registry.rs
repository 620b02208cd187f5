use anyhow::{anyhow, Context};
use std::sync::Arc;

use crate::module::{InitCtx, Module};

/// Startup order for core modules. Core modules not listed here start after
/// the listed ones, in registration order.
const CORE_MODULE_ORDER: &[&str] = &["db"];

/// Module registry for managing module lifecycle with core/custom separation
pub struct ModuleRegistry {
    core_modules: Vec<Arc<dyn Module>>,
    custom_modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            core_modules: Vec::new(),
            custom_modules: Vec::new(),
        }
    }

    /// Register infrastructure owned by the kernel (store client, ...)
    pub fn register_core(&mut self, module: Arc<dyn Module>) {
        self.core_modules.push(module);
    }

    /// Register a feature module contributing routes
    pub fn register_custom(&mut self, module: Arc<dyn Module>) {
        self.custom_modules.push(module);
    }

    /// All registered modules in startup order: core first, then custom.
    pub fn modules(&self) -> Vec<&Arc<dyn Module>> {
        let rank = |module: &Arc<dyn Module>| {
            CORE_MODULE_ORDER
                .iter()
                .position(|name| *name == module.name())
                .unwrap_or(CORE_MODULE_ORDER.len())
        };

        let mut core: Vec<&Arc<dyn Module>> = self.core_modules.iter().collect();
        // stable sort keeps registration order among unlisted core modules
        core.sort_by_key(|module| rank(module));
        core.extend(self.custom_modules.iter());
        core
    }

    pub fn core_module_count(&self) -> usize {
        self.core_modules.len()
    }

    pub fn custom_module_count(&self) -> usize {
        self.custom_modules.len()
    }

    /// Initialize every module in startup order, stopping at the first failure.
    pub async fn init_all(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            core = self.core_module_count(),
            custom = self.custom_module_count(),
            "initializing modules"
        );

        for module in self.modules() {
            tracing::info!(module = module.name(), "initializing module");
            module
                .init(ctx)
                .await
                .with_context(|| format!("failed to initialize module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Start every module in startup order, stopping at the first failure.
    pub async fn start_all(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        for module in self.modules() {
            tracing::info!(module = module.name(), "starting module");
            module
                .start(ctx)
                .await
                .with_context(|| format!("failed to start module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Stop every module in reverse startup order. A failing module does not
    /// prevent the remaining ones from stopping.
    pub async fn stop_all(&self) -> anyhow::Result<()> {
        let mut failed = Vec::new();

        for module in self.modules().into_iter().rev() {
            tracing::info!(module = module.name(), "stopping module");
            if let Err(err) = module.stop().await {
                tracing::error!(module = module.name(), error = %err, "module failed to stop");
                failed.push(module.name());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("modules failed to stop: {}", failed.join(", ")))
        }
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
