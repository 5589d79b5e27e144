//! The unit of composition: each feature area ships as a [`Module`] that
//! contributes routes, schema and an OpenAPI fragment.

use async_trait::async_trait;
use axum::Router;

use crate::settings::Settings;

/// Borrowed view of process state handed to lifecycle hooks.
pub struct InitCtx<'a> {
    pub settings: &'a Settings,
}

/// One schema step. `id` orders steps within a module and is recorded once
/// the step has run.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

#[async_trait]
pub trait Module: Sync + Send {
    /// Mount segment under the API prefix; also the migration namespace.
    fn name(&self) -> &'static str;

    /// Runs after migrations have been applied.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Served under `{api_prefix}/{name}`. Must carry its own state.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment with `paths` relative to the mount point and
    /// optional `components.schemas`.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Runs after every module has initialized, before traffic is accepted.
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs on shutdown, in reverse registration order.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
