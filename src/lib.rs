//! shelf application: account and book modules wired onto the shelf
//! framework crates.

pub mod modules;

use anyhow::Context;
use shelf_kernel::settings::Settings;
use shelf_kernel::{InitCtx, ModuleRegistry};
use sqlx::PgPool;

pub use modules::{register_all, Services};

/// Build the registry with every module backed by `pool`.
pub fn build_registry(settings: &Settings, pool: PgPool) -> anyhow::Result<ModuleRegistry> {
    let services = Services::postgres(&settings.auth, pool)?;
    let mut registry = ModuleRegistry::new();
    register_all(&mut registry, &services);
    Ok(registry)
}

/// Apply pending migrations and return how many ran.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let pool = shelf_db::connect(&settings.database).await?;
    let registry = build_registry(settings, pool.clone())?;

    let applied = shelf_db::run_migrations(&pool, &registry.collect_migrations()).await?;
    pool.close().await;

    Ok(applied)
}

/// Run the API until a shutdown signal arrives.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let pool = shelf_db::connect(&settings.database).await?;
    let registry = build_registry(&settings, pool.clone())?;

    let applied = shelf_db::run_migrations(&pool, &registry.collect_migrations())
        .await
        .context("failed to apply migrations")?;
    tracing::info!(applied, "migrations complete");

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    let served = shelf_http::start_server(&registry, &settings).await;

    registry.stop_modules().await?;
    pool.close().await;

    served
}
