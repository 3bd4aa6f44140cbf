use std::sync::Arc;

use stb_core::{
    config::Config, rotation::RotationController, service::LinkService, shortener, store::Store,
};

#[tokio::main]
async fn main() -> Result<(), stb_core::Error> {
    stb_core::logging::init("stb")?;

    let cfg = Arc::new(Config::load()?);
    tracing::info!(
        providers = cfg.registry.count(),
        shorteners_file = %cfg.shorteners_file.display(),
        "configuration loaded"
    );

    let store = Arc::new(Store::open(&cfg.db_path)?);
    let shorteners = shortener::build_all(&cfg.registry, cfg.provider_timeout)?;
    let rotation = RotationController::new(store, shorteners)?;
    let links = Arc::new(LinkService::new(cfg.owner_id, rotation));

    stb_telegram::router::run_polling(cfg, links)
        .await
        .map_err(|e| stb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
