mod api;
mod config;
mod error;
mod events;
mod feeds;
mod render;
mod replay;
mod state;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use api::{HttpSlotSource, SlotDataSource};
use config::Config;
use events::Event;
use render::ConsoleRenderer;
use replay::{PrefetchCoordinator, ReplayEngine, SlotNavigator};
use state::{PlaybackClock, SlotCache};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cfg = Config::load_or_default("config.toml")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.general.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Loaded config: {:?}", cfg);

    let source: Arc<dyn SlotDataSource> = Arc::new(HttpSlotSource::new(&cfg.source)?);
    let mut renderer = ConsoleRenderer::default();

    info!("Connecting to {}...", cfg.source.base_url);
    let latest = feeds::bootstrap::await_latest(
        source.as_ref(),
        cfg.navigation.bootstrap_retry(),
        &mut renderer,
    )
    .await;

    // Create the event channel
    let (tx, rx) = mpsc::channel::<Event>(256);

    let cache = SlotCache::new(cfg.cache.capacity, cfg.cache.wait_timeout());
    let prefetch = PrefetchCoordinator::new(cache.clone(), source.clone(), cfg.cache.prefetch_window);
    let navigator = SlotNavigator::new(
        cache,
        source,
        prefetch,
        tx.clone(),
        cfg.navigation.resync_every,
    );
    let clock = PlaybackClock::new(
        cfg.playback.slot_duration(),
        cfg.playback.tick(),
        cfg.playback.autoplay,
    );

    let mut engine = ReplayEngine::new(navigator, clock, renderer);
    engine.start(latest);

    // Start feeds
    feeds::ticker::spawn(cfg.playback.tick(), tx.clone());
    feeds::controls::spawn_stdin(tx.clone());
    feeds::controls::spawn_ctrl_c(tx);

    info!("Replaying... (n/p/j <slot>/pause/play/q, Ctrl+C to quit)");
    engine.run(rx).await;
    Ok(())
}
