use std::sync::Arc;
use std::time::Duration;

use encore::audio::YtDlpSource;
use encore::cache::{CacheTier, MemoryCache};
use encore::config::ServiceConfig;
use encore::database::{DatabaseManager, SqliteTrackStore};
use encore::models::ResolveParams;
use encore::spotify::SpotifyCatalog;
use encore::youtube::YouTubeClient;
use encore::{Collaborators, SongService};

/// How long to wait for the up-next track after each resolution
const PREFETCH_WAIT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let content_ids: Vec<String> = std::env::args().skip(1).collect();
    if content_ids.is_empty() {
        eprintln!("usage: encore <content-id>...");
        return Ok(());
    }

    let config = ServiceConfig::load()?;
    let db = DatabaseManager::new(&config.database_url).await?;
    let youtube = Arc::new(YouTubeClient::new()?);

    let service = SongService::new(
        &config,
        Collaborators {
            audio_source: Arc::new(YtDlpSource::new(config.audio.ytdlp_path.clone())),
            catalog: Arc::new(SpotifyCatalog::new()?),
            search: youtube.clone(),
            key_probe: youtube,
            cache: build_cache(&config).await?,
            store: Arc::new(SqliteTrackStore::new(db.pool.clone())),
        },
    );
    let _maintenance = service.start_maintenance();

    let token = std::env::var("SPOTIFY_ACCESS_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());
    let mut outcomes = service.subscribe_prefetch();

    for content_id in content_ids {
        let params = ResolveParams {
            content_id: content_id.clone(),
            hints: Default::default(),
            catalog_token: token.clone(),
        };

        match service.resolve_track(&params).await {
            Ok(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            Err(e) => {
                log::error!("Failed to resolve '{}': {}", content_id, e);
                continue;
            }
        }

        match tokio::time::timeout(PREFETCH_WAIT, outcomes.recv()).await {
            Ok(Ok(outcome)) if outcome.error.is_none() => {
                let up_next = service.peek_up_next(&content_id).await?;
                println!("{}", serde_json::to_string_pretty(&up_next)?);
            }
            Ok(Ok(outcome)) => log::warn!(
                "No up-next track for '{}': {}",
                content_id,
                outcome.error.unwrap_or_default()
            ),
            Ok(Err(e)) => log::warn!("Prefetch telemetry unavailable: {}", e),
            Err(_) => log::warn!("Timed out waiting for up-next of '{}'", content_id),
        }
    }

    for (key, state) in service.credentials().states() {
        log::debug!("API key {} is {:?}", key, state);
    }

    Ok(())
}

#[cfg(feature = "redis")]
async fn build_cache(config: &ServiceConfig) -> anyhow::Result<Arc<dyn CacheTier>> {
    if let Some(url) = &config.redis_url {
        let cache = encore::cache::RedisCache::connect(url).await?;
        log::info!("Using Redis cache");
        return Ok(Arc::new(cache));
    }
    Ok(Arc::new(MemoryCache::new()))
}

#[cfg(not(feature = "redis"))]
async fn build_cache(config: &ServiceConfig) -> anyhow::Result<Arc<dyn CacheTier>> {
    if config.redis_url.is_some() {
        log::warn!("ENCORE_REDIS_URL is set but this build has no Redis support");
    }
    Ok(Arc::new(MemoryCache::new()))
}
