use crate::core::config::TileFailoverConfig;
use crate::core::geo::TileCoord;
use crate::prelude::{Arc, Duration, Instant};
use crate::tiles::chain::{FailoverDecision, TileProviderChain};
use crate::{MapError, Result};
use async_trait::async_trait;
use futures::future::join_all;
use lru::LruCache;
use once_cell::sync::Lazy;
use std::num::NonZeroUsize;

/// Shared async HTTP client for tile fetching
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .tcp_keepalive(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(16)
        .build()
        .unwrap_or_else(|e| {
            log::error!("falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
});

/// Anything that can turn a tile URL into bytes
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches tiles over HTTP with the shared client
#[derive(Debug, Clone)]
pub struct HttpTileFetcher {
    timeout: Duration,
    user_agent: String,
}

impl HttpTileFetcher {
    pub fn new(config: &TileFailoverConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.request_timeout_ms),
            user_agent: config.user_agent.clone(),
        }
    }
}

#[async_trait]
impl TileFetcher for HttpTileFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = HTTP_CLIENT
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MapError::Tile(format!("HTTP {} for {}", response.status(), url)));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Where a served tile came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOrigin {
    Network,
    Cache,
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct LoadedTile {
    pub coord: TileCoord,
    pub data: Arc<Vec<u8>>,
    pub origin: TileOrigin,
    /// Provider that served or failed the tile
    pub provider: String,
}

/// Headless tile pipeline: fetch through the failover chain, cache by
/// provider, and fall back to the placeholder tile on any failure.
pub struct TileService<F: TileFetcher> {
    fetcher: F,
    chain: TileProviderChain,
    cache: LruCache<(String, TileCoord), Arc<Vec<u8>>>,
    retina: bool,
    placeholder: Arc<Vec<u8>>,
}

impl<F: TileFetcher> TileService<F> {
    pub fn new(fetcher: F, chain: TileProviderChain, config: &TileFailoverConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            fetcher,
            chain,
            cache: LruCache::new(capacity),
            retina: config.retina,
            placeholder: Arc::new(super::provider::PLACEHOLDER_TILE_SVG.as_bytes().to_vec()),
        }
    }

    pub fn chain(&self) -> &TileProviderChain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut TileProviderChain {
        &mut self.chain
    }

    pub async fn load_tile(&mut self, coord: TileCoord) -> LoadedTile {
        let mut loaded = self.load_tiles(&[coord]).await;
        loaded.pop().unwrap_or_else(|| self.placeholder_for(coord))
    }

    /// Loads a batch concurrently from the active provider. Failures feed the
    /// chain once the whole batch has settled; a switch applies to the next batch.
    pub async fn load_tiles(&mut self, coords: &[TileCoord]) -> Vec<LoadedTile> {
        let ticket = self.chain.ticket();
        let provider = self.chain.active().clone();

        let mut results: Vec<Option<LoadedTile>> = Vec::with_capacity(coords.len());
        for coord in coords {
            if coord.z > provider.max_zoom || !coord.is_valid() {
                results.push(Some(self.placeholder_for(*coord)));
                continue;
            }
            let cached = self.cache.get(&(provider.name.clone(), *coord)).cloned();
            results.push(cached.map(|data| LoadedTile {
                coord: *coord,
                data,
                origin: TileOrigin::Cache,
                provider: provider.name.clone(),
            }));
        }

        let pending: Vec<(usize, TileCoord, String)> = results
            .iter()
            .zip(coords)
            .enumerate()
            .filter(|(_, (loaded, _))| loaded.is_none())
            .map(|(i, (_, coord))| (i, *coord, provider.tile_url(*coord, self.retina)))
            .collect();

        let fetcher = &self.fetcher;
        let fetched = join_all(pending.iter().map(|(_, _, url)| fetcher.fetch(url))).await;

        for ((slot, coord, url), outcome) in pending.into_iter().zip(fetched) {
            let tile = match outcome {
                Ok(bytes) => {
                    let data = Arc::new(bytes);
                    self.cache
                        .put((provider.name.clone(), coord), Arc::clone(&data));
                    LoadedTile {
                        coord,
                        data,
                        origin: TileOrigin::Network,
                        provider: provider.name.clone(),
                    }
                }
                Err(e) => {
                    log::debug!("tile {} failed: {}", url, e);
                    if let FailoverDecision::Switched { to, .. } =
                        self.chain.record_failure(ticket, Instant::now())
                    {
                        log::info!("tile service now using provider #{}", to);
                    }
                    self.placeholder_for(coord)
                }
            };
            results[slot] = Some(tile);
        }

        results
            .into_iter()
            .zip(coords)
            .map(|(tile, coord)| tile.unwrap_or_else(|| self.placeholder_for(*coord)))
            .collect()
    }

    fn placeholder_for(&self, coord: TileCoord) -> LoadedTile {
        LoadedTile {
            coord,
            data: Arc::clone(&self.placeholder),
            origin: TileOrigin::Placeholder,
            provider: self.chain.active().name.clone(),
        }
    }
}
