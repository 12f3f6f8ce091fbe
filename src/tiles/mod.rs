pub mod chain;
pub mod fetch;
pub mod provider;

// Re-exports for convenience
pub use chain::{FailoverDecision, TileProviderChain, TileTicket};
pub use fetch::{HttpTileFetcher, LoadedTile, TileFetcher, TileOrigin, TileService};
pub use provider::{placeholder_tile_url, MapLayerKind, ProviderCatalog, TileProviderSpec};
