// Query collaborators for the block index and staking registry
pub mod graph_client;
pub mod subgraph;

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::SourcesConfig;
use crate::error::Result;

pub use graph_client::GraphClient;
pub use subgraph::{SubgraphBlockIndex, SubgraphStakingRegistry};

/// Builds both subgraph adapters from `[sources]`.
pub fn connect(sources: &SourcesConfig) -> Result<(Arc<SubgraphBlockIndex>, Arc<SubgraphStakingRegistry>)> {
    let timeout = Duration::from_secs(sources.request_timeout_secs);
    let blocks = GraphClient::new(sources.block_index_url.clone(), timeout)?;
    let registry = GraphClient::new(sources.staking_registry_url.clone(), timeout)?;
    info!(blocks = blocks.url(), registry = registry.url(), "Using subgraph sources");
    Ok((
        Arc::new(SubgraphBlockIndex::new(blocks)),
        Arc::new(SubgraphStakingRegistry::new(registry)),
    ))
}
