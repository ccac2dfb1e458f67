//! Timestamp to block number resolution.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ReimburseError, Result};

/// A block as recorded by the block index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub id: String,
    pub number: u64,
    pub timestamp: u64,
}

/// Source of block records keyed by their exact timestamp.
#[async_trait]
pub trait BlockIndexSource: Send + Sync {
    /// Every block whose recorded timestamp equals `timestamp`.
    async fn blocks_at_timestamp(&self, timestamp: u64) -> Result<Vec<BlockRecord>>;
}

pub struct BlockResolver<S: ?Sized> {
    source: Arc<S>,
}

impl<S: BlockIndexSource + ?Sized> BlockResolver<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Maps `timestamp` to the one block minted at that second.
    ///
    /// There is no nearest-block fallback: zero or several matches fail
    /// with [`ReimburseError::AmbiguousBlock`] carrying the raw records.
    pub async fn resolve(&self, timestamp: u64) -> Result<u64> {
        let mut blocks = self.source.blocks_at_timestamp(timestamp).await?;
        if blocks.len() != 1 {
            return Err(ReimburseError::AmbiguousBlock { timestamp, blocks });
        }
        let block = blocks.remove(0);
        debug!(timestamp, block = block.number, "Resolved block");
        Ok(block.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixedBlocks(HashMap<u64, Vec<BlockRecord>>);

    #[async_trait]
    impl BlockIndexSource for FixedBlocks {
        async fn blocks_at_timestamp(&self, timestamp: u64) -> Result<Vec<BlockRecord>> {
            Ok(self.0.get(&timestamp).cloned().unwrap_or_default())
        }
    }

    fn block(number: u64, timestamp: u64) -> BlockRecord {
        BlockRecord {
            id: format!("0x{:064x}", number),
            number,
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_resolve_single_match() {
        let mut blocks = HashMap::new();
        blocks.insert(1_700_000_000, vec![block(18_500_000, 1_700_000_000)]);
        let resolver = BlockResolver::new(Arc::new(FixedBlocks(blocks)));

        assert_eq!(resolver.resolve(1_700_000_000).await.unwrap(), 18_500_000);
    }

    #[tokio::test]
    async fn test_resolve_no_match_is_ambiguous() {
        let resolver = BlockResolver::new(Arc::new(FixedBlocks(HashMap::new())));

        match resolver.resolve(42).await {
            Err(ReimburseError::AmbiguousBlock { timestamp, blocks }) => {
                assert_eq!(timestamp, 42);
                assert!(blocks.is_empty());
            }
            other => panic!("expected AmbiguousBlock, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_multiple_matches_carries_raw_result() {
        let mut blocks = HashMap::new();
        blocks.insert(100, vec![block(7, 100), block(8, 100)]);
        let resolver = BlockResolver::new(Arc::new(FixedBlocks(blocks)));

        match resolver.resolve(100).await {
            Err(ReimburseError::AmbiguousBlock { blocks, .. }) => {
                assert_eq!(blocks.len(), 2);
                assert_eq!(blocks[1].number, 8);
            }
            other => panic!("expected AmbiguousBlock, got {:?}", other),
        }
    }
}
