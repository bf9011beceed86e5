use super::*;

pub use {bitcoind::BitcoinRpc, rootstock::RootstockRpc};

mod bitcoind;
mod rootstock;
mod rpc;

/// The chain whose blocks the pool builds templates for.
#[async_trait]
pub trait PrimaryBackend: Send + Sync {
    /// Raw `getblocktemplate` result.
    async fn get_template(&self) -> Result<Value, BackendError>;

    /// Returns true when the block was accepted.
    async fn submit_block(&self, block_hex: String) -> Result<bool, BackendError>;
}

/// The merge-mined chain.
#[async_trait]
pub trait SecondaryBackend: Send + Sync {
    /// Raw `mnr_getWork` result.
    async fn get_work(&self) -> Result<Value, BackendError>;

    async fn submit_partial_merkle_block(
        &self,
        submission: PartialMerkleSubmission,
    ) -> Result<Value, BackendError>;
}

/// A primary chain solution proven to the secondary chain with only the
/// coinbase merkle branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialMerkleSubmission {
    pub block_hash_hex: String,
    pub header_hex: String,
    pub coinbase_hex: String,
    pub merkle_hashes: Vec<String>,
    pub tx_count: usize,
}
