use {super::*, rpc::Client};

/// A Rootstock node's merged mining RPC.
#[derive(Debug)]
pub struct RootstockRpc {
    client: Client,
}

impl RootstockRpc {
    const JSONRPC_VERSION: &'static str = "2.0";

    pub fn new(
        url: Url,
        auth: Option<(String, String)>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            client: Client::new("rootstock", Self::JSONRPC_VERSION, url, auth, timeout)?,
        })
    }
}

fn submission_params(submission: PartialMerkleSubmission) -> Value {
    json!([
        submission.block_hash_hex,
        submission.header_hex,
        submission.coinbase_hex,
        submission.merkle_hashes.join(" "),
        format!("{:x}", submission.tx_count),
    ])
}

#[async_trait]
impl SecondaryBackend for RootstockRpc {
    async fn get_work(&self) -> Result<Value, BackendError> {
        self.client.call("mnr_getWork", json!([])).await
    }

    async fn submit_partial_merkle_block(
        &self,
        submission: PartialMerkleSubmission,
    ) -> Result<Value, BackendError> {
        self.client
            .call(
                "mnr_submitBitcoinBlockPartialMerkle",
                submission_params(submission),
            )
            .await
    }
}
