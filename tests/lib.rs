use {
    async_trait::async_trait,
    bitcoin::{
        Amount, Block, BlockHash, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxMerkleNode,
        TxOut, Txid, Witness, absolute,
        address::NetworkUnchecked,
        block::Header,
        consensus::encode,
        hashes::Hash,
        transaction,
    },
    mergepool::{
        backend::{PartialMerkleSubmission, PrimaryBackend, SecondaryBackend},
        block_template::{BlockTemplate, GetBlockTemplate, coinbase_txid, pow_hash},
        coinbase_builder::PoolCoinbaser,
        error::{BackendError, RefreshError, ShareError},
        merged_work::MergedWork,
        registry::{Event, NotifyPolicy, Refresh, RegistryConfig, Submission, TemplateRegistry},
    },
    mock::{MockPrimary, MockSecondary},
    parking_lot::Mutex,
    pretty_assertions::assert_eq as pretty_assert_eq,
    primitive_types::U256,
    serde_json::{Value, json},
    std::{
        collections::VecDeque,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::{Duration, SystemTime, UNIX_EPOCH},
    },
    stratum::{Difficulty, Extranonce, JobId, Nonce},
    tokio::sync::broadcast,
};

mod mock;
mod refresh;

/// Primary target of `1`: no share will ever meet it.
const UNREACHABLE_BITS: &str = "03000001";
/// Regtest target: about every other share meets it.
const EASY_BITS: &str = "207fffff";

fn now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
        .try_into()
        .unwrap()
}

fn coinbaser() -> Arc<PoolCoinbaser> {
    Arc::new(PoolCoinbaser::new(
        "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"
            .parse::<bitcoin::Address<NetworkUnchecked>>()
            .unwrap()
            .assume_checked(),
        "/mergepool-test/".into(),
    ))
}

fn transaction(n: u8) -> Transaction {
    Transaction {
        version: transaction::Version::TWO,
        lock_time: absolute::LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::new(Txid::from_byte_array([n; 32]), 0),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(1000),
            script_pubkey: ScriptBuf::new(),
        }],
    }
}

/// A `getblocktemplate` result on top of `[prev; 32]`.
fn block_template(prev: u8, bits: &str, transactions: &[Transaction]) -> Value {
    json!({
        "bits": bits,
        "previousblockhash": BlockHash::from_byte_array([prev; 32]).to_string(),
        "curtime": now() - 60,
        "height": 1000,
        "version": 0x2000_0000,
        "transactions": transactions
            .iter()
            .map(|tx| json!({
                "data": encode::serialize_hex(tx),
                "txid": tx.compute_txid().to_string(),
                "hash": tx.compute_wtxid().to_string(),
            }))
            .collect::<Vec<Value>>(),
        "coinbaseaux": {"flags": ""},
        "coinbasevalue": 5_000_000_000u64,
    })
}

/// An `mnr_getWork` result committing to `[hash; 32]`.
fn work(hash: u8, parent: u8, notify: bool, target: &str) -> Value {
    json!({
        "blockHashForMergedMining": format!("0x{}", hex::encode([hash; 32])),
        "parentBlockHash": format!("0x{}", hex::encode([parent; 32])),
        "feesPaidToMiner": "0",
        "notify": notify,
        "target": target,
    })
}

fn config() -> RegistryConfig {
    RegistryConfig::default()
}

async fn registry(
    primary: &Arc<MockPrimary>,
    secondary: Option<&Arc<MockSecondary>>,
    config: RegistryConfig,
) -> Arc<TemplateRegistry> {
    TemplateRegistry::new(
        primary.clone(),
        secondary.map(|secondary| secondary.clone() as Arc<dyn SecondaryBackend>),
        coinbaser(),
        config,
    )
    .await
    .unwrap()
}

fn any_difficulty() -> Difficulty {
    Difficulty::new(1e-30).unwrap()
}

/// Submits a share with the template's own ntime.
fn submit(
    registry: &TemplateRegistry,
    job_id: JobId,
    extranonce1: &Extranonce,
    extranonce2: &str,
    nonce: u32,
    difficulty: Difficulty,
) -> Result<Submission, ShareError> {
    let ntime = registry.get_job(job_id).map(|job| job.curtime.to_string())?;

    registry.submit_share(
        job_id,
        "worker",
        extranonce1,
        extranonce2,
        &ntime,
        &format!("{nonce:08x}"),
        difficulty,
    )
}

fn latest_job(registry: &TemplateRegistry) -> JobId {
    registry.get_last_broadcast_args().unwrap().job_id
}

fn drain(events: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
