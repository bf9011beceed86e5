use {
    anyhow::{Context, Error, anyhow, bail, ensure},
    arguments::Arguments,
    async_trait::async_trait,
    backend::{PartialMerkleSubmission, PrimaryBackend, SecondaryBackend},
    bitcoin::{
        Address, Amount, BlockHash, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn,
        TxMerkleNode, TxOut, Txid, VarInt, Witness,
        address::NetworkUnchecked,
        block::Header,
        consensus::{self, encode},
        hashes::{Hash, sha256d},
        locktime::absolute::LockTime,
        script::PushBytesBuf,
    },
    block_template::{BlockTemplate, GetBlockTemplate, coinbase_txid, pow_hash},
    clap::{Parser, ValueEnum},
    coinbase_builder::{CoinbaseBuilder, CoinbaseParts, Coinbaser, PoolCoinbaser},
    error::{BackendError, RefreshError, ShareError, TemplateError},
    extranonces::ExtranonceAllocator,
    jobs::{JobIdAllocator, Jobs},
    merged_work::MergedWork,
    parking_lot::Mutex,
    primitive_types::U256,
    rate_limit::SubmissionLimiter,
    registry::{Event, NotifyPolicy, Refresh, RegistryConfig, Submission, TemplateRegistry},
    reqwest::Url,
    serde::{
        Deserialize, Serialize,
        de::{self, Deserializer},
    },
    serde_json::{Value, json},
    settings::Settings,
    snafu::Snafu,
    std::{
        collections::{BTreeMap, HashMap, HashSet, VecDeque},
        env,
        fmt::{self, Display, Formatter},
        fs, io,
        path::PathBuf,
        process,
        str::FromStr,
        sync::{
            Arc,
            atomic::{AtomicBool, AtomicU64, Ordering},
        },
        time::{Duration, SystemTime, UNIX_EPOCH},
    },
    stratum::{
        Difficulty, Extranonce, JobId, MerkleTree, Nbits, Nonce, Notify, Ntime, PrevHash, Version,
    },
    tokio::{
        runtime::Runtime,
        sync::broadcast,
        task::{JoinHandle, JoinSet},
        time::{Instant, MissedTickBehavior, interval},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
    tracing_appender::non_blocking,
    tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt},
};

mod arguments;
pub mod backend;
pub mod block_template;
pub mod coinbase_builder;
pub mod error;
pub mod extranonces;
mod generator;
pub mod jobs;
mod logs;
pub mod merged_work;
mod options;
pub mod rate_limit;
pub mod registry;
pub mod settings;
mod signal;
mod subcommand;

pub const USER_AGENT: &str = "mergepool/0.1.0";
pub const ENONCE1_SIZE: usize = 4;
pub const MIN_ENONCE_SIZE: usize = 2;
pub const MAX_ENONCE_SIZE: usize = 8;
/// Max seconds a share's ntime may run ahead of the local clock.
pub const MAX_NTIME_OFFSET: u64 = 1000;
/// Prefix of the merged mining commitment carried in the coinbase.
pub const MERGED_MINING_TAG_PREFIX: &[u8] = b"RSKBLOCK:";

type Result<T = (), E = Error> = std::result::Result<T, E>;

fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}

pub fn main() {
    let _guard = logs::init();

    let args = Arguments::parse();

    Runtime::new()
        .expect("Failed to create tokio runtime")
        .block_on(async {
            let cancel_token = signal::setup_signal_handler();

            match args.run(cancel_token).await {
                Err(err) => {
                    eprintln!("error: {err}");

                    for (i, cause) in err.chain().skip(1).enumerate() {
                        if i == 0 {
                            eprintln!();
                            eprintln!("because:");
                        }
                        eprintln!("- {cause}");
                    }

                    if env::var_os("RUST_BACKTRACE")
                        .map(|val| val == "1")
                        .unwrap_or_default()
                    {
                        eprintln!();
                        eprintln!("{}", err.backtrace());
                    }
                    process::exit(1);
                }
                Ok(_) => {
                    process::exit(0);
                }
            }
        });
}
