use super::*;

#[derive(Clone, Default, Debug, Parser)]
#[command(group(
    clap::ArgGroup::new("networks")
        .required(false)
        .args(&["network", "signet", "regtest", "testnet"]),
))]
pub struct Options {
    #[arg(long, help = "Load configuration from <CONFIG>.")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Load configuration from <CONFIG_DIR>/mergepool.toml.")]
    pub config_dir: Option<PathBuf>,

    #[arg(long, help = "Mine on <NETWORK>. [default: bitcoin]")]
    pub network: Option<Network>,

    #[arg(
        long,
        short = 's',
        help = "Use signet. Equivalent to `--network signet`."
    )]
    pub signet: bool,

    #[arg(
        long,
        short = 'r',
        help = "Use regtest. Equivalent to `--network regtest`."
    )]
    pub regtest: bool,

    #[arg(
        long,
        short = 't',
        help = "Use testnet. Equivalent to `--network testnet`."
    )]
    pub testnet: bool,

    #[arg(long, help = "Connect to Bitcoin Core RPC at <BITCOIN_RPC_URL>.")]
    pub bitcoin_rpc_url: Option<String>,

    #[arg(
        long,
        help = "Authenticate to Bitcoin Core RPC as <BITCOIN_RPC_USERNAME>."
    )]
    pub bitcoin_rpc_username: Option<String>,

    #[arg(
        long,
        help = "Authenticate to Bitcoin Core RPC with <BITCOIN_RPC_PASSWORD>."
    )]
    pub bitcoin_rpc_password: Option<String>,

    #[arg(
        long,
        help = "Merge mine with the Rootstock node at <ROOTSTOCK_RPC_URL>."
    )]
    pub rootstock_rpc_url: Option<String>,

    #[arg(long, help = "Authenticate to Rootstock RPC as <ROOTSTOCK_RPC_USERNAME>.")]
    pub rootstock_rpc_username: Option<String>,

    #[arg(long, help = "Authenticate to Rootstock RPC with <ROOTSTOCK_RPC_PASSWORD>.")]
    pub rootstock_rpc_password: Option<String>,

    #[arg(long, help = "Pay block rewards to <ADDRESS>.")]
    pub address: Option<String>,

    #[arg(long, help = "Prefix extranonce1 with <INSTANCE_ID>. [default: 0]")]
    pub instance_id: Option<u64>,

    #[arg(
        long,
        help = "Reserve <EXTRANONCE_SIZE> bytes of coinbase for extranonces. [default: 8]"
    )]
    pub extranonce_size: Option<usize>,

    #[arg(long, help = "Wrap job ids at <JOB_ID_DIGITS> hex digits. [default: 4]")]
    pub job_id_digits: Option<u32>,

    #[arg(
        long,
        help = "Poll for block templates every <UPDATE_INTERVAL> seconds. [default: 10]"
    )]
    pub update_interval: Option<u64>,

    #[arg(
        long,
        help = "Poll for merged mining work every <SECONDARY_POLL_INTERVAL> seconds. [default: 2]"
    )]
    pub secondary_poll_interval: Option<u64>,

    #[arg(
        long,
        help = "Retry refused merged mining connections <SECONDARY_CONNECT_RETRIES> times. [default: 3]"
    )]
    pub secondary_connect_retries: Option<usize>,

    #[arg(
        long,
        help = "Submit at most <SECONDARY_SUBMISSION_LIMIT> merged mining solutions per window. [default: 3]"
    )]
    pub secondary_submission_limit: Option<usize>,

    #[arg(
        long,
        help = "Rate limit merged mining solutions over <SECONDARY_SUBMISSION_WINDOW> milliseconds. [default: 1000]"
    )]
    pub secondary_submission_window: Option<u64>,

    #[arg(
        long,
        value_enum,
        help = "Announce merged mining templates per <NOTIFY_POLICY>. [default: always]"
    )]
    pub notify_policy: Option<NotifyPolicy>,

    #[arg(
        long,
        help = "Replace the merged mining target with <SECONDARY_TARGET_OVERRIDE>."
    )]
    pub secondary_target_override: Option<String>,

    #[arg(long, help = "Tag coinbase scriptSig with <POOL_SIG>. [default: /mergepool/]")]
    pub pool_sig: Option<String>,

    #[arg(long, help = "Time out RPC requests after <RPC_TIMEOUT> seconds. [default: 30]")]
    pub rpc_timeout: Option<u64>,
}
