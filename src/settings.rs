use {
    super::*,
    backend::{BitcoinRpc, RootstockRpc},
    bitcoind_async_client::Auth,
    options::Options,
};

/// TOML config file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub network: Option<Network>,
    pub bitcoin_rpc_url: Option<String>,
    pub bitcoin_rpc_username: Option<String>,
    pub bitcoin_rpc_password: Option<String>,
    pub address: Option<String>,
    pub pool_sig: Option<String>,
    pub rpc_timeout: Option<u64>,

    pub pool: Option<PoolSection>,
    pub rootstock: Option<RootstockSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSection {
    pub network: Option<Network>,
    pub address: Option<String>,
    pub instance_id: Option<u64>,
    pub extranonce_size: Option<usize>,
    pub job_id_digits: Option<u32>,
    pub update_interval: Option<u64>,
    pub pool_sig: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RootstockSection {
    pub rpc_url: Option<String>,
    pub rpc_username: Option<String>,
    pub rpc_password: Option<String>,
    pub poll_interval: Option<u64>,
    pub connect_retries: Option<usize>,
    pub submission_limit: Option<usize>,
    pub submission_window: Option<u64>,
    pub notify_policy: Option<NotifyPolicy>,
    pub target_override: Option<String>,
}

/// Unified settings struct with all resolved configuration
#[derive(Debug, Clone, Default, Serialize)]
pub struct Settings {
    pub config: Option<PathBuf>,
    pub config_dir: Option<PathBuf>,
    pub network: Option<Network>,

    pub bitcoin_rpc_url: Option<String>,
    pub bitcoin_rpc_username: Option<String>,
    pub bitcoin_rpc_password: Option<String>,
    pub rootstock_rpc_url: Option<String>,
    pub rootstock_rpc_username: Option<String>,
    pub rootstock_rpc_password: Option<String>,
    pub rpc_timeout: Option<u64>,

    pub address: Option<String>,
    pub instance_id: Option<u64>,
    pub extranonce_size: Option<usize>,
    pub job_id_digits: Option<u32>,
    pub pool_sig: Option<String>,
    pub update_interval: Option<u64>,

    pub secondary_poll_interval: Option<u64>,
    pub secondary_connect_retries: Option<usize>,
    pub secondary_submission_limit: Option<usize>,
    pub secondary_submission_window: Option<u64>,
    pub notify_policy: Option<NotifyPolicy>,
    pub secondary_target_override: Option<String>,
}

impl Settings {
    /// Load settings from all sources with proper priority
    pub fn load(options: Options) -> Result<Self> {
        let mut env = BTreeMap::<String, String>::new();

        for (var, value) in env::vars_os() {
            let Some(var) = var.to_str() else {
                continue;
            };

            let Some(key) = var.strip_prefix("MERGEPOOL_") else {
                continue;
            };

            env.insert(
                key.into(),
                value.into_string().map_err(|value| {
                    anyhow!(
                        "environment variable `{var}` not valid unicode: `{}`",
                        value.to_string_lossy()
                    )
                })?,
            );
        }

        Self::merge(options, env)
    }

    /// Merge all configuration sources
    pub fn merge(options: Options, env: BTreeMap<String, String>) -> Result<Self> {
        let settings = Self::from_options(&options);

        let settings = settings.or(Self::from_env(&env)?);

        let config = match Self::find_config_path(&settings) {
            Some(config_path) => toml::from_str(&fs::read_to_string(&config_path).context(
                anyhow!("failed to open config file `{}`", config_path.display()),
            )?)
            .context(anyhow!(
                "failed to deserialize config file `{}`",
                config_path.display()
            ))?,
            None => Config::default(),
        };

        let settings = settings.or(Self::from_config(&config)).or_defaults();

        Self::validate(&settings)?;

        Ok(settings)
    }

    fn find_config_path(settings: &Self) -> Option<PathBuf> {
        if let Some(path) = &settings.config {
            return Some(path.clone());
        }

        if let Some(dir) = &settings.config_dir {
            let path = dir.join("mergepool.toml");
            if path.exists() {
                return Some(path);
            }
        }

        let path = dirs::config_dir()?.join("mergepool").join("mergepool.toml");

        path.exists().then_some(path)
    }

    pub fn from_options(options: &Options) -> Self {
        Self {
            config: options.config.clone(),
            config_dir: options.config_dir.clone(),
            network: options
                .signet
                .then_some(Network::Signet)
                .or(options.regtest.then_some(Network::Regtest))
                .or(options.testnet.then_some(Network::Testnet))
                .or(options.network),
            bitcoin_rpc_url: options.bitcoin_rpc_url.clone(),
            bitcoin_rpc_username: options.bitcoin_rpc_username.clone(),
            bitcoin_rpc_password: options.bitcoin_rpc_password.clone(),
            rootstock_rpc_url: options.rootstock_rpc_url.clone(),
            rootstock_rpc_username: options.rootstock_rpc_username.clone(),
            rootstock_rpc_password: options.rootstock_rpc_password.clone(),
            rpc_timeout: options.rpc_timeout,
            address: options.address.clone(),
            instance_id: options.instance_id,
            extranonce_size: options.extranonce_size,
            job_id_digits: options.job_id_digits,
            pool_sig: options.pool_sig.clone(),
            update_interval: options.update_interval,
            secondary_poll_interval: options.secondary_poll_interval,
            secondary_connect_retries: options.secondary_connect_retries,
            secondary_submission_limit: options.secondary_submission_limit,
            secondary_submission_window: options.secondary_submission_window,
            notify_policy: options.notify_policy,
            secondary_target_override: options.secondary_target_override.clone(),
        }
    }

    pub fn from_env(env: &BTreeMap<String, String>) -> Result<Self> {
        let get_string = |key: &str| env.get(key).cloned();

        let get_path = |key: &str| env.get(key).map(PathBuf::from);

        fn get_parsed<T>(env: &BTreeMap<String, String>, key: &str) -> Result<Option<T>>
        where
            T: FromStr,
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            env.get(key)
                .map(|value| value.parse::<T>())
                .transpose()
                .with_context(|| {
                    format!(
                        "failed to parse environment variable MERGEPOOL_{key} as {}",
                        std::any::type_name::<T>()
                    )
                })
        }

        let notify_policy = env
            .get("NOTIFY_POLICY")
            .map(|policy| policy.parse::<NotifyPolicy>())
            .transpose()
            .context("failed to parse environment variable MERGEPOOL_NOTIFY_POLICY")?;

        Ok(Self {
            config: get_path("CONFIG"),
            config_dir: get_path("CONFIG_DIR"),
            network: get_parsed(env, "NETWORK")?,
            bitcoin_rpc_url: get_string("BITCOIN_RPC_URL"),
            bitcoin_rpc_username: get_string("BITCOIN_RPC_USERNAME"),
            bitcoin_rpc_password: get_string("BITCOIN_RPC_PASSWORD"),
            rootstock_rpc_url: get_string("ROOTSTOCK_RPC_URL"),
            rootstock_rpc_username: get_string("ROOTSTOCK_RPC_USERNAME"),
            rootstock_rpc_password: get_string("ROOTSTOCK_RPC_PASSWORD"),
            rpc_timeout: get_parsed(env, "RPC_TIMEOUT")?,
            address: get_string("ADDRESS"),
            instance_id: get_parsed(env, "INSTANCE_ID")?,
            extranonce_size: get_parsed(env, "EXTRANONCE_SIZE")?,
            job_id_digits: get_parsed(env, "JOB_ID_DIGITS")?,
            pool_sig: get_string("POOL_SIG"),
            update_interval: get_parsed(env, "UPDATE_INTERVAL")?,
            secondary_poll_interval: get_parsed(env, "SECONDARY_POLL_INTERVAL")?,
            secondary_connect_retries: get_parsed(env, "SECONDARY_CONNECT_RETRIES")?,
            secondary_submission_limit: get_parsed(env, "SECONDARY_SUBMISSION_LIMIT")?,
            secondary_submission_window: get_parsed(env, "SECONDARY_SUBMISSION_WINDOW")?,
            notify_policy,
            secondary_target_override: get_string("SECONDARY_TARGET_OVERRIDE"),
        })
    }

    pub fn from_config(config: &Config) -> Self {
        let pool = config.pool.as_ref();
        let rootstock = config.rootstock.as_ref();

        Self {
            config: None,
            config_dir: None,
            // pool section overrides global
            network: pool.and_then(|p| p.network).or(config.network),
            bitcoin_rpc_url: config.bitcoin_rpc_url.clone(),
            bitcoin_rpc_username: config.bitcoin_rpc_username.clone(),
            bitcoin_rpc_password: config.bitcoin_rpc_password.clone(),
            rootstock_rpc_url: rootstock.and_then(|r| r.rpc_url.clone()),
            rootstock_rpc_username: rootstock.and_then(|r| r.rpc_username.clone()),
            rootstock_rpc_password: rootstock.and_then(|r| r.rpc_password.clone()),
            rpc_timeout: config.rpc_timeout,
            address: pool
                .and_then(|p| p.address.clone())
                .or(config.address.clone()),
            instance_id: pool.and_then(|p| p.instance_id),
            extranonce_size: pool.and_then(|p| p.extranonce_size),
            job_id_digits: pool.and_then(|p| p.job_id_digits),
            pool_sig: pool
                .and_then(|p| p.pool_sig.clone())
                .or(config.pool_sig.clone()),
            update_interval: pool.and_then(|p| p.update_interval),
            secondary_poll_interval: rootstock.and_then(|r| r.poll_interval),
            secondary_connect_retries: rootstock.and_then(|r| r.connect_retries),
            secondary_submission_limit: rootstock.and_then(|r| r.submission_limit),
            secondary_submission_window: rootstock.and_then(|r| r.submission_window),
            notify_policy: rootstock.and_then(|r| r.notify_policy),
            secondary_target_override: rootstock.and_then(|r| r.target_override.clone()),
        }
    }

    pub fn or(self, other: Self) -> Self {
        Self {
            config: self.config.or(other.config),
            config_dir: self.config_dir.or(other.config_dir),
            network: self.network.or(other.network),
            bitcoin_rpc_url: self.bitcoin_rpc_url.or(other.bitcoin_rpc_url),
            bitcoin_rpc_username: self.bitcoin_rpc_username.or(other.bitcoin_rpc_username),
            bitcoin_rpc_password: self.bitcoin_rpc_password.or(other.bitcoin_rpc_password),
            rootstock_rpc_url: self.rootstock_rpc_url.or(other.rootstock_rpc_url),
            rootstock_rpc_username: self.rootstock_rpc_username.or(other.rootstock_rpc_username),
            rootstock_rpc_password: self.rootstock_rpc_password.or(other.rootstock_rpc_password),
            rpc_timeout: self.rpc_timeout.or(other.rpc_timeout),
            address: self.address.or(other.address),
            instance_id: self.instance_id.or(other.instance_id),
            extranonce_size: self.extranonce_size.or(other.extranonce_size),
            job_id_digits: self.job_id_digits.or(other.job_id_digits),
            pool_sig: self.pool_sig.or(other.pool_sig),
            update_interval: self.update_interval.or(other.update_interval),
            secondary_poll_interval: self.secondary_poll_interval.or(other.secondary_poll_interval),
            secondary_connect_retries: self
                .secondary_connect_retries
                .or(other.secondary_connect_retries),
            secondary_submission_limit: self
                .secondary_submission_limit
                .or(other.secondary_submission_limit),
            secondary_submission_window: self
                .secondary_submission_window
                .or(other.secondary_submission_window),
            notify_policy: self.notify_policy.or(other.notify_policy),
            secondary_target_override: self
                .secondary_target_override
                .or(other.secondary_target_override),
        }
    }

    fn or_defaults(self) -> Self {
        let defaults = RegistryConfig::default();

        Self {
            config: None,
            config_dir: None,
            network: Some(self.network.unwrap_or(Network::Bitcoin)),
            bitcoin_rpc_url: Some(
                self.bitcoin_rpc_url
                    .unwrap_or_else(|| "http://127.0.0.1:8332".into()),
            ),
            rpc_timeout: Some(self.rpc_timeout.unwrap_or(30)),
            instance_id: Some(self.instance_id.unwrap_or(defaults.instance_id)),
            extranonce_size: Some(self.extranonce_size.unwrap_or(defaults.extranonce_size)),
            job_id_digits: Some(self.job_id_digits.unwrap_or(defaults.job_id_digits)),
            pool_sig: Some(self.pool_sig.unwrap_or_else(|| "/mergepool/".into())),
            update_interval: Some(self.update_interval.unwrap_or(10)),
            secondary_poll_interval: Some(self.secondary_poll_interval.unwrap_or(2)),
            secondary_connect_retries: Some(
                self.secondary_connect_retries
                    .unwrap_or(defaults.secondary_connect_retries),
            ),
            secondary_submission_limit: Some(
                self.secondary_submission_limit
                    .unwrap_or(defaults.secondary_submission_limit),
            ),
            secondary_submission_window: Some(self.secondary_submission_window.unwrap_or(1000)),
            notify_policy: Some(self.notify_policy.unwrap_or(defaults.notify_policy)),
            ..self
        }
    }

    fn validate(settings: &Self) -> Result {
        match (
            &settings.bitcoin_rpc_username,
            &settings.bitcoin_rpc_password,
        ) {
            (None, Some(_)) => bail!("bitcoin RPC password specified without username"),
            (Some(_), None) => bail!("bitcoin RPC username specified without password"),
            _ => {}
        }

        match (
            &settings.rootstock_rpc_username,
            &settings.rootstock_rpc_password,
        ) {
            (None, Some(_)) => bail!("rootstock RPC password specified without username"),
            (Some(_), None) => bail!("rootstock RPC username specified without password"),
            _ => {}
        }

        if let Some(instance_id) = settings.instance_id {
            ensure!(
                instance_id < extranonces::MAX_INSTANCES,
                "instance id {instance_id} out of range: must be below {}",
                extranonces::MAX_INSTANCES
            );
        }

        if let Some(extranonce_size) = settings.extranonce_size {
            let enonce2_size = extranonce_size.saturating_sub(ENONCE1_SIZE);
            ensure!(
                extranonce_size >= ENONCE1_SIZE
                    && (MIN_ENONCE_SIZE..=MAX_ENONCE_SIZE).contains(&enonce2_size),
                "extranonce size {extranonce_size} leaves {enonce2_size} bytes for extranonce2: \
                 must be between {MIN_ENONCE_SIZE} and {MAX_ENONCE_SIZE}",
            );
        }

        if let Some(target) = &settings.secondary_target_override {
            merged_work::parse_target(target)
                .with_context(|| format!("invalid secondary target override `{target}`"))?;
        }

        Ok(())
    }

    pub fn network(&self) -> Network {
        self.network.unwrap_or(Network::Bitcoin)
    }

    pub fn bitcoin_rpc_url(&self) -> Result<Url> {
        let url = self
            .bitcoin_rpc_url
            .as_deref()
            .unwrap_or("http://127.0.0.1:8332");

        url.parse()
            .with_context(|| format!("invalid bitcoin RPC url `{url}`"))
    }

    /// Username and password when both are set, the node's cookie file
    /// otherwise.
    pub fn bitcoin_credentials(&self) -> Result<Auth> {
        if let Some((user, pass)) = self
            .bitcoin_rpc_username
            .as_ref()
            .zip(self.bitcoin_rpc_password.as_ref())
        {
            Ok(Auth::UserPass(user.clone(), pass.clone()))
        } else {
            Ok(Auth::CookieFile(self.cookie_file()?))
        }
    }

    pub fn cookie_file(&self) -> Result<PathBuf> {
        let path = if cfg!(target_os = "linux") {
            dirs::home_dir()
                .context("failed to get cookie file path: could not get home dir")?
                .join(".bitcoin")
        } else {
            dirs::data_dir()
                .context("failed to get cookie file path: could not get data dir")?
                .join("Bitcoin")
        };

        let path = match self.network() {
            Network::Bitcoin => path,
            Network::Testnet => path.join("testnet3"),
            network => path.join(network.to_string()),
        };

        Ok(path.join(".cookie"))
    }

    pub fn rootstock_rpc_url(&self) -> Result<Option<Url>> {
        self.rootstock_rpc_url
            .as_deref()
            .map(|url| {
                url.parse()
                    .with_context(|| format!("invalid rootstock RPC url `{url}`"))
            })
            .transpose()
    }

    pub fn rootstock_rpc_auth(&self) -> Option<(String, String)> {
        self.rootstock_rpc_username
            .clone()
            .zip(self.rootstock_rpc_password.clone())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout.unwrap_or(30))
    }

    /// Payout address, checked against the configured network.
    pub fn address(&self) -> Result<Address> {
        let address = self
            .address
            .as_deref()
            .context("missing payout address: pass --address or set MERGEPOOL_ADDRESS")?;

        address
            .parse::<Address<NetworkUnchecked>>()
            .with_context(|| format!("invalid payout address `{address}`"))?
            .require_network(self.network())
            .with_context(|| format!("payout address `{address}` not valid on {}", self.network()))
    }

    pub fn pool_sig(&self) -> String {
        self.pool_sig
            .clone()
            .unwrap_or_else(|| "/mergepool/".into())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval.unwrap_or(10))
    }

    pub fn secondary_poll_interval(&self) -> Duration {
        Duration::from_secs(self.secondary_poll_interval.unwrap_or(2))
    }

    pub fn registry_config(&self) -> Result<RegistryConfig> {
        let defaults = RegistryConfig::default();

        Ok(RegistryConfig {
            instance_id: self.instance_id.unwrap_or(defaults.instance_id),
            extranonce_size: self.extranonce_size.unwrap_or(defaults.extranonce_size),
            job_id_digits: self.job_id_digits.unwrap_or(defaults.job_id_digits),
            notify_policy: self.notify_policy.unwrap_or(defaults.notify_policy),
            secondary_connect_retries: self
                .secondary_connect_retries
                .unwrap_or(defaults.secondary_connect_retries),
            secondary_submission_limit: self
                .secondary_submission_limit
                .unwrap_or(defaults.secondary_submission_limit),
            secondary_submission_window: self
                .secondary_submission_window
                .map(Duration::from_millis)
                .unwrap_or(defaults.secondary_submission_window),
            secondary_target_override: self
                .secondary_target_override
                .as_deref()
                .map(merged_work::parse_target)
                .transpose()?,
        })
    }

    pub fn primary_backend(&self) -> Result<BitcoinRpc> {
        let url = self.bitcoin_rpc_url()?;

        info!("Connecting to Bitcoin Core at {url}");

        BitcoinRpc::new(
            url.clone(),
            self.bitcoin_credentials()?,
            self.network(),
            self.rpc_timeout(),
        )
        .with_context(|| format!("failed to create bitcoin RPC client for `{url}`"))
    }

    pub fn secondary_backend(&self) -> Result<Option<RootstockRpc>> {
        let Some(url) = self.rootstock_rpc_url()? else {
            return Ok(None);
        };

        info!("Merge mining with Rootstock node at {url}");

        RootstockRpc::new(url.clone(), self.rootstock_rpc_auth(), self.rpc_timeout())
            .map(Some)
            .with_context(|| format!("failed to create rootstock RPC client for `{url}`"))
    }
}
