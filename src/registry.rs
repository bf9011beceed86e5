use super::*;

pub use submit::Submission;

mod submit;

/// When secondary-derived templates are announced to miners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotifyPolicy {
    /// Every new secondary work unit.
    #[default]
    Always,
    /// Only when the secondary backend sets its notify flag.
    Signal,
    /// Only when the secondary chain's parent block changed.
    ParentChanged,
}

impl FromStr for NotifyPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(Self::Always),
            "signal" => Ok(Self::Signal),
            "parent-changed" => Ok(Self::ParentChanged),
            _ => bail!("invalid notify policy `{s}`: expected always, signal or parent-changed"),
        }
    }
}

impl Display for NotifyPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Always => "always",
            Self::Signal => "signal",
            Self::ParentChanged => "parent-changed",
        })
    }
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub instance_id: u64,
    pub extranonce_size: usize,
    pub job_id_digits: u32,
    pub notify_policy: NotifyPolicy,
    pub secondary_connect_retries: usize,
    pub secondary_submission_limit: usize,
    pub secondary_submission_window: Duration,
    pub secondary_target_override: Option<U256>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            instance_id: 0,
            extranonce_size: 8,
            job_id_digits: 4,
            notify_policy: NotifyPolicy::Always,
            secondary_connect_retries: 3,
            secondary_submission_limit: 3,
            secondary_submission_window: Duration::from_millis(1000),
            secondary_target_override: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A template on a previously unseen chain tip was registered.
    NewBlock { prevhash: PrevHash },
    /// Work to broadcast. `new_block` doubles as the clean jobs flag.
    NewTemplate { new_block: bool, notify: Notify },
}

/// Outcome of a refresh that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Another refresh of the same chain is in flight, or there is no
    /// secondary backend.
    Skipped,
    Updated { job_id: JobId, new_block: bool },
    /// The secondary backend kept refusing connections; try again next poll.
    Deferred,
    /// The secondary backend is gone for good and was released.
    Released,
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct State {
    extranonces: ExtranonceAllocator,
    job_ids: JobIdAllocator,
    jobs: Jobs,
    last_parent_hash: Option<String>,
    last_primary_update: Option<Instant>,
    last_secondary_update: Option<Instant>,
    limiter: SubmissionLimiter,
    primary: Option<Arc<GetBlockTemplate>>,
}

/// Owns the live jobs, keeps them fresh from both backends and checks the
/// shares miners submit against them.
pub struct TemplateRegistry {
    coinbaser: Arc<dyn Coinbaser>,
    config: RegistryConfig,
    events: broadcast::Sender<Event>,
    primary: Arc<dyn PrimaryBackend>,
    primary_refreshing: AtomicBool,
    secondary: Mutex<Option<Arc<dyn SecondaryBackend>>>,
    secondary_refreshing: AtomicBool,
    state: Mutex<State>,
}

impl TemplateRegistry {
    const EVENT_CHANNEL_CAPACITY: usize = 64;

    /// Builds the registry and its first primary template.
    pub async fn new(
        primary: Arc<dyn PrimaryBackend>,
        secondary: Option<Arc<dyn SecondaryBackend>>,
        coinbaser: Arc<dyn Coinbaser>,
        config: RegistryConfig,
    ) -> Result<Arc<Self>> {
        let state = State {
            extranonces: ExtranonceAllocator::new(config.instance_id, config.extranonce_size)?,
            job_ids: JobIdAllocator::new(config.job_id_digits)?,
            jobs: Jobs::new(),
            last_parent_hash: None,
            last_primary_update: None,
            last_secondary_update: None,
            limiter: SubmissionLimiter::new(
                config.secondary_submission_limit,
                config.secondary_submission_window,
            ),
            primary: None,
        };

        let (events, _) = broadcast::channel(Self::EVENT_CHANNEL_CAPACITY);

        let registry = Arc::new(Self {
            coinbaser,
            config,
            events,
            primary,
            primary_refreshing: AtomicBool::new(false),
            secondary: Mutex::new(secondary),
            secondary_refreshing: AtomicBool::new(false),
            state: Mutex::new(state),
        });

        registry
            .refresh_primary()
            .await
            .context("failed to build initial block template")?;

        Ok(registry)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn get_new_extranonce1(&self) -> Extranonce {
        self.state.lock().extranonces.get_new()
    }

    pub fn extranonce2_size(&self) -> usize {
        self.state.lock().extranonces.enonce2_size()
    }

    /// Broadcast arguments of the template new connections should mine.
    pub fn get_last_broadcast_args(&self) -> Option<Notify> {
        self.state
            .lock()
            .jobs
            .latest()
            .map(|template| template.notify(true))
    }

    pub fn get_job(&self, job_id: JobId) -> Result<Arc<BlockTemplate>, ShareError> {
        self.state
            .lock()
            .jobs
            .get(job_id)
            .cloned()
            .ok_or(ShareError::JobNotFound { job_id })
    }

    pub fn last_primary_update(&self) -> Option<Instant> {
        self.state.lock().last_primary_update
    }

    pub fn last_secondary_update(&self) -> Option<Instant> {
        self.state.lock().last_secondary_update
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.lock().is_some()
    }

    pub fn provision_secondary(&self, backend: Arc<dyn SecondaryBackend>) {
        info!("Secondary backend provisioned");
        *self.secondary.lock() = Some(backend);
    }

    pub fn release_secondary(&self) {
        if self.secondary.lock().take().is_some() {
            warn!("Secondary backend released");
        }
    }

    pub async fn refresh_primary(&self) -> Result<Refresh, RefreshError> {
        let Some(_in_flight) = InFlight::acquire(&self.primary_refreshing) else {
            debug!("Primary refresh already in progress");
            return Ok(Refresh::Skipped);
        };

        self.state.lock().last_primary_update = Some(Instant::now());

        let result = self.update_primary().await;

        if let Err(err) = &result {
            warn!(
                "Primary refresh failed, keeping current template: {}",
                snafu::Report::from_error(err)
            );
        }

        result
    }

    async fn update_primary(&self) -> Result<Refresh, RefreshError> {
        let value = self
            .primary
            .get_template()
            .await
            .map_err(|source| RefreshError::Backend { source })?;

        let data = Arc::new(GetBlockTemplate::parse(value).map_err(template_error)?);

        let mut state = self.state.lock();

        let job_id = state.job_ids.next_id();

        let template = BlockTemplate::from_backend(
            job_id,
            data.clone(),
            self.coinbaser.as_ref(),
            self.config.extranonce_size,
            None,
            unix_time(),
        )
        .map_err(template_error)?;

        info!(
            "New block template {job_id} for height {} with {} transactions",
            template.height,
            template.tx_count() - 1
        );

        state.primary = Some(data);

        let new_block = self.add_template_locked(&mut state, template);

        Ok(Refresh::Updated { job_id, new_block })
    }

    pub async fn refresh_secondary(&self) -> Result<Refresh, RefreshError> {
        let Some(backend) = self.secondary.lock().clone() else {
            debug!("No secondary backend, skipping refresh");
            return Ok(Refresh::Skipped);
        };

        let Some(_in_flight) = InFlight::acquire(&self.secondary_refreshing) else {
            debug!("Secondary refresh already in progress");
            return Ok(Refresh::Skipped);
        };

        self.state.lock().last_secondary_update = Some(Instant::now());

        let result = self.update_secondary(backend.as_ref()).await;

        if let Err(err) = &result {
            warn!("Secondary refresh failed: {}", snafu::Report::from_error(err));
        }

        result
    }

    async fn update_secondary(
        &self,
        backend: &dyn SecondaryBackend,
    ) -> Result<Refresh, RefreshError> {
        let retries = self.config.secondary_connect_retries;
        let mut attempt = 0;

        let value = loop {
            match backend.get_work().await {
                Ok(value) => break value,
                Err(err) if err.is_connection_refused() && attempt < retries => {
                    attempt += 1;
                    info!("Secondary backend refused connection, retry {attempt}/{retries}");
                }
                Err(err) if err.is_connection_refused() => {
                    warn!("Secondary backend refused connection, trying again next poll");
                    return Ok(Refresh::Deferred);
                }
                Err(err) if err.is_permanent() => {
                    warn!("Secondary backend unavailable: {err}");
                    self.release_secondary();
                    return Ok(Refresh::Released);
                }
                Err(source) => return Err(RefreshError::Backend { source }),
            }
        };

        let work = MergedWork::parse(value, self.config.secondary_target_override)
            .map_err(template_error)?;

        let mut state = self.state.lock();

        let data = state.primary.clone().ok_or(RefreshError::NoPrimaryTemplate)?;

        let job_id = state.job_ids.next_id();

        let template = BlockTemplate::from_backend(
            job_id,
            data,
            self.coinbaser.as_ref(),
            self.config.extranonce_size,
            Some(work),
            unix_time(),
        )
        .map_err(template_error)?;

        info!("New merged mining template {job_id} for height {}", template.height);

        let new_block = self.add_template_locked(&mut state, template);

        Ok(Refresh::Updated { job_id, new_block })
    }

    /// Registers a template and announces it. Returns whether it opened a
    /// new chain tip.
    pub fn add_template(&self, template: BlockTemplate) -> bool {
        let mut state = self.state.lock();
        self.add_template_locked(&mut state, template)
    }

    fn add_template_locked(&self, state: &mut State, template: BlockTemplate) -> bool {
        let announce = self.passes_notify_policy(state, &template);
        let prevhash = template.prevhash;
        let job_id = template.job_id;

        let new_block = state.jobs.insert(template);

        if new_block {
            info!("New block {}", BlockHash::from(prevhash));
            self.events.send(Event::NewBlock { prevhash }).ok();
        }

        // A new chain tip goes out regardless of policy.
        if !(announce || new_block) {
            debug!("Notify policy {} withholds job {job_id}", self.config.notify_policy);
            return new_block;
        }

        if let Some(template) = state.jobs.get(job_id) {
            self.events
                .send(Event::NewTemplate {
                    new_block,
                    notify: template.notify(new_block),
                })
                .ok();
        }

        new_block
    }

    fn passes_notify_policy(&self, state: &mut State, template: &BlockTemplate) -> bool {
        let Some(work) = &template.merged else {
            return true;
        };

        match self.config.notify_policy {
            NotifyPolicy::Always => true,
            NotifyPolicy::Signal => work.notify,
            NotifyPolicy::ParentChanged => {
                let changed = state.last_parent_hash != work.parent_block_hash;
                state.last_parent_hash = work.parent_block_hash.clone();
                changed
            }
        }
    }
}

fn template_error(source: TemplateError) -> RefreshError {
    RefreshError::Template { source }
}
