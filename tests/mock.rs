use super::*;

/// In-memory node serving whatever template it was last given.
pub(crate) struct MockPrimary {
    template: Mutex<Result<Value, &'static str>>,
    pub(crate) template_calls: AtomicUsize,
    pub(crate) blocks: Mutex<Vec<String>>,
}

impl MockPrimary {
    pub(crate) fn new(template: Value) -> Arc<Self> {
        Arc::new(Self {
            template: Mutex::new(Ok(template)),
            template_calls: AtomicUsize::new(0),
            blocks: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn set_template(&self, template: Value) {
        *self.template.lock() = Ok(template);
    }

    pub(crate) fn fail(&self, message: &'static str) {
        *self.template.lock() = Err(message);
    }

    pub(crate) fn blocks(&self) -> Vec<Block> {
        self.blocks
            .lock()
            .iter()
            .map(|block| encode::deserialize_hex(block).unwrap())
            .collect()
    }
}

#[async_trait]
impl PrimaryBackend for MockPrimary {
    async fn get_template(&self) -> Result<Value, BackendError> {
        self.template_calls.fetch_add(1, Ordering::SeqCst);

        // give concurrent callers a chance to interleave
        tokio::task::yield_now().await;

        self.template
            .lock()
            .clone()
            .map_err(|message| BackendError::Rpc {
                backend: "mock",
                code: -10,
                message: message.into(),
            })
    }

    async fn submit_block(&self, block_hex: String) -> Result<bool, BackendError> {
        self.blocks.lock().push(block_hex);
        Ok(true)
    }
}

/// In-memory merge-mined node. Queued errors are returned before any work.
pub(crate) struct MockSecondary {
    work: Mutex<Value>,
    errors: Mutex<VecDeque<BackendError>>,
    pub(crate) work_calls: AtomicUsize,
    pub(crate) submissions: Mutex<Vec<PartialMerkleSubmission>>,
}

impl MockSecondary {
    pub(crate) fn new(work: Value) -> Arc<Self> {
        Arc::new(Self {
            work: Mutex::new(work),
            errors: Mutex::new(VecDeque::new()),
            work_calls: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn set_work(&self, work: Value) {
        *self.work.lock() = work;
    }

    pub(crate) fn push_error(&self, err: BackendError) {
        self.errors.lock().push_back(err);
    }

    pub(crate) fn refuse(&self, times: usize) {
        for _ in 0..times {
            self.push_error(BackendError::ConnectionRefused { backend: "mock" });
        }
    }
}

#[async_trait]
impl SecondaryBackend for MockSecondary {
    async fn get_work(&self) -> Result<Value, BackendError> {
        self.work_calls.fetch_add(1, Ordering::SeqCst);

        tokio::task::yield_now().await;

        if let Some(err) = self.errors.lock().pop_front() {
            return Err(err);
        }

        Ok(self.work.lock().clone())
    }

    async fn submit_partial_merkle_block(
        &self,
        submission: PartialMerkleSubmission,
    ) -> Result<Value, BackendError> {
        self.submissions.lock().push(submission);
        Ok(json!({"blockImportedResult": "IMPORTED_BEST"}))
    }
}
