use super::*;

/// Short hex job ids that count up and wrap back to 1 just before the
/// all-`f` value of their digit width.
#[derive(Debug)]
pub struct JobIdAllocator {
    counter: u64,
    modulus: u64,
}

impl JobIdAllocator {
    pub fn new(digits: u32) -> Result<Self> {
        ensure!(
            (2..=15).contains(&digits),
            "job id digits {} outside 2..=15",
            digits
        );

        Ok(Self {
            counter: 0,
            modulus: 16u64.pow(digits) - 1,
        })
    }

    pub fn next_id(&mut self) -> JobId {
        self.counter += 1;

        if self.counter % self.modulus == 0 {
            self.counter = 1;
        }

        JobId::new(self.counter)
    }
}

/// Live templates grouped by the chain tip they build on. Only the bucket of
/// the most recent tip is kept; the index maps job ids into it.
#[derive(Debug, Default)]
pub(crate) struct Jobs {
    buckets: HashMap<BlockHash, Vec<Arc<BlockTemplate>>>,
    index: HashMap<JobId, BlockHash>,
    latest: Option<JobId>,
}

impl Jobs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a template and returns whether its prevhash opened a new
    /// bucket. Opening a bucket evicts every other one.
    pub(crate) fn insert(&mut self, template: BlockTemplate) -> bool {
        let prevhash = template.prev_blockhash();
        let new_block = !self.buckets.contains_key(&prevhash);

        if new_block {
            self.buckets.retain(|key, _| *key == prevhash);
            self.index.retain(|_, key| *key == prevhash);
        }

        self.latest = Some(template.job_id);
        self.index.insert(template.job_id, prevhash);
        self.buckets
            .entry(prevhash)
            .or_default()
            .push(Arc::new(template));

        new_block
    }

    pub(crate) fn get(&self, job_id: JobId) -> Option<&Arc<BlockTemplate>> {
        let prevhash = self.index.get(&job_id)?;

        self.buckets
            .get(prevhash)?
            .iter()
            .rev()
            .find(|template| template.job_id == job_id)
    }

    pub(crate) fn latest(&self) -> Option<&Arc<BlockTemplate>> {
        self.latest.and_then(|job_id| self.get(job_id))
    }

    #[cfg(test)]
    pub(crate) fn contains_block(&self, prevhash: BlockHash) -> bool {
        self.buckets.contains_key(&prevhash)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::block_template::tests::template_on};

    #[track_caller]
    fn assert_invariants(jobs: &Jobs) {
        assert!(jobs.buckets.len() <= 1, "more than one live bucket");

        for (job_id, prevhash) in &jobs.index {
            let bucket = jobs.buckets.get(prevhash).expect("index points at evicted bucket");
            assert!(bucket.iter().any(|template| template.job_id == *job_id));
        }

        if let Some(latest) = jobs.latest {
            assert!(jobs.get(latest).is_some());
        }
    }

    #[test]
    fn job_ids_increase_and_wrap_before_all_f() {
        let mut allocator = JobIdAllocator::new(4).unwrap();

        assert_eq!(allocator.next_id().to_string(), "1");
        assert_eq!(allocator.next_id().to_string(), "2");

        allocator.counter = 0xfffd;
        assert_eq!(allocator.next_id().to_string(), "fffe");
        assert_eq!(allocator.next_id().to_string(), "1");
        assert_eq!(allocator.next_id().to_string(), "2");
    }

    #[test]
    fn job_id_digits_are_validated() {
        assert!(JobIdAllocator::new(1).is_err());
        assert!(JobIdAllocator::new(16).is_err());
        assert!(JobIdAllocator::new(2).is_ok());
    }

    #[test]
    fn same_prevhash_shares_bucket() {
        let mut jobs = Jobs::new();

        assert!(jobs.insert(template_on(1, 7)));
        assert!(!jobs.insert(template_on(2, 7)));
        assert_invariants(&jobs);

        assert_eq!(jobs.len(), 2);
        assert!(jobs.get(JobId::new(1)).is_some());
        assert!(jobs.get(JobId::new(2)).is_some());
        assert_eq!(jobs.latest().unwrap().job_id, JobId::new(2));
    }

    #[test]
    fn new_prevhash_evicts_other_buckets() {
        let mut jobs = Jobs::new();

        jobs.insert(template_on(1, 7));
        jobs.insert(template_on(2, 7));
        assert!(jobs.insert(template_on(3, 8)));
        assert_invariants(&jobs);

        assert!(jobs.get(JobId::new(1)).is_none());
        assert!(jobs.get(JobId::new(2)).is_none());
        assert!(jobs.get(JobId::new(3)).is_some());
        assert_eq!(jobs.len(), 1);
        assert!(!jobs.contains_block(template_on(0, 7).prev_blockhash()));
    }

    #[test]
    fn reused_job_id_resolves_to_newest() {
        let mut jobs = Jobs::new();

        jobs.insert(template_on(1, 7));
        let mut newer = template_on(1, 7);
        newer.height = 99;
        jobs.insert(newer);

        assert_eq!(jobs.get(JobId::new(1)).unwrap().height, 99);
        assert_eq!(jobs.len(), 2);
    }

    #[test]
    fn unknown_job_id() {
        let mut jobs = Jobs::new();
        assert!(jobs.latest().is_none());

        jobs.insert(template_on(1, 7));
        assert!(jobs.get(JobId::new(42)).is_none());
    }
}
