use {super::*, snafu::ensure};

/// An accepted share. Handles are present for each chain the share was
/// dispatched to as a block.
#[derive(Debug)]
pub struct Submission {
    /// Header in the stratum word order.
    pub header_hex: String,
    pub block_hash: BlockHash,
    pub primary: Option<JoinHandle<Result<bool, BackendError>>>,
    pub secondary: Option<JoinHandle<Result<Value, BackendError>>>,
}

impl Submission {
    pub fn is_block_candidate(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some()
    }
}

impl TemplateRegistry {
    /// Checks a share against its job and dispatches it as a block to every
    /// chain whose target it meets.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_share(
        &self,
        job_id: JobId,
        worker: &str,
        extranonce1: &Extranonce,
        extranonce2: &str,
        ntime: &str,
        nonce: &str,
        difficulty: Difficulty,
    ) -> Result<Submission, ShareError> {
        let expected = self.config.extranonce_size.saturating_sub(ENONCE1_SIZE);

        ensure!(
            extranonce2.len() == expected * 2,
            error::Extranonce2SizeSnafu { expected }
        );
        ensure!(ntime.len() == 8, error::NtimeSizeSnafu);
        ensure!(nonce.len() == 8, error::NonceSizeSnafu);

        let extranonce2 = extranonce2
            .parse::<Extranonce>()
            .map_err(|source| ShareError::InvalidHex {
                field: "extranonce2",
                source,
            })?;
        let ntime = ntime
            .parse::<Ntime>()
            .map_err(|source| ShareError::InvalidHex {
                field: "ntime",
                source,
            })?;
        let nonce = nonce
            .parse::<Nonce>()
            .map_err(|source| ShareError::InvalidHex {
                field: "nonce",
                source,
            })?;

        let template = self.get_job(job_id)?;

        ensure!(template.check_time(ntime), error::NtimeOutOfRangeSnafu);

        ensure!(
            template.register_submission(extranonce1, &extranonce2, ntime, nonce),
            error::DuplicateSnafu
        );

        let coinbase = template.serialize_coinbase(extranonce1, &extranonce2);
        let coinbase_txid = coinbase_txid(&coinbase);
        let merkle_root = template
            .merkle_tree()
            .with_first(TxMerkleNode::from_raw_hash(coinbase_txid.to_raw_hash()));

        let header_hex = hex::encode(template.serialize_header(merkle_root, ntime, nonce));
        let (block_hash, hash) = pow_hash(&template.header(merkle_root, ntime, nonce));

        debug!("Share from {worker} for job {job_id}: {block_hash}");

        ensure!(hash <= difficulty.to_target(), error::AboveTargetSnafu);

        let primary_candidate = hash <= template.target;
        let secondary_candidate = template
            .merged
            .as_ref()
            .is_some_and(|work| hash <= work.target);

        if !primary_candidate && !secondary_candidate {
            return Ok(Submission {
                header_hex,
                block_hash,
                primary: None,
                secondary: None,
            });
        }

        template.finalize(merkle_root, extranonce1, &extranonce2, ntime, nonce);

        let primary = if primary_candidate {
            info!(
                "Block {block_hash} found by {worker} at height {}",
                template.height
            );
            template
                .serialize()
                .map(|block| self.dispatch_block(hex::encode(block)))
        } else {
            None
        };

        let backend = self.secondary.lock().clone();

        let secondary = if !secondary_candidate {
            None
        } else if let Some(backend) = backend {
            if self.state.lock().limiter.try_acquire() {
                info!("Merged mining solution {block_hash} found by {worker}");

                let submission = PartialMerkleSubmission {
                    block_hash_hex: block_hash.to_string(),
                    header_hex: hex::encode(template.serialize_header_le(
                        merkle_root,
                        ntime,
                        nonce,
                    )),
                    coinbase_hex: hex::encode(&coinbase),
                    merkle_hashes: std::iter::once(coinbase_txid.to_string())
                        .chain(
                            template
                                .merkle_tree()
                                .steps()
                                .iter()
                                .map(|step| hex::encode(step.as_byte_array())),
                        )
                        .collect(),
                    tx_count: template.tx_count(),
                };

                Some(dispatch_partial_merkle(backend, submission))
            } else {
                warn!("Merged mining solution {block_hash} withheld by submission rate limit");
                None
            }
        } else {
            debug!("Merged mining solution {block_hash} without a secondary backend");
            None
        };

        Ok(Submission {
            header_hex,
            block_hash,
            primary,
            secondary,
        })
    }

    fn dispatch_block(&self, block_hex: String) -> JoinHandle<Result<bool, BackendError>> {
        let backend = self.primary.clone();

        tokio::spawn(async move {
            let result = backend.submit_block(block_hex).await;

            match &result {
                Ok(true) => info!("Block accepted by primary backend"),
                Ok(false) => warn!("Block rejected by primary backend"),
                Err(err) => error!("Failed to submit block: {err}"),
            }

            result
        })
    }
}

fn dispatch_partial_merkle(
    backend: Arc<dyn SecondaryBackend>,
    submission: PartialMerkleSubmission,
) -> JoinHandle<Result<Value, BackendError>> {
    tokio::spawn(async move {
        let result = backend.submit_partial_merkle_block(submission).await;

        match &result {
            Ok(response) => info!("Merged mining solution submitted: {response}"),
            Err(err) => error!("Failed to submit merged mining solution: {err}"),
        }

        result
    })
}
