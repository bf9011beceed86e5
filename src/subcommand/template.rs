use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Template {
    #[arg(long, help = "Wait for merged mining work before printing.")]
    pub(crate) merged: bool,
    #[arg(long, help = "Print the mining.notify params array instead of an object.")]
    pub(crate) raw: bool,
}

#[derive(Debug, Serialize)]
struct Output {
    job_id: JobId,
    height: u64,
    previous_block_hash: BlockHash,
    prevhash: PrevHash,
    coinb1: String,
    coinb2: String,
    merkle_branches: Vec<stratum::MerkleNode>,
    version: Version,
    nbits: Nbits,
    ntime: Ntime,
    network_difficulty: f64,
    merged_mining: Option<String>,
    clean_jobs: bool,
}

impl Template {
    pub(crate) async fn run(self, settings: Settings) -> Result {
        let registry = build_registry(&settings).await?;

        if self.merged {
            ensure!(
                registry.has_secondary(),
                "--merged requires a rootstock RPC url"
            );

            match registry.refresh_secondary().await? {
                Refresh::Updated { .. } => {}
                other => bail!("no merged mining work available: {other:?}"),
            }
        }

        let notify = registry
            .get_last_broadcast_args()
            .context("registry has no template")?;

        if self.raw {
            println!("{}", serde_json::to_string(&notify)?);
            return Ok(());
        }

        let job = registry.get_job(notify.job_id)?;

        let output = Output {
            job_id: notify.job_id,
            height: job.height,
            previous_block_hash: job.prev_blockhash(),
            prevhash: notify.prevhash,
            coinb1: notify.coinb1,
            coinb2: notify.coinb2,
            merkle_branches: notify.merkle_branches,
            version: notify.version,
            nbits: notify.nbits,
            ntime: notify.ntime,
            network_difficulty: bitcoin::Target::from_compact(job.bits.to_compact())
                .difficulty_float(),
            merged_mining: job.merged.as_ref().map(|work| work.block_hash_hex()),
            clean_jobs: notify.clean_jobs,
        };

        println!("{}", serde_json::to_string_pretty(&output)?);

        Ok(())
    }
}
