use super::*;

/// The subset of a `getblocktemplate` response a job is built from.
#[derive(Clone, Debug, Deserialize)]
pub struct GetBlockTemplate {
    pub bits: Nbits,
    #[serde(rename = "previousblockhash")]
    pub previous_block_hash: BlockHash,
    #[serde(rename = "curtime")]
    pub current_time: u32,
    pub height: u64,
    pub version: i32,
    pub transactions: Vec<TemplateTransaction>,
    #[serde(default)]
    pub coinbaseaux: BTreeMap<String, String>,
    #[serde(rename = "coinbasevalue", with = "bitcoin::amount::serde::as_sat")]
    pub coinbase_value: Amount,
    #[serde(default)]
    pub default_witness_commitment: Option<ScriptBuf>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TemplateTransaction {
    #[serde(default)]
    pub txid: Option<Txid>,
    #[serde(rename = "data", deserialize_with = "tx_from_hex")]
    pub transaction: Transaction,
}

impl TemplateTransaction {
    pub fn txid(&self) -> Txid {
        self.txid
            .unwrap_or_else(|| self.transaction.compute_txid())
    }
}

fn tx_from_hex<'de, D>(d: D) -> Result<Transaction, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(d)?;
    encode::deserialize_hex(&s).map_err(de::Error::custom)
}

impl GetBlockTemplate {
    pub fn parse(value: Value) -> Result<Self, TemplateError> {
        serde_json::from_value(value).map_err(|source| TemplateError::Malformed { source })
    }
}

#[derive(Debug, Clone)]
struct Solution {
    header: Header,
    coinbase: Vec<u8>,
}

/// A unit of work handed to miners.
///
/// Everything but the submitted solutions and the final solution is fixed
/// at construction. Templates built from the same backend response share its
/// transactions.
#[derive(Debug)]
pub struct BlockTemplate {
    pub job_id: JobId,
    pub height: u64,
    pub version: Version,
    pub prevhash: PrevHash,
    pub bits: Nbits,
    pub curtime: Ntime,
    /// Backend clock minus local clock, in seconds.
    pub time_offset: i64,
    /// Primary chain target, from `bits`.
    pub target: U256,
    /// Present when the template carries a merged mining commitment.
    pub merged: Option<MergedWork>,
    coinbase: CoinbaseParts,
    extranonce_size: usize,
    merkle_tree: MerkleTree,
    source: Arc<GetBlockTemplate>,
    submissions: Mutex<HashSet<(Extranonce, Extranonce, Ntime, Nonce)>>,
    solution: Mutex<Option<Solution>>,
}

impl BlockTemplate {
    pub fn from_backend(
        job_id: JobId,
        template: Arc<GetBlockTemplate>,
        coinbaser: &dyn Coinbaser,
        extranonce_size: usize,
        merged: Option<MergedWork>,
        now: u64,
    ) -> Result<Self, TemplateError> {
        let tag = merged.as_ref().map(MergedWork::tag);
        let coinbase = coinbaser.build(&template, extranonce_size, tag.as_deref())?;

        let merkle_tree = MerkleTree::new(
            template
                .transactions
                .iter()
                .map(|tx| TxMerkleNode::from_raw_hash(tx.txid().to_raw_hash()))
                .collect(),
        );

        let now = i64::try_from(now).map_err(|_| TemplateError::InvalidField {
            field: "curtime",
            message: format!("local clock {now} out of range"),
        })?;

        Ok(Self {
            job_id,
            height: template.height,
            version: Version::from(template.version),
            prevhash: PrevHash::from(template.previous_block_hash),
            bits: template.bits,
            curtime: Ntime::from(template.current_time),
            time_offset: i64::from(template.current_time) - now,
            target: template.bits.to_target(),
            merged,
            coinbase,
            extranonce_size,
            merkle_tree,
            source: template,
            submissions: Mutex::new(HashSet::new()),
            solution: Mutex::new(None),
        })
    }

    pub fn prev_blockhash(&self) -> BlockHash {
        self.prevhash.into()
    }

    pub fn extranonce_size(&self) -> usize {
        self.extranonce_size
    }

    pub fn merkle_tree(&self) -> &MerkleTree {
        &self.merkle_tree
    }

    /// The backend response this template was built from.
    pub fn source(&self) -> &Arc<GetBlockTemplate> {
        &self.source
    }

    /// The coinbase plus every ordinary transaction.
    pub fn tx_count(&self) -> usize {
        1 + self.source.transactions.len()
    }

    /// Records a solution tuple, returning false if it was already seen.
    pub fn register_submission(
        &self,
        extranonce1: &Extranonce,
        extranonce2: &Extranonce,
        ntime: Ntime,
        nonce: Nonce,
    ) -> bool {
        self.submissions
            .lock()
            .insert((extranonce1.clone(), extranonce2.clone(), ntime, nonce))
    }

    pub fn check_time(&self, ntime: Ntime) -> bool {
        self.check_time_at(ntime, unix_time())
    }

    pub fn check_time_at(&self, ntime: Ntime, now: u64) -> bool {
        let ntime = u64::from(u32::from(ntime));
        ntime >= u64::from(u32::from(self.curtime)) && ntime <= now + MAX_NTIME_OFFSET
    }

    pub fn serialize_coinbase(&self, extranonce1: &Extranonce, extranonce2: &Extranonce) -> Vec<u8> {
        let mut coinbase = Vec::with_capacity(
            self.coinbase.part1.len() + self.extranonce_size + self.coinbase.part2.len(),
        );
        coinbase.extend_from_slice(&self.coinbase.part1);
        coinbase.extend_from_slice(extranonce1.as_bytes());
        coinbase.extend_from_slice(extranonce2.as_bytes());
        coinbase.extend_from_slice(&self.coinbase.part2);
        coinbase
    }

    pub fn header(&self, merkle_root: TxMerkleNode, ntime: Ntime, nonce: Nonce) -> Header {
        Header {
            version: self.version.into(),
            prev_blockhash: self.prev_blockhash(),
            merkle_root,
            time: ntime.into(),
            bits: self.bits.to_compact(),
            nonce: nonce.into(),
        }
    }

    /// The header in the stratum layout, every 4-byte word byte-swapped
    /// relative to the consensus encoding.
    pub fn serialize_header(&self, merkle_root: TxMerkleNode, ntime: Ntime, nonce: Nonce) -> [u8; 80] {
        swap_words(&self.serialize_header_le(merkle_root, ntime, nonce))
    }

    /// The consensus encoding of the header.
    pub fn serialize_header_le(
        &self,
        merkle_root: TxMerkleNode,
        ntime: Ntime,
        nonce: Nonce,
    ) -> [u8; 80] {
        let mut bytes = [0u8; 80];
        bytes.copy_from_slice(&consensus::serialize(&self.header(merkle_root, ntime, nonce)));
        bytes
    }

    /// Fills in the solved header and coinbase. A later call overwrites an
    /// earlier one.
    pub fn finalize(
        &self,
        merkle_root: TxMerkleNode,
        extranonce1: &Extranonce,
        extranonce2: &Extranonce,
        ntime: Ntime,
        nonce: Nonce,
    ) {
        let solution = Solution {
            header: self.header(merkle_root, ntime, nonce),
            coinbase: self.serialize_coinbase(extranonce1, extranonce2),
        };

        *self.solution.lock() = Some(solution);
    }

    pub fn is_finalized(&self) -> bool {
        self.solution.lock().is_some()
    }

    pub fn block_hash(&self) -> Option<BlockHash> {
        self.solution
            .lock()
            .as_ref()
            .map(|solution| solution.header.block_hash())
    }

    /// The full block of a finalized template.
    pub fn serialize(&self) -> Option<Vec<u8>> {
        let solution = self.solution.lock();
        let solution = solution.as_ref()?;

        let mut block = consensus::serialize(&solution.header);
        block.extend_from_slice(&consensus::serialize(&VarInt(self.tx_count() as u64)));
        block.extend_from_slice(&solution.coinbase);

        for tx in &self.source.transactions {
            block.extend_from_slice(&consensus::serialize(&tx.transaction));
        }

        Some(block)
    }

    pub fn notify(&self, clean_jobs: bool) -> Notify {
        Notify {
            job_id: self.job_id,
            prevhash: self.prevhash,
            coinb1: hex::encode(&self.coinbase.part1),
            coinb2: hex::encode(&self.coinbase.part2),
            merkle_branches: self.merkle_tree.branch(),
            version: self.version,
            nbits: self.bits,
            ntime: self.curtime,
            clean_jobs,
        }
    }
}

/// Proof of work of a header: its double SHA256 read as a little-endian
/// integer.
pub fn pow_hash(header: &Header) -> (BlockHash, U256) {
    let block_hash = header.block_hash();
    (block_hash, U256::from_little_endian(block_hash.as_byte_array()))
}

pub fn coinbase_txid(coinbase: &[u8]) -> Txid {
    Txid::from_raw_hash(sha256d::Hash::hash(coinbase))
}

fn swap_words(bytes: &[u8; 80]) -> [u8; 80] {
    let mut swapped = *bytes;
    for word in swapped.chunks_exact_mut(4) {
        word.reverse();
    }
    swapped
}
