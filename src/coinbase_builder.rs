use super::*;

/// A coinbase transaction split around its extranonce slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinbaseParts {
    pub part1: Vec<u8>,
    pub part2: Vec<u8>,
}

/// Builds the coinbase for a template. Implementations decide who gets paid
/// and what goes into the scriptSig; the extranonce slot and the merged
/// mining tag must be placed as requested.
pub trait Coinbaser: Send + Sync {
    fn build(
        &self,
        template: &GetBlockTemplate,
        extranonce_size: usize,
        merged_mining_tag: Option<&[u8]>,
    ) -> Result<CoinbaseParts, TemplateError>;
}

/// Pays the full coinbase value to a single address.
#[derive(Debug, Clone)]
pub struct PoolCoinbaser {
    address: Address,
    pool_sig: String,
}

impl PoolCoinbaser {
    pub fn new(address: Address, pool_sig: String) -> Self {
        Self { address, pool_sig }
    }
}

impl Coinbaser for PoolCoinbaser {
    fn build(
        &self,
        template: &GetBlockTemplate,
        extranonce_size: usize,
        merged_mining_tag: Option<&[u8]>,
    ) -> Result<CoinbaseParts, TemplateError> {
        let mut builder = CoinbaseBuilder::new(
            self.address.clone(),
            extranonce_size,
            template.height,
            template.coinbase_value,
        )
        .with_aux(template.coinbaseaux.clone())
        .with_pool_sig(self.pool_sig.clone());

        if let Some(commitment) = &template.default_witness_commitment {
            builder = builder.with_witness_commitment(commitment.clone());
        }

        if let Some(tag) = merged_mining_tag {
            builder = builder.with_merged_mining_tag(tag.to_vec());
        }

        let (_, part1, part2) = builder.build()?;

        Ok(CoinbaseParts { part1, part2 })
    }
}

#[derive(Clone)]
pub struct CoinbaseBuilder {
    address: Address,
    aux: BTreeMap<String, String>,
    extranonce_size: usize,
    height: u64,
    merged_mining_tag: Option<Vec<u8>>,
    pool_sig: Option<String>,
    value: Amount,
    witness_commitment: Option<ScriptBuf>,
}

impl CoinbaseBuilder {
    const MAX_COINBASE_SCRIPT_SIG_SIZE: usize = 100;

    pub fn new(address: Address, extranonce_size: usize, height: u64, value: Amount) -> Self {
        Self {
            address,
            aux: BTreeMap::new(),
            extranonce_size,
            height,
            merged_mining_tag: None,
            pool_sig: None,
            value,
            witness_commitment: None,
        }
    }

    pub fn with_aux(mut self, aux: BTreeMap<String, String>) -> Self {
        self.aux = aux;
        self
    }

    pub fn with_pool_sig(mut self, pool_sig: String) -> Self {
        self.pool_sig = Some(pool_sig);
        self
    }

    pub fn with_witness_commitment(mut self, witness_commitment: ScriptBuf) -> Self {
        self.witness_commitment = Some(witness_commitment);
        self
    }

    pub fn with_merged_mining_tag(mut self, tag: Vec<u8>) -> Self {
        self.merged_mining_tag = Some(tag);
        self
    }

    /// Returns the transaction with a zeroed extranonce slot, along with the
    /// serialized bytes before and after that slot.
    pub fn build(self) -> Result<(Transaction, Vec<u8>, Vec<u8>), TemplateError> {
        let height = i64::try_from(self.height).map_err(|_| TemplateError::Coinbase {
            message: format!("height {} out of range", self.height),
        })?;

        // BIP34 height, encoded the way script push of an integer is
        let mut buf = ScriptBuf::builder().push_int(height).into_script().into_bytes();

        for value in self.aux.values() {
            let flags = hex::decode(value).map_err(|err| TemplateError::InvalidField {
                field: "coinbaseaux",
                message: err.to_string(),
            })?;
            buf.extend_from_slice(&flags);
        }

        let script_prefix_size = buf.len();

        buf.extend_from_slice(&vec![0u8; self.extranonce_size]);

        if let Some(sig) = &self.pool_sig {
            buf.extend_from_slice(sig.as_bytes());
        }

        let script_sig = ScriptBuf::from_bytes(buf);
        let script_sig_size = script_sig.len();

        if script_sig_size > Self::MAX_COINBASE_SCRIPT_SIG_SIZE {
            return Err(TemplateError::Coinbase {
                message: format!(
                    "script sig too large: {script_sig_size} bytes (max {})",
                    Self::MAX_COINBASE_SCRIPT_SIG_SIZE
                ),
            });
        }

        let mut output = vec![TxOut {
            value: self.value,
            script_pubkey: self.address.script_pubkey(),
        }];

        if let Some(witness_commitment) = self.witness_commitment {
            output.push(TxOut {
                value: Amount::ZERO,
                script_pubkey: witness_commitment,
            });
        }

        if let Some(tag) = self.merged_mining_tag {
            let push = PushBytesBuf::try_from(tag).map_err(|err| TemplateError::Coinbase {
                message: format!("merged mining tag: {err}"),
            })?;

            output.push(TxOut {
                value: Amount::ZERO,
                script_pubkey: ScriptBuf::new_op_return(&push),
            });
        }

        let coinbase = Transaction {
            version: bitcoin::transaction::Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig,
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output,
        };

        // offset = size of tx version
        //  + size of #inputs
        //  + size of coinbase outpoint
        //  + size of scriptSig length
        //  + size of everything before the extranonce
        let offset = 4
            + VarInt(coinbase.input.len() as u64).size()
            + 36
            + VarInt(script_sig_size as u64).size()
            + script_prefix_size;

        let bin = consensus::serialize(&coinbase);
        let part1 = bin[..offset].to_vec();
        let part2 = bin[offset + self.extranonce_size..].to_vec();

        Ok((coinbase, part1, part2))
    }
}
