use super::*;

/// `mnr_getWork` response from the merge-mined chain.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetWork {
    pub block_hash_for_merged_mining: String,
    #[serde(default)]
    pub parent_block_hash: Option<String>,
    #[serde(default)]
    pub fees_paid_to_miner: Option<Value>,
    #[serde(default)]
    pub notify: bool,
    pub target: String,
}

/// Secondary chain work attached to a template: the commitment that goes in
/// the coinbase and the target a share must meet to be submitted there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedWork {
    pub block_hash: [u8; 32],
    pub parent_block_hash: Option<String>,
    pub fees_paid_to_miner: Option<String>,
    pub notify: bool,
    pub target: U256,
}

impl MergedWork {
    pub fn parse(value: Value, target_override: Option<U256>) -> Result<Self, TemplateError> {
        let work = serde_json::from_value::<GetWork>(value)
            .map_err(|source| TemplateError::Malformed { source })?;

        let block_hash = hash_from_hex(
            "blockHashForMergedMining",
            &work.block_hash_for_merged_mining,
        )?;

        let target = match target_override {
            Some(target) => target,
            None => parse_target(&work.target)?,
        };

        Ok(Self {
            block_hash,
            parent_block_hash: work.parent_block_hash,
            fees_paid_to_miner: work.fees_paid_to_miner.map(|fees| match fees {
                Value::String(fees) => fees,
                other => other.to_string(),
            }),
            notify: work.notify,
            target,
        })
    }

    /// Commitment embedded in the primary chain coinbase.
    pub fn tag(&self) -> Vec<u8> {
        [MERGED_MINING_TAG_PREFIX, self.block_hash.as_slice()].concat()
    }

    pub fn block_hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.block_hash))
    }
}

/// Parses a target sent as hex, with or without a `0x` prefix.
pub fn parse_target(s: &str) -> Result<U256, TemplateError> {
    let digits = strip_hex_prefix(s);

    if digits.is_empty() || digits.len() > 64 {
        return Err(TemplateError::InvalidField {
            field: "target",
            message: format!("expected 1 to 64 hex digits, got {}", digits.len()),
        });
    }

    U256::from_str_radix(digits, 16).map_err(|err| TemplateError::InvalidField {
        field: "target",
        message: format!("{err:?}"),
    })
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

fn hash_from_hex(field: &'static str, s: &str) -> Result<[u8; 32], TemplateError> {
    let bytes = hex::decode(strip_hex_prefix(s)).map_err(|err| TemplateError::InvalidField {
        field,
        message: err.to_string(),
    })?;

    <[u8; 32]>::try_from(bytes).map_err(|bytes| TemplateError::InvalidField {
        field,
        message: format!("expected 32 bytes, got {}", bytes.len()),
    })
}
