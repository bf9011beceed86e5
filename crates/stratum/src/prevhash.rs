use super::*;

/// Stratum sends the previous block hash with every 4-byte word of the
/// internal byte order flipped to big endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, DeserializeFromStr, SerializeDisplay)]
pub struct PrevHash(BlockHash);

impl PrevHash {
    /// The word-swapped bytes as they appear in the stratum header layout.
    pub fn to_stratum_bytes(self) -> [u8; 32] {
        let mut swapped = [0u8; 32];
        for (src, dst) in self
            .0
            .as_byte_array()
            .chunks_exact(4)
            .zip(swapped.chunks_exact_mut(4))
        {
            BigEndian::write_u32(dst, LittleEndian::read_u32(src));
        }
        swapped
    }
}

impl FromStr for PrevHash {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = <[u8; 32]>::from_hex(s).context(error::HexSnafu { field: "prevhash" })?;

        let mut internal = [0u8; 32];
        for (src, dst) in bytes.chunks_exact(4).zip(internal.chunks_exact_mut(4)) {
            LittleEndian::write_u32(dst, BigEndian::read_u32(src));
        }

        Ok(Self(BlockHash::from_byte_array(internal)))
    }
}

impl Display for PrevHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_stratum_bytes()))
    }
}

impl From<BlockHash> for PrevHash {
    fn from(hash: BlockHash) -> Self {
        Self(hash)
    }
}

impl From<PrevHash> for BlockHash {
    fn from(prevhash: PrevHash) -> Self {
        prevhash.0
    }
}

#[cfg(test)]
mod tests {
    use {super::*, pretty_assertions::assert_eq as pretty_assert_eq};

    #[test]
    fn word_swaps_display_order() {
        let blockhash = "000000000000000000026b3e5b2e3ff8b3d5d0e7b8d1dbf2a4b76f0e8a5a5c7e"
            .parse::<BlockHash>()
            .unwrap();

        let prevhash = PrevHash::from(blockhash);

        pretty_assert_eq!(
            prevhash.to_string(),
            "8a5a5c7ea4b76f0eb8d1dbf2b3d5d0e75b2e3ff800026b3e0000000000000000"
        );
        assert_eq!(prevhash.to_string().parse::<PrevHash>().unwrap(), prevhash);
        assert_eq!(BlockHash::from(prevhash), blockhash);
    }

    #[test]
    fn stratum_bytes_reverse_to_internal_order() {
        let blockhash = BlockHash::from_byte_array(std::array::from_fn(|i| i as u8));
        let swapped = PrevHash::from(blockhash).to_stratum_bytes();
        assert_eq!(&swapped[..8], &[3, 2, 1, 0, 7, 6, 5, 4]);
    }
}
