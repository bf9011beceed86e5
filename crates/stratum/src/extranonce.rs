use super::*;

/// A slice of coinbase nonce space. Extranonce1 is handed out by the pool per
/// connection, extranonce2 is picked by the miner per share.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, DeserializeFromStr, SerializeDisplay)]
pub struct Extranonce(Vec<u8>);

impl Extranonce {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    /// Big-endian encoding of the low `size` bytes of `value`.
    pub fn from_counter(value: u64, size: usize) -> Self {
        assert!(size <= 8, "extranonce counter wider than 8 bytes");
        Self(value.to_be_bytes()[8 - size..].to_vec())
    }

    /// Decodes hex sent by a miner, which must be exactly `size` bytes.
    pub fn from_hex_sized(s: &str, size: usize) -> Result<Self> {
        ensure!(
            s.len() == size * 2,
            error::WordSizeSnafu {
                field: "extranonce2",
                expected: size * 2,
                actual: s.len(),
            }
        );

        s.parse()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl FromStr for Extranonce {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(
            hex::decode(s).context(error::HexSnafu { field: "extranonce" })?,
        ))
    }
}

impl Display for Extranonce {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_is_big_endian_and_truncated() {
        assert_eq!(Extranonce::from_counter(1, 4).to_hex(), "00000001");
        assert_eq!(Extranonce::from_counter(0x0800_0001, 4).to_hex(), "08000001");
        assert_eq!(Extranonce::from_counter(0x1_0000_0002, 4).to_hex(), "00000002");
        assert_eq!(Extranonce::from_counter(0xabcd, 2).len(), 2);
    }

    #[test]
    fn sized_hex_rejects_wrong_width() {
        let err = Extranonce::from_hex_sized("abcd", 4).unwrap_err();
        assert_eq!(
            err.to_string(),
            "incorrect size of extranonce2: expected 8 hex chars, got 4"
        );

        assert_eq!(
            Extranonce::from_hex_sized("0011aabb", 4).unwrap().as_bytes(),
            &[0x00, 0x11, 0xaa, 0xbb]
        );
    }

    #[test]
    fn rejects_non_hex() {
        assert!(
            "zz".parse::<Extranonce>()
                .unwrap_err()
                .to_string()
                .starts_with("invalid extranonce hex")
        );
    }

    #[test]
    fn serializes_as_hex_string() {
        let extranonce = "deadbeef".parse::<Extranonce>().unwrap();
        assert_eq!(serde_json::to_string(&extranonce).unwrap(), r#""deadbeef""#);
        assert_eq!(
            serde_json::from_str::<Extranonce>(r#""deadbeef""#).unwrap(),
            extranonce
        );
    }
}
