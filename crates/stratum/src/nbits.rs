use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub struct Nbits(CompactTarget);

impl Nbits {
    pub fn to_compact(self) -> CompactTarget {
        self.0
    }

    pub fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_consensus().to_be_bytes()
    }

    /// The full 256-bit network target this compact encoding expands to.
    pub fn to_target(self) -> U256 {
        U256::from_big_endian(&Target::from_compact(self.0).to_be_bytes())
    }
}

impl FromStr for Nbits {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompactTarget::from_unprefixed_hex(s)
            .map(Self)
            .map_err(|err| InternalError::Parse {
                message: format!("invalid nbits `{s}`: {err}"),
            })
    }
}

impl Display for Nbits {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0.to_consensus())
    }
}

impl From<CompactTarget> for Nbits {
    fn from(compact: CompactTarget) -> Self {
        Self(compact)
    }
}

impl From<Nbits> for CompactTarget {
    fn from(nbits: Nbits) -> Self {
        nbits.0
    }
}
