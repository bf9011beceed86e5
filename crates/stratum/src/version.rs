use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub struct Version(pub block::Version);

impl Version {
    pub fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_consensus().to_be_bytes()
    }
}

impl FromStr for Version {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n = u32::from_str_radix(s, 16).map_err(|err| InternalError::Parse {
            message: format!("invalid version `{s}`: {err}"),
        })?;

        Ok(Self(block::Version::from_consensus(n as i32)))
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0.to_consensus())
    }
}

impl From<i32> for Version {
    fn from(n: i32) -> Self {
        Self(block::Version::from_consensus(n))
    }
}

impl From<Version> for block::Version {
    fn from(version: Version) -> Self {
        version.0
    }
}
