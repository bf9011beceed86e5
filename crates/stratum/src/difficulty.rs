use super::*;

/// Target of a difficulty 1 share, `0x00000000ffff0000...`.
pub static DIFFICULTY_1_TARGET: std::sync::LazyLock<U256> =
    std::sync::LazyLock::new(|| U256::from_big_endian(&Target::MAX.to_be_bytes()));

/// Share difficulty assigned to a miner connection.
///
/// Pool difficulties can be fractional, so the target is computed by scaling
/// the difficulty 1 target instead of going through the lossy compact
/// encoding used in block headers.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, DeserializeFromStr, SerializeDisplay)]
pub struct Difficulty(f64);

impl Difficulty {
    pub fn new(difficulty: f64) -> Result<Self> {
        ensure!(
            difficulty.is_finite() && difficulty > 0.0,
            error::ParseSnafu {
                message: format!("difficulty must be finite and > 0, got {difficulty}"),
            }
        );

        Ok(Self(difficulty))
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }

    pub fn to_target(self) -> U256 {
        // 2^32 - 1 keeps DIFFICULTY_1_TARGET * scale within 256 bits.
        const MAX_SCALE: u64 = 0xFFFF_FFFF;

        let max_by_denominator = (u64::MAX as f64 / self.0).floor();
        let scale = max_by_denominator.min(MAX_SCALE as f64).max(1.0) as u64;

        let numerator = DIFFICULTY_1_TARGET.saturating_mul(U256::from(scale));
        let denominator = (self.0 * scale as f64).round() as u64;

        if denominator == 0 {
            U256::MAX
        } else {
            numerator / U256::from(denominator)
        }
    }
}

impl From<u64> for Difficulty {
    fn from(difficulty: u64) -> Self {
        assert!(difficulty > 0, "difficulty must be > 0");
        Self(difficulty as f64)
    }
}

impl FromStr for Difficulty {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let difficulty = s.parse::<f64>().map_err(|err| InternalError::Parse {
            message: format!("invalid difficulty `{s}`: {err}"),
        })?;

        Self::new(difficulty)
    }
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
