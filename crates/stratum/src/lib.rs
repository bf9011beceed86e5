use {
    bitcoin::{
        BlockHash, CompactTarget, Target, TxMerkleNode, block,
        hashes::{Hash, sha256d},
    },
    byteorder::{BigEndian, ByteOrder, LittleEndian},
    hex::FromHex,
    primitive_types::U256,
    serde::{
        Deserialize, Serialize, Serializer,
        de::Deserializer,
        ser::SerializeSeq,
    },
    serde_with::{DeserializeFromStr, SerializeDisplay},
    snafu::{ResultExt, Snafu, ensure},
    std::{
        fmt::{self, Display, Formatter},
        str::FromStr,
    },
};

pub use {
    difficulty::{DIFFICULTY_1_TARGET, Difficulty},
    error::{InternalError, Result},
    extranonce::Extranonce,
    job_id::JobId,
    merkle::{MerkleNode, MerkleTree},
    nbits::Nbits,
    nonce::Nonce,
    notify::Notify,
    ntime::Ntime,
    prevhash::PrevHash,
    version::Version,
};

mod difficulty;
mod error;
mod extranonce;
mod job_id;
mod merkle;
mod nbits;
mod nonce;
mod notify;
mod ntime;
mod prevhash;
mod version;

/// Header words travel as exactly eight hex characters.
pub const HEADER_WORD_HEX_LEN: usize = 8;

/// Parses a 32-bit header word sent as exactly eight hex characters.
fn parse_header_word(field: &'static str, s: &str) -> Result<u32> {
    ensure!(
        s.len() == HEADER_WORD_HEX_LEN,
        error::WordSizeSnafu {
            field,
            expected: HEADER_WORD_HEX_LEN,
            actual: s.len(),
        }
    );

    let bytes = <[u8; 4]>::from_hex(s).context(error::HexSnafu { field })?;

    Ok(BigEndian::read_u32(&bytes))
}
