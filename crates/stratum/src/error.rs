use super::*;

pub type Result<T = (), E = InternalError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InternalError {
    #[snafu(display("invalid {field} hex: {source}"))]
    Hex {
        field: &'static str,
        source: hex::FromHexError,
    },

    #[snafu(display("incorrect size of {field}: expected {expected} hex chars, got {actual}"))]
    WordSize {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[snafu(display("{message}"))]
    Parse { message: String },
}
