use super::*;

/// Reasons a share is rejected. None of them are fatal to the pool.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ShareError {
    #[snafu(display("incorrect size of extranonce2: expected {expected} bytes"))]
    Extranonce2Size { expected: usize },
    #[snafu(display("incorrect size of ntime: expected 8 hex chars"))]
    NtimeSize,
    #[snafu(display("incorrect size of nonce: expected 8 hex chars"))]
    NonceSize,
    #[snafu(display("invalid {field} hex"))]
    InvalidHex {
        field: &'static str,
        source: stratum::InternalError,
    },
    #[snafu(display("job not found"))]
    JobNotFound { job_id: JobId },
    #[snafu(display("ntime out of range"))]
    NtimeOutOfRange,
    #[snafu(display("duplicate share"))]
    Duplicate,
    #[snafu(display("share above target"))]
    AboveTarget,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TemplateError {
    #[snafu(display("malformed template"))]
    Malformed { source: serde_json::Error },
    #[snafu(display("invalid template field `{field}`: {message}"))]
    InvalidField {
        field: &'static str,
        message: String,
    },
    #[snafu(display("failed to build coinbase: {message}"))]
    Coinbase { message: String },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BackendError {
    #[snafu(display("{backend} refused the connection"))]
    ConnectionRefused { backend: &'static str },
    #[snafu(display("{backend} unavailable: {message}"))]
    Unavailable {
        backend: &'static str,
        message: String,
    },
    #[snafu(display("{backend} RPC error {code}: {message}"))]
    Rpc {
        backend: &'static str,
        code: i64,
        message: String,
    },
    #[snafu(display("bitcoind request failed"))]
    Bitcoind {
        source: bitcoind_async_client::error::ClientError,
    },
    #[snafu(display("{backend} request failed"))]
    Transport {
        backend: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("failed to decode {backend} response: {message}"))]
    Decode {
        backend: &'static str,
        message: String,
    },
}

impl BackendError {
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, Self::ConnectionRefused { .. })
    }

    /// The backend will not recover without operator action.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RefreshError {
    #[snafu(display("backend request failed"))]
    Backend { source: BackendError },
    #[snafu(display("failed to build template"))]
    Template { source: TemplateError },
    #[snafu(display("no primary template to merge secondary work into"))]
    NoPrimaryTemplate,
}
