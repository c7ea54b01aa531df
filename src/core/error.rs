use std::fmt;
use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;

/// Failure of the backing ledger. Always aborts the enclosing transaction.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt ledger data: {0}")]
    Corrupt(String),
    #[error("ledger serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("transaction {0} already committed")]
    DuplicateTransaction(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("the asset {0} already exists")]
    AlreadyExists(String),

    #[error("the asset {0} does not exist")]
    NotFound(String),

    #[error("given id {id} is not bound to asset {chunk_id}")]
    IdMismatch { id: String, chunk_id: String },

    #[error("unable to decode input: {0}")]
    Decode(String),

    #[error("unable to encode output: {0}")]
    Encode(String),

    #[error("asset {0}: given data hash differs from stored one")]
    IntegrityMismatch(String),

    #[error("policy with id {0:?} is not allowed")]
    PolicyNotFound(String),

    #[error("asset {0}: a policy needs to be applied first")]
    PolicyNotApplied(String),

    #[error("asset {0}: expiry date not computed yet, run UpdateChunkExpiryDate")]
    ExpiryNotComputed(String),

    #[error("asset {chunk_id}: expiry date {expiry_date} not reached yet")]
    NotYetExpired {
        chunk_id: String,
        expiry_date: OffsetDateTime,
    },

    #[error("asset {0}: expiry date is already present and up to date")]
    NoChange(String),

    #[error(
        "input arrays have different sizes: {ids} ids, {data} data, {policies} policies"
    )]
    SizeMismatch {
        ids: usize,
        data: usize,
        policies: usize,
    },

    #[error(
        "unable to parse timestamp {input:?}, \
         use RFC 3339 syntax such as \"2014-11-12T11:45:26.371Z\""
    )]
    Parse { input: String },

    #[error("queries to future dates are not allowed: {0}")]
    FutureDateRejected(OffsetDateTime),

    #[error("asset {0}: history is empty")]
    EmptyHistory(String),

    #[error("expiry period {period:?} overflows the creation time of asset {chunk_id}")]
    ExpiryOverflow { chunk_id: String, period: Duration },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to access world state: {0}")]
    Store(#[from] StoreError),
}

/// Fieldless discriminant of [`Error`], for callers that branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AlreadyExists,
    NotFound,
    IdMismatch,
    Decode,
    Encode,
    IntegrityMismatch,
    PolicyNotFound,
    PolicyNotApplied,
    ExpiryNotComputed,
    NotYetExpired,
    NoChange,
    SizeMismatch,
    Parse,
    FutureDateRejected,
    EmptyHistory,
    ExpiryOverflow,
    InvalidArgument,
    Store,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::IdMismatch { .. } => ErrorKind::IdMismatch,
            Error::Decode(_) => ErrorKind::Decode,
            Error::Encode(_) => ErrorKind::Encode,
            Error::IntegrityMismatch(_) => ErrorKind::IntegrityMismatch,
            Error::PolicyNotFound(_) => ErrorKind::PolicyNotFound,
            Error::PolicyNotApplied(_) => ErrorKind::PolicyNotApplied,
            Error::ExpiryNotComputed(_) => ErrorKind::ExpiryNotComputed,
            Error::NotYetExpired { .. } => ErrorKind::NotYetExpired,
            Error::NoChange(_) => ErrorKind::NoChange,
            Error::SizeMismatch { .. } => ErrorKind::SizeMismatch,
            Error::Parse { .. } => ErrorKind::Parse,
            Error::FutureDateRejected(_) => ErrorKind::FutureDateRejected,
            Error::EmptyHistory(_) => ErrorKind::EmptyHistory,
            Error::ExpiryOverflow { .. } => ErrorKind::ExpiryOverflow,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Store(_) => ErrorKind::Store,
        }
    }
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::IdMismatch => "IdMismatch",
            ErrorKind::Decode => "DecodeError",
            ErrorKind::Encode => "EncodeError",
            ErrorKind::IntegrityMismatch => "IntegrityMismatch",
            ErrorKind::PolicyNotFound => "PolicyNotFound",
            ErrorKind::PolicyNotApplied => "PolicyNotApplied",
            ErrorKind::ExpiryNotComputed => "ExpiryNotComputed",
            ErrorKind::NotYetExpired => "NotYetExpired",
            ErrorKind::NoChange => "NoChange",
            ErrorKind::SizeMismatch => "SizeMismatch",
            ErrorKind::Parse => "ParseError",
            ErrorKind::FutureDateRejected => "FutureDateRejected",
            ErrorKind::EmptyHistory => "EmptyHistory",
            ErrorKind::ExpiryOverflow => "ExpiryOverflow",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::Store => "StoreError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
