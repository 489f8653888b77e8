use thiserror::Error;

/// Zone-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    /// Zone file parsing error
    #[error("Zone parse error: {0}")]
    ParseError(String),
    /// Invalid record format
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Zone missing required SOA record")]
    MissingSOA,
    #[error("Zone contains duplicate SOA records")]
    DuplicateSOA,
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),
    #[error("Zone not found: {0}")]
    ZoneNotFound(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Zone file exceeds maximum size")]
    FileTooLarge,
    #[error("Invalid TTL value: {0}")]
    InvalidTTL(String),
    #[error("Invalid resource record type: {0}")]
    InvalidRRType(String),
    #[error("Zone validation error: {0}")]
    ValidationError(String),
}

impl From<std::io::Error> for ZoneError {
    fn from(err: std::io::Error) -> Self {
        ZoneError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ZoneError>;
