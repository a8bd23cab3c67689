//! Error types for the bundle codec and data model.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("bundle protocol version {0} is not supported")]
    InvalidVersion(u64),

    #[error("bundle has no payload block")]
    MissingPayload,

    #[error("payload block must be numbered 1, found {0}")]
    InvalidPayloadBlockNumber(u64),

    #[error("payload block must be the final block in the bundle")]
    PayloadNotFinal,

    #[error("duplicate block number {0}")]
    DuplicateBlockNumber(u64),

    #[error("the primary block must be block number 0")]
    InvalidBlockNumber,

    #[error("duplicate extension block of a singleton type {0:?}")]
    DuplicateBlocks(crate::block::Type),

    #[error("fragment offset {offset} + length {len} exceeds total application data unit length {total}")]
    InvalidFragmentInfo {
        offset: u64,
        len: u64,
        total: u64,
    },

    #[error("bundle CRC check failed")]
    InvalidCrc,

    #[error("invalid endpoint id: {0}")]
    InvalidEid(String),

    #[error("invalid CBOR encoding: {0}")]
    InvalidCBOR(#[from] bp7_cbor::decode::Error),

    #[error("invalid value for field '{field}': {source}")]
    InvalidField {
        field: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("unsupported block or CRC type: {0}")]
    Unsupported(String),

    #[error("bundle was altered in a way that invalidates its canonical form")]
    Altered,
}

/// A sidecar trait letting any error type name the struct field it came from,
/// mirroring the capture idiom used across this codec's parsing code.
pub trait HasInvalidField {
    fn invalid_field(self, field: &'static str) -> Error;
}

impl<E> HasInvalidField for E
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn invalid_field(self, field: &'static str) -> Error {
        Error::InvalidField {
            field,
            source: Box::new(self),
        }
    }
}

/// Extension trait for tagging a `Result`'s error with the field that produced it.
pub trait CaptureFieldErr<T> {
    fn field_err(self, field: &'static str) -> Result<T, Error>;
}

impl<T, E> CaptureFieldErr<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn field_err(self, field: &'static str) -> Result<T, Error> {
        self.map_err(|e| e.invalid_field(field))
    }
}
