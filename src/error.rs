//! Errors raised while decoding and converting captures

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("preamble is {actual} bytes, expected at least {expected}")]
    PreambleLength { expected: usize, actual: usize },
    #[error("field {name} ({width} bytes at offset {offset}) exceeds buffer of {len} bytes")]
    FieldOutOfBounds {
        name: &'static str,
        offset: usize,
        width: usize,
        len: usize,
    },
    #[error("preamble record has {actual} fields, expected {expected}")]
    FieldCount { expected: usize, actual: usize },
    #[error("preamble field {0} is empty")]
    EmptyField(&'static str),
    #[error("preamble field {key} has invalid value {value:?}")]
    InvalidField { key: &'static str, value: String },
    #[error("index {index} is outside the {table} table ({len} entries)")]
    TableIndex {
        table: &'static str,
        index: usize,
        len: usize,
    },
    #[error("payload of {len} bytes is not a multiple of the {width}-byte sample width")]
    PayloadWidth { len: usize, width: usize },
    #[error("transfer of {len} bytes is shorter than its {framing}-byte framing")]
    TruncatedTransfer { len: usize, framing: usize },
    #[error("malformed length-prefixed block header")]
    BlockHeader,
    #[error("block declares {declared} payload bytes but only {available} remain")]
    TruncatedBlock { declared: usize, available: usize },
    #[error("invalid sample code {0:?}")]
    InvalidCode(String),
    #[error("two-column point mode needs an even number of codes, got {0}")]
    UnpairedCodes(usize),
    #[error("channel {channel} has {actual} samples, expected {expected}")]
    SampleCountMismatch {
        channel: usize,
        expected: usize,
        actual: usize,
    },
    #[error("no channels to write")]
    NoChannels,
    #[error("chunk size {0} is outside 1..={}", crate::chunk::MAX_CHUNK_SIZE)]
    ChunkSize(usize),
    #[error("chunk {index} carries {actual} payload bytes, expected {expected}")]
    ChunkLength {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("{points} points of {width} bytes exceed the addressable memory")]
    PlanTooLarge { points: usize, width: usize },
    #[error("received more transfers than the {0} planned")]
    UnexpectedChunk(usize),
    #[error("reassembly incomplete: {received} of {planned} transfers received")]
    MissingChunks { received: usize, planned: usize },
    #[error("output failed: {0}")]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
