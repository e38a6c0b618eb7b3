use thiserror::Error;

use crate::protocols::kwp::NegativeResponseCode;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed response to {service}: {raw:?}")]
    MalformedResponse { service: &'static str, raw: String },

    #[error("Negative response to service {service:#04x}: {code}")]
    NegativeResponse {
        service: u8,
        code: NegativeResponseCode,
        raw: String,
    },

    #[error("Range {address:#08x}+{length} outside region of {limit} bytes")]
    OutOfRange {
        address: u32,
        length: usize,
        limit: usize,
    },

    #[error("Block size {0} outside 1..=255")]
    InvalidBlockSize(usize),

    #[error("Image size {actual} bytes does not match region size {expected} bytes")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Writes to a live ECU are disabled; enable developer mode only on a bench")]
    PermissionDenied,

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Hex file error: {0}")]
    HexFile(#[from] ihex::ReaderError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// Raw adapter text attached to a protocol failure, if any.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::MalformedResponse { raw, .. } | Error::NegativeResponse { raw, .. } => {
                Some(raw)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
