use crate::image::Encoding;
use thiserror::Error;

/// Result type alias for IR operations
pub type Result<T> = std::result::Result<T, IrError>;

/// Errors raised by the data model and IR serialization
#[derive(Debug, Error)]
pub enum IrError {
    /// I/O error occurred while reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid argument or inconsistent value
    #[error("Invalid parameter: {0}")]
    Invalid(String),

    /// A bounded container or hard maximum was exceeded
    #[error("Buffer overflow: {what} exceeds limit of {limit}")]
    Overflow {
        /// What was being added or allocated
        what: &'static str,
        /// The hard maximum
        limit: usize,
    },

    /// The file is not an IR file or a structure is malformed
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The file declares a major version this library cannot read
    #[error("Unsupported version {found:#08x} (expected major {expected_major})")]
    UnsupportedVersion {
        /// Version found in the file header
        found: u32,
        /// Major version this library reads
        expected_major: u32,
    },

    /// A stored CRC32 does not match the data it covers
    #[error("Checksum mismatch in {context}: stored {stored:#010x}, calculated {calculated:#010x}")]
    Checksum {
        /// Which structure failed verification
        context: String,
        /// CRC read from the file
        stored: u32,
        /// CRC computed over the data
        calculated: u32,
    },

    /// Compression or decompression failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// No track at the requested position
    #[error("Track not found: cylinder {cylinder}, head {head}")]
    NotFound {
        /// Cylinder number
        cylinder: u8,
        /// Head number
        head: u8,
    },

    /// A track with the same position already exists
    #[error("Duplicate track: cylinder {cylinder}, head {head}")]
    Duplicate {
        /// Cylinder number
        cylinder: u8,
        /// Head number
        head: u8,
    },

    /// Data ended early or is internally inconsistent
    #[error("Corrupt data at offset {offset}: {message}")]
    Corrupt {
        /// Byte offset where the problem was found
        offset: u64,
        /// Error message
        message: String,
    },
}

impl IrError {
    /// Create an invalid parameter error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        IrError::Invalid(message.into())
    }

    /// Create an invalid format error
    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        IrError::InvalidFormat(message.into())
    }

    /// Create a corrupt data error with context
    pub fn corrupt<S: Into<String>>(offset: u64, message: S) -> Self {
        IrError::Corrupt {
            offset,
            message: message.into(),
        }
    }

    /// Numeric code from the IR error table
    pub fn code(&self) -> i32 {
        match self {
            IrError::Invalid(_) => -2,
            IrError::Overflow { .. } => -3,
            IrError::Io(_) => -4,
            IrError::InvalidFormat(_) => -5,
            IrError::UnsupportedVersion { .. } => -6,
            IrError::Checksum { .. } => -7,
            IrError::Compression(_) => -8,
            IrError::NotFound { .. } => -9,
            IrError::Duplicate { .. } => -10,
            IrError::Corrupt { .. } => -11,
        }
    }
}

/// Errors raised by the multi-revolution voting engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    /// Invalid parameter or input
    #[error("Invalid parameter: {0}")]
    Invalid(String),

    /// Voting was run with no revolution data
    #[error("No data")]
    NoData,

    /// Fewer revolutions than the engine needs
    #[error("Too few revolutions (minimum {minimum}, got {found})")]
    TooFewRevolutions {
        /// Revolutions supplied
        found: usize,
        /// Revolutions required
        minimum: usize,
    },

    /// A revolution or bit count exceeded the hard maxima
    #[error("Buffer overflow: {what} exceeds limit of {limit}")]
    Overflow {
        /// What was being added
        what: &'static str,
        /// The hard maximum
        limit: usize,
    },

    /// Revolutions could not be aligned
    #[error("Alignment failed: {0}")]
    Alignment(String),
}

impl VoteError {
    /// Numeric code from the voting error table
    pub fn code(&self) -> i32 {
        match self {
            VoteError::Invalid(_) => -1,
            VoteError::NoData => -3,
            VoteError::TooFewRevolutions { .. } => -4,
            VoteError::Overflow { .. } => -5,
            VoteError::Alignment(_) => -6,
        }
    }
}

/// Errors raised by decoders and the decoder registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No registered decoder recognised the bitstream
    #[error("Encoding not detected")]
    NotDetected,

    /// Decoding failed
    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    /// Encoding failed
    #[error("Encode failed: {0}")]
    EncodeFailed(String),

    /// A sector failed CRC validation
    #[error("CRC error in sector C{cylinder} H{head} R{record}")]
    Crc {
        /// Cylinder from the sector ID
        cylinder: u8,
        /// Head from the sector ID
        head: u8,
        /// Record (sector number) from the sector ID
        record: u8,
    },

    /// No sync pattern found
    #[error("Sync not found")]
    SyncNotFound,

    /// The bitstream ended inside a field
    #[error("Data truncated at bit {bit}")]
    Truncated {
        /// Bit offset where data ran out
        bit: usize,
    },

    /// No decoder is registered for the encoding
    #[error("Decoder not registered: {0}")]
    NotRegistered(Encoding),

    /// The decoder does not implement the operation
    #[error("Operation not supported: {operation} ({decoder})")]
    Unsupported {
        /// Decoder name
        decoder: String,
        /// Operation name
        operation: &'static str,
    },

    /// The registry already holds its maximum number of decoders
    #[error("Registry full (max: {max})")]
    RegistryFull {
        /// Registry capacity
        max: usize,
    },
}

impl DecodeError {
    /// Create an unsupported-operation error
    pub fn unsupported<S: Into<String>>(decoder: S, operation: &'static str) -> Self {
        DecodeError::Unsupported {
            decoder: decoder.into(),
            operation,
        }
    }

    /// Numeric code from the decoder error table
    pub fn code(&self) -> i32 {
        match self {
            DecodeError::InvalidArgument(_) => -1,
            DecodeError::NotDetected => -3,
            DecodeError::DecodeFailed(_) => -4,
            DecodeError::EncodeFailed(_) => -5,
            DecodeError::Crc { .. } => -6,
            DecodeError::SyncNotFound => -7,
            DecodeError::Truncated { .. } => -8,
            DecodeError::NotRegistered(_) => -9,
            DecodeError::Unsupported { .. } => -10,
            DecodeError::RegistryFull { .. } => -2,
        }
    }
}

const IR_MESSAGES: [&str; 12] = [
    "Success",
    "Out of memory",
    "Invalid parameter",
    "Buffer overflow",
    "I/O error",
    "Invalid format",
    "Unsupported version",
    "Checksum mismatch",
    "Compression error",
    "Not found",
    "Duplicate entry",
    "Corrupt data",
];

const VOTE_MESSAGES: [&str; 7] = [
    "Success",
    "Invalid parameter",
    "Out of memory",
    "No data",
    "Too few revolutions (minimum 2)",
    "Buffer overflow",
    "Alignment failed",
];

const DECODE_MESSAGES: [&str; 11] = [
    "Success",
    "Invalid argument",
    "Out of memory",
    "Encoding not detected",
    "Decode failed",
    "Encode failed",
    "CRC error",
    "Sync not found",
    "Data truncated",
    "Decoder not registered",
    "Operation not supported",
];

fn lookup(table: &'static [&'static str], code: i32) -> &'static str {
    if code > 0 {
        return "Unknown error";
    }
    table
        .get(code.unsigned_abs() as usize)
        .copied()
        .unwrap_or("Unknown error")
}

/// Message for an IR error code
pub fn ir_strerror(code: i32) -> &'static str {
    lookup(&IR_MESSAGES, code)
}

/// Message for a voting error code
pub fn vote_strerror(code: i32) -> &'static str {
    lookup(&VOTE_MESSAGES, code)
}

/// Message for a decoder error code
pub fn decode_strerror(code: i32) -> &'static str {
    lookup(&DECODE_MESSAGES, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IrError::Duplicate {
            cylinder: 3,
            head: 1,
        };
        assert_eq!(err.to_string(), "Duplicate track: cylinder 3, head 1");
    }

    #[test]
    fn test_corrupt_error() {
        let err = IrError::corrupt(256, "payload shorter than declared");
        assert_eq!(
            err.to_string(),
            "Corrupt data at offset 256: payload shorter than declared"
        );
    }

    #[test]
    fn test_codes_match_tables() {
        assert_eq!(ir_strerror(IrError::invalid("x").code()), "Invalid parameter");
        assert_eq!(
            ir_strerror(IrError::NotFound { cylinder: 0, head: 0 }.code()),
            "Not found"
        );
        assert_eq!(
            vote_strerror(
                VoteError::TooFewRevolutions {
                    found: 1,
                    minimum: 2
                }
                .code()
            ),
            "Too few revolutions (minimum 2)"
        );
        assert_eq!(
            decode_strerror(DecodeError::NotRegistered(Encoding::Mfm).code()),
            "Decoder not registered"
        );
        assert_eq!(
            decode_strerror(DecodeError::unsupported("raw", "decode").code()),
            "Operation not supported"
        );
    }

    #[test]
    fn test_strerror_unknown() {
        assert_eq!(ir_strerror(0), "Success");
        assert_eq!(ir_strerror(-99), "Unknown error");
        assert_eq!(vote_strerror(5), "Unknown error");
        assert_eq!(decode_strerror(-11), "Unknown error");
    }
}
