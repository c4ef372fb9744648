/// IR format constants, geometry and wire enums

/// Format constants
pub mod constants;
/// Disk geometry and presets
pub mod geometry;

pub use constants::*;
pub use geometry::{Density, Geometry};

use serde::{Deserialize, Serialize};

/// Payload compression applied to a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    /// Stored as-is
    #[default]
    None,
    /// Reserved slot, not produced by this library
    Zlib,
    /// LZ4 block with prepended size
    Lz4,
    /// Zstandard frame
    Zstd,
    /// Byte run-length encoding with 0xFF escape
    Rle,
    /// Byte delta followed by run-length encoding
    Delta,
}

impl Compression {
    /// Decode a wire value, `None` for values outside the table
    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(Compression::None),
            1 => Some(Compression::Zlib),
            2 => Some(Compression::Lz4),
            3 => Some(Compression::Zstd),
            4 => Some(Compression::Rle),
            5 => Some(Compression::Delta),
            _ => None,
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Zlib => "zlib",
            Compression::Lz4 => "lz4",
            Compression::Zstd => "zstd",
            Compression::Rle => "rle",
            Compression::Delta => "delta",
        }
    }
}

impl From<Compression> for u8 {
    fn from(compression: Compression) -> Self {
        match compression {
            Compression::None => 0,
            Compression::Zlib => 1,
            Compression::Lz4 => 2,
            Compression::Zstd => 3,
            Compression::Rle => 4,
            Compression::Delta => 5,
        }
    }
}

/// Kind of data held in a revolution buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// No data
    None,
    /// Flux transition deltas in nanoseconds
    #[default]
    FluxDelta,
    /// Absolute flux transition times
    FluxAbsolute,
    /// Raw bitstream
    Bitstream,
    /// Raw bytes
    Bytestream,
    /// MFM-decoded bytes
    MfmDecoded,
    /// GCR-decoded bytes
    GcrDecoded,
    /// FM-decoded bytes
    FmDecoded,
    /// Raw ADC samples
    RawSamples,
}

impl From<u8> for DataType {
    fn from(value: u8) -> Self {
        match value {
            1 => DataType::FluxDelta,
            2 => DataType::FluxAbsolute,
            3 => DataType::Bitstream,
            4 => DataType::Bytestream,
            5 => DataType::MfmDecoded,
            6 => DataType::GcrDecoded,
            7 => DataType::FmDecoded,
            8 => DataType::RawSamples,
            _ => DataType::None,
        }
    }
}

impl From<DataType> for u8 {
    fn from(data_type: DataType) -> Self {
        match data_type {
            DataType::None => 0,
            DataType::FluxDelta => 1,
            DataType::FluxAbsolute => 2,
            DataType::Bitstream => 3,
            DataType::Bytestream => 4,
            DataType::MfmDecoded => 5,
            DataType::GcrDecoded => 6,
            DataType::FmDecoded => 7,
            DataType::RawSamples => 8,
        }
    }
}

/// Capture hardware or software the data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Unknown source
    #[default]
    Unknown,
    /// Greaseweazle
    Greaseweazle,
    /// FluxEngine
    FluxEngine,
    /// KryoFlux
    KryoFlux,
    /// FC5025
    Fc5025,
    /// XUM1541
    Xum1541,
    /// SuperCard Pro
    SuperCardPro,
    /// Pauline
    Pauline,
    /// Applesauce
    Applesauce,
    /// Converted from another container
    Converted,
    /// Generated, not captured
    Synthetic,
    /// Produced by an emulator
    Emulator,
}

impl From<u8> for SourceType {
    fn from(value: u8) -> Self {
        match value {
            1 => SourceType::Greaseweazle,
            2 => SourceType::FluxEngine,
            3 => SourceType::KryoFlux,
            4 => SourceType::Fc5025,
            5 => SourceType::Xum1541,
            6 => SourceType::SuperCardPro,
            7 => SourceType::Pauline,
            8 => SourceType::Applesauce,
            100 => SourceType::Converted,
            101 => SourceType::Synthetic,
            102 => SourceType::Emulator,
            _ => SourceType::Unknown,
        }
    }
}

impl From<SourceType> for u8 {
    fn from(source: SourceType) -> Self {
        match source {
            SourceType::Unknown => 0,
            SourceType::Greaseweazle => 1,
            SourceType::FluxEngine => 2,
            SourceType::KryoFlux => 3,
            SourceType::Fc5025 => 4,
            SourceType::Xum1541 => 5,
            SourceType::SuperCardPro => 6,
            SourceType::Pauline => 7,
            SourceType::Applesauce => 8,
            SourceType::Converted => 100,
            SourceType::Synthetic => 101,
            SourceType::Emulator => 102,
        }
    }
}

/// Check whether a buffer starts with the IR magic
pub fn is_ir_file(magic: &[u8]) -> bool {
    magic.len() >= IR_MAGIC.len() && &magic[..IR_MAGIC.len()] == IR_MAGIC
}
