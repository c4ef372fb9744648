/*!
# fluxcore

A Rust library for preserving floppy disk flux captures.

## Features

- Track/Disk model holding flux revolutions, weak regions, protection markers and sectors
- Versioned binary IR format with RLE, delta, LZ4 and Zstandard track compression and CRC32 checks
- Multi-revolution voting that fuses disagreeing reads into a confidence-scored bitstream
- Pluggable track decoders with auto-detection and a reference IBM MFM codec

## Quick Start

```rust,no_run
use fluxcore::{load, save, DecoderRegistry, SaveOptions, VotingParams};

// Load a capture
let mut disk = load("capture.uft")?;

// Fuse the revolutions of every track
let fused = fluxcore::vote::fuse_disk(&mut disk, &VotingParams::default())?;
println!("{} tracks fused", fused);

// Decode sectors from the fused bitstreams
let registry = DecoderRegistry::with_builtins();
let decoded = registry.decode_disk(&mut disk);
println!("{} tracks decoded", decoded);

// Save with the revolution table
save(&disk, "capture-fused.uft", &SaveOptions::default())?;
# Ok::<(), Box<dyn std::error::Error>>(())
```

## Modules

- `image`: Track/Disk data model
- `io`: IR file reading, writing and export
- `vote`: Multi-revolution voting engine
- `decoder`: Decoder trait, registry and MFM codec
- `protection`: Copy protection fingerprints
- `error`: Error types and Result alias
*/

#![warn(missing_docs)]

/// Flux statistics and quality scoring
pub mod analysis;
/// Packed bitstreams
pub mod bitstream;
/// Library configuration
pub mod config;
/// Track decoders and registry
pub mod decoder;
/// Error types and Result alias
pub mod error;
/// FDC (Floppy Disk Controller) status codes
pub mod fdc;
/// IR format constants, geometry and wire enums
pub mod format;
/// Track/disk data model
pub mod image;
/// IR file reading, writing and export
pub mod io;
/// Track quality map
pub mod map;
/// Copy protection detection
pub mod protection;
/// Multi-revolution voting engine
pub mod vote;

// Re-export common types
pub use bitstream::Bitstream;
pub use config::FluxConfig;
pub use decoder::{
    Capabilities, DecodedTrack, DecoderRegistry, Detection, MfmDecoder, TrackDecoder,
};
pub use error::{DecodeError, IrError, Result, VoteError};
pub use fdc::{FdcStatus1, FdcStatus2};
pub use format::{Compression, DataType, Density, Geometry, SourceType};
pub use image::{
    Disk, DiskBuilder, Encoding, FluxRevolution, FluxStats, Metadata, ProtectionMarker, Sector,
    SectorId, Track, TrackFlags, TrackQuality, WeakPattern, WeakRegion,
};
pub use io::{load, save, SaveOptions};
pub use protection::{ProtectionMatch, ProtectionMatcher};
pub use vote::{VoteStrategy, VotingEngine, VotingParams, VotingResult};
