/// Track/disk data model

/// Fixed-capacity list
pub mod bounded;
/// Disk builder
pub mod builder;
/// Disk structure and metadata
pub mod disk;
/// Flux revolutions and statistics
pub mod revolution;
/// Sector definition
pub mod sector;
/// Track definition, encodings and flags
pub mod track;

pub use bounded::BoundedVec;
pub use builder::DiskBuilder;
pub use disk::{Disk, Metadata, QualitySummary};
pub use revolution::{FluxRevolution, FluxStats, RevolutionFlags};
pub use sector::{Sector, SectorId};
pub use track::{
    Encoding, ProtectionMarker, SectorSummary, Track, TrackFlags, TrackLayers, TrackQuality,
    WeakPattern, WeakRegion,
};
