/// Track data structures

use crate::analysis;
use crate::bitstream::Bitstream;
use crate::error::{IrError, Result};
use crate::format::constants::{
    MAX_COMMENT_LEN, MAX_CYLINDERS, MAX_HEADS, MAX_PROTECTIONS, MAX_REVOLUTIONS, MAX_WEAK_REGIONS,
};
use crate::image::bounded::BoundedVec;
use crate::image::revolution::FluxRevolution;
use crate::image::sector::Sector;
use serde::Serialize;
use std::fmt;

/// Bit-level encoding of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Unknown encoding
    #[default]
    Unknown,
    /// FM (Frequency Modulation) - single density
    Fm,
    /// MFM (Modified Frequency Modulation) - double density
    Mfm,
    /// M2FM (Intel/DEC)
    M2fm,
    /// Commodore GCR
    GcrCommodore,
    /// Apple II GCR
    GcrApple,
    /// Apple 3.5" GCR
    GcrApple35,
    /// Victor 9000 GCR
    GcrVictor,
    /// Amiga MFM
    AmigaMfm,
    /// Run-length limited
    Rll,
    /// Several encodings on one track
    Mixed,
    /// Custom or unidentified scheme
    Custom,
}

impl Encoding {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Unknown => "Unknown",
            Encoding::Fm => "FM",
            Encoding::Mfm => "MFM",
            Encoding::M2fm => "M2FM",
            Encoding::GcrCommodore => "GCR-CBM",
            Encoding::GcrApple => "GCR-Apple",
            Encoding::GcrApple35 => "GCR-Apple3.5",
            Encoding::GcrVictor => "GCR-Victor",
            Encoding::AmigaMfm => "Amiga-MFM",
            Encoding::Rll => "RLL",
            Encoding::Mixed => "Mixed",
            Encoding::Custom => "Custom",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<u8> for Encoding {
    fn from(value: u8) -> Self {
        match value {
            1 => Encoding::Fm,
            2 => Encoding::Mfm,
            3 => Encoding::M2fm,
            4 => Encoding::GcrCommodore,
            5 => Encoding::GcrApple,
            6 => Encoding::GcrApple35,
            7 => Encoding::GcrVictor,
            8 => Encoding::AmigaMfm,
            9 => Encoding::Rll,
            10 => Encoding::Mixed,
            255 => Encoding::Custom,
            _ => Encoding::Unknown,
        }
    }
}

impl From<Encoding> for u8 {
    fn from(encoding: Encoding) -> Self {
        match encoding {
            Encoding::Unknown => 0,
            Encoding::Fm => 1,
            Encoding::Mfm => 2,
            Encoding::M2fm => 3,
            Encoding::GcrCommodore => 4,
            Encoding::GcrApple => 5,
            Encoding::GcrApple35 => 6,
            Encoding::GcrVictor => 7,
            Encoding::AmigaMfm => 8,
            Encoding::Rll => 9,
            Encoding::Mixed => 10,
            Encoding::Custom => 255,
        }
    }
}

/// Overall quality of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackQuality {
    /// Not assessed
    #[default]
    Unknown,
    /// All sectors good
    Perfect,
    /// Minor issues
    Good,
    /// Some errors
    Degraded,
    /// Barely readable
    Marginal,
    /// Significant errors
    Bad,
    /// Cannot be read
    Unreadable,
    /// Unformatted
    Empty,
    /// Carries copy protection
    Protected,
}

impl TrackQuality {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            TrackQuality::Unknown => "Unknown",
            TrackQuality::Perfect => "Perfect",
            TrackQuality::Good => "Good",
            TrackQuality::Degraded => "Degraded",
            TrackQuality::Marginal => "Marginal",
            TrackQuality::Bad => "Bad",
            TrackQuality::Unreadable => "Unreadable",
            TrackQuality::Empty => "Empty",
            TrackQuality::Protected => "Protected",
        }
    }
}

impl From<u8> for TrackQuality {
    fn from(value: u8) -> Self {
        match value {
            1 => TrackQuality::Perfect,
            2 => TrackQuality::Good,
            3 => TrackQuality::Degraded,
            4 => TrackQuality::Marginal,
            5 => TrackQuality::Bad,
            6 => TrackQuality::Unreadable,
            7 => TrackQuality::Empty,
            8 => TrackQuality::Protected,
            _ => TrackQuality::Unknown,
        }
    }
}

impl From<TrackQuality> for u8 {
    fn from(quality: TrackQuality) -> Self {
        match quality {
            TrackQuality::Unknown => 0,
            TrackQuality::Perfect => 1,
            TrackQuality::Good => 2,
            TrackQuality::Degraded => 3,
            TrackQuality::Marginal => 4,
            TrackQuality::Bad => 5,
            TrackQuality::Unreadable => 6,
            TrackQuality::Empty => 7,
            TrackQuality::Protected => 8,
        }
    }
}

/// Track flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TrackFlags(pub u16);

impl TrackFlags {
    /// Revolutions are index aligned
    pub const INDEXED: u16 = 1 << 0;
    /// Contains weak bits
    pub const WEAK_BITS: u16 = 1 << 1;
    /// Copy protection detected
    pub const PROTECTED: u16 = 1 << 2;
    /// Longer than nominal
    pub const LONG_TRACK: u16 = 1 << 3;
    /// Shorter than nominal
    pub const SHORT_TRACK: u16 = 1 << 4;
    /// Density varies across the track
    pub const DENSITY_VARIED: u16 = 1 << 5;
    /// Half-track position
    pub const HALF_TRACK: u16 = 1 << 6;
    /// Quarter-track position
    pub const QUARTER_TRACK: u16 = 1 << 7;
    /// Fused from multiple revolutions
    pub const MULTI_REV_FUSED: u16 = 1 << 8;
    /// CRC errors were corrected
    pub const CRC_CORRECTED: u16 = 1 << 9;
    /// Generated rather than captured
    pub const SYNTHESIZED: u16 = 1 << 10;
    /// Read did not complete
    pub const INCOMPLETE: u16 = 1 << 11;
    /// Verified against a second read
    pub const VERIFIED: u16 = 1 << 12;

    /// Check if all bits in `mask` are set
    #[inline]
    pub fn contains(&self, mask: u16) -> bool {
        self.0 & mask == mask
    }

    /// Set the bits in `mask`
    #[inline]
    pub fn insert(&mut self, mask: u16) {
        self.0 |= mask;
    }

    /// Clear the bits in `mask`
    #[inline]
    pub fn remove(&mut self, mask: u16) {
        self.0 &= !mask;
    }
}

impl fmt::Display for TrackFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(u16, &str); 13] = [
            (TrackFlags::INDEXED, "INDEXED"),
            (TrackFlags::WEAK_BITS, "WEAK"),
            (TrackFlags::PROTECTED, "PROTECTED"),
            (TrackFlags::LONG_TRACK, "LONG"),
            (TrackFlags::SHORT_TRACK, "SHORT"),
            (TrackFlags::DENSITY_VARIED, "DENSITY"),
            (TrackFlags::HALF_TRACK, "HALF"),
            (TrackFlags::QUARTER_TRACK, "QUARTER"),
            (TrackFlags::MULTI_REV_FUSED, "FUSED"),
            (TrackFlags::CRC_CORRECTED, "CRC_FIXED"),
            (TrackFlags::SYNTHESIZED, "SYNTH"),
            (TrackFlags::INCOMPLETE, "INCOMPLETE"),
            (TrackFlags::VERIFIED, "VERIFIED"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(mask, _)| self.contains(*mask))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            write!(f, "-")
        } else {
            write!(f, "{}", set.join("|"))
        }
    }
}

/// Behaviour of a weak-bit region across reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeakPattern {
    /// Bits flip at random
    #[default]
    Random,
    /// Bits mostly read as 0
    Stuck0,
    /// Bits mostly read as 1
    Stuck1,
    /// Bits follow a repeating pattern
    Periodic,
    /// Bits drift between reads
    Degraded,
}

impl WeakPattern {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            WeakPattern::Random => "random",
            WeakPattern::Stuck0 => "stuck-0",
            WeakPattern::Stuck1 => "stuck-1",
            WeakPattern::Periodic => "periodic",
            WeakPattern::Degraded => "degraded",
        }
    }
}

impl From<u8> for WeakPattern {
    fn from(value: u8) -> Self {
        match value {
            1 => WeakPattern::Stuck0,
            2 => WeakPattern::Stuck1,
            3 => WeakPattern::Periodic,
            4 => WeakPattern::Degraded,
            _ => WeakPattern::Random,
        }
    }
}

/// A run of unstable bits on a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeakRegion {
    /// First bit of the region
    pub start_bit: u32,
    /// Region length in bits
    pub length_bits: u32,
    /// Observed pattern
    pub pattern: WeakPattern,
    /// Confidence in the classification, 0-100
    pub confidence: u8,
}

/// A copy-protection scheme found on a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectionMarker {
    /// Scheme identifier
    pub scheme_id: u16,
    /// Bit position of the signature
    pub location_bit: u32,
    /// Signature length in bits
    pub length_bits: u32,
    /// Severity 0-3
    pub severity: u8,
    /// Confirmed by a second method
    pub confirmed: bool,
    /// CRC32 of the signature bits
    pub signature_crc: u32,
    /// Scheme name
    pub name: String,
}

/// Which data layers a track was allocated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackLayers(pub u8);

impl TrackLayers {
    /// Flux revolutions
    pub const FLUX: u8 = 1 << 0;
    /// Bitstream with timing and weak mask
    pub const BITSTREAM: u8 = 1 << 1;
    /// Decoded sectors
    pub const SECTORS: u8 = 1 << 2;

    /// Check if all bits in `mask` are set
    #[inline]
    pub fn contains(&self, mask: u8) -> bool {
        self.0 & mask == mask
    }
}

/// Sector counts for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SectorSummary {
    /// Sectors the format expects
    pub expected: u8,
    /// Sectors found
    pub found: u8,
    /// Sectors with valid CRC
    pub good: u8,
}

/// One physical track: identity, flux revolutions and derived layers
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Physical cylinder (0-83)
    pub cylinder: u8,
    /// Physical head (0 or 1)
    pub head: u8,
    /// Quarter-track offset from the cylinder position
    pub quarter_offset: i8,
    /// Track flags
    pub flags: TrackFlags,
    /// Bit-level encoding
    pub encoding: Encoding,
    /// Sectors the format expects on this track
    pub sectors_expected: u8,
    /// Nominal bit-cell time in nanoseconds (0 = derive from encoding)
    pub bitcell_ns: u32,
    /// Measured rotation speed in rpm x 100
    pub rpm_measured: u32,
    /// Position of the write splice in nanoseconds
    pub write_splice_ns: u32,
    /// Quality class
    pub quality: TrackQuality,
    /// Quality score 0-100
    pub quality_score: u8,
    /// Decoded payload (all sectors in order)
    pub decoded: Option<Vec<u8>>,
    /// Capture time (seconds since the Unix epoch)
    pub capture_timestamp: u64,
    /// Capture duration in milliseconds
    pub capture_duration_ms: u32,
    revolutions: BoundedVec<FluxRevolution, MAX_REVOLUTIONS>,
    weak_regions: BoundedVec<WeakRegion, MAX_WEAK_REGIONS>,
    protections: BoundedVec<ProtectionMarker, MAX_PROTECTIONS>,
    sectors: Option<Vec<Sector>>,
    bitstream: Option<Bitstream>,
    sectors_found: u8,
    sectors_good: u8,
    comment: String,
}

impl Track {
    /// Create a new track, validating its position
    pub fn new(cylinder: u8, head: u8) -> Result<Self> {
        if cylinder >= MAX_CYLINDERS {
            return Err(IrError::invalid(format!(
                "cylinder {} out of range (max: {})",
                cylinder,
                MAX_CYLINDERS - 1
            )));
        }
        if head >= MAX_HEADS {
            return Err(IrError::invalid(format!(
                "head {} out of range (max: {})",
                head,
                MAX_HEADS - 1
            )));
        }
        Ok(Self {
            cylinder,
            head,
            quarter_offset: 0,
            flags: TrackFlags::default(),
            encoding: Encoding::Unknown,
            sectors_expected: 0,
            bitcell_ns: 0,
            rpm_measured: 0,
            write_splice_ns: 0,
            quality: TrackQuality::Unknown,
            quality_score: 0,
            decoded: None,
            capture_timestamp: 0,
            capture_duration_ms: 0,
            revolutions: BoundedVec::new(),
            weak_regions: BoundedVec::new(),
            protections: BoundedVec::new(),
            sectors: None,
            bitstream: None,
            sectors_found: 0,
            sectors_good: 0,
            comment: String::new(),
        })
    }

    /// Create a track with empty bitstream and/or sector layers ready to fill
    pub fn with_layers(cylinder: u8, head: u8, layers: TrackLayers) -> Result<Self> {
        let mut track = Self::new(cylinder, head)?;
        if layers.contains(TrackLayers::BITSTREAM) {
            track.set_bitstream(Bitstream::new());
        }
        if layers.contains(TrackLayers::SECTORS) {
            track.sectors = Some(Vec::new());
        }
        Ok(track)
    }

    /// Layers currently populated
    pub fn layers(&self) -> TrackLayers {
        let mut value = 0;
        if !self.revolutions.is_empty() {
            value |= TrackLayers::FLUX;
        }
        if self.bitstream.is_some() {
            value |= TrackLayers::BITSTREAM;
        }
        if self.sectors.is_some() {
            value |= TrackLayers::SECTORS;
        }
        TrackLayers(value)
    }

    /// (cylinder, head) key
    pub fn position(&self) -> (u8, u8) {
        (self.cylinder, self.head)
    }

    /// Add a revolution, returning its index
    pub fn add_revolution(&mut self, revolution: FluxRevolution) -> Result<usize> {
        self.revolutions.push(revolution).map_err(|_| IrError::Overflow {
            what: "revolutions",
            limit: MAX_REVOLUTIONS,
        })
    }

    /// Get a reference to all revolutions
    pub fn revolutions(&self) -> &[FluxRevolution] {
        &self.revolutions
    }

    /// Get a revolution by index
    pub fn revolution(&self, index: usize) -> Option<&FluxRevolution> {
        self.revolutions.get(index)
    }

    /// Get a mutable reference to a revolution by index
    pub fn revolution_mut(&mut self, index: usize) -> Option<&mut FluxRevolution> {
        self.revolutions.get_mut(index)
    }

    /// Get the number of revolutions
    pub fn revolution_count(&self) -> usize {
        self.revolutions.len()
    }

    /// Index of the revolution with the highest quality score (0 if none)
    pub fn best_revolution(&self) -> usize {
        let mut best = 0;
        for (index, revolution) in self.revolutions.iter().enumerate() {
            if revolution.quality_score > self.revolutions[best].quality_score {
                best = index;
            }
        }
        best
    }

    /// Add a weak region, returning its index
    pub fn add_weak_region(&mut self, region: WeakRegion) -> Result<usize> {
        let index = self.weak_regions.push(region).map_err(|_| IrError::Overflow {
            what: "weak regions",
            limit: MAX_WEAK_REGIONS,
        })?;
        self.flags.insert(TrackFlags::WEAK_BITS);
        Ok(index)
    }

    /// Get all weak regions
    pub fn weak_regions(&self) -> &[WeakRegion] {
        &self.weak_regions
    }

    /// Remove all weak regions
    pub fn clear_weak_regions(&mut self) {
        self.weak_regions.clear();
        self.flags.remove(TrackFlags::WEAK_BITS);
    }

    /// Add a protection marker, returning its index
    pub fn add_protection(&mut self, marker: ProtectionMarker) -> Result<usize> {
        let index = self.protections.push(marker).map_err(|_| IrError::Overflow {
            what: "protection markers",
            limit: MAX_PROTECTIONS,
        })?;
        self.flags.insert(TrackFlags::PROTECTED);
        Ok(index)
    }

    /// Get all protection markers
    pub fn protections(&self) -> &[ProtectionMarker] {
        &self.protections
    }

    /// Add a sector to the sector layer, creating the layer if needed
    pub fn add_sector(&mut self, sector: Sector) -> Result<()> {
        let sectors = self.sectors.get_or_insert_with(Vec::new);
        if sectors.len() >= u8::MAX as usize {
            return Err(IrError::Overflow {
                what: "sectors",
                limit: u8::MAX as usize,
            });
        }
        sectors.push(sector);
        Ok(())
    }

    /// Replace the sector layer
    pub fn set_sectors(&mut self, sectors: Vec<Sector>) -> Result<()> {
        if sectors.len() > u8::MAX as usize {
            return Err(IrError::Overflow {
                what: "sectors",
                limit: u8::MAX as usize,
            });
        }
        self.sectors = Some(sectors);
        Ok(())
    }

    /// Get the sector layer (empty if absent)
    pub fn sectors(&self) -> &[Sector] {
        self.sectors.as_deref().unwrap_or(&[])
    }

    /// Get a sector by its record number
    pub fn get_sector(&self, record: u8) -> Option<&Sector> {
        self.sectors().iter().find(|s| s.id.record == record)
    }

    /// Record sector counts for a track that has no sector layer
    pub fn set_sector_counts(&mut self, found: u8, good: u8) {
        self.sectors_found = found;
        self.sectors_good = good.min(found);
    }

    /// Sector counts, computed from the sector layer when one is present
    pub fn sector_summary(&self) -> SectorSummary {
        match &self.sectors {
            Some(sectors) => SectorSummary {
                expected: self.sectors_expected,
                found: sectors.len() as u8,
                good: sectors.iter().filter(|s| s.crc_valid()).count() as u8,
            },
            None => SectorSummary {
                expected: self.sectors_expected,
                found: self.sectors_found,
                good: self.sectors_good,
            },
        }
    }

    /// Replace the bitstream layer with packed bits
    pub fn set_bits(&mut self, bits: Vec<u8>, bit_count: usize) -> Result<()> {
        let mut stream = Bitstream::from_packed(bits, bit_count)?;
        stream.cylinder = self.cylinder;
        stream.head = self.head;
        self.bitstream = Some(stream);
        Ok(())
    }

    /// Attach per-bit timing to the bitstream layer
    pub fn set_timing(&mut self, timing: Vec<u32>) -> Result<()> {
        self.bitstream
            .as_mut()
            .ok_or_else(|| IrError::invalid("track has no bitstream layer"))?
            .set_timing(timing)
    }

    /// Attach a weak-bit mask to the bitstream layer
    pub fn set_weak_mask(&mut self, mask: Vec<u8>) -> Result<()> {
        self.bitstream
            .as_mut()
            .ok_or_else(|| IrError::invalid("track has no bitstream layer"))?
            .set_weak_mask(mask)
    }

    /// Replace the bitstream layer
    pub fn set_bitstream(&mut self, mut stream: Bitstream) {
        stream.cylinder = self.cylinder;
        stream.head = self.head;
        self.bitstream = Some(stream);
    }

    /// Get the bitstream layer
    pub fn bitstream(&self) -> Option<&Bitstream> {
        self.bitstream.as_ref()
    }

    /// Get the comment
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Set the comment
    pub fn set_comment<S: Into<String>>(&mut self, comment: S) -> Result<()> {
        let comment = comment.into();
        if comment.len() >= MAX_COMMENT_LEN {
            return Err(IrError::Overflow {
                what: "comment",
                limit: MAX_COMMENT_LEN - 1,
            });
        }
        self.comment = comment;
        Ok(())
    }

    /// Bit-cell time to decode with: the stored value, else the encoding's nominal value
    pub fn nominal_bitcell_ns(&self) -> u32 {
        if self.bitcell_ns > 0 {
            self.bitcell_ns
        } else {
            analysis::nominal_bitcell_ns(self.encoding, self.rpm_measured / 100)
        }
    }

    /// Recompute the quality score and class
    pub fn calc_quality(&mut self) -> TrackQuality {
        self.quality_score = analysis::quality_score(self);
        self.quality = analysis::quality_from_score(self.quality_score);
        self.quality
    }

    /// Check internal consistency, returning one message per problem
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let name = format!("track {}.{}", self.cylinder, self.head);

        if self.cylinder >= MAX_CYLINDERS {
            issues.push(format!("{}: cylinder out of range", name));
        }
        if self.head >= MAX_HEADS {
            issues.push(format!("{}: head out of range", name));
        }
        for (index, revolution) in self.revolutions.iter().enumerate() {
            if revolution.is_empty() {
                issues.push(format!("{}: revolution {} has no flux data", name, index));
                continue;
            }
            let total: u64 = revolution.deltas().iter().map(|&d| d as u64).sum();
            if total != revolution.duration_ns {
                issues.push(format!(
                    "{}: revolution {} duration {} does not match flux total {}",
                    name, index, revolution.duration_ns, total
                ));
            }
        }
        let summary = self.sector_summary();
        if summary.good > summary.found {
            issues.push(format!(
                "{}: {} good sectors exceeds {} found",
                name, summary.good, summary.found
            ));
        }
        if let Some(stream) = &self.bitstream {
            for region in self.weak_regions.iter() {
                let end = region.start_bit as usize + region.length_bits as usize;
                if !stream.is_empty() && end > stream.len() {
                    issues.push(format!(
                        "{}: weak region at bit {} runs past {} bits",
                        name,
                        region.start_bit,
                        stream.len()
                    ));
                }
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::sector::SectorId;

    fn revolution(count: usize) -> FluxRevolution {
        FluxRevolution::from_deltas(vec![4000; count]).unwrap()
    }

    #[test]
    fn test_new_track() {
        let track = Track::new(0, 0).unwrap();
        assert_eq!(track.position(), (0, 0));
        assert_eq!(track.revolution_count(), 0);
        assert_eq!(track.layers(), TrackLayers(0));
    }

    #[test]
    fn test_new_track_out_of_range() {
        assert!(matches!(Track::new(84, 0), Err(IrError::Invalid(_))));
        assert!(matches!(Track::new(0, 2), Err(IrError::Invalid(_))));
        assert!(Track::new(83, 1).is_ok());
    }

    #[test]
    fn test_add_revolution_assigns_index() {
        let mut track = Track::new(0, 0).unwrap();
        for expected in 0..MAX_REVOLUTIONS {
            assert_eq!(track.add_revolution(revolution(10)).unwrap(), expected);
        }
        let result = track.add_revolution(revolution(10));
        assert!(matches!(result, Err(IrError::Overflow { limit: 16, .. })));
        assert_eq!(track.revolution_count(), MAX_REVOLUTIONS);
    }

    #[test]
    fn test_best_revolution() {
        let mut track = Track::new(0, 0).unwrap();
        assert_eq!(track.best_revolution(), 0);
        for score in [40, 90, 70] {
            let mut rev = revolution(10);
            rev.quality_score = score;
            track.add_revolution(rev).unwrap();
        }
        assert_eq!(track.best_revolution(), 1);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut track = Track::new(1, 0).unwrap();
        track.add_revolution(revolution(5)).unwrap();
        track.decoded = Some(vec![1, 2, 3]);
        let mut copy = track.clone();
        copy.revolution_mut(0)
            .unwrap()
            .set_flux(vec![2000; 3], crate::format::DataType::FluxDelta)
            .unwrap();
        copy.decoded.as_mut().unwrap()[0] = 9;
        assert_eq!(track.revolution(0).unwrap().flux_count(), 5);
        assert_eq!(track.decoded, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_sector_summary_from_layer() {
        let mut track = Track::with_layers(0, 0, TrackLayers(TrackLayers::SECTORS)).unwrap();
        track.sectors_expected = 9;
        track.set_sector_counts(9, 9);
        track
            .add_sector(Sector::with_crc(SectorId::new(0, 0, 1, 2), vec![0; 512], 1, 1))
            .unwrap();
        track
            .add_sector(Sector::with_crc(SectorId::new(0, 0, 2, 2), vec![0; 512], 1, 2))
            .unwrap();

        let summary = track.sector_summary();
        assert_eq!(summary.expected, 9);
        assert_eq!(summary.found, 2);
        assert_eq!(summary.good, 1);
        assert!(track.get_sector(2).is_some());
        assert!(track.get_sector(3).is_none());
    }

    #[test]
    fn test_sector_counts_without_layer() {
        let mut track = Track::new(0, 0).unwrap();
        track.set_sector_counts(8, 10);
        let summary = track.sector_summary();
        assert_eq!(summary.found, 8);
        assert_eq!(summary.good, 8);
    }

    #[test]
    fn test_bitstream_layer() {
        let mut track = Track::new(2, 1).unwrap();
        assert!(track.set_timing(vec![2000; 8]).is_err());

        track.set_bits(vec![0xA5], 8).unwrap();
        track.set_timing(vec![2000; 8]).unwrap();
        track.set_weak_mask(vec![0x0F]).unwrap();

        let stream = track.bitstream().unwrap();
        assert_eq!((stream.cylinder, stream.head), (2, 1));
        assert!(stream.is_weak(7));
        assert!(track.layers().contains(TrackLayers::BITSTREAM));
    }

    #[test]
    fn test_weak_and_protection_flags() {
        let mut track = Track::new(0, 0).unwrap();
        track
            .add_weak_region(WeakRegion {
                start_bit: 100,
                length_bits: 16,
                pattern: WeakPattern::Random,
                confidence: 50,
            })
            .unwrap();
        assert!(track.flags.contains(TrackFlags::WEAK_BITS));

        for _ in 0..MAX_PROTECTIONS {
            track
                .add_protection(ProtectionMarker {
                    scheme_id: 1,
                    location_bit: 0,
                    length_bits: 0,
                    severity: 2,
                    confirmed: false,
                    signature_crc: 0,
                    name: "V-MAX!".to_string(),
                })
                .unwrap();
        }
        assert!(track.flags.contains(TrackFlags::PROTECTED));
        let extra = ProtectionMarker {
            scheme_id: 2,
            location_bit: 0,
            length_bits: 0,
            severity: 1,
            confirmed: false,
            signature_crc: 0,
            name: "extra".to_string(),
        };
        assert!(track.add_protection(extra).is_err());

        track.clear_weak_regions();
        assert!(!track.flags.contains(TrackFlags::WEAK_BITS));
    }

    #[test]
    fn test_comment_limit() {
        let mut track = Track::new(0, 0).unwrap();
        track.set_comment("read on drive B").unwrap();
        assert_eq!(track.comment(), "read on drive B");
        assert!(track.set_comment("x".repeat(MAX_COMMENT_LEN)).is_err());
    }

    #[test]
    fn test_validate_duration_mismatch() {
        let mut track = Track::new(0, 0).unwrap();
        track.add_revolution(revolution(4)).unwrap();
        assert!(track.validate().is_empty());
        track.revolution_mut(0).unwrap().duration_ns = 1;
        assert_eq!(track.validate().len(), 1);
    }

    #[test]
    fn test_encoding_conversion() {
        assert_eq!(Encoding::from(2), Encoding::Mfm);
        assert_eq!(Encoding::from(255), Encoding::Custom);
        assert_eq!(Encoding::from(99), Encoding::Unknown);
        assert_eq!(u8::from(Encoding::AmigaMfm), 8);
        assert_eq!(Encoding::Mfm.to_string(), "MFM");
    }

    #[test]
    fn test_quality_conversion() {
        for value in 0..=8u8 {
            assert_eq!(u8::from(TrackQuality::from(value)), value);
        }
        assert_eq!(TrackQuality::from(42), TrackQuality::Unknown);
    }

    #[test]
    fn test_flags_display() {
        let mut flags = TrackFlags::default();
        assert_eq!(flags.to_string(), "-");
        flags.insert(TrackFlags::WEAK_BITS | TrackFlags::MULTI_REV_FUSED);
        assert_eq!(flags.to_string(), "WEAK|FUSED");
    }
}
