/// Pluggable track decoders
///
/// A [`TrackDecoder`] turns a [`Bitstream`] into sectors for one encoding.
/// Decoders are collected in a [`DecoderRegistry`], which can rank them
/// against an unknown bitstream and dispatch to the best match.

/// CRC-16/CCITT
pub mod crc;
/// Reference IBM MFM codec
pub mod mfm;
/// Decoder registry
pub mod registry;

pub use crc::crc16_ccitt;
pub use mfm::MfmDecoder;
pub use registry::{DecoderRegistry, MAX_DECODERS};

use crate::bitstream::Bitstream;
use crate::error::{DecodeError, Result};
use crate::image::{Encoding, Sector, Track};
use std::fmt;

/// Optional features a decoder offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(pub u32);

impl Capabilities {
    /// Can encode sectors back to a bitstream
    pub const ENCODE: u32 = 1 << 0;
    /// Can combine several revolutions
    pub const MULTI_REV: u32 = 1 << 1;
    /// Uses per-bit timing
    pub const TIMING: u32 = 1 << 2;
    /// Reports weak bits
    pub const WEAK_BITS: u32 = 1 << 3;
    /// Understands protection tracks
    pub const PROTECTION: u32 = 1 << 4;
    /// Handles half tracks
    pub const HALF_TRACKS: u32 = 1 << 5;
    /// Handles zoned or variable density
    pub const VARIABLE_DENSITY: u32 = 1 << 6;

    /// Check if all bits in `mask` are set
    #[inline]
    pub fn contains(&self, mask: u32) -> bool {
        self.0 & mask == mask
    }

    /// Set the bits in `mask`
    #[inline]
    pub fn insert(&mut self, mask: u32) {
        self.0 |= mask;
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(u32, &str); 7] = [
            (Capabilities::ENCODE, "encode"),
            (Capabilities::MULTI_REV, "multi-rev"),
            (Capabilities::TIMING, "timing"),
            (Capabilities::WEAK_BITS, "weak-bits"),
            (Capabilities::PROTECTION, "protection"),
            (Capabilities::HALF_TRACKS, "half-tracks"),
            (Capabilities::VARIABLE_DENSITY, "variable-density"),
        ];
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join(", "))
        }
    }
}

/// One decoder's claim on a bitstream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Encoding the decoder handles
    pub encoding: Encoding,
    /// Confidence 0.0-1.0
    pub confidence: f32,
    /// Decoder name
    pub decoder: &'static str,
}

/// Sectors decoded from one track
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedTrack {
    /// Cylinder the bits came from
    pub cylinder: u8,
    /// Head the bits came from
    pub head: u8,
    /// Encoding used
    pub encoding: Encoding,
    /// Detection confidence when the encoding was auto-detected
    pub detection_confidence: f32,
    /// Sectors the format expects (0 = unknown)
    pub sectors_expected: u8,
    /// Sectors in the order they were found
    pub sectors: Vec<Sector>,
}

impl DecodedTrack {
    /// Sectors that passed both CRCs
    pub fn good_count(&self) -> usize {
        self.sectors.iter().filter(|s| s.crc_valid()).count()
    }

    /// Sectors that failed a CRC or lost their data field
    pub fn bad_count(&self) -> usize {
        self.sectors.len() - self.good_count()
    }

    /// Sector data concatenated in record order
    pub fn payload(&self) -> Vec<u8> {
        let mut sectors: Vec<&Sector> = self.sectors.iter().filter(|s| s.data_found).collect();
        sectors.sort_by_key(|s| s.id.record);
        sectors.iter().flat_map(|s| s.data().iter().copied()).collect()
    }
}

/// A codec for one encoding
///
/// Only [`detect`](TrackDecoder::detect) is required. Every other operation
/// defaults to reporting that it is unsupported, except `validate` which
/// checks the sector CRCs.
pub trait TrackDecoder: Send + Sync {
    /// Encoding this decoder handles
    fn encoding(&self) -> Encoding;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Optional features offered
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Sectors per track for a standard layout
    fn expected_sectors(&self, _cylinder: u8, _head: u8) -> u8 {
        0
    }

    /// Usual sector size in bytes
    fn sector_size(&self) -> usize {
        0
    }

    /// Confidence 0.0-1.0 that the bits use this encoding
    fn detect(&self, bits: &Bitstream) -> std::result::Result<f32, DecodeError>;

    /// Decode sectors from a bitstream
    fn decode(&self, _bits: &Bitstream) -> std::result::Result<DecodedTrack, DecodeError> {
        Err(DecodeError::unsupported(self.name(), "decode"))
    }

    /// Decode from several revolutions of the same track
    fn decode_multi(&self, _revolutions: &[Bitstream]) -> std::result::Result<DecodedTrack, DecodeError> {
        Err(DecodeError::unsupported(self.name(), "decode_multi"))
    }

    /// Encode sectors to a bitstream
    fn encode(&self, _track: &DecodedTrack) -> std::result::Result<Bitstream, DecodeError> {
        Err(DecodeError::unsupported(self.name(), "encode"))
    }

    /// Succeed only when both of the sector's CRCs matched
    fn validate(&self, sector: &Sector) -> std::result::Result<(), DecodeError> {
        if sector.crc_valid() {
            Ok(())
        } else {
            Err(DecodeError::Crc {
                cylinder: sector.id.cylinder,
                head: sector.id.head,
                record: sector.id.record,
            })
        }
    }
}

impl Track {
    /// Record decoded sectors on this track
    ///
    /// Replaces the sector layer, sets the encoding and decoded payload and
    /// recomputes quality.
    pub fn apply_decode(&mut self, decoded: &DecodedTrack) -> Result<()> {
        self.set_sectors(decoded.sectors.clone())?;
        self.encoding = decoded.encoding;
        if decoded.sectors_expected > 0 {
            self.sectors_expected = decoded.sectors_expected;
        }
        self.decoded = Some(decoded.payload());
        self.calc_quality();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{SectorId, TrackQuality};

    struct NullDecoder;

    impl TrackDecoder for NullDecoder {
        fn encoding(&self) -> Encoding {
            Encoding::Custom
        }

        fn name(&self) -> &'static str {
            "Null"
        }

        fn detect(&self, _bits: &Bitstream) -> std::result::Result<f32, DecodeError> {
            Ok(0.0)
        }
    }

    #[test]
    fn test_default_operations_unsupported() {
        let decoder = NullDecoder;
        let err = decoder.decode(&Bitstream::new()).unwrap_err();
        assert_eq!(err, DecodeError::unsupported("Null", "decode"));
        assert_eq!(err.code(), -10);
        assert!(decoder.encode(&DecodedTrack::default()).is_err());
        assert!(decoder.decode_multi(&[]).is_err());
        assert_eq!(decoder.capabilities().to_string(), "none");
    }

    #[test]
    fn test_validate_is_crc_gate() {
        let decoder = NullDecoder;
        let id = SectorId::new(1, 0, 3, 2);
        let good = Sector::with_crc(id, vec![0; 512], 0x1234, 0x1234);
        assert!(decoder.validate(&good).is_ok());

        let bad = Sector::with_crc(id, vec![0; 512], 0x1234, 0x4321);
        assert!(!bad.crc_valid());
        assert_eq!(
            decoder.validate(&bad).unwrap_err(),
            DecodeError::Crc {
                cylinder: 1,
                head: 0,
                record: 3
            }
        );

        let missing = Sector::header_only(id, true);
        assert!(decoder.validate(&missing).is_err());
    }

    #[test]
    fn test_capabilities() {
        let mut caps = Capabilities::default();
        caps.insert(Capabilities::ENCODE | Capabilities::TIMING);
        assert!(caps.contains(Capabilities::ENCODE));
        assert!(!caps.contains(Capabilities::ENCODE | Capabilities::MULTI_REV));
        assert_eq!(caps.to_string(), "encode, timing");
    }

    #[test]
    fn test_apply_decode() {
        let decoded = DecodedTrack {
            cylinder: 0,
            head: 0,
            encoding: Encoding::Mfm,
            detection_confidence: 0.9,
            sectors_expected: 2,
            sectors: vec![
                Sector::with_crc(SectorId::new(0, 0, 2, 0), vec![2; 128], 7, 7),
                Sector::with_crc(SectorId::new(0, 0, 1, 0), vec![1; 128], 7, 7),
            ],
        };
        assert_eq!(decoded.good_count(), 2);
        assert_eq!(decoded.bad_count(), 0);

        let mut track = Track::new(0, 0).unwrap();
        track.apply_decode(&decoded).unwrap();
        assert_eq!(track.encoding, Encoding::Mfm);
        assert_eq!(track.sectors().len(), 2);
        let payload = track.decoded.as_ref().unwrap();
        assert_eq!(payload.len(), 256);
        assert_eq!(payload[0], 1);
        assert_eq!(payload[128], 2);
        assert_eq!(track.sector_summary().good, 2);
        assert_eq!(track.quality, TrackQuality::Perfect);
    }
}
