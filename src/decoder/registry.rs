/// Registry of track decoders keyed by encoding

use super::{DecodedTrack, Detection, MfmDecoder, TrackDecoder};
use crate::bitstream::Bitstream;
use crate::error::DecodeError;
use crate::image::{Disk, Encoding, Track};
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Most decoders one registry holds
pub const MAX_DECODERS: usize = 32;

/// Confidence a detection must exceed to be reported
const MIN_DETECT_CONFIDENCE: f32 = 0.1;

/// Decoders keyed by encoding, at most one per encoding
///
/// Build it with [`register`](Self::register), then share it by reference.
/// Lookups and decoding only need `&self`.
#[derive(Default)]
pub struct DecoderRegistry {
    decoders: Vec<Box<dyn TrackDecoder>>,
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.decoders.iter().map(|d| d.name()))
            .finish()
    }
}

impl DecoderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in decoders
    pub fn with_builtins() -> Self {
        Self {
            decoders: vec![Box::new(MfmDecoder::new())],
        }
    }

    /// Register a decoder, replacing any decoder for the same encoding
    pub fn register<D: TrackDecoder + 'static>(&mut self, decoder: D) -> Result<(), DecodeError> {
        let encoding = decoder.encoding();
        if let Some(slot) = self.decoders.iter_mut().find(|d| d.encoding() == encoding) {
            debug!("replacing {} decoder with {}", encoding, decoder.name());
            *slot = Box::new(decoder);
            return Ok(());
        }
        if self.decoders.len() >= MAX_DECODERS {
            return Err(DecodeError::RegistryFull { max: MAX_DECODERS });
        }
        debug!("registered {} decoder {}", encoding, decoder.name());
        self.decoders.push(Box::new(decoder));
        Ok(())
    }

    /// Remove the decoder for an encoding, returning it
    pub fn unregister(&mut self, encoding: Encoding) -> Result<Box<dyn TrackDecoder>, DecodeError> {
        let index = self
            .decoders
            .iter()
            .position(|d| d.encoding() == encoding)
            .ok_or(DecodeError::NotRegistered(encoding))?;
        debug!("unregistered {} decoder", encoding);
        Ok(self.decoders.remove(index))
    }

    /// Decoder for an encoding
    pub fn get(&self, encoding: Encoding) -> Option<&dyn TrackDecoder> {
        self.decoders
            .iter()
            .find(|d| d.encoding() == encoding)
            .map(|d| &**d)
    }

    /// Decoder by name
    pub fn get_by_name(&self, name: &str) -> Option<&dyn TrackDecoder> {
        self.decoders
            .iter()
            .find(|d| d.name() == name)
            .map(|d| &**d)
    }

    /// Registered encodings in registration order
    pub fn list(&self) -> Vec<Encoding> {
        self.decoders.iter().map(|d| d.encoding()).collect()
    }

    /// Number of registered decoders
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Check if no decoder is registered
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Every decoder's claim above 0.1, highest confidence first
    ///
    /// The order of equal confidences is unspecified.
    pub fn auto_detect(&self, bits: &Bitstream) -> Vec<Detection> {
        let mut results: Vec<Detection> = self
            .decoders
            .iter()
            .filter_map(|decoder| match decoder.detect(bits) {
                Ok(confidence) => Some(Detection {
                    encoding: decoder.encoding(),
                    confidence,
                    decoder: decoder.name(),
                }),
                Err(e) => {
                    warn!("{} detect failed: {}", decoder.name(), e);
                    None
                }
            })
            .filter(|d| d.confidence > MIN_DETECT_CONFIDENCE)
            .collect();
        results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        results
    }

    /// Highest-ranked detection, if any
    pub fn detect_best(&self, bits: &Bitstream) -> Option<Detection> {
        self.auto_detect(bits).into_iter().next()
    }

    /// Detect the encoding and decode with the best decoder
    pub fn decode_track(&self, bits: &Bitstream) -> Result<DecodedTrack, DecodeError> {
        let best = self.detect_best(bits).ok_or(DecodeError::NotDetected)?;
        let mut decoded = self.decode_track_as(bits, best.encoding)?;
        decoded.detection_confidence = best.confidence;
        Ok(decoded)
    }

    /// Decode with the decoder for a given encoding
    pub fn decode_track_as(&self, bits: &Bitstream, encoding: Encoding) -> Result<DecodedTrack, DecodeError> {
        let decoder = self
            .get(encoding)
            .ok_or(DecodeError::NotRegistered(encoding))?;
        let decoded = decoder.decode(bits)?;
        debug!(
            "track {}.{} decoded as {}: {} good, {} bad",
            bits.cylinder,
            bits.head,
            encoding,
            decoded.good_count(),
            decoded.bad_count()
        );
        Ok(decoded)
    }

    /// Encode a track's sector layer with the decoder for `encoding`
    pub fn encode_track(&self, track: &Track, encoding: Encoding) -> Result<Bitstream, DecodeError> {
        let decoder = self
            .get(encoding)
            .ok_or(DecodeError::NotRegistered(encoding))?;
        let decoded = DecodedTrack {
            cylinder: track.cylinder,
            head: track.head,
            encoding,
            detection_confidence: 0.0,
            sectors_expected: track.sectors_expected,
            sectors: track.sectors().to_vec(),
        };
        decoder.encode(&decoded)
    }

    fn decode_one(&self, track: &Track) -> Option<DecodedTrack> {
        let bits = track.bitstream().filter(|b| !b.is_empty())?;
        match self.decode_track(bits) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!("track {}.{} not decoded: {}", track.cylinder, track.head, e);
                None
            }
        }
    }

    /// Decode every track that has a bitstream and record the sectors on it
    ///
    /// Returns the number of tracks decoded. Tracks that fail are left as they
    /// were.
    pub fn decode_disk(&self, disk: &mut Disk) -> usize {
        #[cfg(feature = "parallel")]
        let results: Vec<Option<DecodedTrack>> = disk
            .tracks()
            .par_iter()
            .map(|track| self.decode_one(track))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<Option<DecodedTrack>> = disk
            .tracks()
            .iter()
            .map(|track| self.decode_one(track))
            .collect();

        let mut decoded = 0;
        for (track, result) in disk.tracks_mut().zip(results) {
            let Some(result) = result else {
                continue;
            };
            match track.apply_decode(&result) {
                Ok(()) => decoded += 1,
                Err(e) => warn!("track {}.{}: {}", track.cylinder, track.head, e),
            }
        }
        decoded
    }
}
