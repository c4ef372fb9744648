/// Multi-revolution voting engine
///
/// Revolutions of one physical track go in as flux deltas or as decoded bits.
/// Every bit position is voted on across revolutions and the result carries a
/// fused bitstream, a confidence per bit, weak regions and a protection guess.
///
/// ```
/// use fluxcore::bitstream::Bitstream;
/// use fluxcore::vote::{VotingEngine, VotingParams};
///
/// let bits = Bitstream::from_bits(&[1, 0, 0, 1, 0, 1, 0, 0]);
/// let mut engine = VotingEngine::new(VotingParams::default())?;
/// engine.add_bits(&bits, None)?;
/// engine.add_bits(&bits, None)?;
/// let result = engine.run()?;
/// assert_eq!(result.overall_confidence, 1.0);
/// # Ok::<(), fluxcore::error::VoteError>(())
/// ```

/// Per-bit vote accumulation
pub mod accumulate;
/// Revolution alignment
pub mod align;
/// Flux-to-bit conversion
pub mod pll;
/// Voting results
pub mod result;
/// Weak-region detection
pub mod weak;

pub use pll::{flux_to_bits, DEFAULT_BITCELL_NS};
pub use result::{BitClass, BitStats, RevolutionQuality, VoteRegion, VotingResult};

use crate::bitstream::Bitstream;
use crate::error::VoteError;
use crate::format::constants::{MAX_FLUX_PER_REVOLUTION, MAX_REVOLUTIONS};
use crate::image::{Disk, FluxRevolution, Track};
use crate::protection::ProtectionMatcher;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Fewest revolutions a vote needs
pub const MIN_REVOLUTIONS: usize = 2;

/// Timing jump between neighbouring bits counted as an anomaly
const TIMING_JUMP_NS: i64 = 1000;

/// How votes are combined into a bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteStrategy {
    /// Simple majority
    Majority,
    /// Majority, discounted where bit timing is unstable
    #[default]
    Weighted,
    /// Majority, halved unless every revolution agrees
    Consensus,
    /// Votes as weighted at bit level
    BestCrc,
    /// Votes as weighted at bit level
    Adaptive,
}

impl VoteStrategy {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            VoteStrategy::Majority => "majority",
            VoteStrategy::Weighted => "weighted",
            VoteStrategy::Consensus => "consensus",
            VoteStrategy::BestCrc => "best_crc",
            VoteStrategy::Adaptive => "adaptive",
        }
    }
}

/// Voting parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingParams {
    /// Combination strategy
    pub strategy: VoteStrategy,
    /// Confidence a bit needs to be stable
    pub min_confidence: u8,
    /// Confidence below which a bit is considered unreliable
    pub weak_threshold: u8,
    /// Match weak regions against protection rules
    pub detect_protection: bool,
    /// Keep weak regions and a weak mask in the fused track
    pub preserve_weak: bool,
    /// Timing spread above which weighted votes are discounted
    pub timing_tolerance_ns: u32,
    /// Shortest weak run reported as a region
    pub min_weak_run: u32,
    /// Search for revolution offsets
    pub align: bool,
}

impl Default for VotingParams {
    fn default() -> Self {
        Self {
            strategy: VoteStrategy::Weighted,
            min_confidence: 90,
            weak_threshold: 60,
            detect_protection: true,
            preserve_weak: true,
            timing_tolerance_ns: 500,
            min_weak_run: 8,
            align: true,
        }
    }
}

impl VotingParams {
    /// Stable only when every revolution agrees
    pub fn consensus() -> Self {
        Self {
            strategy: VoteStrategy::Consensus,
            min_confidence: 100,
            weak_threshold: 90,
            ..Self::default()
        }
    }

    /// Plain majority with relaxed thresholds
    pub fn majority() -> Self {
        Self {
            strategy: VoteStrategy::Majority,
            min_confidence: 60,
            weak_threshold: 40,
            ..Self::default()
        }
    }

    /// Check the thresholds are consistent
    pub fn validate(&self) -> Result<(), VoteError> {
        if !(51..=100).contains(&self.min_confidence) {
            return Err(VoteError::Invalid(format!(
                "min_confidence {} outside 51..=100",
                self.min_confidence
            )));
        }
        if self.weak_threshold > self.min_confidence {
            return Err(VoteError::Invalid(format!(
                "weak_threshold {} above min_confidence {}",
                self.weak_threshold, self.min_confidence
            )));
        }
        if self.min_weak_run == 0 {
            return Err(VoteError::Invalid("min_weak_run is zero".to_string()));
        }
        Ok(())
    }
}

/// One revolution's bits as voted on
#[derive(Debug, Clone, PartialEq)]
pub struct RevolutionBits {
    /// Bits, with timing when decoded from flux
    pub bits: Bitstream,
    /// Per-bit confidence 0-100
    pub confidence: Option<Vec<u8>>,
}

/// Collects revolutions of one track and votes on them
#[derive(Debug)]
pub struct VotingEngine {
    params: VotingParams,
    matcher: ProtectionMatcher,
    revolutions: Vec<RevolutionBits>,
}

impl VotingEngine {
    /// Create an engine with the built-in protection rules
    pub fn new(params: VotingParams) -> Result<Self, VoteError> {
        params.validate()?;
        Ok(Self {
            params,
            matcher: ProtectionMatcher::new(),
            revolutions: Vec::new(),
        })
    }

    /// Replace the protection rules
    pub fn with_matcher(mut self, matcher: ProtectionMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Parameters in use
    pub fn params(&self) -> &VotingParams {
        &self.params
    }

    /// Revolutions added so far
    pub fn revolution_count(&self) -> usize {
        self.revolutions.len()
    }

    /// Drop all revolutions, keeping the parameters
    pub fn reset(&mut self) {
        self.revolutions.clear();
    }

    fn push(&mut self, revolution: RevolutionBits) -> Result<usize, VoteError> {
        if self.revolutions.len() >= MAX_REVOLUTIONS {
            return Err(VoteError::Overflow {
                what: "revolutions",
                limit: MAX_REVOLUTIONS,
            });
        }
        self.revolutions.push(revolution);
        Ok(self.revolutions.len() - 1)
    }

    /// Add a revolution as flux deltas, returning its index
    pub fn add_flux(&mut self, deltas: &[u32], bitcell_ns: u32) -> Result<usize, VoteError> {
        if deltas.len() > MAX_FLUX_PER_REVOLUTION {
            return Err(VoteError::Overflow {
                what: "flux transitions",
                limit: MAX_FLUX_PER_REVOLUTION,
            });
        }
        if self.revolutions.len() >= MAX_REVOLUTIONS {
            return Err(VoteError::Overflow {
                what: "revolutions",
                limit: MAX_REVOLUTIONS,
            });
        }
        let bits = flux_to_bits(deltas, bitcell_ns)?;
        self.push(RevolutionBits {
            bits,
            confidence: None,
        })
    }

    /// Add a captured revolution, decoding at its estimated clock period
    ///
    /// The estimate is the centre of the fullest 1 us histogram bucket, which
    /// for MFM is the 2-cell interval rather than the bit cell. Such a revolution
    /// decodes at half the cell rate. Use [`add_track`](Self::add_track) or
    /// [`add_flux`](Self::add_flux) to decode at the nominal bit cell.
    pub fn add_revolution(&mut self, revolution: &FluxRevolution) -> Result<usize, VoteError> {
        let bitcell_ns = revolution
            .stats()
            .map(|s| s.clock_period_ns)
            .filter(|&ns| ns > 0)
            .unwrap_or(DEFAULT_BITCELL_NS);
        self.add_flux(revolution.deltas(), bitcell_ns)
    }

    /// Add every revolution of a track, returning how many were added
    ///
    /// Adding stops quietly once the engine is full. Empty revolutions are skipped.
    pub fn add_track(&mut self, track: &Track) -> Result<usize, VoteError> {
        let bitcell_ns = match track.nominal_bitcell_ns() {
            0 => DEFAULT_BITCELL_NS,
            ns => ns,
        };
        let mut added = 0;
        for revolution in track.revolutions() {
            if revolution.is_empty() {
                continue;
            }
            match self.add_flux(revolution.deltas(), bitcell_ns) {
                Ok(_) => added += 1,
                Err(VoteError::Overflow {
                    what: "revolutions", ..
                }) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(added)
    }

    /// Add a revolution of decoded bits with optional per-bit confidence
    pub fn add_bits(&mut self, bits: &Bitstream, confidence: Option<&[u8]>) -> Result<usize, VoteError> {
        if bits.is_empty() {
            return Err(VoteError::Invalid("revolution has no bits".to_string()));
        }
        if let Some(confidence) = confidence {
            if confidence.len() != bits.len() {
                return Err(VoteError::Invalid(format!(
                    "{} confidence values for {} bits",
                    confidence.len(),
                    bits.len()
                )));
            }
        }
        self.push(RevolutionBits {
            bits: bits.clone(),
            confidence: confidence.map(<[u8]>::to_vec),
        })
    }

    fn check_ready(&self) -> Result<(), VoteError> {
        if self.revolutions.len() < MIN_REVOLUTIONS {
            return Err(VoteError::TooFewRevolutions {
                found: self.revolutions.len(),
                minimum: MIN_REVOLUTIONS,
            });
        }
        Ok(())
    }

    /// Offset of each revolution against revolution 0
    fn alignment_offsets(&self) -> Vec<i32> {
        if !self.params.align {
            return vec![0; self.revolutions.len()];
        }
        let reference = &self.revolutions[0].bits;
        self.revolutions
            .iter()
            .enumerate()
            .map(|(i, r)| {
                if i == 0 {
                    0
                } else {
                    align::find_offset(reference, &r.bits, align::ALIGN_WINDOW)
                }
            })
            .collect()
    }

    fn adjust_confidence(&self, confidence: u8, unanimous: bool, timing_spread: u16) -> u8 {
        match self.params.strategy {
            VoteStrategy::Majority => confidence,
            VoteStrategy::Consensus if unanimous => confidence,
            VoteStrategy::Consensus => (confidence as f32 * 0.5) as u8,
            VoteStrategy::Weighted | VoteStrategy::BestCrc | VoteStrategy::Adaptive => {
                if timing_spread as u32 > self.params.timing_tolerance_ns {
                    (confidence as f32 * 0.8) as u8
                } else {
                    confidence
                }
            }
        }
    }

    /// Vote on the revolutions added so far
    ///
    /// Alignment offsets are reported in the result but bits are voted at
    /// their absolute positions.
    pub fn run(&self) -> Result<VotingResult, VoteError> {
        self.check_ready()?;
        let alignment_offsets = self.alignment_offsets();

        let tallies = accumulate::accumulate(&self.revolutions);
        if tallies.is_empty() {
            return Err(VoteError::NoData);
        }
        let total_bits = tallies.len();
        let revolution_count = self.revolutions.len();

        let mut data = Bitstream::new();
        let mut confidence = Vec::with_capacity(total_bits);
        let mut stats = Vec::with_capacity(total_bits);
        let (mut stable_bits, mut weak_bits, mut missing_bits) = (0, 0, 0);

        for (position, tally) in tallies.iter().enumerate() {
            let timing_spread = tally.timing_spread();
            let mut stat = result::BitStats {
                position: position as u32,
                votes_0: tally.zeros,
                votes_1: tally.ones,
                votes_missing: tally.missing,
                timing_spread,
                ..Default::default()
            };

            if tally.total() == 0 {
                stat.class = BitClass::Missing;
                missing_bits += 1;
                data.push(false);
            } else {
                let raw = (tally.winner_votes() as u32 * 100 / tally.total() as u32) as u8;
                let unanimous = tally.winner_votes() as usize == revolution_count;
                stat.confidence = self.adjust_confidence(raw, unanimous, timing_spread);
                let bit = tally.winner();
                stat.class = if stat.confidence >= self.params.min_confidence {
                    stable_bits += 1;
                    if bit {
                        BitClass::Stable1
                    } else {
                        BitClass::Stable0
                    }
                } else {
                    weak_bits += 1;
                    BitClass::Weak
                };
                data.push(bit);
            }
            confidence.push(stat.confidence);
            stats.push(stat);
        }

        let mut weak_regions =
            weak::detect_regions(&stats, &data, &confidence, self.params.min_weak_run);

        let protection = if self.params.detect_protection {
            self.matcher.match_regions(&weak_regions)
        } else {
            None
        };
        if let Some(found) = &protection {
            for &index in &found.regions {
                if let Some(region) = weak_regions.get_mut(index) {
                    region.likely_protection = true;
                }
            }
        }

        let revolutions: Vec<RevolutionQuality> = self
            .revolutions
            .iter()
            .enumerate()
            .map(|(index, revolution)| {
                let mut quality = self.quality_of(index, revolution, total_bits);
                let overlap = revolution.bits.len().min(total_bits);
                let agree = (0..overlap)
                    .filter(|&i| revolution.bits.get(i) == data.get(i))
                    .count();
                quality.quality_score = (agree * 100 / total_bits) as u8;
                quality
            })
            .collect();

        let mut best_revolution = 0;
        for quality in &revolutions {
            if quality.quality_score > revolutions[best_revolution].quality_score {
                best_revolution = quality.index;
            }
        }

        let overall_confidence = stable_bits as f32 / total_bits as f32;
        debug!(
            "voted {} revolutions over {} bits: {} stable, {} weak, {} missing, {} weak regions",
            revolution_count,
            total_bits,
            stable_bits,
            weak_bits,
            missing_bits,
            weak_regions.len()
        );

        Ok(VotingResult {
            strategy: self.params.strategy,
            total_bits,
            stable_bits,
            weak_bits,
            missing_bits,
            overall_confidence,
            weak_regions,
            revolutions,
            best_revolution,
            alignment_offsets,
            protection,
            data,
            confidence,
            stats,
            preserve_weak: self.params.preserve_weak,
        })
    }

    /// Plain majority vote with no statistics; ties give 0
    pub fn analyze_quick(&self) -> Result<Bitstream, VoteError> {
        self.check_ready()?;
        let mut data = Bitstream::new();
        for tally in accumulate::accumulate(&self.revolutions) {
            data.push(tally.winner());
        }
        Ok(data)
    }

    fn quality_of(&self, index: usize, revolution: &RevolutionBits, reference_bits: usize) -> RevolutionQuality {
        let bit_count = revolution.bits.len();
        let timing_errors = revolution.bits.timing().map_or(0, |timing| {
            timing
                .windows(2)
                .filter(|pair| (pair[1] as i64 - pair[0] as i64).abs() > TIMING_JUMP_NS)
                .count() as u32
        });
        let coverage = if reference_bits == 0 {
            0
        } else {
            (bit_count.min(reference_bits) * 100 / reference_bits) as u8
        };
        let quality_score = if bit_count == 0 {
            0
        } else {
            100 - (timing_errors as usize * 100 / bit_count).min(100) as u8
        };
        RevolutionQuality {
            index,
            usable: bit_count > 0,
            bit_count,
            coverage,
            quality_score,
            timing_errors,
        }
    }

    /// Quality of one revolution on its own
    ///
    /// Coverage is measured against the longest revolution. The score is the
    /// share of bits without a timing jump of more than 1 µs.
    pub fn evaluate_revolution(&self, index: usize) -> Result<RevolutionQuality, VoteError> {
        let revolution = self
            .revolutions
            .get(index)
            .ok_or_else(|| VoteError::Invalid(format!("no revolution {}", index)))?;
        let longest = self.revolutions.iter().map(|r| r.bits.len()).max().unwrap_or(0);
        Ok(self.quality_of(index, revolution, longest))
    }

    /// Refine each weak region's pattern from how every revolution read it
    pub fn analyze_weak_pattern(&self, result: &mut VotingResult) {
        for region in &mut result.weak_regions {
            let (pattern, _) = weak::analyze_pattern(&self.revolutions, region.start_bit, region.length);
            region.pattern = pattern;
        }
    }
}

fn vote_track(track: &Track, params: &VotingParams) -> Option<VotingResult> {
    if track.revolution_count() < MIN_REVOLUTIONS {
        return None;
    }
    let outcome = VotingEngine::new(params.clone()).and_then(|mut engine| {
        engine.add_track(track)?;
        engine.run()
    });
    match outcome {
        Ok(result) => Some(result),
        Err(e) => {
            warn!("track {}.{}: vote failed: {}", track.cylinder, track.head, e);
            None
        }
    }
}

/// Vote every track with two or more revolutions and record the result on it
///
/// Returns the number of tracks fused. A track that fails to vote is left as it
/// was.
pub fn fuse_disk(disk: &mut Disk, params: &VotingParams) -> Result<usize, VoteError> {
    params.validate()?;

    #[cfg(feature = "parallel")]
    let results: Vec<Option<VotingResult>> = disk
        .tracks()
        .par_iter()
        .map(|track| vote_track(track, params))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<Option<VotingResult>> = disk
        .tracks()
        .iter()
        .map(|track| vote_track(track, params))
        .collect();

    let mut fused = 0;
    for (track, result) in disk.tracks_mut().zip(results) {
        if let Some(result) = result {
            track.apply_voting(&result);
            fused += 1;
        }
    }
    debug!("fused {} tracks", fused);
    Ok(fused)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::constants::MAX_WEAK_REGIONS;
    use crate::image::{TrackFlags, WeakPattern};
    use proptest::prelude::*;

    fn pattern(len: usize, seed: u32) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                ((state >> 16) & 1) as u8
            })
            .collect()
    }

    fn engine_with(params: VotingParams, revolutions: &[Vec<u8>]) -> VotingEngine {
        let mut engine = VotingEngine::new(params).unwrap();
        for bits in revolutions {
            engine.add_bits(&Bitstream::from_bits(bits), None).unwrap();
        }
        engine
    }

    #[test]
    fn test_params_validate() {
        assert!(VotingParams::default().validate().is_ok());
        assert!(VotingParams::consensus().validate().is_ok());
        assert!(VotingParams::majority().validate().is_ok());

        let low = VotingParams {
            min_confidence: 50,
            weak_threshold: 40,
            ..VotingParams::default()
        };
        assert!(low.validate().is_err());

        let inverted = VotingParams {
            weak_threshold: 95,
            ..VotingParams::default()
        };
        assert!(VotingEngine::new(inverted).is_err());

        let no_run = VotingParams {
            min_weak_run: 0,
            ..VotingParams::default()
        };
        assert!(no_run.validate().is_err());
    }

    #[test]
    fn test_too_few_revolutions() {
        let engine = engine_with(VotingParams::default(), &[vec![1, 0, 1]]);
        assert_eq!(
            engine.run().unwrap_err(),
            VoteError::TooFewRevolutions {
                found: 1,
                minimum: 2
            }
        );
        assert!(engine.analyze_quick().is_err());
    }

    #[test]
    fn test_unanimous_revolutions() {
        let bits = pattern(1000, 11);
        let engine = engine_with(VotingParams::default(), &[bits.clone(), bits.clone(), bits.clone()]);
        let result = engine.run().unwrap();

        assert_eq!(result.total_bits, 1000);
        assert_eq!(result.overall_confidence, 1.0);
        assert_eq!(result.weak_bits, 0);
        assert!(result.weak_regions.is_empty());
        assert!(result.confidence().iter().all(|&c| c == 100));
        assert!(result
            .bit_stats()
            .iter()
            .all(|s| matches!(s.class, BitClass::Stable0 | BitClass::Stable1)));
        for (i, &bit) in bits.iter().enumerate() {
            assert_eq!(result.bit(i), Some(bit == 1));
        }
        assert_eq!(result.revolutions.len(), 3);
        assert!(result.revolutions.iter().all(|r| r.quality_score == 100));
    }

    #[test]
    fn test_even_split_is_weak() {
        let ones = vec![1u8; 64];
        let zeros = vec![0u8; 64];
        let engine = engine_with(
            VotingParams::default(),
            &[ones.clone(), zeros.clone(), ones, zeros],
        );
        let result = engine.run().unwrap();
        assert_eq!(result.weak_bits, 64);
        assert_eq!(result.stable_bits, 0);
        assert!(result.confidence().iter().all(|&c| c <= 50));
        assert!((0..64).all(|i| result.is_weak_bit(i)));
        assert_eq!(result.weak_probability(0), 50);
        // Ties give 0
        assert_eq!(result.bit(0), Some(false));
    }

    #[test]
    fn test_single_weak_span() {
        let base = pattern(1000, 5);
        let mut other = base.clone();
        for bit in &mut other[400..420] {
            *bit ^= 1;
        }
        let engine = engine_with(VotingParams::default(), &[base, other]);
        let result = engine.run().unwrap();

        assert_eq!(result.weak_bits, 20);
        assert_eq!(result.weak_regions.len(), 1);
        assert_eq!(result.weak_regions[0].start_bit, 400);
        assert_eq!(result.weak_regions[0].length, 20);
        assert!(result.protection.is_none());
    }

    #[test]
    fn test_alignment_reported_not_applied() {
        let base = pattern(800, 3);
        let mut shifted = vec![1, 0, 1, 1, 0, 0, 1];
        shifted.extend_from_slice(&base);
        let engine = engine_with(VotingParams::default(), &[base.clone(), shifted.clone()]);
        let result = engine.run().unwrap();

        assert_eq!(result.alignment_offsets, vec![0, 7]);
        // Bits are still voted at absolute positions
        assert!(result.weak_bits > 0);
        assert_eq!(result.total_bits, shifted.len());

        let unaligned = VotingParams {
            align: false,
            ..VotingParams::default()
        };
        let result = engine_with(unaligned, &[base, shifted]).run().unwrap();
        assert_eq!(result.alignment_offsets, vec![0, 0]);
    }

    #[test]
    fn test_strategies() {
        let revolutions = [vec![1u8; 16], vec![1u8; 16], vec![0u8; 16]];

        let result = engine_with(VotingParams::majority(), &revolutions).run().unwrap();
        assert_eq!(result.confidence()[0], 66);
        assert_eq!(result.stable_bits, 16);

        let result = engine_with(VotingParams::consensus(), &revolutions).run().unwrap();
        assert_eq!(result.confidence()[0], 33);
        assert_eq!(result.weak_bits, 16);
        assert_eq!(result.strategy, VoteStrategy::Consensus);
    }

    #[test]
    fn test_missing_bits() {
        let low = vec![0u8; 4];
        let mut engine = VotingEngine::new(VotingParams::default()).unwrap();
        let bits = Bitstream::from_bits(&[1, 1, 1, 1]);
        engine.add_bits(&bits, Some(low.as_slice())).unwrap();
        engine.add_bits(&bits, Some(low.as_slice())).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.missing_bits, 4);
        assert_eq!(result.bit_stats()[0].class, BitClass::Missing);
        assert_eq!(result.bit(0), Some(false));
        assert_eq!(result.overall_confidence, 0.0);
    }

    #[test]
    fn test_add_bits_rejects_bad_input() {
        let mut engine = VotingEngine::new(VotingParams::default()).unwrap();
        assert!(engine.add_bits(&Bitstream::new(), None).is_err());
        let bits = Bitstream::from_bits(&[1, 0, 1]);
        assert!(engine.add_bits(&bits, Some(&[100u8, 100][..])).is_err());
        for _ in 0..MAX_REVOLUTIONS {
            engine.add_bits(&bits, None).unwrap();
        }
        assert!(matches!(
            engine.add_bits(&bits, None),
            Err(VoteError::Overflow { .. })
        ));
        engine.reset();
        assert_eq!(engine.revolution_count(), 0);
    }

    #[test]
    fn test_flux_revolutions() {
        let deltas: Vec<u32> = [4000, 6000, 4000, 8000].repeat(50);
        let mut engine = VotingEngine::new(VotingParams::default()).unwrap();
        engine.add_flux(&deltas, 2000).unwrap();
        engine.add_flux(&deltas, 2000).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.overall_confidence, 1.0);
        assert_eq!(result.bit(1), Some(true));

        let quality = engine.evaluate_revolution(0).unwrap();
        assert_eq!(quality.coverage, 100);
        assert_eq!(quality.timing_errors, 0);
        assert_eq!(quality.quality_score, 100);
        assert!(engine.evaluate_revolution(5).is_err());
    }

    #[test]
    fn test_analyze_quick() {
        let engine = engine_with(
            VotingParams::default(),
            &[vec![1, 0, 1, 1], vec![1, 1, 0, 1], vec![0, 0, 1, 1]],
        );
        let bits = engine.analyze_quick().unwrap();
        assert_eq!(bits, Bitstream::from_bits(&[1, 0, 1, 1]));
    }

    #[test]
    fn test_vmax_detection_and_apply() {
        let mut base = pattern(2000, 9);
        let mut other = base.clone();
        for start in [100usize, 500, 900, 1300] {
            for k in 0..16 {
                base[start + k] = (k % 2) as u8;
                other[start + k] = 1 - (k % 2) as u8;
            }
        }
        let engine = engine_with(VotingParams::default(), &[base, other.clone(), other]);
        let mut result = engine.run().unwrap();
        assert_eq!(result.weak_regions.len(), 4);
        assert!(result.weak_regions.iter().all(|r| r.pattern == WeakPattern::Random));
        assert!(result.weak_regions.iter().all(|r| r.likely_protection));

        let protection = result.protection.clone().unwrap();
        assert_eq!(protection.name, "V-MAX!");
        assert_eq!(protection.confidence, 80);

        engine.analyze_weak_pattern(&mut result);
        assert!(result.weak_regions.iter().all(|r| r.length == 16));

        let mut track = Track::new(0, 0).unwrap();
        track.apply_voting(&result);
        track.apply_voting(&result);
        assert!(track.flags.contains(TrackFlags::MULTI_REV_FUSED));
        assert!(track.flags.contains(TrackFlags::PROTECTED));
        assert_eq!(track.weak_regions().len(), 4);
        assert_eq!(track.protections().len(), 1);
        assert_eq!(track.protections()[0].location_bit, 100);
        assert_eq!(track.protections()[0].severity, 2);
        assert_eq!(track.bitstream().unwrap().len(), result.total_bits);
    }

    #[test]
    fn test_add_revolution_uses_histogram_clock() {
        let mut revolution = FluxRevolution::from_deltas(vec![4000; 200]).unwrap();
        assert_eq!(revolution.calc_stats().unwrap().clock_period_ns, 4500);

        let mut engine = VotingEngine::new(VotingParams::default()).unwrap();
        engine.add_revolution(&revolution).unwrap();
        assert_eq!(engine.revolutions[0].bits.len(), 200);

        let mut track = Track::new(0, 0).unwrap();
        track.bitcell_ns = 2000;
        track.add_revolution(revolution).unwrap();
        engine.add_track(&track).unwrap();
        assert_eq!(engine.revolutions[1].bits.len(), 400);
    }

    #[test]
    fn test_apply_voting_reports_dropped_regions() {
        let base = pattern(1400, 4);
        let mut other = base.clone();
        for span in 0..70 {
            for bit in &mut other[span * 20..span * 20 + 10] {
                *bit ^= 1;
            }
        }
        let result = engine_with(VotingParams::default(), &[base, other]).run().unwrap();
        assert_eq!(result.weak_regions.len(), 70);

        let mut track = Track::new(0, 0).unwrap();
        assert_eq!(track.apply_voting(&result), 70 - MAX_WEAK_REGIONS);
        assert_eq!(track.weak_regions().len(), MAX_WEAK_REGIONS);
        assert_eq!(track.weak_regions()[63].start_bit, 63 * 20);
        assert!(track.flags.contains(TrackFlags::WEAK_BITS));
    }

    #[test]
    fn test_result_exports() {
        let base = pattern(200, 2);
        let mut other = base.clone();
        for bit in &mut other[50..70] {
            *bit ^= 1;
        }
        let result = engine_with(VotingParams::default(), &[base, other]).run().unwrap();

        let json = result.to_json(true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["strategy"], "weighted");
        assert_eq!(value["weak_bits"], 20);
        assert_eq!(value["weak_regions"][0]["length"], 20);
        assert_eq!(value["bit_stats"].as_array().unwrap().len(), 20);
        assert!(!result.to_json(false).unwrap().contains("bit_stats"));

        let summary = result.summary();
        assert!(summary.contains("Weak bits:    20"));
        assert!(summary.contains("#1: bits 50-70"));

        let stream = result.to_bitstream();
        assert!(stream.is_weak(55));
        assert!(!stream.is_weak(10));
    }

    #[test]
    fn test_fuse_disk() {
        let mut disk = Disk::new(2, 1).unwrap();
        let deltas: Vec<u32> = [4000, 6000, 4000, 8000].repeat(40);
        let mut track = Track::new(0, 0).unwrap();
        for _ in 0..3 {
            track
                .add_revolution(FluxRevolution::from_deltas(deltas.clone()).unwrap())
                .unwrap();
        }
        disk.add_track(track).unwrap();
        let mut single = Track::new(1, 0).unwrap();
        single
            .add_revolution(FluxRevolution::from_deltas(deltas).unwrap())
            .unwrap();
        disk.add_track(single).unwrap();

        assert_eq!(fuse_disk(&mut disk, &VotingParams::default()).unwrap(), 1);
        let fused = disk.get_track(0, 0).unwrap();
        assert!(fused.flags.contains(TrackFlags::MULTI_REV_FUSED));
        assert_eq!(fused.quality_score, 100);
        assert!(!disk.get_track(1, 0).unwrap().flags.contains(TrackFlags::MULTI_REV_FUSED));
    }

    proptest! {
        #[test]
        fn test_unanimity_holds(bits in prop::collection::vec(0u8..2, 1..400), copies in 2usize..6) {
            let revolutions = vec![bits; copies];
            let result = engine_with(VotingParams::default(), &revolutions).run().unwrap();
            prop_assert_eq!(result.stable_bits, result.total_bits);
            prop_assert!(result.confidence().iter().all(|&c| c == 100));
            prop_assert_eq!(result.overall_confidence, 1.0);
        }
    }
}
