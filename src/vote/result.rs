/// Voting results and their export

use super::VoteStrategy;
use crate::bitstream::Bitstream;
use crate::error::VoteError;
use crate::format::constants::{MAX_PROTECTIONS, MAX_WEAK_REGIONS};
use crate::image::{ProtectionMarker, Track, TrackFlags, TrackQuality, WeakPattern, WeakRegion};
use crate::protection::ProtectionMatch;
use serde::Serialize;
use std::fmt::Write;

/// Classification of one fused bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BitClass {
    /// Not classified
    #[default]
    Unknown,
    /// Reliably 0
    Stable0,
    /// Reliably 1
    Stable1,
    /// Revolutions disagree
    Weak,
    /// No revolution had a usable bit
    Missing,
    /// Present in some revolutions only
    Extra,
    /// Part of a protection signature
    Protected,
}

impl BitClass {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            BitClass::Unknown => "unknown",
            BitClass::Stable0 => "stable_0",
            BitClass::Stable1 => "stable_1",
            BitClass::Weak => "weak",
            BitClass::Missing => "missing",
            BitClass::Extra => "extra",
            BitClass::Protected => "protected",
        }
    }
}

/// Vote detail for one bit position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BitStats {
    /// Bit position
    pub position: u32,
    /// Votes for 0
    pub votes_0: u8,
    /// Votes for 1
    pub votes_1: u8,
    /// Revolutions without a usable bit
    pub votes_missing: u8,
    /// Confidence 0-100
    pub confidence: u8,
    /// Classification
    pub class: BitClass,
    /// Standard deviation of the bit timings in nanoseconds
    pub timing_spread: u16,
}

/// A run of weak bits found by voting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteRegion {
    /// First bit
    pub start_bit: u32,
    /// Length in bits
    pub length: u32,
    /// Pattern
    pub pattern: WeakPattern,
    /// Percentage of 1-bits in the fused result
    pub bias: u8,
    /// Mean confidence of the bits in the region
    pub avg_confidence: u8,
    /// The region took part in a protection match
    pub likely_protection: bool,
}

/// How one revolution fared against the fused result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RevolutionQuality {
    /// Revolution index
    pub index: usize,
    /// Revolution had bits to vote with
    pub usable: bool,
    /// Bits produced
    pub bit_count: usize,
    /// Percentage of the fused length this revolution covers
    pub coverage: u8,
    /// Percentage of fused bits this revolution agrees with
    pub quality_score: u8,
    /// Jumps of more than 1 µs between neighbouring bit timings
    pub timing_errors: u32,
}

/// Outcome of a multi-revolution vote
#[derive(Debug, Clone, PartialEq)]
pub struct VotingResult {
    /// Strategy the vote ran with
    pub strategy: VoteStrategy,
    /// Bits voted
    pub total_bits: usize,
    /// Bits classified stable
    pub stable_bits: usize,
    /// Bits classified weak
    pub weak_bits: usize,
    /// Bits no revolution could vote on
    pub missing_bits: usize,
    /// Stable bits over total bits, 0.0-1.0
    pub overall_confidence: f32,
    /// Weak regions in bit order
    pub weak_regions: Vec<VoteRegion>,
    /// Per-revolution quality
    pub revolutions: Vec<RevolutionQuality>,
    /// Revolution agreeing most with the result
    pub best_revolution: usize,
    /// Offset of each revolution against revolution 0 (reported, not applied)
    pub alignment_offsets: Vec<i32>,
    /// Protection scheme matched by the weak regions
    pub protection: Option<ProtectionMatch>,
    pub(crate) data: Bitstream,
    pub(crate) confidence: Vec<u8>,
    pub(crate) stats: Vec<BitStats>,
    pub(crate) preserve_weak: bool,
}

#[derive(Serialize)]
struct RegionReport {
    start: u32,
    length: u32,
    pattern: &'static str,
    bias: u8,
}

#[derive(Serialize)]
struct BitReport {
    pos: u32,
    class: &'static str,
    conf: u8,
    v0: u8,
    v1: u8,
}

#[derive(Serialize)]
struct ResultReport {
    strategy: &'static str,
    total_bits: usize,
    stable_bits: usize,
    weak_bits: usize,
    missing_bits: usize,
    overall_confidence: f32,
    revolutions_used: usize,
    best_revolution: usize,
    alignment_offsets: Vec<i32>,
    weak_regions: Vec<RegionReport>,
    has_protection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    protection_scheme: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    protection_confidence: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bit_stats: Option<Vec<BitReport>>,
}

impl VotingResult {
    /// Fused bit at `index`
    pub fn bit(&self, index: usize) -> Option<bool> {
        self.data.get(index)
    }

    /// Fused bits, packed MSB first
    pub fn bits_as_bytes(&self) -> &[u8] {
        self.data.as_bytes()
    }

    /// Per-bit confidence 0-100
    pub fn confidence(&self) -> &[u8] {
        &self.confidence
    }

    /// Per-bit vote detail
    pub fn bit_stats(&self) -> &[BitStats] {
        &self.stats
    }

    /// Check if a bit was classified weak
    pub fn is_weak_bit(&self, index: usize) -> bool {
        self.stats
            .get(index)
            .is_some_and(|s| s.class == BitClass::Weak)
    }

    /// Percentage of votes for 1 at `index` (50 when unknown)
    pub fn weak_probability(&self, index: usize) -> u8 {
        match self.stats.get(index) {
            Some(s) if s.votes_0 + s.votes_1 > 0 => {
                (s.votes_1 as u32 * 100 / (s.votes_0 + s.votes_1) as u32) as u8
            }
            _ => 50,
        }
    }

    /// The fused bits as a bitstream, with weak bits marked when weak data is preserved
    pub fn to_bitstream(&self) -> Bitstream {
        let mut stream = self.data.clone();
        if self.preserve_weak && self.weak_bits > 0 {
            let mut mask = vec![0u8; self.total_bits.div_ceil(8)];
            for (i, stat) in self.stats.iter().enumerate() {
                if stat.class == BitClass::Weak {
                    mask[i / 8] |= 0x80 >> (i % 8);
                }
            }
            // The mask is sized from the bit count, so this cannot fail
            let _ = stream.set_weak_mask(mask);
        }
        stream
    }

    /// JSON report, optionally listing every weak or missing bit
    pub fn to_json(&self, include_bit_stats: bool) -> Result<String, VoteError> {
        let report = ResultReport {
            strategy: self.strategy.name(),
            total_bits: self.total_bits,
            stable_bits: self.stable_bits,
            weak_bits: self.weak_bits,
            missing_bits: self.missing_bits,
            overall_confidence: self.overall_confidence,
            revolutions_used: self.revolutions.len(),
            best_revolution: self.best_revolution,
            alignment_offsets: self.alignment_offsets.clone(),
            weak_regions: self
                .weak_regions
                .iter()
                .map(|r| RegionReport {
                    start: r.start_bit,
                    length: r.length,
                    pattern: r.pattern.name(),
                    bias: r.bias,
                })
                .collect(),
            has_protection: self.protection.is_some(),
            protection_scheme: self.protection.as_ref().map(|p| p.name),
            protection_confidence: self.protection.as_ref().map(|p| p.confidence),
            bit_stats: include_bit_stats.then(|| {
                self.stats
                    .iter()
                    .filter(|s| matches!(s.class, BitClass::Weak | BitClass::Missing))
                    .map(|s| BitReport {
                        pos: s.position,
                        class: s.class.name(),
                        conf: s.confidence,
                        v0: s.votes_0,
                        v1: s.votes_1,
                    })
                    .collect()
            }),
        };
        serde_json::to_string_pretty(&report).map_err(|e| VoteError::Invalid(e.to_string()))
    }

    /// Human-readable report
    pub fn summary(&self) -> String {
        let percent = |n: usize| {
            if self.total_bits == 0 {
                0.0
            } else {
                n as f64 * 100.0 / self.total_bits as f64
            }
        };
        let mut out = String::new();
        let _ = writeln!(out, "Multi-revolution vote ({})", self.strategy.name());
        let _ = writeln!(
            out,
            "  Revolutions:  {} (best: {})",
            self.revolutions.len(),
            self.best_revolution
        );
        let _ = writeln!(
            out,
            "  Total bits:   {} (confidence {:.1}%)",
            self.total_bits,
            self.overall_confidence * 100.0
        );
        let _ = writeln!(out, "  Stable bits:  {} ({:.1}%)", self.stable_bits, percent(self.stable_bits));
        let _ = writeln!(out, "  Weak bits:    {} ({:.1}%)", self.weak_bits, percent(self.weak_bits));
        let _ = writeln!(out, "  Missing bits: {} ({:.1}%)", self.missing_bits, percent(self.missing_bits));

        if !self.weak_regions.is_empty() {
            let _ = writeln!(out, "  Weak regions: {}", self.weak_regions.len());
            for (i, region) in self.weak_regions.iter().take(5).enumerate() {
                let _ = writeln!(
                    out,
                    "    #{}: bits {}-{} ({}, bias {}%)",
                    i + 1,
                    region.start_bit,
                    region.start_bit + region.length,
                    region.pattern.name(),
                    region.bias
                );
            }
        }
        if let Some(protection) = &self.protection {
            let _ = writeln!(
                out,
                "  Protection:   {} ({}%)",
                protection.name, protection.confidence
            );
        }
        out
    }

    /// Track quality class for the overall confidence
    pub fn track_quality(&self) -> TrackQuality {
        match self.overall_confidence {
            c if c >= 0.95 => TrackQuality::Perfect,
            c if c >= 0.85 => TrackQuality::Good,
            c if c >= 0.70 => TrackQuality::Degraded,
            _ => TrackQuality::Marginal,
        }
    }
}

impl Track {
    /// Record a vote on this track
    ///
    /// Sets the fused bitstream, quality and fused flag. When weak data is
    /// preserved the weak regions replace the track's own, up to its capacity.
    /// A matched protection scheme is added once.
    ///
    /// Returns the number of weak regions that did not fit on the track.
    pub fn apply_voting(&mut self, result: &VotingResult) -> usize {
        self.flags.insert(TrackFlags::MULTI_REV_FUSED);
        self.set_bitstream(result.to_bitstream());
        self.quality = result.track_quality();
        self.quality_score = (result.overall_confidence * 100.0) as u8;

        let mut dropped = 0;
        if result.preserve_weak {
            self.clear_weak_regions();
            for region in &result.weak_regions {
                let weak = WeakRegion {
                    start_bit: region.start_bit,
                    length_bits: region.length,
                    pattern: region.pattern,
                    confidence: region.avg_confidence,
                };
                if self.add_weak_region(weak).is_err() {
                    dropped += 1;
                }
            }
            if dropped > 0 {
                tracing::warn!(
                    "track {}.{}: {} of {} weak regions dropped (max: {})",
                    self.cylinder,
                    self.head,
                    dropped,
                    result.weak_regions.len(),
                    MAX_WEAK_REGIONS
                );
            }
        }

        if let Some(protection) = &result.protection {
            let known = self
                .protections()
                .iter()
                .any(|p| p.scheme_id == protection.scheme_id);
            if !known && self.protections().len() < MAX_PROTECTIONS {
                let (location_bit, length_bits) = protection
                    .regions
                    .first()
                    .and_then(|&i| result.weak_regions.get(i))
                    .map_or((0, 0), |r| (r.start_bit, r.length));
                let marker = ProtectionMarker {
                    scheme_id: protection.scheme_id,
                    location_bit,
                    length_bits,
                    severity: if protection.confidence > 80 { 3 } else { 2 },
                    confirmed: false,
                    signature_crc: 0,
                    name: protection.name.to_string(),
                };
                if self.add_protection(marker).is_err() {
                    tracing::warn!(
                        "track {}.{}: no room for protection marker",
                        self.cylinder,
                        self.head
                    );
                }
            }
        }
        dropped
    }
}
