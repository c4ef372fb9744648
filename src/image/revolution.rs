/// Flux revolution data structures

use crate::analysis;
use crate::error::{IrError, Result};
use crate::format::constants::{HISTOGRAM_BUCKETS, MAX_FLUX_PER_REVOLUTION};
use crate::format::DataType;
use std::fmt;

/// Revolution flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RevolutionFlags(pub u32);

impl RevolutionFlags {
    /// Capture started at an index pulse
    pub const INDEX_START: u32 = 1 << 0;
    /// Capture ended at an index pulse
    pub const INDEX_END: u32 = 1 << 1;
    /// Full revolution captured
    pub const COMPLETE: u32 = 1 << 2;
    /// Capture hardware overflowed
    pub const OVERFLOW: u32 = 1 << 3;
    /// Best revolution of the track
    pub const BEST_QUALITY: u32 = 1 << 4;
    /// Reference revolution for fusion
    pub const REFERENCE: u32 = 1 << 5;

    /// Create flags from a raw value
    #[inline]
    pub fn new(value: u32) -> Self {
        RevolutionFlags(value)
    }

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

    /// Clear the bits in `mask`
    #[inline]
    pub fn remove(&mut self, mask: u32) {
        self.0 &= !mask;
    }

    /// Check if the revolution is index aligned at both ends
    #[inline]
    pub fn is_index_aligned(&self) -> bool {
        self.contains(Self::INDEX_START | Self::INDEX_END)
    }
}

impl fmt::Display for RevolutionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(u32, &str); 6] = [
            (RevolutionFlags::INDEX_START, "IDX_START"),
            (RevolutionFlags::INDEX_END, "IDX_END"),
            (RevolutionFlags::COMPLETE, "COMPLETE"),
            (RevolutionFlags::OVERFLOW, "OVERFLOW"),
            (RevolutionFlags::BEST_QUALITY, "BEST"),
            (RevolutionFlags::REFERENCE, "REF"),
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

/// Statistics over one revolution's flux deltas
#[derive(Debug, Clone, PartialEq)]
pub struct FluxStats {
    /// Number of transitions
    pub total_transitions: u32,
    /// Shortest delta in nanoseconds
    pub min_delta_ns: u32,
    /// Longest delta in nanoseconds
    pub max_delta_ns: u32,
    /// Mean delta in nanoseconds
    pub mean_delta_ns: u32,
    /// Standard deviation of the deltas
    pub stddev_delta_ns: u32,
    /// Dominant bit-cell time estimated from the histogram
    pub clock_period_ns: u32,
    /// Sum of all deltas (index to index time)
    pub index_to_index_ns: u64,
    /// Delta histogram, one bucket per microsecond
    pub histogram: [u16; HISTOGRAM_BUCKETS],
}

impl Default for FluxStats {
    fn default() -> Self {
        Self {
            total_transitions: 0,
            min_delta_ns: 0,
            max_delta_ns: 0,
            mean_delta_ns: 0,
            stddev_delta_ns: 0,
            clock_period_ns: 0,
            index_to_index_ns: 0,
            histogram: [0; HISTOGRAM_BUCKETS],
        }
    }
}

/// One captured revolution of a track
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FluxRevolution {
    /// Revolution flags
    pub flags: RevolutionFlags,
    /// Duration of the revolution in nanoseconds
    pub duration_ns: u64,
    /// Offset of the index pulse from the capture start
    pub index_offset_ns: u32,
    /// Kind of data held in `deltas`
    pub data_type: DataType,
    /// Quality score 0-100
    pub quality_score: u8,
    deltas: Vec<u32>,
    confidence: Option<Vec<u8>>,
    stats: Option<FluxStats>,
}

impl FluxRevolution {
    /// Create an empty revolution
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a revolution holding flux deltas
    pub fn from_deltas(deltas: Vec<u32>) -> Result<Self> {
        let mut revolution = Self::new();
        revolution.set_flux(deltas, DataType::FluxDelta)?;
        Ok(revolution)
    }

    /// Replace the flux data, updating the duration and dropping stale statistics
    pub fn set_flux(&mut self, deltas: Vec<u32>, data_type: DataType) -> Result<()> {
        if deltas.is_empty() {
            return Err(IrError::invalid("flux data is empty"));
        }
        if deltas.len() > MAX_FLUX_PER_REVOLUTION {
            return Err(IrError::Overflow {
                what: "flux transitions",
                limit: MAX_FLUX_PER_REVOLUTION,
            });
        }
        self.duration_ns = deltas.iter().map(|&d| d as u64).sum();
        self.deltas = deltas;
        self.data_type = data_type;
        self.confidence = None;
        self.stats = None;
        Ok(())
    }

    /// Attach per-transition confidence bytes (one per delta)
    pub fn set_confidence(&mut self, confidence: Vec<u8>) -> Result<()> {
        if confidence.len() != self.deltas.len() {
            return Err(IrError::invalid(format!(
                "confidence length {} does not match {} transitions",
                confidence.len(),
                self.deltas.len()
            )));
        }
        self.confidence = Some(confidence);
        Ok(())
    }

    /// Get the flux deltas
    pub fn deltas(&self) -> &[u32] {
        &self.deltas
    }

    /// Get the per-transition confidence, if present
    pub fn confidence(&self) -> Option<&[u8]> {
        self.confidence.as_deref()
    }

    /// Number of flux transitions
    pub fn flux_count(&self) -> usize {
        self.deltas.len()
    }

    /// Check if the revolution holds no flux
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Statistics from the last `calc_stats` call
    pub fn stats(&self) -> Option<&FluxStats> {
        self.stats.as_ref()
    }

    /// Compute and store statistics over the deltas
    pub fn calc_stats(&mut self) -> Result<&FluxStats> {
        let stats = analysis::flux_stats(&self.deltas)?;
        Ok(self.stats.insert(stats))
    }

    /// Measured rotation speed in rpm x 100
    pub fn rpm_x100(&self) -> u32 {
        analysis::duration_to_rpm(self.duration_ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_deltas_sets_duration() {
        let revolution = FluxRevolution::from_deltas(vec![2000, 4000, 6000]).unwrap();
        assert_eq!(revolution.flux_count(), 3);
        assert_eq!(revolution.duration_ns, 12000);
        assert_eq!(revolution.data_type, DataType::FluxDelta);
        assert!(revolution.stats().is_none());
    }

    #[test]
    fn test_set_flux_empty() {
        let mut revolution = FluxRevolution::new();
        let result = revolution.set_flux(Vec::new(), DataType::FluxDelta);
        assert!(matches!(result, Err(IrError::Invalid(_))));
    }

    #[test]
    fn test_set_flux_too_many() {
        let mut revolution = FluxRevolution::new();
        let result = revolution.set_flux(vec![2000; MAX_FLUX_PER_REVOLUTION + 1], DataType::FluxDelta);
        assert!(matches!(result, Err(IrError::Overflow { .. })));
        assert!(revolution.is_empty());
    }

    #[test]
    fn test_set_flux_clears_stats() {
        let mut revolution = FluxRevolution::from_deltas(vec![4000; 10]).unwrap();
        revolution.calc_stats().unwrap();
        assert!(revolution.stats().is_some());
        revolution.set_flux(vec![2000; 5], DataType::FluxDelta).unwrap();
        assert!(revolution.stats().is_none());
    }

    #[test]
    fn test_confidence_length() {
        let mut revolution = FluxRevolution::from_deltas(vec![4000; 4]).unwrap();
        assert!(revolution.set_confidence(vec![100; 3]).is_err());
        revolution.set_confidence(vec![100; 4]).unwrap();
        assert_eq!(revolution.confidence(), Some(&[100u8; 4][..]));
    }

    #[test]
    fn test_flags() {
        let mut flags = RevolutionFlags::default();
        flags.insert(RevolutionFlags::INDEX_START);
        assert!(!flags.is_index_aligned());
        flags.insert(RevolutionFlags::INDEX_END | RevolutionFlags::COMPLETE);
        assert!(flags.is_index_aligned());
        assert_eq!(flags.to_string(), "IDX_START|IDX_END|COMPLETE");
        flags.remove(RevolutionFlags::COMPLETE);
        assert!(!flags.contains(RevolutionFlags::COMPLETE));
    }
}
