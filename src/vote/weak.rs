/// Weak-region detection over voted bits

use super::result::{BitClass, BitStats, VoteRegion};
use super::RevolutionBits;
use crate::bitstream::Bitstream;
use crate::image::WeakPattern;
use tracing::warn;

/// Most weak regions one result keeps
pub const MAX_VOTE_REGIONS: usize = 256;

/// Classify a region from the share of 1-bits in the fused result
pub fn pattern_from_bias(bias: u8) -> WeakPattern {
    if bias > 70 {
        WeakPattern::Stuck1
    } else if bias < 30 {
        WeakPattern::Stuck0
    } else {
        WeakPattern::Random
    }
}

/// Collect contiguous weak runs of at least `min_run` bits
pub fn detect_regions(
    stats: &[BitStats],
    data: &Bitstream,
    confidence: &[u8],
    min_run: u32,
) -> Vec<VoteRegion> {
    let mut regions = Vec::new();
    let mut skipped = 0usize;
    let mut start = 0;
    let mut run = 0u32;

    // One step past the end closes a run that reaches the last bit
    for position in 0..=stats.len() {
        let weak = stats
            .get(position)
            .is_some_and(|s| s.class == BitClass::Weak);
        if weak {
            if run == 0 {
                start = position;
            }
            run += 1;
            continue;
        }

        if run > 0 && run >= min_run && regions.len() >= MAX_VOTE_REGIONS {
            skipped += 1;
        } else if run > 0 && run >= min_run {
            let end = start + run as usize;
            let confidence_sum: u32 = confidence[start..end].iter().map(|&c| c as u32).sum();
            let ones = (start..end).filter(|&i| data.get(i) == Some(true)).count() as u32;
            let bias = (ones * 100 / run) as u8;
            regions.push(VoteRegion {
                start_bit: start as u32,
                length: run,
                pattern: pattern_from_bias(bias),
                bias,
                avg_confidence: (confidence_sum / run) as u8,
                likely_protection: false,
            });
        }
        run = 0;
    }
    if skipped > 0 {
        warn!(
            "{} weak regions past the first {} not reported",
            skipped, MAX_VOTE_REGIONS
        );
    }
    regions
}

/// Classify a span from how every revolution read it
///
/// Returns the pattern and the share of 1-bits across all revolutions.
pub fn analyze_pattern(revolutions: &[RevolutionBits], start: u32, length: u32) -> (WeakPattern, u8) {
    let start = start as usize;
    let end = start.saturating_add(length as usize);
    let mut ones_per_revolution = Vec::with_capacity(revolutions.len());
    let mut total = 0u32;

    for revolution in revolutions {
        let stop = end.min(revolution.bits.len());
        let ones = (start..stop)
            .filter(|&i| revolution.bits.get(i) == Some(true))
            .count() as i64;
        total += stop.saturating_sub(start) as u32;
        ones_per_revolution.push(ones);
    }

    if total == 0 {
        return (WeakPattern::Random, 50);
    }
    let total_ones: i64 = ones_per_revolution.iter().sum();
    let bias = (total_ones * 100 / total as i64) as u8;

    let pattern = if bias > 80 {
        WeakPattern::Stuck1
    } else if bias < 20 {
        WeakPattern::Stuck0
    } else if bias > 40 && bias < 60 {
        WeakPattern::Random
    } else {
        // Periodic when every revolution reads a similar number of ones
        let first = ones_per_revolution[0];
        let limit = (length / 4) as i64;
        if ones_per_revolution.iter().all(|&ones| (ones - first).abs() <= limit) {
            WeakPattern::Periodic
        } else {
            WeakPattern::Degraded
        }
    };
    (pattern, bias)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(classes: &[BitClass]) -> Vec<BitStats> {
        classes
            .iter()
            .enumerate()
            .map(|(position, &class)| BitStats {
                position: position as u32,
                class,
                confidence: if class == BitClass::Weak { 50 } else { 100 },
                ..BitStats::default()
            })
            .collect()
    }

    #[test]
    fn test_pattern_from_bias() {
        assert_eq!(pattern_from_bias(71), WeakPattern::Stuck1);
        assert_eq!(pattern_from_bias(70), WeakPattern::Random);
        assert_eq!(pattern_from_bias(29), WeakPattern::Stuck0);
        assert_eq!(pattern_from_bias(50), WeakPattern::Random);
    }

    #[test]
    fn test_detect_region_at_end() {
        let mut classes = vec![BitClass::Stable0; 10];
        classes.extend(vec![BitClass::Weak; 12]);
        let stats = stats(&classes);
        let confidence: Vec<u8> = stats.iter().map(|s| s.confidence).collect();
        let data = Bitstream::from_bits(&[0; 22]);

        let regions = detect_regions(&stats, &data, &confidence, 8);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].start_bit, 10);
        assert_eq!(regions[0].length, 12);
        assert_eq!(regions[0].avg_confidence, 50);
        assert_eq!(regions[0].pattern, WeakPattern::Stuck0);
    }

    #[test]
    fn test_short_runs_ignored() {
        let mut classes = vec![BitClass::Weak; 5];
        classes.push(BitClass::Stable1);
        classes.extend(vec![BitClass::Weak; 7]);
        let stats = stats(&classes);
        let confidence: Vec<u8> = stats.iter().map(|s| s.confidence).collect();
        let data = Bitstream::from_bits(&[1; 13]);
        assert!(detect_regions(&stats, &data, &confidence, 8).is_empty());
        assert_eq!(detect_regions(&stats, &data, &confidence, 5).len(), 2);
    }

    #[test]
    fn test_analyze_pattern() {
        let revolution = |bits: &[u8]| RevolutionBits {
            bits: Bitstream::from_bits(bits),
            confidence: None,
        };
        let stuck = [revolution(&[1; 16]), revolution(&[1; 16])];
        assert_eq!(analyze_pattern(&stuck, 0, 16), (WeakPattern::Stuck1, 100));

        let split = [revolution(&[1; 16]), revolution(&[0; 16])];
        assert_eq!(analyze_pattern(&split, 0, 16), (WeakPattern::Random, 50));

        let mostly_one = [1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0];
        let steady = [revolution(&mostly_one), revolution(&mostly_one)];
        assert_eq!(analyze_pattern(&steady, 0, 16), (WeakPattern::Periodic, 75));

        let fading = [revolution(&[1; 16]), revolution(&[1, 0, 0, 0].repeat(4))];
        assert_eq!(analyze_pattern(&fading, 0, 16), (WeakPattern::Degraded, 62));

        assert_eq!(analyze_pattern(&stuck, 100, 16), (WeakPattern::Random, 50));
    }
}
