/// Per-bit vote accumulation across revolutions

use super::RevolutionBits;

/// Per-bit confidence below which a revolution's bit is not counted
pub const CONFIDENCE_FLOOR: u8 = 20;

/// Votes and timing collected for one bit position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// Votes for 0
    pub zeros: u8,
    /// Votes for 1
    pub ones: u8,
    /// Revolutions with no usable bit here
    pub missing: u8,
    timing_sum: u64,
    timing_sq_sum: u64,
    timing_count: u8,
}

impl Tally {
    /// Valid votes cast
    #[inline]
    pub fn total(&self) -> u8 {
        self.zeros + self.ones
    }

    /// Winning value; ties go to 0
    #[inline]
    pub fn winner(&self) -> bool {
        self.ones > self.zeros
    }

    /// Votes for the winning value
    #[inline]
    pub fn winner_votes(&self) -> u8 {
        self.zeros.max(self.ones)
    }

    fn add_timing(&mut self, ns: u32) {
        self.timing_sum += ns as u64;
        self.timing_sq_sum += ns as u64 * ns as u64;
        self.timing_count += 1;
    }

    /// Population standard deviation of the bit timings, rounded (0 with fewer than two)
    pub fn timing_spread(&self) -> u16 {
        if self.timing_count < 2 {
            return 0;
        }
        let n = self.timing_count as f64;
        let mean = self.timing_sum as f64 / n;
        let variance = (self.timing_sq_sum as f64 / n - mean * mean).max(0.0);
        (variance.sqrt() + 0.5).min(u16::MAX as f64) as u16
    }
}

/// Tally every revolution's bits by absolute position
///
/// The output covers the longest revolution. Positions past the end of a
/// shorter one count as missing for it.
pub fn accumulate(revolutions: &[RevolutionBits]) -> Vec<Tally> {
    let length = revolutions.iter().map(|r| r.bits.len()).max().unwrap_or(0);
    let mut tallies = vec![Tally::default(); length];

    for revolution in revolutions {
        let timing = revolution.bits.timing();
        for (position, tally) in tallies.iter_mut().enumerate() {
            let bit = match revolution.bits.get(position) {
                Some(bit) => bit,
                None => {
                    tally.missing += 1;
                    continue;
                }
            };
            let confidence = revolution
                .confidence
                .as_ref()
                .map_or(100, |c| c[position]);

            if confidence < CONFIDENCE_FLOOR {
                tally.missing += 1;
            } else if bit {
                tally.ones += 1;
            } else {
                tally.zeros += 1;
            }

            if let Some(&ns) = timing.and_then(|t| t.get(position)) {
                if ns > 0 {
                    tally.add_timing(ns);
                }
            }
        }
    }
    tallies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::Bitstream;

    fn revolution(bits: &[u8], confidence: Option<Vec<u8>>) -> RevolutionBits {
        RevolutionBits {
            bits: Bitstream::from_bits(bits),
            confidence,
        }
    }

    #[test]
    fn test_accumulate_counts() {
        let revolutions = [
            revolution(&[1, 0, 1, 1], None),
            revolution(&[1, 1, 0], None),
            revolution(&[1, 0, 1, 0], Some(vec![100, 100, 10, 100])),
        ];
        let tallies = accumulate(&revolutions);
        assert_eq!(tallies.len(), 4);
        assert_eq!((tallies[0].zeros, tallies[0].ones, tallies[0].missing), (0, 3, 0));
        assert_eq!((tallies[1].zeros, tallies[1].ones, tallies[1].missing), (2, 1, 0));
        assert_eq!((tallies[2].zeros, tallies[2].ones, tallies[2].missing), (1, 1, 1));
        assert_eq!((tallies[3].zeros, tallies[3].ones, tallies[3].missing), (1, 1, 1));
        assert!(!tallies[2].winner());
    }

    #[test]
    fn test_timing_spread() {
        let mut tally = Tally::default();
        assert_eq!(tally.timing_spread(), 0);
        tally.add_timing(1000);
        tally.add_timing(3000);
        assert_eq!(tally.timing_spread(), 1000);
    }
}
