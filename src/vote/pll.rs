/// Flux-to-bit conversion with a simple phase-locked loop

use crate::bitstream::Bitstream;
use crate::error::VoteError;

/// Bit cell assumed when a revolution carries no clock estimate
pub const DEFAULT_BITCELL_NS: u32 = 2000;

/// Fraction of the cell error fed back into the period estimate
const PERIOD_GAIN: f32 = 0.005;
/// Longest run of cells one transition can span
const MAX_CELLS: u32 = 4;
/// How far the period may drift from nominal
const PERIOD_DRIFT: f32 = 0.1;

/// Convert flux deltas to bits
///
/// Each delta becomes `round(delta / period)` cells, clamped to 1..=4: zeros
/// for all but the last cell and a one for the transition. The period follows
/// the observed error but stays within 10% of `bitcell_ns`. Each bit carries
/// the time it covered.
pub fn flux_to_bits(deltas: &[u32], bitcell_ns: u32) -> Result<Bitstream, VoteError> {
    if deltas.is_empty() {
        return Err(VoteError::Invalid("no flux transitions".to_string()));
    }
    if bitcell_ns == 0 {
        return Err(VoteError::Invalid("bit cell time is zero".to_string()));
    }

    let nominal = bitcell_ns as f32;
    let min_period = nominal * (1.0 - PERIOD_DRIFT);
    let max_period = nominal * (1.0 + PERIOD_DRIFT);
    let mut period = nominal;

    let mut bits = Bitstream::new();
    let mut timing = Vec::with_capacity(deltas.len() * 2);

    for &delta in deltas {
        let delta_f = delta as f32;
        let cells = ((delta_f / period + 0.5) as u32).clamp(1, MAX_CELLS);

        for _ in 1..cells {
            bits.push(false);
            timing.push(bitcell_ns);
        }
        bits.push(true);
        let consumed = ((cells - 1) as f32 * period) as u32;
        timing.push(delta.saturating_sub(consumed));

        let error = delta_f - cells as f32 * period;
        period = (period + error * PERIOD_GAIN).clamp(min_period, max_period);
    }

    bits.set_timing(timing)
        .map_err(|e| VoteError::Invalid(e.to_string()))?;
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_string(bits: &Bitstream) -> String {
        (0..bits.len())
            .map(|i| if bits.get(i) == Some(true) { '1' } else { '0' })
            .collect()
    }

    #[test]
    fn test_clean_cells() {
        let bits = flux_to_bits(&[4000, 6000, 8000, 2000], 2000).unwrap();
        assert_eq!(as_string(&bits), "0100100011");
        assert_eq!(bits.timing().unwrap().len(), bits.len());
    }

    #[test]
    fn test_cell_count_clamped() {
        let bits = flux_to_bits(&[50_000, 100], 2000).unwrap();
        assert_eq!(as_string(&bits), "00011");
    }

    #[test]
    fn test_jitter_tolerated() {
        let bits = flux_to_bits(&[4100, 3900, 6150, 5800, 4050], 2000).unwrap();
        assert_eq!(as_string(&bits), "010100100101");
    }

    #[test]
    fn test_period_stays_near_nominal() {
        // A long run of slow cells must not drag the estimate past 10%
        let mut deltas = vec![2600; 500];
        deltas.push(4000);
        let bits = flux_to_bits(&deltas, 2000).unwrap();
        // 2600 / 2200 rounds to one cell, 4000 / 2200 to two
        assert!(as_string(&bits).ends_with("101"));
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(flux_to_bits(&[], 2000), Err(VoteError::Invalid(_))));
        assert!(matches!(flux_to_bits(&[4000], 0), Err(VoteError::Invalid(_))));
    }
}
