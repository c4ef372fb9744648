/// Flux statistics, encoding detection and quality scoring

use crate::error::{IrError, Result};
use crate::format::constants::HISTOGRAM_BUCKETS;
use crate::image::{Encoding, FluxStats, Track, TrackFlags, TrackQuality};

/// Minimum transitions before encoding detection is attempted
const MIN_DETECT_TRANSITIONS: u32 = 100;

/// Compute statistics over a set of flux deltas
///
/// One pass collects sum, extremes and the 1 µs histogram. A second pass
/// accumulates the variance. The clock period is the centre of the fullest
/// histogram bucket past bucket 0.
pub fn flux_stats(deltas: &[u32]) -> Result<FluxStats> {
    if deltas.is_empty() {
        return Err(IrError::invalid("no flux deltas"));
    }

    let mut stats = FluxStats {
        min_delta_ns: u32::MAX,
        ..FluxStats::default()
    };
    let mut sum: u64 = 0;
    for &delta in deltas {
        sum += delta as u64;
        stats.min_delta_ns = stats.min_delta_ns.min(delta);
        stats.max_delta_ns = stats.max_delta_ns.max(delta);
        let bucket = (delta / 1000) as usize;
        if bucket < HISTOGRAM_BUCKETS {
            stats.histogram[bucket] = stats.histogram[bucket].saturating_add(1);
        }
    }

    let count = deltas.len() as u64;
    stats.total_transitions = deltas.len() as u32;
    stats.mean_delta_ns = (sum / count) as u32;
    stats.index_to_index_ns = sum;

    let mean = sum as f64 / count as f64;
    let variance = deltas
        .iter()
        .map(|&d| {
            let diff = d as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / count as f64;
    stats.stddev_delta_ns = variance.sqrt() as u32;

    let mut peak = 0;
    let mut peak_count = 0;
    for (bucket, &hits) in stats.histogram.iter().enumerate().skip(1) {
        if hits > peak_count {
            peak_count = hits;
            peak = bucket;
        }
    }
    stats.clock_period_ns = peak as u32 * 1000 + 500;

    Ok(stats)
}

/// Guess the encoding from a delta histogram
///
/// Looks at the 2-9 µs buckets only. Returns the encoding and a confidence
/// 0-100. This is a heuristic: MFM shows peaks at 4/6/8 µs, GCR is dense at
/// 3-4 µs and FM is dominated by 8 µs.
pub fn detect_encoding(stats: &FluxStats) -> (Encoding, u8) {
    if stats.total_transitions < MIN_DETECT_TRANSITIONS {
        return (Encoding::Unknown, 0);
    }

    let buckets = &stats.histogram[2..10];
    let total: u32 = buckets.iter().map(|&b| b as u32).sum();
    if total == 0 {
        return (Encoding::Unknown, 0);
    }
    let pct = |index: usize| buckets[index] as u32 * 100 / total;

    let pct3 = pct(1);
    let pct4 = pct(2);
    let pct6 = pct(4);
    let pct8 = pct(6);

    if pct4 > 20 && pct6 > 15 && pct8 > 5 {
        (Encoding::Mfm, 80)
    } else if pct3 > 30 || pct4 > 40 {
        (Encoding::GcrCommodore, 60)
    } else if pct8 > 30 {
        (Encoding::Fm, 50)
    } else {
        (Encoding::Unknown, 20)
    }
}

/// Quality score 0-100 for a track
///
/// Starts at 100 and deducts 10 per missing sector, 15 per sector with a bad
/// CRC, 5 for weak bits and 20 for an incomplete read. A fused track earns 5
/// back, capped at 100.
pub fn quality_score(track: &Track) -> u8 {
    let summary = track.sector_summary();
    let missing = summary.expected.saturating_sub(summary.found) as i32;
    let bad = summary.found.saturating_sub(summary.good) as i32;

    let mut score: i32 = 100;
    score -= missing * 10;
    score -= bad * 15;
    if track.flags.contains(TrackFlags::WEAK_BITS) {
        score -= 5;
    }
    if track.flags.contains(TrackFlags::INCOMPLETE) {
        score -= 20;
    }
    if track.flags.contains(TrackFlags::MULTI_REV_FUSED) {
        score = (score + 5).min(100);
    }
    score.clamp(0, 100) as u8
}

/// Map a quality score to its class
pub fn quality_from_score(score: u8) -> TrackQuality {
    match score {
        95.. => TrackQuality::Perfect,
        80..=94 => TrackQuality::Good,
        60..=79 => TrackQuality::Degraded,
        40..=59 => TrackQuality::Marginal,
        1..=39 => TrackQuality::Bad,
        0 => TrackQuality::Unreadable,
    }
}

/// Nominal bit-cell time for an encoding at a rotation speed (0 = 300 rpm)
pub fn nominal_bitcell_ns(encoding: Encoding, rpm: u32) -> u32 {
    let base = match encoding {
        Encoding::Fm => 4000,
        Encoding::Mfm | Encoding::AmigaMfm | Encoding::M2fm => 2000,
        Encoding::GcrCommodore => 3200,
        Encoding::GcrApple => 4000,
        Encoding::GcrApple35 => 2000,
        Encoding::GcrVictor => 1667,
        _ => 2000,
    };
    let rpm = if rpm == 0 { 300 } else { rpm };
    (base as u64 * 300 / rpm as u64) as u32
}

/// Convert sample-clock ticks to nanoseconds
pub fn ticks_to_ns(ticks: u64, sample_rate_hz: u32) -> u64 {
    if sample_rate_hz == 0 {
        return 0;
    }
    (ticks as u128 * 1_000_000_000 / sample_rate_hz as u128) as u64
}

/// Convert nanoseconds to sample-clock ticks
pub fn ns_to_ticks(ns: u64, sample_rate_hz: u32) -> u64 {
    (ns as u128 * sample_rate_hz as u128 / 1_000_000_000) as u64
}

/// Rotation speed in rpm x 100 for a revolution duration
pub fn duration_to_rpm(duration_ns: u64) -> u32 {
    if duration_ns == 0 {
        return 0;
    }
    (60_000_000_000u64 * 100 / duration_ns) as u32
}
