/// Revolution alignment by windowed bit agreement

use crate::bitstream::Bitstream;

/// Offsets searched either side of zero
pub const ALIGN_WINDOW: i32 = 100;
/// Bits of the reference compared at each offset
const ALIGN_COMPARE_BITS: usize = 1000;

/// Offset into `other` that best matches the start of `reference`
///
/// Every offset in `-window..=window` is scored by how many of the first
/// bits agree. The earliest offset with the top score wins.
pub fn find_offset(reference: &Bitstream, other: &Bitstream, window: i32) -> i32 {
    let compare = reference.len().min(other.len()).min(ALIGN_COMPARE_BITS);
    if compare == 0 {
        return 0;
    }

    let mut best_offset = 0;
    let mut best_score = None;
    for offset in -window..=window {
        let score = (0..compare)
            .filter(|&i| {
                let j = i as i64 + offset as i64;
                j >= 0 && (j as usize) < other.len() && reference.get(i) == other.get(j as usize)
            })
            .count();
        if best_score.map_or(true, |best| score > best) {
            best_score = Some(score);
            best_offset = offset;
        }
    }
    best_offset
}
