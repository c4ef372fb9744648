/// Track payload compression

use crate::error::{IrError, Result};
use crate::format::Compression;
use tracing::warn;

/// Escape byte introducing a run or a literal 0xFF
const RLE_ESCAPE: u8 = 0xFF;
/// Shortest run worth encoding
const RLE_MIN_RUN: usize = 3;
/// Longest run a single token can carry (count - 1 must fit a byte)
const RLE_MAX_RUN: usize = 256;
/// Zstandard level used for track payloads
const ZSTD_LEVEL: i32 = 3;

/// Run-length encode a buffer
///
/// Runs of three or more bytes become `FF, len-1, byte`. A lone 0xFF becomes
/// `FF, 00`. All other bytes pass through.
pub fn rle_encode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        let byte = input[i];
        let mut run = 1;
        while i + run < input.len() && input[i + run] == byte && run < RLE_MAX_RUN {
            run += 1;
        }

        if run >= RLE_MIN_RUN {
            out.push(RLE_ESCAPE);
            out.push((run - 1) as u8);
            out.push(byte);
        } else {
            for _ in 0..run {
                if byte == RLE_ESCAPE {
                    out.push(RLE_ESCAPE);
                    out.push(0);
                } else {
                    out.push(byte);
                }
            }
        }
        i += run;
    }
    out
}

/// Expand a run-length encoded buffer to exactly `expected_len` bytes
pub fn rle_decode(input: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    let mut i = 0;
    while i < input.len() {
        let byte = input[i];
        if byte != RLE_ESCAPE {
            out.push(byte);
            i += 1;
        } else {
            let count = *input
                .get(i + 1)
                .ok_or_else(|| IrError::Compression("escape at end of RLE data".into()))?;
            if count == 0 {
                out.push(RLE_ESCAPE);
                i += 2;
            } else {
                let value = *input
                    .get(i + 2)
                    .ok_or_else(|| IrError::Compression("truncated RLE run".into()))?;
                let run = count as usize + 1;
                if out.len() + run > expected_len {
                    return Err(IrError::Compression(
                        "RLE data expands past declared size".into(),
                    ));
                }
                out.resize(out.len() + run, value);
                i += 3;
            }
        }
        if out.len() > expected_len {
            return Err(IrError::Compression(
                "RLE data expands past declared size".into(),
            ));
        }
    }
    if out.len() != expected_len {
        return Err(IrError::Compression(format!(
            "RLE data expands to {} bytes, expected {}",
            out.len(),
            expected_len
        )));
    }
    Ok(out)
}

/// Replace each byte after the first with its difference from the previous byte
pub fn delta_encode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut previous = 0u8;
    for (i, &byte) in input.iter().enumerate() {
        out.push(if i == 0 { byte } else { byte.wrapping_sub(previous) });
        previous = byte;
    }
    out
}

/// Undo `delta_encode` in place with a running sum
pub fn delta_decode(data: &mut [u8]) {
    for i in 1..data.len() {
        data[i] = data[i].wrapping_add(data[i - 1]);
    }
}

/// Compress a payload, returning the stored bytes and the scheme actually used
///
/// The raw bytes are kept whenever a scheme does not make the payload smaller.
pub fn compress(data: &[u8], compression: Compression) -> Result<(Vec<u8>, Compression)> {
    let packed = match compression {
        Compression::None => None,
        Compression::Rle => Some(rle_encode(data)),
        Compression::Delta => Some(rle_encode(&delta_encode(data))),
        Compression::Zstd => Some(
            zstd::encode_all(data, ZSTD_LEVEL).map_err(|e| IrError::Compression(e.to_string()))?,
        ),
        Compression::Lz4 => Some(lz4_flex::compress_prepend_size(data)),
        Compression::Zlib => {
            warn!("zlib compression is not available, storing track uncompressed");
            None
        }
    };

    match packed {
        Some(bytes) if bytes.len() < data.len() => Ok((bytes, compression)),
        _ => Ok((data.to_vec(), Compression::None)),
    }
}

/// Expand a stored payload back to `uncompressed_len` bytes
pub fn decompress(data: &[u8], compression: Compression, uncompressed_len: usize) -> Result<Vec<u8>> {
    let out = match compression {
        Compression::None => data.to_vec(),
        Compression::Rle => rle_decode(data, uncompressed_len)?,
        Compression::Delta => {
            let mut out = rle_decode(data, uncompressed_len)?;
            delta_decode(&mut out);
            out
        }
        // Output is capped at the declared length before anything is expanded
        Compression::Zstd => zstd::bulk::decompress(data, uncompressed_len)
            .map_err(|e| IrError::Compression(format!("zstd: {}", e)))?,
        Compression::Lz4 => {
            let (prefix, block) = data.split_first_chunk::<4>().ok_or_else(|| {
                IrError::Compression("lz4 payload shorter than its size prefix".into())
            })?;
            let declared = u32::from_le_bytes(*prefix) as usize;
            if declared != uncompressed_len {
                return Err(IrError::Compression(format!(
                    "lz4 payload declares {} bytes, expected {}",
                    declared, uncompressed_len
                )));
            }
            lz4_flex::decompress(block, uncompressed_len)
                .map_err(|e| IrError::Compression(format!("lz4: {}", e)))?
        }
        Compression::Zlib => {
            return Err(IrError::Compression("zlib payloads are not supported".into()))
        }
    };

    if out.len() != uncompressed_len {
        return Err(IrError::Compression(format!(
            "{} payload expands to {} bytes, expected {}",
            compression.name(),
            out.len(),
            uncompressed_len
        )));
    }
    Ok(out)
}
