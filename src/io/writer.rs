/// IR file writer

use crate::error::{IrError, Result};
use crate::format::constants::*;
use crate::format::Compression;
use crate::image::{Disk, Track};
use crate::io::compress::compress;
use crate::io::layout::{self, FileHeader, TrackHeader};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Options controlling how a disk is written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Compression applied to each track payload
    pub compression: Compression,
    /// Prefix each payload with per-revolution flux counts
    pub revolution_table: bool,
    /// Append the disk metadata as a JSON block
    pub metadata: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            compression: Compression::None,
            revolution_table: true,
            metadata: true,
        }
    }
}

impl SaveOptions {
    /// Default options with the given compression
    pub fn with_compression(compression: Compression) -> Self {
        Self {
            compression,
            ..Self::default()
        }
    }
}

struct EncodedTrack {
    header: TrackHeader,
    stored: Vec<u8>,
}

fn to_u32(value: usize, what: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| IrError::Overflow {
        what,
        limit: u32::MAX as usize,
    })
}

fn encode_track(track: &Track, options: &SaveOptions) -> Result<EncodedTrack> {
    let payload = layout::encode_payload(track, options.revolution_table);
    let (stored, used) = compress(&payload, options.compression)?;
    let header = TrackHeader {
        cylinder: track.cylinder,
        head: track.head,
        flags: track.flags.0,
        data_offset: 0,
        data_size: to_u32(stored.len(), "track payload")?,
        uncompressed_size: to_u32(payload.len(), "track payload")?,
        revolution_count: track.revolution_count() as u8,
        encoding: track.encoding.into(),
        quality: track.quality.into(),
        compression: used.into(),
        crc32: layout::crc32(&stored),
    };
    debug!(
        "track {}.{}: {} revolutions, {} -> {} bytes ({})",
        track.cylinder,
        track.head,
        track.revolution_count(),
        payload.len(),
        stored.len(),
        used.name()
    );
    Ok(EncodedTrack { header, stored })
}

/// Save a disk to an IR file
pub fn save<P: AsRef<Path>>(disk: &Disk, path: P, options: &SaveOptions) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    let written = write_disk(disk, &mut writer, options)?;
    writer.flush()?;
    debug!("saved {} tracks to {} ({} bytes)", disk.track_count(), path.display(), written);
    Ok(())
}

/// Write a disk as an IR stream, returning the number of bytes written
///
/// All payloads are encoded first so that every offset is known before the
/// header is written. The stream is then written front to back.
pub fn write_disk<W: Write>(disk: &Disk, mut writer: W, options: &SaveOptions) -> Result<u64> {
    let mut tracks = disk
        .tracks()
        .iter()
        .map(|track| encode_track(track, options))
        .collect::<Result<Vec<_>>>()?;

    let index_size = FILE_HEADER_SIZE + GEOMETRY_BLOCK_SIZE + tracks.len() * TRACK_HEADER_SIZE;
    let mut offset = index_size;
    let mut uncompressed_size = 0u64;
    let mut compressed_size = 0u64;
    for track in tracks.iter_mut() {
        track.header.data_offset = to_u32(offset, "file size")?;
        offset += track.stored.len();
        uncompressed_size += track.header.uncompressed_size as u64;
        compressed_size += track.header.data_size as u64;
    }

    let metadata = if options.metadata {
        Some(
            serde_json::to_vec(&disk.metadata)
                .map_err(|e| IrError::invalid(format!("metadata: {}", e)))?,
        )
    } else {
        None
    };

    let mut flags = 0;
    if options.revolution_table {
        flags |= FLAG_REVOLUTION_TABLE;
    }
    if metadata.is_some() {
        flags |= FLAG_METADATA;
    }

    let header = FileHeader {
        version: IR_VERSION,
        header_size: FILE_HEADER_SIZE as u32,
        flags,
        compression: options.compression,
        uncompressed_size,
        compressed_size,
        track_count: tracks.len() as u32,
    };

    writer.write_all(&header.to_bytes())?;
    layout::write_geometry(&disk.geometry, &mut writer)?;
    for track in &tracks {
        track.header.write(&mut writer)?;
    }
    for track in &tracks {
        writer.write_all(&track.stored)?;
    }

    let mut written = offset as u64;
    if let Some(block) = metadata {
        writer.write_all(&to_u32(block.len(), "metadata")?.to_le_bytes())?;
        writer.write_all(&block)?;
        written += 4 + block.len() as u64;
    }
    Ok(written)
}

/// Encode one track into a self-contained buffer
///
/// The buffer is a track header followed by the payload. The header's data
/// offset is the payload's position within the buffer.
pub fn serialize_track(track: &Track, compression: Compression) -> Result<Vec<u8>> {
    let options = SaveOptions {
        compression,
        revolution_table: true,
        metadata: false,
    };
    let mut encoded = encode_track(track, &options)?;
    encoded.header.data_offset = TRACK_HEADER_SIZE as u32;

    let mut out = Vec::with_capacity(TRACK_HEADER_SIZE + encoded.stored.len());
    encoded.header.write(&mut out)?;
    out.extend_from_slice(&encoded.stored);
    Ok(out)
}
