/// IR file reader

use crate::error::{IrError, Result};
use crate::format::constants::*;
use crate::format::Compression;
use crate::image::{Disk, Encoding, Metadata, Track, TrackFlags, TrackQuality};
use crate::io::compress::decompress;
use crate::io::layout::{self, FileHeader, TrackHeader};
use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};

/// Load a disk from an IR file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Disk> {
    let path = path.as_ref();
    let disk = read_disk(BufReader::new(File::open(path)?))?;
    debug!("loaded {} tracks from {}", disk.track_count(), path.display());
    Ok(disk)
}

/// Read a disk from an IR stream
///
/// The header is verified before anything is allocated from its counts.
pub fn read_disk<R: Read + Seek>(mut reader: R) -> Result<Disk> {
    let mut header_bytes = [0u8; FILE_HEADER_SIZE];
    reader.read_exact(&mut header_bytes)?;
    let header = FileHeader::from_bytes(&header_bytes)?;

    if header.track_count as usize > MAX_TRACKS {
        return Err(IrError::invalid_format(format!(
            "{} tracks declared (max: {})",
            header.track_count, MAX_TRACKS
        )));
    }
    if header.header_size as usize > FILE_HEADER_SIZE {
        reader.seek(SeekFrom::Start(header.header_size as u64))?;
    }

    let geometry = layout::read_geometry(&mut reader)?;
    let mut track_headers = Vec::with_capacity(header.track_count as usize);
    for _ in 0..header.track_count {
        let track_header = TrackHeader::read(&mut reader)?;
        track_header.check_limits()?;
        track_headers.push(track_header);
    }

    let file_len = reader.seek(SeekFrom::End(0))?;
    let revolution_table = header.flags & FLAG_REVOLUTION_TABLE != 0;
    let mut disk = Disk::from_geometry(geometry);
    let mut payload_end = header.header_size as u64
        + GEOMETRY_BLOCK_SIZE as u64
        + header.track_count as u64 * TRACK_HEADER_SIZE as u64;

    for track_header in &track_headers {
        let start = track_header.data_offset as u64;
        let end = start + track_header.data_size as u64;
        if end > file_len {
            return Err(IrError::corrupt(
                start,
                format!(
                    "track {}.{} payload ends at {} past end of file ({})",
                    track_header.cylinder, track_header.head, end, file_len
                ),
            ));
        }
        payload_end = payload_end.max(end);

        let mut stored = vec![0u8; track_header.data_size as usize];
        reader.seek(SeekFrom::Start(start))?;
        reader.read_exact(&mut stored)?;

        let track = build_track(track_header, &stored, revolution_table)?;
        debug!(
            "track {}.{}: {} revolutions",
            track.cylinder,
            track.head,
            track.revolution_count()
        );
        disk.add_track(track)?;
    }

    if header.flags & FLAG_METADATA != 0 {
        reader.seek(SeekFrom::Start(payload_end))?;
        disk.metadata = read_metadata(&mut reader, payload_end)?;
    }

    Ok(disk)
}

fn read_metadata<R: Read>(mut reader: R, offset: u64) -> Result<Metadata> {
    let len = reader.read_u32::<LittleEndian>()? as usize;
    let mut block = Vec::new();
    reader.take(len as u64).read_to_end(&mut block)?;
    if block.len() != len {
        return Err(IrError::corrupt(offset, "truncated metadata block"));
    }
    serde_json::from_slice(&block)
        .map_err(|e| IrError::corrupt(offset + 4, format!("metadata block: {}", e)))
}

/// Verify, expand and split one stored payload into a track
fn build_track(header: &TrackHeader, stored: &[u8], revolution_table: bool) -> Result<Track> {
    let position = (header.cylinder, header.head);
    if header.crc32 != 0 {
        let calculated = layout::crc32(stored);
        if calculated != header.crc32 {
            return Err(IrError::Checksum {
                context: format!("track {}.{}", header.cylinder, header.head),
                stored: header.crc32,
                calculated,
            });
        }
    }

    let compression = Compression::from_wire(header.compression as u32).ok_or_else(|| {
        IrError::invalid_format(format!(
            "track {}.{} has unknown compression {}",
            header.cylinder, header.head, header.compression
        ))
    })?;
    let payload = decompress(stored, compression, header.uncompressed_size as usize)?;

    let mut track = Track::new(header.cylinder, header.head)
        .map_err(|e| IrError::invalid_format(format!("track header: {}", e)))?;
    track.flags = TrackFlags(header.flags);
    track.encoding = Encoding::from(header.encoding);
    track.quality = TrackQuality::from(header.quality);

    let revolutions = layout::decode_payload(
        &payload,
        header.revolution_count as usize,
        revolution_table,
        position,
    )?;
    if revolutions.len() < header.revolution_count as usize {
        warn!(
            "track {}.{}: {} of {} revolutions recovered",
            header.cylinder,
            header.head,
            revolutions.len(),
            header.revolution_count
        );
    }
    for revolution in revolutions {
        track.add_revolution(revolution)?;
    }
    Ok(track)
}

/// Decode a buffer produced by `serialize_track`
pub fn deserialize_track(buffer: &[u8]) -> Result<Track> {
    if buffer.len() < TRACK_HEADER_SIZE {
        return Err(IrError::corrupt(0, "buffer shorter than a track header"));
    }
    let header = TrackHeader::read(buffer)?;
    header.check_limits()?;

    let start = header.data_offset as usize;
    let end = start + header.data_size as usize;
    if start < TRACK_HEADER_SIZE || end > buffer.len() {
        return Err(IrError::corrupt(
            start as u64,
            format!("payload {}..{} outside {} byte buffer", start, end, buffer.len()),
        ));
    }
    build_track(&header, &buffer[start..end], true)
}
