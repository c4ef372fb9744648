/// On-disk records of the IR file: file header, geometry block, track header and payload

use crate::error::{IrError, Result};
use crate::format::constants::*;
use crate::format::{Compression, Density, Geometry};
use crate::image::{FluxRevolution, Track};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher;
use std::io::{self, Read, Write};
use tracing::warn;

/// CRC32 (IEEE) of a byte slice
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Packed file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Packed version
    pub version: u32,
    /// Header size in bytes
    pub header_size: u32,
    /// `FLAG_*` bits
    pub flags: u32,
    /// Compression requested for the payloads
    pub compression: Compression,
    /// Total payload bytes before compression
    pub uncompressed_size: u64,
    /// Total payload bytes as stored
    pub compressed_size: u64,
    /// Number of track headers that follow the geometry block
    pub track_count: u32,
}

impl FileHeader {
    /// Encode the header, appending the CRC32 of everything before it
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FILE_HEADER_SIZE);
        out.extend_from_slice(IR_MAGIC);
        // Vec<u8> writes cannot fail
        let _ = self.write_body(&mut out);
        let crc = crc32(&out);
        out.extend_from_slice(&crc.to_le_bytes());
        out
    }

    fn write_body<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.header_size)?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(u8::from(self.compression) as u32)?;
        writer.write_all(&[0u8; 3])?;
        writer.write_u64::<LittleEndian>(self.uncompressed_size)?;
        writer.write_u64::<LittleEndian>(self.compressed_size)?;
        writer.write_u32::<LittleEndian>(self.track_count)?;
        Ok(())
    }

    /// Decode and verify a header from exactly `FILE_HEADER_SIZE` bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FILE_HEADER_SIZE || !crate::format::is_ir_file(bytes) {
            return Err(IrError::invalid_format("missing UFTIR signature"));
        }

        let mut cursor = &bytes[IR_MAGIC.len()..FILE_HEADER_SIZE];
        let version = cursor.read_u32::<LittleEndian>()?;
        if version_major(version) != IR_VERSION_MAJOR {
            return Err(IrError::UnsupportedVersion {
                found: version,
                expected_major: IR_VERSION_MAJOR,
            });
        }
        let header_size = cursor.read_u32::<LittleEndian>()?;
        let flags = cursor.read_u32::<LittleEndian>()?;
        let compression_raw = cursor.read_u32::<LittleEndian>()?;
        let mut reserved = [0u8; 3];
        cursor.read_exact(&mut reserved)?;
        let uncompressed_size = cursor.read_u64::<LittleEndian>()?;
        let compressed_size = cursor.read_u64::<LittleEndian>()?;
        let track_count = cursor.read_u32::<LittleEndian>()?;
        let stored_crc = cursor.read_u32::<LittleEndian>()?;

        let calculated = crc32(&bytes[..FILE_HEADER_SIZE - 4]);
        if stored_crc != calculated {
            return Err(IrError::Checksum {
                context: "file header".to_string(),
                stored: stored_crc,
                calculated,
            });
        }
        if (header_size as usize) < FILE_HEADER_SIZE {
            return Err(IrError::invalid_format(format!(
                "header size {} smaller than {}",
                header_size, FILE_HEADER_SIZE
            )));
        }
        let compression = Compression::from_wire(compression_raw).ok_or_else(|| {
            IrError::invalid_format(format!("unknown compression {}", compression_raw))
        })?;

        Ok(Self {
            version,
            header_size,
            flags,
            compression,
            uncompressed_size,
            compressed_size,
            track_count,
        })
    }
}

/// Write the geometry block
pub fn write_geometry<W: Write>(geometry: &Geometry, mut writer: W) -> io::Result<()> {
    writer.write_u8(geometry.cylinders)?;
    writer.write_u8(geometry.heads)?;
    writer.write_u8(geometry.sectors_per_track)?;
    writer.write_u8(geometry.sector_size_shift)?;
    writer.write_u32::<LittleEndian>(geometry.total_sectors)?;
    writer.write_u32::<LittleEndian>(geometry.rpm)?;
    writer.write_u32::<LittleEndian>(geometry.data_rate_kbps)?;
    writer.write_u8(geometry.density.into())?;
    writer.write_u8(geometry.interleave)?;
    writer.write_u8(geometry.track_skew)?;
    writer.write_u8(geometry.head_skew)?;
    Ok(())
}

/// Read the geometry block, rejecting counts past the hard maxima
pub fn read_geometry<R: Read>(mut reader: R) -> Result<Geometry> {
    let cylinders = reader.read_u8()?;
    let heads = reader.read_u8()?;
    let mut geometry = Geometry::new(cylinders, heads)
        .map_err(|e| IrError::invalid_format(format!("geometry block: {}", e)))?;
    geometry.sectors_per_track = reader.read_u8()?;
    geometry.sector_size_shift = reader.read_u8()?;
    geometry.total_sectors = reader.read_u32::<LittleEndian>()?;
    geometry.rpm = reader.read_u32::<LittleEndian>()?;
    geometry.data_rate_kbps = reader.read_u32::<LittleEndian>()?;
    geometry.density = Density::from(reader.read_u8()?);
    geometry.interleave = reader.read_u8()?;
    geometry.track_skew = reader.read_u8()?;
    geometry.head_skew = reader.read_u8()?;
    Ok(geometry)
}

/// Packed per-track header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackHeader {
    /// Cylinder
    pub cylinder: u8,
    /// Head
    pub head: u8,
    /// Track flags
    pub flags: u16,
    /// File offset of the payload
    pub data_offset: u32,
    /// Payload size as stored
    pub data_size: u32,
    /// Payload size before compression
    pub uncompressed_size: u32,
    /// Revolutions in the payload
    pub revolution_count: u8,
    /// Encoding wire value
    pub encoding: u8,
    /// Quality wire value
    pub quality: u8,
    /// Compression actually applied to this payload
    pub compression: u8,
    /// CRC32 of the stored payload (0 = not recorded)
    pub crc32: u32,
}

impl TrackHeader {
    /// Write the header
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u8(self.cylinder)?;
        writer.write_u8(self.head)?;
        writer.write_u16::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.data_offset)?;
        writer.write_u32::<LittleEndian>(self.data_size)?;
        writer.write_u32::<LittleEndian>(self.uncompressed_size)?;
        writer.write_u8(self.revolution_count)?;
        writer.write_u8(self.encoding)?;
        writer.write_u8(self.quality)?;
        writer.write_u8(self.compression)?;
        writer.write_u32::<LittleEndian>(self.crc32)?;
        Ok(())
    }

    /// Read a header
    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        Ok(Self {
            cylinder: reader.read_u8()?,
            head: reader.read_u8()?,
            flags: reader.read_u16::<LittleEndian>()?,
            data_offset: reader.read_u32::<LittleEndian>()?,
            data_size: reader.read_u32::<LittleEndian>()?,
            uncompressed_size: reader.read_u32::<LittleEndian>()?,
            revolution_count: reader.read_u8()?,
            encoding: reader.read_u8()?,
            quality: reader.read_u8()?,
            compression: reader.read_u8()?,
            crc32: reader.read_u32::<LittleEndian>()?,
        })
    }

    /// Reject sizes no valid track can have before any payload is allocated
    pub fn check_limits(&self) -> Result<()> {
        if self.revolution_count as usize > MAX_REVOLUTIONS {
            return Err(IrError::invalid_format(format!(
                "track {}.{} declares {} revolutions (max: {})",
                self.cylinder, self.head, self.revolution_count, MAX_REVOLUTIONS
            )));
        }
        if self.uncompressed_size as usize > max_payload_size() {
            return Err(IrError::invalid_format(format!(
                "track {}.{} payload of {} bytes exceeds {}",
                self.cylinder,
                self.head,
                self.uncompressed_size,
                max_payload_size()
            )));
        }
        Ok(())
    }
}

/// Largest uncompressed payload a track can have
pub fn max_payload_size() -> usize {
    MAX_REVOLUTIONS * 4 + MAX_REVOLUTIONS * MAX_FLUX_PER_REVOLUTION * 4
}

/// Encode a track's revolutions as little-endian u32 deltas, optionally behind a count table
pub fn encode_payload(track: &Track, revolution_table: bool) -> Vec<u8> {
    let flux_total: usize = track.revolutions().iter().map(|r| r.flux_count()).sum();
    let mut out = Vec::with_capacity(track.revolution_count() * 4 + flux_total * 4);
    if revolution_table {
        for revolution in track.revolutions() {
            out.extend_from_slice(&(revolution.flux_count() as u32).to_le_bytes());
        }
    }
    for revolution in track.revolutions() {
        for &delta in revolution.deltas() {
            out.extend_from_slice(&delta.to_le_bytes());
        }
    }
    out
}

fn read_deltas(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Split a payload back into revolutions
///
/// With a count table each revolution gets its recorded length. Without one
/// the flux is shared out evenly over the remaining revolutions. Revolutions
/// the payload cannot fill are left out.
pub fn decode_payload(
    payload: &[u8],
    revolution_count: usize,
    revolution_table: bool,
    position: (u8, u8),
) -> Result<Vec<FluxRevolution>> {
    let (counts, flux) = if revolution_table {
        let table_len = revolution_count * 4;
        if payload.len() < table_len {
            return Err(IrError::corrupt(
                payload.len() as u64,
                format!(
                    "track {}.{} payload shorter than its revolution table",
                    position.0, position.1
                ),
            ));
        }
        let counts: Vec<usize> = read_deltas(&payload[..table_len])
            .into_iter()
            .map(|c| c as usize)
            .collect();
        (Some(counts), &payload[table_len..])
    } else {
        (None, payload)
    };

    let deltas = read_deltas(flux);
    let mut revolutions = Vec::with_capacity(revolution_count);
    let mut cursor = 0;
    for index in 0..revolution_count {
        let remaining = deltas.len() - cursor;
        let count = match &counts {
            Some(counts) => counts[index],
            None => remaining / (revolution_count - index),
        };
        // A recorded zero is an empty revolution, not a missing one
        if count == 0 && counts.is_some() {
            revolutions.push(FluxRevolution::new());
            continue;
        }
        if count == 0 || count > remaining {
            warn!(
                "track {}.{}: revolution {} missing from payload ({} of {} transitions present)",
                position.0,
                position.1,
                index,
                remaining.min(count),
                count
            );
            break;
        }
        if count > MAX_FLUX_PER_REVOLUTION {
            return Err(IrError::corrupt(
                (cursor * 4) as u64,
                format!(
                    "track {}.{} revolution {} has {} transitions (max: {})",
                    position.0, position.1, index, count, MAX_FLUX_PER_REVOLUTION
                ),
            ));
        }
        revolutions.push(FluxRevolution::from_deltas(
            deltas[cursor..cursor + count].to_vec(),
        )?);
        cursor += count;
    }
    Ok(revolutions)
}
