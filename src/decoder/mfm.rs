/// IBM System 34 MFM codec
///
/// Sectors are found by three consecutive 0x4489 sync words (0xA1 with a
/// missing clock) followed by an address mark. Every field's CRC-16/CCITT
/// starts at 0xFFFF and covers the mark byte and the field. A sector whose CRC
/// fails is kept and marked invalid.

use super::crc::crc16_ccitt;
use super::{Capabilities, DecodedTrack, TrackDecoder};
use crate::bitstream::Bitstream;
use crate::error::DecodeError;
use crate::image::{Encoding, Sector, SectorId};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Raw sync word: 0xA1 with its clock bit missing
pub const SYNC_WORD: u32 = 0x4489;
/// Raw index sync word: 0xC2 with its clock bit missing
const INDEX_SYNC_WORD: u32 = 0x5224;
/// Sync words before every mark
pub const SYNC_COUNT: usize = 3;
/// ID address mark
pub const IDAM: u8 = 0xFE;
/// Data address mark
pub const DAM: u8 = 0xFB;
/// Deleted data address mark
pub const DDAM: u8 = 0xF8;
/// Index address mark
const IAM: u8 = 0xFC;

const SYNC_BITS: usize = 16 * SYNC_COUNT;
/// Sync searches made when detecting
const DETECT_SEARCHES: usize = 20;
/// Bits skipped after each detected sync
const DETECT_SKIP: usize = 100;
/// How far past the ID field the data field may start
const DATA_SEARCH_BITS: usize = 1000;
/// Most sectors taken from one track
const MAX_SECTORS: usize = 32;

const GAP_BYTE: u8 = 0x4E;
const GAP4A: usize = 80;
const GAP1: usize = 50;
const GAP2: usize = 22;
const GAP3: usize = 54;
const GAP4B: usize = 200;
const SYNC_ZEROS: usize = 12;

/// Position just past the next run of sync words at or after `start`
pub fn find_sync(bits: &Bitstream, start: usize) -> Option<usize> {
    let last = bits.len().checked_sub(SYNC_BITS)?;
    (start..=last)
        .find(|&p| (0..SYNC_COUNT).all(|k| bits.read_bits(p + 16 * k, 16) == Some(SYNC_WORD)))
        .map(|p| p + SYNC_BITS)
}

/// Data bits of one MFM byte cell at `offset`
pub fn decode_byte(bits: &Bitstream, offset: usize) -> Option<u8> {
    let raw = bits.read_bits(offset, 16)?;
    let mut byte = 0u8;
    for i in 0..8 {
        if raw & (1 << (14 - 2 * i)) != 0 {
            byte |= 0x80 >> i;
        }
    }
    Some(byte)
}

fn read_bytes(bits: &Bitstream, offset: usize, count: usize) -> Option<Vec<u8>> {
    (0..count).map(|i| decode_byte(bits, offset + i * 16)).collect()
}

/// Writes data bytes with MFM clocking
struct MfmWriter {
    bits: Bitstream,
    last: bool,
}

impl MfmWriter {
    fn new() -> Self {
        Self {
            bits: Bitstream::new(),
            last: false,
        }
    }

    fn byte(&mut self, value: u8) {
        for shift in (0..8).rev() {
            let data = (value >> shift) & 1 != 0;
            self.bits.push(!self.last && !data);
            self.bits.push(data);
            self.last = data;
        }
    }

    fn bytes(&mut self, values: &[u8]) {
        for &value in values {
            self.byte(value);
        }
    }

    fn fill(&mut self, value: u8, count: usize) {
        for _ in 0..count {
            self.byte(value);
        }
    }

    /// Three raw words with a missing clock; `last` is their final data bit
    fn marker(&mut self, word: u32, last: bool) {
        for _ in 0..SYNC_COUNT {
            self.bits.push_bits(word, 16);
        }
        self.last = last;
    }
}

/// Reference IBM MFM decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct MfmDecoder;

impl MfmDecoder {
    /// Create the decoder
    pub fn new() -> Self {
        Self
    }

    fn header_only(id: SectorId, header_ok: bool, start_bit: usize, end_bit: usize) -> Sector {
        let mut sector = Sector::header_only(id, header_ok);
        sector.id_bit_offset = start_bit;
        sector.end_bit_offset = end_bit;
        sector
    }
}

impl TrackDecoder for MfmDecoder {
    fn encoding(&self) -> Encoding {
        Encoding::Mfm
    }

    fn name(&self) -> &'static str {
        "IBM MFM"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities(
            Capabilities::ENCODE
                | Capabilities::MULTI_REV
                | Capabilities::TIMING
                | Capabilities::WEAK_BITS,
        )
    }

    fn expected_sectors(&self, _cylinder: u8, _head: u8) -> u8 {
        9
    }

    fn sector_size(&self) -> usize {
        512
    }

    fn detect(&self, bits: &Bitstream) -> Result<f32, DecodeError> {
        let mut found = 0;
        let mut position = 0;
        for _ in 0..DETECT_SEARCHES {
            match find_sync(bits, position) {
                Some(end) => {
                    found += 1;
                    position = end + DETECT_SKIP;
                }
                None => break,
            }
        }
        Ok(match found {
            5.. => 0.9,
            3..=4 => 0.7,
            1..=2 => 0.4,
            _ => 0.0,
        })
    }

    fn decode(&self, bits: &Bitstream) -> Result<DecodedTrack, DecodeError> {
        let mut sectors = Vec::new();
        let mut syncs = 0;
        let mut position = 0;

        while sectors.len() < MAX_SECTORS {
            let Some(sync_end) = find_sync(bits, position) else {
                break;
            };
            syncs += 1;
            position = sync_end;
            let Some(mark) = decode_byte(bits, position) else {
                break;
            };
            position += 16;
            if mark != IDAM {
                continue;
            }

            let start_bit = sync_end - SYNC_BITS;
            let Some(header) = read_bytes(bits, position, 6) else {
                break;
            };
            position += 6 * 16;

            let id = SectorId::new(header[0], header[1], header[2], header[3]);
            let header_crc = crc16_ccitt(&[IDAM, header[0], header[1], header[2], header[3]]);
            let header_ok = header_crc == u16::from_be_bytes([header[4], header[5]]);
            if !header_ok {
                warn!("{}: ID field CRC error at bit {}", id, start_bit);
            }

            let data_sync = find_sync(bits, position).filter(|&p| p <= position + DATA_SEARCH_BITS);
            let Some(data_sync) = data_sync else {
                sectors.push(Self::header_only(id, header_ok, start_bit, position));
                continue;
            };
            let data_mark = decode_byte(bits, data_sync);
            if !matches!(data_mark, Some(DAM) | Some(DDAM)) {
                sectors.push(Self::header_only(id, header_ok, start_bit, position));
                continue;
            }
            let Some(size) = id.size_bytes() else {
                sectors.push(Self::header_only(id, header_ok, start_bit, position));
                continue;
            };

            let data_start = data_sync + 16;
            let Some(field) = read_bytes(bits, data_start, size + 2) else {
                warn!("{}: data field truncated at bit {}", id, bits.len());
                sectors.push(Self::header_only(id, header_ok, start_bit, bits.len()));
                break;
            };
            position = data_start + (size + 2) * 16;

            let mark = if data_mark == Some(DDAM) { DDAM } else { DAM };
            let mut covered = Vec::with_capacity(size + 1);
            covered.push(mark);
            covered.extend_from_slice(&field[..size]);
            let stored_crc = u16::from_be_bytes([field[size], field[size + 1]]);

            let mut sector = Sector::with_crc(id, field[..size].to_vec(), stored_crc, crc16_ccitt(&covered));
            sector.header_crc_ok = header_ok;
            sector.deleted = mark == DDAM;
            sector.confidence = if sector.crc_valid() { 1.0 } else { 0.5 };
            sector.id_bit_offset = start_bit;
            sector.data_bit_offset = Some(data_sync - SYNC_BITS);
            sector.end_bit_offset = position;
            if header_ok && !sector.crc_valid() {
                warn!("{}: data field CRC error", id);
            }
            sectors.push(sector);
        }

        if sectors.is_empty() {
            return Err(if syncs == 0 {
                DecodeError::SyncNotFound
            } else {
                DecodeError::DecodeFailed("no ID fields found".to_string())
            });
        }
        debug!(
            "MFM track {}.{}: {} sectors",
            bits.cylinder,
            bits.head,
            sectors.len()
        );
        Ok(DecodedTrack {
            cylinder: bits.cylinder,
            head: bits.head,
            encoding: Encoding::Mfm,
            detection_confidence: 0.0,
            sectors_expected: self.expected_sectors(bits.cylinder, bits.head),
            sectors,
        })
    }

    fn decode_multi(&self, revolutions: &[Bitstream]) -> Result<DecodedTrack, DecodeError> {
        let mut merged: Option<DecodedTrack> = None;
        let mut slots: HashMap<SectorId, usize> = HashMap::new();
        let mut last_error = DecodeError::InvalidArgument("no revolutions".to_string());

        for bits in revolutions {
            let decoded = match self.decode(bits) {
                Ok(decoded) => decoded,
                Err(e) => {
                    last_error = e;
                    continue;
                }
            };
            let target = merged.get_or_insert_with(|| DecodedTrack {
                sectors: Vec::new(),
                ..decoded.clone()
            });
            for sector in decoded.sectors {
                match slots.get(&sector.id) {
                    Some(&slot) => {
                        if !target.sectors[slot].crc_valid() && sector.crc_valid() {
                            target.sectors[slot] = sector;
                        }
                    }
                    None => {
                        slots.insert(sector.id, target.sectors.len());
                        target.sectors.push(sector);
                    }
                }
            }
        }
        merged.ok_or(last_error)
    }

    fn encode(&self, track: &DecodedTrack) -> Result<Bitstream, DecodeError> {
        let mut writer = MfmWriter::new();
        writer.fill(GAP_BYTE, GAP4A);
        writer.fill(0x00, SYNC_ZEROS);
        writer.marker(INDEX_SYNC_WORD, false);
        writer.byte(IAM);
        writer.fill(GAP_BYTE, GAP1);

        for sector in &track.sectors {
            let id = sector.id;
            let header = [IDAM, id.cylinder, id.head, id.record, id.size_code];
            writer.fill(0x00, SYNC_ZEROS);
            writer.marker(SYNC_WORD, true);
            writer.bytes(&header);
            writer.bytes(&crc16_ccitt(&header).to_be_bytes());
            writer.fill(GAP_BYTE, GAP2);

            if sector.data_found {
                let size = id.size_bytes().ok_or_else(|| {
                    DecodeError::EncodeFailed(format!("{}: invalid size code", id))
                })?;
                if sector.data().len() != size {
                    return Err(DecodeError::EncodeFailed(format!(
                        "{}: {} bytes of data for a {} byte sector",
                        id,
                        sector.data().len(),
                        size
                    )));
                }
                let mark = if sector.deleted { DDAM } else { DAM };
                let mut covered = Vec::with_capacity(size + 1);
                covered.push(mark);
                covered.extend_from_slice(sector.data());
                // Reproduce a recorded CRC error
                let crc = if sector.stored_crc != sector.calculated_crc {
                    sector.stored_crc
                } else {
                    crc16_ccitt(&covered)
                };
                writer.fill(0x00, SYNC_ZEROS);
                writer.marker(SYNC_WORD, true);
                writer.bytes(&covered);
                writer.bytes(&crc.to_be_bytes());
            }
            writer.fill(GAP_BYTE, GAP3);
        }
        writer.fill(GAP_BYTE, GAP4B);

        let mut bits = writer.bits;
        bits.cylinder = track.cylinder;
        bits.head = track.head;
        Ok(bits)
    }
}
