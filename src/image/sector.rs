/// Sector data structures

use crate::fdc::{FdcStatus1, FdcStatus2};
use crate::format::constants::sector_size_from_code;
use serde::Serialize;

/// Sector ID (CHRN) - addressing information for a sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SectorId {
    /// C - Cylinder number
    pub cylinder: u8,
    /// H - Head number
    pub head: u8,
    /// R - Record (sector) number
    pub record: u8,
    /// N - Size code (0=128, 1=256, 2=512, 3=1024, ...)
    pub size_code: u8,
}

impl SectorId {
    /// Create a new sector ID
    pub fn new(cylinder: u8, head: u8, record: u8, size_code: u8) -> Self {
        Self {
            cylinder,
            head,
            record,
            size_code,
        }
    }

    /// Get the advertised sector size in bytes, `None` for an out-of-range size code
    pub fn size_bytes(&self) -> Option<usize> {
        sector_size_from_code(self.size_code)
    }
}

impl std::fmt::Display for SectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "C{} H{} R{} N{}",
            self.cylinder, self.head, self.record, self.size_code
        )
    }
}

/// A decoded sector with its integrity evidence
#[derive(Debug, Clone, PartialEq)]
pub struct Sector {
    /// Sector addressing information (CHRN)
    pub id: SectorId,
    /// CRC stored on the media for the data field
    pub stored_crc: u16,
    /// CRC calculated over the data field
    pub calculated_crc: u16,
    /// Whether the ID field CRC matched
    pub header_crc_ok: bool,
    /// Whether a data field was found for this ID
    pub data_found: bool,
    /// Read with a deleted data address mark
    pub deleted: bool,
    /// Contains weak bits
    pub weak: bool,
    /// Decoder confidence 0.0-1.0
    pub confidence: f32,
    /// Bit offset of the ID field in the source bitstream
    pub id_bit_offset: usize,
    /// Bit offset of the data field, if found
    pub data_bit_offset: Option<usize>,
    /// Bit offset just past the end of the sector
    pub end_bit_offset: usize,
    data: Vec<u8>,
}

impl Sector {
    /// Create a new sector filled with 0xE5
    pub fn new(id: SectorId) -> Self {
        let size = id.size_bytes().unwrap_or(0);
        Self::with_data(id, vec![0xE5; size])
    }

    /// Create a new sector with specific data and no CRC evidence against it
    pub fn with_data(id: SectorId, data: Vec<u8>) -> Self {
        Self {
            id,
            stored_crc: 0,
            calculated_crc: 0,
            header_crc_ok: true,
            data_found: true,
            deleted: false,
            weak: false,
            confidence: 1.0,
            id_bit_offset: 0,
            data_bit_offset: None,
            end_bit_offset: 0,
            data,
        }
    }

    /// Create a sector carrying the stored and calculated data CRC
    pub fn with_crc(id: SectorId, data: Vec<u8>, stored_crc: u16, calculated_crc: u16) -> Self {
        let mut sector = Self::with_data(id, data);
        sector.stored_crc = stored_crc;
        sector.calculated_crc = calculated_crc;
        sector.confidence = if sector.crc_valid() { 1.0 } else { 0.5 };
        sector
    }

    /// Create a sector for an ID field whose data field was never found
    pub fn header_only(id: SectorId, header_crc_ok: bool) -> Self {
        let mut sector = Self::with_data(id, Vec::new());
        sector.header_crc_ok = header_crc_ok;
        sector.data_found = false;
        sector.confidence = 0.5;
        sector
    }

    /// True when the ID field and data field both passed their CRC
    pub fn crc_valid(&self) -> bool {
        self.header_crc_ok && self.data_found && self.stored_crc == self.calculated_crc
    }

    /// Get a reference to the sector data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Set the sector data
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Get the advertised size from the size code
    pub fn advertised_size(&self) -> Option<usize> {
        self.id.size_bytes()
    }

    /// Get the actual data size
    pub fn actual_size(&self) -> usize {
        self.data.len()
    }

    /// FDC status registers a uPD765 would have reported for this sector
    pub fn fdc_status(&self) -> (FdcStatus1, FdcStatus2) {
        (FdcStatus1::from_sector(self), FdcStatus2::from_sector(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_id_size() {
        let id = SectorId::new(0, 0, 1, 2);
        assert_eq!(id.size_bytes(), Some(512));
        assert_eq!(SectorId::new(0, 0, 1, 3).size_bytes(), Some(1024));
        assert_eq!(SectorId::new(0, 0, 1, 0xFF).size_bytes(), None);
        assert_eq!(id.to_string(), "C0 H0 R1 N2");
    }

    #[test]
    fn test_new_sector() {
        let sector = Sector::new(SectorId::new(0, 0, 1, 2));
        assert_eq!(sector.data().len(), 512);
        assert!(sector.data().iter().all(|&b| b == 0xE5));
        assert_eq!(sector.advertised_size(), Some(512));
        assert!(sector.crc_valid());
    }

    #[test]
    fn test_crc_mismatch_is_invalid() {
        let id = SectorId::new(1, 0, 3, 1);
        let sector = Sector::with_crc(id, vec![0; 256], 0x1234, 0x4321);
        assert!(!sector.crc_valid());
        assert_eq!(sector.confidence, 0.5);

        let sector = Sector::with_crc(id, vec![0; 256], 0xBEEF, 0xBEEF);
        assert!(sector.crc_valid());
        assert_eq!(sector.confidence, 1.0);
    }

    #[test]
    fn test_bad_header_is_invalid() {
        let mut sector = Sector::with_crc(SectorId::new(0, 0, 1, 2), vec![0; 512], 7, 7);
        sector.header_crc_ok = false;
        assert!(!sector.crc_valid());
    }

    #[test]
    fn test_header_only() {
        let sector = Sector::header_only(SectorId::new(2, 1, 5, 2), true);
        assert!(!sector.data_found);
        assert!(!sector.crc_valid());
        assert_eq!(sector.actual_size(), 0);
    }
}
