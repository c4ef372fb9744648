/// Floppy Disk Controller (FDC) status view of decoded sectors
///
/// Registers follow the NEC uPD765. They are derived from a sector's CRC and
/// mark evidence, never stored alongside it.

use crate::image::Sector;
use std::fmt;

fn flag_names(value: u8, names: &[(u8, &str)], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if value == 0 {
        return write!(f, "OK");
    }
    let set: Vec<&str> = names
        .iter()
        .filter(|(mask, _)| value & mask != 0)
        .map(|(_, name)| *name)
        .collect();
    write!(f, "{}", set.join("|"))
}

/// FDC Status Register 1 (ST1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FdcStatus1(pub u8);

impl FdcStatus1 {
    /// Data Error (DE) - CRC error in the ID or data field
    pub const DE: u8 = 0x20;

    /// No Data (ND) - sector could not be read
    pub const ND: u8 = 0x04;

    /// Missing Address Mark (MA)
    pub const MA: u8 = 0x01;

    /// Derive ST1 for a decoded sector
    pub fn from_sector(sector: &Sector) -> Self {
        let mut value = 0;
        if !sector.header_crc_ok || (sector.data_found && sector.stored_crc != sector.calculated_crc) {
            value |= Self::DE;
        }
        if !sector.data_found {
            value |= Self::ND | Self::MA;
        }
        FdcStatus1(value)
    }

    /// Check if data error bit is set
    #[inline]
    pub fn data_error(&self) -> bool {
        (self.0 & Self::DE) != 0
    }

    /// Check if missing address mark bit is set
    #[inline]
    pub fn missing_address_mark(&self) -> bool {
        (self.0 & Self::MA) != 0
    }

    /// Check if any error flag is set
    #[inline]
    pub fn has_error(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for FdcStatus1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        flag_names(self.0, &[(Self::DE, "DE"), (Self::ND, "ND"), (Self::MA, "MA")], f)
    }
}

/// FDC Status Register 2 (ST2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FdcStatus2(pub u8);

impl FdcStatus2 {
    /// Control Mark (CM) - deleted data address mark
    pub const CM: u8 = 0x40;

    /// Data Error in Data Field (DD)
    pub const DD: u8 = 0x20;

    /// Missing Address Mark in Data Field (MD)
    pub const MD: u8 = 0x01;

    /// Derive ST2 for a decoded sector
    pub fn from_sector(sector: &Sector) -> Self {
        let mut value = 0;
        if sector.deleted {
            value |= Self::CM;
        }
        if sector.data_found && sector.stored_crc != sector.calculated_crc {
            value |= Self::DD;
        }
        if !sector.data_found {
            value |= Self::MD;
        }
        FdcStatus2(value)
    }

    /// Check if control mark (deleted data) bit is set
    #[inline]
    pub fn is_deleted(&self) -> bool {
        (self.0 & Self::CM) != 0
    }

    /// Check if data field error bit is set
    #[inline]
    pub fn data_field_error(&self) -> bool {
        (self.0 & Self::DD) != 0
    }

    /// Check if any error flag is set (excluding deleted data mark)
    #[inline]
    pub fn has_error(&self) -> bool {
        (self.0 & !Self::CM) != 0
    }
}

impl fmt::Display for FdcStatus2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        flag_names(self.0, &[(Self::CM, "CM"), (Self::DD, "DD"), (Self::MD, "MD")], f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::SectorId;

    #[test]
    fn test_good_sector_no_error() {
        let sector = Sector::with_crc(SectorId::new(0, 0, 1, 2), vec![0; 512], 5, 5);
        let (st1, st2) = sector.fdc_status();
        assert!(!st1.has_error());
        assert!(!st2.has_error());
        assert_eq!(st1.to_string(), "OK");
    }

    #[test]
    fn test_data_crc_error() {
        let sector = Sector::with_crc(SectorId::new(0, 0, 1, 2), vec![0; 512], 5, 6);
        let (st1, st2) = sector.fdc_status();
        assert!(st1.data_error());
        assert!(st2.data_field_error());
        assert_eq!(st2.to_string(), "DD");
    }

    #[test]
    fn test_deleted_is_not_error() {
        let mut sector = Sector::with_crc(SectorId::new(0, 0, 1, 2), vec![0; 512], 5, 5);
        sector.deleted = true;
        let st2 = FdcStatus2::from_sector(&sector);
        assert!(st2.is_deleted());
        assert!(!st2.has_error());
    }

    #[test]
    fn test_missing_data_field() {
        let sector = Sector::header_only(SectorId::new(0, 0, 1, 2), true);
        let (st1, st2) = sector.fdc_status();
        assert!(st1.missing_address_mark());
        assert!(!st1.data_error());
        assert_eq!(st1.to_string(), "ND|MA");
        assert_eq!(st2.to_string(), "MD");
    }
}
