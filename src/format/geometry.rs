/// Disk geometry and common presets

use crate::error::{IrError, Result};
use crate::format::constants::{MAX_CYLINDERS, MAX_HEADS};
use serde::{Deserialize, Serialize};

/// Recording density class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Density {
    /// Single density (FM)
    Single,
    /// Double density
    #[default]
    Double,
    /// High density
    High,
    /// Extended density
    Extended,
}

impl From<u8> for Density {
    fn from(value: u8) -> Self {
        match value {
            0 => Density::Single,
            2 => Density::High,
            3 => Density::Extended,
            _ => Density::Double,
        }
    }
}

impl From<Density> for u8 {
    fn from(density: Density) -> Self {
        match density {
            Density::Single => 0,
            Density::Double => 1,
            Density::High => 2,
            Density::Extended => 3,
        }
    }
}

/// Physical disk geometry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    /// Number of cylinders (at most 84)
    pub cylinders: u8,
    /// Number of heads (1 or 2)
    pub heads: u8,
    /// Nominal sectors per track
    pub sectors_per_track: u8,
    /// Sector size as a power of two (9 = 512 bytes)
    pub sector_size_shift: u8,
    /// Total sector count
    pub total_sectors: u32,
    /// Nominal rotation speed
    pub rpm: u32,
    /// Data rate in kbit/s
    pub data_rate_kbps: u32,
    /// Density class
    pub density: Density,
    /// Sector interleave (1 = none)
    pub interleave: u8,
    /// Sector skew between cylinders
    pub track_skew: u8,
    /// Sector skew between heads
    pub head_skew: u8,
}

impl Geometry {
    /// Create a geometry, rejecting counts past the hard maxima
    pub fn new(cylinders: u8, heads: u8) -> Result<Self> {
        if cylinders > MAX_CYLINDERS {
            return Err(IrError::invalid(format!(
                "{} cylinders exceeds maximum of {}",
                cylinders, MAX_CYLINDERS
            )));
        }
        if heads > MAX_HEADS {
            return Err(IrError::invalid(format!(
                "{} heads exceeds maximum of {}",
                heads, MAX_HEADS
            )));
        }
        Ok(Self {
            cylinders,
            heads,
            sectors_per_track: 0,
            sector_size_shift: 9,
            total_sectors: 0,
            rpm: 300,
            data_rate_kbps: 250,
            density: Density::Double,
            interleave: 1,
            track_skew: 0,
            head_skew: 0,
        })
    }

    fn preset(
        cylinders: u8,
        heads: u8,
        sectors_per_track: u8,
        rpm: u32,
        data_rate_kbps: u32,
        density: Density,
    ) -> Self {
        Self {
            cylinders,
            heads,
            sectors_per_track,
            sector_size_shift: 9,
            total_sectors: cylinders as u32 * heads as u32 * sectors_per_track as u32,
            rpm,
            data_rate_kbps,
            density,
            interleave: 1,
            track_skew: 0,
            head_skew: 0,
        }
    }

    /// IBM PC 360K (40 cylinders, 2 heads, 9 sectors, 512 bytes)
    pub fn ibm_pc_360k() -> Self {
        Self::preset(40, 2, 9, 300, 250, Density::Double)
    }

    /// IBM PC 720K (80 cylinders, 2 heads, 9 sectors, 512 bytes)
    pub fn ibm_pc_720k() -> Self {
        Self::preset(80, 2, 9, 300, 250, Density::Double)
    }

    /// IBM PC 1.44M (80 cylinders, 2 heads, 18 sectors, 512 bytes)
    pub fn ibm_pc_1440k() -> Self {
        Self::preset(80, 2, 18, 300, 500, Density::High)
    }

    /// Amiga DD (80 cylinders, 2 heads, 11 sectors, 512 bytes)
    pub fn amiga_dd() -> Self {
        Self::preset(80, 2, 11, 300, 250, Density::Double)
    }

    /// Commodore 1541 (35 tracks, 1 head, variable sectors, 256 bytes)
    pub fn commodore_1541() -> Self {
        let mut geometry = Self::preset(35, 1, 0, 300, 250, Density::Double);
        geometry.sector_size_shift = 8;
        geometry.total_sectors = 683;
        geometry
    }

    /// Apple II 5.25" (35 tracks, 1 head, 16 sectors, 256 bytes)
    pub fn apple_ii() -> Self {
        let mut geometry = Self::preset(35, 1, 16, 300, 250, Density::Double);
        geometry.sector_size_shift = 8;
        geometry
    }

    /// Sector size in bytes
    pub fn sector_size(&self) -> usize {
        1usize << self.sector_size_shift.min(15)
    }

    /// Number of track slots (cylinders x heads)
    pub fn track_slots(&self) -> usize {
        self.cylinders as usize * self.heads as usize
    }

    /// Calculate total formatted capacity in bytes
    pub fn total_capacity(&self) -> usize {
        self.track_slots() * self.sectors_per_track as usize * self.sector_size()
    }

    /// Set the interleave factor
    pub fn with_interleave(mut self, interleave: u8) -> Self {
        self.interleave = interleave;
        self
    }

    /// Set the rotation speed
    pub fn with_rpm(mut self, rpm: u32) -> Self {
        self.rpm = rpm;
        self
    }

    /// Set the track and head skew
    pub fn with_skew(mut self, track_skew: u8, head_skew: u8) -> Self {
        self.track_skew = track_skew;
        self.head_skew = head_skew;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_limits() {
        assert!(Geometry::new(84, 2).is_ok());
        assert!(matches!(Geometry::new(85, 2), Err(IrError::Invalid(_))));
        assert!(matches!(Geometry::new(80, 3), Err(IrError::Invalid(_))));
    }

    #[test]
    fn test_ibm_pc_720k_capacity() {
        let geometry = Geometry::ibm_pc_720k();
        assert_eq!(geometry.total_capacity() / 1024, 720);
        assert_eq!(geometry.total_sectors, 1440);
        assert_eq!(geometry.track_slots(), 160);
    }

    #[test]
    fn test_ibm_pc_1440k() {
        let geometry = Geometry::ibm_pc_1440k();
        assert_eq!(geometry.total_capacity() / 1024, 1440);
        assert_eq!(geometry.density, Density::High);
        assert_eq!(geometry.data_rate_kbps, 500);
    }

    #[test]
    fn test_small_sector_presets() {
        assert_eq!(Geometry::commodore_1541().sector_size(), 256);
        assert_eq!(Geometry::apple_ii().sector_size(), 256);
        assert_eq!(Geometry::apple_ii().total_capacity(), 35 * 16 * 256);
    }

    #[test]
    fn test_with_methods() {
        let geometry = Geometry::amiga_dd()
            .with_interleave(2)
            .with_rpm(360)
            .with_skew(1, 2);

        assert_eq!(geometry.interleave, 2);
        assert_eq!(geometry.rpm, 360);
        assert_eq!(geometry.track_skew, 1);
        assert_eq!(geometry.head_skew, 2);
    }

    #[test]
    fn test_density_conversion() {
        assert_eq!(Density::from(0), Density::Single);
        assert_eq!(Density::from(2), Density::High);
        assert_eq!(Density::from(99), Density::Double);
        assert_eq!(u8::from(Density::Extended), 3);
    }
}
