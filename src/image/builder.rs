/// Builder for creating disks

use crate::error::Result;
use crate::format::{Geometry, SourceType};
use crate::image::{Disk, Encoding, Metadata, Track};

/// Builder for constructing disks
pub struct DiskBuilder {
    geometry: Geometry,
    metadata: Metadata,
    encoding: Encoding,
    populate: bool,
}

impl DiskBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            geometry: Geometry::ibm_pc_720k(),
            metadata: Metadata::default(),
            encoding: Encoding::Mfm,
            populate: false,
        }
    }

    /// Set the geometry
    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Set the number of cylinders
    pub fn cylinders(mut self, cylinders: u8) -> Self {
        self.geometry.cylinders = cylinders;
        self
    }

    /// Set the number of heads
    pub fn heads(mut self, heads: u8) -> Self {
        self.geometry.heads = heads;
        self
    }

    /// Set the nominal rotation speed
    pub fn rpm(mut self, rpm: u32) -> Self {
        self.geometry.rpm = rpm;
        self
    }

    /// Set the capture source
    pub fn source<S: Into<String>>(mut self, source_type: SourceType, name: S) -> Self {
        self.metadata.source_type = source_type;
        self.metadata.source_name = name.into();
        self
    }

    /// Set the title
    pub fn title<S: Into<String>>(mut self, title: S) -> Self {
        self.metadata.title = title.into();
        self
    }

    /// Set the platform
    pub fn platform<S: Into<String>>(mut self, platform: S) -> Self {
        self.metadata.platform = platform.into();
        self
    }

    /// Set the creator
    pub fn creator<S: Into<String>>(mut self, creator: S) -> Self {
        self.metadata.creator = creator.into();
        self
    }

    /// Set the encoding given to populated tracks
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Create an empty track for every cylinder and head
    pub fn populate_tracks(mut self, populate: bool) -> Self {
        self.populate = populate;
        self
    }

    /// Build the disk with the specified configuration
    pub fn build(self) -> Result<Disk> {
        // Validate the counts against the hard maxima before allocating
        let limits = Geometry::new(self.geometry.cylinders, self.geometry.heads)?;
        let mut geometry = self.geometry;
        geometry.cylinders = limits.cylinders;
        geometry.heads = limits.heads;

        let mut disk = Disk::from_geometry(geometry);
        disk.metadata = self.metadata;

        if self.populate {
            for cylinder in 0..disk.geometry.cylinders {
                for head in 0..disk.geometry.heads {
                    let mut track = Track::new(cylinder, head)?;
                    track.encoding = self.encoding;
                    track.sectors_expected = disk.geometry.sectors_per_track;
                    disk.add_track(track)?;
                }
            }
        }

        Ok(disk)
    }
}

impl Default for DiskBuilder {
    fn default() -> Self {
        Self::new()
    }
}
