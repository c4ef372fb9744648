/// Disk data structures

use crate::error::{IrError, Result};
use crate::format::constants::{MAX_SOURCE_LEN, MAX_TRACKS};
use crate::format::{Geometry, SourceType};
use crate::image::bounded::BoundedVec;
use crate::image::track::{Track, TrackFlags, TrackQuality};
use serde::{Deserialize, Serialize};

/// Provenance and descriptive metadata for a disk
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// Capture hardware or software
    pub source_type: SourceType,
    /// Source device or file name
    pub source_name: String,
    /// Source firmware or software version
    pub source_version: String,
    /// Title of the disk
    pub title: String,
    /// Target platform
    pub platform: String,
    /// Person or tool that produced the image
    pub creator: String,
    /// Free-form comment
    pub comment: String,
    /// Creation time (seconds since the Unix epoch)
    pub creation_time: u64,
    /// Last modification time
    pub modification_time: u64,
    /// Original media date, if known
    pub original_date: u64,
    /// CRC32 of the decoded image
    pub crc32: u32,
    /// MD5 of the decoded image
    pub md5: [u8; 16],
    /// SHA-256 of the decoded image
    pub sha256: [u8; 32],
    /// Application-specific bytes
    pub custom_data: Vec<u8>,
}

/// Track counts per quality class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct QualitySummary {
    /// Perfect tracks
    pub perfect: u16,
    /// Good tracks
    pub good: u16,
    /// Degraded or marginal tracks
    pub degraded: u16,
    /// Everything else
    pub bad: u16,
}

/// A whole disk: geometry, metadata and its tracks
#[derive(Debug, Clone, PartialEq)]
pub struct Disk {
    /// Physical geometry
    pub geometry: Geometry,
    /// Provenance metadata
    pub metadata: Metadata,
    /// Media write-protect tab state
    pub write_protected: bool,
    tracks: BoundedVec<Track, MAX_TRACKS>,
}

impl Disk {
    /// Create an empty disk with the given cylinder and head counts
    pub fn new(cylinders: u8, heads: u8) -> Result<Self> {
        Ok(Self::from_geometry(Geometry::new(cylinders, heads)?))
    }

    /// Create an empty disk from a geometry preset
    pub fn from_geometry(geometry: Geometry) -> Self {
        Self {
            geometry,
            metadata: Metadata::default(),
            write_protected: false,
            tracks: BoundedVec::new(),
        }
    }

    /// Number of tracks the geometry can hold
    pub fn track_capacity(&self) -> usize {
        self.geometry.track_slots().min(MAX_TRACKS)
    }

    /// Add a track, taking ownership
    pub fn add_track(&mut self, track: Track) -> Result<()> {
        if self.index_of(track.cylinder, track.head).is_some() {
            return Err(IrError::Duplicate {
                cylinder: track.cylinder,
                head: track.head,
            });
        }
        if self.tracks.len() >= self.track_capacity() {
            return Err(IrError::Overflow {
                what: "tracks",
                limit: self.track_capacity(),
            });
        }
        self.tracks.push(track).map_err(|_| IrError::Overflow {
            what: "tracks",
            limit: MAX_TRACKS,
        })?;
        Ok(())
    }

    fn index_of(&self, cylinder: u8, head: u8) -> Option<usize> {
        self.tracks
            .iter()
            .position(|t| t.cylinder == cylinder && t.head == head)
    }

    /// Get a track by position
    pub fn get_track(&self, cylinder: u8, head: u8) -> Option<&Track> {
        self.index_of(cylinder, head).map(|i| &self.tracks[i])
    }

    /// Get a mutable reference to a track by position
    pub fn get_track_mut(&mut self, cylinder: u8, head: u8) -> Option<&mut Track> {
        let index = self.index_of(cylinder, head)?;
        self.tracks.get_mut(index)
    }

    /// Remove a track, returning ownership to the caller
    pub fn remove_track(&mut self, cylinder: u8, head: u8) -> Result<Track> {
        self.index_of(cylinder, head)
            .and_then(|index| self.tracks.remove(index))
            .ok_or(IrError::NotFound { cylinder, head })
    }

    /// Get a reference to all tracks in insertion order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Iterate mutably over all tracks
    pub fn tracks_mut(&mut self) -> std::slice::IterMut<'_, Track> {
        self.tracks.iter_mut()
    }

    /// Get the number of tracks
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Check if this disk has any tracks
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Track counts per quality class
    pub fn quality_summary(&self) -> QualitySummary {
        let mut summary = QualitySummary::default();
        for track in self.tracks.iter() {
            match track.quality {
                TrackQuality::Perfect => summary.perfect += 1,
                TrackQuality::Good => summary.good += 1,
                TrackQuality::Degraded | TrackQuality::Marginal => summary.degraded += 1,
                _ => summary.bad += 1,
            }
        }
        summary
    }

    /// Union of all track flags
    pub fn flags(&self) -> TrackFlags {
        TrackFlags(self.tracks.iter().fold(0, |acc, t| acc | t.flags.0))
    }

    /// Check internal consistency, returning one message per problem
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.metadata.source_name.len() >= MAX_SOURCE_LEN {
            issues.push(format!(
                "source name longer than {} bytes",
                MAX_SOURCE_LEN - 1
            ));
        }
        for track in self.tracks.iter() {
            if track.cylinder >= self.geometry.cylinders || track.head >= self.geometry.heads {
                issues.push(format!(
                    "track {}.{} outside geometry {}x{}",
                    track.cylinder, track.head, self.geometry.cylinders, self.geometry.heads
                ));
            }
            issues.extend(track.validate());
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_disk() {
        let disk = Disk::new(80, 2).unwrap();
        assert_eq!(disk.track_count(), 0);
        assert!(disk.is_empty());
        assert_eq!(disk.track_capacity(), 160);
    }

    #[test]
    fn test_new_disk_limits() {
        assert!(matches!(Disk::new(85, 2), Err(IrError::Invalid(_))));
        assert!(matches!(Disk::new(80, 3), Err(IrError::Invalid(_))));
        assert_eq!(Disk::new(84, 2).unwrap().track_capacity(), MAX_TRACKS);
    }

    #[test]
    fn test_add_and_get_track() {
        let mut disk = Disk::new(40, 2).unwrap();
        for cylinder in 0..5 {
            disk.add_track(Track::new(cylinder, 0).unwrap()).unwrap();
        }

        assert_eq!(disk.track_count(), 5);
        assert_eq!(disk.get_track(2, 0).map(|t| t.cylinder), Some(2));
        assert!(disk.get_track(2, 1).is_none());
    }

    #[test]
    fn test_duplicate_track() {
        let mut disk = Disk::new(40, 1).unwrap();
        disk.add_track(Track::new(3, 0).unwrap()).unwrap();
        let result = disk.add_track(Track::new(3, 0).unwrap());
        assert!(matches!(result, Err(IrError::Duplicate { cylinder: 3, head: 0 })));
        assert_eq!(disk.track_count(), 1);
    }

    #[test]
    fn test_capacity() {
        let mut disk = Disk::new(2, 1).unwrap();
        disk.add_track(Track::new(0, 0).unwrap()).unwrap();
        disk.add_track(Track::new(1, 0).unwrap()).unwrap();
        let result = disk.add_track(Track::new(5, 0).unwrap());
        assert!(matches!(result, Err(IrError::Overflow { limit: 2, .. })));
    }

    #[test]
    fn test_remove_track() {
        let mut disk = Disk::new(40, 1).unwrap();
        for cylinder in 0..3 {
            disk.add_track(Track::new(cylinder, 0).unwrap()).unwrap();
        }

        let track = disk.remove_track(1, 0).unwrap();
        assert_eq!(track.cylinder, 1);
        assert_eq!(disk.track_count(), 2);
        assert_eq!(disk.tracks()[1].cylinder, 2);
        assert!(matches!(
            disk.remove_track(1, 0),
            Err(IrError::NotFound { cylinder: 1, head: 0 })
        ));
    }

    #[test]
    fn test_quality_summary_and_flags() {
        let mut disk = Disk::new(40, 1).unwrap();
        let qualities = [
            TrackQuality::Perfect,
            TrackQuality::Good,
            TrackQuality::Marginal,
            TrackQuality::Unreadable,
        ];
        for (cylinder, quality) in qualities.iter().enumerate() {
            let mut track = Track::new(cylinder as u8, 0).unwrap();
            track.quality = *quality;
            if cylinder == 2 {
                track.flags.insert(TrackFlags::WEAK_BITS);
            }
            disk.add_track(track).unwrap();
        }

        let summary = disk.quality_summary();
        assert_eq!(summary.perfect, 1);
        assert_eq!(summary.good, 1);
        assert_eq!(summary.degraded, 1);
        assert_eq!(summary.bad, 1);
        assert!(disk.flags().contains(TrackFlags::WEAK_BITS));

        disk.remove_track(2, 0).unwrap();
        assert_eq!(disk.quality_summary().degraded, 0);
        assert!(!disk.flags().contains(TrackFlags::WEAK_BITS));
    }

    #[test]
    fn test_validate_outside_geometry() {
        let mut disk = Disk::new(40, 1).unwrap();
        disk.add_track(Track::new(0, 0).unwrap()).unwrap();
        assert!(disk.validate().is_empty());

        disk.geometry.cylinders = 0;
        assert_eq!(disk.validate().len(), 1);
    }
}
