/// JSON and text reports of the data model

use crate::error::{IrError, Result};
use crate::format::constants::{IR_VERSION_MAJOR, IR_VERSION_MINOR};
use crate::format::Geometry;
use crate::image::{
    Disk, Metadata, ProtectionMarker, QualitySummary, SectorSummary, Track, WeakRegion,
};
use serde::Serialize;
use std::fmt::Write;

/// Flux transitions shown per revolution when flux is included
const FLUX_PREVIEW: usize = 10;

#[derive(Serialize)]
struct DiskReport<'a> {
    format: &'static str,
    version: String,
    geometry: &'a Geometry,
    metadata: &'a Metadata,
    write_protected: bool,
    track_count: usize,
    quality: QualitySummary,
    flags: String,
    tracks: Vec<TrackReport<'a>>,
}

#[derive(Serialize)]
struct TrackReport<'a> {
    cylinder: u8,
    head: u8,
    encoding: &'static str,
    quality: &'static str,
    quality_score: u8,
    flags: String,
    sectors: SectorSummary,
    revolutions: Vec<RevolutionReport>,
    weak_regions: &'a [WeakRegion],
    protections: &'a [ProtectionMarker],
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
}

#[derive(Serialize)]
struct RevolutionReport {
    index: usize,
    flux_count: usize,
    duration_ns: u64,
    quality_score: u8,
    flags: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    flux: Option<Vec<u32>>,
}

fn track_report(track: &Track, include_flux: bool) -> TrackReport<'_> {
    TrackReport {
        cylinder: track.cylinder,
        head: track.head,
        encoding: track.encoding.name(),
        quality: track.quality.name(),
        quality_score: track.quality_score,
        flags: track.flags.to_string(),
        sectors: track.sector_summary(),
        revolutions: track
            .revolutions()
            .iter()
            .enumerate()
            .map(|(index, revolution)| RevolutionReport {
                index,
                flux_count: revolution.flux_count(),
                duration_ns: revolution.duration_ns,
                quality_score: revolution.quality_score,
                flags: revolution.flags.to_string(),
                flux: include_flux.then(|| {
                    revolution
                        .deltas()
                        .iter()
                        .take(FLUX_PREVIEW)
                        .copied()
                        .collect()
                }),
            })
            .collect(),
        weak_regions: track.weak_regions(),
        protections: track.protections(),
        comment: Some(track.comment()).filter(|c| !c.is_empty()),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| IrError::invalid(format!("json export: {}", e)))
}

/// Export a whole disk as a JSON document
pub fn disk_to_json(disk: &Disk) -> Result<String> {
    let report = DiskReport {
        format: "UFT-IR",
        version: format!("{}.{}", IR_VERSION_MAJOR, IR_VERSION_MINOR),
        geometry: &disk.geometry,
        metadata: &disk.metadata,
        write_protected: disk.write_protected,
        track_count: disk.track_count(),
        quality: disk.quality_summary(),
        flags: disk.flags().to_string(),
        tracks: disk.tracks().iter().map(|t| track_report(t, false)).collect(),
    };
    to_json(&report)
}

/// Export one track as JSON, optionally with the first flux deltas of each revolution
pub fn track_to_json(track: &Track, include_flux: bool) -> Result<String> {
    to_json(&track_report(track, include_flux))
}

/// One-line description of a track
pub fn track_summary(track: &Track) -> String {
    let sectors = track.sector_summary();
    format!(
        "Track {:2}.{}: {:<10} {:<10} score {:3}  revs {:2}  sectors {}/{}/{}  weak {}  flags {}",
        track.cylinder,
        track.head,
        track.encoding.name(),
        track.quality.name(),
        track.quality_score,
        track.revolution_count(),
        sectors.good,
        sectors.found,
        sectors.expected,
        track.weak_regions().len(),
        track.flags
    )
}

/// Multi-line human-readable description of a disk
pub fn disk_summary(disk: &Disk) -> String {
    let geometry = &disk.geometry;
    let quality = disk.quality_summary();
    let mut out = String::new();

    let _ = writeln!(out, "UFT-IR disk");
    if !disk.metadata.title.is_empty() {
        let _ = writeln!(out, "  Title:     {}", disk.metadata.title);
    }
    if !disk.metadata.platform.is_empty() {
        let _ = writeln!(out, "  Platform:  {}", disk.metadata.platform);
    }
    let _ = writeln!(
        out,
        "  Geometry:  {} cylinders, {} heads, {} sectors of {} bytes",
        geometry.cylinders,
        geometry.heads,
        geometry.sectors_per_track,
        geometry.sector_size()
    );
    let _ = writeln!(out, "  Speed:     {} rpm, {} kbps", geometry.rpm, geometry.data_rate_kbps);
    let _ = writeln!(out, "  Tracks:    {} of {}", disk.track_count(), disk.track_capacity());
    let _ = writeln!(
        out,
        "  Quality:   {} perfect, {} good, {} degraded, {} bad",
        quality.perfect, quality.good, quality.degraded, quality.bad
    );
    let _ = writeln!(out, "  Flags:     {}", disk.flags());
    for track in disk.tracks() {
        let _ = writeln!(out, "  {}", track_summary(track));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Encoding, FluxRevolution, TrackQuality};

    fn disk() -> Disk {
        let mut disk = Disk::new(80, 2).unwrap();
        disk.metadata.title = "Test".to_string();
        let mut track = Track::new(1, 1).unwrap();
        track.encoding = Encoding::Mfm;
        track.quality = TrackQuality::Perfect;
        track
            .add_revolution(FluxRevolution::from_deltas((1..=20).collect()).unwrap())
            .unwrap();
        disk.add_track(track).unwrap();
        disk
    }

    #[test]
    fn test_disk_to_json() {
        let json = disk_to_json(&disk()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["format"], "UFT-IR");
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["track_count"], 1);
        assert_eq!(value["metadata"]["title"], "Test");
        assert_eq!(value["tracks"][0]["encoding"], "MFM");
        assert_eq!(value["tracks"][0]["revolutions"][0]["flux_count"], 20);
        assert!(value["tracks"][0]["revolutions"][0].get("flux").is_none());
    }

    #[test]
    fn test_disk_to_json_is_deterministic() {
        let disk = disk();
        assert_eq!(disk_to_json(&disk).unwrap(), disk_to_json(&disk).unwrap());
    }

    #[test]
    fn test_track_to_json_flux_preview() {
        let disk = disk();
        let json = track_to_json(&disk.tracks()[0], true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let flux = value["revolutions"][0]["flux"].as_array().unwrap();
        assert_eq!(flux.len(), FLUX_PREVIEW);
        assert_eq!(flux[9], 10);
    }

    #[test]
    fn test_summaries() {
        let disk = disk();
        let line = track_summary(&disk.tracks()[0]);
        assert!(line.starts_with("Track  1.1: MFM"));
        assert!(line.contains("Perfect"));

        let text = disk_summary(&disk);
        assert!(text.contains("Title:     Test"));
        assert!(text.contains("Tracks:    1 of 160"));
    }
}
