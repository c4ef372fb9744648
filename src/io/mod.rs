/// IR file reading and writing, payload compression and reports

/// Payload compression
pub mod compress;
/// JSON and text export
pub mod export;
/// On-disk record layouts
pub mod layout;
/// IR file reader
pub mod reader;
/// IR file writer
pub mod writer;

pub use export::{disk_summary, disk_to_json, track_summary, track_to_json};
pub use reader::{deserialize_track, load, read_disk};
pub use writer::{save, serialize_track, write_disk, SaveOptions};
