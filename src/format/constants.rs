/// IR file magic, version and hard limits

/// IR file signature: "UFTIR" followed by the version triplet 0,1,0
pub const IR_MAGIC: &[u8; 8] = b"UFTIR\x00\x01\x00";

/// Major version written by this library
pub const IR_VERSION_MAJOR: u32 = 1;
/// Minor version written by this library
pub const IR_VERSION_MINOR: u32 = 0;
/// Patch version written by this library
pub const IR_VERSION_PATCH: u32 = 0;

/// Packed version as stored in the file header
pub const IR_VERSION: u32 = pack_version(IR_VERSION_MAJOR, IR_VERSION_MINOR, IR_VERSION_PATCH);

/// Maximum revolutions stored per track
pub const MAX_REVOLUTIONS: usize = 16;

/// Maximum tracks per disk (84 cylinders x 2 heads)
pub const MAX_TRACKS: usize = 168;

/// Maximum cylinders per disk
pub const MAX_CYLINDERS: u8 = 84;

/// Maximum heads per disk
pub const MAX_HEADS: u8 = 2;

/// Maximum flux transitions per revolution
pub const MAX_FLUX_PER_REVOLUTION: usize = 500_000;

/// Maximum weak regions stored on a track
pub const MAX_WEAK_REGIONS: usize = 64;

/// Maximum protection markers stored on a track
pub const MAX_PROTECTIONS: usize = 8;

/// Maximum length of a track comment
pub const MAX_COMMENT_LEN: usize = 256;

/// Maximum length of a source name
pub const MAX_SOURCE_LEN: usize = 128;

/// Size of the packed file header in bytes
pub const FILE_HEADER_SIZE: usize = 51;

/// Size of the geometry block in bytes
pub const GEOMETRY_BLOCK_SIZE: usize = 20;

/// Size of a packed track header in bytes
pub const TRACK_HEADER_SIZE: usize = 24;

/// Header flag: each track payload starts with a u32 flux count per revolution
pub const FLAG_REVOLUTION_TABLE: u32 = 1 << 0;

/// Header flag: a length-prefixed JSON metadata block follows the last payload
pub const FLAG_METADATA: u32 = 1 << 1;

/// Histogram bucket count (1 microsecond per bucket)
pub const HISTOGRAM_BUCKETS: usize = 64;

/// Sector size code to byte size mapping
/// Index: size_code (0-8), Value: size in bytes
pub const SECTOR_SIZES: [usize; 9] = [
    128,    // 0
    256,    // 1
    512,    // 2
    1024,   // 3
    2048,   // 4
    4096,   // 5
    8192,   // 6
    16384,  // 7
    32768,  // 8
];

/// Pack a version triplet as `(major << 16) | (minor << 8) | patch`
pub const fn pack_version(major: u32, minor: u32, patch: u32) -> u32 {
    (major << 16) | (minor << 8) | patch
}

/// Major component of a packed version
#[inline]
pub const fn version_major(version: u32) -> u32 {
    version >> 16
}

/// Convert a sector size code to its byte size
#[inline]
pub fn sector_size_from_code(size_code: u8) -> Option<usize> {
    SECTOR_SIZES.get(size_code as usize).copied()
}

/// Convert a byte size to a sector size code, `None` if the size has no code
///
/// Covers the same 0-8 range as [`sector_size_from_code`], so large-sector
/// formats (2048 bytes and up) keep a code.
#[inline]
pub fn size_code_from_size(bytes: usize) -> Option<u8> {
    SECTOR_SIZES
        .iter()
        .position(|&size| size == bytes)
        .map(|code| code as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_size_from_code() {
        assert_eq!(sector_size_from_code(0), Some(128));
        assert_eq!(sector_size_from_code(1), Some(256));
        assert_eq!(sector_size_from_code(2), Some(512));
        assert_eq!(sector_size_from_code(3), Some(1024));
        assert_eq!(sector_size_from_code(8), Some(32768));
    }

    #[test]
    fn test_sector_size_from_code_invalid() {
        assert_eq!(sector_size_from_code(9), None);
        assert_eq!(sector_size_from_code(255), None);
    }

    #[test]
    fn test_size_code_from_size_invalid() {
        assert_eq!(size_code_from_size(0), None);
        assert_eq!(size_code_from_size(100), None);
        assert_eq!(size_code_from_size(1000), None);
        assert_eq!(size_code_from_size(513), None);
    }

    #[test]
    fn test_size_code_large_sectors() {
        assert_eq!(size_code_from_size(2048), Some(4));
        assert_eq!(size_code_from_size(8192), Some(6));
        assert_eq!(size_code_from_size(32768), Some(8));
        assert_eq!(size_code_from_size(65536), None);
        assert_eq!(size_code_from_size(3000), None);
    }

    #[test]
    fn test_round_trip_conversion() {
        for size in [128, 256, 512, 1024] {
            let code = size_code_from_size(size).unwrap();
            assert_eq!(sector_size_from_code(code), Some(size));
        }
    }

    #[test]
    fn test_version_packing() {
        assert_eq!(IR_VERSION, 0x0001_0000);
        assert_eq!(version_major(IR_VERSION), 1);
        assert_eq!(pack_version(2, 3, 4), 0x0002_0304);
        assert_eq!(&IR_MAGIC[..], &[0x55, 0x46, 0x54, 0x49, 0x52, 0x00, 0x01, 0x00]);
    }

    proptest::proptest! {
        #[test]
        fn test_size_code_inverse(code in 0u8..=8, bytes in 0usize..40_000) {
            let size = sector_size_from_code(code).unwrap();
            proptest::prop_assert_eq!(size_code_from_size(size), Some(code));
            if let Some(found) = size_code_from_size(bytes) {
                proptest::prop_assert_eq!(sector_size_from_code(found), Some(bytes));
            }
        }
    }
}
