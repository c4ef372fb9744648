/// Track quality map

use crate::image::{Disk, Track, TrackQuality};

/// ANSI color codes for the quality map
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BRIGHT_WHITE: &str = "\x1b[97m";
    pub const DARK_WHITE: &str = "\x1b[37m";
    pub const BRIGHT_RED: &str = "\x1b[91m";
    pub const DARK_RED: &str = "\x1b[2;31m";
    pub const BRIGHT_YELLOW: &str = "\x1b[93m";
    pub const BRIGHT_CYAN: &str = "\x1b[96m";
}

/// Cell drawn where the disk has no track
pub const CELL_MISSING: char = ' ';

/// Map cell for a quality class
pub fn quality_cell(quality: TrackQuality) -> char {
    match quality {
        TrackQuality::Perfect => '\u{2588}', // █
        TrackQuality::Good => '\u{2593}',    // ▓
        TrackQuality::Degraded => '\u{2592}', // ▒
        TrackQuality::Marginal => '\u{2591}', // ░
        TrackQuality::Bad => 'x',
        TrackQuality::Unreadable => 'X',
        TrackQuality::Protected => 'P',
        TrackQuality::Empty => '.',
        TrackQuality::Unknown => '?',
    }
}

fn quality_color(quality: TrackQuality) -> &'static str {
    match quality {
        TrackQuality::Perfect => colors::BRIGHT_WHITE,
        TrackQuality::Good | TrackQuality::Empty | TrackQuality::Unknown => colors::DARK_WHITE,
        TrackQuality::Degraded | TrackQuality::Marginal => colors::BRIGHT_YELLOW,
        TrackQuality::Bad => colors::DARK_RED,
        TrackQuality::Unreadable => colors::BRIGHT_RED,
        TrackQuality::Protected => colors::BRIGHT_CYAN,
    }
}

fn cell(track: Option<&Track>, color: bool) -> String {
    match track {
        Some(track) if color => format!(
            "{}{}{}",
            quality_color(track.quality),
            quality_cell(track.quality),
            colors::RESET
        ),
        Some(track) => quality_cell(track.quality).to_string(),
        None => CELL_MISSING.to_string(),
    }
}

/// Render a quality map with one row per head and one column per cylinder
///
/// Cylinder numbers are printed under the grid every five columns.
pub fn render_quality_map(disk: &Disk, color: bool) -> String {
    let cylinders = disk.geometry.cylinders as usize;
    let mut out = String::new();

    out.push_str("=== Track Quality Map ===\n");
    out.push_str("Legend: \u{2588} perfect \u{2593} good \u{2592} degraded \u{2591} marginal x bad X unreadable P protected . empty\n");
    out.push('\n');

    for head in 0..disk.geometry.heads {
        out.push_str(&format!("H{} ", head));
        for cylinder in 0..disk.geometry.cylinders {
            out.push_str(&cell(disk.get_track(cylinder, head), color));
        }
        out.push('\n');
    }

    // Cylinder axis, multi-digit labels spill into the following columns
    out.push_str("   ");
    let mut printed = vec![false; cylinders];
    for cylinder in 0..cylinders {
        if cylinder % 5 == 0 && !printed[cylinder] {
            for (i, digit) in cylinder.to_string().chars().enumerate() {
                let col = cylinder + i;
                if col < cylinders {
                    out.push(digit);
                    printed[col] = true;
                }
            }
        } else if !printed[cylinder] {
            out.push(' ');
        }
    }
    out.push('\n');

    let summary = disk.quality_summary();
    out.push_str(&format!(
        "\nPerfect: {}  Good: {}  Degraded: {}  Bad: {}\n",
        summary.perfect, summary.good, summary.degraded, summary.bad
    ));
    out
}

/// Print a colored quality map to stdout
pub fn draw_quality_map(disk: &Disk) {
    print!("{}", render_quality_map(disk, true));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_disk() -> Disk {
        let mut disk = Disk::new(12, 2).unwrap();
        let mut perfect = Track::new(0, 0).unwrap();
        perfect.quality = TrackQuality::Perfect;
        disk.add_track(perfect).unwrap();
        let mut bad = Track::new(11, 1).unwrap();
        bad.quality = TrackQuality::Unreadable;
        disk.add_track(bad).unwrap();
        disk
    }

    #[test]
    fn test_quality_cells_distinct() {
        let all = [
            TrackQuality::Unknown,
            TrackQuality::Perfect,
            TrackQuality::Good,
            TrackQuality::Degraded,
            TrackQuality::Marginal,
            TrackQuality::Bad,
            TrackQuality::Unreadable,
            TrackQuality::Empty,
            TrackQuality::Protected,
        ];
        let mut cells: Vec<char> = all.iter().map(|q| quality_cell(*q)).collect();
        cells.sort();
        cells.dedup();
        assert_eq!(cells.len(), all.len());
        assert!(!cells.contains(&CELL_MISSING));
    }

    #[test]
    fn test_render_plain() {
        let map = render_quality_map(&sample_disk(), false);
        let lines: Vec<&str> = map.lines().collect();
        assert_eq!(lines[3], format!("H0 \u{2588}{}", " ".repeat(11)));
        assert_eq!(lines[4], format!("H1 {}X", " ".repeat(11)));
        assert_eq!(lines[5], "   0    5    10");
        assert!(!map.contains('\x1b'));
    }

    #[test]
    fn test_render_color() {
        let map = render_quality_map(&sample_disk(), true);
        assert!(map.contains(colors::BRIGHT_RED));
        assert!(map.contains(colors::RESET));
    }
}
