//! Fixtures shared by the processor and runner tests.

use image::RgbaImage;

use crate::config::{FieldKind, RegionSpec, RelativeRect, TrackerConfig};
use crate::ocr::{RawReading, ReadRegion};

/// Gray level step between scripted frames.
pub const STEP: u8 = 20;

/// Picks a script row from the gray level of the frame's top-left pixel
/// (`level / STEP`) and answers each region by name from that row.
pub struct LevelReader {
    pub script: Vec<Vec<(&'static str, &'static str)>>,
}

impl ReadRegion for LevelReader {
    fn read(&self, frame: &RgbaImage, region: &RegionSpec) -> RawReading {
        let Some(pixel) = frame.get_pixel_checked(0, 0) else {
            return RawReading::unreadable();
        };
        let row = usize::from(pixel[0] / STEP);
        self.script
            .get(row)
            .and_then(|entries| entries.iter().find(|(name, _)| *name == region.name))
            .map(|(_, text)| RawReading::new(text, 0.95))
            .unwrap_or_else(RawReading::unreadable)
    }
}

/// Two seats, pot and blinds, all reading the whole frame.
pub fn table_config() -> TrackerConfig {
    let rect = RelativeRect::FULL;
    TrackerConfig {
        regions: vec![
            RegionSpec::new("seat1.name", rect, FieldKind::Name),
            RegionSpec::new("seat1.stack", rect, FieldKind::Money),
            RegionSpec::new("seat2.name", rect, FieldKind::Name),
            RegionSpec::new("seat2.stack", rect, FieldKind::Money),
            RegionSpec::new("pot", rect, FieldKind::Money),
            RegionSpec::new("blinds", rect, FieldKind::Money),
            RegionSpec::new("street", rect, FieldKind::TextLabel),
        ],
        ..TrackerConfig::default()
    }
}

/// One hand: blinds posted, flop bet, Alice wins 4.00 from Bob.
/// Frame levels 0, 20, 40, 60, 80 select the rows in order; the last two
/// rows show the settled stacks.
pub fn heads_up_hand() -> LevelReader {
    let row = |alice: &'static str, bob: &'static str, pot: &'static str| {
        vec![
            ("seat1.name", "Alice"),
            ("seat1.stack", alice),
            ("seat2.name", "Bob"),
            ("seat2.stack", bob),
            ("pot", pot),
            ("blinds", "$0.50/$1"),
        ]
    };
    let mut flop = row("$98", "$98", "$4.50");
    flop.push(("street", "FLOP"));

    LevelReader {
        script: vec![
            row("$100", "$100", "$1.50"),
            row("$100", "$100", "$1.50"),
            flop,
            row("$104", "$96", "$0"),
            row("$104", "$96", "$0"),
        ],
    }
}
