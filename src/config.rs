//! Configuration types for the tracker.
//!
//! Loads settings from config.json at startup. Provides the screen region
//! layout, OCR tuning, capture timing and the thresholds used by
//! segmentation and reconciliation.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::chips::Chips;

/// A rectangle in relative coordinates (0.0 to 1.0).
/// Used for defining screen regions that scale with the capture size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativeRect {
    /// X position of top-left corner (0.0 = left edge, 1.0 = right edge)
    pub x: f32,
    /// Y position of top-left corner (0.0 = top edge, 1.0 = bottom edge)
    pub y: f32,
    /// Width as fraction of frame width
    pub width: f32,
    /// Height as fraction of frame height
    pub height: f32,
}

impl RelativeRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub const FULL: RelativeRect = RelativeRect::new(0.0, 0.0, 1.0, 1.0);

    fn is_valid(&self) -> bool {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        in_unit(self.x)
            && in_unit(self.y)
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.0 + f32::EPSILON
            && self.y + self.height <= 1.0 + f32::EPSILON
    }
}

/// What kind of text a region holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Money,
    Name,
    TextLabel,
    Card,
}

/// What a region means on the table, derived from its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegionRole {
    SeatName(usize),
    SeatStack(usize),
    SeatAction(usize),
    SeatCards(usize),
    Pot,
    Blinds,
    Street,
    CommunityCards,
    HandNumber,
}

impl RegionRole {
    /// Parses names like `seat2.stack`, `pot` or `blinds`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pot" => return Some(Self::Pot),
            "blinds" => return Some(Self::Blinds),
            "street" => return Some(Self::Street),
            "community_cards" => return Some(Self::CommunityCards),
            "hand_number" => return Some(Self::HandNumber),
            _ => {}
        }

        let rest = name.strip_prefix("seat")?;
        let (seat, field) = rest.split_once('.')?;
        let seat: usize = seat.parse().ok()?;
        if seat == 0 {
            return None;
        }
        match field {
            "name" => Some(Self::SeatName(seat)),
            "stack" => Some(Self::SeatStack(seat)),
            "action" => Some(Self::SeatAction(seat)),
            "cards" => Some(Self::SeatCards(seat)),
            _ => None,
        }
    }

    /// The field kind a region with this role is expected to carry.
    pub fn expected_kind(&self) -> FieldKind {
        match self {
            Self::SeatName(_) => FieldKind::Name,
            Self::SeatStack(_) | Self::Pot | Self::Blinds | Self::HandNumber => FieldKind::Money,
            Self::SeatAction(_) | Self::Street => FieldKind::TextLabel,
            Self::SeatCards(_) | Self::CommunityCards => FieldKind::Card,
        }
    }
}

/// One named screen region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub name: String,
    pub rect: RelativeRect,
    pub kind: FieldKind,
}

impl RegionSpec {
    pub fn new(name: &str, rect: RelativeRect, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            rect,
            kind,
        }
    }

    /// Role of this region. `None` only for configs that skipped `validate()`.
    pub fn role(&self) -> Option<RegionRole> {
        RegionRole::from_name(&self.name)
    }
}

/// OCR preprocessing and engine settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Explicit path to the tesseract executable; searched for when absent
    pub tesseract_path: Option<PathBuf>,
    /// Explicit tessdata directory
    pub tessdata_dir: Option<PathBuf>,
    /// Tesseract language
    pub language: String,
    /// Tesseract page segmentation mode (7 = single text line)
    pub psm: u8,
    /// Upscale factor applied to each crop before OCR
    pub scale_factor: f32,
    /// Fixed binarization threshold; Otsu's method when absent
    pub threshold: Option<u8>,
    /// Readings below this confidence (0.0-1.0) are treated as unreadable
    pub min_confidence: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            tessdata_dir: None,
            language: "eng".to_string(),
            psm: 7,
            scale_factor: 2.0,
            threshold: None,
            min_confidence: 0.3,
        }
    }
}

/// Frame acquisition timing and differencing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Live mode: delay between two acquisition polls (milliseconds)
    pub sample_interval_ms: u64,
    /// Batch mode: process every Nth frame of a frame directory
    pub sample_every_n_frames: u32,
    /// Batch mode: frames per second extracted from video files; derived from
    /// `sample_every_n_frames` at 30 fps when absent
    pub video_fps: Option<f32>,
    /// Live mode: bounded queue capacity between acquisition and processing
    pub queue_capacity: usize,
    /// Mean luma delta (0.0-1.0) a region must exceed for a frame to count as changed
    pub diff_threshold: f32,
    /// Live mode: seconds between two status lines (0 disables them)
    pub status_interval_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 2000,
            sample_every_n_frames: 30,
            video_fps: None,
            queue_capacity: 32,
            diff_threshold: 0.01,
            status_interval_secs: 30,
        }
    }
}

impl CaptureConfig {
    /// Sampling rate for video files.
    pub fn video_sampling_fps(&self) -> f32 {
        self.video_fps
            .unwrap_or(30.0 / self.sample_every_n_frames.max(1) as f32)
    }
}

/// Player name resolution.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NameConfig {
    /// Maximum edit distance for correcting a reading to a known name
    pub max_edit_distance: usize,
}

impl Default for NameConfig {
    fn default() -> Self {
        Self { max_edit_distance: 2 }
    }
}

/// Hand segmentation thresholds.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Rolling vote window size (odd)
    pub vote_window: usize,
    /// Snapshots without a usable street hint before the pot fallback engages
    pub street_staleness_bound: u32,
    /// Street hints below this reader confidence lose tie-breaks
    pub street_hint_min_confidence: f32,
    /// Pot counts as "at the blinds" when <= big blind * factor
    pub baseline_pot_factor: f64,
    /// Minimum bet used for stack discontinuity while no big blind is known
    pub fallback_min_bet: Chips,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            vote_window: 3,
            street_staleness_bound: 4,
            street_hint_min_confidence: 0.6,
            baseline_pot_factor: 1.6,
            fallback_min_bet: Chips::ZERO,
        }
    }
}

/// Reconciliation tolerances.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Allowed imbalance when summing net results and comparing against the pot
    pub tolerance: Chips,
    /// Net results within +/- epsilon count as break-even
    pub outcome_epsilon: Chips,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            tolerance: Chips::from_cents(5),
            outcome_epsilon: Chips::from_cents(1),
        }
    }
}

/// Complete tracker configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub regions: Vec<RegionSpec>,
    pub ocr: OcrConfig,
    pub capture: CaptureConfig,
    pub names: NameConfig,
    pub segmentation: SegmentationConfig,
    pub reconciliation: ReconciliationConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            regions: default_regions(),
            ocr: OcrConfig::default(),
            capture: CaptureConfig::default(),
            names: NameConfig::default(),
            segmentation: SegmentationConfig::default(),
            reconciliation: ReconciliationConfig::default(),
        }
    }
}

/// Three-seat spin layout: hero at the bottom, two opponents on top.
fn default_regions() -> Vec<RegionSpec> {
    use FieldKind::*;

    let seats = [(1, 0.40, 0.85, 0.80, 0.75), (2, 0.15, 0.15, 0.20, 0.30), (3, 0.65, 0.15, 0.20, 0.30)];
    let mut regions = Vec::new();
    for (seat, x, name_y, stack_y, action_y) in seats {
        regions.push(RegionSpec::new(&format!("seat{}.name", seat), RelativeRect::new(x, name_y, 0.20, 0.05), Name));
        regions.push(RegionSpec::new(&format!("seat{}.stack", seat), RelativeRect::new(x, stack_y, 0.20, 0.04), Money));
        regions.push(RegionSpec::new(&format!("seat{}.action", seat), RelativeRect::new(x, action_y, 0.20, 0.04), TextLabel));
    }
    regions.push(RegionSpec::new("pot", RelativeRect::new(0.45, 0.45, 0.10, 0.04), Money));
    regions.push(RegionSpec::new("blinds", RelativeRect::new(0.45, 0.05, 0.10, 0.04), Money));
    regions.push(RegionSpec::new("street", RelativeRect::new(0.40, 0.36, 0.20, 0.03), TextLabel));
    regions.push(RegionSpec::new("community_cards", RelativeRect::new(0.35, 0.40, 0.30, 0.08), Card));
    regions
}

impl TrackerConfig {
    /// Loads configuration from `path`, or returns defaults if the file doesn't exist.
    ///
    /// A file that exists but cannot be parsed is an error rather than a silent fallback.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("{} not found. Using default config.", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: TrackerConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        log::info!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// Looks for config.json next to the executable.
    pub fn default_path() -> PathBuf {
        crate::paths::get_exe_dir().join("config.json")
    }

    /// Writes the default configuration (for reference and editing).
    pub fn save_default(path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&Self::default())?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Checks ranges and region names.
    pub fn validate(&self) -> Result<()> {
        for region in &self.regions {
            if !region.rect.is_valid() {
                bail!("Region '{}' has an out-of-range rectangle: {:?}", region.name, region.rect);
            }
            let role = region
                .role()
                .ok_or_else(|| anyhow!("Unknown region name '{}'", region.name))?;
            if role.expected_kind() != region.kind {
                bail!(
                    "Region '{}' should be of kind {:?}, not {:?}",
                    region.name,
                    role.expected_kind(),
                    region.kind
                );
            }
        }

        let seg = &self.segmentation;
        if seg.vote_window == 0 || seg.vote_window % 2 == 0 {
            bail!("segmentation.vote_window must be odd, got {}", seg.vote_window);
        }
        if seg.street_staleness_bound == 0 {
            bail!("segmentation.street_staleness_bound must be at least 1");
        }
        if seg.baseline_pot_factor < 1.0 {
            bail!("segmentation.baseline_pot_factor must be >= 1.0");
        }
        if self.capture.queue_capacity == 0 {
            bail!("capture.queue_capacity must be at least 1");
        }
        if self.capture.sample_every_n_frames == 0 {
            bail!("capture.sample_every_n_frames must be at least 1");
        }
        if self.ocr.scale_factor <= 0.0 {
            bail!("ocr.scale_factor must be positive");
        }
        if self.reconciliation.tolerance.is_negative() || self.reconciliation.outcome_epsilon.is_negative() {
            bail!("reconciliation tolerances must not be negative");
        }
        Ok(())
    }
}
