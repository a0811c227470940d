//! Frame differencing over the configured regions.

use image::{GrayImage, RgbaImage};

use crate::config::RelativeRect;
use crate::ocr::preprocess::region_luma;

/// Mean absolute luma difference of two equally sized crops, 0.0-1.0.
fn mean_abs_delta(a: &GrayImage, b: &GrayImage) -> Option<f32> {
    if a.dimensions() != b.dimensions() {
        return None;
    }
    let n = a.as_raw().len();
    if n == 0 {
        return Some(0.0);
    }
    let total: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| u64::from(x.abs_diff(y)))
        .sum();
    Some(total as f32 / n as f32 / 255.0)
}

/// Remembers the regions of the last frame let through and drops frames
/// whose regions all stayed within `threshold`.
pub struct FrameDiffer {
    regions: Vec<RelativeRect>,
    threshold: f32,
    previous: Option<Vec<GrayImage>>,
}

impl FrameDiffer {
    pub fn new(regions: Vec<RelativeRect>, threshold: f32) -> Self {
        let regions = if regions.is_empty() {
            vec![RelativeRect::FULL]
        } else {
            regions
        };
        Self {
            regions,
            threshold,
            previous: None,
        }
    }

    /// True when `frame` differs materially from the previously accepted
    /// frame; accepted frames become the new reference.
    pub fn accept(&mut self, frame: &RgbaImage) -> bool {
        let current: Vec<GrayImage> = self.regions.iter().map(|r| region_luma(frame, r)).collect();

        let changed = match &self.previous {
            None => true,
            Some(previous) => previous
                .iter()
                .zip(&current)
                .any(|(before, after)| mean_abs_delta(before, after).is_none_or(|d| d > self.threshold)),
        };

        if changed {
            self.previous = Some(current);
        }
        changed
    }
}
