// THEORY:
// The `classifier` module is the top-level API for a single frame. It chains the
// kernels from `core_modules` into the frame-differencing pipeline and turns the
// result into a LEFT / CENTER / RIGHT answer.
//
// The only memory the classifier has is the previous blurred grayscale frame,
// and even that is not hidden inside it. `ClassifierState` is handed to
// `classify` and a fresh state comes back alongside the answer, so the caller
// always owns the history and a failed call leaves the old state untouched.
//
// Pipeline stages for one frame:
// 1.  Luma conversion and Gaussian smoothing of the current frame.
// 2.  Absolute difference against the previous smoothed frame.
// 3.  Binary threshold, then dilation to merge fragments.
// 4.  External contours and their bounding rectangles.
// 5.  Noise-floor filter and last-wins selection.
// 6.  Horizontal bucketing of the selected centroid.

use crate::core_modules::contours::external_regions;
use crate::core_modules::direction::DirectionLabel;
use crate::core_modules::filters;
use crate::core_modules::region::{self, MotionRegion};
use crate::error::{CompassError, Result};
use image::{GrayImage, RgbImage};
use serde::Deserialize;

/// Tunable parameters of the motion pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Side of the square Gaussian window. Must be odd.
    pub blur_kernel_size: u32,
    /// Gaussian sigma. Zero or negative derives it from the kernel size.
    pub blur_sigma: f64,
    /// Minimum absolute difference that counts as change.
    pub diff_threshold: u8,
    pub dilate_iterations: u32,
    /// Rectangles must have an area strictly greater than this.
    pub min_region_area: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: 21,
            blur_sigma: 0.0,
            diff_threshold: 25,
            dilate_iterations: 2,
            min_region_area: 1500,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return Err(CompassError::invalid_config(format!(
                "blur kernel size must be odd and positive, got {}",
                self.blur_kernel_size
            )));
        }
        if !self.blur_sigma.is_finite() {
            return Err(CompassError::invalid_config("blur sigma must be finite"));
        }
        Ok(())
    }

    /// Luma conversion followed by Gaussian smoothing.
    pub fn preprocess(&self, frame: &RgbImage) -> GrayImage {
        let gray = filters::to_grayscale(frame);
        filters::gaussian_blur(&gray, self.blur_kernel_size, self.blur_sigma)
    }
}

/// The previous blurred grayscale frame. Nothing older is kept.
#[derive(Debug, Clone)]
pub struct ClassifierState {
    previous: GrayImage,
}

impl ClassifierState {
    /// Builds the first state from a frame.
    pub fn prime(frame: &RgbImage, config: &ClassifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            previous: config.preprocess(frame),
        })
    }

    /// Wraps an already blurred grayscale frame.
    pub fn from_blurred(previous: GrayImage) -> Self {
        Self { previous }
    }

    pub fn previous(&self) -> &GrayImage {
        &self.previous
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.previous.dimensions()
    }
}

/// The answer for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification {
    pub direction: DirectionLabel,
    /// The region that decided `direction`: the last qualifying one.
    pub region: Option<MotionRegion>,
    /// Every region above the noise floor, in enumeration order.
    pub regions: Vec<MotionRegion>,
}

impl Classification {
    pub fn centroid_x(&self) -> Option<u32> {
        self.region.map(|r| r.centroid_x())
    }

    /// The biggest qualifying region. Never used for `direction`.
    pub fn largest_region(&self) -> Option<MotionRegion> {
        region::largest(&self.regions)
    }
}

/// Runs stages 2-4 on two smoothed frames of equal size and returns every
/// external region, qualifying or not.
pub fn detect_regions(
    previous: &GrayImage,
    current: &GrayImage,
    config: &ClassifierConfig,
) -> Vec<MotionRegion> {
    let diff = filters::absolute_difference(previous, current);
    let mask = filters::threshold(&diff, config.diff_threshold);
    let mask = filters::dilate(&mask, config.dilate_iterations);
    external_regions(&mask)
}

/// Classifies `current` against `state` and returns the answer together with
/// the state for the next frame.
///
/// `frame_width` is the width the thirds are measured against; normally the
/// native width reported by the capture device.
pub fn classify(
    state: &ClassifierState,
    current: &RgbImage,
    frame_width: u32,
    config: &ClassifierConfig,
) -> Result<(Classification, ClassifierState)> {
    config.validate()?;
    if state.dimensions() != current.dimensions() {
        return Err(CompassError::FrameMismatch {
            previous: state.dimensions(),
            current: current.dimensions(),
        });
    }

    // --- 1. Smoothing ---
    let blurred = config.preprocess(current);

    // --- 2-4. Difference, mask, contours ---
    let all_regions = detect_regions(&state.previous, &blurred, config);

    // --- 5. Noise floor & last-wins selection ---
    let regions = region::qualifying(&all_regions, config.min_region_area);
    let selected = region::select_last(&regions);

    // --- 6. Bucketing ---
    let direction = match selected {
        Some(r) => DirectionLabel::from_centroid(r.centroid_x(), frame_width),
        None => DirectionLabel::None,
    };

    log::trace!(
        "classified frame: {} candidate(s), {} qualifying, direction {}",
        all_regions.len(),
        regions.len(),
        direction
    );

    Ok((
        Classification {
            direction,
            region: selected,
            regions,
        },
        ClassifierState::from_blurred(blurred),
    ))
}
