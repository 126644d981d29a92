// THEORY:
// This file is the main entry point for the `motion_compass` library crate.
//
// The public API has two levels. `classifier` answers the question for a single
// frame: given the previous smoothed frame and a new color frame, where is the
// motion? `monitor` wraps that in a running system: a capture device, one
// background loop, Start/Stop control and a last-value channel that a window or
// a logger can read from.
//
// The image kernels in `core_modules` are public for testing and reuse, but
// they carry no policy of their own.

pub mod annotate;
pub mod classifier;
pub mod config;
pub mod core_modules;
pub mod error;
pub mod monitor;
pub mod status;

pub use classifier::{Classification, ClassifierConfig, ClassifierState, classify};
pub use config::MonitorConfig;
pub use core_modules::direction::DirectionLabel;
pub use core_modules::region::MotionRegion;
pub use error::{CompassError, Result};
pub use monitor::{
    FrameSource, FrameUpdate, MonitorEvent, MonitorState, MotionMonitor, SourceOpener,
    StartOutcome,
};
