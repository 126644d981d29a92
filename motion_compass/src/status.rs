//! The sticky label text shown next to the video feed.

use crate::core_modules::direction::DirectionLabel;

pub const WAITING_TEXT: &str = "Waiting for motion...";
pub const STOPPED_TEXT: &str = "Camera stopped.";
pub const DEVICE_UNAVAILABLE_TEXT: &str = "Error: Camera not detected!";

/// Holds the last thing worth telling the user. A frame without motion does
/// not clear it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLine {
    text: &'static str,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self { text: WAITING_TEXT }
    }
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &'static str {
        self.text
    }

    /// Returns true when the text changed.
    pub fn apply(&mut self, direction: DirectionLabel) -> bool {
        match direction.headline() {
            Some(text) if text != self.text => {
                self.text = text;
                true
            }
            _ => false,
        }
    }

    pub fn mark_stopped(&mut self) {
        self.text = STOPPED_TEXT;
    }

    pub fn mark_device_unavailable(&mut self) {
        self.text = DEVICE_UNAVAILABLE_TEXT;
    }
}
