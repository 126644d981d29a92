/// Where the reported motion sits horizontally in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DirectionLabel {
    Left,
    Center,
    Right,
    /// No region qualified this frame.
    #[default]
    None,
}

impl DirectionLabel {
    /// Buckets a centroid into thirds of the frame. Both inner boundaries
    /// belong to `Center`.
    pub fn from_centroid(centroid_x: u32, frame_width: u32) -> Self {
        let left_bound = frame_width / 3;
        let right_bound = 2 * frame_width / 3;
        if centroid_x < left_bound {
            DirectionLabel::Left
        } else if centroid_x > right_bound {
            DirectionLabel::Right
        } else {
            DirectionLabel::Center
        }
    }

    pub fn is_motion(&self) -> bool {
        !matches!(self, DirectionLabel::None)
    }

    /// Text shown to the user, if this label should change what is displayed.
    pub fn headline(&self) -> Option<&'static str> {
        match self {
            DirectionLabel::Left => Some("You are on LEFT"),
            DirectionLabel::Center => Some("You are in CENTER"),
            DirectionLabel::Right => Some("You are on RIGHT"),
            DirectionLabel::None => None,
        }
    }
}

impl std::fmt::Display for DirectionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DirectionLabel::Left => "LEFT",
            DirectionLabel::Center => "CENTER",
            DirectionLabel::Right => "RIGHT",
            DirectionLabel::None => "NONE",
        };
        f.write_str(s)
    }
}
