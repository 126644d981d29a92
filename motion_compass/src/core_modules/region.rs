// THEORY:
// A `MotionRegion` is the spatial summary of one connected patch of change in
// the motion mask: the axis-aligned rectangle that encloses it. It is a plain
// data container for a single frame and has no memory of earlier frames.
//
// Selection: every region whose rectangle area is above the noise floor
// qualifies, and the LAST qualifying region in enumeration order speaks for the
// frame. Regions are not merged or ranked by size. Callers that want the
// biggest motion ask for it through `largest`.

/// A simple struct to represent a 2D pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Axis-aligned bounding rectangle of one connected region of change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MotionRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl MotionRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds the rectangle spanning two inclusive corners.
    pub fn from_corners(top_left: Point, bottom_right: Point) -> Self {
        Self::new(
            top_left.x,
            top_left.y,
            bottom_right.x - top_left.x + 1,
            bottom_right.y - top_left.y + 1,
        )
    }

    /// Rectangle area in square pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Horizontal center, rounded down.
    pub fn centroid_x(&self) -> u32 {
        self.x + self.width / 2
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// Keeps the regions whose area is strictly greater than `min_area`,
/// preserving enumeration order.
pub fn qualifying(regions: &[MotionRegion], min_area: u64) -> Vec<MotionRegion> {
    regions
        .iter()
        .copied()
        .filter(|r| r.area() > min_area)
        .collect()
}

/// The region that speaks for the frame: the last one in enumeration order.
pub fn select_last(qualifying: &[MotionRegion]) -> Option<MotionRegion> {
    qualifying.last().copied()
}

/// The biggest region by area; ties go to the earliest.
pub fn largest(regions: &[MotionRegion]) -> Option<MotionRegion> {
    regions
        .iter()
        .copied()
        .fold(None, |best: Option<MotionRegion>, r| match best {
            Some(b) if b.area() >= r.area() => Some(b),
            _ => Some(r),
        })
}
