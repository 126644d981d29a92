// THEORY:
// The contour finder is the spatial grouping step of the classifier. It takes
// the binary motion mask for one frame and reports the bounding rectangle of
// every OUTERMOST connected region of foreground.
//
// Algorithm steps:
// 1.  **Outside Flood**: Background pixels reachable from beyond the image
//     border (4-connected) are marked as "outside". The image is treated as if
//     it were padded with background, so anything touching the border is
//     reachable.
// 2.  **Component Growing**: The mask is scanned in raster order. Every unvisited
//     foreground pixel seeds a new region, grown with an 8-connected search.
//     The region records its bounding box and whether any of its pixels touches
//     the outside (a 4-neighbor that is outside, or the image border).
// 3.  **External Filter**: A region that never touches the outside lies inside a
//     hole of another region. Its boundary is a nested contour and it is
//     dropped. Holes of a region never affect that region's own rectangle.
//
// Output order is the raster order of each region's first pixel. The
// classifier's last-wins selection depends on this order.
//
// The finder is stateless. It knows nothing about earlier frames.

use crate::core_modules::region::{MotionRegion, Point};
use image::GrayImage;

const FOUR_NEIGHBORS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Returns the bounding rectangles of all external contours in `mask`.
/// Any non-zero pixel counts as foreground.
pub fn external_regions(mask: &GrayImage) -> Vec<MotionRegion> {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let w = width as usize;
    let h = height as usize;
    let foreground: Vec<bool> = mask.as_raw().iter().map(|&v| v != 0).collect();

    // --- 1. Outside Flood ---
    let outside = flood_outside(&foreground, w, h);

    // --- 2. Component Growing ---
    let mut visited = vec![false; w * h];
    let mut regions = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if !foreground[idx] || visited[idx] {
                continue;
            }
            let seed = Point {
                x: x as u32,
                y: y as u32,
            };
            let (top_left, bottom_right, external) =
                grow_region(seed, &foreground, &outside, &mut visited, w, h);

            // --- 3. External Filter ---
            if external {
                regions.push(MotionRegion::from_corners(top_left, bottom_right));
            }
        }
    }

    regions
}

/// Marks background pixels connected to the area beyond the image border.
fn flood_outside(foreground: &[bool], w: usize, h: usize) -> Vec<bool> {
    let mut outside = vec![false; w * h];
    let mut stack: Vec<usize> = Vec::new();

    let seed = |x: usize, y: usize, outside: &mut Vec<bool>, stack: &mut Vec<usize>| {
        let idx = y * w + x;
        if !foreground[idx] && !outside[idx] {
            outside[idx] = true;
            stack.push(idx);
        }
    };
    for x in 0..w {
        seed(x, 0, &mut outside, &mut stack);
        seed(x, h - 1, &mut outside, &mut stack);
    }
    for y in 0..h {
        seed(0, y, &mut outside, &mut stack);
        seed(w - 1, y, &mut outside, &mut stack);
    }

    while let Some(idx) = stack.pop() {
        let x = (idx % w) as i32;
        let y = (idx / w) as i32;
        for (dx, dy) in &FOUR_NEIGHBORS {
            let nx = x + dx;
            let ny = y + dy;
            if nx >= 0 && nx < w as i32 && ny >= 0 && ny < h as i32 {
                let n = ny as usize * w + nx as usize;
                if !foreground[n] && !outside[n] {
                    outside[n] = true;
                    stack.push(n);
                }
            }
        }
    }

    outside
}

/// Depth-first growth of one 8-connected foreground region.
fn grow_region(
    seed: Point,
    foreground: &[bool],
    outside: &[bool],
    visited: &mut [bool],
    w: usize,
    h: usize,
) -> (Point, Point, bool) {
    let mut stack = vec![seed];
    visited[seed.y as usize * w + seed.x as usize] = true;

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut external = false;

    while let Some(current) = stack.pop() {
        min_x = min_x.min(current.x);
        min_y = min_y.min(current.y);
        max_x = max_x.max(current.x);
        max_y = max_y.max(current.y);

        let cx = current.x as i32;
        let cy = current.y as i32;

        if !external {
            external = FOUR_NEIGHBORS.iter().any(|(dx, dy)| {
                let nx = cx + dx;
                let ny = cy + dy;
                nx < 0
                    || ny < 0
                    || nx >= w as i32
                    || ny >= h as i32
                    || outside[ny as usize * w + nx as usize]
            });
        }

        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = cx + dx;
                let ny = cy + dy;
                if nx >= 0 && nx < w as i32 && ny >= 0 && ny < h as i32 {
                    let n = ny as usize * w + nx as usize;
                    if foreground[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(Point {
                            x: nx as u32,
                            y: ny as u32,
                        });
                    }
                }
            }
        }
    }

    (Point { x: min_x, y: min_y }, Point { x: max_x, y: max_y }, external)
}
