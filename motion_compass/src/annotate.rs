//! Drawing motion rectangles onto the display frame.

use crate::core_modules::region::MotionRegion;
use image::{Rgb, RgbImage};

pub const MOTION_BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const MOTION_BOX_THICKNESS: u32 = 2;

/// Outlines every region with the default green 2 px stroke.
pub fn annotate(frame: &mut RgbImage, regions: &[MotionRegion]) {
    for region in regions {
        draw_region(frame, region, MOTION_BOX_COLOR, MOTION_BOX_THICKNESS);
    }
}

/// Draws the outline of `region` with the stroke inside the rectangle,
/// clipped to the frame.
pub fn draw_region(frame: &mut RgbImage, region: &MotionRegion, color: Rgb<u8>, thickness: u32) {
    let (fw, fh) = frame.dimensions();
    let x0 = region.x.min(fw);
    let y0 = region.y.min(fh);
    let x1 = region.right().min(fw);
    let y1 = region.bottom().min(fh);
    if x0 >= x1 || y0 >= y1 || thickness == 0 {
        return;
    }

    for y in y0..y1 {
        let on_horizontal_edge = y < region.y + thickness || y + thickness >= region.bottom();
        for x in x0..x1 {
            let on_vertical_edge = x < region.x + thickness || x + thickness >= region.right();
            if on_horizontal_edge || on_vertical_edge {
                frame.put_pixel(x, y, color);
            }
        }
    }
}
