//! Composes the window contents from the newest monitor event.

use image::RgbImage;
use motion_compass::MonitorEvent;
use motion_compass::status::{DEVICE_UNAVAILABLE_TEXT, STOPPED_TEXT};
use opencv::{
    core::{self, Mat, Point, Rect, Scalar, Size},
    imgproc,
    prelude::*,
};

pub const WINDOW_NAME: &str = "Enhanced Motion Detection";
pub const CANVAS_WIDTH: i32 = 800;
pub const CANVAS_HEIGHT: i32 = 600;

const CONTROLS_HINT: &str = "[s] start  [x] stop  [q] quit";

/// Largest size with the source aspect ratio that fits in `max_w` x `max_h`.
pub fn fit_within(src_w: i32, src_h: i32, max_w: i32, max_h: i32) -> (i32, i32) {
    if src_w <= 0 || src_h <= 0 {
        return (0, 0);
    }
    let scale = f64::min(max_w as f64 / src_w as f64, max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as i32).clamp(1, max_w);
    let h = ((src_h as f64 * scale).round() as i32).clamp(1, max_h);
    (w, h)
}

/// Copies an RGB image into a fresh BGR `Mat`.
fn to_bgr_mat(frame: &RgbImage) -> opencv::Result<Mat> {
    let mut rgb = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    rgb.data_bytes_mut()?.copy_from_slice(frame.as_raw());

    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

/// Builds the full window image: the scaled frame centered on a black canvas,
/// the status line in red on top and the key hints at the bottom.
pub fn compose(event: &MonitorEvent, idle_status: &str) -> opencv::Result<Mat> {
    let mut canvas = Mat::new_rows_cols_with_default(
        CANVAS_HEIGHT,
        CANVAS_WIDTH,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;

    let status = match event {
        MonitorEvent::Frame(update) => {
            let bgr = to_bgr_mat(&update.frame)?;
            let (w, h) = fit_within(bgr.cols(), bgr.rows(), CANVAS_WIDTH, CANVAS_HEIGHT);
            if w > 0 && h > 0 {
                let mut scaled = Mat::default();
                imgproc::resize(&bgr, &mut scaled, Size::new(w, h), 0.0, 0.0, imgproc::INTER_AREA)?;
                let rect = Rect::new((CANVAS_WIDTH - w) / 2, (CANVAS_HEIGHT - h) / 2, w, h);
                let mut roi = Mat::roi(&canvas, rect)?;
                scaled.copy_to(&mut roi)?;
            }
            update.status
        }
        MonitorEvent::Idle => idle_status,
        MonitorEvent::Stopped => STOPPED_TEXT,
        MonitorEvent::DeviceUnavailable(_) => DEVICE_UNAVAILABLE_TEXT,
    };

    imgproc::put_text(
        &mut canvas,
        status,
        Point::new(20, 40),
        imgproc::FONT_HERSHEY_SIMPLEX,
        1.0,
        Scalar::new(0.0, 0.0, 255.0, 0.0),
        2,
        imgproc::LINE_AA,
        false,
    )?;
    imgproc::put_text(
        &mut canvas,
        CONTROLS_HINT,
        Point::new(20, CANVAS_HEIGHT - 20),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.6,
        Scalar::all(200.0),
        1,
        imgproc::LINE_AA,
        false,
    )?;

    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_keeps_aspect_ratio() {
        assert_eq!(fit_within(640, 480, 800, 600), (800, 600));
        assert_eq!(fit_within(1280, 720, 800, 600), (800, 450));
        assert_eq!(fit_within(300, 600, 800, 600), (300, 600));
        assert_eq!(fit_within(0, 480, 800, 600), (0, 0));
    }
}
