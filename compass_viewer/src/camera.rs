//! OpenCV-backed capture device.

use image::RgbImage;
use motion_compass::{CompassError, FrameSource, Result, SourceOpener};
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};

fn cv_err(err: opencv::Error) -> CompassError {
    CompassError::capture(err.to_string())
}

/// Opens local cameras by index through `videoio`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenCvOpener;

impl SourceOpener for OpenCvOpener {
    type Source = OpenCvCamera;

    fn open(&self, device_index: u32) -> Result<OpenCvCamera> {
        let unavailable = |err: opencv::Error| CompassError::device_unavailable(device_index, err.to_string());

        let cap = VideoCapture::new(device_index as i32, videoio::CAP_ANY).map_err(unavailable)?;
        if !cap.is_opened().map_err(unavailable)? {
            return Err(CompassError::device_unavailable(device_index, "camera not detected"));
        }
        Ok(OpenCvCamera {
            cap,
            bgr: Mat::default(),
            rgb: Mat::default(),
        })
    }
}

/// A `VideoCapture` plus reusable conversion buffers.
pub struct OpenCvCamera {
    cap: VideoCapture,
    bgr: Mat,
    rgb: Mat,
}

impl FrameSource for OpenCvCamera {
    /// Negative or NaN properties come back as 0, which makes the capture loop
    /// measure thirds against each frame's own width.
    fn resolution(&self) -> Result<(u32, u32)> {
        let width = self.cap.get(videoio::CAP_PROP_FRAME_WIDTH).map_err(cv_err)?;
        let height = self.cap.get(videoio::CAP_PROP_FRAME_HEIGHT).map_err(cv_err)?;
        Ok((width.max(0.0) as u32, height.max(0.0) as u32))
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        if !self.cap.read(&mut self.bgr).map_err(cv_err)? || self.bgr.empty() {
            return Ok(None);
        }

        // OpenCV hands out BGR; the classifier works on RGB.
        imgproc::cvt_color(&self.bgr, &mut self.rgb, imgproc::COLOR_BGR2RGB, 0).map_err(cv_err)?;
        let width = self.rgb.cols() as u32;
        let height = self.rgb.rows() as u32;
        let bytes = self.rgb.data_bytes().map_err(cv_err)?.to_vec();

        // A buffer that does not match its header is treated as an empty frame.
        Ok(RgbImage::from_raw(width, height, bytes))
    }

    fn release(&mut self) -> Result<()> {
        self.cap.release().map_err(cv_err)
    }
}
