// THEORY:
// The `filters` module holds the per-pixel and neighborhood kernels the
// classifier chains together for every frame: luma conversion, Gaussian
// smoothing, absolute differencing, binary thresholding and morphological
// dilation.
//
// Every kernel is a stateless function from an input image to a freshly
// allocated output image of the same dimensions. None of them know anything
// about motion; the `classifier` decides the order and the parameters.
//
// Border handling:
// - Blur reflects without repeating the edge pixel (`gfedcb|abcdefgh|gfedcba`).
// - Dilation ignores pixels outside the image.

use image::{GrayImage, Luma, RgbImage};

/// Fixed-point BT.601 luma weights (R, G, B) scaled by 2^14.
const LUMA_WEIGHTS: [u32; 3] = [4899, 9617, 1868];
const LUMA_SHIFT: u32 = 14;

/// Converts an RGB frame to 8-bit luma using BT.601 weights.
pub fn to_grayscale(frame: &RgbImage) -> GrayImage {
    let (width, height) = frame.dimensions();
    let mut gray = GrayImage::new(width, height);
    for (src, dst) in frame.pixels().zip(gray.pixels_mut()) {
        let [r, g, b] = src.0;
        let luma = r as u32 * LUMA_WEIGHTS[0]
            + g as u32 * LUMA_WEIGHTS[1]
            + b as u32 * LUMA_WEIGHTS[2]
            + (1 << (LUMA_SHIFT - 1));
        dst.0[0] = (luma >> LUMA_SHIFT) as u8;
    }
    gray
}

/// Standard deviation derived from the kernel size when none is given.
pub fn sigma_for_kernel(kernel_size: u32) -> f64 {
    0.3 * ((kernel_size as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Builds a normalized 1D Gaussian kernel. A non-positive `sigma` is derived
/// from the kernel size.
pub fn gaussian_kernel(kernel_size: u32, sigma: f64) -> Vec<f32> {
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        sigma_for_kernel(kernel_size)
    };
    let center = (kernel_size as f64 - 1.0) * 0.5;
    let scale = -0.5 / (sigma * sigma);

    let raw: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let d = i as f64 - center;
            (scale * d * d).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|v| (v / sum) as f32).collect()
}

/// Maps an out-of-range coordinate back into `0..len` by reflection without
/// repeating the edge pixel.
fn reflect_101(mut i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    while i < 0 || i > last {
        if i < 0 {
            i = -i;
        }
        if i > last {
            i = 2 * last - i;
        }
    }
    i as usize
}

/// Separable Gaussian blur with a square `kernel_size` x `kernel_size` window.
pub fn gaussian_blur(src: &GrayImage, kernel_size: u32, sigma: f64) -> GrayImage {
    let (width, height) = src.dimensions();
    if width == 0 || height == 0 {
        return src.clone();
    }
    let kernel = gaussian_kernel(kernel_size, sigma);
    let radius = (kernel_size / 2) as isize;
    let (w, h) = (width as usize, height as usize);
    let data = src.as_raw();

    // --- 1. Horizontal pass ---
    let mut horizontal = vec![0f32; w * h];
    for y in 0..h {
        let row = &data[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = reflect_101(x as isize + k as isize - radius, w);
                acc += row[sx] as f32 * weight;
            }
            horizontal[y * w + x] = acc;
        }
    }

    // --- 2. Vertical pass ---
    let mut out = GrayImage::new(width, height);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = reflect_101(y as isize + k as isize - radius, h);
                acc += horizontal[sy * w + x] * weight;
            }
            out.put_pixel(x as u32, y as u32, Luma([acc.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Per-pixel `|a - b|`. Both images must have the same dimensions.
pub fn absolute_difference(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    let mut out = GrayImage::new(a.width(), a.height());
    for ((pa, pb), dst) in a.pixels().zip(b.pixels()).zip(out.pixels_mut()) {
        dst.0[0] = pa.0[0].abs_diff(pb.0[0]);
    }
    out
}

/// Binary threshold: intensities at or above `level` become 255, the rest 0.
pub fn threshold(src: &GrayImage, level: u8) -> GrayImage {
    let mut out = GrayImage::new(src.width(), src.height());
    for (p, dst) in src.pixels().zip(out.pixels_mut()) {
        dst.0[0] = if p.0[0] >= level { 255 } else { 0 };
    }
    out
}

/// Dilates with a 3x3 rectangular structuring element, `iterations` times.
pub fn dilate(src: &GrayImage, iterations: u32) -> GrayImage {
    let mut current = src.clone();
    for _ in 0..iterations {
        current = dilate_once(&current);
    }
    current
}

fn dilate_once(src: &GrayImage) -> GrayImage {
    let (width, height) = src.dimensions();
    let (w, h) = (width as usize, height as usize);
    let data = src.as_raw();

    // A 3x3 rectangle is separable: max over rows, then over columns.
    let mut rows = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let lo = x.saturating_sub(1);
            let hi = (x + 1).min(w - 1);
            rows[y * w + x] = data[y * w + lo..=y * w + hi].iter().copied().max().unwrap_or(0);
        }
    }

    let mut out = GrayImage::new(width, height);
    for y in 0..h {
        let lo = y.saturating_sub(1);
        let hi = (y + 1).min(h - 1);
        for x in 0..w {
            let v = (lo..=hi).map(|yy| rows[yy * w + x]).max().unwrap_or(0);
            out.put_pixel(x as u32, y as u32, Luma([v]));
        }
    }
    out
}
