//! Grayscale conversion and the binary-mask preprocessing chain (spec.md
//! §4.1.1): Gaussian blur, adaptive threshold against a local mean, then a
//! morphological closing to seal single-pixel gaps in strokes.

use image::{GenericImageView, GrayImage, Luma, Rgba};
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{close, Norm};

/// Converts an RGBA raster to 8-bit grayscale via the Rec.601 luminance
/// weights spec.md §4.1.1 specifies, rather than `image`'s default
/// `to_luma8` (which uses slightly different coefficients) — needed so the
/// same input bytes always produce the same grayscale values regardless of
/// which version of the `image` crate a future reader's environment has.
pub fn to_luminance_grayscale(image: &impl GenericImageView<Pixel = Rgba<u8>>) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let p = image.get_pixel(x, y);
            let r = p.0[0] as f64;
            let g = p.0[1] as f64;
            let b = p.0[2] as f64;
            let lum = 0.299 * r + 0.587 * g + 0.114 * b;
            out.put_pixel(x, y, Luma([lum.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// 5x5-kernel Gaussian blur (`sigma` ≈ 1.0 by default) to suppress sensor
/// noise ahead of thresholding.
pub fn blur(gray: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(gray, sigma)
}

/// Adaptive binary threshold: compares each pixel against the mean of its
/// `block_size x block_size` neighbourhood minus `constant`. Output is a
/// strict 0/255 mask where 255 = foreground (ink-dark) pixels — i.e. pixels
/// *darker* than their local neighbourhood, which is what "ink on paper"
/// looks like in a grayscale raster.
///
/// Implemented against a summed-area table rather than `imageproc`'s
/// `adaptive_threshold` (which has no constant-subtraction term) so the
/// local-mean-minus-C comparison spec.md asks for is exact.
pub fn adaptive_threshold(gray: &GrayImage, block_size: u32, constant: f64) -> GrayImage {
    let width = gray.width();
    let height = gray.height();
    let radius = (block_size / 2).max(1) as i64;

    // Summed-area table with a one-pixel zero border for O(1) rectangle
    // sums.
    let w = width as usize + 1;
    let h = height as usize + 1;
    let mut integral = vec![0i64; w * h];
    for y in 0..height as usize {
        let mut row_sum = 0i64;
        for x in 0..width as usize {
            row_sum += gray.get_pixel(x as u32, y as u32).0[0] as i64;
            integral[(y + 1) * w + (x + 1)] = integral[y * w + (x + 1)] + row_sum;
        }
    }

    let sum_rect = |x0: i64, y0: i64, x1: i64, y1: i64| -> (i64, i64) {
        let x0 = x0.clamp(0, width as i64) as usize;
        let y0 = y0.clamp(0, height as i64) as usize;
        let x1 = x1.clamp(0, width as i64) as usize;
        let y1 = y1.clamp(0, height as i64) as usize;
        let area = ((x1 - x0) * (y1 - y0)) as i64;
        let sum = integral[y1 * w + x1] - integral[y0 * w + x1] - integral[y1 * w + x0]
            + integral[y0 * w + x0];
        (sum, area)
    };

    let mut out = GrayImage::new(width, height);
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let (sum, area) = sum_rect(x - radius, y - radius, x + radius + 1, y + radius + 1);
            let mean = if area > 0 { sum as f64 / area as f64 } else { 0.0 };
            let pixel = gray.get_pixel(x as u32, y as u32).0[0] as f64;
            let foreground = pixel < mean - constant;
            out.put_pixel(x as u32, y as u32, Luma([if foreground { 255 } else { 0 }]));
        }
    }
    out
}

/// Morphological closing with a 3x3 rectangular structuring element
/// (Chebyshev radius 1), sealing single-pixel gaps in strokes.
pub fn close_gaps(binary: &GrayImage, radius: u32) -> GrayImage {
    close(binary, Norm::LInf, radius as u8)
}
