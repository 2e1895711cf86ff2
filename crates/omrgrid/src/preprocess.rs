//! Photometric preprocessing: grayscale, smoothing, binarization.
//!
//! Binarization is an inverted adaptive mean threshold: a pixel becomes
//! foreground (255) when it is darker than its local block mean by more
//! than a fixed offset. The offset is what keeps flat paper regions from
//! flipping on sensor noise; `imageproc`'s adaptive threshold exposes no
//! offset, so the operation is implemented here over an integral image.

use image::{GrayImage, RgbImage};

/// Convert to single-channel intensity.
pub fn to_gray(image: &RgbImage) -> GrayImage {
    image::imageops::grayscale(image)
}

/// Gaussian smoothing pass.
pub fn blur(gray: &GrayImage, sigma: f32) -> GrayImage {
    imageproc::filter::gaussian_blur_f32(gray, sigma)
}

/// Summed-area table with a one-pixel zero border, row-major,
/// `(width + 1) * (height + 1)` entries.
fn integral(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = w as usize + 1;
    let mut table = vec![0u64; stride * (h as usize + 1)];
    for y in 0..h as usize {
        let mut row_sum = 0u64;
        for x in 0..w as usize {
            row_sum += gray.as_raw()[y * w as usize + x] as u64;
            table[(y + 1) * stride + (x + 1)] = table[y * stride + (x + 1)] + row_sum;
        }
    }
    table
}

/// Mean intensity over the clamped window centered at `(x, y)` with
/// half-size `r`.
fn block_mean(table: &[u64], w: u32, h: u32, x: u32, y: u32, r: u32) -> f32 {
    let stride = w as usize + 1;
    let x0 = x.saturating_sub(r) as usize;
    let y0 = y.saturating_sub(r) as usize;
    let x1 = (x + r + 1).min(w) as usize;
    let y1 = (y + r + 1).min(h) as usize;
    let sum = table[y1 * stride + x1] + table[y0 * stride + x0]
        - table[y0 * stride + x1]
        - table[y1 * stride + x0];
    let count = ((x1 - x0) * (y1 - y0)) as f32;
    sum as f32 / count
}

/// Inverted adaptive mean threshold.
///
/// `block_size` is the full side of the averaging window (odd, e.g. 11);
/// `offset` is subtracted from the local mean before comparison. Output is
/// 255 where `pixel < mean - offset`, 0 elsewhere, so ink is foreground.
pub fn adaptive_threshold_inv(gray: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let mut out = GrayImage::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }
    let r = block_size.max(3) / 2;
    let table = integral(gray);
    for y in 0..h {
        for x in 0..w {
            let mean = block_mean(&table, w, h, x, y, r);
            let v = gray.get_pixel(x, y)[0] as f32;
            if v < mean - offset {
                out.put_pixel(x, y, image::Luma([255]));
            }
        }
    }
    out
}

/// Fraction of foreground pixels in the square window of half-size
/// `radius` centered at `center`, clamped to the image bounds.
///
/// Returns 0.0 for a window fully outside the image.
pub fn window_fill_ratio(binary: &GrayImage, center: [f64; 2], radius: u32) -> f64 {
    let (w, h) = binary.dimensions();
    if w == 0 || h == 0 {
        return 0.0;
    }
    let cx = center[0].round() as i64;
    let cy = center[1].round() as i64;
    let r = radius as i64;
    let x0 = (cx - r).clamp(0, w as i64 - 1) as u32;
    let y0 = (cy - r).clamp(0, h as i64 - 1) as u32;
    let x1 = (cx + r).clamp(0, w as i64 - 1) as u32;
    let y1 = (cy + r).clamp(0, h as i64 - 1) as u32;

    let mut filled = 0u64;
    let mut total = 0u64;
    for y in y0..=y1 {
        for x in x0..=x1 {
            total += 1;
            if binary.get_pixel(x, y)[0] > 0 {
                filled += 1;
            }
        }
    }
    if total == 0 {
        return 0.0;
    }
    filled as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn uniform(w: u32, h: u32, v: u8) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([v]))
    }

    #[test]
    fn flat_paper_stays_background() {
        let gray = uniform(40, 40, 230);
        let bin = adaptive_threshold_inv(&gray, 11, 1.5);
        assert!(bin.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn dark_blob_becomes_foreground() {
        let mut gray = uniform(40, 40, 230);
        for y in 15..25 {
            for x in 15..25 {
                gray.put_pixel(x, y, Luma([30]));
            }
        }
        let bin = adaptive_threshold_inv(&gray, 11, 1.5);
        // Boundary pixels of the blob sit well below their mixed-block mean.
        assert!(bin.get_pixel(15, 15)[0] == 255);
        assert!(bin.get_pixel(24, 20)[0] == 255);
        // Far-away paper is untouched.
        assert_eq!(bin.get_pixel(2, 2)[0], 0);
    }

    #[test]
    fn integral_block_mean_matches_direct() {
        let mut gray = uniform(9, 9, 0);
        for y in 0..9 {
            for x in 0..9 {
                gray.put_pixel(x, y, Luma([(x * 10 + y) as u8]));
            }
        }
        let table = integral(&gray);
        let mean = block_mean(&table, 9, 9, 4, 4, 2);
        let mut direct = 0f32;
        for y in 2..=6 {
            for x in 2..=6u32 {
                direct += gray.get_pixel(x, y)[0] as f32;
            }
        }
        direct /= 25.0;
        assert!((mean - direct).abs() < 1e-4);
    }

    #[test]
    fn fill_ratio_counts_window_foreground() {
        let mut bin = uniform(30, 30, 0);
        for y in 10..20 {
            for x in 10..20 {
                bin.put_pixel(x, y, Luma([255]));
            }
        }
        // Window exactly covering the filled square.
        let r = window_fill_ratio(&bin, [14.5, 14.5], 5);
        assert!(r > 0.7, "ratio {}", r);
        // Window on empty paper.
        assert_eq!(window_fill_ratio(&bin, [3.0, 3.0], 2), 0.0);
    }

    #[test]
    fn fill_ratio_clamps_at_borders() {
        let bin = uniform(10, 10, 255);
        let r = window_fill_ratio(&bin, [0.0, 0.0], 8);
        assert!((r - 1.0).abs() < 1e-12);
    }
}
