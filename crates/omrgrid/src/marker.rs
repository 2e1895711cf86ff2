//! Corner fiducial candidate detection.
//!
//! Candidates are connected-region outlines that simultaneously
//! approximate to a quadrilateral, have square-ish bounds, pass a
//! near-circular compactness band, and sit on a locally dense blob of
//! ink. The quad + compactness combination selects the printed square
//! fiducials while rejecting text blocks and the sheet border.

use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::geometry::{approximate_polygon_dp, arc_length};

use crate::preprocess;
use crate::shape;

/// Tunable thresholds for fiducial candidate detection.
#[derive(Debug, Clone)]
pub struct MarkerDetectConfig {
    /// Gaussian sigma for the smoothing pass.
    pub blur_sigma: f32,
    /// Adaptive threshold averaging block side (odd).
    pub block_size: u32,
    /// Adaptive threshold mean offset.
    pub mean_offset: f32,
    /// Polygon approximation tolerance as a fraction of contour perimeter.
    pub poly_epsilon_frac: f64,
    /// Minimum quad area in px² (noise floor).
    pub min_area: f64,
    /// Maximum quad area in px² (plausible marker size).
    pub max_area: f64,
    /// Bounding-box aspect ratio band.
    pub min_aspect: f64,
    pub max_aspect: f64,
    /// Compactness (4πA/P²) band over the full contour.
    pub min_compactness: f64,
    pub max_compactness: f64,
    /// Half-size of the local fill-density window around a candidate.
    pub fill_window_radius: u32,
    /// Minimum local fill density (rejects faint artifacts).
    pub min_fill: f64,
}

impl Default for MarkerDetectConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            block_size: 11,
            mean_offset: 1.5,
            poly_epsilon_frac: 0.02,
            min_area: 80.0,
            max_area: 8000.0,
            min_aspect: 0.7,
            max_aspect: 1.3,
            min_compactness: 0.6,
            max_compactness: 1.3,
            fill_window_radius: 10,
            min_fill: 0.25,
        }
    }
}

/// Detect candidate fiducial centers in a raw grayscale photograph.
///
/// Returns the centroids of all surviving candidates; may be empty.
/// The caller decides whether enough markers were found.
pub fn find_marker_candidates(gray: &GrayImage, config: &MarkerDetectConfig) -> Vec<[f64; 2]> {
    let blurred = preprocess::blur(gray, config.blur_sigma);
    let binary = preprocess::adaptive_threshold_inv(&blurred, config.block_size, config.mean_offset);

    let contours = find_contours::<i32>(&binary);
    let mut centers = Vec::new();

    for contour in &contours {
        if contour.points.len() < 4 {
            continue;
        }
        let perimeter = arc_length(&contour.points, true);
        if perimeter <= 0.0 {
            continue;
        }
        let approx =
            approximate_polygon_dp(&contour.points, config.poly_epsilon_frac * perimeter, true);
        if approx.len() != 4 {
            continue;
        }

        let quad_area = shape::polygon_area(&approx);
        if quad_area < config.min_area || quad_area > config.max_area {
            continue;
        }
        let bounds = match shape::Bounds::of(&approx) {
            Some(b) => b,
            None => continue,
        };
        let aspect = bounds.aspect_ratio();
        if aspect < config.min_aspect || aspect > config.max_aspect {
            continue;
        }

        let contour_area = shape::polygon_area(&contour.points);
        let compact = shape::compactness(contour_area, perimeter);
        if compact < config.min_compactness || compact > config.max_compactness {
            continue;
        }

        let center = shape::centroid(&approx);
        let fill = preprocess::window_fill_ratio(&binary, center, config.fill_window_radius);
        if fill <= config.min_fill {
            continue;
        }

        centers.push(center);
    }

    tracing::debug!(
        "{} fiducial candidates from {} contours",
        centers.len(),
        contours.len()
    );
    centers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SheetLayout;
    use crate::render::render_sheet;

    #[test]
    fn blank_image_yields_no_candidates() {
        let gray = GrayImage::from_pixel(200, 200, image::Luma([235]));
        let found = find_marker_candidates(&gray, &MarkerDetectConfig::default());
        assert!(found.is_empty());
    }

    #[test]
    fn finds_all_four_sheet_fiducials() {
        let layout = SheetLayout::default();
        let sheet = render_sheet(&layout, 10, &[]);
        let gray = preprocess::to_gray(&sheet);
        let found = find_marker_candidates(&gray, &MarkerDetectConfig::default());

        let expected = layout.fiducial_centers();
        for e in expected {
            let hit = found
                .iter()
                .any(|c| (c[0] - e[0]).hypot(c[1] - e[1]) < 3.0);
            assert!(hit, "no candidate near {:?} in {:?}", e, found);
        }
    }

    #[test]
    fn area_floor_rejects_specks() {
        let mut gray = GrayImage::from_pixel(100, 100, image::Luma([235]));
        // A 4x4 ink speck: quad-shaped but far below the area floor.
        for y in 48..52 {
            for x in 48..52 {
                gray.put_pixel(x, y, image::Luma([20]));
            }
        }
        let found = find_marker_candidates(&gray, &MarkerDetectConfig::default());
        assert!(found.is_empty(), "speck should be rejected: {:?}", found);
    }
}
