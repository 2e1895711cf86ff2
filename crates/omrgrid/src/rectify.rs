//! Perspective rectification into the canonical sheet view.
//!
//! The detected fiducial centers sit `fiducial_inset` pixels inside the
//! physical sheet corners, so they are mapped to the same inset positions
//! on the canonical canvas; the bubble grid between the markers survives
//! without clipping.

use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

use crate::corner::CornerSet;
use crate::error::ScanError;
use crate::homography::{as_row_major_f32, quad_homography};
use crate::layout::SheetLayout;

/// Destination quad on the canonical canvas, ordered top-left, top-right,
/// bottom-right, bottom-left.
fn canonical_quad(layout: &SheetLayout) -> [[f64; 2]; 4] {
    layout.fiducial_centers()
}

/// Resample `image` into the canonical top-down view defined by `layout`.
///
/// Deterministic for a given corner set; fails only when the corners do
/// not determine an invertible transform.
pub fn rectify(
    image: &RgbImage,
    corners: &CornerSet,
    layout: &SheetLayout,
) -> Result<RgbImage, ScanError> {
    let src = corners.as_quad();
    let dst = canonical_quad(layout);

    let h = quad_homography(&src, &dst).map_err(|e| {
        tracing::warn!("homography estimation failed: {}", e);
        ScanError::DegenerateCornerSet
    })?;

    let projection =
        Projection::from_matrix(as_row_major_f32(&h)).ok_or(ScanError::DegenerateCornerSet)?;

    let [w, h_px] = layout.canonical_size();
    let mut canonical = RgbImage::new(w, h_px);
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Rgb([255, 255, 255]),
        &mut canonical,
    );
    Ok(canonical)
}
