//! Quad-to-quad homography estimation via DLT with Hartley normalization.
//!
//! The rectifier always works from exactly four corner correspondences,
//! so the estimator is specialized to the minimal 8×9 system rather than
//! a general overdetermined fit.

use nalgebra::{Matrix3, SMatrix, Vector3};

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HomographyError {
    /// The correspondences do not determine an invertible projective map
    /// (coincident or collinear corners).
    Degenerate(String),
}

impl std::fmt::Display for HomographyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Degenerate(msg) => write!(f, "degenerate homography: {}", msg),
        }
    }
}

impl std::error::Error for HomographyError {}

// ── Projection ───────────────────────────────────────────────────────────

/// Project a 2D point through a 3×3 homography: H * [x, y, 1]^T → [u, v].
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-15 {
        return [f64::NAN, f64::NAN];
    }
    [p[0] / p[2], p[1] / p[2]]
}

// ── Hartley normalization ────────────────────────────────────────────────

/// Normalizing transform: translate the quad centroid to the origin,
/// scale so the mean distance from the origin is sqrt(2).
fn normalize_quad(pts: &[[f64; 2]; 4]) -> (Matrix3<f64>, [[f64; 2]; 4]) {
    let cx: f64 = pts.iter().map(|p| p[0]).sum::<f64>() / 4.0;
    let cy: f64 = pts.iter().map(|p| p[1]).sum::<f64>() / 4.0;

    let mean_dist: f64 = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / 4.0;

    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);

    let mut normalized = [[0.0; 2]; 4];
    for (out, p) in normalized.iter_mut().zip(pts) {
        *out = [s * (p[0] - cx), s * (p[1] - cy)];
    }

    (t, normalized)
}

// ── DLT ──────────────────────────────────────────────────────────────────

/// Estimate the homography mapping the four `src` corners onto the four
/// `dst` corners, so that `dst ≈ project(H, src)`.
pub fn quad_homography(
    src: &[[f64; 2]; 4],
    dst: &[[f64; 2]; 4],
) -> Result<Matrix3<f64>, HomographyError> {
    let (t_src, src_n) = normalize_quad(src);
    let (t_dst, dst_n) = normalize_quad(dst);

    // Build the 8 × 9 DLT matrix A: two rows per correspondence.
    let mut a: SMatrix<f64, 8, 9> = SMatrix::zeros();
    for i in 0..4 {
        let (sx, sy) = (src_n[i][0], src_n[i][1]);
        let (dx, dy) = (dst_n[i][0], dst_n[i][1]);

        // Row 2i:   [  0  0  0 | -sx -sy -1 | dy*sx  dy*sy  dy ]
        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        // Row 2i+1: [ sx  sy  1 |  0  0  0 | -dx*sx -dx*sy -dx ]
        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    // The solution h is the eigenvector of A^T A with the smallest
    // eigenvalue. This avoids thin-SVD dimension issues on the 8×9 system.
    let ata = a.transpose() * a;
    let eig = nalgebra::SymmetricEigen::new(ata);

    let mut min_idx = 0;
    let mut min_val = eig.eigenvalues[0].abs();
    for i in 1..9 {
        let v = eig.eigenvalues[i].abs();
        if v < min_val {
            min_val = v;
            min_idx = i;
        }
    }
    let h_norm = Matrix3::new(
        eig.eigenvectors[(0, min_idx)],
        eig.eigenvectors[(1, min_idx)],
        eig.eigenvectors[(2, min_idx)],
        eig.eigenvectors[(3, min_idx)],
        eig.eigenvectors[(4, min_idx)],
        eig.eigenvectors[(5, min_idx)],
        eig.eigenvectors[(6, min_idx)],
        eig.eigenvectors[(7, min_idx)],
        eig.eigenvectors[(8, min_idx)],
    );

    // Denormalize: H = T_dst^-1 * H_norm * T_src
    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| HomographyError::Degenerate("T_dst not invertible".into()))?;
    let h = t_dst_inv * h_norm * t_src;

    if h.determinant().abs() < 1e-12 {
        return Err(HomographyError::Degenerate(
            "corners are collinear or coincident".into(),
        ));
    }

    // Normalize so h[2][2] = 1 (if possible).
    let scale = h[(2, 2)];
    if scale.abs() < 1e-15 {
        Ok(h)
    } else {
        Ok(h / scale)
    }
}

/// Row-major `[f32; 9]` view of a homography, the form expected by the
/// image warper.
pub fn as_row_major_f32(h: &Matrix3<f64>) -> [f32; 9] {
    [
        h[(0, 0)] as f32,
        h[(0, 1)] as f32,
        h[(0, 2)] as f32,
        h[(1, 0)] as f32,
        h[(1, 1)] as f32,
        h[(1, 2)] as f32,
        h[(2, 0)] as f32,
        h[(2, 1)] as f32,
        h[(2, 2)] as f32,
    ]
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_test_homography() -> Matrix3<f64> {
        // Scale + translate + mild perspective
        Matrix3::new(
            3.5, 0.1, 640.0, //
            -0.05, 3.3, 480.0, //
            0.0001, -0.00005, 1.0,
        )
    }

    #[test]
    fn exact_on_four_corners() {
        let h_true = make_test_homography();
        let src = [[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]];
        let mut dst = [[0.0; 2]; 4];
        for (d, s) in dst.iter_mut().zip(&src) {
            *d = project(&h_true, s[0], s[1]);
        }

        let h_est = quad_homography(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(&dst) {
            let p = project(&h_est, s[0], s[1]);
            let err = (p[0] - d[0]).hypot(p[1] - d[1]);
            assert!(err < 1e-6, "reprojection error too large: {}", err);
        }
    }

    #[test]
    fn identity_when_quads_match() {
        let quad = [[21.0, 21.0], [574.0, 21.0], [574.0, 821.0], [21.0, 821.0]];
        let h = quad_homography(&quad, &quad).unwrap();
        let p = project(&h, 300.0, 400.0);
        assert_relative_eq!(p[0], 300.0, epsilon = 1e-8);
        assert_relative_eq!(p[1], 400.0, epsilon = 1e-8);
    }

    #[test]
    fn collinear_corners_rejected() {
        let src = [[0.0, 0.0], [10.0, 10.0], [20.0, 20.0], [30.0, 30.0]];
        let dst = [[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]];
        assert!(quad_homography(&src, &dst).is_err());
    }

    #[test]
    fn project_roundtrip_through_inverse() {
        let h = make_test_homography();
        let h_inv = h.try_inverse().unwrap();

        let p = [50.0, 75.0];
        let q = project(&h, p[0], p[1]);
        let back = project(&h_inv, q[0], q[1]);

        assert_relative_eq!(p[0], back[0], epsilon = 1e-8);
        assert_relative_eq!(p[1], back[1], epsilon = 1e-8);
    }
}
