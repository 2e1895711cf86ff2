//! Typed scan failures.
//!
//! Only whole-pipeline aborts are represented here. Stage-local numerical
//! edge cases (a sampling window running off the image, a zero-area
//! contour) are clamped or skipped where they occur and degrade to "no
//! selection" for the affected bubble.

/// Reasons a scan attempt can abort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Fewer than four fiducial candidates survived filtering. The capture
    /// cannot be rectified; the caller should prompt for a re-capture.
    InsufficientMarkers { found: usize },
    /// Four corners were selected but are geometrically unusable
    /// (coincident points or a non-invertible perspective transform).
    DegenerateCornerSet,
    /// The caller's cancellation flag was observed set between stages.
    Cancelled,
    /// Sheet layout constants failed validation.
    InvalidLayout(String),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientMarkers { found } => {
                write!(f, "insufficient fiducial markers: need 4, found {}", found)
            }
            Self::DegenerateCornerSet => write!(f, "degenerate corner set"),
            Self::Cancelled => write!(f, "scan cancelled"),
            Self::InvalidLayout(msg) => write!(f, "invalid sheet layout: {}", msg),
        }
    }
}

impl std::error::Error for ScanError {}
