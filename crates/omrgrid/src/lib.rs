//! omrgrid — deterministic scan pipeline for printed answer sheets.
//!
//! Converts a photograph of a multiple-choice answer sheet into the list
//! of selected answers per question. The pipeline stages are:
//!
//! 1. **Preprocess** – grayscale, smoothing, adaptive binarization.
//! 2. **Markers** – corner fiducial candidate detection via contour
//!    quad approximation + compactness + local fill density.
//! 3. **Corners** – maximum-spread selection of the four sheet corners
//!    and deterministic role assignment.
//! 4. **Rectify** – 4-point DLT homography and bilinear warp into the
//!    canonical top-down view.
//! 5. **Classify** – per-bubble Otsu windows, fill-ratio scoring, and
//!    single-best selection per question.
//! 6. **Annotate** – auditable overlay of reference and selection rings.
//!
//! No learned models: every decision is a deterministic image statistic.
//!
//! # Example
//!
//! ```no_run
//! use omrgrid::{scan, ScanConfig, SheetLayout};
//!
//! let photo = image::open("capture.jpg").unwrap().to_rgb8();
//! let layout = SheetLayout::default();
//! let result = scan(&photo, &layout, 20, None, &ScanConfig::default()).unwrap();
//! println!("answers: {:?}", result.answers);
//! ```

pub mod annotate;
pub mod classify;
pub mod corner;
pub mod error;
pub mod grid;
pub mod homography;
pub mod layout;
pub mod marker;
pub mod pipeline;
pub mod preprocess;
pub mod rectify;
pub mod render;
pub mod shape;

pub use classify::{ClassifyConfig, MarkObservation};
pub use corner::CornerSet;
pub use error::ScanError;
pub use layout::{SheetLayout, MAX_QUESTIONS};
pub use marker::MarkerDetectConfig;
pub use pipeline::{scan, scan_with_cancel, ScanConfig, ScanReport, ScanResult};
pub use render::render_sheet;
