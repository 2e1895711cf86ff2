//! Scan orchestration: stage boundaries, call order, and data flow.
//!
//! Each scan is a pure function of (image, layout, question count,
//! optional answer key) with no cross-call state; the pipeline is
//! re-entrant across independent calls with independent image buffers.
//! Cancellation is coarse: the flag is tested between stages only, since
//! no stage has a safe interior abort point.

use std::sync::atomic::{AtomicBool, Ordering};

use image::RgbImage;

use crate::annotate::annotate;
use crate::classify::{classify_sheet, ClassifyConfig, MarkObservation};
use crate::corner::{select_corners, CornerSet};
use crate::error::ScanError;
use crate::layout::{SheetLayout, MAX_QUESTIONS};
use crate::marker::{find_marker_candidates, MarkerDetectConfig};
use crate::preprocess::to_gray;
use crate::rectify::rectify;

/// Top-level scan configuration.
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    pub marker: MarkerDetectConfig,
    pub classify: ClassifyConfig,
}

/// Result of one scan attempt. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// One selected choice per question; `None` means no mark detected.
    pub answers: Vec<Option<char>>,
    /// Per-question mark evidence, parallel to `answers`.
    pub marks: Vec<Option<MarkObservation>>,
    /// Detected sheet corners in raw-photo pixels.
    pub corners: CornerSet,
    /// Annotated canonical image for display and audit.
    pub annotated: RgbImage,
}

/// Serializable view of a scan result (everything but the image).
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScanReport {
    pub answers: Vec<Option<char>>,
    pub marks: Vec<Option<MarkObservation>>,
    pub corners: CornerSet,
}

impl ScanResult {
    pub fn report(&self) -> ScanReport {
        ScanReport {
            answers: self.answers.clone(),
            marks: self.marks.clone(),
            corners: self.corners.clone(),
        }
    }
}

fn check_cancel(cancel: Option<&AtomicBool>) -> Result<(), ScanError> {
    match cancel {
        Some(flag) if flag.load(Ordering::Relaxed) => Err(ScanError::Cancelled),
        _ => Ok(()),
    }
}

fn scan_inner(
    image: &RgbImage,
    layout: &SheetLayout,
    question_count: usize,
    answer_key: Option<&[Option<char>]>,
    config: &ScanConfig,
    cancel: Option<&AtomicBool>,
) -> Result<ScanResult, ScanError> {
    layout.validate()?;
    let question_count = question_count.clamp(1, MAX_QUESTIONS);

    check_cancel(cancel)?;
    let gray = to_gray(image);
    let candidates = find_marker_candidates(&gray, &config.marker);
    if candidates.len() < 4 {
        tracing::warn!("only {} fiducial candidates detected", candidates.len());
        return Err(ScanError::InsufficientMarkers {
            found: candidates.len(),
        });
    }
    tracing::info!("{} fiducial candidates found", candidates.len());

    check_cancel(cancel)?;
    let corners = select_corners(&candidates)?;
    tracing::debug!(
        "corners tl={:?} tr={:?} bl={:?} br={:?}",
        corners.top_left,
        corners.top_right,
        corners.bottom_left,
        corners.bottom_right
    );

    check_cancel(cancel)?;
    let canonical = rectify(image, &corners, layout)?;

    check_cancel(cancel)?;
    let canonical_gray = to_gray(&canonical);
    let marks = classify_sheet(&canonical_gray, layout, question_count, &config.classify);
    let annotated = annotate(
        &canonical,
        layout,
        question_count,
        &marks,
        answer_key,
        config.classify.window_margin,
    );

    let answers: Vec<Option<char>> = marks.iter().map(|m| m.as_ref().map(|o| o.choice)).collect();
    Ok(ScanResult {
        answers,
        marks,
        corners,
        annotated,
    })
}

/// Scan a captured photograph of an answer sheet.
///
/// `question_count` is clamped to `[1, MAX_QUESTIONS]`. The answer key,
/// when supplied, only affects the annotation colors, never the detected
/// answers.
pub fn scan(
    image: &RgbImage,
    layout: &SheetLayout,
    question_count: usize,
    answer_key: Option<&[Option<char>]>,
    config: &ScanConfig,
) -> Result<ScanResult, ScanError> {
    scan_inner(image, layout, question_count, answer_key, config, None)
}

/// [`scan`] with a cancellation flag checked between stages.
///
/// Setting the flag makes the scan return [`ScanError::Cancelled`] at the
/// next stage boundary; an in-flight stage runs to completion first.
pub fn scan_with_cancel(
    image: &RgbImage,
    layout: &SheetLayout,
    question_count: usize,
    answer_key: Option<&[Option<char>]>,
    config: &ScanConfig,
    cancel: &AtomicBool,
) -> Result<ScanResult, ScanError> {
    scan_inner(
        image,
        layout,
        question_count,
        answer_key,
        config,
        Some(cancel),
    )
}
