//! Per-bubble fill classification.
//!
//! The canonical image is smoothed and binarized with a locally
//! normalized (adaptive mean) threshold, then each bubble's sampling
//! window is re-separated with a per-window Otsu cut, scored by fill
//! ratio, and shape-checked so that specks and smears do not count as
//! marks. Selection tracks the single best choice per question; ties on
//! exact fill ratio keep the earliest choice because the comparison is
//! strictly greater. That tie-break is deliberate policy, not an
//! accident of iteration order.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::otsu_level;

use crate::grid::{self, GridScale};
use crate::layout::SheetLayout;
use crate::preprocess;
use crate::shape;

/// Tunable thresholds for mark classification.
#[derive(Debug, Clone)]
pub struct ClassifyConfig {
    /// Gaussian sigma for the canonical-image smoothing pass.
    pub blur_sigma: f32,
    /// Adaptive threshold averaging block side (odd).
    pub block_size: u32,
    /// Adaptive threshold mean offset.
    pub mean_offset: f32,
    /// Margin added to the bubble radius for the sampling window.
    pub window_margin: f64,
    /// Minimum fill ratio for a filled bubble.
    pub fill_threshold: f64,
    /// Mark bounding-box area band in px².
    pub min_mark_area: u32,
    pub max_mark_area: u32,
    /// Mark bounding-box aspect-ratio band.
    pub min_mark_aspect: f64,
    pub max_mark_aspect: f64,
    /// Minimum value spread within a window; flatter windows are treated
    /// as blank paper (an Otsu cut is meaningless on them).
    pub min_window_contrast: u8,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            block_size: 15,
            mean_offset: 4.0,
            window_margin: 1.5,
            fill_threshold: 0.52,
            min_mark_area: 70,
            max_mark_area: 450,
            min_mark_aspect: 0.75,
            max_mark_aspect: 1.3,
            min_window_contrast: 24,
        }
    }
}

/// A selected mark: the winning choice with its evidence.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MarkObservation {
    pub choice: char,
    pub fill_ratio: f64,
    /// Bubble center in canonical pixels.
    pub center: [f64; 2],
}

/// Clamped integer window around a bubble center. `None` when the window
/// degenerates to nothing inside the image.
fn clamp_window(
    width: u32,
    height: u32,
    center: [f64; 2],
    radius: f64,
) -> Option<(u32, u32, u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    let left = (center[0] - radius) as i64;
    let top = (center[1] - radius) as i64;
    let size = ((radius * 2.0) as i64).max(1);

    let left = left.clamp(0, width as i64 - 1) as u32;
    let top = top.clamp(0, height as i64 - 1) as u32;
    let right = (left as i64 + size).min(width as i64) as u32;
    let bottom = (top as i64 + size).min(height as i64) as u32;
    if right <= left || bottom <= top {
        return None;
    }
    Some((left, top, right - left, bottom - top))
}

/// Evaluate one bubble window of the binarized canonical image: apply a
/// per-window Otsu cut, measure the fill ratio, and shape-check for a
/// plausible mark. Returns `(fill_ratio, plausible)`; degenerate windows
/// return `None`.
fn evaluate_window(
    binarized: &GrayImage,
    center: [f64; 2],
    radius: f64,
    config: &ClassifyConfig,
) -> Option<(f64, bool)> {
    let (w, h) = binarized.dimensions();
    let (x, y, win_w, win_h) = clamp_window(w, h, center, radius)?;
    let window = image::imageops::crop_imm(binarized, x, y, win_w, win_h).to_image();

    let (mut lo, mut hi) = (u8::MAX, u8::MIN);
    for p in window.pixels() {
        lo = lo.min(p[0]);
        hi = hi.max(p[0]);
    }
    if hi.saturating_sub(lo) < config.min_window_contrast {
        // Uniform window (all paper or one solid smear): no separable
        // mark, same degradation as the rest of the grid.
        return Some((0.0, false));
    }

    // Ink is foreground (bright) after the inverted adaptive threshold,
    // so the mark is the above-cut class.
    let level = otsu_level(&window);
    let mut mask = GrayImage::new(win_w, win_h);
    let mut filled = 0u64;
    for (src, dst) in window.pixels().zip(mask.pixels_mut()) {
        if src[0] > level {
            dst[0] = 255;
            filled += 1;
        }
    }
    let fill_ratio = filled as f64 / (win_w as u64 * win_h as u64) as f64;

    let mut plausible = false;
    for contour in find_contours::<i32>(&mask) {
        if contour.border_type != BorderType::Outer {
            continue;
        }
        let bounds = match shape::Bounds::of(&contour.points) {
            Some(b) => b,
            None => continue,
        };
        let aspect = bounds.aspect_ratio();
        let area = bounds.area();
        if aspect >= config.min_mark_aspect
            && aspect <= config.max_mark_aspect
            && area >= config.min_mark_area
            && area <= config.max_mark_area
        {
            plausible = true;
            break;
        }
    }

    Some((fill_ratio, plausible))
}

/// Classify every question on the canonical grayscale image.
///
/// Returns one entry per question in `[0, question_count)`: the selected
/// mark, or `None` when no choice qualified. At most one choice per
/// question by construction.
pub fn classify_sheet(
    canonical_gray: &GrayImage,
    layout: &SheetLayout,
    question_count: usize,
    config: &ClassifyConfig,
) -> Vec<Option<MarkObservation>> {
    let (w, h) = canonical_gray.dimensions();
    let scale = GridScale::measure(layout, w, h);
    let blurred = preprocess::blur(canonical_gray, config.blur_sigma);
    let binarized =
        preprocess::adaptive_threshold_inv(&blurred, config.block_size, config.mean_offset);

    let mut selections = Vec::with_capacity(question_count);
    for question in 0..question_count {
        let mut best: Option<MarkObservation> = None;
        let mut best_ratio = 0.0f64;

        for bubble in grid::question_bubbles(layout, scale, question, config.window_margin) {
            let (fill_ratio, plausible) =
                match evaluate_window(&binarized, bubble.center, bubble.radius, config) {
                    Some(r) => r,
                    None => continue,
                };

            if plausible && fill_ratio > config.fill_threshold && fill_ratio > best_ratio {
                best_ratio = fill_ratio;
                best = Some(MarkObservation {
                    choice: layout.choices[bubble.choice],
                    fill_ratio,
                    center: bubble.center,
                });
            }
        }
        selections.push(best);
    }

    let answered = selections.iter().filter(|s| s.is_some()).count();
    tracing::info!("{} of {} questions marked", answered, question_count);
    selections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::to_gray;
    use crate::render::render_sheet;

    fn fills(spec: &[(usize, char)], len: usize) -> Vec<Option<char>> {
        let mut v = vec![None; len];
        for &(q, c) in spec {
            v[q] = Some(c);
        }
        v
    }

    #[test]
    fn recovers_one_filled_bubble_per_question() {
        let layout = SheetLayout::default();
        let expected = vec![
            Some('A'),
            Some('C'),
            Some('B'),
            Some('D'),
            Some('B'),
            Some('A'),
            Some('D'),
            Some('C'),
            Some('A'),
            Some('B'),
        ];
        let sheet = render_sheet(&layout, 10, &expected);
        let gray = to_gray(&sheet);

        let marks = classify_sheet(&gray, &layout, 10, &ClassifyConfig::default());
        let answers: Vec<Option<char>> = marks
            .iter()
            .map(|m| m.as_ref().map(|o| o.choice))
            .collect();
        assert_eq!(answers, expected);
    }

    #[test]
    fn blank_sheet_has_no_selections() {
        let layout = SheetLayout::default();
        let sheet = render_sheet(&layout, 10, &[]);
        let gray = to_gray(&sheet);

        let marks = classify_sheet(&gray, &layout, 10, &ClassifyConfig::default());
        assert_eq!(marks.len(), 10);
        assert!(marks.iter().all(|m| m.is_none()));
    }

    #[test]
    fn double_mark_selects_single_best() {
        // Two filled bubbles in one question: the classifier must still
        // produce at most one selection, structurally.
        let layout = SheetLayout::default();
        let mut sheet = render_sheet(&layout, 5, &fills(&[(2, 'B')], 5));
        // Overdraw a second, lighter fill on choice D of the same question.
        let scale = GridScale::measure(&layout, 595, 842);
        let center = grid::bubble_center(&layout, scale, 2, 3);
        imageproc::drawing::draw_filled_circle_mut(
            &mut sheet,
            (center[0].round() as i32, center[1].round() as i32),
            layout.bubble_radius() as i32,
            image::Rgb([90, 90, 90]),
        );

        let gray = to_gray(&sheet);
        let marks = classify_sheet(&gray, &layout, 5, &ClassifyConfig::default());
        let selected: Vec<_> = marks.iter().filter(|m| m.is_some()).collect();
        assert_eq!(selected.len(), 1);
        assert!(marks[2].is_some());
    }

    #[test]
    fn fill_evidence_is_reported() {
        let layout = SheetLayout::default();
        let sheet = render_sheet(&layout, 3, &fills(&[(0, 'D')], 3));
        let gray = to_gray(&sheet);

        let marks = classify_sheet(&gray, &layout, 3, &ClassifyConfig::default());
        let mark = marks[0].as_ref().expect("Q1 should be marked");
        assert_eq!(mark.choice, 'D');
        assert!(mark.fill_ratio > 0.52);

        let scale = GridScale::measure(&layout, 595, 842);
        let expected_center = grid::bubble_center(&layout, scale, 0, 3);
        assert!((mark.center[0] - expected_center[0]).abs() < 1e-9);
    }

    #[test]
    fn off_image_windows_degrade_to_no_selection() {
        // A layout whose grid extends past the canonical canvas: the
        // out-of-bounds questions must classify as None, not panic.
        let mut layout = SheetLayout::default();
        layout.start_y = 800.0;
        let sheet = render_sheet(&layout, 4, &[]);
        let gray = to_gray(&sheet);
        let marks = classify_sheet(&gray, &layout, 4, &ClassifyConfig::default());
        assert_eq!(marks.len(), 4);
    }
}
