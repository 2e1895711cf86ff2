//! Bubble grid sampling: map (question, choice) indices to expected
//! pixel positions on the canonical image.

use crate::layout::SheetLayout;

/// Measured canonical-image scale relative to the template.
///
/// The canonical canvas normally equals the template size, but the
/// contract allows resampling rounding to differ, so the factors are
/// always measured.
#[derive(Debug, Clone, Copy)]
pub struct GridScale {
    pub x: f64,
    pub y: f64,
}

impl GridScale {
    pub fn measure(layout: &SheetLayout, canonical_width: u32, canonical_height: u32) -> Self {
        Self {
            x: canonical_width as f64 / layout.template_width as f64,
            y: canonical_height as f64 / layout.template_height as f64,
        }
    }
}

/// Expected bubble center with its sampling radius, derived per scan.
#[derive(Debug, Clone, Copy)]
pub struct BubblePosition {
    pub question: usize,
    pub choice: usize,
    pub center: [f64; 2],
    pub radius: f64,
}

/// (column, row) of a question index in the template grid.
pub fn question_cell(layout: &SheetLayout, question: usize) -> (usize, usize) {
    (
        question / layout.questions_per_column,
        question % layout.questions_per_column,
    )
}

/// Expected bubble center in canonical pixels.
pub fn bubble_center(
    layout: &SheetLayout,
    scale: GridScale,
    question: usize,
    choice: usize,
) -> [f64; 2] {
    let (column, row) = question_cell(layout, question);
    let base_x = (layout.start_x as f64 + column as f64 * layout.col_width as f64) * scale.x;
    let base_y = (layout.start_y as f64 + row as f64 * layout.row_height as f64) * scale.y;
    let step = (layout.bubble_size + layout.bubble_spacing) as f64;
    [
        base_x + (layout.bubble_offset_x as f64 + choice as f64 * step) * scale.x,
        base_y + layout.bubble_offset_y as f64 * scale.y,
    ]
}

/// Sampling-window half-size for a bubble: the bubble radius plus a
/// margin, scaled.
pub fn window_radius(layout: &SheetLayout, scale: GridScale, margin: f64) -> f64 {
    (layout.bubble_radius() as f64 + margin) * scale.x
}

/// All bubble positions for one question.
pub fn question_bubbles(
    layout: &SheetLayout,
    scale: GridScale,
    question: usize,
    margin: f64,
) -> Vec<BubblePosition> {
    let radius = window_radius(layout, scale, margin);
    (0..layout.n_choices())
        .map(|choice| BubblePosition {
            question,
            choice,
            center: bubble_center(layout, scale, question, choice),
            radius,
        })
        .collect()
}
