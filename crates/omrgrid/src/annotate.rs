//! Human-auditable annotation of the canonical image.
//!
//! A side output for user trust, not correctness: every evaluated bubble
//! window gets a faint reference ring; the selected choice gets a colored
//! ring (green, or red when it contradicts the supplied answer key); an
//! expected-but-unmarked answer gets a gray ring at its location.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_circle_mut;

use crate::classify::MarkObservation;
use crate::grid::{self, GridScale};
use crate::layout::SheetLayout;

const REFERENCE: Rgb<u8> = Rgb([204, 204, 204]);
const CORRECT: Rgb<u8> = Rgb([0, 255, 0]);
const INCORRECT: Rgb<u8> = Rgb([255, 0, 0]);

/// Radius margin for the selection ring, in template pixels.
const SELECTION_RING_MARGIN: f64 = 4.0;

/// Hollow ring with stroke thickness, center-clipped to the canvas.
fn draw_ring_mut(image: &mut RgbImage, center: [f64; 2], radius: f64, thickness: u32, color: Rgb<u8>) {
    let (w, h) = image.dimensions();
    let cx = center[0].round() as i32;
    let cy = center[1].round() as i32;
    let r_outer = radius.round() as i32 + thickness as i32 - 1;
    if cx + r_outer < 0 || cy + r_outer < 0 || cx - r_outer >= w as i32 || cy - r_outer >= h as i32
    {
        return;
    }
    for t in 0..thickness as i32 {
        let r = radius.round() as i32 + t;
        if r > 0 {
            draw_hollow_circle_mut(image, (cx, cy), r, color);
        }
    }
}

/// Render the annotated copy of the canonical image.
///
/// `selections` is the classifier output, one entry per question. The
/// answer key, when present, is compared case-insensitively.
pub fn annotate(
    canonical: &RgbImage,
    layout: &SheetLayout,
    question_count: usize,
    selections: &[Option<MarkObservation>],
    answer_key: Option<&[Option<char>]>,
    window_margin: f64,
) -> RgbImage {
    let mut out = canonical.clone();
    let (w, h) = canonical.dimensions();
    let scale = GridScale::measure(layout, w, h);
    let selection_radius = (layout.bubble_radius() as f64 + SELECTION_RING_MARGIN) * scale.x;

    for question in 0..question_count {
        // Faint reference ring at every evaluated window.
        for bubble in grid::question_bubbles(layout, scale, question, window_margin) {
            draw_ring_mut(&mut out, bubble.center, bubble.radius, 2, REFERENCE);
        }

        let expected = answer_key.and_then(|key| key.get(question).copied().flatten());

        match selections.get(question).and_then(|s| s.as_ref()) {
            Some(mark) => {
                let matches = expected
                    .map(|e| e.eq_ignore_ascii_case(&mark.choice))
                    .unwrap_or(true);
                let color = if matches { CORRECT } else { INCORRECT };
                draw_ring_mut(&mut out, mark.center, selection_radius, 2, color);
            }
            None => {
                // Nothing selected: show where the expected answer was.
                if let Some(e) = expected {
                    let idx = layout
                        .choices
                        .iter()
                        .position(|c| c.eq_ignore_ascii_case(&e));
                    if let Some(choice) = idx {
                        let center = grid::bubble_center(layout, scale, question, choice);
                        draw_ring_mut(&mut out, center, selection_radius, 2, REFERENCE);
                    }
                }
            }
        }
    }

    out
}
