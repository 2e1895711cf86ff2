//! Synthetic sheet rendering at template size.
//!
//! Produces the canonical sheet artwork: square corner fiducials, hollow
//! answer bubbles, and optionally pre-filled choices. Serves the CLI's
//! `render` subcommand and is the synthetic-image source for end-to-end
//! tests and benches. Question-number text is intentionally not drawn;
//! it plays no role in detection.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut};
use imageproc::rect::Rect;

use crate::grid::{self, GridScale};
use crate::layout::{SheetLayout, MAX_QUESTIONS};

const PAPER: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);
/// Thin printed outlines resolve faint at template scale; only fiducials
/// and pencil marks are near-black in a capture.
const OUTLINE: Rgb<u8> = Rgb([230, 230, 230]);

/// How far a filled choice bleeds past the bubble outline, mimicking a
/// pencil fill.
const FILL_BLEED: f32 = 1.0;

fn draw_fiducial(image: &mut RgbImage, center: [f64; 2], side: f32) {
    let half = (side / 2.0).round() as i32;
    let x = center[0].round() as i32 - half;
    let y = center[1].round() as i32 - half;
    let size = (half * 2).max(1) as u32;
    draw_filled_rect_mut(image, Rect::at(x, y).of_size(size, size), INK);
}

/// Render the sheet template with `question_count` questions.
///
/// `filled` lists pre-filled choices per question (missing or `None`
/// entries stay blank); labels outside the layout's choice set are
/// ignored.
pub fn render_sheet(
    layout: &SheetLayout,
    question_count: usize,
    filled: &[Option<char>],
) -> RgbImage {
    let [w, h] = layout.canonical_size();
    let mut image = RgbImage::from_pixel(w, h, PAPER);
    let scale = GridScale::measure(layout, w, h);

    for center in layout.fiducial_centers() {
        draw_fiducial(&mut image, center, layout.fiducial_size);
    }

    let outline_radius = layout.bubble_radius().round().max(1.0) as i32;
    let fill_radius = (layout.bubble_radius() + FILL_BLEED).round() as i32;

    for question in 0..question_count.min(MAX_QUESTIONS) {
        let marked = filled
            .get(question)
            .copied()
            .flatten()
            .and_then(|label| {
                layout
                    .choices
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(&label))
            });

        for choice in 0..layout.n_choices() {
            let center = grid::bubble_center(layout, scale, question, choice);
            let cx = center[0].round() as i32;
            let cy = center[1].round() as i32;
            if cx < 0 || cy < 0 || cx >= w as i32 || cy >= h as i32 {
                continue;
            }
            if marked == Some(choice) {
                draw_filled_circle_mut(&mut image, (cx, cy), fill_radius, INK);
            } else {
                draw_hollow_circle_mut(&mut image, (cx, cy), outline_radius, OUTLINE);
            }
        }
    }

    image
}
