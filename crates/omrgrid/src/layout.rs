//! Sheet template geometry.
//!
//! Layout JSON follows a versioned schema (`omrgrid.layout.v1`). All
//! distances are in template pixels: the coordinate system of the printed
//! sheet at its nominal raster size, which is also the size of the
//! canonical (rectified) image. A question/choice index maps to a bubble
//! center through [`crate::grid`].

use std::path::Path;

use crate::error::ScanError;

const LAYOUT_SCHEMA_V1: &str = "omrgrid.layout.v1";

/// Hard cap on questions per sheet, matching the four-column template.
pub const MAX_QUESTIONS: usize = 100;

/// Immutable geometric constants of the answer-sheet template.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    pub name: String,
    /// Template raster width in pixels (also the canonical image width).
    pub template_width: f32,
    /// Template raster height in pixels (also the canonical image height).
    pub template_height: f32,
    /// X of the first question column's row origin.
    pub start_x: f32,
    /// Y of the first row's origin.
    pub start_y: f32,
    /// Horizontal distance between question columns.
    pub col_width: f32,
    /// Vertical distance between question rows.
    pub row_height: f32,
    pub questions_per_column: usize,
    /// Bubble outline diameter.
    pub bubble_size: f32,
    /// Gap between adjacent bubbles in a row.
    pub bubble_spacing: f32,
    /// Distance from the row origin to the first bubble center.
    pub bubble_offset_x: f32,
    /// Vertical offset from the row origin to the bubble centerline.
    pub bubble_offset_y: f32,
    /// Distance from each template corner to the fiducial marker center.
    pub fiducial_inset: f32,
    /// Side length of the square corner fiducials.
    pub fiducial_size: f32,
    /// Ordered choice labels; index order is the tie-break order.
    pub choices: Vec<char>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct SheetLayoutSpecV1 {
    schema: String,
    name: String,
    template_width: f32,
    template_height: f32,
    start_x: f32,
    start_y: f32,
    col_width: f32,
    row_height: f32,
    questions_per_column: usize,
    bubble_size: f32,
    bubble_spacing: f32,
    bubble_offset_x: f32,
    bubble_offset_y: f32,
    fiducial_inset: f32,
    fiducial_size: f32,
    choices: Vec<char>,
}

impl Default for SheetLayout {
    /// The embedded A4-portrait template: 4 columns of 25 questions,
    /// choices A–D.
    fn default() -> Self {
        Self {
            name: "omrgrid_a4_portrait_100".to_string(),
            template_width: 595.0,
            template_height: 842.0,
            start_x: 56.0,
            start_y: 140.0,
            col_width: 129.8,
            row_height: 23.8,
            questions_per_column: 25,
            bubble_size: 8.9,
            bubble_spacing: 8.2,
            bubble_offset_x: 21.0,
            bubble_offset_y: 2.8,
            fiducial_inset: 21.0,
            fiducial_size: 14.0,
            choices: vec!['A', 'B', 'C', 'D'],
        }
    }
}

impl SheetLayout {
    /// Bubble outline radius.
    pub fn bubble_radius(&self) -> f32 {
        self.bubble_size / 2.0
    }

    /// Number of choice bubbles per question.
    pub fn n_choices(&self) -> usize {
        self.choices.len()
    }

    /// Canonical image dimensions `[width, height]` for this template.
    pub fn canonical_size(&self) -> [u32; 2] {
        [
            self.template_width.round() as u32,
            self.template_height.round() as u32,
        ]
    }

    /// Fiducial marker centers in template coordinates, ordered
    /// top-left, top-right, bottom-right, bottom-left.
    pub fn fiducial_centers(&self) -> [[f64; 2]; 4] {
        let inset = self.fiducial_inset as f64;
        let w = self.template_width as f64;
        let h = self.template_height as f64;
        [
            [inset, inset],
            [w - inset, inset],
            [w - inset, h - inset],
            [inset, h - inset],
        ]
    }

    /// Check the template invariants: strictly positive sizes and spacing,
    /// a non-empty grid, and at least two choices.
    pub fn validate(&self) -> Result<(), ScanError> {
        let positive = [
            ("template_width", self.template_width),
            ("template_height", self.template_height),
            ("col_width", self.col_width),
            ("row_height", self.row_height),
            ("bubble_size", self.bubble_size),
            ("bubble_spacing", self.bubble_spacing),
            ("fiducial_inset", self.fiducial_inset),
            ("fiducial_size", self.fiducial_size),
        ];
        for (field, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(ScanError::InvalidLayout(format!(
                    "{} must be positive, got {}",
                    field, value
                )));
            }
        }
        if self.questions_per_column == 0 {
            return Err(ScanError::InvalidLayout(
                "questions_per_column must be > 0".to_string(),
            ));
        }
        if self.choices.len() < 2 {
            return Err(ScanError::InvalidLayout(format!(
                "need at least 2 choices, got {}",
                self.choices.len()
            )));
        }
        Ok(())
    }

    /// Load a layout from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        let spec: SheetLayoutSpecV1 = serde_json::from_str(&data)?;
        Self::from_layout_spec(spec).map_err(Into::into)
    }

    fn from_layout_spec(spec: SheetLayoutSpecV1) -> Result<Self, ScanError> {
        if spec.schema != LAYOUT_SCHEMA_V1 {
            return Err(ScanError::InvalidLayout(format!(
                "unsupported layout schema {:?}, expected {:?}",
                spec.schema, LAYOUT_SCHEMA_V1
            )));
        }
        let layout = Self {
            name: spec.name,
            template_width: spec.template_width,
            template_height: spec.template_height,
            start_x: spec.start_x,
            start_y: spec.start_y,
            col_width: spec.col_width,
            row_height: spec.row_height,
            questions_per_column: spec.questions_per_column,
            bubble_size: spec.bubble_size,
            bubble_spacing: spec.bubble_spacing,
            bubble_offset_x: spec.bubble_offset_x,
            bubble_offset_y: spec.bubble_offset_y,
            fiducial_inset: spec.fiducial_inset,
            fiducial_size: spec.fiducial_size,
            choices: spec.choices,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Serialize as layout JSON (schema v1).
    pub fn to_json(&self) -> serde_json::Result<String> {
        let spec = SheetLayoutSpecV1 {
            schema: LAYOUT_SCHEMA_V1.to_string(),
            name: self.name.clone(),
            template_width: self.template_width,
            template_height: self.template_height,
            start_x: self.start_x,
            start_y: self.start_y,
            col_width: self.col_width,
            row_height: self.row_height,
            questions_per_column: self.questions_per_column,
            bubble_size: self.bubble_size,
            bubble_spacing: self.bubble_spacing,
            bubble_offset_x: self.bubble_offset_x,
            bubble_offset_y: self.bubble_offset_y,
            fiducial_inset: self.fiducial_inset,
            fiducial_size: self.fiducial_size,
            choices: self.choices.clone(),
        };
        serde_json::to_string_pretty(&spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_valid() {
        let layout = SheetLayout::default();
        assert!(layout.validate().is_ok());
        assert_eq!(layout.canonical_size(), [595, 842]);
        assert_eq!(layout.n_choices(), 4);
    }

    #[test]
    fn rejects_nonpositive_spacing() {
        let mut layout = SheetLayout::default();
        layout.row_height = 0.0;
        assert!(matches!(
            layout.validate(),
            Err(ScanError::InvalidLayout(_))
        ));
    }

    #[test]
    fn rejects_empty_grid() {
        let mut layout = SheetLayout::default();
        layout.questions_per_column = 0;
        assert!(layout.validate().is_err());
    }

    #[test]
    fn json_round_trip() {
        let layout = SheetLayout::default();
        let json = layout.to_json().unwrap();
        let spec: SheetLayoutSpecV1 = serde_json::from_str(&json).unwrap();
        let back = SheetLayout::from_layout_spec(spec).unwrap();
        assert_eq!(back.name, layout.name);
        assert_eq!(back.choices, layout.choices);
        assert_eq!(back.questions_per_column, layout.questions_per_column);
    }

    #[test]
    fn unknown_schema_rejected() {
        let json = SheetLayout::default()
            .to_json()
            .unwrap()
            .replace(LAYOUT_SCHEMA_V1, "omrgrid.layout.v9");
        let spec: SheetLayoutSpecV1 = serde_json::from_str(&json).unwrap();
        assert!(SheetLayout::from_layout_spec(spec).is_err());
    }

    #[test]
    fn fiducial_centers_inset_from_corners() {
        let layout = SheetLayout::default();
        let c = layout.fiducial_centers();
        assert_eq!(c[0], [21.0, 21.0]);
        assert_eq!(c[1], [574.0, 21.0]);
        assert_eq!(c[2], [574.0, 821.0]);
        assert_eq!(c[3], [21.0, 821.0]);
    }
}
