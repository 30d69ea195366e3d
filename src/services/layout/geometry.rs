//! Horizontal geometry of placed blocks.

use super::defaults::{LEFT_MARGIN, RIGHT_MARGIN};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnGeometry {
    pub left: f32,
    pub width: f32,
}

/// Left edge and width of column `assigned` out of `columns`.
///
/// The last column stretches to the right margin so rounding never leaves a
/// ragged edge.
pub fn column_geometry(total_width: f32, columns: usize, assigned: usize) -> ColumnGeometry {
    let columns = columns.max(1);
    let col_width = ((total_width - LEFT_MARGIN) / columns as f32).floor();
    let left = LEFT_MARGIN + col_width * assigned as f32;
    let width = if assigned + 1 == columns {
        total_width - left - RIGHT_MARGIN
    } else {
        col_width
    };
    ColumnGeometry {
        left,
        width: width.max(0.0),
    }
}
