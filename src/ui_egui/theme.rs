//! Theme module for the timetable application
//!
//! Defines the colors used by the timetable canvas and the booking panel and
//! converts entry colors from the `#rrggbb` format the server sends.

use egui::Color32;

#[derive(Debug, Clone, PartialEq)]
pub struct TimetableTheme {
    /// Whether this is a dark theme (affects base egui::Visuals)
    pub is_dark: bool,

    /// Application background color
    pub app_background: Color32,

    /// Day canvas background
    pub canvas_background: Color32,

    /// Hour gridline color
    pub grid_line: Color32,

    /// Hour labels and room captions
    pub grid_text: Color32,

    /// Fill for entries without a color of their own
    pub block_fill: Color32,

    /// Text on blocks without a text color of their own
    pub block_text: Color32,

    /// Block outline
    pub block_border: Color32,

    /// Outline of a block waiting for the server
    pub pending_border: Color32,

    /// Outline of the drop preview while dragging
    pub drop_preview: Color32,

    /// Background of the expanded booking info rows
    pub info_background: Color32,
}

impl TimetableTheme {
    pub fn light() -> Self {
        Self {
            is_dark: false,
            app_background: Color32::from_rgb(245, 245, 245),
            canvas_background: Color32::from_rgb(255, 255, 255),
            grid_line: Color32::from_rgb(220, 220, 220),
            grid_text: Color32::from_rgb(100, 100, 100),
            block_fill: Color32::from_rgb(200, 220, 240),
            block_text: Color32::from_rgb(40, 40, 40),
            block_border: Color32::from_rgb(140, 150, 160),
            pending_border: Color32::from_rgb(230, 150, 40),
            drop_preview: Color32::from_rgb(100, 150, 255),
            info_background: Color32::from_rgb(250, 250, 235),
        }
    }

    pub fn dark() -> Self {
        Self {
            is_dark: true,
            app_background: Color32::from_rgb(30, 30, 30),
            canvas_background: Color32::from_rgb(40, 40, 40),
            grid_line: Color32::from_rgb(60, 60, 60),
            grid_text: Color32::from_rgb(170, 170, 170),
            block_fill: Color32::from_rgb(50, 70, 95),
            block_text: Color32::from_rgb(240, 240, 240),
            block_border: Color32::from_rgb(90, 100, 110),
            pending_border: Color32::from_rgb(255, 180, 60),
            drop_preview: Color32::from_rgb(100, 150, 255),
            info_background: Color32::from_rgb(50, 50, 40),
        }
    }

    pub fn for_dark_mode(is_dark: bool) -> Self {
        if is_dark {
            Self::dark()
        } else {
            Self::light()
        }
    }

    /// Parse a `#rrggbb` (or `rrggbb`) color
    pub fn parse_color(s: &str) -> Result<Color32, String> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 {
            return Err(format!("Invalid color format: {}", s));
        }

        let channel = |range: std::ops::Range<usize>, name: &str| {
            hex.get(range)
                .ok_or_else(|| format!("Invalid color format: {}", s))
                .and_then(|part| {
                    u8::from_str_radix(part, 16).map_err(|e| format!("Invalid {} value: {}", name, e))
                })
        };

        Ok(Color32::from_rgb(
            channel(0..2, "red")?,
            channel(2..4, "green")?,
            channel(4..6, "blue")?,
        ))
    }

    /// Fill for an entry block
    pub fn entry_fill(&self, color: Option<&str>) -> Color32 {
        color
            .and_then(|c| Self::parse_color(c).ok())
            .unwrap_or(self.block_fill)
    }

    /// Text color for an entry block
    pub fn entry_text(&self, color: Option<&str>) -> Color32 {
        color
            .and_then(|c| Self::parse_color(c).ok())
            .unwrap_or(self.block_text)
    }

    /// Apply this theme to an egui context
    pub fn apply_to_context(&self, ctx: &egui::Context) {
        let mut visuals = if self.is_dark {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };

        visuals.window_fill = self.app_background;
        visuals.panel_fill = self.app_background;
        visuals.extreme_bg_color = self.canvas_background;

        ctx.set_visuals(visuals);
    }
}

impl Default for TimetableTheme {
    fn default() -> Self {
        Self::light()
    }
}
