//! PDF export service implementation

use anyhow::{Context, Result};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Point, Rgb};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::services::block::fit::FixedAdvance;
use crate::services::timetable::{BlockRect, PositionedBlock, RenderedDay};
use crate::utils::date::{day_caption, parse_day_key};

/// Service for printing a rendered timetable day
pub struct PdfExportService;

/// Export options
pub struct PdfExportOptions {
    /// Title for the PDF
    pub title: String,
    /// Page size (width, height) in mm
    pub page_size: (f32, f32),
    /// Margin around the drawing in mm
    pub margin: f32,
    /// Font size of block titles in pt
    pub block_font_size: f32,
}

impl Default for PdfExportOptions {
    fn default() -> Self {
        Self {
            title: "Timetable".to_string(),
            page_size: (297.0, 210.0), // A4 Landscape
            margin: 10.0,
            block_font_size: 7.0,
        }
    }
}

/// Canvas pixels to page millimetres. The day is scaled down uniformly to
/// fit below the heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMapping {
    pub scale: f32,
    pub left: f32,
    /// Page y of canvas y = 0
    pub top: f32,
}

/// Space reserved for the heading in mm
const HEADING_HEIGHT: f32 = 12.0;

/// Millimetres per point
const MM_PER_PT: f32 = 0.3528;

impl PageMapping {
    pub fn fit(canvas_width: f32, canvas_height: f32, options: &PdfExportOptions) -> Self {
        let (page_w, page_h) = options.page_size;
        let usable_w = (page_w - 2.0 * options.margin).max(1.0);
        let usable_h = (page_h - 2.0 * options.margin - HEADING_HEIGHT).max(1.0);
        let scale = (usable_w / canvas_width.max(1.0)).min(usable_h / canvas_height.max(1.0));
        Self {
            scale,
            left: options.margin,
            top: page_h - options.margin - HEADING_HEIGHT,
        }
    }

    pub fn x(&self, px: f32) -> f32 {
        self.left + px * self.scale
    }

    pub fn y(&self, px: f32) -> f32 {
        self.top - px * self.scale
    }

    /// Rectangle as (x, bottom y, width, height) in page millimetres
    pub fn rect(&self, rect: &BlockRect) -> (f32, f32, f32, f32) {
        (
            self.x(rect.left),
            self.y(rect.bottom()),
            rect.width * self.scale,
            rect.height * self.scale,
        )
    }
}

impl PdfExportService {
    /// Export one rendered day to PDF
    pub fn export_day(rendered: &RenderedDay, path: &Path, options: &PdfExportOptions) -> Result<()> {
        let (doc, page1, layer1) = PdfDocument::new(
            &options.title,
            Mm(options.page_size.0),
            Mm(options.page_size.1),
            "Layer 1",
        );

        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .context("Failed to add font")?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .context("Failed to add bold font")?;

        let layer = doc.get_page(page1).get_layer(layer1);
        let mapping = PageMapping::fit(rendered.width, rendered.height, options);

        // Heading
        let heading = parse_day_key(&rendered.day)
            .map(day_caption)
            .unwrap_or_else(|| rendered.day.clone());
        Self::draw_text(
            &layer,
            &font_bold,
            14.0,
            options.margin,
            options.page_size.1 - options.margin - 6.0,
            &format!("{} - {}", options.title, heading),
        );

        // Hour lines with labels
        for line in &rendered.grid {
            let y = mapping.y(line.top);
            Self::draw_line(&layer, mapping.x(0.0), y, mapping.x(rendered.width), y);
            Self::draw_text(&layer, &font, 6.0, mapping.x(2.0), y - 2.5, &format!("{:02}:00", line.hour));
        }

        // Room captions
        for cell in &rendered.header {
            Self::draw_text(&layer, &font_bold, 6.0, mapping.x(cell.left + 2.0), mapping.top + 2.0, &cell.label);
        }

        let measure = Self::measure(mapping.scale, options.block_font_size);
        for block in rendered.whole_day.iter().chain(rendered.blocks.iter()) {
            Self::draw_block(&layer, &font, &mapping, block, &measure, options.block_font_size);
        }

        let file = File::create(path).context("Failed to create PDF file")?;
        let mut writer = BufWriter::new(file);
        doc.save(&mut writer).context("Failed to save PDF")?;

        log::info!("Exported day {} to {}", rendered.day, path.display());
        Ok(())
    }

    /// Text measure in canvas pixels for a font size on this mapping
    fn measure(scale: f32, font_size: f32) -> FixedAdvance {
        let px_per_mm = 1.0 / scale.max(f32::EPSILON);
        FixedAdvance {
            char_width: font_size * 0.5 * MM_PER_PT * px_per_mm,
            line_height: font_size * 1.2 * MM_PER_PT * px_per_mm,
        }
    }

    fn draw_block(
        layer: &PdfLayerReference,
        font: &IndirectFontRef,
        mapping: &PageMapping,
        block: &PositionedBlock,
        measure: &FixedAdvance,
        font_size: f32,
    ) {
        let entry = block.block.entry();
        let fill = entry
            .color
            .as_deref()
            .and_then(hex_rgb)
            .unwrap_or((0.85, 0.9, 0.95));
        let (x, y, w, h) = mapping.rect(&block.rect);
        Self::fill_rect(layer, x, y, w, h, fill);

        let fitted = block.block.fit(block.rect.width, block.rect.height, measure);
        let line_mm = measure.line_height * mapping.scale;
        let mut lines = vec![fitted.title];
        lines.extend(fitted.time);
        lines.extend(fitted.location);
        lines.extend(fitted.presenters);
        lines.extend(fitted.convener);

        let mut text_y = y + h - line_mm;
        for line in lines.iter().filter(|l| !l.is_empty()) {
            if text_y < y {
                break;
            }
            Self::draw_text(layer, font, font_size, x + 1.0, text_y, line);
            text_y -= line_mm;
        }
    }

    fn draw_text(layer: &PdfLayerReference, font: &IndirectFontRef, size: f32, x: f32, y: f32, text: &str) {
        layer.begin_text_section();
        layer.set_font(font, size);
        layer.set_fill_color(printpdf::Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
        layer.set_text_cursor(Mm(x), Mm(y));
        layer.write_text(text, font);
        layer.end_text_section();
    }

    fn draw_line(layer: &PdfLayerReference, x1: f32, y1: f32, x2: f32, y2: f32) {
        layer.set_outline_color(printpdf::Color::Rgb(Rgb::new(0.8, 0.8, 0.8, None)));
        layer.set_outline_thickness(0.3);
        layer.add_line(printpdf::Line {
            points: vec![(Point::new(Mm(x1), Mm(y1)), false), (Point::new(Mm(x2), Mm(y2)), false)],
            is_closed: false,
        });
    }

    fn fill_rect(layer: &PdfLayerReference, x: f32, y: f32, width: f32, height: f32, fill: (f32, f32, f32)) {
        let points = vec![
            (Point::new(Mm(x), Mm(y)), false),
            (Point::new(Mm(x + width), Mm(y)), false),
            (Point::new(Mm(x + width), Mm(y + height)), false),
            (Point::new(Mm(x), Mm(y + height)), false),
        ];
        layer.set_fill_color(printpdf::Color::Rgb(Rgb::new(fill.0, fill.1, fill.2, None)));
        layer.set_outline_color(printpdf::Color::Rgb(Rgb::new(0.5, 0.5, 0.5, None)));
        layer.set_outline_thickness(0.5);
        layer.add_polygon(printpdf::Polygon {
            rings: vec![points],
            mode: printpdf::path::PaintMode::FillStroke,
            winding_order: printpdf::path::WindingOrder::NonZero,
        });
    }
}

/// `#rrggbb` as 0..1 components, lightened so black text stays readable
fn hex_rgb(hex: &str) -> Option<(f32, f32, f32)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .map(|v| 0.5 + v as f32 / 510.0)
    };
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::{EntryType, ScheduleEntry, TimetableData};
    use crate::models::view::{DetailLevel, LayoutKind};
    use crate::services::layout::LayoutOptions;
    use crate::services::timetable::TimetableDrawer;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_mapping_fits_page() {
        let options = PdfExportOptions::default();
        let mapping = PageMapping::fit(1000.0, 400.0, &options);
        // width limited: 277 mm for 1000 px
        assert!((mapping.scale - 0.277).abs() < 1e-4);
        assert_eq!(mapping.x(0.0), 10.0);
        assert!((mapping.y(100.0) - (188.0 - 27.7)).abs() < 1e-3);
    }

    #[test]
    fn test_mapping_tall_canvas_uses_height() {
        let options = PdfExportOptions::default();
        let mapping = PageMapping::fit(300.0, 1780.0, &options);
        assert!((mapping.scale - 0.1).abs() < 1e-4);
        let (_, bottom, _, height) = mapping.rect(&BlockRect {
            left: 0.0,
            top: 0.0,
            width: 100.0,
            height: 1780.0,
        });
        assert!((bottom - options.margin).abs() < 1e-3);
        assert!((height - 178.0).abs() < 1e-3);
    }

    #[test]
    fn test_hex_rgb() {
        assert_eq!(hex_rgb("#ffffff"), Some((1.0, 1.0, 1.0)));
        assert_eq!(hex_rgb("000000"), Some((0.5, 0.5, 0.5)));
        assert_eq!(hex_rgb("#fff"), None);
        assert_eq!(hex_rgb("#zz0000"), None);
    }

    #[test]
    fn test_export_day_writes_pdf() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 13)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let mut entry = ScheduleEntry::new("c1", EntryType::Contribution, "Opening talk", start, 45).unwrap();
        entry.color = Some("#336699".to_string());
        let mut data = TimetableData::new();
        data.entry("20240513".to_string())
            .or_default()
            .insert(entry.id.clone(), entry);

        let drawer = TimetableDrawer::new(
            data,
            LayoutOptions::default(),
            LayoutKind::Compact,
            DetailLevel::Session,
            800.0,
        );
        let rendered = drawer.rendered().unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("day.pdf");
        PdfExportService::export_day(rendered, &path, &PdfExportOptions::default()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
