use std::collections::HashMap;

use crate::models::view::ViewType;
use crate::services::bookings::{BatchAction, BatchItem, ErrorPopup};
use crate::models::booking::Booking;
use crate::services::quantize::GridTime;
use crate::ui_egui::commands::HistoryStep;
use tokio::sync::mpsc::UnboundedReceiver;

/// Error report shown in its own window
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorWindow {
    pub title: String,
    pub lines: Vec<String>,
}

impl ErrorWindow {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: vec![message.into()],
        }
    }
}

impl From<ErrorPopup> for ErrorWindow {
    fn from(popup: ErrorPopup) -> Self {
        let mut lines = popup.lines;
        lines.extend(
            popup
                .invalid_fields
                .into_iter()
                .map(|f| format!("{}: {}", f.field, f.message)),
        );
        Self {
            title: popup.title,
            lines,
        }
    }
}

/// Typed-in start and end for one entry
#[derive(Debug, Clone, PartialEq)]
pub struct RetimeDialog {
    pub entry_id: String,
    pub title: String,
    pub start: String,
    pub end: String,
    pub shift_later: bool,
    pub error: Option<String>,
}

impl RetimeDialog {
    /// Parse `HH:MM` into a grid time
    pub fn parse(text: &str) -> Option<GridTime> {
        let (hour, minute) = text.trim().split_once(':')?;
        let hour: u32 = hour.trim().parse().ok()?;
        let minute: u32 = minute.trim().parse().ok()?;
        (hour < 24 && minute < 60).then(|| GridTime::new(hour, minute))
    }

    pub fn times(&self) -> Result<(GridTime, GridTime), String> {
        let start = Self::parse(&self.start).ok_or_else(|| format!("Invalid start time: {}", self.start))?;
        let end = Self::parse(&self.end).ok_or_else(|| format!("Invalid end time: {}", self.end))?;
        Ok((start, end))
    }
}

/// A running start-all or stop-all
#[derive(Debug)]
pub struct BatchProgress {
    pub action: BatchAction,
    pub total: usize,
    pub done: usize,
    pub failed: usize,
    pub results: UnboundedReceiver<BatchItem<Booking>>,
}

#[derive(Debug, Default)]
pub struct AppState {
    pub view: ViewType,
    pub error_window: Option<ErrorWindow>,
    pub retime: Option<RetimeDialog>,
    /// History step of each in-flight commit, by entry id
    pub history_steps: HashMap<String, HistoryStep>,
    pub batch: Option<BatchProgress>,
    pub show_about_dialog: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::FieldError;

    #[test]
    fn test_parse_times() {
        assert_eq!(RetimeDialog::parse("09:05"), Some(GridTime::new(9, 5)));
        assert_eq!(RetimeDialog::parse(" 14:30 "), Some(GridTime::new(14, 30)));
        assert_eq!(RetimeDialog::parse("24:00"), None);
        assert_eq!(RetimeDialog::parse("9h30"), None);
    }

    #[test]
    fn test_popup_fields_become_lines() {
        let mut popup = ErrorPopup::new("Cannot create", vec!["Room busy".to_string()]);
        popup.invalid_fields.push(FieldError::new("pin", "Too short"));
        let window = ErrorWindow::from(popup);
        assert_eq!(window.title, "Cannot create");
        assert_eq!(window.lines, vec!["Room busy", "pin: Too short"]);
    }
}
