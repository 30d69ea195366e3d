//! Block view objects.
//!
//! A block renders one entry as a rectangle. The texts it would like to show
//! come from the label builders here; [`fit::fit_block`] decides what
//! survives at the block's size.

pub mod fit;
mod truncate;

pub use fit::{fit_block, BlockLabels, FittedBlock, FixedAdvance, TextMeasure, TextRole};
pub use truncate::{truncate_title, MIN_KEPT_CHARS};

use crate::models::entry::ScheduleEntry;
use crate::models::view::DetailLevel;

/// Poster sessions shorter than this get no pile
const PILE_MIN_HEIGHT: f32 = 30.0;

/// Title, with the slot title and, when editing, the friendly id
pub fn title_label(entry: &ScheduleEntry, management_mode: bool) -> String {
    let mut title = entry.title.clone();
    if let Some(slot) = entry.slot_title.as_deref().filter(|s| !s.is_empty()) {
        title = format!("{}: {}", title, slot);
    }
    match entry.friendly_id.as_deref() {
        Some(friendly) if management_mode && !friendly.is_empty() => {
            format!("{} - {}", friendly, title)
        }
        _ => title,
    }
}

/// `HH:MM - HH:MM`, or a single time for zero-length entries
pub fn time_label(entry: &ScheduleEntry) -> String {
    let start = entry.start_date.time.format("%H:%M").to_string();
    let end = entry.end_date.time.format("%H:%M").to_string();
    if start == end {
        start
    } else {
        format!("{} - {}", start, end)
    }
}

pub fn location_label(entry: &ScheduleEntry, shows_room: bool) -> String {
    let room = entry
        .room
        .as_deref()
        .filter(|r| shows_room && !r.is_empty());
    let location = entry.location.as_deref().filter(|l| !l.is_empty());
    match (room, location) {
        (Some(room), Some(location)) => format!("{}, {}", room, location),
        (Some(room), None) => room.to_string(),
        (None, Some(location)) => location.to_string(),
        (None, None) => String::new(),
    }
}

/// First presenter, plus "et al." when there are more
pub fn presenters_label(entry: &ScheduleEntry) -> Option<String> {
    let first = entry.presenters.first()?;
    if entry.presenters.len() > 1 {
        Some(format!("{} et al.", first))
    } else {
        Some(first.clone())
    }
}

pub fn conveners_label(entry: &ScheduleEntry) -> Option<String> {
    if entry.conveners.is_empty() {
        return None;
    }
    let mut conveners: Vec<_> = entry.conveners.iter().collect();
    conveners.sort_by_key(|c| c.display_order_key);
    Some(
        conveners
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    )
}

pub fn block_labels(entry: &ScheduleEntry, management_mode: bool, shows_room: bool) -> BlockLabels {
    BlockLabels {
        title: title_label(entry, management_mode),
        time: time_label(entry),
        location: location_label(entry, shows_room),
        presenters: presenters_label(entry),
        convener: conveners_label(entry),
    }
}

/// Badge drawn on the right edge of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoration {
    /// Stack of contributions of a poster session
    Pile { count: usize },
    /// Grab area for moving
    DragHandle,
    /// Grab area on the bottom edge for resizing
    ResizeHandle,
}

impl Decoration {
    pub fn tooltip(&self) -> String {
        match self {
            Decoration::Pile { count } => {
                format!("This poster session has {} contribution(s).", count)
            }
            Decoration::DragHandle => "Drag to move".to_string(),
            Decoration::ResizeHandle => "Drag to change the end time".to_string(),
        }
    }
}

/// Editing actions offered by a management block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAction {
    /// Type in new start and end times
    EditTimes,
    MoveToSession,
}

impl BlockAction {
    pub fn label(&self) -> &'static str {
        match self {
            BlockAction::EditTimes => "Change times...",
            BlockAction::MoveToSession => "Move to session...",
        }
    }
}

/// Lines shown in a block's popup
pub trait PopupRenderer {
    fn popup_lines(&self) -> Vec<String>;
}

pub trait RightDecorator {
    fn decorations(&self) -> Vec<Decoration>;
}

/// Read-only block
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayBlock {
    entry: ScheduleEntry,
    labels: BlockLabels,
    detail: DetailLevel,
    height: f32,
}

impl DisplayBlock {
    pub fn new(entry: &ScheduleEntry, shows_room: bool, detail: DetailLevel, height: f32) -> Self {
        Self::with_labels(entry, block_labels(entry, false, shows_room), detail, height)
    }

    fn with_labels(entry: &ScheduleEntry, labels: BlockLabels, detail: DetailLevel, height: f32) -> Self {
        Self {
            entry: entry.clone(),
            labels,
            detail,
            height,
        }
    }

    fn pile(&self) -> Option<Decoration> {
        let poster_session = self.entry.is_session() && self.entry.is_poster;
        if poster_session && self.detail == DetailLevel::Contribution && self.height > PILE_MIN_HEIGHT {
            Some(Decoration::Pile {
                count: self.entry.entries.len(),
            })
        } else {
            None
        }
    }
}

impl PopupRenderer for DisplayBlock {
    fn popup_lines(&self) -> Vec<String> {
        let mut lines = vec![self.labels.title.clone(), self.labels.time.clone()];
        if !self.labels.location.is_empty() {
            lines.push(self.labels.location.clone());
        }
        if !self.entry.presenters.is_empty() {
            lines.push(self.entry.presenters.join(", "));
        }
        if let Some(conveners) = &self.labels.convener {
            lines.push(format!("Conveners: {}", conveners));
        }
        lines
    }
}

impl RightDecorator for DisplayBlock {
    fn decorations(&self) -> Vec<Decoration> {
        self.pile().into_iter().collect()
    }
}

/// Editable block: can be dragged, resized and edited
#[derive(Debug, Clone, PartialEq)]
pub struct ManagementBlock {
    inner: DisplayBlock,
}

impl ManagementBlock {
    pub fn new(entry: &ScheduleEntry, shows_room: bool, detail: DetailLevel, height: f32) -> Self {
        let labels = block_labels(entry, true, shows_room);
        Self {
            inner: DisplayBlock::with_labels(entry, labels, detail, height),
        }
    }

    pub fn actions(&self) -> Vec<BlockAction> {
        let mut actions = vec![BlockAction::EditTimes];
        if !self.inner.entry.is_session() && self.inner.entry.session_id.is_none() {
            actions.push(BlockAction::MoveToSession);
        }
        actions
    }
}

impl PopupRenderer for ManagementBlock {
    fn popup_lines(&self) -> Vec<String> {
        let mut lines = self.inner.popup_lines();
        lines.push("Hold Shift while dropping to move the following entries too".to_string());
        lines
    }
}

impl RightDecorator for ManagementBlock {
    fn decorations(&self) -> Vec<Decoration> {
        let mut decorations = self.inner.decorations();
        decorations.push(Decoration::DragHandle);
        decorations.push(Decoration::ResizeHandle);
        decorations
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimetableBlock {
    Display(DisplayBlock),
    Management(ManagementBlock),
}

impl TimetableBlock {
    pub fn new(
        entry: &ScheduleEntry,
        management_mode: bool,
        shows_room: bool,
        detail: DetailLevel,
        height: f32,
    ) -> Self {
        if management_mode {
            TimetableBlock::Management(ManagementBlock::new(entry, shows_room, detail, height))
        } else {
            TimetableBlock::Display(DisplayBlock::new(entry, shows_room, detail, height))
        }
    }

    fn display(&self) -> &DisplayBlock {
        match self {
            TimetableBlock::Display(block) => block,
            TimetableBlock::Management(block) => &block.inner,
        }
    }

    pub fn entry(&self) -> &ScheduleEntry {
        &self.display().entry
    }

    pub fn labels(&self) -> &BlockLabels {
        &self.display().labels
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, TimetableBlock::Management(_))
    }

    pub fn actions(&self) -> Vec<BlockAction> {
        match self {
            TimetableBlock::Display(_) => Vec::new(),
            TimetableBlock::Management(block) => block.actions(),
        }
    }

    pub fn fit(&self, width: f32, height: f32, measure: &dyn TextMeasure) -> FittedBlock {
        fit_block(self.labels(), width, height, measure)
    }
}

impl PopupRenderer for TimetableBlock {
    fn popup_lines(&self) -> Vec<String> {
        match self {
            TimetableBlock::Display(block) => block.popup_lines(),
            TimetableBlock::Management(block) => block.popup_lines(),
        }
    }
}

impl RightDecorator for TimetableBlock {
    fn decorations(&self) -> Vec<Decoration> {
        match self {
            TimetableBlock::Display(block) => block.decorations(),
            TimetableBlock::Management(block) => block.decorations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::{Convener, EntryType};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn entry(entry_type: EntryType, duration: i64) -> ScheduleEntry {
        let start = NaiveDate::from_ymd_opt(2024, 5, 13)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        ScheduleEntry::new("12", entry_type, "Detector R&D", start, duration).unwrap()
    }

    #[test]
    fn test_time_label() {
        assert_eq!(time_label(&entry(EntryType::Contribution, 90)), "09:00 - 10:30");
        assert_eq!(time_label(&entry(EntryType::Contribution, 0)), "09:00");
    }

    #[test]
    fn test_title_label_in_management_mode() {
        let mut e = entry(EntryType::Contribution, 30);
        e.friendly_id = Some("7".to_string());
        e.slot_title = Some("Part 2".to_string());
        assert_eq!(title_label(&e, false), "Detector R&D: Part 2");
        assert_eq!(title_label(&e, true), "7 - Detector R&D: Part 2");
    }

    #[test]
    fn test_location_label_hides_room() {
        let mut e = entry(EntryType::Contribution, 30);
        e.room = Some("Main Auditorium".to_string());
        e.location = Some("CERN".to_string());
        assert_eq!(location_label(&e, true), "Main Auditorium, CERN");
        assert_eq!(location_label(&e, false), "CERN");
        e.location = None;
        assert_eq!(location_label(&e, false), "");
    }

    #[test]
    fn test_presenters_and_conveners() {
        let mut e = entry(EntryType::Session, 60);
        assert_eq!(presenters_label(&e), None);
        e.presenters = vec!["Ada".to_string(), "Grace".to_string()];
        assert_eq!(presenters_label(&e).as_deref(), Some("Ada et al."));
        e.conveners = vec![
            Convener {
                name: "Second".to_string(),
                display_order_key: 2,
            },
            Convener {
                name: "First".to_string(),
                display_order_key: 1,
            },
        ];
        assert_eq!(conveners_label(&e).as_deref(), Some("First, Second"));
    }

    #[test]
    fn test_pile_only_for_tall_poster_sessions_at_contribution_detail() {
        let mut session = entry(EntryType::Session, 120);
        session.is_poster = true;
        for id in ["p1", "p2", "p3"] {
            let child = entry(EntryType::Contribution, 10);
            session.entries.insert(id.to_string(), child);
        }

        let block = TimetableBlock::new(&session, false, true, DetailLevel::Contribution, 80.0);
        assert_eq!(block.decorations(), vec![Decoration::Pile { count: 3 }]);
        assert_eq!(
            block.decorations()[0].tooltip(),
            "This poster session has 3 contribution(s)."
        );

        let short = TimetableBlock::new(&session, false, true, DetailLevel::Contribution, 30.0);
        assert!(short.decorations().is_empty());
        let session_detail = TimetableBlock::new(&session, false, true, DetailLevel::Session, 80.0);
        assert!(session_detail.decorations().is_empty());
    }

    #[test]
    fn test_management_block_is_editable() {
        let e = entry(EntryType::Break, 15);
        let block = TimetableBlock::new(&e, true, true, DetailLevel::Session, 60.0);
        assert!(block.is_editable());
        assert!(block.decorations().contains(&Decoration::DragHandle));
        assert_eq!(
            block.actions(),
            vec![BlockAction::EditTimes, BlockAction::MoveToSession]
        );

        let display = TimetableBlock::new(&e, false, true, DetailLevel::Session, 60.0);
        assert!(!display.is_editable());
        assert!(display.actions().is_empty());
        assert_eq!(display.popup_lines()[0], "Detector R&D");
    }
}
