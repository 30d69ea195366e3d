//! Timetable drawer.
//!
//! Owns the confirmed day data, the current day, detail level, layout choice,
//! filters and the moves waiting for the server. Every state change goes
//! through [`TimetableDrawer::request_redraw`], which can be suspended to fold
//! several changes into one layout pass.

pub mod filters;
pub mod render;

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::models::commit::{CommitRequest, CommitResponse};
use crate::models::config::AppConfig;
use crate::models::entry::{DayEntries, ScheduleEntry, TimetableData};
use crate::models::view::{DetailLevel, LayoutKind};
use crate::services::layout::flatten::flatten_day;
use crate::services::layout::{LayoutChooser, LayoutOptions};
use crate::services::quantize::{evaluate_drop, evaluate_retime, DragEdge, DropOutcome, DropTarget, GridTime};
use crate::utils::date::{day_key, parse_day_key};

pub use filters::EntryFilters;
pub use render::{BlockRect, HeaderCell, PositionedBlock, RenderContext, RenderedDay};

pub struct TimetableDrawer {
    data: TimetableData,
    day: Option<String>,
    detail: DetailLevel,
    chooser: LayoutChooser,
    filters: EntryFilters,
    options: LayoutOptions,
    width: f32,
    /// Optimistic moves keyed by entry id
    pending: BTreeMap<String, CommitRequest>,
    redraw_suspended: bool,
    redraw_requested: bool,
    redraw_count: usize,
    rendered: Option<RenderedDay>,
}

impl TimetableDrawer {
    pub fn new(data: TimetableData, options: LayoutOptions, layout: LayoutKind, detail: DetailLevel, width: f32) -> Self {
        let day = data.keys().next().cloned();
        let mut drawer = Self {
            data,
            day,
            detail,
            chooser: LayoutChooser::new(layout),
            filters: EntryFilters::default(),
            options,
            width,
            pending: BTreeMap::new(),
            redraw_suspended: false,
            redraw_requested: false,
            redraw_count: 0,
            rendered: None,
        };
        drawer.redraw();
        drawer
    }

    pub fn from_config(config: &AppConfig, data: TimetableData) -> Self {
        let options = LayoutOptions {
            management_mode: config.management_mode,
            day_start_hour: config.day_start_hour,
            day_end_hour: config.day_end_hour,
        };
        Self::new(
            data,
            options,
            config.default_layout,
            config.default_detail,
            config.timetable_width,
        )
    }

    pub fn data(&self) -> &TimetableData {
        &self.data
    }

    /// Day keys in date order
    pub fn days(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    pub fn current_day(&self) -> Option<&str> {
        self.day.as_deref()
    }

    pub fn current_date(&self) -> Option<NaiveDate> {
        self.day
            .as_deref()
            .and_then(parse_day_key)
    }

    pub fn detail(&self) -> DetailLevel {
        self.detail
    }

    pub fn layout_kind(&self) -> LayoutKind {
        self.chooser.current_kind()
    }

    pub fn filters(&self) -> &EntryFilters {
        &self.filters
    }

    pub fn options(&self) -> LayoutOptions {
        self.options
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn rendered(&self) -> Option<&RenderedDay> {
        self.rendered.as_ref()
    }

    /// Number of layout passes run so far
    pub fn redraw_count(&self) -> usize {
        self.redraw_count
    }

    /// Switch to `day`; unknown days are ignored
    pub fn set_day(&mut self, day: &str) -> bool {
        if !self.data.contains_key(day) {
            log::debug!("Ignoring unknown day {}", day);
            return false;
        }
        if self.day.as_deref() != Some(day) {
            self.day = Some(day.to_string());
            self.request_redraw();
        }
        true
    }

    pub fn set_date(&mut self, date: NaiveDate) -> bool {
        self.set_day(&day_key(date))
    }

    pub fn set_detail(&mut self, detail: DetailLevel) {
        if self.detail != detail {
            self.detail = detail;
            self.request_redraw();
        }
    }

    pub fn set_layout(&mut self, kind: LayoutKind) {
        if self.chooser.current_kind() != kind {
            self.chooser.set(kind);
            self.request_redraw();
        }
    }

    pub fn set_filters(&mut self, filters: EntryFilters) {
        if self.filters != filters {
            self.filters = filters;
            self.request_redraw();
        }
    }

    pub fn set_width(&mut self, width: f32) {
        if (self.width - width).abs() >= 1.0 {
            self.width = width;
            self.request_redraw();
        }
    }

    pub fn set_management_mode(&mut self, enabled: bool) {
        if self.options.management_mode != enabled {
            self.options.management_mode = enabled;
            self.request_redraw();
        }
    }

    /// Suspend redrawing. Returns false when already suspended.
    pub fn prevent_redraw(&mut self) -> bool {
        if self.redraw_suspended {
            return false;
        }
        self.redraw_suspended = true;
        self.redraw_requested = false;
        true
    }

    /// Resume redrawing and run one pass if anything changed meanwhile
    pub fn allow_redraw(&mut self) {
        self.redraw_suspended = false;
        if std::mem::take(&mut self.redraw_requested) {
            self.redraw();
        }
    }

    /// Apply several changes with a single layout pass at the end.
    ///
    /// Nested calls run `f` inside the outer suspension.
    pub fn with_redraw_suspended<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let owner = self.prevent_redraw();
        let result = f(self);
        if owner {
            self.allow_redraw();
        }
        result
    }

    pub fn request_redraw(&mut self) {
        if self.redraw_suspended {
            self.redraw_requested = true;
        } else {
            self.redraw();
        }
    }

    fn redraw(&mut self) {
        self.redraw_count += 1;
        let rendered = self.day.as_deref().map(|day| self.render_day(day));
        self.rendered = rendered;
        log::debug!(
            "Redraw #{} of {:?} ({} layout)",
            self.redraw_count,
            self.day,
            self.chooser.current_kind()
        );
    }

    /// Entries of `day` as they should be laid out: pending moves applied,
    /// flattened for the detail level and filtered
    pub fn effective_entries(&self, day: &str) -> DayEntries {
        let mut entries = self.data.get(day).cloned().unwrap_or_default();
        for request in self.pending.values().filter(|r| r.day == day) {
            if let Some(entry) = find_entry_mut(&mut entries, &request.entry_id) {
                entry.reschedule(request.start, request.end);
            }
        }
        self.filters.apply(&flatten_day(&entries, self.detail))
    }

    pub fn render_day(&self, day: &str) -> RenderedDay {
        let entries = self.effective_entries(day);
        let pending: BTreeSet<String> = self.pending.keys().cloned().collect();
        let ctx = RenderContext {
            strategy: self.chooser.get(),
            options: self.options,
            detail: self.detail,
            width: self.width,
            pending: &pending,
        };
        render::render_day(day, &entries, &ctx)
    }

    /// Every day rendered with the current settings, in date order
    pub fn render_all_days(&self) -> Vec<RenderedDay> {
        self.data.keys().map(|day| self.render_day(day)).collect()
    }

    /// Confirmed entry, searched inside sessions too
    pub fn entry(&self, day: &str, id: &str) -> Option<&ScheduleEntry> {
        find_entry(self.data.get(day)?, id)
    }

    /// Entry as currently displayed on the current day
    pub fn displayed_entry(&self, id: &str) -> Option<ScheduleEntry> {
        let day = self.day.as_deref()?;
        self.effective_entries(day).remove(id)
    }

    /// Judge a drop of `id` on the current day
    pub fn evaluate_drop(&self, id: &str, edge: DragEdge, time: Option<GridTime>, shift_later: bool) -> Option<DropOutcome> {
        let entry = self.displayed_entry(id)?;
        let day = self.current_date()?;
        Some(evaluate_drop(&DropTarget {
            entry: &entry,
            day,
            edge,
            time,
            day_start_hour: self.options.day_start_hour,
            window_end_hour: self.window_end_hour(),
            shift_later,
        }))
    }

    /// Judge typed-in times for `id` on the current day
    pub fn evaluate_retime(&self, id: &str, start: GridTime, end: GridTime, shift_later: bool) -> Option<DropOutcome> {
        let entry = self.displayed_entry(id)?;
        let day = self.current_date()?;
        Some(evaluate_retime(
            &DropTarget {
                entry: &entry,
                day,
                edge: DragEdge::Start,
                time: Some(start),
                day_start_hour: self.options.day_start_hour,
                window_end_hour: self.window_end_hour(),
                shift_later,
            },
            end,
        ))
    }

    fn window_end_hour(&self) -> u32 {
        self.rendered
            .as_ref()
            .map(RenderedDay::window_end_hour)
            .unwrap_or(self.options.day_end_hour)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Show a move at its new position until the server answers
    pub fn begin_commit(&mut self, request: CommitRequest) {
        log::info!(
            "Moving entry {} to {} - {}",
            request.entry_id,
            request.start,
            request.end
        );
        self.pending.insert(request.entry_id.clone(), request);
        self.request_redraw();
    }

    /// Apply the server's answer to a commit
    pub fn apply_commit(&mut self, request: &CommitRequest, response: CommitResponse) {
        self.pending.remove(&request.entry_id);
        match response {
            CommitResponse::Entry(entry) => {
                let day = self.data.entry(request.day.clone()).or_default();
                match find_entry_mut(day, &entry.id) {
                    Some(existing) => *existing = entry,
                    None => {
                        day.insert(entry.id.clone(), entry);
                    }
                }
            }
            CommitResponse::Day { day, entries } => {
                self.data.insert(day, entries);
            }
        }
        log::info!("Commit of entry {} confirmed", request.entry_id);
        self.request_redraw();
    }

    /// Drop the optimistic position; the block goes back to its confirmed place
    pub fn fail_commit(&mut self, entry_id: &str) {
        if self.pending.remove(entry_id).is_some() {
            log::warn!("Commit of entry {} failed, reverting", entry_id);
            self.request_redraw();
        }
    }

    /// Replace one day with fresh server data
    pub fn replace_day(&mut self, day: &str, entries: DayEntries) {
        self.data.insert(day.to_string(), entries);
        if self.day.is_none() {
            self.day = Some(day.to_string());
        }
        self.request_redraw();
    }

    /// Replace the whole timetable, keeping the current day when it still exists
    pub fn replace_data(&mut self, data: TimetableData) {
        self.pending.clear();
        self.data = data;
        if !self.day.as_ref().is_some_and(|d| self.data.contains_key(d)) {
            self.day = self.data.keys().next().cloned();
        }
        self.request_redraw();
    }

    /// Sessions of the current day as (session id, title), for the filter menu
    pub fn sessions(&self) -> Vec<(String, String)> {
        let mut sessions: Vec<(String, String)> = self
            .data
            .values()
            .flat_map(|day| day.values())
            .filter(|e| e.is_session())
            .filter_map(|e| Some((e.session_id.clone()?, e.title.clone())))
            .collect();
        sessions.sort();
        sessions.dedup_by(|a, b| a.0 == b.0);
        sessions
    }

    pub fn rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> = self
            .data
            .values()
            .flat_map(|day| day.values())
            .flat_map(|e| std::iter::once(e).chain(e.entries.values()))
            .filter_map(|e| e.room.clone())
            .filter(|r| !r.is_empty())
            .collect();
        rooms.sort();
        rooms.dedup();
        rooms
    }
}

pub fn find_entry<'a>(entries: &'a DayEntries, id: &str) -> Option<&'a ScheduleEntry> {
    if let Some(entry) = entries.get(id) {
        return Some(entry);
    }
    entries.values().find_map(|e| find_entry(&e.entries, id))
}

pub fn find_entry_mut<'a>(entries: &'a mut DayEntries, id: &str) -> Option<&'a mut ScheduleEntry> {
    if entries.contains_key(id) {
        return entries.get_mut(id);
    }
    entries
        .values_mut()
        .find_map(|e| find_entry_mut(&mut e.entries, id))
}
