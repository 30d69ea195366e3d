//! Checkpoint table: start and end points of every entry keyed by minute.

use std::collections::BTreeMap;

use super::defaults::WHOLEDAY_HOURS;
use crate::models::entry::ScheduleEntry;

/// Position of a checkpoint on the day's time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Checkpoint {
    /// Minutes since midnight; 1440 marks an entry ending exactly at midnight
    At(u32),
    /// The entry ends on a later day
    NextDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Start,
    End,
}

#[derive(Debug, Clone, Default)]
pub struct CheckpointTable {
    points: BTreeMap<Checkpoint, Vec<(PointKind, String)>>,
    whole_day: Vec<String>,
}

impl CheckpointTable {
    /// Build the table from entries already in walk order
    pub fn build(entries: &[&ScheduleEntry]) -> Self {
        let mut table = Self::default();

        for entry in entries {
            if entry.is_poster && entry.duration > WHOLEDAY_HOURS * 60 {
                table.whole_day.push(entry.id.clone());
                continue;
            }

            let start = entry.start_date.minute_of_day();
            table.add(Checkpoint::At(start), PointKind::Start, &entry.id);

            let days = (entry.end_date.date - entry.start_date.date).num_days();
            let end = entry.end_date.minute_of_day();
            let end_point = match days {
                d if d <= 0 => Checkpoint::At(end.max(start)),
                1 if end == 0 => Checkpoint::At(24 * 60),
                _ => Checkpoint::NextDay,
            };
            table.add(end_point, PointKind::End, &entry.id);
        }

        table
    }

    fn add(&mut self, at: Checkpoint, kind: PointKind, id: &str) {
        self.points
            .entry(at)
            .or_default()
            .push((kind, id.to_string()));
    }

    pub fn whole_day(&self) -> &[String] {
        &self.whole_day
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_next_day(&self) -> bool {
        self.points.contains_key(&Checkpoint::NextDay)
    }

    /// Points with a minute in `[from, to)`, in key then insertion order
    pub fn between(&self, from: u32, to: u32) -> Vec<(PointKind, &str)> {
        self.points
            .range(Checkpoint::At(from)..Checkpoint::At(to))
            .flat_map(|(_, points)| points.iter().map(|(k, id)| (*k, id.as_str())))
            .collect()
    }

    pub fn next_day(&self) -> Vec<(PointKind, &str)> {
        self.points
            .get(&Checkpoint::NextDay)
            .map(|points| points.iter().map(|(k, id)| (*k, id.as_str())).collect())
            .unwrap_or_default()
    }

    /// First and last hour to draw.
    ///
    /// The last hour skips checkpoints in hour 0. Falls back to the given
    /// window when there is at most one checkpoint.
    pub fn hour_window(&self, fallback_start: u32, fallback_end: u32) -> (u32, u32) {
        let minutes: Vec<u32> = self
            .points
            .keys()
            .filter_map(|k| match k {
                Checkpoint::At(m) => Some(*m),
                Checkpoint::NextDay => None,
            })
            .collect();

        if self.points.len() <= 1 || minutes.is_empty() {
            return (fallback_start, fallback_end);
        }

        let start = minutes[0] / 60;
        let end = minutes
            .iter()
            .rev()
            .map(|m| m / 60)
            .find(|h| *h > 0)
            .unwrap_or(start);

        (start, end.max(start))
    }
}
