//! Fitting block content into its rectangle.
//!
//! Content degrades in a fixed order, re-measuring after every step: time
//! label, location width, presenters, convener, location, and finally the
//! title itself.

use super::truncate::{truncate_title, MIN_KEPT_CHARS};
use crate::services::layout::defaults::BLOCK_MARGIN;

/// Kind of text being measured; renderers may use a different font per role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextRole {
    Title,
    Time,
    Location,
    Presenters,
    Convener,
}

pub trait TextMeasure {
    /// Width of `text` laid out on one line
    fn text_width(&self, text: &str, role: TextRole) -> f32;

    fn line_height(&self, role: TextRole) -> f32;

    /// Height of `text` wrapped to `max_width`
    fn wrapped_height(&self, text: &str, role: TextRole, max_width: f32) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let width = self.text_width(text, role);
        let lines = if max_width <= 0.0 {
            1.0
        } else {
            (width / max_width).ceil().max(1.0)
        };
        lines * self.line_height(role)
    }
}

/// Fixed advance per character; used for printing and in tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAdvance {
    pub char_width: f32,
    pub line_height: f32,
}

impl TextMeasure for FixedAdvance {
    fn text_width(&self, text: &str, _role: TextRole) -> f32 {
        text.chars().count() as f32 * self.char_width
    }

    fn line_height(&self, _role: TextRole) -> f32 {
        self.line_height
    }
}

/// Texts a block would show with unlimited room
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockLabels {
    pub title: String,
    pub time: String,
    pub location: String,
    pub presenters: Option<String>,
    pub convener: Option<String>,
}

/// What survives fitting; `None` means hidden
#[derive(Debug, Clone, PartialEq)]
pub struct FittedBlock {
    pub title: String,
    pub time: Option<String>,
    pub location: Option<String>,
    pub location_max_width: f32,
    pub presenters: Option<String>,
    pub convener: Option<String>,
}

struct Fitting<'a> {
    labels: &'a BlockLabels,
    measure: &'a dyn TextMeasure,
    width: f32,
    title: String,
    show_time: bool,
    show_location: bool,
    location_max_width: f32,
    presenters: Option<String>,
    convener: Option<String>,
}

impl Fitting<'_> {
    fn inner_width(&self) -> f32 {
        (self.width - 2.0 * BLOCK_MARGIN).max(1.0)
    }

    fn has_location(&self) -> bool {
        self.show_location && !self.labels.location.is_empty()
    }

    fn time_width(&self) -> f32 {
        if self.show_time {
            self.measure.text_width(&self.labels.time, TextRole::Time)
        } else {
            0.0
        }
    }

    fn location_width(&self) -> f32 {
        if !self.has_location() {
            return 0.0;
        }
        self.measure
            .text_width(&self.labels.location, TextRole::Location)
            .min(self.location_max_width)
    }

    fn content_width(&self) -> f32 {
        self.time_width() + self.location_width() + 2.0 * BLOCK_MARGIN
    }

    fn content_height(&self) -> f32 {
        let title = self
            .measure
            .wrapped_height(&self.title, TextRole::Title, self.inner_width());
        let location = if self.has_location() {
            self.measure.wrapped_height(
                &self.labels.location,
                TextRole::Location,
                self.location_max_width,
            )
        } else {
            0.0
        };
        let time = if self.show_time {
            self.measure.line_height(TextRole::Time)
        } else {
            0.0
        };
        title + location.max(time)
    }

    fn top_content_width(&self) -> f32 {
        let title = self
            .measure
            .text_width(&self.title, TextRole::Title)
            .min(self.inner_width());
        let presenters = self
            .presenters
            .as_deref()
            .map(|p| self.measure.text_width(p, TextRole::Presenters))
            .unwrap_or(0.0);
        2.0 * BLOCK_MARGIN + title + presenters
    }

    fn overflows(&self, height: f32) -> bool {
        self.content_width() >= self.width || self.content_height() >= height
    }
}

/// Decide what a block of `width` x `height` can show.
///
/// A block with no height yet is returned untouched.
pub fn fit_block(
    labels: &BlockLabels,
    width: f32,
    height: f32,
    measure: &dyn TextMeasure,
) -> FittedBlock {
    let mut fit = Fitting {
        labels,
        measure,
        width,
        title: labels.title.clone(),
        show_time: !labels.time.is_empty(),
        show_location: true,
        location_max_width: width - 20.0,
        presenters: labels.presenters.clone(),
        convener: labels.convener.clone(),
    };

    if height > 0.0 {
        degrade(&mut fit, height);
    }

    FittedBlock {
        time: fit.show_time.then(|| labels.time.clone()),
        location: fit.has_location().then(|| labels.location.clone()),
        location_max_width: fit.location_max_width,
        title: fit.title,
        presenters: fit.presenters,
        convener: fit.convener,
    }
}

fn degrade(fit: &mut Fitting<'_>, height: f32) {
    let width = fit.width;
    let mut location_max = width - 20.0;

    // Time label
    let time_width = fit.measure.text_width(&fit.labels.time, TextRole::Time);
    if time_width + 8.0 >= width || fit.overflows(height) {
        fit.show_time = false;
    } else {
        location_max -= time_width;
    }
    fit.location_max_width = location_max.max(0.0);

    // Location width; a wrapped location pushes the time out
    if fit.overflows(height) {
        fit.show_time = false;
        fit.location_max_width = (width - 20.0).max(0.0);
    }

    // Presenters may take at most half the block
    if let Some(presenters) = &fit.presenters {
        if fit.measure.text_width(presenters, TextRole::Presenters) > width / 2.0 {
            fit.presenters = None;
        }
    }

    // Convener is shortened to half the block, then dropped if too tall
    if let Some(convener) = fit.convener.clone() {
        let convener_width = fit.measure.text_width(&convener, TextRole::Convener);
        let mut convener = convener;
        if convener_width > width / 2.0 {
            let len = convener.chars().count() as f32;
            let budget = (width / 2.0 / convener_width * len).floor() as i64 - 1;
            convener = truncate_title(budget, &convener);
        }
        let convener_height = fit
            .measure
            .wrapped_height(&convener, TextRole::Convener, fit.inner_width());
        fit.convener = if convener_height + fit.content_height() > height {
            None
        } else {
            Some(convener)
        };
    }

    if fit.content_height() <= height {
        return;
    }

    if !fit.show_time {
        fit.show_location = false;
    }
    if fit.content_height() <= height {
        return;
    }

    // Title: proportional cut, then two characters at a time
    let base = fit.labels.title.clone();
    let len = base.chars().count();
    if len <= MIN_KEPT_CHARS {
        return;
    }
    let mut budget = (len as f32 * height / fit.content_height()).ceil() as i64;
    fit.title = truncate_title(budget, &base);
    while budget > MIN_KEPT_CHARS as i64
        && fit.content_height() > height
        && fit.top_content_width() > width * 0.8
    {
        budget -= 2;
        fit.title = truncate_title(budget, &base);
    }
}
