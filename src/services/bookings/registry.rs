//! Booking plugin capabilities.
//!
//! Every booking type (`Vidyo`, `CERNMCU`, ...) may supply its own parameter
//! checks, error handling, info rows and client-side actions. None of them is
//! mandatory: callers test for presence and fall back to the generic path.

use std::collections::HashMap;
use std::fmt;

use anyhow::Context;
use chrono::NaiveDateTime;
use serde_json::Value;

use crate::errors::BusinessError;
use crate::models::booking::{Booking, FieldError};
use crate::utils::date::parse_form_datetime;

/// Booking action a callback or an error relates to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingEvent {
    Create,
    Edit,
    Remove,
    Start,
    Stop,
    CheckStatus,
    Accept,
    Reject,
    Attach,
    Search,
    Connect,
    Disconnect,
}

impl BookingEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingEvent::Create => "create",
            BookingEvent::Edit => "edit",
            BookingEvent::Remove => "remove",
            BookingEvent::Start => "start",
            BookingEvent::Stop => "stop",
            BookingEvent::CheckStatus => "checkStatus",
            BookingEvent::Accept => "accept",
            BookingEvent::Reject => "reject",
            BookingEvent::Attach => "attach",
            BookingEvent::Search => "search",
            BookingEvent::Connect => "connect",
            BookingEvent::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for BookingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event facts the parameter checks compare against
#[derive(Debug, Clone, PartialEq)]
pub struct ParamContext {
    pub conference_id: String,
    /// Wall-clock time in the event timezone
    pub now: NaiveDateTime,
    /// Earliest allowed booking start
    pub min_start: Option<NaiveDateTime>,
    /// Latest allowed booking end
    pub max_end: Option<NaiveDateTime>,
}

/// Error popup contents produced by a plugin error handler
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorPopup {
    pub title: String,
    pub lines: Vec<String>,
    /// Form fields to mark as invalid
    pub invalid_fields: Vec<FieldError>,
}

impl ErrorPopup {
    pub fn new(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            title: title.into(),
            lines,
            invalid_fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: &str, message: &str) -> Self {
        self.invalid_fields.push(FieldError::new(field, message));
        self
    }

    /// Popup used when the booking type has no handler of its own
    pub fn generic(event: BookingEvent, error: &BusinessError) -> Self {
        ErrorPopup {
            title: format!("Error during {}", event),
            lines: vec![error.to_string()],
            invalid_fields: error.field_errors(),
        }
    }
}

/// One label/value row of the expanded booking info
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoRow {
    pub label: String,
    pub value: String,
}

impl InfoRow {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Opens booking URLs in a named launch target
#[cfg_attr(test, mockall::automock)]
pub trait Launcher {
    fn open(&self, target: &str, url: &str) -> anyhow::Result<()>;
}

/// Launcher backed by the system web browser
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserLauncher;

impl Launcher for BrowserLauncher {
    fn open(&self, target: &str, url: &str) -> anyhow::Result<()> {
        log::info!("Opening {} for {}", url, target);
        webbrowser::open(url).with_context(|| format!("Failed to open {}", url))
    }
}

pub type ParamCheck = Box<dyn Fn(&Value, &ParamContext) -> Vec<FieldError> + Send + Sync>;
pub type ErrorHandler = Box<dyn Fn(BookingEvent, &BusinessError) -> ErrorPopup + Send + Sync>;
pub type InfoRenderer = Box<dyn Fn(&Booking) -> Vec<InfoRow> + Send + Sync>;
pub type TextRenderer = Box<dyn Fn(&Booking) -> String + Send + Sync>;
pub type ClientAction = Box<dyn Fn(&Booking, &str, &dyn Launcher) -> anyhow::Result<()> + Send + Sync>;
pub type StartCheck = Box<dyn Fn(&mut Booking) -> bool + Send + Sync>;
/// Runs after a successful create, edit or remove; returns a notice to show
pub type BookingHook = Box<dyn Fn(&Booking) -> Option<String> + Send + Sync>;

/// Optional callbacks of one booking type
#[derive(Default)]
pub struct PluginCapabilities {
    pub check_params: Option<ParamCheck>,
    pub error_handler: Option<ErrorHandler>,
    pub show_info: Option<InfoRenderer>,
    pub custom_text: Option<TextRenderer>,
    pub check_start: Option<StartCheck>,
    pub start: Option<ClientAction>,
    pub stop: Option<ClientAction>,
    pub connect: Option<ClientAction>,
    pub disconnect: Option<ClientAction>,
    pub post_create: Option<BookingHook>,
    pub post_edit: Option<BookingHook>,
    pub post_delete: Option<BookingHook>,
}

impl fmt::Debug for PluginCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCapabilities")
            .field("check_params", &self.check_params.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .field("show_info", &self.show_info.is_some())
            .field("custom_text", &self.custom_text.is_some())
            .field("check_start", &self.check_start.is_some())
            .field("start", &self.start.is_some())
            .field("stop", &self.stop.is_some())
            .field("connect", &self.connect.is_some())
            .field("disconnect", &self.disconnect.is_some())
            .field("post_create", &self.post_create.is_some())
            .field("post_edit", &self.post_edit.is_some())
            .field("post_delete", &self.post_delete.is_some())
            .finish()
    }
}

impl PluginCapabilities {
    /// Parameter problems, empty when the plugin has no checks
    pub fn validate(&self, params: &Value, ctx: &ParamContext) -> Vec<FieldError> {
        match &self.check_params {
            Some(check) => check(params, ctx),
            None => Vec::new(),
        }
    }

    /// Whether a start may go ahead. Without a check it always may; the
    /// client call still needs the booking's permission flag.
    pub fn allows_start(&self, booking: &mut Booking) -> bool {
        match &self.check_start {
            Some(check) => check(booking),
            None => true,
        }
    }

    pub fn action(&self, event: BookingEvent) -> Option<&ClientAction> {
        match event {
            BookingEvent::Start => self.start.as_ref(),
            BookingEvent::Stop => self.stop.as_ref(),
            BookingEvent::Connect => self.connect.as_ref(),
            BookingEvent::Disconnect => self.disconnect.as_ref(),
            _ => None,
        }
    }

    pub fn hook(&self, event: BookingEvent) -> Option<&BookingHook> {
        match event {
            BookingEvent::Create => self.post_create.as_ref(),
            BookingEvent::Edit => self.post_edit.as_ref(),
            BookingEvent::Remove => self.post_delete.as_ref(),
            _ => None,
        }
    }
}

/// Capabilities keyed by booking type tag
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, PluginCapabilities>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the plugins shipped with the application
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("Vidyo", builtin::vidyo());
        registry.register("CERNMCU", builtin::cern_mcu());
        registry.register("WebEx", builtin::webex());
        registry.register("EVO", builtin::evo());
        registry
    }

    pub fn register(&mut self, booking_type: &str, capabilities: PluginCapabilities) {
        if self
            .plugins
            .insert(booking_type.to_string(), capabilities)
            .is_some()
        {
            log::debug!("Replaced capabilities of booking type {}", booking_type);
        }
    }

    pub fn get(&self, booking_type: &str) -> Option<&PluginCapabilities> {
        self.plugins.get(booking_type)
    }

    pub fn contains(&self, booking_type: &str) -> bool {
        self.plugins.contains_key(booking_type)
    }

    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.plugins.keys().cloned().collect();
        types.sort();
        types
    }

    /// Parameter problems for a create or edit of `booking_type`
    pub fn validate(&self, booking_type: &str, params: &Value, ctx: &ParamContext) -> Vec<FieldError> {
        self.get(booking_type)
            .map(|plugin| plugin.validate(params, ctx))
            .unwrap_or_default()
    }

    /// Popup for a server refusal, through the plugin handler when present
    pub fn error_popup(&self, booking_type: &str, event: BookingEvent, error: &BusinessError) -> ErrorPopup {
        match self.get(booking_type).and_then(|p| p.error_handler.as_ref()) {
            Some(handler) => {
                let mut popup = handler(event, error);
                // Sanitization refusals always mark their fields
                for field in error.field_errors() {
                    if !popup.invalid_fields.iter().any(|f| f.field == field.field) {
                        popup.invalid_fields.push(field);
                    }
                }
                popup
            }
            None => ErrorPopup::generic(event, error),
        }
    }

    pub fn info_rows(&self, booking: &Booking) -> Vec<InfoRow> {
        match self.get(&booking.booking_type).and_then(|p| p.show_info.as_ref()) {
            Some(render) => render(booking),
            None => default_info(booking),
        }
    }

    /// Status text shown in the booking row
    pub fn status_text(&self, booking: &Booking) -> String {
        match self.get(&booking.booking_type).and_then(|p| p.custom_text.as_ref()) {
            Some(render) => render(booking),
            None => booking.status_message.clone(),
        }
    }
}

fn default_info(booking: &Booking) -> Vec<InfoRow> {
    let mut rows = vec![InfoRow::new("Booking ID:", booking.id.clone())];
    if let Some(url) = &booking.url {
        rows.push(InfoRow::new("URL:", url.clone()));
    }
    if let Value::Object(params) = &booking.booking_params {
        for (key, value) in params {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            rows.push(InfoRow::new(format!("{}:", key), text));
        }
    }
    rows
}

// ---------------------------
// Parameter rule helpers
// ---------------------------

fn param_str<'a>(params: &'a Value, field: &str) -> &'a str {
    params.get(field).and_then(Value::as_str).unwrap_or_default()
}

fn require(params: &Value, field: &str, errors: &mut Vec<FieldError>) {
    if param_str(params, field).trim().is_empty() {
        errors.push(FieldError::new(field, "This field is mandatory"));
    }
}

fn is_integer(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Start/end checks shared by the plugins that book a time window
fn check_window(params: &Value, ctx: &ParamContext, errors: &mut Vec<FieldError>) {
    let start = parse_form_datetime(param_str(params, "startDate"));
    let end = parse_form_datetime(param_str(params, "endDate"));

    match start {
        None => errors.push(FieldError::new("startDate", "Please enter a valid date (dd/mm/yyyy hh:mm)")),
        Some(start) => {
            if ctx.min_start.map_or(false, |min| start < min) {
                errors.push(FieldError::new("startDate", "Start date cannot be before the event start date"));
            }
            if ctx.max_end.map_or(false, |max| start > max) {
                errors.push(FieldError::new("startDate", "Start date cannot be after the event end date"));
            }
        }
    }

    match end {
        None => errors.push(FieldError::new("endDate", "Please enter a valid date (dd/mm/yyyy hh:mm)")),
        Some(end) => {
            if end < ctx.now {
                errors.push(FieldError::new("endDate", "End date cannot be before the current time"));
            }
            if ctx.max_end.map_or(false, |max| end > max) {
                errors.push(FieldError::new("endDate", "End date cannot be after the event end date"));
            }
        }
    }

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            errors.push(FieldError::new("endDate", "End date cannot be before start date."));
        }
    }
}

fn warning_notice(booking: &Booking) -> Option<String> {
    booking.warning.clone().filter(|w| !w.trim().is_empty())
}

fn open_url(booking: &Booking, target: &str, launcher: &dyn Launcher) -> anyhow::Result<()> {
    match booking.url.as_deref() {
        Some(url) => launcher.open(target, url),
        None => anyhow::bail!("Booking {} has no URL to open", booking.id),
    }
}

mod builtin {
    use super::*;

    /// Characters appended to Vidyo room names on the server side
    fn vidyo_max_name_length(conference_id: &str) -> usize {
        61usize.saturating_sub(format!("_indico_{}", conference_id).chars().count())
    }

    fn valid_vidyo_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_alphabetic() => {
                chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | ' '))
            }
            _ => false,
        }
    }

    pub fn vidyo() -> PluginCapabilities {
        PluginCapabilities {
            check_params: Some(Box::new(|params: &Value, ctx: &ParamContext| {
                let mut errors = Vec::new();
                let name = param_str(params, "roomName").trim();
                if name.is_empty() {
                    errors.push(FieldError::new("roomName", "Please enter a room name"));
                } else if name.chars().count() > vidyo_max_name_length(&ctx.conference_id) {
                    errors.push(FieldError::new("roomName", "The room name is too long"));
                } else if !valid_vidyo_name(name) {
                    errors.push(FieldError::new(
                        "roomName",
                        "The room name must start with a letter and may only contain letters, digits, spaces, periods, underscores and dashes",
                    ));
                }
                require(params, "roomDescription", &mut errors);
                let pin = param_str(params, "pin");
                if !pin.is_empty() && !is_integer(pin) {
                    errors.push(FieldError::new("pin", "The pin has to be a number."));
                }
                errors
            })),
            error_handler: Some(Box::new(|event: BookingEvent, error: &BusinessError| match error {
                BusinessError::Rejected { message, .. } if message == "nameTooLong" => {
                    ErrorPopup::new("Vidyo Error", vec!["The room name is too long".to_string()])
                        .with_field("roomName", "The room name is too long")
                }
                BusinessError::Rejected { message, .. } if message == "invalidName" => {
                    ErrorPopup::new("Vidyo Error", vec!["The room name is not valid".to_string()])
                        .with_field("roomName", "The room name is not valid")
                }
                other => ErrorPopup::new(format!("Vidyo Error ({})", event), vec![other.to_string()]),
            })),
            show_info: Some(Box::new(|booking: &Booking| {
                let params = &booking.booking_params;
                vec![
                    InfoRow::new("Room name:", param_str(params, "roomName")),
                    InfoRow::new("Description:", param_str(params, "roomDescription")),
                    InfoRow::new(
                        "PIN:",
                        if param_str(params, "pin").is_empty() { "No PIN was defined" } else { "PIN hidden" },
                    ),
                    InfoRow::new("Auto-join URL:", booking.url.clone().unwrap_or_else(|| "not assigned yet".to_string())),
                    InfoRow::new("Booking ID:", booking.id.clone()),
                ]
            })),
            start: Some(Box::new(open_url)),
            connect: Some(Box::new(open_url)),
            post_create: Some(Box::new(warning_notice)),
            post_edit: Some(Box::new(warning_notice)),
            post_delete: Some(Box::new(warning_notice)),
            ..Default::default()
        }
    }

    pub fn cern_mcu() -> PluginCapabilities {
        PluginCapabilities {
            check_params: Some(Box::new(|params: &Value, ctx: &ParamContext| {
                let mut errors = Vec::new();
                let name = param_str(params, "name");
                if name.trim().is_empty() {
                    errors.push(FieldError::new("name", "This field is mandatory"));
                } else if name.chars().count() >= 32 {
                    errors.push(FieldError::new(
                        "name",
                        "The name of the conference cannot have more than 31 characters.",
                    ));
                }
                if param_str(params, "autoGenerateId") == "no" {
                    let custom_id = param_str(params, "customId").trim();
                    if custom_id.is_empty() {
                        errors.push(FieldError::new("customId", "Please introduce a numeric ID."));
                    } else if !is_integer(custom_id) {
                        errors.push(FieldError::new("customId", "Field must be a number."));
                    } else if custom_id.len() != 5 {
                        errors.push(FieldError::new("customId", "The id must have 5 digits."));
                    }
                }
                let pin = param_str(params, "pin");
                if !pin.is_empty() {
                    if !is_integer(pin) {
                        errors.push(FieldError::new("pin", "The pin has to be a number."));
                    }
                    if pin.len() >= 32 {
                        errors.push(FieldError::new("pin", "The pin cannot have more than 31 characters."));
                    }
                }
                check_window(params, ctx, &mut errors);
                errors
            })),
            error_handler: Some(Box::new(|event: BookingEvent, error: &BusinessError| {
                let code = match error {
                    BusinessError::Rejected { message, .. } => message.as_str(),
                    BusinessError::Sanitization { .. } => "",
                };
                let creating = matches!(event, BookingEvent::Create | BookingEvent::Edit);
                match code {
                    "2" if creating => ErrorPopup::new("MCU Error", Vec::new()).with_field(
                        "name",
                        "This conference title already exists in the MCU. Please choose a different one.",
                    ),
                    "6" if creating => ErrorPopup::new(
                        "MCU Error",
                        vec!["There are too many conferences in the MCU. No more can be created right now.".to_string()],
                    ),
                    "7" if creating => ErrorPopup::new(
                        "MCU Error",
                        vec!["There are too many participants in the MCU. No more can be created right now.".to_string()],
                    ),
                    "18" if creating => ErrorPopup::new("MCU Error", Vec::new()).with_field(
                        "customId",
                        "This conference ID already exists in the MCU. Please a different one.",
                    ),
                    other => ErrorPopup::new(format!("MCU Error, code: {}", other), Vec::new()),
                }
            })),
            check_start: Some(Box::new(|booking: &mut Booking| {
                booking.permission_to_start = true;
                true
            })),
            ..Default::default()
        }
    }

    pub fn webex() -> PluginCapabilities {
        PluginCapabilities {
            check_params: Some(Box::new(|params: &Value, ctx: &ParamContext| {
                let mut errors = Vec::new();
                require(params, "meetingTitle", &mut errors);
                require(params, "webExUser", &mut errors);
                require(params, "webExPass", &mut errors);
                check_window(params, ctx, &mut errors);
                errors
            })),
            error_handler: Some(Box::new(|event: BookingEvent, error: &BusinessError| {
                let message = error.to_string();
                match (event, error) {
                    (BookingEvent::Remove, _) => ErrorPopup::new("Error during delete", vec![message]),
                    (_, BusinessError::Rejected { origin, .. }) if origin.contains("user") => {
                        ErrorPopup::new("WebEx User Error", vec![message])
                            .with_field("webExUser", "Please provide a valid host user ID")
                    }
                    (_, BusinessError::Rejected { origin, .. }) if origin.contains("pass") => {
                        ErrorPopup::new("WebEx Password Error", vec![message])
                            .with_field("webExPass", "Please provide the correct password.")
                    }
                    (_, BusinessError::Rejected { origin, .. }) if origin.contains("date") => {
                        ErrorPopup::new("WebEx Date Error", vec![message])
                            .with_field("startDate", "WebEx has rejected the date")
                            .with_field("endDate", "WebEx has rejected the date")
                    }
                    _ => ErrorPopup::new("WebEx Error", vec![message]),
                }
            })),
            custom_text: Some(Box::new(|booking: &Booking| {
                let params = &booking.booking_params;
                let time_of = |field: &str| param_str(params, field).get(11..).unwrap_or_default().to_string();
                let (start, end) = (time_of("startDate"), time_of("endDate"));
                if start.is_empty() || end.is_empty() {
                    booking.status_message.clone()
                } else {
                    format!("{} to {}", start, end)
                }
            })),
            show_info: Some(Box::new(|booking: &Booking| {
                let params = &booking.booking_params;
                vec![
                    InfoRow::new("Meeting title:", param_str(params, "meetingTitle")),
                    InfoRow::new("Start date:", param_str(params, "startDate")),
                    InfoRow::new("End date:", param_str(params, "endDate")),
                    InfoRow::new("Meeting description:", param_str(params, "meetingDescription")),
                    InfoRow::new(
                        "Access password:",
                        if params.get("hasAccessPassword").and_then(Value::as_bool).unwrap_or(false) {
                            "Access password hidden"
                        } else {
                            "No access password was defined"
                        },
                    ),
                    InfoRow::new("Auto-join URL:", booking.url.clone().unwrap_or_else(|| "not assigned yet".to_string())),
                    InfoRow::new("Indico booking ID:", booking.id.clone()),
                ]
            })),
            check_start: Some(Box::new(|booking: &mut Booking| {
                booking.permission_to_start = true;
                true
            })),
            start: Some(Box::new(|booking: &Booking, target: &str, launcher: &dyn Launcher| {
                let start_url = booking
                    .booking_params
                    .get("startURL")
                    .and_then(Value::as_str)
                    .or(booking.url.as_deref());
                match start_url {
                    Some(url) => launcher.open(target, url),
                    None => anyhow::bail!("WebEx booking {} has no start URL", booking.id),
                }
            })),
            post_create: Some(Box::new(warning_notice)),
            post_edit: Some(Box::new(warning_notice)),
            post_delete: Some(Box::new(warning_notice)),
            ..Default::default()
        }
    }

    pub fn evo() -> PluginCapabilities {
        PluginCapabilities {
            check_params: Some(Box::new(|params: &Value, ctx: &ParamContext| {
                let mut errors = Vec::new();
                require(params, "communityId", &mut errors);
                require(params, "meetingTitle", &mut errors);
                require(params, "meetingDescription", &mut errors);
                check_window(params, ctx, &mut errors);
                errors
            })),
            check_start: Some(Box::new(|booking: &mut Booking| {
                booking.permission_to_start = booking.url.is_some();
                booking.permission_to_start
            })),
            start: Some(Box::new(open_url)),
            ..Default::default()
        }
    }
}
