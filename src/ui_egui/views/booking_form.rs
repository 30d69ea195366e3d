//! Booking forms: create/edit, search and the electronic agreement.
//!
//! Parameters are edited as plain text rows and sent as a JSON object of
//! strings. Field errors coming back from validation or from a plugin's
//! error handler are shown under the matching row.

use serde_json::{Map, Value};

use crate::models::booking::{AgreementRequest, Booking, FieldError, SearchHit};

use super::booking_view::BookingAction;

/// Parameter rows offered for a fresh booking of each known type
pub fn form_fields(booking_type: &str) -> &'static [&'static str] {
    match booking_type {
        "Vidyo" => &["roomName", "roomDescription", "pin"],
        "CERNMCU" => &["name", "autoGenerateId", "customId", "pin", "startDate", "endDate"],
        "WebEx" => &[
            "meetingTitle",
            "meetingDescription",
            "webExUser",
            "webExPass",
            "startDate",
            "endDate",
        ],
        "EVO" => &["communityId", "meetingTitle", "meetingDescription", "startDate", "endDate"],
        _ => &[],
    }
}

fn is_secret(field: &str) -> bool {
    let lower = field.to_lowercase();
    lower.contains("pass") || lower == "pin"
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingFormState {
    pub open: bool,
    pub mode: FormMode,
    pub booking_type: String,
    pub rows: Vec<(String, String)>,
    pub errors: Vec<FieldError>,
    new_field: String,
}

impl Default for BookingFormState {
    fn default() -> Self {
        Self {
            open: false,
            mode: FormMode::Create,
            booking_type: String::new(),
            rows: Vec::new(),
            errors: Vec::new(),
            new_field: String::new(),
        }
    }
}

impl BookingFormState {
    pub fn open_create(&mut self, booking_type: &str) {
        *self = Self {
            open: true,
            booking_type: booking_type.to_string(),
            rows: form_fields(booking_type)
                .iter()
                .map(|f| (f.to_string(), String::new()))
                .collect(),
            ..Self::default()
        };
    }

    /// Form pre-filled with a booking's current parameters
    pub fn open_edit(&mut self, booking: &Booking) {
        let mut rows: Vec<(String, String)> = form_fields(&booking.booking_type)
            .iter()
            .map(|f| (f.to_string(), String::new()))
            .collect();
        if let Value::Object(params) = &booking.booking_params {
            for (key, value) in params {
                match rows.iter_mut().find(|(name, _)| name == key) {
                    Some(row) => row.1 = value_text(value),
                    None => rows.push((key.clone(), value_text(value))),
                }
            }
        }
        *self = Self {
            open: true,
            mode: FormMode::Edit { id: booking.id.clone() },
            booking_type: booking.booking_type.clone(),
            rows,
            ..Self::default()
        };
    }

    pub fn close(&mut self) {
        self.open = false;
        self.errors.clear();
    }

    /// Parameters as sent to the server
    pub fn params(&self) -> Value {
        let map: Map<String, Value> = self
            .rows
            .iter()
            .filter(|(name, _)| !name.trim().is_empty())
            .map(|(name, value)| (name.trim().to_string(), Value::String(value.clone())))
            .collect();
        Value::Object(map)
    }

    pub fn error_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Errors that do not belong to any row
    pub fn loose_errors(&self) -> Vec<&FieldError> {
        self.errors
            .iter()
            .filter(|e| !self.rows.iter().any(|(name, _)| *name == e.field))
            .collect()
    }

    pub fn submit(&self) -> BookingAction {
        match &self.mode {
            FormMode::Create => BookingAction::Create {
                booking_type: self.booking_type.clone(),
                params: self.params(),
            },
            FormMode::Edit { id } => BookingAction::Edit {
                id: id.clone(),
                booking_type: self.booking_type.clone(),
                params: self.params(),
            },
        }
    }

    pub fn render(&mut self, ctx: &egui::Context) -> Option<BookingAction> {
        if !self.open {
            return None;
        }

        let title = match &self.mode {
            FormMode::Create => format!("New {} booking", self.booking_type),
            FormMode::Edit { id } => format!("Edit {} booking {}", self.booking_type, id),
        };

        let mut action = None;
        let mut open = true;
        let error_color = egui::Color32::from_rgb(200, 60, 60);

        egui::Window::new(title)
            .open(&mut open)
            .collapsible(false)
            .resizable(true)
            .default_width(420.0)
            .show(ctx, |ui| {
                egui::Grid::new("booking_form_grid")
                    .num_columns(2)
                    .spacing([12.0, 6.0])
                    .show(ui, |ui| {
                        for (name, value) in self.rows.iter_mut() {
                            ui.label(name.as_str());
                            ui.vertical(|ui| {
                                ui.add(
                                    egui::TextEdit::singleline(value)
                                        .password(is_secret(name))
                                        .desired_width(260.0),
                                );
                                if let Some(message) = self
                                    .errors
                                    .iter()
                                    .find(|e| e.field == *name)
                                    .map(|e| e.message.as_str())
                                {
                                    ui.label(egui::RichText::new(message).small().color(error_color));
                                }
                            });
                            ui.end_row();
                        }
                    });

                ui.horizontal(|ui| {
                    ui.add(egui::TextEdit::singleline(&mut self.new_field).hint_text("Parameter name"));
                    let name = self.new_field.trim().to_string();
                    let addable = !name.is_empty() && !self.rows.iter().any(|(n, _)| *n == name);
                    if ui.add_enabled(addable, egui::Button::new("Add")).clicked() {
                        self.rows.push((name, String::new()));
                        self.new_field.clear();
                    }
                });

                for error in self.loose_errors() {
                    ui.label(
                        egui::RichText::new(format!("{}: {}", error.field, error.message)).color(error_color),
                    );
                }

                ui.separator();
                ui.horizontal(|ui| {
                    let label = match self.mode {
                        FormMode::Create => "Create",
                        FormMode::Edit { .. } => "Save",
                    };
                    if ui.button(label).clicked() {
                        action = Some(self.submit());
                    }
                    if ui.button("Cancel").clicked() {
                        self.close();
                    }
                });
            });

        if !open {
            self.close();
        }
        action
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchState {
    pub booking_type: String,
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub error: Option<String>,
}

impl SearchState {
    pub fn set_hits(&mut self, hits: Vec<SearchHit>) {
        self.error = if hits.is_empty() {
            Some("No results".to_string())
        } else {
            None
        };
        self.hits = hits;
    }

    pub fn render(&mut self, ui: &mut egui::Ui, types: &[String]) -> Option<BookingAction> {
        let mut action = None;
        if self.booking_type.is_empty() {
            if let Some(first) = types.first() {
                self.booking_type = first.clone();
            }
        }

        ui.horizontal(|ui| {
            egui::ComboBox::from_id_source("search_booking_type")
                .selected_text(self.booking_type.as_str())
                .show_ui(ui, |ui| {
                    for t in types {
                        ui.selectable_value(&mut self.booking_type, t.clone(), t.as_str());
                    }
                });
            let response = ui.add(egui::TextEdit::singleline(&mut self.query).hint_text("Search rooms"));
            let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("🔍 Search").clicked() || enter {
                action = Some(BookingAction::Search {
                    booking_type: self.booking_type.clone(),
                    query: self.query.clone(),
                });
            }
        });

        if let Some(error) = &self.error {
            ui.label(egui::RichText::new(error).small().weak());
        }

        for hit in &self.hits {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(&hit.name).strong());
                if let Some(description) = &hit.description {
                    ui.label(egui::RichText::new(description).small());
                }
                if let Some(owner) = &hit.owner {
                    ui.label(egui::RichText::new(format!("({})", owner)).small().weak());
                }
                if ui.small_button("Attach").clicked() {
                    action = Some(BookingAction::Attach {
                        booking_type: self.booking_type.clone(),
                        hit: hit.clone(),
                    });
                }
            });
        }
        action
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgreementFormState {
    pub open: bool,
    /// Speaker ids, comma separated
    pub speakers: String,
    pub from_name: String,
    pub from_email: String,
    /// Comma separated
    pub cc: String,
    pub content: String,
    pub errors: Vec<FieldError>,
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AgreementFormState {
    pub fn request(&self) -> AgreementRequest {
        AgreementRequest {
            unique_id_list: split_list(&self.speakers),
            from_name: self.from_name.trim().to_string(),
            from_email: self.from_email.trim().to_string(),
            cc: split_list(&self.cc),
            content: self.content.clone(),
        }
    }

    pub fn render(&mut self, ctx: &egui::Context) -> Option<BookingAction> {
        if !self.open {
            return None;
        }
        let mut action = None;
        let mut open = true;
        let errors = self.errors.clone();
        let show_error = |ui: &mut egui::Ui, field: &str| {
            if let Some(e) = errors.iter().find(|e| e.field == field) {
                ui.label(
                    egui::RichText::new(&e.message)
                        .small()
                        .color(egui::Color32::from_rgb(200, 60, 60)),
                );
            }
        };

        egui::Window::new("Send electronic agreement")
            .open(&mut open)
            .collapsible(false)
            .default_width(460.0)
            .show(ctx, |ui| {
                ui.label("Speaker ids (comma separated)");
                ui.text_edit_singleline(&mut self.speakers);
                show_error(ui, "uniqueIdList");
                ui.label("From name");
                ui.text_edit_singleline(&mut self.from_name);
                show_error(ui, "fromName");
                ui.label("From e-mail");
                ui.text_edit_singleline(&mut self.from_email);
                show_error(ui, "fromEmail");
                ui.label("Cc (comma separated)");
                ui.text_edit_singleline(&mut self.cc);
                show_error(ui, "cc");
                ui.label("Text");
                ui.add(egui::TextEdit::multiline(&mut self.content).desired_rows(6));
                show_error(ui, "content");

                ui.separator();
                if ui.button("Send").clicked() {
                    action = Some(BookingAction::SendAgreement(self.request()));
                }
            });

        if !open {
            self.open = false;
            self.errors.clear();
        }
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_create_form_has_type_fields() {
        let mut form = BookingFormState::default();
        form.open_create("Vidyo");
        assert!(form.open);
        assert_eq!(form.mode, FormMode::Create);
        assert_eq!(
            form.rows.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            vec!["roomName", "roomDescription", "pin"]
        );
    }

    #[test]
    fn test_edit_form_keeps_extra_params() {
        let mut booking = Booking::new("7", "Vidyo");
        booking.booking_params = json!({"roomName": "Physics", "owner": "jdoe", "pin": 1234});

        let mut form = BookingFormState::default();
        form.open_edit(&booking);
        assert_eq!(form.mode, FormMode::Edit { id: "7".to_string() });
        assert_eq!(
            form.params(),
            json!({"roomName": "Physics", "roomDescription": "", "pin": "1234", "owner": "jdoe"})
        );
    }

    #[test]
    fn test_submit_builds_action() {
        let mut form = BookingFormState::default();
        form.open_create("EVO");
        form.rows[0].1 = "42".to_string();
        match form.submit() {
            BookingAction::Create { booking_type, params } => {
                assert_eq!(booking_type, "EVO");
                assert_eq!(params["communityId"], "42");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_errors_split_by_row() {
        let mut form = BookingFormState::default();
        form.open_create("Vidyo");
        form.errors = vec![
            FieldError::new("roomName", "Please enter a room name"),
            FieldError::new("startDate", "Bad date"),
        ];
        assert_eq!(form.error_for("roomName"), Some("Please enter a room name"));
        let loose: Vec<&str> = form.loose_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(loose, vec!["startDate"]);
    }

    #[test]
    fn test_agreement_request_splits_lists() {
        let form = AgreementFormState {
            speakers: "s1, s2,,".to_string(),
            from_name: " Organiser ".to_string(),
            from_email: "org@example.org".to_string(),
            cc: "a@example.org".to_string(),
            content: "Please sign".to_string(),
            ..Default::default()
        };
        let request = form.request();
        assert_eq!(request.unique_id_list, vec!["s1", "s2"]);
        assert_eq!(request.from_name, "Organiser");
        assert_eq!(request.cc, vec!["a@example.org"]);
    }

    #[test]
    fn test_empty_search_reports_no_results() {
        let mut search = SearchState::default();
        search.set_hits(Vec::new());
        assert_eq!(search.error.as_deref(), Some("No results"));
    }
}
