mod bookings;
mod confirm;
mod dialogs;
mod jobs;
mod lifecycle;
mod menu;
mod shortcuts;
mod state;
mod status_bar;
mod timetable;
mod toast;

use std::sync::Arc;

use self::confirm::ConfirmDialogState;
use self::state::AppState;
use self::toast::ToastManager;
use crate::models::config::AppConfig;
use crate::models::view::ViewType;
use crate::services::backend::local::LocalBackend;
use crate::services::bookings::{BookingBoard, BrowserLauncher};
use crate::services::dispatch::Dispatcher;
use crate::services::settings::SettingsService;
use crate::services::timetable::TimetableDrawer;
use crate::ui_egui::commands::UndoManager;
use crate::ui_egui::theme::TimetableTheme;
use crate::ui_egui::views::{BookingPanelState, BookingView, TimetableView};

const MIN_ROOT_WIDTH: f32 = 480.0;
const MIN_ROOT_HEIGHT: f32 = 320.0;

pub struct TimetableApp {
    config: AppConfig,
    settings: SettingsService,
    /// Layout and pending moves of the timetable
    drawer: TimetableDrawer,
    board: BookingBoard,
    dispatcher: Dispatcher,
    /// Set when running against the local store; enables imports
    local: Option<Arc<LocalBackend>>,
    /// Runs start-all/stop-all batches
    runtime: Option<tokio::runtime::Runtime>,
    launcher: BrowserLauncher,
    undo_manager: UndoManager,
    active_theme: TimetableTheme,
    panel: BookingPanelState,
    state: AppState,
    toast_manager: ToastManager,
    confirm_dialog: ConfirmDialogState,
}

impl eframe::App for TimetableApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        self.handle_update(ctx, frame);
    }

    fn on_exit(&mut self, gl: Option<&eframe::glow::Context>) {
        self.handle_exit(gl);
    }
}

impl TimetableApp {
    fn render_main_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            if available.x < MIN_ROOT_WIDTH || available.y < MIN_ROOT_HEIGHT {
                ui.label("Window too small");
                return;
            }

            match self.state.view {
                ViewType::Timetable => {
                    self.render_day_navigation(ui);
                    ui.separator();
                    if let Some(action) = TimetableView::show(ui, &self.drawer, &self.active_theme) {
                        self.handle_timetable_action(action);
                    }
                }
                ViewType::Bookings => {
                    let types = self.creatable_types();
                    let busy = self.dispatcher.is_busy() || self.state.batch.is_some();
                    if let Some(action) =
                        BookingView::show(ui, &self.board, &mut self.panel, &types, busy, &self.active_theme)
                    {
                        self.handle_booking_action(action);
                    }
                }
            }
        });
    }

    /// Booking types the user may create
    fn creatable_types(&self) -> Vec<String> {
        self.board
            .registry()
            .types()
            .into_iter()
            .filter(|t| self.board.check_permission(t, "create").is_ok())
            .collect()
    }
}
