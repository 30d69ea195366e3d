use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

use super::confirm::ConfirmDialogState;
use super::state::AppState;
use super::toast::ToastManager;
use super::TimetableApp;
use crate::models::config::AppConfig;
use crate::models::entry::TimetableData;
use crate::services::backend::local::LocalBackend;
use crate::services::backend::rpc::RpcBackend;
use crate::services::backend::{BookingBackend, TimetableBackend};
use crate::services::bookings::{BookingBoard, BrowserLauncher};
use crate::services::dispatch::{Dispatcher, Job};
use crate::services::settings::{database_path, SettingsService};
use crate::services::timetable::TimetableDrawer;
use crate::ui_egui::commands::UndoManager;
use crate::ui_egui::theme::TimetableTheme;
use crate::ui_egui::views::BookingPanelState;

struct Backends {
    timetable: Arc<dyn TimetableBackend>,
    bookings: Arc<dyn BookingBackend>,
    local: Option<Arc<LocalBackend>>,
}

impl TimetableApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> anyhow::Result<Self> {
        let settings = match SettingsService::from_env() {
            Ok(service) => service,
            Err(e) => {
                log::warn!("No config directory ({}), using ./timetable.toml", e);
                SettingsService::new("timetable.toml")
            }
        };
        let config = settings.load_or_default();
        log::info!(
            "Loaded config: conference={}, server={}",
            config.conference_id,
            config.server_url.as_deref().unwrap_or("<local store>")
        );

        let mut toast_manager = ToastManager::new();
        let backends = match build_backends(&config) {
            Ok(backends) => backends,
            Err(e) => {
                log::error!("Failed to open backend: {:#}", e);
                toast_manager.error(format!("Could not open the timetable store: {}", e));
                in_memory_backends(&config)?
            }
        };

        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("booking-batch")
            .enable_all()
            .build()
        {
            Ok(runtime) => Some(runtime),
            Err(e) => {
                log::error!("Failed to start batch runtime: {}", e);
                None
            }
        };

        let mut dispatcher =
            Dispatcher::new(backends.timetable, backends.bookings).with_repaint(cc.egui_ctx.clone());
        dispatcher.submit(Job::FetchTimetable);
        dispatcher.submit(Job::ListBookings);

        let mut board = BookingBoard::default();
        board.grant_all();

        let mut app = Self {
            drawer: TimetableDrawer::from_config(&config, TimetableData::new()),
            config,
            settings,
            board,
            dispatcher,
            local: backends.local,
            runtime,
            launcher: BrowserLauncher,
            undo_manager: UndoManager::new(),
            active_theme: TimetableTheme::light(),
            panel: BookingPanelState::default(),
            state: AppState::default(),
            toast_manager,
            confirm_dialog: ConfirmDialogState::new(),
        };

        app.apply_theme(&cc.egui_ctx);
        Ok(app)
    }

    pub(super) fn apply_theme(&mut self, ctx: &egui::Context) {
        let is_dark = if self.config.use_system_theme {
            match dark_light::detect() {
                dark_light::Mode::Dark => true,
                dark_light::Mode::Light => false,
                dark_light::Mode::Default => self.config.is_dark_theme(),
            }
        } else {
            self.config.is_dark_theme()
        };

        let theme = TimetableTheme::for_dark_mode(is_dark);
        theme.apply_to_context(ctx);
        self.active_theme = theme;
    }

    pub(super) fn save_config(&mut self) {
        if let Err(e) = self.settings.save(&self.config) {
            log::error!("Failed to save config: {:#}", e);
            self.toast_manager.error(format!("Could not save settings: {}", e));
        }
    }

    pub(super) fn handle_update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_job_results();
        self.process_batch_results(ctx);

        self.handle_keyboard_shortcuts(ctx);

        self.render_menu_bar(ctx);
        self.render_status_bar(ctx);
        self.render_main_panel(ctx);

        self.render_retime_dialog(ctx);
        self.render_error_window(ctx);
        self.render_about_dialog(ctx);
        self.handle_confirm_dialog(ctx);

        // Toasts last so they are on top
        let is_dark = self.active_theme.is_dark;
        self.toast_manager.render(ctx, is_dark);
    }

    pub(super) fn handle_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if self.drawer.has_pending() {
            log::warn!("Exiting with unconfirmed moves");
        }
        self.save_config();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(Duration::from_secs(1));
        }
    }
}

fn build_backends(config: &AppConfig) -> anyhow::Result<Backends> {
    if let Some(url) = &config.server_url {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let rpc = Arc::new(RpcBackend::new(url, &config.conference_id, timeout)?);
        log::info!("Using server at {}", url);
        return Ok(Backends {
            timetable: rpc.clone(),
            bookings: rpc,
            local: None,
        });
    }

    let path = database_path(config)?;
    let local = Arc::new(
        LocalBackend::open(&path.to_string_lossy(), &config.conference_id)
            .with_context(|| format!("Failed to open {}", path.display()))?,
    );
    log::info!("Using local store at {}", path.display());
    Ok(Backends {
        timetable: local.clone(),
        bookings: local.clone(),
        local: Some(local),
    })
}

/// Last resort so the UI still comes up; nothing is persisted
fn in_memory_backends(config: &AppConfig) -> anyhow::Result<Backends> {
    let local = Arc::new(LocalBackend::open(":memory:", &config.conference_id)?);
    Ok(Backends {
        timetable: local.clone(),
        bookings: local.clone(),
        local: Some(local),
    })
}
