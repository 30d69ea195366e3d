//! Collaboration booking board.
//!
//! Holds the bookings of the event and everything the panel derives from
//! them: which info rows are expanded, the launch targets client-side
//! actions open into, the table header and the start-all/stop-all buttons.
//! Server replies are applied here; the calls themselves go through
//! [`crate::services::backend::BookingBackend`].

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::errors::{ClientError, ErrorCategory};
use crate::models::booking::{Booking, BookingId, FieldError};

use super::registry::{BookingEvent, ErrorPopup, InfoRow, Launcher, PluginRegistry};

pub const NO_BOOKINGS_MESSAGE: &str = "Currently no bookings have been created";
pub const TABLE_COLUMNS: [&str; 4] = ["Type", "Status", "Info", "Actions"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableHead {
    #[default]
    NoBookings,
    Columns,
}

impl TableHead {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            TableHead::NoBookings => Some(NO_BOOKINGS_MESSAGE),
            TableHead::Columns => None,
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            TableHead::NoBookings => &[],
            TableHead::Columns => &TABLE_COLUMNS,
        }
    }
}

/// Start-all/stop-all button state. Both buttons show together; the one
/// with nothing to do is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartStopButtons {
    pub visible: bool,
    pub start_enabled: bool,
    pub stop_enabled: bool,
}

/// Where a start or stop request has to go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRoute {
    /// Ask the server first, then run the client action on the reply
    Server,
    /// Only the client action
    Local,
    /// The plugin refused the start
    Denied,
}

/// Ordered bookings for a batch start or stop
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchPlan {
    pub ids: Vec<BookingId>,
    pub warnings: Vec<String>,
}

/// How a failed booking request is reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorReport {
    /// Mark the fields in the open form
    Inline(Vec<FieldError>),
    Popup(ErrorPopup),
    /// Generic error report, no retry
    Unexpected(String),
}

#[derive(Debug)]
pub struct BookingBoard {
    bookings: Vec<Booking>,
    show_info: HashMap<BookingId, bool>,
    launch_targets: BTreeSet<String>,
    head: TableHead,
    buttons: StartStopButtons,
    create_permissions: HashMap<String, bool>,
    registry: PluginRegistry,
}

impl Default for BookingBoard {
    fn default() -> Self {
        Self::new(PluginRegistry::with_builtins())
    }
}

impl BookingBoard {
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            bookings: Vec::new(),
            show_info: HashMap::new(),
            launch_targets: BTreeSet::new(),
            head: TableHead::NoBookings,
            buttons: StartStopButtons::default(),
            create_permissions: HashMap::new(),
            registry,
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    pub fn booking(&self, id: &str) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    pub fn table_head(&self) -> TableHead {
        self.head
    }

    pub fn buttons(&self) -> StartStopButtons {
        self.buttons
    }

    pub fn launch_targets(&self) -> &BTreeSet<String> {
        &self.launch_targets
    }

    pub fn has_launch_target(&self, name: &str) -> bool {
        self.launch_targets.contains(name)
    }

    /// Replace the whole list, e.g. after the initial fetch
    pub fn load(&mut self, bookings: Vec<Booking>) {
        log::info!("Loaded {} bookings", bookings.len());
        self.launch_targets = bookings.iter().map(Booking::launch_target).collect();
        self.show_info = bookings.iter().map(|b| (b.id.clone(), false)).collect();
        self.bookings = bookings;
        self.refresh_start_stop_buttons();
        self.refresh_table_head();
    }

    // ---------------------------
    // Permissions
    // ---------------------------

    pub fn set_create_permission(&mut self, booking_type: &str, allowed: bool) {
        self.create_permissions.insert(booking_type.to_string(), allowed);
    }

    /// Allow every registered booking type
    pub fn grant_all(&mut self) {
        for booking_type in self.registry.types() {
            self.create_permissions.insert(booking_type, true);
        }
    }

    /// `Err` carries the warning to show when the user may not `action`
    /// bookings of this type
    pub fn check_permission(&self, booking_type: &str, action: &str) -> Result<(), String> {
        if self.create_permissions.get(booking_type).copied().unwrap_or(false) {
            Ok(())
        } else {
            Err(format!(
                "You do not have enough permissions to {} {} bookings. If you think that you should have permissions please contact {} support.",
                action, booking_type, booking_type
            ))
        }
    }

    // ---------------------------
    // Server replies
    // ---------------------------

    /// A booking was created. Returns the plugin's notice, if any.
    pub fn create_success(&mut self, booking: Booking) -> Option<String> {
        log::info!("Booking {} ({}) created", booking.id, booking.booking_type);
        self.hide_all_info();
        self.show_info.insert(booking.id.clone(), true);
        self.launch_targets.insert(booking.launch_target());
        self.bookings.push(booking);
        self.refresh_start_stop_buttons();
        self.refresh_table_head();

        let booking = self.bookings.last()?;
        self.run_hook(BookingEvent::Create, booking)
    }

    /// A booking was edited. Unknown ids are appended.
    pub fn edit_success(&mut self, booking: Booking) -> Option<String> {
        log::info!("Booking {} edited", booking.id);
        let id = booking.id.clone();
        self.refresh_booking(booking);
        let booking = self.booking(&id)?;
        self.run_hook(BookingEvent::Edit, booking)
    }

    /// The server confirmed a removal
    pub fn remove_success(&mut self, id: &str) -> Option<String> {
        let Some(index) = self.bookings.iter().position(|b| b.id == id) else {
            log::warn!("Removal of unknown booking {}", id);
            return None;
        };
        let booking = self.bookings.remove(index);
        log::info!("Booking {} ({}) removed", booking.id, booking.booking_type);
        self.launch_targets.remove(&booking.launch_target());
        self.show_info.remove(id);
        self.refresh_start_stop_buttons();
        self.refresh_table_head();
        self.run_hook(BookingEvent::Remove, &booking)
    }

    /// Swap in a booking returned by start, stop, status, accept or reject
    pub fn refresh_booking(&mut self, booking: Booking) {
        match self.bookings.iter_mut().find(|b| b.id == booking.id) {
            Some(slot) => *slot = booking,
            None => {
                self.launch_targets.insert(booking.launch_target());
                self.show_info.insert(booking.id.clone(), false);
                self.bookings.push(booking);
                self.refresh_table_head();
            }
        }
        self.refresh_start_stop_buttons();
    }

    fn run_hook(&self, event: BookingEvent, booking: &Booking) -> Option<String> {
        let hook = self.registry.get(&booking.booking_type)?.hook(event)?;
        hook(booking)
    }

    // ---------------------------
    // Info rows
    // ---------------------------

    pub fn is_info_visible(&self, id: &str) -> bool {
        self.show_info.get(id).copied().unwrap_or(false)
    }

    pub fn toggle_info(&mut self, id: &str) -> bool {
        let visible = !self.is_info_visible(id);
        self.set_info_visible(id, visible);
        visible
    }

    pub fn set_info_visible(&mut self, id: &str, visible: bool) {
        if self.booking(id).is_some() {
            self.show_info.insert(id.to_string(), visible);
        }
    }

    pub fn hide_all_info(&mut self) {
        for visible in self.show_info.values_mut() {
            *visible = false;
        }
    }

    pub fn info_rows(&self, id: &str) -> Vec<InfoRow> {
        self.booking(id)
            .map(|booking| self.registry.info_rows(booking))
            .unwrap_or_default()
    }

    pub fn status_text(&self, booking: &Booking) -> String {
        self.registry.status_text(booking)
    }

    // ---------------------------
    // Derived state
    // ---------------------------

    pub fn refresh_table_head(&mut self) {
        self.head = if self.bookings.is_empty() {
            TableHead::NoBookings
        } else {
            TableHead::Columns
        };
    }

    /// The buttons appear with more than one booking when more than one
    /// type, or more than one batch-capable booking, can start (or stop).
    pub fn refresh_start_stop_buttons(&mut self) {
        let mut start = false;
        let mut stop = false;

        if self.bookings.len() > 1 {
            let mut can_start = 0;
            let mut can_stop = 0;
            let mut types_start = HashSet::new();
            let mut types_stop = HashSet::new();

            for booking in &self.bookings {
                if booking.is_startable() {
                    if booking.has_start_stop_all {
                        can_start += 1;
                    }
                    types_start.insert(booking.booking_type.as_str());
                }
                if booking.is_stoppable() {
                    if booking.has_start_stop_all {
                        can_stop += 1;
                    }
                    types_stop.insert(booking.booking_type.as_str());
                }
            }

            start = types_start.len() > 1 || can_start > 1;
            stop = types_stop.len() > 1 || can_stop > 1;
        }

        self.buttons = StartStopButtons {
            visible: start || stop,
            start_enabled: start,
            stop_enabled: stop,
        };
    }

    // ---------------------------
    // Start and stop
    // ---------------------------

    /// Bookings to start, in list order. Types without batch support only
    /// start their first booking and get one warning each.
    pub fn plan_start_all(&self) -> BatchPlan {
        let mut plan = BatchPlan::default();
        if !self.buttons.start_enabled {
            return plan;
        }

        let mut started_types = HashSet::new();
        let mut warned_types = HashSet::new();

        for booking in self.bookings.iter().filter(|b| b.is_startable()) {
            let booking_type = booking.booking_type.as_str();
            if started_types.contains(booking_type) {
                if warned_types.insert(booking_type) {
                    plan.warnings.push(format!(
                        "Multiple {} bookings cannot start at the same time, so we just started the first one.",
                        booking_type
                    ));
                }
            } else {
                plan.ids.push(booking.id.clone());
            }

            if !booking.has_start_stop_all {
                started_types.insert(booking_type);
            }
        }
        plan
    }

    pub fn plan_stop_all(&self) -> BatchPlan {
        if !self.buttons.stop_enabled {
            return BatchPlan::default();
        }
        BatchPlan {
            ids: self
                .bookings
                .iter()
                .filter(|b| b.is_stoppable())
                .map(|b| b.id.clone())
                .collect(),
            warnings: Vec::new(),
        }
    }

    /// Decide how to start a booking. The plugin's start check may update
    /// the booking's permission flags.
    pub fn route_start(&mut self, id: &str) -> Option<ActionRoute> {
        let index = self.bookings.iter().position(|b| b.id == id)?;
        let allowed = match self.registry.get(&self.bookings[index].booking_type) {
            Some(plugin) => plugin.allows_start(&mut self.bookings[index]),
            None => true,
        };
        let booking = &self.bookings[index];
        Some(if !allowed {
            ActionRoute::Denied
        } else if booking.requires_server_call_for_start {
            ActionRoute::Server
        } else {
            ActionRoute::Local
        })
    }

    pub fn route_stop(&self, id: &str) -> Option<ActionRoute> {
        self.booking(id).map(|booking| {
            if booking.requires_server_call_for_stop {
                ActionRoute::Server
            } else {
                ActionRoute::Local
            }
        })
    }

    /// Run the plugin's client-side start. Returns whether anything ran.
    pub fn start_local(&self, id: &str, launcher: &dyn Launcher) -> anyhow::Result<bool> {
        let Some(booking) = self.booking(id) else {
            return Ok(false);
        };
        if !(booking.requires_client_call_for_start && booking.permission_to_start) {
            return Ok(false);
        }
        self.run_action(BookingEvent::Start, booking, launcher)
    }

    pub fn stop_local(&self, id: &str, launcher: &dyn Launcher) -> anyhow::Result<bool> {
        let Some(booking) = self.booking(id) else {
            return Ok(false);
        };
        if !(booking.requires_client_call_for_stop && booking.permission_to_stop) {
            return Ok(false);
        }
        self.run_action(BookingEvent::Stop, booking, launcher)
    }

    /// Apply a server start reply and run the client side of it
    pub fn complete_start(&mut self, booking: Booking, launcher: &dyn Launcher) -> anyhow::Result<bool> {
        let id = booking.id.clone();
        self.refresh_booking(booking);
        self.start_local(&id, launcher)
    }

    pub fn complete_stop(&mut self, booking: Booking, launcher: &dyn Launcher) -> anyhow::Result<bool> {
        let id = booking.id.clone();
        self.refresh_booking(booking);
        self.stop_local(&id, launcher)
    }

    pub fn connect(&self, id: &str, launcher: &dyn Launcher) -> anyhow::Result<bool> {
        match self.booking(id) {
            Some(booking) if booking.has_connect => self.run_action(BookingEvent::Connect, booking, launcher),
            _ => Ok(false),
        }
    }

    pub fn disconnect(&self, id: &str, launcher: &dyn Launcher) -> anyhow::Result<bool> {
        match self.booking(id) {
            Some(booking) if booking.has_disconnect => {
                self.run_action(BookingEvent::Disconnect, booking, launcher)
            }
            _ => Ok(false),
        }
    }

    fn run_action(&self, event: BookingEvent, booking: &Booking, launcher: &dyn Launcher) -> anyhow::Result<bool> {
        let Some(action) = self
            .registry
            .get(&booking.booking_type)
            .and_then(|plugin| plugin.action(event))
        else {
            return Ok(false);
        };
        log::debug!("Client {} for booking {}", event, booking.id);
        action(booking, &booking.launch_target(), launcher)?;
        Ok(true)
    }

    // ---------------------------
    // Errors
    // ---------------------------

    /// Route a failed request to the right report
    pub fn error_report(&self, booking_type: &str, event: BookingEvent, error: &ClientError) -> ErrorReport {
        match (error.category(), error) {
            (ErrorCategory::Validation, ClientError::Validation(fields)) => ErrorReport::Inline(fields.clone()),
            (ErrorCategory::Business, ClientError::Business(business)) => {
                log::warn!("{} of {} booking refused: {}", event, booking_type, business);
                ErrorReport::Popup(self.registry.error_popup(booking_type, event, business))
            }
            _ => {
                log::error!("{} of {} booking failed: {}", event, booking_type, error);
                ErrorReport::Unexpected(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BusinessError;
    use crate::services::bookings::registry::{MockLauncher, PluginCapabilities};
    use pretty_assertions::assert_eq;

    fn startable(id: &str, booking_type: &str, batch: bool) -> Booking {
        let mut booking = Booking::new(id, booking_type);
        booking.has_start = true;
        booking.can_be_started = true;
        booking.has_stop = true;
        booking.has_start_stop_all = batch;
        booking
    }

    #[test]
    fn test_empty_board() {
        let board = BookingBoard::default();
        assert!(board.is_empty());
        assert_eq!(board.table_head().message(), Some(NO_BOOKINGS_MESSAGE));
        assert_eq!(board.buttons(), StartStopButtons::default());
    }

    #[test]
    fn test_create_success_shows_only_new_info() {
        let mut board = BookingBoard::default();
        board.load(vec![Booking::new("1", "CERNMCU")]);
        board.set_info_visible("1", true);

        board.create_success(Booking::new("2", "Vidyo"));
        assert!(!board.is_info_visible("1"));
        assert!(board.is_info_visible("2"));
        assert!(board.has_launch_target("iframeTarget2"));
        assert_eq!(board.table_head().columns(), &TABLE_COLUMNS);
    }

    #[test]
    fn test_create_success_returns_warning_notice() {
        let mut board = BookingBoard::default();
        let mut booking = Booking::new("3", "WebEx");
        booking.warning = Some("Meeting created without password".to_string());
        assert_eq!(
            board.create_success(booking),
            Some("Meeting created without password".to_string())
        );
        assert_eq!(board.create_success(Booking::new("4", "EVO")), None);
    }

    #[test]
    fn test_remove_last_reverts_head() {
        let mut board = BookingBoard::default();
        board.load(vec![Booking::new("5", "Vidyo")]);
        board.remove_success("5");
        assert!(board.is_empty());
        assert!(!board.has_launch_target("iframeTarget5"));
        assert_eq!(board.table_head(), TableHead::NoBookings);
        assert_eq!(board.remove_success("5"), None);
    }

    #[test]
    fn test_buttons_hidden_for_single_booking() {
        let mut board = BookingBoard::default();
        board.load(vec![startable("1", "CERNMCU", true)]);
        assert!(!board.buttons().visible);
    }

    #[test]
    fn test_buttons_two_types() {
        let mut board = BookingBoard::default();
        board.load(vec![startable("1", "Vidyo", false), startable("2", "EVO", false)]);
        assert_eq!(
            board.buttons(),
            StartStopButtons {
                visible: true,
                start_enabled: true,
                stop_enabled: false
            }
        );
    }

    #[test]
    fn test_buttons_same_type_needs_batch_support() {
        let mut board = BookingBoard::default();
        board.load(vec![startable("1", "Vidyo", false), startable("2", "Vidyo", false)]);
        assert!(!board.buttons().visible);

        board.load(vec![startable("1", "CERNMCU", true), startable("2", "CERNMCU", true)]);
        assert!(board.buttons().start_enabled);
    }

    #[test]
    fn test_plan_start_all_warns_once_per_type() {
        let mut board = BookingBoard::default();
        board.load(vec![
            startable("1", "Vidyo", false),
            startable("2", "Vidyo", false),
            startable("3", "CERNMCU", true),
            startable("4", "Vidyo", false),
            startable("5", "CERNMCU", true),
        ]);
        let plan = board.plan_start_all();
        assert_eq!(plan.ids, vec!["1", "3", "5"]);
        assert_eq!(
            plan.warnings,
            vec!["Multiple Vidyo bookings cannot start at the same time, so we just started the first one."]
        );
    }

    #[test]
    fn test_plan_stop_all_needs_enabled_button() {
        let mut board = BookingBoard::default();
        let mut a = startable("1", "Vidyo", false);
        a.can_be_stopped = true;
        let mut b = startable("2", "EVO", false);
        b.can_be_stopped = true;
        board.load(vec![a, b]);
        assert_eq!(board.plan_stop_all().ids, vec!["1", "2"]);

        board.load(vec![startable("1", "Vidyo", false)]);
        assert!(board.plan_stop_all().ids.is_empty());
    }

    #[test]
    fn test_route_start() {
        let mut board = BookingBoard::default();
        let mut mcu = startable("1", "CERNMCU", true);
        mcu.requires_server_call_for_start = true;
        let evo = startable("2", "EVO", false);
        board.load(vec![mcu, evo, startable("3", "Skype", false)]);

        assert_eq!(board.route_start("1"), Some(ActionRoute::Server));
        assert!(board.booking("1").unwrap().permission_to_start);
        // EVO refuses to start without a URL
        assert_eq!(board.route_start("2"), Some(ActionRoute::Denied));
        assert_eq!(board.route_start("3"), Some(ActionRoute::Local));
        assert_eq!(board.route_start("9"), None);
    }

    #[test]
    fn test_start_local_needs_client_call_and_permission() {
        let mut board = BookingBoard::default();
        let mut booking = startable("7", "Vidyo", false);
        booking.url = Some("https://vidyo.example.org/join/7".to_string());
        booking.requires_client_call_for_start = true;
        board.load(vec![booking.clone()]);

        let mut launcher = MockLauncher::new();
        launcher.expect_open().never();
        assert!(!board.start_local("7", &launcher).unwrap());

        booking.permission_to_start = true;
        let mut launcher = MockLauncher::new();
        launcher
            .expect_open()
            .withf(|target, url| target == "iframeTarget7" && url == "https://vidyo.example.org/join/7")
            .times(1)
            .returning(|_, _| Ok(()));
        assert!(board.complete_start(booking, &launcher).unwrap());
    }

    #[test]
    fn test_connect_requires_flag() {
        let mut board = BookingBoard::default();
        let mut booking = Booking::new("8", "Vidyo");
        booking.url = Some("https://vidyo.example.org/join/8".to_string());
        board.load(vec![booking.clone()]);

        let mut launcher = MockLauncher::new();
        launcher.expect_open().never();
        assert!(!board.connect("8", &launcher).unwrap());

        booking.has_connect = true;
        board.refresh_booking(booking);
        let mut launcher = MockLauncher::new();
        launcher.expect_open().times(1).returning(|_, _| Ok(()));
        assert!(board.connect("8", &launcher).unwrap());
    }

    #[test]
    fn test_error_report_routing() {
        let board = BookingBoard::default();
        let inline = ClientError::Validation(vec![FieldError::new("roomName", "Please enter a room name")]);
        assert!(matches!(
            board.error_report("Vidyo", BookingEvent::Create, &inline),
            ErrorReport::Inline(fields) if fields.len() == 1
        ));

        let refused = ClientError::Business(BusinessError::rejected("create", "6"));
        match board.error_report("CERNMCU", BookingEvent::Create, &refused) {
            ErrorReport::Popup(popup) => assert_eq!(popup.title, "MCU Error"),
            other => panic!("unexpected {:?}", other),
        }

        let transport = ClientError::Transport("timeout".to_string());
        assert_eq!(
            board.error_report("Vidyo", BookingEvent::Start, &transport),
            ErrorReport::Unexpected("Request failed: timeout".to_string())
        );
    }

    #[test]
    fn test_permissions() {
        let mut registry = PluginRegistry::new();
        registry.register("Vidyo", PluginCapabilities::default());
        let mut board = BookingBoard::new(registry);

        let warning = board.check_permission("Vidyo", "create").unwrap_err();
        assert!(warning.starts_with("You do not have enough permissions to create Vidyo bookings."));

        board.grant_all();
        assert!(board.check_permission("Vidyo", "create").is_ok());
        board.set_create_permission("Vidyo", false);
        assert!(board.check_permission("Vidyo", "delete").is_err());
    }

    #[test]
    fn test_toggle_info_ignores_unknown() {
        let mut board = BookingBoard::default();
        board.load(vec![Booking::new("1", "EVO")]);
        assert!(board.toggle_info("1"));
        assert!(!board.toggle_info("1"));
        board.toggle_info("missing");
        assert!(!board.is_info_visible("missing"));
    }
}
