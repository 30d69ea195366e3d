// Conference Timetable Application
// Main entry point

use conference_timetable::ui_egui::TimetableApp;

fn main() -> eframe::Result {
    env_logger::init();

    log::info!("Starting Conference Timetable");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Conference Timetable")
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Conference Timetable",
        options,
        Box::new(|cc| -> Result<Box<dyn eframe::App>, Box<dyn std::error::Error + Send + Sync>> {
            let app = TimetableApp::new(cc)?;
            Ok(Box::new(app))
        }),
    )
}
