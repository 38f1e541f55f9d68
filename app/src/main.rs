mod app;
mod ui;

use app::VisualizerApp;
use planefit::{AppConfig, logging};

fn main() -> eframe::Result<()> {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    let config = match AppConfig::load(None) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Falling back to default config: {err}");
            AppConfig::default()
        }
    };

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Decision Boundary Visualizer",
        native_options,
        Box::new(|_cc| Ok(Box::new(VisualizerApp::new(config)))),
    )
}
