//! Live plot window for a running logging session.
//!
//! The session's driver owns an [`EguiDisplay`] and pushes one frame per
//! cycle; the window only ever reads the latest frame.

mod app;
mod sink;

pub use app::LiveViewApp;
pub use sink::{EguiDisplay, LiveState, SessionStatus, SharedState};

use eframe::egui;

const PANEL_HEIGHT: f32 = 220.0;

/// Creates a connected display sink and window.
pub fn live_view(title: impl Into<String>) -> (EguiDisplay, LiveViewApp) {
    let state = sink::new_state();
    (EguiDisplay::new(state.clone()), LiveViewApp::new(state, title.into()))
}

/// Runs the window on the calling thread until it is closed.
pub fn run_window(app: LiveViewApp, title: &str, sensors: usize) -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 80.0 + PANEL_HEIGHT * sensors.max(1) as f32])
            .with_title(title),
        ..Default::default()
    };

    eframe::run_native(
        "Serial Data Logger",
        options,
        Box::new(move |cc| {
            app.attach(cc.egui_ctx.clone());
            Box::new(app)
        }),
    )
}
