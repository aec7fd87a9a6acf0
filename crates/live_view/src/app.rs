use eframe::egui;
use egui_plot::{Plot, PlotPoints, Points};

use crate::sink::{attach_context, lock, mark_closed, SessionStatus, SharedState};

const PANEL_MIN_HEIGHT: f32 = 120.0;
const MARKER_RADIUS: f32 = 2.0;

/// Window with one stacked panel per sensor.
pub struct LiveViewApp {
    state: SharedState,
    title: String,
}

impl LiveViewApp {
    pub(crate) fn new(state: SharedState, title: String) -> Self {
        Self { state, title }
    }

    pub(crate) fn attach(&self, ctx: egui::Context) {
        attach_context(&self.state, ctx);
    }
}

impl eframe::App for LiveViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let state = lock(&self.state);

        egui::TopBottomPanel::top("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong(self.title.as_str());
                ui.separator();
                let status = match &state.status {
                    SessionStatus::Waiting => {
                        egui::RichText::new("Waiting for first batch...").color(egui::Color32::GRAY)
                    }
                    SessionStatus::Running { cycle, total } => {
                        egui::RichText::new(format!("Cycle {} of {}", cycle, total))
                            .color(egui::Color32::GREEN)
                    }
                    SessionStatus::Finished => {
                        egui::RichText::new("Session complete").color(egui::Color32::LIGHT_BLUE)
                    }
                    SessionStatus::Failed(reason) => {
                        egui::RichText::new(format!("Session aborted: {}", reason))
                            .color(egui::Color32::RED)
                    }
                };
                ui.label(status);
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if state.panels.is_empty() {
                ui.label("Waiting for data...");
                return;
            }

            let count = state.panels.len();
            let height = (ui.available_height() / count as f32 - 8.0).max(PANEL_MIN_HEIGHT);

            egui::ScrollArea::vertical().show(ui, |ui| {
                for (k, panel) in state.panels.iter().enumerate() {
                    let series = state
                        .frame
                        .as_ref()
                        .and_then(|f| f.series.get(k))
                        .cloned()
                        .unwrap_or_default();
                    let [r, g, b] = panel.color;

                    let mut plot = Plot::new(format!("sensor_{}", k))
                        .height(height)
                        .include_x(panel.x_bounds.0)
                        .include_x(panel.x_bounds.1)
                        .include_y(panel.y_bounds.0)
                        .include_y(panel.y_bounds.1)
                        .allow_scroll(false)
                        .allow_zoom(false)
                        .allow_drag(false)
                        .y_axis_label(panel.label.clone());
                    if k + 1 == count {
                        plot = plot.x_axis_label(panel.x_label);
                    }

                    plot.show(ui, |plot_ui| {
                        plot_ui.points(
                            Points::new(PlotPoints::new(series))
                                .radius(MARKER_RADIUS)
                                .color(egui::Color32::from_rgb(r, g, b)),
                        );
                    });
                }
            });
        });
    }
}

impl Drop for LiveViewApp {
    fn drop(&mut self) {
        mark_closed(&self.state);
    }
}
