use crate::config::{SessionConfig, SessionPlan};
use crate::dashboard::PlotFrame;
use crate::error::Result;

/// Marker colours cycled through by sensor index (matplotlib's tab10).
pub const PALETTE: [(&str, [u8; 3]); 10] = [
    ("blue", [31, 119, 180]),
    ("orange", [255, 127, 14]),
    ("green", [44, 160, 44]),
    ("red", [214, 39, 40]),
    ("purple", [148, 103, 189]),
    ("brown", [140, 86, 75]),
    ("pink", [227, 119, 194]),
    ("gray", [127, 127, 127]),
    ("olive", [188, 189, 34]),
    ("cyan", [23, 190, 207]),
];

pub fn palette_color(sensor: usize) -> [u8; 3] {
    PALETTE[sensor % PALETTE.len()].1
}

/// Fixed layout of one sensor's plot panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelSpec {
    pub label: String,
    pub y_bounds: (f64, f64),
    pub x_bounds: (f64, f64),
    pub x_label: &'static str,
    pub color: [u8; 3],
}

impl PanelSpec {
    pub fn for_session(config: &SessionConfig, plan: &SessionPlan) -> Vec<PanelSpec> {
        (0..plan.sensors)
            .map(|k| PanelSpec {
                label: config.sensor_headers[k].clone(),
                y_bounds: (config.lower_sensor_limits[k], config.upper_sensor_limits[k]),
                x_bounds: (0.0, plan.total_samples as f64),
                x_label: plan.time_unit.axis_label(),
                color: palette_color(k),
            })
            .collect()
    }
}

/// Rendering surface fed by the live driver.
pub trait DisplaySink {
    /// Called once, on the first tick, before any frame.
    fn init_panels(&mut self, panels: Vec<PanelSpec>) -> Result<()>;

    /// Replaces the plotted series and asks the surface to redraw.
    fn repaint(&mut self, frame: PlotFrame) -> Result<()>;

    /// The session is over; `error` holds the reason if it aborted.
    fn finish(&mut self, _error: Option<String>) {}
}

impl<D: DisplaySink + ?Sized> DisplaySink for Box<D> {
    fn init_panels(&mut self, panels: Vec<PanelSpec>) -> Result<()> {
        (**self).init_panels(panels)
    }

    fn repaint(&mut self, frame: PlotFrame) -> Result<()> {
        (**self).repaint(frame)
    }

    fn finish(&mut self, error: Option<String>) {
        (**self).finish(error)
    }
}
