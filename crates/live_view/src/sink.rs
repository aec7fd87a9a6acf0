use std::sync::{Arc, Mutex, MutexGuard};

use common::{DisplaySink, LoggerError, PanelSpec, PlotFrame, Result};
use eframe::egui;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Waiting,
    Running { cycle: usize, total: usize },
    Finished,
    Failed(String),
}

/// What the window draws, shared between the driving thread and the UI.
pub struct LiveState {
    pub panels: Vec<PanelSpec>,
    pub frame: Option<PlotFrame>,
    pub status: SessionStatus,
    pub closed: bool,
    ctx: Option<egui::Context>,
}

impl LiveState {
    fn new() -> Self {
        Self {
            panels: Vec::new(),
            frame: None,
            status: SessionStatus::Waiting,
            closed: false,
            ctx: None,
        }
    }

    fn wake(&self) {
        if let Some(ctx) = &self.ctx {
            ctx.request_repaint();
        }
    }
}

pub type SharedState = Arc<Mutex<LiveState>>;

pub(crate) fn new_state() -> SharedState {
    Arc::new(Mutex::new(LiveState::new()))
}

pub(crate) fn lock(state: &SharedState) -> MutexGuard<'_, LiveState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub(crate) fn attach_context(state: &SharedState, ctx: egui::Context) {
    lock(state).ctx = Some(ctx);
}

pub(crate) fn mark_closed(state: &SharedState) {
    lock(state).closed = true;
}

/// Display sink that hands frames to an egui window on another thread.
#[derive(Clone)]
pub struct EguiDisplay {
    state: SharedState,
}

impl EguiDisplay {
    pub(crate) fn new(state: SharedState) -> Self {
        Self { state }
    }
}

impl DisplaySink for EguiDisplay {
    fn init_panels(&mut self, panels: Vec<PanelSpec>) -> Result<()> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(LoggerError::DisplayClosed);
        }
        state.panels = panels;
        state.wake();
        Ok(())
    }

    fn repaint(&mut self, frame: PlotFrame) -> Result<()> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(LoggerError::DisplayClosed);
        }
        state.status = SessionStatus::Running {
            cycle: frame.cycle + 1,
            total: frame.total_cycles,
        };
        state.frame = Some(frame);
        state.wake();
        Ok(())
    }

    fn finish(&mut self, error: Option<String>) {
        let mut state = lock(&self.state);
        state.status = match error {
            Some(reason) => SessionStatus::Failed(reason),
            None => SessionStatus::Finished,
        };
        state.wake();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(cycle: usize) -> PlotFrame {
        PlotFrame {
            cycle,
            total_cycles: 4,
            series: vec![vec![[0.0, 1.0]]],
        }
    }

    #[test]
    fn frames_replace_each_other() {
        let state = new_state();
        let mut display = EguiDisplay::new(state.clone());
        display.repaint(frame(0)).unwrap();
        display.repaint(frame(1)).unwrap();

        let seen = lock(&state);
        assert_eq!(seen.frame.as_ref().map(|f| f.cycle), Some(1));
        assert_eq!(seen.status, SessionStatus::Running { cycle: 2, total: 4 });
    }

    #[test]
    fn closed_window_rejects_frames() {
        let state = new_state();
        let mut display = EguiDisplay::new(state.clone());
        mark_closed(&state);
        assert!(matches!(display.repaint(frame(0)), Err(LoggerError::DisplayClosed)));
    }

    #[test]
    fn finish_records_failure_reason() {
        let state = new_state();
        let mut display = EguiDisplay::new(state.clone());
        display.finish(Some("stream closed by the instrument".to_string()));
        assert_eq!(
            lock(&state).status,
            SessionStatus::Failed("stream closed by the instrument".to_string())
        );
    }
}
