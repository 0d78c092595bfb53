use ratatui::{buffer::Buffer, layout::Rect};

use crate::app::{App, AppState};

/// A UI Screen boundary: responsible for drawing one application state
pub trait Screen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer);
}

pub struct HomeScreen;

impl Screen for HomeScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        super::render_home(app, area, buf);
    }
}

/// Active step of a running screening
pub struct TestScreen;

impl Screen for TestScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        super::test_view::render_test(app, area, buf);
    }
}

pub struct ResultsScreen;

impl Screen for ResultsScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        super::results::render_results(app, area, buf);
    }
}

/// Clinician overview, uses dedicated renderer
pub struct DashboardScreen;

impl Screen for DashboardScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        super::dashboard::render_dashboard(&app.dashboard, area, buf);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: AppState) -> Box<dyn Screen> {
    match state {
        AppState::Home => Box::new(HomeScreen),
        AppState::Test => Box::new(TestScreen),
        AppState::Results => Box::new(ResultsScreen),
        AppState::Dashboard => Box::new(DashboardScreen),
    }
}
