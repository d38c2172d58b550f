use ratatui::Frame;

use crate::ui::{
    history::{render_history, HistoryState},
    View,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppScreen {
    Typing,
    Results,
    History,
}

/// A UI Screen boundary: responsible for rendering one state of the app
pub trait Screen {
    fn render(&self, view: &View, history_state: &mut HistoryState, f: &mut Frame);
}

/// Idle and playing sessions
pub struct TypingScreen;

impl Screen for TypingScreen {
    fn render(&self, view: &View, _history_state: &mut HistoryState, f: &mut Frame) {
        f.render_widget(view, f.area());
    }
}

/// Finished session score and wpm chart
pub struct ResultsScreen;

impl Screen for ResultsScreen {
    fn render(&self, view: &View, _history_state: &mut HistoryState, f: &mut Frame) {
        f.render_widget(view, f.area());
    }
}

pub struct HistoryScreen;

impl Screen for HistoryScreen {
    fn render(&self, view: &View, history_state: &mut HistoryState, f: &mut Frame) {
        render_history(view.history, history_state, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(screen: AppScreen) -> Box<dyn Screen> {
    match screen {
        AppScreen::Typing => Box::new(TypingScreen),
        AppScreen::Results => Box::new(ResultsScreen),
        AppScreen::History => Box::new(HistoryScreen),
    }
}
