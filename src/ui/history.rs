use chrono::{DateTime, Local};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::score::{ScoreEntry, ScoreHistory};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HistoryState {
    pub scroll_offset: usize,
}

impl HistoryState {
    pub fn scroll_down(&mut self, rows: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(rows);
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(rows);
    }

    pub fn top(&mut self) {
        self.scroll_offset = 0;
    }
}

/// "3 minutes ago" style age of `at` relative to `now`.
pub fn relative_time(at: &DateTime<Local>, now: &DateTime<Local>) -> String {
    let elapsed = now.signed_duration_since(*at).to_std().unwrap_or_default();
    if elapsed.as_secs() < 1 {
        return "just now".to_string();
    }
    HumanTime::from(elapsed).to_text_en(Accuracy::Rough, Tense::Past)
}

/// Pure presenter for a single history row
pub fn present_row(entry: &ScoreEntry, now: &DateTime<Local>) -> Row<'static> {
    let wpm_color = if entry.wpm >= 60 {
        Color::Green
    } else if entry.wpm >= 35 {
        Color::Yellow
    } else {
        Color::Red
    };

    let accuracy_color = if entry.accuracy >= 95 {
        Color::Green
    } else if entry.accuracy >= 85 {
        Color::Yellow
    } else {
        Color::Red
    };

    Row::new(vec![
        Cell::from(relative_time(&entry.timestamp, now)),
        Cell::from(entry.topic.clone()),
        Cell::from(entry.wpm.to_string()).style(
            Style::default()
                .fg(wpm_color)
                .add_modifier(Modifier::BOLD),
        ),
        Cell::from(format!("{}%", entry.accuracy)).style(Style::default().fg(accuracy_color)),
        Cell::from(format!("{}/{}", entry.correct_words, entry.incorrect_words)),
        Cell::from(format!("{}s", entry.time_spent)),
    ])
}

/// Top speeds listed under the summary.
pub const BEST_SESSIONS: usize = 3;

/// "best sessions: 72, 68, 61 wpm", or None for an empty history.
pub fn best_line(history: &ScoreHistory) -> Option<String> {
    let best = history.best(BEST_SESSIONS);
    if best.is_empty() {
        return None;
    }
    let speeds: Vec<String> = best.iter().map(|e| e.wpm.to_string()).collect();
    Some(format!("best sessions: {} wpm", speeds.join(", ")))
}

pub fn summary_line(history: &ScoreHistory) -> String {
    match history.summary() {
        Some(s) => format!(
            "{} sessions · best {} wpm · avg {:.0} wpm · avg {:.0}% acc",
            s.sessions, s.best_wpm, s.avg_wpm, s.avg_accuracy
        ),
        None => "No sessions yet".to_string(),
    }
}

/// Render the score history screen, newest first
pub fn render_history(history: &ScoreHistory, state: &mut HistoryState, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(4), // Summary and best sessions
            Constraint::Min(0),    // Table
            Constraint::Length(2), // Instructions
        ])
        .split(area);

    let mut heading = vec![Line::from(summary_line(history))];
    if let Some(best) = best_line(history) {
        heading.push(Line::from(best));
    }
    let title = Paragraph::new(heading)
        .block(Block::default().borders(Borders::ALL).title("History"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if history.is_empty() {
        let no_data = Paragraph::new("Finish a session to start your history.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        // borders + header
        let table_height = chunks[1].height.saturating_sub(3) as usize;
        let max_scroll = history.len().saturating_sub(table_height);
        if state.scroll_offset > max_scroll {
            state.scroll_offset = max_scroll;
        }

        let header = Row::new(vec!["When", "Topic", "WPM", "Acc", "Words", "Time"]).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let now = Local::now();
        let rows: Vec<Row> = history
            .recent(history.len())
            .skip(state.scroll_offset)
            .take(table_height)
            .map(|entry| present_row(entry, &now))
            .collect();

        let widths = [
            Constraint::Length(18),
            Constraint::Min(12),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Length(8),
            Constraint::Length(6),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Sessions"))
            .column_spacing(2);
        f.render_widget(table, chunks[1]);
    }

    let instructions =
        Paragraph::new("(↑/↓) scroll  (PgUp/PgDn) page  (Home) top  (b/backspace) back")
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
    f.render_widget(instructions, chunks[2]);
}
