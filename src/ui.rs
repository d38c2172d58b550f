pub mod charting;
pub mod history;
pub mod screen;

use std::ops::Range;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;
use webbrowser::Browser;

use crate::score::ScoreHistory;
use crate::session::{Phase, Snapshot};
use crate::settings::Topic;
use crate::stream::{Word, WordStatus};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const WORD_LINES: usize = 3;
/// Sessions plotted on the results chart.
const CHART_SESSIONS: usize = 30;

/// Everything a frame is drawn from.
pub struct View<'a> {
    pub snapshot: &'a Snapshot,
    pub history: &'a ScoreHistory,
    pub loading: Option<&'a Topic>,
}

/// Splits the word sequence into display lines no wider than `max_width`.
pub fn word_lines(words: &[Word], max_width: usize) -> Vec<Range<usize>> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut width = 0;
    for (i, word) in words.iter().enumerate() {
        // +3 leaves room for overtyping on the active word
        let w = word.text.width() + 3;
        if width > 0 && width + w > max_width {
            lines.push(start..i);
            start = i;
            width = 0;
        }
        width += w + 1;
    }
    if start < words.len() {
        lines.push(start..words.len());
    }
    lines
}

/// Lines to show: the one holding the cursor and the ones after it.
pub fn visible_lines(
    lines: &[Range<usize>],
    cursor: usize,
    count: usize,
) -> &[Range<usize>] {
    let current = lines
        .iter()
        .position(|r| r.contains(&cursor))
        .unwrap_or(lines.len().saturating_sub(1));
    let end = (current + count).min(lines.len());
    &lines[current.min(end)..end]
}

impl Widget for &View<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.snapshot.phase {
            Phase::Idle | Phase::Playing => render_typing(self, area, buf),
            Phase::Finished => render_results(self, area, buf),
        }
    }
}

fn render_typing(view: &View, area: Rect, buf: &mut Buffer) {
    let snapshot = view.snapshot;
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
    let red_bold_style = Style::default().patch(bold_style).fg(Color::Red);
    let dim_bold_style = Style::default()
        .patch(bold_style)
        .add_modifier(Modifier::DIM);
    let underlined_dim_bold_style = Style::default()
        .patch(dim_bold_style)
        .add_modifier(Modifier::UNDERLINED);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let max_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1) as usize;
    let word_height = WORD_LINES as u16;
    let padding = area.height.saturating_sub(word_height + 6) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(padding),
            Constraint::Length(1), // settings
            Constraint::Length(1), // timer and live stats
            Constraint::Length(1),
            Constraint::Length(word_height),
            Constraint::Length(1),
            Constraint::Length(1), // draft
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let settings = match view.loading {
        Some(topic) => Span::styled(
            format!("generating words for \"{}\"…", topic),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        ),
        None => Span::styled(
            format!("{} · {}s", snapshot.topic, snapshot.duration_secs),
            dim_bold_style,
        ),
    };
    Paragraph::new(settings)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let status = format!(
        "{}   {} wpm   {}% acc",
        snapshot.remaining_secs, snapshot.stats.wpm, snapshot.stats.accuracy
    );
    Paragraph::new(Span::styled(status, bold_style))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let lines = word_lines(&snapshot.words, max_width);
    let shown = visible_lines(&lines, snapshot.cursor, WORD_LINES);
    let text: Vec<Line> = shown
        .iter()
        .map(|range| {
            let mut spans = Vec::new();
            for i in range.clone() {
                let word = &snapshot.words[i];
                if word.status == WordStatus::Active {
                    if let Some(active) = snapshot.active_view() {
                        spans.push(Span::styled(active.matched, green_bold_style));
                        spans.push(Span::styled(active.mistyped, red_bold_style));
                        spans.push(Span::styled(active.pending, underlined_dim_bold_style));
                    }
                } else {
                    let style = match word.status {
                        WordStatus::Correct => green_bold_style,
                        WordStatus::Incorrect => red_bold_style.add_modifier(Modifier::CROSSED_OUT),
                        _ => dim_bold_style,
                    };
                    spans.push(Span::styled(word.text.clone(), style));
                }
                spans.push(Span::raw(" "));
            }
            Line::from(spans)
        })
        .collect();

    Paragraph::new(text)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true })
        .render(chunks[4], buf);

    let draft_style = match snapshot.active_view() {
        Some(active) if active.has_error() => red_bold_style,
        _ => bold_style,
    };
    Paragraph::new(Line::from(vec![
        Span::styled("> ", dim_bold_style),
        Span::styled(snapshot.draft.clone(), draft_style),
    ]))
    .render(chunks[6], buf);

    let legend = if snapshot.phase == Phase::Idle {
        "start typing / (tab) duration / (↑↓) topic / (esc)ape"
    } else {
        "(esc)ape"
    };
    Paragraph::new(Span::styled(legend, italic_style)).render(chunks[8], buf);
}

fn render_results(view: &View, area: Rect, buf: &mut Buffer) {
    let snapshot = view.snapshot;
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);
    let magenta_style = Style::default().fg(Color::Magenta);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // chart
            Constraint::Length(1), // score
            Constraint::Length(1), // details
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let points = charting::wpm_points(view.history, CHART_SESSIONS);
    let (sessions, highest_wpm) = charting::compute_chart_params(&points);
    let datasets = vec![Dataset::default()
        .marker(Marker::Braille)
        .style(magenta_style)
        .graph_type(GraphType::Line)
        .data(&points)];

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("session")
                .bounds([1.0, sessions])
                .labels(vec![
                    Span::styled("1", bold_style),
                    Span::styled(charting::format_label(sessions), bold_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(highest_wpm), bold_style),
                ]),
        );
    chart.render(chunks[0], buf);

    let (wpm, accuracy) = match &snapshot.last_score {
        Some(score) => (score.wpm, score.accuracy),
        None => (snapshot.stats.wpm, snapshot.stats.accuracy),
    };
    Paragraph::new(Span::styled(
        format!("{} wpm   {}% acc", wpm, accuracy),
        bold_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} correct · {} incorrect · {} keystrokes · {} · {}s",
            snapshot.correct_words,
            snapshot.incorrect_words,
            snapshot.total_keystrokes,
            snapshot.topic,
            snapshot.duration_secs
        ),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    let legend = if Browser::is_available() {
        "(r)etry / (n)ew words / (h)istory / (t)weet / (esc)ape"
    } else {
        "(r)etry / (n)ew words / (h)istory / (esc)ape"
    };
    Paragraph::new(Span::styled(legend, italic_style)).render(chunks[4], buf);
}

/// Tweet intent for a finished session.
pub fn share_url(wpm: u32, accuracy: u32, topic: &str) -> String {
    let topic: String = topic
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '+' })
        .collect();
    format!(
        "https://twitter.com/intent/tweet?text={}%20wpm%20%2F%20{}%25%20acc%20%2F%20{}%20%E2%80%94%20rapidtype",
        wpm, accuracy, topic
    )
}
