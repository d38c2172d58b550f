use crate::score::ScoreHistory;

/// (session number, wpm) for the last `limit` sessions, oldest first.
pub fn wpm_points(history: &ScoreHistory, limit: usize) -> Vec<(f64, f64)> {
    let entries = history.entries();
    let start = entries.len().saturating_sub(limit);
    entries[start..]
        .iter()
        .enumerate()
        .map(|(i, entry)| ((i + 1) as f64, entry.wpm as f64))
        .collect()
}

/// Compute X (sessions) and Y (WPM) bounds for the results chart
pub fn compute_chart_params(wpm_coords: &[(f64, f64)]) -> (f64, f64) {
    let mut highest_wpm = 0.0;
    for &(_, wpm) in wpm_coords {
        if wpm > highest_wpm {
            highest_wpm = wpm;
        }
    }

    // a single session still needs a non-empty x range
    let mut sessions = wpm_coords.last().map_or(2.0, |x| x.0);
    if sessions < 2.0 {
        sessions = 2.0;
    }

    (sessions, f64::max(highest_wpm.round(), 1.0))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
