use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Session lengths offered to the user, in seconds.
pub const DURATIONS: [u32; 5] = [15, 30, 60, 120, 300];
pub const DEFAULT_DURATION: u32 = 30;

pub fn is_valid_duration(secs: u32) -> bool {
    DURATIONS.contains(&secs)
}

/// Next duration in the cycle, wrapping around. Unknown values restart the cycle.
pub fn next_duration(secs: u32) -> u32 {
    match DURATIONS.iter().position(|&d| d == secs) {
        Some(i) => DURATIONS[(i + 1) % DURATIONS.len()],
        None => DURATIONS[0],
    }
}

/// clap value parser for `--duration`
pub fn parse_duration(s: &str) -> Result<u32, String> {
    let secs: u32 = s
        .parse()
        .map_err(|_| format!("`{}` is not a number of seconds", s))?;
    if is_valid_duration(secs) {
        Ok(secs)
    } else {
        Err(format!("duration must be one of {:?}", DURATIONS))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    Animals,
    Nature,
    Space,
    Technology,
    Food,
    Sports,
    Music,
    Travel,
}

impl Theme {
    pub const ALL: [Theme; 8] = [
        Theme::Animals,
        Theme::Nature,
        Theme::Space,
        Theme::Technology,
        Theme::Food,
        Theme::Sports,
        Theme::Music,
        Theme::Travel,
    ];
}

/// What the word stream is about. `Random` draws from the built-in list,
/// everything else goes through the word source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Topic {
    #[default]
    Random,
    Preset(Theme),
    Custom(String),
}

impl Topic {
    pub fn needs_generation(&self) -> bool {
        !matches!(self, Topic::Random)
    }

    /// Random followed by the predefined themes; custom topics are not cycled.
    pub fn presets() -> Vec<Topic> {
        std::iter::once(Topic::Random)
            .chain(Theme::ALL.iter().copied().map(Topic::Preset))
            .collect()
    }

    pub fn next_preset(&self) -> Topic {
        self.step_preset(1)
    }

    pub fn previous_preset(&self) -> Topic {
        let presets = Self::presets();
        self.step_preset(presets.len() - 1)
    }

    fn step_preset(&self, step: usize) -> Topic {
        let presets = Self::presets();
        match presets.iter().position(|t| t == self) {
            Some(i) => presets[(i + step) % presets.len()].clone(),
            None => Topic::Random,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Random => write!(f, "random"),
            Topic::Preset(theme) => write!(f, "{}", theme),
            Topic::Custom(text) => write!(f, "{}", text),
        }
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("topic must not be empty".to_string());
        }
        Ok(Topic::from(trimmed.to_string()))
    }
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        let normalized = s.trim().to_lowercase();
        if normalized.is_empty() || normalized == "random" {
            return Topic::Random;
        }
        Theme::ALL
            .iter()
            .find(|theme| theme.to_string() == normalized)
            .map(|&theme| Topic::Preset(theme))
            .unwrap_or_else(|| Topic::Custom(s.trim().to_string()))
    }
}

impl From<Topic> for String {
    fn from(t: Topic) -> Self {
        t.to_string()
    }
}
