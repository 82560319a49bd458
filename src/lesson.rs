use std::fmt;

use serde::{Deserialize, Serialize};

/// Gap index shared between the answer table and control `id` attributes.
/// Parsed once in the gap locator and threaded everywhere as-is.
pub type GapId = u32;

/// Stable placeholder marking a blank in sentence text.
pub const PLACEHOLDER: &str = "____";

/// Marker substituted for co-occurring blanks in the whole-body fallback.
pub const ELISION: &str = "…";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Level {
    #[default]
    Elementary,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn parse(s: &str) -> Option<Level> {
        match s.trim() {
            "Elementary" => Some(Level::Elementary),
            "Intermediate" => Some(Level::Intermediate),
            "Advanced" => Some(Level::Advanced),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Elementary => "Elementary",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scored blank: correct answer plus a 3-way multiple-choice set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gap {
    pub id: GapId,
    pub correct: String,
    pub options: Vec<String>,
    pub explanation: String,
}

/// One display sentence with its gaps in left-to-right order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentence {
    pub id: u32,
    pub text: String,
    pub gaps: Vec<Gap>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub level: Level,
    pub sentences: Vec<Sentence>,
}

// ── Tests ──
