//! Club classification from free-text club names.
//!
//! Classification is total: every string maps to exactly one [`ClubType`].
//! Names that match no known pattern fall back to [`ClubType::Iron`] with
//! `default_applied` set, so callers can tell a confident classification
//! from a fallback.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Club families with distinct rule sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClubType {
    Driver,
    Iron,
    Wedge,
}

impl ClubType {
    pub const ALL: [ClubType; 3] = [ClubType::Driver, ClubType::Iron, ClubType::Wedge];

    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    pub fn code(&self) -> &'static str {
        match self {
            ClubType::Driver => "driver",
            ClubType::Iron => "iron",
            ClubType::Wedge => "wedge",
        }
    }
}

impl fmt::Display for ClubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of classifying a club name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubClassification {
    pub club: ClubType,
    /// True when the name was not recognized and the Iron default applied
    pub default_applied: bool,
}

impl ClubClassification {
    pub fn recognized(club: ClubType) -> Self {
        Self {
            club,
            default_applied: false,
        }
    }

    pub fn fallback() -> Self {
        Self {
            club: ClubType::Iron,
            default_applied: true,
        }
    }
}

/// Lowest loft (degrees) treated as a wedge when a club is named by loft
const WEDGE_MIN_LOFT: u32 = 45;

const WEDGE_ABBREVIATIONS: &[&str] = &["pw", "gw", "aw", "sw", "lw", "uw", "dw", "w"];

/// Classify a free-text club name.
///
/// Normalization lowercases the name and strips whitespace, hyphens,
/// underscores, dots and degree signs before matching.
pub fn classify_club(name: &str) -> ClubClassification {
    let norm = normalize(name);

    if norm.is_empty() {
        return ClubClassification::fallback();
    }

    if is_driver(&norm) {
        return ClubClassification::recognized(ClubType::Driver);
    }

    if is_wedge(&norm) {
        return ClubClassification::recognized(ClubType::Wedge);
    }

    if is_iron_family(&norm) {
        return ClubClassification::recognized(ClubType::Iron);
    }

    ClubClassification::fallback()
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '-' | '_' | '.' | '°'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn split_number(s: &str) -> (Option<u32>, &str) {
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return (None, s);
    }
    (s[..digits].parse().ok(), &s[digits..])
}

fn is_driver(s: &str) -> bool {
    if matches!(s, "driver" | "dr" | "d" | "1w" | "1wood") {
        return true;
    }
    s.contains("driver")
}

fn is_wedge(s: &str) -> bool {
    if WEDGE_ABBREVIATIONS.contains(&s) || s.contains("wedge") {
        return true;
    }

    // Loft-named clubs: "56", "56deg", "60degree"
    let (number, rest) = split_number(s);
    match (number, rest) {
        (Some(loft), "" | "deg" | "degree" | "degrees") => loft >= WEDGE_MIN_LOFT,
        _ => false,
    }
}

fn is_iron_family(s: &str) -> bool {
    if s.contains("iron")
        || s.contains("hybrid")
        || s.contains("rescue")
        || s.contains("utility")
        || s.contains("fairway")
        || s.contains("wood")
    {
        return true;
    }

    // Short forms: "7i", "4h", "3w", "5wd"
    let (number, rest) = split_number(s);
    number.is_some() && matches!(rest, "i" | "h" | "hy" | "w" | "wd")
}
