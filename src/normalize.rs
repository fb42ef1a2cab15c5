//! Canonical name, class, and location lookups.
//!
//! The schedule sheet and the payroll export are both hand-authored, so the
//! same trainer or class shows up under nicknames, abbreviations, and typos.
//! [`Normalizer`] maps that free text onto canonical display names through
//! ordered alias tables: exact match first, then a substring scan in table
//! declaration order. Declaration order is load-bearing — overlapping alias
//! keys resolve to whichever entry appears first, not to the longest match.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical weekday names, Monday first. Drives day-row detection,
/// grouping, and the tab order of every output surface.
pub const DAYS_ORDER: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Difficulty tier shown next to each class on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        };
        f.write_str(s)
    }
}

/// Trainer aliases: first name, nickname, or surname to full display name.
static TRAINER_ALIASES: &[(&str, &str)] = &[
    // Mumbai
    ("anisha", "Anisha Shah"),
    ("atulan", "Atulan Purohit"),
    ("cauveri", "Cauveri Vikrant"),
    ("karan", "Karan Bhatia"),
    ("karanvir", "Karanvir Bhatia"),
    ("mriga", "Mrigakshi Jaiswal"),
    ("nishanth", "Nishanth Raj"),
    ("nishant", "Nishanth Raj"),
    ("pranjali", "Pranjali Jain"),
    ("reshma", "Reshma Sharma"),
    ("richard", "Richard D'Costa"),
    ("rohan", "Rohan Dahima"),
    // Bengaluru & common
    ("kajol", "Kajol Kanchan"),
    ("kanchan", "Kajol Kanchan"),
    ("pushyank", "Pushyank Nahar"),
    ("nahar", "Pushyank Nahar"),
    ("shruti k", "Shruti Kulkarni"),
    ("shruti kulkarni", "Shruti Kulkarni"),
    ("kulkarni", "Shruti Kulkarni"),
    ("vivaran", "Vivaran Dhasmana"),
    ("dhasmana", "Vivaran Dhasmana"),
    ("saniya", "Saniya Jaiswal"),
    ("jaiswal", "Saniya Jaiswal"),
    ("shruti s", "Shruti Suresh"),
    ("shruti suresh", "Shruti Suresh"),
    ("suresh", "Shruti Suresh"),
    ("poojitha", "Poojitha Bhaskar"),
    ("bhaskar", "Poojitha Bhaskar"),
    ("siddhartha", "Siddhartha Kusuma"),
    ("kusuma", "Siddhartha Kusuma"),
    ("veena", "Veena Narasimhan"),
    ("narasimhan", "Veena Narasimhan"),
    ("chaitanya", "Chaitanya"),
];

/// Class-name aliases to standardized studio class names.
static CLASS_ALIASES: &[(&str, &str)] = &[
    ("amped up", "Studio Amped Up!"),
    ("bbb", "Studio Back Body Blaze"),
    ("bbb exp", "Studio Back Body Blaze Express"),
    ("barre57", "Studio Barre 57"),
    ("barre 57", "Studio Barre 57"),
    ("barre57 exp", "Studio Barre 57 Express"),
    ("barre 57 exp", "Studio Barre 57 Express"),
    ("cardio b", "Studio Cardio Barre"),
    ("cardio barre", "Studio Cardio Barre"),
    ("cardio b exp", "Studio Cardio Barre Express"),
    ("cardio barre exp", "Studio Cardio Barre Express"),
    ("cardio b+", "Studio Cardio Barre Plus"),
    ("cardio barre+", "Studio Cardio Barre Plus"),
    ("studio fit", "Studio FIT"),
    ("fit", "Studio FIT"),
    ("studio foundations", "Studio Foundations"),
    ("foundations", "Studio Foundations"),
    ("studio hiit", "Studio HIIT"),
    ("hiit", "Studio HIIT"),
    ("hosted", "Studio Hosted Class"),
    ("studio mat 57", "Studio Mat 57"),
    ("mat57", "Studio Mat 57"),
    ("mat 57", "Studio Mat 57"),
    ("mat57 exp", "Studio Mat 57 Express"),
    ("mat 57 exp", "Studio Mat 57 Express"),
    ("cycle", "Studio powerCycle"),
    ("cycle exp", "Studio powerCycle Express"),
    ("prenatal", "Studio Pre/Post Natal"),
    ("studio recovery", "Studio Recovery"),
    ("recovery", "Studio Recovery"),
    ("sweat", "Studio SWEAT In 30"),
    ("studio trainer's choice", "Studio Trainer's Choice"),
    ("trainer's choice", "Studio Trainer's Choice"),
];

/// Location containment checks, evaluated in priority order; each rule is
/// an OR over its fragments.
static LOCATION_RULES: &[(&[&str], &str)] = &[
    // Mumbai
    (&["kemps", "kwality"], "Kwality House, Kemps Corner"),
    (&["bandra", "supreme"], "Supreme HQ, Bandra"),
    // Bengaluru
    (&["c+c", "cumberland"], "C+C"),
    (&["vm road", "vm", "kenkere"], "Kenkere House"),
    (&["koramangala"], "Koramangala"),
    (&["whitefield"], "Whitefield"),
    (&["indiranagar"], "Indiranagar"),
    // Online / virtual
    (&["online", "virtual", "zoom"], "Online"),
];

/// Difficulty per canonical class name. Anything unlisted is intermediate.
static DIFFICULTY_MAP: &[(&str, Difficulty)] = &[
    ("Studio Barre 57", Difficulty::Beginner),
    ("Studio Barre 57 Express", Difficulty::Beginner),
    ("Studio Foundations", Difficulty::Beginner),
    ("Studio SWEAT In 30", Difficulty::Beginner),
    ("Studio Recovery", Difficulty::Beginner),
    ("Studio HIIT", Difficulty::Advanced),
    ("Studio Amped Up!", Difficulty::Advanced),
    ("Studio Back Body Blaze", Difficulty::Intermediate),
    ("Studio Back Body Blaze Express", Difficulty::Intermediate),
    ("Studio Cardio Barre", Difficulty::Intermediate),
    ("Studio Cardio Barre Express", Difficulty::Intermediate),
    ("Studio Cardio Barre Plus", Difficulty::Intermediate),
    ("Studio FIT", Difficulty::Intermediate),
    ("Studio Mat 57", Difficulty::Intermediate),
    ("Studio Mat 57 Express", Difficulty::Intermediate),
    ("Studio powerCycle", Difficulty::Beginner),
    ("Studio powerCycle Express", Difficulty::Beginner),
    ("Studio Pre/Post Natal", Difficulty::Beginner),
    ("Studio Trainer's Choice", Difficulty::Advanced),
    ("Studio Hosted Class", Difficulty::Beginner),
];

/// Pure lookup component over the static alias tables.
///
/// Owns its tables as immutable configuration so behavior is fully
/// deterministic and swappable in tests.
pub struct Normalizer {
    trainer_aliases: &'static [(&'static str, &'static str)],
    class_aliases: &'static [(&'static str, &'static str)],
    location_rules: &'static [(&'static [&'static str], &'static str)],
    difficulty_map: &'static [(&'static str, Difficulty)],
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            trainer_aliases: TRAINER_ALIASES,
            class_aliases: CLASS_ALIASES,
            location_rules: LOCATION_RULES,
            difficulty_map: DIFFICULTY_MAP,
        }
    }
}

impl Normalizer {
    /// Maps a raw trainer cell to the canonical trainer name.
    ///
    /// Exact alias match first; otherwise the first alias key contained in
    /// the input wins; otherwise the trimmed input passes through unchanged.
    pub fn normalize_trainer_name(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }
        let val = raw.trim().to_lowercase();
        if let Some((_, canonical)) = self.trainer_aliases.iter().find(|(key, _)| *key == val) {
            return (*canonical).to_string();
        }
        for (key, canonical) in self.trainer_aliases {
            if val.contains(key) {
                return (*canonical).to_string();
            }
        }
        raw.trim().to_string()
    }

    /// Maps a raw class cell to the standardized class name.
    ///
    /// Unmatched entries with a trainer hint (or a usable raw name) become
    /// `Private Class - (<name>)`, except the literal cancellation marker,
    /// which flows through un-mapped so the extractor can drop the slot.
    pub fn normalize_class_name(&self, raw: &str, trainer_hint: Option<&str>) -> String {
        if raw.is_empty() {
            return String::new();
        }
        let val = raw.trim().to_lowercase();
        if let Some((_, canonical)) = self.class_aliases.iter().find(|(key, _)| *key == val) {
            return (*canonical).to_string();
        }
        for (key, canonical) in self.class_aliases {
            if val.contains(key) {
                return (*canonical).to_string();
            }
        }

        let client = trainer_hint.filter(|h| !h.is_empty()).unwrap_or(raw).trim();
        if !client.is_empty() && !client.eq_ignore_ascii_case("class canceled") {
            return format!("Private Class - ({client})");
        }

        raw.trim().to_string()
    }

    /// Maps a raw location cell to the canonical studio location.
    pub fn normalize_location(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }
        let lower = raw.trim().to_lowercase();
        for (fragments, canonical) in self.location_rules {
            if fragments.iter().any(|fragment| lower.contains(fragment)) {
                return (*canonical).to_string();
            }
        }
        raw.trim().to_string()
    }

    /// Looks up the difficulty tier for a canonical class name.
    pub fn difficulty_for(&self, class_name: &str) -> Difficulty {
        self.difficulty_map
            .iter()
            .find(|(key, _)| *key == class_name)
            .map(|(_, difficulty)| *difficulty)
            .unwrap_or(Difficulty::Intermediate)
    }
}
