//! Shared join key between scheduled classes and attendance history.
//!
//! Key format: `className|day|time|location`, all lowercase. Both the
//! schedule extractor and the attendance aggregator must build keys through
//! this one function; any drift between the two sides produces no error,
//! just silently empty attendance lookups.

/// Builds the canonical join key for a class slot.
///
/// Class name and location are stripped of punctuation; class name and time
/// have internal whitespace runs collapsed to single spaces. Every
/// component is lowercased and trimmed.
pub fn attendance_key(class_name: &str, day: &str, time: &str, location: &str) -> String {
    let class_name = collapse_whitespace(&strip_punctuation(&class_name.to_lowercase()));
    let day = day.to_lowercase().trim().to_string();
    let time = collapse_whitespace(&time.to_lowercase());
    let location = strip_punctuation(&location.to_lowercase()).trim().to_string();

    format!("{class_name}|{day}|{time}|{location}")
}

/// Drops everything except word characters and whitespace.
fn strip_punctuation(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect()
}

/// Trims and collapses internal whitespace runs to single spaces.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
