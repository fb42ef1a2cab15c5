//! Schedule extraction from the weekly class-schedule CSV.
//!
//! The sheet is wide and irregular: per-day column blocks repeat
//! horizontally, day and date labels live in merged cells above the header,
//! and nothing sits at a fixed offset. Structure is located by content (a
//! header row carrying both "Time" and "Location"), never by position.

use crate::error::ParseError;
use crate::join;
use crate::normalize::{DAYS_ORDER, Difficulty, Normalizer};
use chrono::NaiveTime;
use regex::Regex;
use serde::Serialize;
use serde::ser::SerializeMap;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, info};

static AMPM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}):(\d{2})\s*(AM|PM)").unwrap());
static HM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap());

/// One scheduled class occurrence on the weekly board.
#[derive(Debug, Clone, Serialize)]
pub struct ClassOccurrence {
    /// Canonical weekday name.
    pub day: String,
    /// Original time cell text.
    pub time_raw: String,
    /// Parsed time of day; `None` iff `time_raw` matched no known pattern.
    #[serde(skip)]
    pub time_date: Option<NaiveTime>,
    /// Canonical 12-hour display time, or the raw text when unparseable.
    pub time: String,
    pub location: String,
    pub class_name: String,
    pub trainer1: String,
    /// Raw cover-trainer cell, kept for display.
    pub cover: String,
    /// Substitution narrative when a cover trainer replaces trainer 1.
    pub notes: String,
    /// Display identity key; collisions are acceptable, it only needs to be
    /// stable for a given slot.
    pub unique_key: String,
    pub difficulty: Difficulty,
}

impl ClassOccurrence {
    /// Join key correlating this occurrence with aggregated attendance.
    pub fn attendance_key(&self) -> String {
        join::attendance_key(&self.class_name, &self.day, &self.time, &self.location)
    }
}

/// The extracted weekly schedule, grouped by canonical weekday.
///
/// Only weekdays with at least one occurrence are present. Iteration always
/// follows the fixed Monday–Sunday order, never map order.
#[derive(Debug, Default)]
pub struct ScheduleData {
    by_day: HashMap<String, Vec<ClassOccurrence>>,
}

impl ScheduleData {
    pub fn is_empty(&self) -> bool {
        self.by_day.is_empty()
    }

    pub fn total_classes(&self) -> usize {
        self.by_day.values().map(Vec::len).sum()
    }

    pub fn classes_for(&self, day: &str) -> Option<&[ClassOccurrence]> {
        self.by_day.get(day).map(Vec::as_slice)
    }

    /// Iterates `(day, classes)` pairs in Monday–Sunday order, skipping
    /// days without classes.
    pub fn iter_days(&self) -> impl Iterator<Item = (&'static str, &[ClassOccurrence])> {
        DAYS_ORDER
            .iter()
            .filter_map(|day| self.by_day.get(*day).map(|classes| (*day, classes.as_slice())))
    }

    /// All occurrences flattened in canonical day order.
    pub fn all_classes(&self) -> impl Iterator<Item = &ClassOccurrence> {
        self.iter_days().flat_map(|(_, classes)| classes)
    }
}

impl Serialize for ScheduleData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for (day, classes) in self.iter_days() {
            map.serialize_entry(day, classes)?;
        }
        map.end()
    }
}

/// Parses a time cell into a time of day.
///
/// Accepts `H:MM AM/PM` (case-insensitive, `.` treated as `:`) or bare
/// 24-hour `H:MM`; anything else returns `None`.
pub fn parse_time_to_date(time_str: &str) -> Option<NaiveTime> {
    if time_str.is_empty() {
        return None;
    }
    let time = time_str.trim().to_uppercase().replace('.', ":");

    if let Some(caps) = AMPM_RE.captures(&time) {
        let mut hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        if &caps[3] == "PM" && hour != 12 {
            hour += 12;
        }
        if &caps[3] == "AM" && hour == 12 {
            hour = 0;
        }
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    if let Some(caps) = HM_RE.captures(&time) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    None
}

/// Renders a time of day as `h:mm AM/PM`; `None` renders as empty.
pub fn format_time(time: Option<NaiveTime>) -> String {
    match time {
        Some(t) => t.format("%-I:%M %p").to_string(),
        None => String::new(),
    }
}

/// Extracts the weekly schedule from raw CSV text.
///
/// # Errors
///
/// Fails with a structural [`ParseError`] when the header row, day row, or
/// time column cannot be located. Individual malformed rows are skipped.
pub fn extract_schedule_data(
    csv_text: &str,
    normalizer: &Normalizer,
) -> Result<ScheduleData, ParseError> {
    let rows = parse_grid(csv_text)?;
    debug!(total_rows = rows.len(), "Schedule CSV parsed");

    if rows.len() < 4 {
        return Err(ParseError::NotEnoughRows);
    }

    let header_row_index = rows
        .iter()
        .position(|row| {
            row.iter().any(|c| c.trim().eq_ignore_ascii_case("time"))
                && row.iter().any(|c| c.trim().eq_ignore_ascii_case("location"))
        })
        .ok_or(ParseError::HeaderRowNotFound)?;

    // Day labels sit somewhere above the header, possibly with a date row
    // in between them and other metadata.
    let day_row_index = (0..header_row_index)
        .rev()
        .find(|&i| {
            rows[i].iter().any(|cell| {
                DAYS_ORDER.iter().any(|day| cell.trim().eq_ignore_ascii_case(day))
            })
        })
        .ok_or(ParseError::DayRowNotFound)?;

    static EMPTY_ROW: &[String] = &[];
    let date_row: &[String] = if day_row_index > 0 {
        &rows[day_row_index - 1]
    } else {
        EMPTY_ROW
    };
    let header_row = &rows[header_row_index];
    let day_row = &rows[day_row_index];

    let time_col = header_row
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("time"))
        .ok_or(ParseError::TimeColumnNotFound)?;

    // One "Location" header per horizontal day block.
    let location_cols: Vec<usize> = header_row
        .iter()
        .enumerate()
        .filter(|(_, h)| h.trim().eq_ignore_ascii_case("location"))
        .map(|(i, _)| i)
        .collect();

    debug!(
        header_row_index,
        day_row_index,
        time_col,
        location_blocks = location_cols.len(),
        "Schedule structure located"
    );

    let mut classes: Vec<ClassOccurrence> = Vec::new();
    let mut processed_rows = 0usize;

    for row in &rows[header_row_index + 1..] {
        let time_raw = cell(row, time_col);
        if time_raw.is_empty() || row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        processed_rows += 1;

        for &loc_col in &location_cols {
            let location_raw = cell(row, loc_col);
            if location_raw.is_empty() {
                continue;
            }
            let location = normalizer.normalize_location(location_raw);

            let day_label = scan_back(day_row, loc_col);
            let date_label = scan_back(date_row, loc_col);
            let day = DAYS_ORDER
                .iter()
                .find(|d| d.eq_ignore_ascii_case(day_label))
                .map(|d| d.to_string())
                .unwrap_or_else(|| day_label.to_string());

            let class_name_raw = cell(row, loc_col + 1);
            let trainer1_raw = cell(row, loc_col + 2);
            // loc_col + 3 holds trainer 2, which the board does not use.
            let cover_raw = cell(row, loc_col + 4);

            let class_name = normalizer.normalize_class_name(class_name_raw, Some(trainer1_raw));
            if class_name.is_empty() || class_name.eq_ignore_ascii_case("class canceled") {
                continue;
            }

            let mut trainer1 = normalizer.normalize_trainer_name(trainer1_raw);
            let mut notes = String::new();
            if !cover_raw.is_empty() {
                let cover_norm = normalizer.normalize_trainer_name(cover_raw);
                notes = if trainer1.is_empty() {
                    format!("Cover: {cover_norm}")
                } else {
                    format!("Cover ({cover_norm}) replaces Trainer 1 ({trainer1})")
                };
                trainer1 = cover_norm;
            }

            let time_date = parse_time_to_date(time_raw);
            let time = if time_date.is_some() {
                format_time(time_date)
            } else {
                time_raw.to_string()
            };

            let unique_key: String =
                format!("{day}{time}{class_name}{trainer1}{location}{date_label}")
                    .to_lowercase()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
            let difficulty = normalizer.difficulty_for(&class_name);

            classes.push(ClassOccurrence {
                day,
                time_raw: time_raw.to_string(),
                time_date,
                time,
                location,
                class_name,
                trainer1,
                cover: cover_raw.to_string(),
                notes,
                unique_key,
                difficulty,
            });
        }
    }

    info!(
        processed_rows,
        class_count = classes.len(),
        "Schedule extraction complete"
    );

    let mut by_day: HashMap<String, Vec<ClassOccurrence>> = HashMap::new();
    for cls in classes {
        by_day.entry(cls.day.clone()).or_default().push(cls);
    }
    // Rows whose day label never resolved to a canonical weekday have no
    // tab to live on and are dropped here.
    by_day.retain(|day, _| DAYS_ORDER.contains(&day.as_str()));

    for list in by_day.values_mut() {
        // Unparseable times sort as midnight, i.e. first.
        list.sort_by_key(|c| c.time_date.unwrap_or(NaiveTime::MIN));
    }

    Ok(ScheduleData { by_day })
}

/// Reads the CSV into a headerless, variable-width grid of cells.
fn parse_grid(csv_text: &str) -> Result<Vec<Vec<String>>, ParseError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|c| c.trim()).unwrap_or("")
}

/// Finds the nearest non-empty label cell at or left of `from`.
///
/// Day and date labels sit in merged cells, so the label that owns a column
/// block is the first non-empty cell scanning leftward.
fn scan_back(row: &[String], from: usize) -> &str {
    (0..=from)
        .rev()
        .map(|i| cell(row, i))
        .find(|c| !c.is_empty())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn extract(csv: &str) -> Result<ScheduleData, ParseError> {
        extract_schedule_data(csv, &Normalizer::default())
    }

    #[test]
    fn test_parse_time_am_pm() {
        assert_eq!(parse_time_to_date("9:00 AM"), NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(parse_time_to_date("6:30 pm"), NaiveTime::from_hms_opt(18, 30, 0));
        assert_eq!(parse_time_to_date("12:00 PM"), NaiveTime::from_hms_opt(12, 0, 0));
        assert_eq!(parse_time_to_date("12:30 AM"), NaiveTime::from_hms_opt(0, 30, 0));
    }

    #[test]
    fn test_parse_time_dot_separator_and_24h() {
        assert_eq!(parse_time_to_date("9.15 PM"), NaiveTime::from_hms_opt(21, 15, 0));
        assert_eq!(parse_time_to_date("14:30"), NaiveTime::from_hms_opt(14, 30, 0));
    }

    #[test]
    fn test_parse_time_rejects_garbage() {
        assert_eq!(parse_time_to_date(""), None);
        assert_eq!(parse_time_to_date("morning"), None);
        assert_eq!(parse_time_to_date("25:99"), None);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(NaiveTime::from_hms_opt(9, 0, 0)), "9:00 AM");
        assert_eq!(format_time(NaiveTime::from_hms_opt(18, 5, 0)), "6:05 PM");
        assert_eq!(format_time(None), "");
    }

    #[test]
    fn test_end_to_end_single_class() {
        let csv = "\
,,,\n\
,25 Aug 2025,,\n\
,Monday,,\n\
Time,Location,Class,Trainer 1\n\
9:00 AM,Kemps Corner,Barre57,Karan\n\
,,,\n";
        let data = extract(csv).unwrap();
        let monday = data.classes_for("Monday").unwrap();
        assert_eq!(monday.len(), 1);

        let cls = &monday[0];
        assert_eq!(cls.location, "Kwality House, Kemps Corner");
        assert_eq!(cls.class_name, "Studio Barre 57");
        assert_eq!(cls.trainer1, "Karan Bhatia");
        assert_eq!(cls.difficulty, Difficulty::Beginner);
        assert_eq!(cls.time, "9:00 AM");
        assert_eq!(cls.day, "Monday");
        assert!(cls.notes.is_empty());
    }

    #[test]
    fn test_missing_header_row_is_fatal() {
        let csv = "\
a,b,c\n\
d,e,f\n\
g,h,i\n\
j,k,l\n";
        assert!(matches!(extract(csv), Err(ParseError::HeaderRowNotFound)));
    }

    #[test]
    fn test_missing_day_row_is_fatal() {
        let csv = "\
x,y,z\n\
Time,Location,Class,Trainer 1\n\
9:00 AM,Kemps Corner,Barre57,Karan\n\
10:00 AM,Kemps Corner,Mat57,Anisha\n";
        assert!(matches!(extract(csv), Err(ParseError::DayRowNotFound)));
    }

    #[test]
    fn test_too_few_rows_is_fatal() {
        let csv = "Time,Location\n9:00 AM,Kemps\n";
        assert!(matches!(extract(csv), Err(ParseError::NotEnoughRows)));
    }

    #[test]
    fn test_cover_substitution_narrative() {
        let csv = "\
,25 Aug 2025,,,,,\n\
,Monday,,,,,\n\
Time,Location,Class,Trainer 1,Trainer 2,Cover\n\
9:00 AM,Kemps Corner,Barre57,Karan,,Anisha\n\
,,,,,,\n";
        let data = extract(csv).unwrap();
        let cls = &data.classes_for("Monday").unwrap()[0];
        assert_eq!(cls.trainer1, "Anisha Shah");
        assert_eq!(cls.notes, "Cover (Anisha Shah) replaces Trainer 1 (Karan Bhatia)");
        assert_eq!(cls.cover, "Anisha");
    }

    #[test]
    fn test_cover_without_primary_trainer() {
        let csv = "\
,25 Aug 2025,,,,,\n\
,Monday,,,,,\n\
Time,Location,Class,Trainer 1,Trainer 2,Cover\n\
9:00 AM,Kemps Corner,Barre57,,,Anisha\n\
,,,,,,\n";
        let data = extract(csv).unwrap();
        let cls = &data.classes_for("Monday").unwrap()[0];
        assert_eq!(cls.trainer1, "Anisha Shah");
        assert_eq!(cls.notes, "Cover: Anisha Shah");
    }

    #[test]
    fn test_canceled_slot_dropped() {
        let csv = "\
,25 Aug 2025,,,\n\
,Monday,,,\n\
Time,Location,Class,Trainer 1\n\
9:00 AM,Kemps Corner,Class canceled,\n\
10:00 AM,Kemps Corner,Barre57,Karan\n";
        let data = extract(csv).unwrap();
        let monday = data.classes_for("Monday").unwrap();
        assert_eq!(monday.len(), 1);
        assert_eq!(monday[0].class_name, "Studio Barre 57");
    }

    #[test]
    fn test_private_class_retained() {
        let csv = "\
,25 Aug 2025,,,\n\
,Monday,,,\n\
Time,Location,Class,Trainer 1\n\
11:00 AM,Kemps Corner,Client session,Atulan\n\
,,,,\n";
        let data = extract(csv).unwrap();
        let cls = &data.classes_for("Monday").unwrap()[0];
        assert_eq!(cls.class_name, "Private Class - (Atulan)");
        assert_eq!(cls.difficulty, Difficulty::Intermediate);
    }

    #[test]
    fn test_days_sorted_by_time_with_unparseable_first() {
        let csv = "\
,25 Aug 2025,,,\n\
,Monday,,,\n\
Time,Location,Class,Trainer 1\n\
6:00 PM,Kemps Corner,Barre57,Karan\n\
TBD,Kemps Corner,Mat57,Anisha\n\
7:00 AM,Kemps Corner,HIIT,Rohan\n";
        let data = extract(csv).unwrap();
        let monday = data.classes_for("Monday").unwrap();
        let times: Vec<_> = monday.iter().map(|c| c.time.as_str()).collect();
        assert_eq!(times, vec!["TBD", "7:00 AM", "6:00 PM"]);

        // Ordering invariant: non-decreasing time within the day, None first.
        let mut last = NaiveTime::MIN;
        for cls in monday {
            let t = cls.time_date.unwrap_or(NaiveTime::MIN);
            assert!(t >= last);
            last = t;
        }
    }

    #[test]
    fn test_multiple_day_blocks_resolve_leftward_labels() {
        // Two horizontal day blocks sharing one time column. The day/date
        // labels only appear at each block's first column.
        let csv = "\
,25 Aug 2025,,,,,26 Aug 2025,,,,\n\
,Monday,,,,,Tuesday,,,,\n\
Time,Location,Class,Trainer 1,Trainer 2,Cover,Location,Class,Trainer 1,Trainer 2,Cover\n\
9:00 AM,Kemps Corner,Barre57,Karan,,,Bandra,Mat57,Anisha,,\n";
        let data = extract(csv).unwrap();

        let monday = data.classes_for("Monday").unwrap();
        assert_eq!(monday.len(), 1);
        assert_eq!(monday[0].location, "Kwality House, Kemps Corner");

        let tuesday = data.classes_for("Tuesday").unwrap();
        assert_eq!(tuesday.len(), 1);
        assert_eq!(tuesday[0].class_name, "Studio Mat 57");
        assert_eq!(tuesday[0].location, "Supreme HQ, Bandra");

        let days: Vec<_> = data.iter_days().map(|(day, _)| day).collect();
        assert_eq!(days, vec!["Monday", "Tuesday"]);
    }

    #[test]
    fn test_unique_key_is_lowercase_without_whitespace() {
        let csv = "\
,25 Aug 2025,,,\n\
,Monday,,,\n\
Time,Location,Class,Trainer 1\n\
9:00 AM,Kemps Corner,Barre57,Karan\n\
,,,,\n";
        let data = extract(csv).unwrap();
        let cls = &data.classes_for("Monday").unwrap()[0];
        assert!(!cls.unique_key.contains(char::is_whitespace));
        assert_eq!(cls.unique_key, cls.unique_key.to_lowercase());
        assert!(cls.unique_key.contains("studiobarre57"));
        assert!(cls.unique_key.contains("25aug2025"));
    }

    #[test]
    fn test_serializes_in_canonical_day_order() {
        let csv = "\
,25 Aug 2025,,,,,24 Aug 2025,,,,\n\
,Tuesday,,,,,Sunday,,,,\n\
Time,Location,Class,Trainer 1,Trainer 2,Cover,Location,Class,Trainer 1,Trainer 2,Cover\n\
9:00 AM,Kemps Corner,Barre57,Karan,,,Bandra,Mat57,Anisha,,\n";
        let data = extract(csv).unwrap();
        let json = serde_json::to_string(&data).unwrap();
        let tuesday_pos = json.find("Tuesday").unwrap();
        let sunday_pos = json.find("Sunday").unwrap();
        assert!(tuesday_pos < sunday_pos);
    }

    #[test]
    fn test_time_date_none_iff_unparseable() {
        let t = parse_time_to_date("9:00 AM");
        assert_eq!(t.map(|t| t.hour()), Some(9));
        assert!(parse_time_to_date("whenever").is_none());
    }
}
