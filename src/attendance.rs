//! Attendance aggregation from the historical export ZIP.
//!
//! The export holds several CSVs; the one that matters is the aggregate
//! payroll report, located by filename fragment. Its rows are per-class
//! attendance counters which get grouped under the shared join key and
//! summed into per-slot statistics.

use crate::error::ParseError;
use crate::join;
use crate::normalize::{DAYS_ORDER, Normalizer};
use crate::schedule::{format_time, parse_time_to_date};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Filename fragment identifying the aggregate payroll report entry.
const REPORT_NAME_FRAGMENT: &str = "momence-teachers-payroll-report-aggregate-combined";

/// Date renderings seen in the report's `Class date` column.
const DATE_FORMATS: &[&str] = &[
    "%d %b %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%B %d %Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
];

#[derive(Debug, Deserialize)]
struct ReportRow {
    #[serde(rename = "Class name", default)]
    class_name: String,
    #[serde(rename = "Class date", default)]
    class_date: String,
    #[serde(rename = "Location", default)]
    location: String,
    #[serde(rename = "Checked in", default)]
    checked_in: String,
    #[serde(rename = "Participants", default)]
    participants: String,
    #[serde(rename = "Late cancellations", default)]
    late_cancellations: String,
    #[serde(rename = "Non Paid Customers", default)]
    non_paid_customers: String,
    #[serde(rename = "Comps Checked In", default)]
    comps_checked_in: String,
}

/// Running counters for one class slot, summed across report rows.
#[derive(Debug, Default)]
struct AttendanceAggregate {
    total_checked_in: u32,
    total_classes: u32,
    participants: u32,
    late_cancellations: u32,
    non_paid_customers: u32,
    comps_checked_in: u32,
}

impl AttendanceAggregate {
    fn finalize(self) -> AttendanceData {
        // Aggregates only exist once a row has contributed, so
        // total_classes is at least 1; max(1) keeps the division total.
        let avg = f64::from(self.total_checked_in) / f64::from(self.total_classes.max(1));
        AttendanceData {
            avg_attendance: format!("{avg:.2}"),
            total_classes: self.total_classes,
            checked_in_count: self.total_checked_in,
            participants: self.participants,
            late_cancellations: self.late_cancellations,
            non_paid_customers: self.non_paid_customers,
            comps_checked_in: self.comps_checked_in,
        }
    }
}

/// Finalized attendance statistics for one class slot.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceData {
    /// Mean checked-in count, formatted to two decimal places.
    pub avg_attendance: String,
    pub total_classes: u32,
    pub checked_in_count: u32,
    pub participants: u32,
    pub late_cancellations: u32,
    pub non_paid_customers: u32,
    pub comps_checked_in: u32,
}

/// Processes an attendance export ZIP into per-slot statistics keyed by the
/// shared attendance key.
///
/// # Errors
///
/// Fails with [`ParseError::ReportEntryNotFound`] when no entry matches the
/// report filename fragment, or with a CSV/ZIP error when the archive or
/// report is unreadable. Individual bad rows are skipped with a diagnostic.
pub fn process_attendance_data(
    zip_bytes: &[u8],
    normalizer: &Normalizer,
) -> Result<HashMap<String, AttendanceData>, ParseError> {
    let csv_text = read_report_entry(zip_bytes)?;
    aggregate_report(&csv_text, normalizer)
}

/// Pulls the payroll report CSV text out of the export archive.
fn read_report_entry(zip_bytes: &[u8]) -> Result<String, ParseError> {
    let mut archive = ZipArchive::new(Cursor::new(zip_bytes))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !entry.name().to_lowercase().contains(REPORT_NAME_FRAGMENT) {
            continue;
        }
        debug!(entry = entry.name(), "Attendance report entry found");
        let mut text = String::new();
        entry.read_to_string(&mut text)?;
        return Ok(text);
    }

    Err(ParseError::ReportEntryNotFound)
}

fn aggregate_report(
    csv_text: &str,
    normalizer: &Normalizer,
) -> Result<HashMap<String, AttendanceData>, ParseError> {
    let mut rdr = csv::Reader::from_reader(csv_text.as_bytes());
    let mut aggregates: HashMap<String, AttendanceAggregate> = HashMap::new();
    let mut skipped = 0usize;

    for result in rdr.deserialize() {
        let row: ReportRow = result?;

        let class_name = normalizer.normalize_class_name(&row.class_name, None);
        if class_name.is_empty() || row.class_date.is_empty() || row.location.is_empty() {
            skipped += 1;
            continue;
        }

        // "Class date" carries a calendar date and a time, comma-separated.
        let mut parts = row.class_date.splitn(3, ',');
        let (Some(date_part), Some(time_part)) = (parts.next(), parts.next()) else {
            skipped += 1;
            continue;
        };
        let (date_part, time_part) = (date_part.trim(), time_part.trim());
        if time_part.is_empty() {
            skipped += 1;
            continue;
        }

        let Some(date) = parse_report_date(date_part) else {
            warn!(class_date = %row.class_date, "Skipping attendance row with unparseable date");
            skipped += 1;
            continue;
        };
        let day = DAYS_ORDER[date.weekday().num_days_from_monday() as usize];

        let time = format_time(parse_time_to_date(time_part));
        if time.is_empty() {
            warn!(time = time_part, "Skipping attendance record with unparseable time");
            skipped += 1;
            continue;
        }

        let location = normalizer.normalize_location(&row.location);
        let key = join::attendance_key(&class_name, day, &time, &location);

        let agg = aggregates.entry(key).or_default();
        agg.total_checked_in += parse_count(&row.checked_in);
        agg.participants += parse_count(&row.participants);
        agg.late_cancellations += parse_count(&row.late_cancellations);
        agg.non_paid_customers += parse_count(&row.non_paid_customers);
        agg.comps_checked_in += parse_count(&row.comps_checked_in);
        agg.total_classes += 1;
    }

    debug!(
        slots = aggregates.len(),
        skipped, "Attendance aggregation complete"
    );

    Ok(aggregates
        .into_iter()
        .map(|(key, agg)| (key, agg.finalize()))
        .collect())
}

fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Parses the leading decimal digits of a counter cell, defaulting to 0.
fn parse_count(raw: &str) -> u32 {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}
