//! Output formatting and persistence for the reconciled board.
//!
//! Supports pretty JSON logging, JSON report files, and CSV append.

use anyhow::Result;
use tracing::{debug, info};

use crate::attendance::AttendanceData;
use crate::normalize::Difficulty;
use crate::schedule::ClassOccurrence;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;

/// One board line: a scheduled occurrence plus whatever attendance history
/// joined to it. Attendance columns stay blank when the join misses.
#[derive(Debug, Serialize)]
pub struct BoardRecord {
    pub day: String,
    pub time: String,
    pub class_name: String,
    pub trainer1: String,
    pub location: String,
    pub difficulty: Difficulty,
    pub notes: String,
    pub avg_attendance: Option<String>,
    pub total_classes: Option<u32>,
    pub checked_in_count: Option<u32>,
    pub participants: Option<u32>,
    pub late_cancellations: Option<u32>,
    pub non_paid_customers: Option<u32>,
    pub comps_checked_in: Option<u32>,
}

impl BoardRecord {
    pub fn new(cls: &ClassOccurrence, attendance: Option<&AttendanceData>) -> Self {
        BoardRecord {
            day: cls.day.clone(),
            time: cls.time.clone(),
            class_name: cls.class_name.clone(),
            trainer1: cls.trainer1.clone(),
            location: cls.location.clone(),
            difficulty: cls.difficulty,
            notes: cls.notes.clone(),
            avg_attendance: attendance.map(|a| a.avg_attendance.clone()),
            total_classes: attendance.map(|a| a.total_classes),
            checked_in_count: attendance.map(|a| a.checked_in_count),
            participants: attendance.map(|a| a.participants),
            late_cancellations: attendance.map(|a| a.late_cancellations),
            non_paid_customers: attendance.map(|a| a.non_paid_customers),
            comps_checked_in: attendance.map(|a| a.comps_checked_in),
        }
    }
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes a value as pretty-printed JSON to a file.
pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    info!(path, "JSON report written");
    Ok(())
}

/// Appends a [`BoardRecord`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, record: &BoardRecord) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}
