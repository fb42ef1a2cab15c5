//! Trait and types for the AI-assisted structured schedule extraction.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Whether a slot is running or marked canceled in the source sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleStatus {
    Scheduled,
    Canceled,
}

/// One flat schedule row produced by the AI extraction pass.
///
/// Unlike the local extractor's occurrences, these keep per-date rows
/// across multiple weekly blocks and represent unknown cells as `None`
/// instead of dropping the row. The advanced calendar/table/analytics
/// surfaces consume this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassScheduleRow {
    pub id: String,
    /// Class date as `YYYY-MM-DD`.
    pub date: String,
    pub day: String,
    pub time: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub trainer1: Option<String>,
    #[serde(default)]
    pub trainer2: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    pub status: ScheduleStatus,
}

/// Abstraction over a generative-AI schedule extraction provider.
#[async_trait::async_trait]
pub trait InsightsApi {
    /// Converts raw schedule CSV text into flat structured rows.
    async fn extract_schedule(&self, csv_text: &str) -> Result<Vec<ClassScheduleRow>>;
}
