//! CLI entry point for the studio board tool.
//!
//! Provides subcommands for building the reconciled weekly board from a
//! schedule CSV and attendance export, aggregating attendance on its own,
//! and running the AI-assisted structured extraction.

mod infra;
mod services;

use crate::infra::gemini::GeminiClient;
use crate::services::insights_api::InsightsApi;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use studio_board::{
    attendance::{AttendanceData, process_attendance_data},
    fetch::{BasicClient, fetch_bytes},
    normalize::Normalizer,
    output::{BoardRecord, append_record, print_json, write_json},
    schedule::extract_schedule_data,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "studio_board")]
#[command(about = "Reconciles a studio's weekly schedule with attendance history", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the weekly board from a schedule CSV, joined with attendance history
    Board {
        /// Path to the schedule CSV file or URL to fetch it from
        #[arg(value_name = "FILE_OR_URL")]
        schedule: String,

        /// Attendance export ZIP to join against
        #[arg(short, long)]
        attendance: Option<String>,

        /// CSV file to append board rows to
        #[arg(short, long, default_value = "board.csv")]
        output: String,

        /// Optional path for a grouped-schedule JSON report
        #[arg(long)]
        json: Option<String>,
    },
    /// Aggregate an attendance export ZIP into per-slot statistics
    Attendance {
        /// Path to the attendance export ZIP
        #[arg(value_name = "ZIP")]
        zip: String,

        /// JSON file to write the aggregated statistics to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Run the AI structured extraction alongside the local pipeline
    Extract {
        /// Path to the schedule CSV file or URL to fetch it from
        #[arg(value_name = "FILE_OR_URL")]
        schedule: String,

        /// JSON file to write the AI-extracted rows to
        #[arg(short, long, default_value = "schedule_rows.json")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/studio_board.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("studio_board.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Board {
            schedule,
            attendance,
            output,
            json,
        } => {
            build_board(&schedule, attendance.as_deref(), &output, json.as_deref()).await?;
        }
        Commands::Attendance { zip, output } => {
            let bytes = std::fs::read(&zip)?;
            let normalizer = Normalizer::default();
            let map = process_attendance_data(&bytes, &normalizer)?;
            info!(slots = map.len(), "Attendance aggregated");
            match output {
                Some(path) => write_json(&path, &map)?,
                None => print_json(&map)?,
            }
        }
        Commands::Extract { schedule, output } => {
            extract_with_insights(&schedule, &output).await?;
        }
    }

    Ok(())
}

/// Loads input data from a local file path or fetches it over HTTP.
#[tracing::instrument(skip(url), fields(source = %url))]
async fn fetcher(url: &str) -> Result<Vec<u8>> {
    let bytes = if url.starts_with("http") {
        let client = BasicClient::new();
        fetch_bytes(&client, url).await?
    } else {
        std::fs::read(url)?
    };
    Ok(bytes)
}

/// Builds the reconciled board: schedule extraction and attendance
/// aggregation run as independent tasks, and a failure on one side never
/// discards the other side's result.
#[tracing::instrument(skip(attendance, json))]
async fn build_board(
    schedule: &str,
    attendance: Option<&str>,
    output: &str,
    json: Option<&str>,
) -> Result<()> {
    let csv_bytes = fetcher(schedule).await?;
    let csv_text = String::from_utf8_lossy(&csv_bytes).into_owned();

    let attendance_bytes = match attendance {
        Some(path) => Some(std::fs::read(path)?),
        None => None,
    };

    let schedule_task = tokio::task::spawn_blocking(move || {
        let normalizer = Normalizer::default();
        extract_schedule_data(&csv_text, &normalizer)
    });
    let attendance_task = tokio::task::spawn_blocking(move || {
        attendance_bytes
            .map(|bytes| {
                let normalizer = Normalizer::default();
                process_attendance_data(&bytes, &normalizer)
            })
            .transpose()
    });

    let (schedule_result, attendance_result) = tokio::join!(schedule_task, attendance_task);

    let attendance_map: HashMap<String, AttendanceData> = match attendance_result? {
        Ok(map) => map.unwrap_or_default(),
        Err(e) => {
            // Attendance is supplementary: the board still renders without it.
            error!(error = %e, "Attendance processing failed");
            HashMap::new()
        }
    };
    if !attendance_map.is_empty() {
        info!(slots = attendance_map.len(), "Attendance history loaded");
    }

    let schedule_data = match schedule_result? {
        Ok(data) => data,
        Err(e) => {
            error!(error = %e, "Schedule extraction failed");
            return Err(e.into());
        }
    };

    let mut joined = 0usize;
    for (day, classes) in schedule_data.iter_days() {
        for cls in classes {
            let stats = attendance_map.get(&cls.attendance_key());
            match stats {
                Some(_) => joined += 1,
                None => debug!(key = %cls.attendance_key(), "No attendance history for slot"),
            }
            append_record(output, &BoardRecord::new(cls, stats))?;
        }
        info!(day, classes = classes.len(), "Board day written");
    }

    if let Some(json_path) = json {
        write_json(json_path, &schedule_data)?;
    }

    info!(
        total = schedule_data.total_classes(),
        joined, output, "Board complete"
    );
    Ok(())
}

/// Runs the local extractor and the Gemini extraction concurrently.
///
/// The local pipeline's result is published no matter what the AI side did;
/// an AI failure only degrades the advanced views.
#[tracing::instrument]
async fn extract_with_insights(schedule: &str, output: &str) -> Result<()> {
    let csv_bytes = fetcher(schedule).await?;
    let csv_text = String::from_utf8_lossy(&csv_bytes).into_owned();

    let api_key = std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");
    let client = GeminiClient::new(api_key);

    let local_task = tokio::task::spawn_blocking({
        let csv_text = csv_text.clone();
        move || {
            let normalizer = Normalizer::default();
            extract_schedule_data(&csv_text, &normalizer)
        }
    });

    let (local_result, ai_result) = tokio::join!(local_task, client.extract_schedule(&csv_text));

    let local_result = local_result?;
    match &local_result {
        Ok(data) => {
            info!(
                classes = data.total_classes(),
                "Local schedule extraction complete"
            );
            print_json(data)?;
        }
        Err(e) => error!(error = %e, "Local schedule extraction failed"),
    }

    match ai_result {
        Ok(rows) => {
            info!(rows = rows.len(), "AI extraction complete");
            write_json(output, &rows)?;
        }
        Err(e) => {
            warn!(error = %e, "AI extraction failed; advanced views will be unavailable");
        }
    }

    local_result?;
    Ok(())
}
