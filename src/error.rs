//! Error types for the extraction pipeline.

use thiserror::Error;

/// Structural failures that abort extraction for a whole input file.
///
/// Per-row problems (blank cells, canceled slots, unparseable dates or
/// times) are logged and skipped instead of surfacing here, so a single
/// bad row never discards an otherwise valid upload.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("schedule CSV does not have enough rows to process")]
    NotEnoughRows,

    #[error("could not find a valid header row with \"Time\" and \"Location\"")]
    HeaderRowNotFound,

    #[error("could not find a valid day row (e.g. \"Monday\", \"Tuesday\") above the header row")]
    DayRowNotFound,

    #[error("\"Time\" column not found in header")]
    TimeColumnNotFound,

    #[error("could not find the required attendance report file in the ZIP")]
    ReportEntryNotFound,

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
