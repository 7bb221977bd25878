use thiserror::Error;

/// Errors raised while building the PresentationML package.
#[derive(Error, Debug)]
pub enum PptxError {
    #[error("Formatting error during XML generation: {0}")]
    FormatError(#[from] std::fmt::Error),
    #[error("Failed to write package part: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("I/O error while writing package: {0}")]
    Io(#[from] std::io::Error),
    /// The chart cannot be expressed as a native chart object.
    #[error("Unsupported chart: {0}")]
    UnsupportedChart(String),
    /// The table cannot be expressed as a native table object.
    #[error("Unsupported table: {0}")]
    UnsupportedTable(String),
}

/// A specialized Result type for PresentationML generation.
pub type Result<T> = std::result::Result<T, PptxError>;
