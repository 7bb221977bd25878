use thiserror::Error;

/// Errors raised while building the PDF object graph.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("PDF object error: {0}")]
    Lopdf(#[from] lopdf::Error),
    #[error("I/O error while writing PDF: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for PDF generation.
pub type Result<T> = std::result::Result<T, PdfError>;
