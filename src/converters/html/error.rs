use thiserror::Error;

/// Errors raised while generating the markup document.
#[derive(Error, Debug)]
pub enum HtmlError {
    #[error("Formatting error during HTML generation: {0}")]
    FormatError(#[from] std::fmt::Error),
}

/// A specialized Result type for markup generation.
pub type Result<T> = std::result::Result<T, HtmlError>;
