//! Output backends. Each one translates a `PreparedDeck` and the shared geometry into
//! its own primitives.

pub mod html;
pub mod pdf;
pub mod pptx;
pub mod utils;
